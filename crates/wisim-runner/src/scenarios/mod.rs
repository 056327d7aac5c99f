//! Built-in scenarios.
//!
//! Each scenario places stations and a set of access points, wires every
//! station to a pedestrian agent with a mobility model, and seeds the
//! schedule: the engine startup tick, one association per station to its
//! nearest AP, the pedestrian startup timers, and the end marker. Station
//! `i` always maps to entity id `i + 2`, leaving id 1 for the engine.

mod door_to_door;
mod gauss_markov;
mod indoor_handover;

pub use door_to_door::DoorToDoor;
pub use gauss_markov::GaussMarkovHall;
pub use indoor_handover::IndoorHandover;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use wisim_agents::{
    create_handover_engine, create_pedestrian, MobilityModel, PedestrianConfig, TIMER_STARTUP,
};
use wisim_common::{ApId, Entity, EntityId, EventPayload, NodeId, PendingEvent, Position, SimTime};
use wisim_model::ScenarioEnvironment;

use crate::scenario::{BuildScenarioError, ScenarioConfig};
use crate::Simulation;

/// Entity id of the handover engine in every built-in scenario.
pub(crate) const ENGINE_ENTITY: EntityId = EntityId(1);

/// First pedestrian entity id; station `i` becomes entity `BASE + i`.
pub(crate) const PEDESTRIAN_ENTITY_BASE: u64 = 2;

/// Placement draws use a stream separate from the run context, so scenario
/// construction never shifts in-run randomness.
pub(crate) fn placement_rng(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(1);
    rng
}

/// AP positions from the map, or `fallback` when the map provides none.
pub(crate) fn ap_positions_from(
    environment: &ScenarioEnvironment,
    fallback: impl FnOnce() -> Vec<Position>,
) -> Vec<Position> {
    let from_map = environment.ap_positions();
    if from_map.is_empty() {
        fallback()
    } else {
        from_map
    }
}

/// A row of APs along the hall midline, evenly spaced.
pub(crate) fn evenly_spaced_aps(config: &ScenarioConfig) -> Vec<Position> {
    let count = config.access_points.max(1);
    let spacing = config.hall_width_m / count as f64;
    (0..count)
        .map(|i| Position::new(spacing * (i as f64 + 0.5), config.hall_height_m / 2.0))
        .collect()
}

/// Index of the closest AP; ties go to the lowest index.
pub(crate) fn nearest_ap(ap_positions: &[Position], position: &Position) -> ApId {
    let mut best = 0usize;
    let mut best_distance = f64::INFINITY;
    for (index, ap) in ap_positions.iter().enumerate() {
        let distance = position.distance_to(ap);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    ApId(best as u32)
}

/// Wire stations and the engine into a [`Simulation`].
///
/// `walkers` carries one start position and mobility model per station.
/// Initial associations are scheduled before the pedestrian startup timers,
/// so the engine knows every serving AP before the first position report.
pub(crate) fn assemble(
    config: &ScenarioConfig,
    ap_positions: Vec<Position>,
    walkers: Vec<(Position, Box<dyn MobilityModel>)>,
) -> Result<Simulation, BuildScenarioError> {
    if ap_positions.is_empty() {
        return Err(BuildScenarioError::MissingEnvironment(
            "at least one access point",
        ));
    }
    if config.tick_period_secs <= 0.0 || config.step_period_secs <= 0.0 {
        return Err(BuildScenarioError::InvalidConfig(
            "tick_period_secs and step_period_secs must be positive".to_string(),
        ));
    }

    let end_time = config.end_time();
    let handover = config.handover()?;
    let node_count = walkers.len();

    let mut entities: Vec<Box<dyn Entity>> = Vec::with_capacity(node_count + 1);
    let mut initial_events: Vec<PendingEvent> = Vec::with_capacity(2 * node_count + 2);

    initial_events.push(PendingEvent {
        time: SimTime::ZERO,
        targets: vec![ENGINE_ENTITY],
        payload: EventPayload::Timer {
            timer_id: TIMER_STARTUP,
        },
    });

    for (index, (start, _)) in walkers.iter().enumerate() {
        initial_events.push(PendingEvent {
            time: SimTime::ZERO,
            targets: vec![ENGINE_ENTITY],
            payload: EventPayload::Association {
                node: NodeId(index as u32),
                ap: nearest_ap(&ap_positions, start),
            },
        });
    }

    entities.push(Box::new(create_handover_engine(
        ENGINE_ENTITY,
        handover,
        ap_positions,
        node_count,
    )));

    for (index, (start, model)) in walkers.into_iter().enumerate() {
        let entity_id = EntityId(PEDESTRIAN_ENTITY_BASE + index as u64);
        let pedestrian = PedestrianConfig {
            name: format!("walker-{}", index),
            step_period: SimTime::from_secs(config.step_period_secs),
            end_time,
        };
        entities.push(Box::new(create_pedestrian(
            entity_id,
            NodeId(index as u32),
            ENGINE_ENTITY,
            pedestrian,
            start,
            model,
        )));
        initial_events.push(PendingEvent {
            time: SimTime::ZERO,
            targets: vec![entity_id],
            payload: EventPayload::Timer {
                timer_id: TIMER_STARTUP,
            },
        });
    }

    // A microsecond of slack keeps timers firing exactly at the end inside
    // the run.
    let shutdown_time = end_time + SimTime::from_micros(1);
    initial_events.push(PendingEvent {
        time: shutdown_time,
        targets: vec![ENGINE_ENTITY],
        payload: EventPayload::SimulationEnd,
    });

    Ok(Simulation {
        entities,
        initial_events,
        node_count,
        shutdown_time,
    })
}
