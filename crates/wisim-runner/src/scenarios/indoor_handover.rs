//! Random-walk pedestrians in a rectangular hall.

use rand::Rng;
use wisim_agents::{MobilityModel, RandomWalkConfig, RandomWalkModel};
use wisim_common::Position;
use wisim_model::ScenarioEnvironment;

use super::{ap_positions_from, assemble, evenly_spaced_aps, placement_rng};
use crate::scenario::{BuildScenarioError, Scenario, ScenarioConfig};
use crate::Simulation;

/// The reference scenario: stations wander the hall under a uniform random
/// walk while a row of access points serves them.
pub struct IndoorHandover;

impl Scenario for IndoorHandover {
    fn name(&self) -> &'static str {
        "indoor-handover"
    }

    fn description(&self) -> &'static str {
        "random-walk stations in a hall with a row of access points"
    }

    fn build(
        &self,
        config: &ScenarioConfig,
        environment: &ScenarioEnvironment,
        seed: u64,
    ) -> Result<Simulation, BuildScenarioError> {
        let bounds = config.bounds();
        let ap_positions = ap_positions_from(environment, || evenly_spaced_aps(config));

        let mut rng = placement_rng(seed);
        let mut walkers: Vec<(Position, Box<dyn MobilityModel>)> =
            Vec::with_capacity(config.pedestrians);
        for _ in 0..config.pedestrians {
            let start = Position::new(
                rng.gen_range(0.0..bounds.width),
                rng.gen_range(0.0..bounds.height),
            );
            let walk = RandomWalkConfig {
                min_speed_mps: config.min_speed_mps,
                max_speed_mps: config.max_speed_mps,
                direction_hold_secs: config.direction_hold_secs,
                bounds,
            };
            walkers.push((start, Box::new(RandomWalkModel::new(walk))));
        }

        assemble(config, ap_positions, walkers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_wires_all_stations() {
        let config = ScenarioConfig {
            pedestrians: 8,
            ..ScenarioConfig::default()
        };
        let simulation = IndoorHandover
            .build(&config, &ScenarioEnvironment::default(), 42)
            .unwrap();

        assert_eq!(simulation.node_count, 8);
        assert_eq!(simulation.entities.len(), 9);
        // Engine startup, 8 associations, 8 pedestrian startups, end marker.
        assert_eq!(simulation.initial_events.len(), 18);
    }

    #[test]
    fn test_map_access_points_take_precedence() {
        use wisim_model::PositionedNode;

        let environment = ScenarioEnvironment {
            access_points: vec![
                PositionedNode {
                    id: "ap-a".to_string(),
                    position: Position::new(1.0, 1.0),
                },
                PositionedNode {
                    id: "ap-b".to_string(),
                    position: Position::new(49.0, 29.0),
                },
            ],
            ..ScenarioEnvironment::default()
        };
        let config = ScenarioConfig {
            pedestrians: 2,
            ..ScenarioConfig::default()
        };

        // Both runs succeed; with two APs from the map the association events
        // only ever name ids 0 and 1.
        let simulation = IndoorHandover.build(&config, &environment, 7).unwrap();
        for pending in &simulation.initial_events {
            if let wisim_common::EventPayload::Association { ap, .. } = pending.payload {
                assert!(ap.index() < 2);
            }
        }
    }
}
