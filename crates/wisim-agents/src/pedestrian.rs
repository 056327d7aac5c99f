//! Pedestrian mobility agent.
//!
//! A pedestrian owns its position and a mobility model. On each movement
//! timer it advances one step, reports the new position to the handover
//! engine, and reschedules itself until the configured end time or until its
//! route finishes.

use crate::mobility::MobilityModel;
use tracing::{debug, trace};
use wisim_common::{
    entity_tracer::TraceEvent, Entity, EntityId, Event, EventPayload, NodeId, Position,
    SimContext, SimError, SimTime,
};
use wisim_metrics::{metric_defs, metrics, MetricLabels};

/// Timer fired once at simulation start.
pub const TIMER_STARTUP: u64 = 0;
/// Recurring movement timer.
const TIMER_MOVE: u64 = 1;

/// Configuration for a pedestrian agent.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PedestrianConfig {
    /// Display name, e.g. "walker-3".
    pub name: String,
    /// Interval between movement steps.
    pub step_period: SimTime,
    /// Simulated time after which no further steps are scheduled.
    pub end_time: SimTime,
}

impl Default for PedestrianConfig {
    fn default() -> Self {
        Self {
            name: "walker".to_string(),
            step_period: SimTime::from_secs(1.0),
            end_time: SimTime::from_secs(60.0),
        }
    }
}

/// A mobile station walking the floor.
pub struct Pedestrian {
    id: EntityId,
    node: NodeId,
    /// The handover engine receiving position reports.
    engine: EntityId,
    config: PedestrianConfig,
    position: Position,
    model: Box<dyn MobilityModel>,
    labels: MetricLabels,
    steps_taken: u64,
    distance_walked_m: f64,
}

impl Pedestrian {
    pub fn new(
        id: EntityId,
        node: NodeId,
        engine: EntityId,
        config: PedestrianConfig,
        start: Position,
        model: Box<dyn MobilityModel>,
    ) -> Self {
        let labels = MetricLabels::new(config.name.clone(), "pedestrian");
        Self {
            id,
            node,
            engine,
            config,
            position: start,
            model,
            labels,
            steps_taken: 0,
            distance_walked_m: 0.0,
        }
    }

    /// The station id this pedestrian reports as.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Current position.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Number of movement steps taken so far.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Total distance walked, in meters.
    pub fn distance_walked_m(&self) -> f64 {
        self.distance_walked_m
    }

    /// Report the spawn position and start the movement timer.
    fn handle_startup(&mut self, ctx: &mut SimContext) {
        debug!(
            "Pedestrian[{}]: starting at {} with {} mobility",
            self.config.name,
            self.position,
            self.model.kind()
        );

        ctx.tracer().log(TraceEvent::custom(
            Some(&self.config.name),
            self.id,
            ctx.time(),
            format!("spawned at {} ({})", self.position, self.model.kind()),
        ));

        self.report_position(ctx);
        self.schedule_next_step(ctx);
    }

    /// Advance one movement step.
    fn handle_move_timer(&mut self, ctx: &mut SimContext) {
        let dt = self.config.step_period.as_secs_f64();
        let next = self.model.step(self.position, dt, ctx.rng());
        let step_distance = self.position.distance_to(&next);
        self.position = next;
        self.steps_taken += 1;
        self.distance_walked_m += step_distance;

        trace!(
            "Pedestrian[{}]: step {} to {} ({:.2} m)",
            self.config.name,
            self.steps_taken,
            self.position,
            step_distance
        );

        metrics::histogram!(
            metric_defs::MOBILITY_STEP_DISTANCE.name,
            &self.labels.to_labels()
        )
        .record(step_distance);

        self.report_position(ctx);

        if self.model.is_finished() {
            debug!(
                "Pedestrian[{}]: route finished after {} steps ({:.1} m)",
                self.config.name, self.steps_taken, self.distance_walked_m
            );
            ctx.tracer().log(TraceEvent::state_change(
                Some(&self.config.name),
                self.id,
                ctx.time(),
                "route finished",
            ));
            return;
        }

        self.schedule_next_step(ctx);
    }

    /// Post the current position to the handover engine.
    fn report_position(&mut self, ctx: &mut SimContext) {
        metrics::counter!(
            metric_defs::MOBILITY_POSITION_UPDATES.name,
            &self.labels.to_labels()
        )
        .increment(1);

        ctx.post_immediate(
            vec![self.engine],
            EventPayload::PositionUpdate {
                node: self.node,
                position: self.position,
            },
        );
    }

    /// Reschedule the movement timer unless the end time has been reached.
    fn schedule_next_step(&mut self, ctx: &mut SimContext) {
        let next_step = ctx.time() + self.config.step_period;
        if next_step > self.config.end_time {
            debug!(
                "Pedestrian[{}]: movement complete at {} ({} steps, {:.1} m)",
                self.config.name,
                ctx.time(),
                self.steps_taken,
                self.distance_walked_m
            );
            return;
        }
        ctx.post_event(
            self.config.step_period,
            vec![self.id],
            EventPayload::Timer {
                timer_id: TIMER_MOVE,
            },
        );
    }
}

impl Entity for Pedestrian {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> Option<&str> {
        Some(&self.config.name)
    }

    fn handle_event(&mut self, event: &Event, ctx: &mut SimContext) -> Result<(), SimError> {
        match &event.payload {
            EventPayload::Timer { timer_id } => match *timer_id {
                TIMER_STARTUP => self.handle_startup(ctx),
                TIMER_MOVE => self.handle_move_timer(ctx),
                _ => {}
            },
            _ => {
                trace!(
                    "Pedestrian[{}]: ignoring {:?}",
                    self.config.name,
                    event.payload
                );
            }
        }
        Ok(())
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Create a new pedestrian agent.
pub fn create_pedestrian(
    id: EntityId,
    node: NodeId,
    engine: EntityId,
    config: PedestrianConfig,
    start: Position,
    model: Box<dyn MobilityModel>,
) -> Pedestrian {
    Pedestrian::new(id, node, engine, config, start, model)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mobility::{RandomWalkConfig, RandomWalkModel, WaypointModel};
    use wisim_common::entity_tracer::EntityTracer;
    use wisim_common::EventId;

    fn make_pedestrian(config: PedestrianConfig) -> Pedestrian {
        Pedestrian::new(
            EntityId(1),
            NodeId(0),
            EntityId(99),
            config,
            Position::new(25.0, 15.0),
            Box::new(RandomWalkModel::new(RandomWalkConfig::default())),
        )
    }

    fn timer_event(target: EntityId, timer_id: u64, time: SimTime) -> Event {
        Event {
            id: EventId(1),
            time,
            source: target,
            targets: vec![target],
            payload: EventPayload::Timer { timer_id },
        }
    }

    #[test]
    fn test_pedestrian_config_default() {
        let config = PedestrianConfig::default();
        assert_eq!(config.step_period, SimTime::from_secs(1.0));
        assert_eq!(config.end_time, SimTime::from_secs(60.0));
    }

    #[test]
    fn test_startup_reports_position_and_schedules_move() {
        let mut pedestrian = make_pedestrian(PedestrianConfig::default());
        let mut ctx = SimContext::new(7, EntityTracer::disabled());

        let event = timer_event(EntityId(1), TIMER_STARTUP, SimTime::ZERO);
        pedestrian.handle_event(&event, &mut ctx).unwrap();

        let pending = ctx.take_pending();
        assert_eq!(pending.len(), 2);
        // Position report to the engine, at the current instant.
        assert_eq!(pending[0].targets, vec![EntityId(99)]);
        assert!(matches!(
            pending[0].payload,
            EventPayload::PositionUpdate { node: NodeId(0), .. }
        ));
        assert_eq!(pending[0].time, SimTime::ZERO);
        // Movement timer one period out.
        assert_eq!(pending[1].targets, vec![EntityId(1)]);
        assert_eq!(pending[1].time, SimTime::from_secs(1.0));
    }

    #[test]
    fn test_move_step_updates_position_and_reschedules() {
        let mut pedestrian = make_pedestrian(PedestrianConfig::default());
        let mut ctx = SimContext::new(7, EntityTracer::disabled());
        ctx.advance_to(SimTime::from_secs(1.0));

        let event = timer_event(EntityId(1), 1, SimTime::from_secs(1.0));
        pedestrian.handle_event(&event, &mut ctx).unwrap();

        assert_eq!(pedestrian.steps_taken(), 1);
        assert!(pedestrian.distance_walked_m() > 0.0);

        let pending = ctx.take_pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].time, SimTime::from_secs(2.0));
    }

    #[test]
    fn test_no_reschedule_past_end_time() {
        let config = PedestrianConfig {
            end_time: SimTime::from_secs(10.0),
            ..Default::default()
        };
        let mut pedestrian = make_pedestrian(config);
        let mut ctx = SimContext::new(7, EntityTracer::disabled());
        ctx.advance_to(SimTime::from_secs(10.0));

        let event = timer_event(EntityId(1), 1, SimTime::from_secs(10.0));
        pedestrian.handle_event(&event, &mut ctx).unwrap();

        // Only the position report; the 11 s step would overrun the end time.
        let pending = ctx.take_pending();
        assert_eq!(pending.len(), 1);
        assert!(matches!(
            pending[0].payload,
            EventPayload::PositionUpdate { .. }
        ));
    }

    #[test]
    fn test_finished_route_stops_scheduling() {
        let mut pedestrian = Pedestrian::new(
            EntityId(1),
            NodeId(0),
            EntityId(99),
            PedestrianConfig::default(),
            Position::new(0.0, 0.0),
            Box::new(WaypointModel::new(vec![], 1.0)),
        );
        let mut ctx = SimContext::new(7, EntityTracer::disabled());
        ctx.advance_to(SimTime::from_secs(1.0));

        let event = timer_event(EntityId(1), 1, SimTime::from_secs(1.0));
        pedestrian.handle_event(&event, &mut ctx).unwrap();

        // Position report only, no timer: the route is already exhausted.
        let pending = ctx.take_pending();
        assert_eq!(pending.len(), 1);
    }
}
