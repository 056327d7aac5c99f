//! AP handover decision engine.
//!
//! The engine tracks every station's position and serving access point. On a
//! periodic tick it estimates RSSI from each AP, picks the strongest
//! candidate, and switches the station when the candidate beats the serving
//! AP by more than the hysteresis margin. Each switch starts a cooldown
//! during which further switches for that station are suppressed.

use tracing::{debug, info, trace};
use wisim_common::{
    entity_tracer::TraceEvent, ApId, Entity, EntityId, Event, EventPayload, HandoverRecord,
    NodeId, Position, SimContext, SimError, SimTime,
};
use wisim_link::PathLossConfig;
use wisim_metrics::{metric_defs, metrics, MetricLabels};

/// Timer fired once at simulation start.
const TIMER_STARTUP: u64 = 0;
/// Recurring evaluation tick.
pub const TIMER_TICK: u64 = 1;
/// Base for per-station cooldown timers; station index is added on top.
const TIMER_COOLDOWN_BASE: u64 = 2;

/// Configuration for the handover decision engine.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct HandoverConfig {
    /// A candidate AP must beat the serving AP by more than this to win.
    pub hysteresis_margin_db: f64,
    /// Propagation model shared by all RSSI estimates.
    pub path_loss: PathLossConfig,
    /// Interval between evaluation ticks.
    pub tick_period: SimTime,
    /// Per-station hold-off after a handover.
    pub cooldown: SimTime,
    /// Simulated time after which no further ticks are scheduled.
    pub end_time: SimTime,
}

impl Default for HandoverConfig {
    fn default() -> Self {
        Self {
            hysteresis_margin_db: 5.0,
            path_loss: PathLossConfig::default(),
            tick_period: SimTime::from_secs(1.0),
            cooldown: SimTime::from_secs(5.0),
            end_time: SimTime::from_secs(60.0),
        }
    }
}

/// Per-station association state.
#[derive(Debug, Clone)]
pub struct NodeState {
    /// Last reported position.
    pub position: Position,
    /// AP currently serving this station.
    pub current_ap: ApId,
    /// True while the post-handover cooldown is running.
    pub triggered: bool,
    /// When the running cooldown ends, if one is running.
    pub cooldown_expiry: Option<SimTime>,
    /// Handovers this station has completed.
    pub handover_count: u64,
}

impl NodeState {
    fn new() -> Self {
        Self {
            position: Position::new(0.0, 0.0),
            current_ap: ApId(0),
            triggered: false,
            cooldown_expiry: None,
            handover_count: 0,
        }
    }
}

/// The handover decision engine entity.
pub struct HandoverDecisionEngine {
    id: EntityId,
    config: HandoverConfig,
    /// Fixed AP deployment, indexed by [`ApId`].
    ap_positions: Vec<Position>,
    /// Dense per-station state, indexed by [`NodeId`].
    nodes: Vec<NodeState>,
    total_handovers: u64,
    suppressed_handovers: u64,
}

impl HandoverDecisionEngine {
    pub fn new(
        id: EntityId,
        config: HandoverConfig,
        ap_positions: Vec<Position>,
        node_count: usize,
    ) -> Self {
        Self {
            id,
            config,
            ap_positions,
            nodes: (0..node_count).map(|_| NodeState::new()).collect(),
            total_handovers: 0,
            suppressed_handovers: 0,
        }
    }

    /// Number of deployed access points.
    pub fn ap_count(&self) -> usize {
        self.ap_positions.len()
    }

    /// Number of tracked stations.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The AP currently serving a station.
    pub fn current_ap(&self, node: NodeId) -> Option<ApId> {
        self.nodes.get(node.index()).map(|state| state.current_ap)
    }

    /// Full association state for a station.
    pub fn node_state(&self, node: NodeId) -> Option<&NodeState> {
        self.nodes.get(node.index())
    }

    /// Handovers completed across all stations.
    pub fn total_handovers(&self) -> u64 {
        self.total_handovers
    }

    /// Handovers wanted but blocked by a running cooldown.
    pub fn suppressed_handovers(&self) -> u64 {
        self.suppressed_handovers
    }

    fn handle_startup(&mut self, ctx: &mut SimContext) {
        debug!(
            "HandoverEngine: online with {} APs, {} stations (margin {:.1} dB, cooldown {})",
            self.ap_positions.len(),
            self.nodes.len(),
            self.config.hysteresis_margin_db,
            self.config.cooldown
        );
        ctx.tracer().log(TraceEvent::custom(
            Some("handover-engine"),
            self.id,
            ctx.time(),
            format!(
                "online: {} APs, {} stations",
                self.ap_positions.len(),
                self.nodes.len()
            ),
        ));
        self.schedule_next_tick(ctx);
    }

    /// Record a station's new position. Evaluation happens on the next tick.
    fn handle_position_update(&mut self, node: NodeId, position: Position) -> Result<(), SimError> {
        let node_count = self.nodes.len();
        let state = self.nodes.get_mut(node.index()).ok_or_else(|| {
            SimError::InvariantViolation(format!(
                "position update for unknown station {} ({} registered)",
                node, node_count
            ))
        })?;
        state.position = position;
        trace!("HandoverEngine: station {} now at {}", node, position);
        Ok(())
    }

    /// Set a station's serving AP directly, without hysteresis or cooldown.
    /// Used for the initial association at scenario start.
    fn handle_association(
        &mut self,
        node: NodeId,
        ap: ApId,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        if ap.index() >= self.ap_positions.len() {
            return Err(SimError::InvariantViolation(format!(
                "station {} associated to unknown access point {} ({} deployed)",
                node,
                ap,
                self.ap_positions.len()
            )));
        }
        let node_count = self.nodes.len();
        let state = self.nodes.get_mut(node.index()).ok_or_else(|| {
            SimError::InvariantViolation(format!(
                "association for unknown station {} ({} registered)",
                node, node_count
            ))
        })?;
        state.current_ap = ap;
        ctx.tracer().log(TraceEvent::state_change_with_details(
            Some("handover-engine"),
            self.id,
            ctx.time(),
            "station associated",
            vec![
                ("node".to_string(), format!("{}", node)),
                ("ap".to_string(), format!("{}", ap)),
            ],
        ));
        Ok(())
    }

    /// Evaluate every station against the AP deployment.
    fn handle_tick(&mut self, ctx: &mut SimContext) {
        if !self.ap_positions.is_empty() {
            for index in 0..self.nodes.len() {
                self.evaluate_node(index, ctx);
            }
        }
        self.schedule_next_tick(ctx);
    }

    fn evaluate_node(&mut self, index: usize, ctx: &mut SimContext) {
        let position = self.nodes[index].position;
        let current = self.nodes[index].current_ap;
        let triggered = self.nodes[index].triggered;

        let current_rssi = self
            .config
            .path_loss
            .estimate_rssi(&self.ap_positions[current.index()], &position);
        let (best, best_rssi) = self.best_ap(&position);

        if best == current {
            return;
        }
        // Strictly better than serving plus margin, otherwise hold.
        if !(best_rssi > current_rssi + self.config.hysteresis_margin_db) {
            return;
        }
        if triggered {
            self.suppressed_handovers += 1;
            let labels = node_labels(NodeId(index as u32));
            metrics::counter!(metric_defs::HANDOVER_SUPPRESSED.name, &labels.to_labels())
                .increment(1);
            trace!(
                "HandoverEngine: station {} wants {} over {} but cooldown is running",
                index,
                best,
                current
            );
            return;
        }

        self.fire_handover(index, best, best_rssi - current_rssi, ctx);
    }

    /// Strongest AP for a position. Ties keep the lowest AP index.
    fn best_ap(&self, position: &Position) -> (ApId, f64) {
        let mut best_index = 0usize;
        let mut best_rssi = f64::NEG_INFINITY;
        for (index, ap) in self.ap_positions.iter().enumerate() {
            let rssi = self.config.path_loss.estimate_rssi(ap, position);
            if rssi > best_rssi {
                best_rssi = rssi;
                best_index = index;
            }
        }
        (ApId(best_index as u32), best_rssi)
    }

    fn fire_handover(&mut self, index: usize, to: ApId, rssi_delta_db: f64, ctx: &mut SimContext) {
        let now = ctx.time();
        let node = NodeId(index as u32);
        let from = self.nodes[index].current_ap;
        let expiry = now + self.config.cooldown;

        let state = &mut self.nodes[index];
        state.current_ap = to;
        state.triggered = true;
        state.cooldown_expiry = Some(expiry);
        state.handover_count += 1;
        self.total_handovers += 1;

        let labels = node_labels(node);
        metrics::counter!(
            metric_defs::HANDOVER_COUNT.name,
            &labels.with(&[
                ("from_ap", format!("{}", from)),
                ("to_ap", format!("{}", to)),
            ])
        )
        .increment(1);
        metrics::histogram!(metric_defs::HANDOVER_RSSI_DELTA.name, &labels.to_labels())
            .record(rssi_delta_db);

        info!(
            "Handover: station {} {} -> {} at {} ({:+.1} dB)",
            node, from, to, now, rssi_delta_db
        );
        ctx.tracer().log(TraceEvent::state_change_with_details(
            Some("handover-engine"),
            self.id,
            now,
            "handover",
            vec![
                ("node".to_string(), format!("{}", node)),
                ("from_ap".to_string(), format!("{}", from)),
                ("to_ap".to_string(), format!("{}", to)),
                ("delta_db".to_string(), format!("{:.1}", rssi_delta_db)),
            ],
        ));

        // Self-addressed so the event loop observes and records it.
        ctx.post_immediate(
            vec![self.id],
            EventPayload::Handover(HandoverRecord {
                node,
                from_ap: from,
                to_ap: to,
                time: now,
            }),
        );

        ctx.post_event(
            self.config.cooldown,
            vec![self.id],
            EventPayload::Timer {
                timer_id: TIMER_COOLDOWN_BASE + index as u64,
            },
        );
    }

    /// End a station's cooldown. Safe to call when none is running.
    fn handle_cooldown_timer(&mut self, index: usize, ctx: &mut SimContext) {
        let state = match self.nodes.get_mut(index) {
            Some(state) => state,
            None => return,
        };
        match state.cooldown_expiry {
            Some(expiry) if ctx.time() >= expiry => {
                state.triggered = false;
                state.cooldown_expiry = None;
                trace!("HandoverEngine: station {} cooldown cleared", index);
            }
            _ => {}
        }
    }

    fn schedule_next_tick(&mut self, ctx: &mut SimContext) {
        let next_tick = ctx.time() + self.config.tick_period;
        if next_tick > self.config.end_time {
            debug!(
                "HandoverEngine: final tick at {} ({} handovers, {} suppressed)",
                ctx.time(),
                self.total_handovers,
                self.suppressed_handovers
            );
            return;
        }
        ctx.post_event(
            self.config.tick_period,
            vec![self.id],
            EventPayload::Timer {
                timer_id: TIMER_TICK,
            },
        );
    }
}

// Label values follow the station naming used by the scenarios, so per-node
// metrics from the engine and from the pedestrians land under one key.
fn node_labels(node: NodeId) -> MetricLabels {
    MetricLabels::new(format!("walker-{}", node), "pedestrian")
}

impl Entity for HandoverDecisionEngine {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn name(&self) -> Option<&str> {
        Some("handover-engine")
    }

    fn handle_event(&mut self, event: &Event, ctx: &mut SimContext) -> Result<(), SimError> {
        match &event.payload {
            EventPayload::Timer { timer_id } => match *timer_id {
                TIMER_STARTUP => self.handle_startup(ctx),
                TIMER_TICK => self.handle_tick(ctx),
                id => self.handle_cooldown_timer((id - TIMER_COOLDOWN_BASE) as usize, ctx),
            },
            EventPayload::PositionUpdate { node, position } => {
                self.handle_position_update(*node, *position)?
            }
            EventPayload::Association { node, ap } => self.handle_association(*node, *ap, ctx)?,
            // Our own handover notifications coming back around.
            EventPayload::Handover(_) => {}
            _ => {
                trace!("HandoverEngine: ignoring {:?}", event.payload);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Create a handover decision engine for a fixed AP deployment.
pub fn create_handover_engine(
    id: EntityId,
    config: HandoverConfig,
    ap_positions: Vec<Position>,
    node_count: usize,
) -> HandoverDecisionEngine {
    HandoverDecisionEngine::new(id, config, ap_positions, node_count)
}

// ============================================================================
// Tests
// ============================================================================
