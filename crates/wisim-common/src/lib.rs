//! # wisim-common
//!
//! Core types and traits shared by every wisim crate: simulation time,
//! entity identifiers, the event structure consumed by the event loop, the
//! [`Entity`] trait implemented by pedestrians and the handover engine, and
//! the [`SimContext`] handed to entities while they process events.
//!
//! Events are dispatched in timestamp order. [`Event`] implements a reversed
//! `Ord` so that a `std::collections::BinaryHeap` behaves as a min-heap on
//! `(time, id)`: events scheduled earlier compare as greater.

pub mod entity_tracer;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use entity_tracer::EntityTracer;

// ============================================================================
// Simulation Time
// ============================================================================

/// Simulation time with microsecond resolution.
///
/// Stored as microseconds since simulation start. Construction from seconds
/// rounds to the nearest microsecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// Time zero, the start of the simulation.
    pub const ZERO: SimTime = SimTime(0);

    /// Create a time from fractional seconds.
    pub fn from_secs(secs: f64) -> Self {
        SimTime((secs * 1_000_000.0).round() as u64)
    }

    /// Create a time from whole milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        SimTime(millis * 1_000)
    }

    /// Create a time from whole microseconds.
    pub fn from_micros(micros: u64) -> Self {
        SimTime(micros)
    }

    /// Time as whole microseconds.
    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Time as whole milliseconds (truncating).
    pub fn as_millis(&self) -> u64 {
        self.0 / 1_000
    }

    /// Time as fractional milliseconds.
    pub fn as_millis_f64(&self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    /// Time as fractional seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        self.0 += rhs.0;
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an entity registered with the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    pub fn new(id: u64) -> Self {
        EntityId(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a mobile station (pedestrian) tracked by the handover
/// engine. Node ids are contiguous from zero within a scenario, so they can
/// index dense per-node state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Index into dense per-node state vectors.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for an access point. AP ids are indices into the scenario's
/// AP registry, contiguous from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApId(pub u32);

impl ApId {
    pub fn new(id: u32) -> Self {
        ApId(id)
    }

    /// Index into the AP registry.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ApId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing event sequence number, assigned by the event
/// loop. Breaks timestamp ties so dispatch order equals scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

// ============================================================================
// Geometry
// ============================================================================

/// A position on the floor plan, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }

    /// Euclidean distance to another position, in meters.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

// ============================================================================
// Events
// ============================================================================

/// A completed handover, emitted by the handover engine when a station
/// switches access points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandoverRecord {
    pub node: NodeId,
    pub from_ap: ApId,
    pub to_ap: ApId,
    pub time: SimTime,
}

/// Payload carried by a simulation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Entity-local timer expiry. The `timer_id` discriminates between the
    /// timers an entity schedules for itself.
    Timer { timer_id: u64 },
    /// A station reporting its current position to the handover engine.
    PositionUpdate { node: NodeId, position: Position },
    /// A station's association changed (or was established at startup).
    Association { node: NodeId, ap: ApId },
    /// A completed handover, for collectors.
    Handover(HandoverRecord),
    /// Terminates the event loop when dispatched.
    SimulationEnd,
}

/// An event scheduled for dispatch.
///
/// Ordering is reversed on `(time, id)` so a `BinaryHeap<Event>` pops the
/// earliest event first; among events sharing a timestamp, the one scheduled
/// first (lower [`EventId`]) is dispatched first.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: EventId,
    pub time: SimTime,
    pub source: EntityId,
    pub targets: Vec<EntityId>,
    pub payload: EventPayload,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for Event {}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: earlier time (then lower id) compares as greater.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// Entity Trait
// ============================================================================

/// A simulation participant.
///
/// Entities receive events addressed to them and may post follow-ups through
/// the [`SimContext`]. `handle_event` errors abort the simulation.
pub trait Entity {
    /// The id this entity is registered under.
    fn entity_id(&self) -> EntityId;

    /// Human-readable name for traces and logs.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Process one event addressed to this entity.
    fn handle_event(&mut self, event: &Event, ctx: &mut SimContext) -> Result<(), SimError>;
}

// ============================================================================
// Simulation Context
// ============================================================================

/// An event posted by an entity, not yet assigned an [`EventId`].
///
/// The event loop drains these after each dispatch and inserts them into the
/// schedule in posting order.
#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub time: SimTime,
    pub targets: Vec<EntityId>,
    pub payload: EventPayload,
}

/// Per-run state handed to entities while they handle events: the current
/// simulation time, the seeded random number generator, the entity tracer,
/// and the outbox for posted events.
pub struct SimContext {
    now: SimTime,
    rng: ChaCha8Rng,
    tracer: EntityTracer,
    pending: Vec<PendingEvent>,
}

impl SimContext {
    /// Create a context with a deterministically seeded RNG.
    pub fn new(seed: u64, tracer: EntityTracer) -> Self {
        SimContext {
            now: SimTime::ZERO,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tracer,
            pending: Vec::new(),
        }
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.now
    }

    /// Advance the clock. Called by the event loop before each dispatch.
    pub fn advance_to(&mut self, time: SimTime) {
        self.now = time;
    }

    /// The run's random number generator. All stochastic decisions draw from
    /// this single stream, which is what makes runs seed-reproducible.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// The entity tracer for `--trace` diagnostics.
    pub fn tracer(&self) -> &EntityTracer {
        &self.tracer
    }

    /// Post an event `delay` after the current time.
    pub fn post_event(&mut self, delay: SimTime, targets: Vec<EntityId>, payload: EventPayload) {
        let time = self.now + delay;
        self.pending.push(PendingEvent { time, targets, payload });
    }

    /// Post an event at the current time. It is dispatched after the event
    /// currently being handled, in posting order.
    pub fn post_immediate(&mut self, targets: Vec<EntityId>, payload: EventPayload) {
        self.post_event(SimTime::ZERO, targets, payload);
    }

    /// Drain events posted since the last call. Used by the event loop.
    pub fn take_pending(&mut self) -> Vec<PendingEvent> {
        std::mem::take(&mut self.pending)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while dispatching simulation events.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A simulation invariant was violated. These indicate a bug in a
    /// scenario or entity and always abort the run.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// An event targeted an entity id that was never registered.
    #[error("event addressed to unknown entity {0}")]
    UnknownEntity(EntityId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_time_conversions() {
        assert_eq!(SimTime::from_secs(1.5).as_millis(), 1500);
        assert_eq!(SimTime::from_millis(250).as_micros(), 250_000);
        assert_eq!(SimTime::from_micros(1_000_000).as_secs_f64(), 1.0);
        assert_eq!(SimTime::from_secs(0.1).as_micros(), 100_000);
    }

    #[test]
    fn test_sim_time_arithmetic() {
        let sum = SimTime::from_millis(100) + SimTime::from_millis(50);
        assert_eq!(sum.as_millis(), 150);

        let diff = SimTime::from_millis(100) - SimTime::from_millis(30);
        assert_eq!(diff.as_millis(), 70);

        // Subtraction saturates at zero rather than wrapping.
        let clamped = SimTime::from_millis(10) - SimTime::from_millis(50);
        assert_eq!(clamped, SimTime::ZERO);
    }

    #[test]
    fn test_event_ordering_is_reversed_for_min_heap() {
        let e1 = Event {
            id: EventId(1),
            time: SimTime::from_millis(300),
            source: EntityId(0),
            targets: vec![EntityId(1)],
            payload: EventPayload::SimulationEnd,
        };
        let e2 = Event {
            id: EventId(2),
            time: SimTime::from_millis(100),
            source: EntityId(0),
            targets: vec![EntityId(1)],
            payload: EventPayload::SimulationEnd,
        };

        // e2 is earlier, so it must compare greater (max-heap pops it first).
        assert!(e1 < e2);
        assert!(e2 > e1);
    }

    #[test]
    fn test_event_ordering_ties_break_on_id() {
        let first = Event {
            id: EventId(7),
            time: SimTime::from_millis(100),
            source: EntityId(0),
            targets: vec![],
            payload: EventPayload::SimulationEnd,
        };
        let second = Event {
            id: EventId(8),
            time: SimTime::from_millis(100),
            source: EntityId(0),
            targets: vec![],
            payload: EventPayload::SimulationEnd,
        };

        // Same timestamp: the earlier-scheduled event pops first.
        assert!(first > second);
    }

    #[test]
    fn test_binary_heap_pops_earliest_event() {
        use std::collections::BinaryHeap;

        let mut heap = BinaryHeap::new();
        for (id, ms) in [(1u64, 500u64), (2, 100), (3, 300)] {
            heap.push(Event {
                id: EventId(id),
                time: SimTime::from_millis(ms),
                source: EntityId(0),
                targets: vec![],
                payload: EventPayload::SimulationEnd,
            });
        }

        let order: Vec<u64> = std::iter::from_fn(|| heap.pop())
            .map(|e| e.time.as_millis())
            .collect();
        assert_eq!(order, vec![100, 300, 500]);
    }

    #[test]
    fn test_position_distance() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(b.distance_to(&a), 5.0);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_context_post_event_applies_delay() {
        let mut ctx = SimContext::new(42, EntityTracer::disabled());
        ctx.advance_to(SimTime::from_secs(10.0));
        ctx.post_event(
            SimTime::from_secs(5.0),
            vec![EntityId(3)],
            EventPayload::Timer { timer_id: 0 },
        );
        ctx.post_immediate(vec![EntityId(4)], EventPayload::SimulationEnd);

        let pending = ctx.take_pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].time, SimTime::from_secs(15.0));
        assert_eq!(pending[1].time, SimTime::from_secs(10.0));
        assert!(ctx.take_pending().is_empty());
    }

    #[test]
    fn test_context_rng_is_seed_deterministic() {
        use rand::Rng;

        let mut a = SimContext::new(7, EntityTracer::disabled());
        let mut b = SimContext::new(7, EntityTracer::disabled());
        let xs: Vec<u32> = (0..8).map(|_| a.rng().gen()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.rng().gen()).collect();
        assert_eq!(xs, ys);
    }
}
