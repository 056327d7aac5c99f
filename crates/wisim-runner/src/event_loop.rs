//! Discrete-event loop driving a simulation to completion.
//!
//! A [`Simulation`] is the assembled form of a scenario: the entities plus the
//! events that seed the schedule. The [`EventLoop`] owns the event queue,
//! assigns event ids in scheduling order, advances simulated time, and
//! dispatches each event to its target entities. Handover notifications
//! passing through the queue are captured in a [`HandoverLog`] for the
//! end-of-run summary.

use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use tracing::{debug, info};
use wisim_common::entity_tracer::EntityTracer;
use wisim_common::{
    Entity, EntityId, Event, EventId, EventPayload, PendingEvent, SimContext, SimError, SimTime,
};
use wisim_metrics::{metric_defs, metrics};

use crate::handover_log::HandoverLog;

/// Events between progress log lines.
const PROGRESS_EVENT_INTERVAL: u64 = 100_000;

/// A scenario assembled into entities and seed events.
pub struct Simulation {
    /// Participants, registered under their entity ids.
    pub entities: Vec<Box<dyn Entity>>,
    /// Events placed on the schedule before the run starts.
    pub initial_events: Vec<PendingEvent>,
    /// Number of mobile stations, for per-station bookkeeping.
    pub node_count: usize,
    /// Time of the end marker. Running until this point drains the scenario.
    pub shutdown_time: SimTime,
}

/// Final counters for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SimulationStats {
    /// Events dispatched, excluding the end marker.
    pub total_events: u64,
    /// Handover notifications observed.
    pub handovers: u64,
    /// Position reports observed.
    pub position_updates: u64,
    /// Simulated time reached when the run stopped, in microseconds.
    pub simulation_time_us: u64,
}

/// Build an event loop with entity tracing disabled.
pub fn create_event_loop(simulation: Simulation, seed: u64) -> EventLoop {
    EventLoop::new(simulation, seed, EntityTracer::disabled())
}

/// The discrete-event scheduler.
///
/// Events with equal timestamps dispatch in scheduling order; the queue
/// breaks time ties on the monotonically assigned event id.
pub struct EventLoop {
    queue: BinaryHeap<Event>,
    entities: HashMap<EntityId, Box<dyn Entity>>,
    ctx: SimContext,
    next_event_id: u64,
    stats: SimulationStats,
    handover_log: HandoverLog,
}

impl EventLoop {
    pub fn new(simulation: Simulation, seed: u64, tracer: EntityTracer) -> Self {
        let node_count = simulation.node_count;
        let mut entities = HashMap::with_capacity(simulation.entities.len());
        for entity in simulation.entities {
            entities.insert(entity.entity_id(), entity);
        }

        let mut event_loop = EventLoop {
            queue: BinaryHeap::new(),
            entities,
            ctx: SimContext::new(seed, tracer),
            next_event_id: 0,
            stats: SimulationStats::default(),
            handover_log: HandoverLog::new(node_count),
        };
        for pending in simulation.initial_events {
            let source = pending.targets.first().copied().unwrap_or(EntityId(0));
            event_loop.schedule(source, pending);
        }
        event_loop
    }

    /// Number of registered entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Handovers recorded so far.
    pub fn handover_log(&self) -> &HandoverLog {
        &self.handover_log
    }

    /// Run until the schedule drains, an end marker pops, or the next event
    /// lies past `until`.
    ///
    /// The end marker stops the loop without being dispatched or counted, so
    /// the final simulated time is the timestamp of the last real event.
    pub fn run(&mut self, until: SimTime) -> Result<SimulationStats, SimError> {
        let started = Instant::now();
        while let Some(event) = self.queue.pop() {
            if event.time > until {
                // Leave it queued; a resumed run picks it up again.
                self.queue.push(event);
                break;
            }
            if matches!(event.payload, EventPayload::SimulationEnd) {
                debug!("end marker reached at {}", event.time);
                break;
            }

            self.ctx.advance_to(event.time);
            self.stats.total_events += 1;
            metrics::counter!(metric_defs::SIM_EVENTS_PROCESSED.name).increment(1);
            self.observe(&event);
            self.dispatch(&event)?;
            metrics::gauge!(metric_defs::SIM_EVENT_QUEUE_DEPTH.name).set(self.queue.len() as f64);

            if self.stats.total_events % PROGRESS_EVENT_INTERVAL == 0 {
                info!(
                    "processed {} events, sim time {:.1}s",
                    self.stats.total_events,
                    self.ctx.time().as_secs_f64()
                );
            }
        }
        self.stats.simulation_time_us = self.ctx.time().as_micros();
        info!(
            "run finished: {} events, {:.3}s simulated, {:.2}s wall clock",
            self.stats.total_events,
            self.ctx.time().as_secs_f64(),
            started.elapsed().as_secs_f64()
        );
        Ok(self.stats)
    }

    /// Loop-level counters for payloads passing through the schedule.
    fn observe(&mut self, event: &Event) {
        match &event.payload {
            EventPayload::Handover(record) => {
                self.stats.handovers += 1;
                self.handover_log.record(record);
            }
            EventPayload::PositionUpdate { .. } => {
                self.stats.position_updates += 1;
            }
            EventPayload::Association { node, ap } => {
                self.handover_log.note_association(*node, *ap);
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, event: &Event) -> Result<(), SimError> {
        for target in &event.targets {
            let entity = self
                .entities
                .get_mut(target)
                .ok_or(SimError::UnknownEntity(*target))?;
            if self.ctx.tracer().is_enabled() {
                self.ctx
                    .tracer()
                    .log_event_received(entity.name(), *target, event.time, event);
            }
            entity.handle_event(event, &mut self.ctx)?;
            for pending in self.ctx.take_pending() {
                self.schedule(*target, pending);
            }
        }
        Ok(())
    }

    fn schedule(&mut self, source: EntityId, pending: PendingEvent) {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        self.queue.push(Event {
            id,
            time: pending.time,
            source,
            targets: pending.targets,
            payload: pending.payload,
        });
    }
}
