//! Entity-level trace logging for simulation debugging.
//!
//! The tracer gives per-entity visibility into a run without turning on
//! global debug logging: pedestrians and the handover engine log received
//! events, state changes, and timer activity, and the tracer filters by
//! entity name or id according to a `--trace` spec.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wisim_common::entity_tracer::{EntityTracer, EntityTracerConfig, TraceEvent};
//!
//! // Trace two entities by name and one by id
//! let config = EntityTracerConfig::from_spec("Walker1,Walker2,entity:7");
//! let tracer = EntityTracer::new(config);
//!
//! if tracer.should_trace_name("Walker1") {
//!     tracer.log(TraceEvent::custom(Some("Walker1"), id, now, "spawned"));
//! }
//! ```

use crate::{EntityId, Event, EventPayload, SimTime};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Trace Event Types
// ============================================================================

/// Categories of trace events for filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceCategory {
    /// Event received by entity.
    EventReceived,
    /// Event emitted by entity.
    EventEmitted,
    /// State change within entity.
    StateChange,
    /// Entity-specific operation (movement step, handover evaluation, ...).
    Operation,
    /// Timer scheduled or fired.
    Timer,
    /// Custom/debug trace point.
    Custom,
}

impl fmt::Display for TraceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceCategory::EventReceived => write!(f, "EVENT_RX"),
            TraceCategory::EventEmitted => write!(f, "EVENT_TX"),
            TraceCategory::StateChange => write!(f, "STATE"),
            TraceCategory::Operation => write!(f, "OP"),
            TraceCategory::Timer => write!(f, "TIMER"),
            TraceCategory::Custom => write!(f, "TRACE"),
        }
    }
}

/// A trace event record.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    /// Name of the entity (if available).
    pub entity_name: Option<String>,
    /// Entity ID.
    pub entity_id: EntityId,
    /// Simulation time when the event occurred.
    pub sim_time: SimTime,
    /// Category of the trace event.
    pub category: TraceCategory,
    /// Human-readable description.
    pub description: String,
    /// Optional additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl TraceEvent {
    /// Create a trace event for an event being received.
    pub fn event_received(
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        event: &Event,
    ) -> Self {
        let (desc, details) = describe_event_payload(&event.payload);
        TraceEvent {
            entity_name: entity_name.map(|s| s.to_string()),
            entity_id,
            sim_time,
            category: TraceCategory::EventReceived,
            description: desc,
            details,
        }
    }

    /// Create a trace event for an event being emitted.
    pub fn event_emitted(
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        event: &Event,
    ) -> Self {
        let (desc, details) = describe_event_payload(&event.payload);
        let mut all_details = details;
        all_details.push(("targets".to_string(), format!("{:?}", event.targets)));
        all_details.push((
            "delay_us".to_string(),
            format!("{}", event.time.as_micros() - sim_time.as_micros()),
        ));
        TraceEvent {
            entity_name: entity_name.map(|s| s.to_string()),
            entity_id,
            sim_time,
            category: TraceCategory::EventEmitted,
            description: desc,
            details: all_details,
        }
    }

    /// Create a state change trace event.
    pub fn state_change(
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        description: impl Into<String>,
    ) -> Self {
        TraceEvent {
            entity_name: entity_name.map(|s| s.to_string()),
            entity_id,
            sim_time,
            category: TraceCategory::StateChange,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Create a state change trace event with details.
    pub fn state_change_with_details(
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        description: impl Into<String>,
        details: Vec<(String, String)>,
    ) -> Self {
        TraceEvent {
            entity_name: entity_name.map(|s| s.to_string()),
            entity_id,
            sim_time,
            category: TraceCategory::StateChange,
            description: description.into(),
            details,
        }
    }

    /// Create an operation trace event.
    pub fn operation(
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        description: impl Into<String>,
    ) -> Self {
        TraceEvent {
            entity_name: entity_name.map(|s| s.to_string()),
            entity_id,
            sim_time,
            category: TraceCategory::Operation,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Create an operation trace event with details.
    pub fn operation_with_details(
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        description: impl Into<String>,
        details: Vec<(String, String)>,
    ) -> Self {
        TraceEvent {
            entity_name: entity_name.map(|s| s.to_string()),
            entity_id,
            sim_time,
            category: TraceCategory::Operation,
            description: description.into(),
            details,
        }
    }

    /// Create a timer trace event.
    pub fn timer(
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        description: impl Into<String>,
    ) -> Self {
        TraceEvent {
            entity_name: entity_name.map(|s| s.to_string()),
            entity_id,
            sim_time,
            category: TraceCategory::Timer,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Create a custom trace event.
    pub fn custom(
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        description: impl Into<String>,
    ) -> Self {
        TraceEvent {
            entity_name: entity_name.map(|s| s.to_string()),
            entity_id,
            sim_time,
            category: TraceCategory::Custom,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Add a detail to this event.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }
}

/// Describe an event payload for tracing.
fn describe_event_payload(payload: &EventPayload) -> (String, Vec<(String, String)>) {
    match payload {
        EventPayload::Timer { timer_id } => (
            "Timer".to_string(),
            vec![("timer_id".to_string(), format!("{}", timer_id))],
        ),
        EventPayload::PositionUpdate { node, position } => (
            "PositionUpdate".to_string(),
            vec![
                ("node".to_string(), format!("{}", node)),
                ("x".to_string(), format!("{:.2}", position.x)),
                ("y".to_string(), format!("{:.2}", position.y)),
            ],
        ),
        EventPayload::Association { node, ap } => (
            "Association".to_string(),
            vec![
                ("node".to_string(), format!("{}", node)),
                ("ap".to_string(), format!("{}", ap)),
            ],
        ),
        EventPayload::Handover(record) => (
            "Handover".to_string(),
            vec![
                ("node".to_string(), format!("{}", record.node)),
                ("from_ap".to_string(), format!("{}", record.from_ap)),
                ("to_ap".to_string(), format!("{}", record.to_ap)),
            ],
        ),
        EventPayload::SimulationEnd => ("SimulationEnd".to_string(), Vec::new()),
    }
}

// ============================================================================
// Tracer Configuration
// ============================================================================

/// Configuration for entity tracing.
#[derive(Debug, Clone)]
pub struct EntityTracerConfig {
    /// Entity names to trace. If empty and ids is empty, no tracing is done.
    pub traced_names: HashSet<String>,
    /// Entity IDs to trace (for entities without names or for precise targeting).
    pub traced_ids: HashSet<u64>,
    /// Categories to trace. If empty, all categories are traced.
    pub traced_categories: HashSet<TraceCategory>,
}

impl EntityTracerConfig {
    /// Create a new empty config (no tracing).
    pub fn none() -> Self {
        EntityTracerConfig {
            traced_names: HashSet::new(),
            traced_ids: HashSet::new(),
            traced_categories: HashSet::new(),
        }
    }

    /// Create a tracer config from a specification string.
    ///
    /// The spec format is a comma-separated list of:
    /// - Entity names (e.g., "Walker1", "handover-engine")
    /// - Entity IDs prefixed with "entity:" (e.g., "entity:42")
    /// - Special values: "*" traces all entities
    pub fn from_spec(spec: &str) -> Self {
        if spec.is_empty() {
            return Self::none();
        }

        let mut traced_names = HashSet::new();
        let mut traced_ids = HashSet::new();

        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if part == "*" {
                // Wildcard entry traces everything
                traced_names.insert("*".to_string());
            } else if let Some(id_str) = part.strip_prefix("entity:") {
                if let Ok(id) = id_str.parse::<u64>() {
                    traced_ids.insert(id);
                }
            } else {
                traced_names.insert(part.to_string());
            }
        }

        EntityTracerConfig {
            traced_names,
            traced_ids,
            traced_categories: HashSet::new(), // Trace all categories by default
        }
    }

    /// Check if tracing is enabled at all.
    pub fn is_enabled(&self) -> bool {
        !self.traced_names.is_empty() || !self.traced_ids.is_empty()
    }

    /// Check if all entities should be traced.
    pub fn traces_all(&self) -> bool {
        self.traced_names.contains("*")
    }

    /// Check if a specific entity name should be traced.
    pub fn should_trace_name(&self, name: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.traces_all() || self.traced_names.contains(name)
    }

    /// Check if a specific entity ID should be traced.
    pub fn should_trace_id(&self, id: EntityId) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.traces_all() || self.traced_ids.contains(&id.0)
    }

    /// Check if an entity should be traced (by name or ID).
    pub fn should_trace(&self, name: Option<&str>, id: EntityId) -> bool {
        if !self.is_enabled() {
            return false;
        }
        if self.traces_all() {
            return true;
        }
        if let Some(n) = name {
            if self.traced_names.contains(n) {
                return true;
            }
        }
        self.traced_ids.contains(&id.0)
    }

    /// Check if a category should be traced.
    pub fn should_trace_category(&self, category: TraceCategory) -> bool {
        self.traced_categories.is_empty() || self.traced_categories.contains(&category)
    }

    /// Add a category filter.
    pub fn with_category(mut self, category: TraceCategory) -> Self {
        self.traced_categories.insert(category);
        self
    }
}

impl Default for EntityTracerConfig {
    fn default() -> Self {
        Self::none()
    }
}

// ============================================================================
// Entity Tracer
// ============================================================================

/// Entity tracer that logs detailed entity behavior to stderr.
///
/// Cheap to clone; clones share the same configuration.
#[derive(Clone)]
pub struct EntityTracer {
    config: Arc<EntityTracerConfig>,
}

impl EntityTracer {
    /// Create a new entity tracer with the given configuration.
    pub fn new(config: EntityTracerConfig) -> Self {
        EntityTracer {
            config: Arc::new(config),
        }
    }

    /// Create a tracer that does no tracing.
    pub fn disabled() -> Self {
        EntityTracer::new(EntityTracerConfig::none())
    }

    /// Check if tracing is enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Check if a specific entity should be traced (by name).
    pub fn should_trace_name(&self, name: &str) -> bool {
        self.config.should_trace_name(name)
    }

    /// Check if a specific entity should be traced (by ID).
    pub fn should_trace_id(&self, id: EntityId) -> bool {
        self.config.should_trace_id(id)
    }

    /// Check if an entity should be traced (by name or ID).
    pub fn should_trace(&self, name: Option<&str>, id: EntityId) -> bool {
        self.config.should_trace(name, id)
    }

    /// Get the tracer configuration.
    pub fn config(&self) -> &EntityTracerConfig {
        &self.config
    }

    /// Log a trace event.
    pub fn log(&self, event: TraceEvent) {
        if !self.config.should_trace(event.entity_name.as_deref(), event.entity_id) {
            return;
        }
        if !self.config.should_trace_category(event.category) {
            return;
        }
        self.output_trace(&event);
    }

    /// Log that an entity is handling an event.
    pub fn log_event_received(
        &self,
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        event: &Event,
    ) {
        if !self.config.should_trace(entity_name, entity_id) {
            return;
        }
        self.log(TraceEvent::event_received(entity_name, entity_id, sim_time, event));
    }

    /// Log that an entity is emitting an event.
    pub fn log_event_emitted(
        &self,
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        event: &Event,
    ) {
        if !self.config.should_trace(entity_name, entity_id) {
            return;
        }
        self.log(TraceEvent::event_emitted(entity_name, entity_id, sim_time, event));
    }

    /// Log a state change.
    pub fn log_state_change(
        &self,
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        description: impl Into<String>,
    ) {
        if !self.config.should_trace(entity_name, entity_id) {
            return;
        }
        self.log(TraceEvent::state_change(entity_name, entity_id, sim_time, description));
    }

    /// Log an operation.
    pub fn log_operation(
        &self,
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        description: impl Into<String>,
    ) {
        if !self.config.should_trace(entity_name, entity_id) {
            return;
        }
        self.log(TraceEvent::operation(entity_name, entity_id, sim_time, description));
    }

    /// Log an operation with details.
    pub fn log_operation_with_details(
        &self,
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        description: impl Into<String>,
        details: Vec<(String, String)>,
    ) {
        if !self.config.should_trace(entity_name, entity_id) {
            return;
        }
        self.log(TraceEvent::operation_with_details(
            entity_name,
            entity_id,
            sim_time,
            description,
            details,
        ));
    }

    /// Log a scheduled timer.
    pub fn log_timer_scheduled(
        &self,
        entity_name: Option<&str>,
        entity_id: EntityId,
        sim_time: SimTime,
        timer_id: u64,
        delay_ms: u64,
    ) {
        if !self.config.should_trace(entity_name, entity_id) {
            return;
        }
        self.log(TraceEvent::timer(
            entity_name,
            entity_id,
            sim_time,
            format!("SCHEDULED timer_id={} delay={}ms", timer_id, delay_ms),
        ));
    }

    /// Format and output a trace event.
    fn output_trace(&self, event: &TraceEvent) {
        let time_ms = event.sim_time.as_micros() as f64 / 1000.0;

        let entity_str = if let Some(ref name) = event.entity_name {
            format!("{} (entity={})", name, event.entity_id.0)
        } else {
            format!("entity={}", event.entity_id.0)
        };

        let details_str = if event.details.is_empty() {
            String::new()
        } else {
            let detail_parts: Vec<String> = event
                .details
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!(" [{}]", detail_parts.join(", "))
        };

        eprintln!(
            "[TRACE] {} @ {:.3}ms: {} {}{}",
            entity_str, time_ms, event.category, event.description, details_str
        );
    }
}

impl Default for EntityTracer {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeId, Position};

    #[test]
    fn test_config_from_spec_empty() {
        let config = EntityTracerConfig::from_spec("");
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_config_from_spec_names() {
        let config = EntityTracerConfig::from_spec("Walker1,Walker2");
        assert!(config.is_enabled());
        assert!(config.should_trace_name("Walker1"));
        assert!(config.should_trace_name("Walker2"));
        assert!(!config.should_trace_name("Walker3"));
    }

    #[test]
    fn test_config_from_spec_ids() {
        let config = EntityTracerConfig::from_spec("entity:1,entity:2");
        assert!(config.is_enabled());
        assert!(config.should_trace_id(EntityId::new(1)));
        assert!(config.should_trace_id(EntityId::new(2)));
        assert!(!config.should_trace_id(EntityId::new(3)));
    }

    #[test]
    fn test_config_from_spec_mixed() {
        let config = EntityTracerConfig::from_spec("Walker1,entity:42,handover-engine");
        assert!(config.is_enabled());
        assert!(config.should_trace_name("Walker1"));
        assert!(config.should_trace_name("handover-engine"));
        assert!(config.should_trace_id(EntityId::new(42)));
        assert!(!config.should_trace_name("Walker9"));
        assert!(!config.should_trace_id(EntityId::new(1)));
    }

    #[test]
    fn test_config_from_spec_all() {
        let config = EntityTracerConfig::from_spec("*");
        assert!(config.is_enabled());
        assert!(config.traces_all());
        assert!(config.should_trace_name("AnyName"));
        assert!(config.should_trace_id(EntityId::new(999)));
    }

    #[test]
    fn test_tracer_should_trace() {
        let config = EntityTracerConfig::from_spec("Walker1,entity:42");
        let tracer = EntityTracer::new(config);

        assert!(tracer.should_trace(Some("Walker1"), EntityId::new(1)));
        assert!(tracer.should_trace(Some("Walker2"), EntityId::new(42)));
        assert!(tracer.should_trace(None, EntityId::new(42)));
        assert!(!tracer.should_trace(Some("Walker2"), EntityId::new(1)));
    }

    #[test]
    fn test_describe_position_update() {
        let (desc, details) = describe_event_payload(&EventPayload::PositionUpdate {
            node: NodeId(3),
            position: Position::new(12.5, 4.25),
        });
        assert_eq!(desc, "PositionUpdate");
        assert!(details.contains(&("node".to_string(), "3".to_string())));
        assert!(details.contains(&("x".to_string(), "12.50".to_string())));
    }
}
