//! Metrics infrastructure for the wisim simulator.
//!
//! This crate provides metric label helpers and describes all metrics used in
//! the simulator. It re-exports the `metrics` crate for convenience and
//! defines all metrics as structured [`Metric`] constants to avoid typos and
//! provide rich metadata.
//!
//! # Example
//!
//! ```rust,ignore
//! use wisim_metrics::{MetricLabels, metric_defs, describe_metrics};
//!
//! // Initialize metrics descriptions at startup
//! describe_metrics();
//!
//! // Create labels for a station
//! let labels = MetricLabels::new("walker-3", "pedestrian")
//!     .with_scenario("indoor-handover");
//!
//! // Use labels with metrics
//! metrics::counter!(metric_defs::HANDOVER_COUNT.name, &labels.to_labels()).increment(1);
//! ```
//!
//! # Metric Type
//!
//! The [`Metric`] type provides a structured way to declare metrics with
//! their metadata:
//!
//! ```rust
//! use wisim_metrics::{Metric, MetricKind};
//! use metrics::Unit;
//!
//! const MY_COUNTER: Metric = Metric::counter("my.counter")
//!     .with_description("A counter metric")
//!     .with_unit(Unit::Count)
//!     .with_labels(&["node", "direction"]);
//!
//! // Register the metric description
//! MY_COUNTER.describe();
//!
//! // Use with metrics crate
//! metrics::counter!(MY_COUNTER.name).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// Declares a metric's name, kind, description, unit, and expected labels in
/// one place. Use the const constructors to create metrics at compile time.
///
/// # Example
///
/// ```rust
/// use wisim_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const HANDOVERS: Metric = Metric::counter("wisim.handover.count")
///     .with_description("Completed handovers")
///     .with_unit(Unit::Count)
///     .with_labels(&["node", "node_type"]);
///
/// assert_eq!(HANDOVERS.name, "wisim.handover.count");
/// assert_eq!(HANDOVERS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "wisim.handover.count").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    ///
    /// This should be called once at startup for each metric.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }

    /// Returns the unit as a human-readable string.
    pub fn unit_str(&self) -> &'static str {
        match self.unit {
            Some(Unit::Count) => "count",
            Some(Unit::Percent) => "percent",
            Some(Unit::Seconds) => "seconds",
            Some(Unit::Milliseconds) => "milliseconds",
            Some(Unit::Microseconds) => "microseconds",
            Some(Unit::Nanoseconds) => "nanoseconds",
            Some(Unit::Tebibytes) => "tebibytes",
            Some(Unit::Gibibytes) => "gibibytes",
            Some(Unit::Mebibytes) => "mebibytes",
            Some(Unit::Kibibytes) => "kibibytes",
            Some(Unit::Bytes) => "bytes",
            Some(Unit::TerabitsPerSecond) => "terabits/second",
            Some(Unit::GigabitsPerSecond) => "gigabits/second",
            Some(Unit::MegabitsPerSecond) => "megabits/second",
            Some(Unit::KilobitsPerSecond) => "kilobits/second",
            Some(Unit::BitsPerSecond) => "bits/second",
            Some(Unit::CountPerSecond) => "count/second",
            None => "",
        }
    }
}

/// All metric definitions for the simulator.
///
/// Each metric is defined as a const [`Metric`] with its name, kind,
/// description, unit, and expected labels.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Standard Label Keys
    // ========================================================================

    /// Standard labels present on all node-scoped metrics.
    pub const STANDARD_LABELS: &[&str] = &["node", "node_type"];

    /// Labels carried by handover transition counters.
    pub const HANDOVER_LABELS: &[&str] = &["node", "node_type", "from_ap", "to_ap"];

    // ========================================================================
    // Handover Metrics
    // ========================================================================

    /// Completed handovers.
    ///
    /// Labels: node, node_type, from_ap, to_ap
    pub const HANDOVER_COUNT: Metric = Metric::counter("wisim.handover.count")
        .with_description("Completed handovers")
        .with_unit(Unit::Count)
        .with_labels(HANDOVER_LABELS);

    /// RSSI improvement at the moment a handover fired, in dB.
    ///
    /// Labels: node, node_type
    pub const HANDOVER_RSSI_DELTA: Metric = Metric::histogram("wisim.handover.rssi_delta_db")
        .with_description("RSSI improvement over the previous AP at handover, in dB")
        .with_labels(STANDARD_LABELS);

    /// Evaluations where a better AP was available but the cooldown window
    /// suppressed the transition.
    ///
    /// Labels: node, node_type
    pub const HANDOVER_SUPPRESSED: Metric =
        Metric::counter("wisim.handover.suppressed_cooldown")
            .with_description("Handover candidates suppressed by an active cooldown")
            .with_unit(Unit::Count)
            .with_labels(STANDARD_LABELS);

    // ========================================================================
    // Mobility Metrics
    // ========================================================================

    /// Position updates delivered to the handover engine.
    ///
    /// Labels: node, node_type
    pub const MOBILITY_POSITION_UPDATES: Metric =
        Metric::counter("wisim.mobility.position_updates")
            .with_description("Position updates delivered to the handover engine")
            .with_unit(Unit::Count)
            .with_labels(STANDARD_LABELS);

    /// Distance covered per movement step, in meters.
    ///
    /// Labels: node, node_type
    pub const MOBILITY_STEP_DISTANCE: Metric =
        Metric::histogram("wisim.mobility.step_distance_m")
            .with_description("Distance covered per movement step, in meters")
            .with_labels(STANDARD_LABELS);

    // ========================================================================
    // Scenario Metrics
    // ========================================================================

    /// Features retained when parsing the scenario document.
    pub const SCENARIO_FEATURES_PARSED: Metric =
        Metric::counter("wisim.scenario.features_parsed")
            .with_description("Features retained when parsing the scenario document")
            .with_unit(Unit::Count);

    /// Features dropped when parsing the scenario document.
    pub const SCENARIO_FEATURES_DROPPED: Metric =
        Metric::counter("wisim.scenario.features_dropped")
            .with_description("Features dropped when parsing the scenario document")
            .with_unit(Unit::Count);

    // ========================================================================
    // Simulation Performance
    // ========================================================================

    /// Events processed by the event loop.
    pub const SIM_EVENTS_PROCESSED: Metric = Metric::counter("wisim.sim.events_processed")
        .with_description("Events processed by the event loop")
        .with_unit(Unit::Count);

    /// Current depth of the event queue.
    pub const SIM_EVENT_QUEUE_DEPTH: Metric = Metric::gauge("wisim.sim.event_queue_depth")
        .with_description("Current depth of the event queue")
        .with_unit(Unit::Count);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        // Handover
        &HANDOVER_COUNT,
        &HANDOVER_RSSI_DELTA,
        &HANDOVER_SUPPRESSED,
        // Mobility
        &MOBILITY_POSITION_UPDATES,
        &MOBILITY_STEP_DISTANCE,
        // Scenario
        &SCENARIO_FEATURES_PARSED,
        &SCENARIO_FEATURES_DROPPED,
        // Simulation Performance
        &SIM_EVENTS_PROCESSED,
        &SIM_EVENT_QUEUE_DEPTH,
    ];
}

/// Metric labels identifying a node and, optionally, the running scenario.
///
/// # Example
///
/// ```rust
/// use wisim_metrics::MetricLabels;
///
/// let labels = MetricLabels::new("walker-3", "pedestrian")
///     .with_scenario("indoor-handover");
///
/// let label_vec = labels.to_labels();
/// assert_eq!(label_vec.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MetricLabels {
    /// Individual node identifier.
    pub node: String,
    /// Type of node (pedestrian, engine, collector).
    pub node_type: String,
    /// Scenario the run was started with.
    pub scenario: Option<String>,
}

impl MetricLabels {
    /// Creates new labels for the given node and node type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use wisim_metrics::MetricLabels;
    ///
    /// let labels = MetricLabels::new("walker-0", "pedestrian");
    /// assert_eq!(labels.node, "walker-0");
    /// assert_eq!(labels.node_type, "pedestrian");
    /// ```
    pub fn new(node: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            node_type: node_type.into(),
            scenario: None,
        }
    }

    /// Tags the labels with the running scenario name.
    ///
    /// # Example
    ///
    /// ```rust
    /// use wisim_metrics::MetricLabels;
    ///
    /// let labels = MetricLabels::new("walker-0", "pedestrian")
    ///     .with_scenario("gauss-markov");
    /// assert_eq!(labels.scenario.as_deref(), Some("gauss-markov"));
    /// ```
    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    /// Converts the labels to the metrics crate label format.
    ///
    /// # Example
    ///
    /// ```rust
    /// use wisim_metrics::MetricLabels;
    ///
    /// let labels = MetricLabels::new("walker-0", "pedestrian");
    /// let label_vec = labels.to_labels();
    ///
    /// assert!(label_vec.iter().any(|(k, v)| *k == "node" && v == "walker-0"));
    /// assert!(label_vec.iter().any(|(k, v)| *k == "node_type" && v == "pedestrian"));
    /// ```
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        let mut labels = vec![
            ("node", self.node.clone()),
            ("node_type", self.node_type.clone()),
        ];

        if let Some(ref scenario) = self.scenario {
            labels.push(("scenario", scenario.clone()));
        }

        labels
    }

    /// Returns labels with additional key-value pairs.
    ///
    /// # Example
    ///
    /// ```rust
    /// use wisim_metrics::MetricLabels;
    ///
    /// let labels = MetricLabels::new("walker-0", "pedestrian");
    /// let extended = labels.with(&[("from_ap", "0".to_string())]);
    ///
    /// assert!(extended.iter().any(|(k, v)| *k == "from_ap" && v == "0"));
    /// ```
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all metrics used in the simulator.
///
/// Call once at startup, after installing the metrics recorder, to register
/// every metric description.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
