//! In-memory metrics collection and JSON export.
//!
//! [`InMemoryRecorder`] implements the `metrics` facade's [`Recorder`] and
//! keeps every series in process memory. A [`MetricsSnapshot`] taken after
//! the run carries totals per metric name plus a per-station breakdown built
//! from the `node` label, and serializes to pretty JSON.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use parking_lot::RwLock;

/// Metric values attributed to one station via the `node` label.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct NodeMetrics {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub gauges: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub histograms: BTreeMap<String, HistogramSummary>,
}

/// Everything collected during a run, ready for export.
#[derive(Debug, serde::Serialize)]
pub struct MetricsSnapshot {
    /// RFC 3339 capture time.
    pub timestamp: String,
    /// Counter totals summed across label sets.
    pub counters: BTreeMap<String, u64>,
    /// Last written gauge values.
    pub gauges: BTreeMap<String, f64>,
    /// Histogram summaries over all samples of each metric.
    pub histograms: BTreeMap<String, HistogramSummary>,
    /// Per-station breakdown, keyed by the `node` label value.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub nodes: BTreeMap<String, NodeMetrics>,
}

/// Summary statistics for one histogram series.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

/// Write a snapshot as pretty JSON followed by a newline.
pub fn export_json<W: Write>(snapshot: &MetricsSnapshot, writer: &mut W) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, snapshot)?;
    writeln!(writer)?;
    Ok(())
}

#[derive(Debug, Default)]
struct CounterCell {
    value: AtomicU64,
}

impl CounterCell {
    fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Gauge value stored as raw f64 bits so the cell stays lock-free.
#[derive(Debug, Default)]
struct GaugeCell {
    bits: AtomicU64,
}

impl GaugeCell {
    fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, delta: f64) {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Raw samples. Runs are finite and histogram traffic is a few entries per
/// station per tick, so the vector stays small.
#[derive(Debug, Default)]
struct HistogramCell {
    samples: RwLock<Vec<f64>>,
}

impl HistogramCell {
    fn record(&self, value: f64) {
        self.samples.write().push(value);
    }

    fn samples(&self) -> Vec<f64> {
        self.samples.read().clone()
    }
}

/// Name and labels behind one registered series key.
#[derive(Debug, Clone)]
struct SeriesMeta {
    name: String,
    labels: Vec<(String, String)>,
}

impl SeriesMeta {
    fn from_key(key: &Key) -> Self {
        SeriesMeta {
            name: key.name().to_string(),
            labels: key
                .labels()
                .map(|label| (label.key().to_string(), label.value().to_string()))
                .collect(),
        }
    }

    fn node(&self) -> Option<&str> {
        self.labels
            .iter()
            .find(|(key, _)| key == "node")
            .map(|(_, value)| value.as_str())
    }
}

/// Flatten a key into a stable registry string: `name` or `name|k=v,k=v`.
fn series_key(key: &Key) -> String {
    let labels: Vec<String> = key
        .labels()
        .map(|label| format!("{}={}", label.key(), label.value()))
        .collect();
    if labels.is_empty() {
        key.name().to_string()
    } else {
        format!("{}|{}", key.name(), labels.join(","))
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    counters: RwLock<BTreeMap<String, Arc<CounterCell>>>,
    gauges: RwLock<BTreeMap<String, Arc<GaugeCell>>>,
    histograms: RwLock<BTreeMap<String, Arc<HistogramCell>>>,
    series: RwLock<BTreeMap<String, SeriesMeta>>,
}

impl RecorderState {
    fn counter_cell(&self, key: &Key) -> Arc<CounterCell> {
        let key_str = series_key(key);
        if let Some(cell) = self.counters.read().get(&key_str) {
            return cell.clone();
        }
        self.series
            .write()
            .entry(key_str.clone())
            .or_insert_with(|| SeriesMeta::from_key(key));
        self.counters.write().entry(key_str).or_default().clone()
    }

    fn gauge_cell(&self, key: &Key) -> Arc<GaugeCell> {
        let key_str = series_key(key);
        if let Some(cell) = self.gauges.read().get(&key_str) {
            return cell.clone();
        }
        self.series
            .write()
            .entry(key_str.clone())
            .or_insert_with(|| SeriesMeta::from_key(key));
        self.gauges.write().entry(key_str).or_default().clone()
    }

    fn histogram_cell(&self, key: &Key) -> Arc<HistogramCell> {
        let key_str = series_key(key);
        if let Some(cell) = self.histograms.read().get(&key_str) {
            return cell.clone();
        }
        self.series
            .write()
            .entry(key_str.clone())
            .or_insert_with(|| SeriesMeta::from_key(key));
        self.histograms.write().entry(key_str).or_default().clone()
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let series = self.series.read();

        let mut counters: BTreeMap<String, u64> = BTreeMap::new();
        let mut gauges: BTreeMap<String, f64> = BTreeMap::new();
        let mut histogram_samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut nodes: BTreeMap<String, NodeMetrics> = BTreeMap::new();

        for (key_str, cell) in self.counters.read().iter() {
            if let Some(meta) = series.get(key_str) {
                let value = cell.get();
                *counters.entry(meta.name.clone()).or_insert(0) += value;
                if let Some(node) = meta.node() {
                    let entry = nodes.entry(node.to_string()).or_default();
                    *entry.counters.entry(meta.name.clone()).or_insert(0) += value;
                }
            }
        }

        for (key_str, cell) in self.gauges.read().iter() {
            if let Some(meta) = series.get(key_str) {
                let value = cell.get();
                gauges.insert(meta.name.clone(), value);
                if let Some(node) = meta.node() {
                    nodes
                        .entry(node.to_string())
                        .or_default()
                        .gauges
                        .insert(meta.name.clone(), value);
                }
            }
        }

        for (key_str, cell) in self.histograms.read().iter() {
            if let Some(meta) = series.get(key_str) {
                let samples = cell.samples();
                if let Some(node) = meta.node() {
                    nodes
                        .entry(node.to_string())
                        .or_default()
                        .histograms
                        .insert(meta.name.clone(), summarize(&samples));
                }
                histogram_samples
                    .entry(meta.name.clone())
                    .or_default()
                    .extend(samples);
            }
        }

        let histograms = histogram_samples
            .into_iter()
            .map(|(name, samples)| {
                let summary = summarize(&samples);
                (name, summary)
            })
            .collect();

        MetricsSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            counters,
            gauges,
            histograms,
            nodes,
        }
    }
}

fn summarize(samples: &[f64]) -> HistogramSummary {
    if samples.is_empty() {
        return HistogramSummary {
            count: 0,
            sum: 0.0,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            p50: 0.0,
            p90: 0.0,
            p99: 0.0,
        };
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = sorted.len() as u64;
    let sum: f64 = sorted.iter().sum();
    let percentile = |p: f64| -> f64 {
        let index = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[index.min(sorted.len() - 1)]
    };

    HistogramSummary {
        count,
        sum,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean: sum / count as f64,
        p50: percentile(50.0),
        p90: percentile(90.0),
        p99: percentile(99.0),
    }
}

/// A `metrics` recorder backed by in-process registries.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecorder {
    state: Arc<RecorderState>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        InMemoryRecorder {
            state: Arc::new(RecorderState::default()),
        }
    }

    /// Capture current values of every series.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.state.snapshot()
    }
}

struct CounterHandle {
    cell: Arc<CounterCell>,
}

impl metrics::CounterFn for CounterHandle {
    fn increment(&self, value: u64) {
        self.cell.add(value);
    }

    fn absolute(&self, value: u64) {
        self.cell.set(value);
    }
}

struct GaugeHandle {
    cell: Arc<GaugeCell>,
}

impl metrics::GaugeFn for GaugeHandle {
    fn increment(&self, value: f64) {
        self.cell.add(value);
    }

    fn decrement(&self, value: f64) {
        self.cell.add(-value);
    }

    fn set(&self, value: f64) {
        self.cell.set(value);
    }
}

struct HistogramHandle {
    cell: Arc<HistogramCell>,
}

impl metrics::HistogramFn for HistogramHandle {
    fn record(&self, value: f64) {
        self.cell.record(value);
    }
}

impl Recorder for InMemoryRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        let cell = self.state.counter_cell(key);
        Counter::from_arc(Arc::new(CounterHandle { cell }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        let cell = self.state.gauge_cell(key);
        Gauge::from_arc(Arc::new(GaugeHandle { cell }))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        let cell = self.state.histogram_cell(key);
        Histogram::from_arc(Arc::new(HistogramHandle { cell }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics::Label;

    fn station_key(name: &'static str, station: &'static str) -> Key {
        Key::from_parts(
            name,
            vec![
                Label::new("node", station),
                Label::new("node_type", "pedestrian"),
            ],
        )
    }

    #[test]
    fn test_counter_cells_are_shared_per_key() {
        let recorder = InMemoryRecorder::new();
        let key = Key::from_static_name("wisim.sim.events_processed");
        recorder.state.counter_cell(&key).add(5);
        recorder.state.counter_cell(&key).add(3);

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.counters.get("wisim.sim.events_processed"), Some(&8));
        assert!(snapshot.nodes.is_empty());
    }

    #[test]
    fn test_counter_sums_across_stations() {
        let recorder = InMemoryRecorder::new();
        recorder
            .state
            .counter_cell(&station_key("wisim.handover.count", "walker-0"))
            .add(3);
        recorder
            .state
            .counter_cell(&station_key("wisim.handover.count", "walker-1"))
            .add(2);

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.counters.get("wisim.handover.count"), Some(&5));
        assert_eq!(
            snapshot.nodes["walker-0"].counters["wisim.handover.count"],
            3
        );
        assert_eq!(
            snapshot.nodes["walker-1"].counters["wisim.handover.count"],
            2
        );
    }

    #[test]
    fn test_gauge_operations() {
        let recorder = InMemoryRecorder::new();
        let key = Key::from_static_name("wisim.sim.event_queue_depth");
        let gauge = recorder.state.gauge_cell(&key);
        gauge.set(10.0);
        gauge.add(5.0);
        gauge.add(-2.0);

        let snapshot = recorder.snapshot();
        assert_eq!(
            snapshot.gauges.get("wisim.sim.event_queue_depth"),
            Some(&13.0)
        );
    }

    #[test]
    fn test_histogram_summary_percentiles() {
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();
        let summary = summarize(&samples);

        assert_eq!(summary.count, 100);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 100.0);
        assert_eq!(summary.sum, 5050.0);
        assert!((summary.mean - 50.5).abs() < f64::EPSILON);
        // Index rounding leaves a sample of slack around each percentile.
        assert!((summary.p50 - 50.0).abs() < 2.0);
        assert!((summary.p90 - 90.0).abs() < 2.0);
        assert!((summary.p99 - 99.0).abs() < 2.0);
    }

    #[test]
    fn test_histograms_merge_across_stations() {
        let recorder = InMemoryRecorder::new();
        recorder
            .state
            .histogram_cell(&station_key("wisim.handover.rssi_delta_db", "walker-0"))
            .record(6.0);
        recorder
            .state
            .histogram_cell(&station_key("wisim.handover.rssi_delta_db", "walker-1"))
            .record(8.0);

        let snapshot = recorder.snapshot();
        let merged = &snapshot.histograms["wisim.handover.rssi_delta_db"];
        assert_eq!(merged.count, 2);
        assert_eq!(merged.min, 6.0);
        assert_eq!(merged.max, 8.0);
        let per_station = &snapshot.nodes["walker-0"].histograms["wisim.handover.rssi_delta_db"];
        assert_eq!(per_station.count, 1);
    }

    #[test]
    fn test_empty_histogram_summary_is_zeroed() {
        let summary = summarize(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.p99, 0.0);
    }

    #[test]
    fn test_export_json_shape() {
        let recorder = InMemoryRecorder::new();
        recorder
            .state
            .counter_cell(&Key::from_static_name("wisim.sim.events_processed"))
            .add(7);

        let mut buffer = Vec::new();
        export_json(&recorder.snapshot(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.ends_with('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["counters"]["wisim.sim.events_processed"], 7);
        assert!(parsed["timestamp"].as_str().is_some());
    }
}
