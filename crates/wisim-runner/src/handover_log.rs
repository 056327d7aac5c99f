//! End-of-run handover bookkeeping.
//!
//! The event loop feeds every handover notification on the schedule into this
//! log. After the run it backs the per-station summary and the optional JSON
//! record file.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tracing::info;
use wisim_common::{ApId, HandoverRecord, NodeId};

/// Handover records in observation order, with per-station counts.
#[derive(Debug, Default)]
pub struct HandoverLog {
    records: Vec<HandoverRecord>,
    per_node: Vec<u64>,
    initial_ap: Vec<Option<ApId>>,
}

impl HandoverLog {
    /// An empty log sized for `node_count` stations.
    pub fn new(node_count: usize) -> Self {
        HandoverLog {
            records: Vec::new(),
            per_node: vec![0; node_count],
            initial_ap: vec![None; node_count],
        }
    }

    /// Note the AP a station associated with at startup.
    pub fn note_association(&mut self, node: NodeId, ap: ApId) {
        if let Some(slot) = self.initial_ap.get_mut(node.index()) {
            *slot = Some(ap);
        }
    }

    /// The AP a station started on, if an association was observed.
    pub fn initial_ap(&self, node: NodeId) -> Option<ApId> {
        self.initial_ap.get(node.index()).copied().flatten()
    }

    /// Append one record. Stations outside the sized range are kept in the
    /// record list but not in the per-station counts.
    pub fn record(&mut self, record: &HandoverRecord) {
        if let Some(count) = self.per_node.get_mut(record.node.index()) {
            *count += 1;
        }
        self.records.push(*record);
    }

    /// All records in the order they were observed.
    pub fn records(&self) -> &[HandoverRecord] {
        &self.records
    }

    /// Total handovers recorded.
    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Handovers recorded for one station.
    pub fn count_for(&self, node: NodeId) -> u64 {
        self.per_node.get(node.index()).copied().unwrap_or(0)
    }

    /// Log a per-station summary at info level.
    pub fn emit_summary(&self) {
        info!(
            "{} handovers across {} stations",
            self.records.len(),
            self.per_node.len()
        );
        for (index, count) in self.per_node.iter().enumerate() {
            match self.initial_ap.get(index).copied().flatten() {
                Some(ap) => info!(
                    "  station {}: started on ap {}, {} handovers",
                    index,
                    ap.index(),
                    count
                ),
                None => info!("  station {}: {} handovers", index, count),
            }
        }
    }

    /// Write the record list to `path` as a JSON array.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        serde_json::to_writer_pretty(&mut file, &self.records)?;
        writeln!(file)?;
        Ok(())
    }
}
