//! Export run statistics.
//!
//! Counts per-table outcomes so the end of a run can report what was written,
//! what had no metadata, and what failed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;
use strum::IntoEnumIterator;

use super::types::OutcomeType;

/// Outcome counters for one export run.
///
/// All outcome types are initialized to zero on creation. Counters are atomic so
/// the tracker can be shared by reference without `&mut`.
pub struct ExportStats {
    outcomes: HashMap<OutcomeType, AtomicUsize>,
}

impl ExportStats {
    pub fn new() -> Self {
        let mut outcomes = HashMap::new();
        for outcome in OutcomeType::iter() {
            outcomes.insert(outcome, AtomicUsize::new(0));
        }
        ExportStats { outcomes }
    }

    /// Increment an outcome counter.
    pub fn increment(&self, outcome: OutcomeType) {
        if let Some(counter) = self.outcomes.get(&outcome) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for {:?} which is not in the map. \
                 This indicates a bug in ExportStats initialization.",
                outcome
            );
        }
    }

    /// Get the count for an outcome type.
    pub fn get_count(&self, outcome: OutcomeType) -> usize {
        self.outcomes
            .get(&outcome)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Tables written successfully, in either shape.
    pub fn total_exported(&self) -> usize {
        self.get_count(OutcomeType::RowMajorExport) + self.get_count(OutcomeType::TransposedExport)
    }

    /// Tables that failed.
    pub fn total_failed(&self) -> usize {
        self.get_count(OutcomeType::TableFailed)
    }
}

impl Default for ExportStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs every non-zero outcome counter.
pub fn print_export_statistics(stats: &ExportStats) {
    let total = stats.total_exported() + stats.total_failed();
    if total == 0 {
        info!("No tables were exported");
        return;
    }

    info!("Export Counts ({} tables):", total);
    for outcome in OutcomeType::iter() {
        let count = stats.get_count(outcome);
        if count > 0 {
            info!("   {}: {}", outcome.as_str(), count);
        }
    }
}
