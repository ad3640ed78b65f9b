//! Report value types consumed by the presentation layer.
//!
//! Only numeric values are contractual here; layout belongs to whoever
//! renders the report. The JSON writer lives in `json.rs`.

pub mod json;

use crate::consolidate::ConsolidationOutcome;
use crate::histogram::RenderedRow;
use crate::stats::{Category, MemoryStats};
use crate::utils::config::SCHEMA_VERSION;
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub use json::{read_report, write_report};

/// One category's statistics, ready for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRow {
    pub label: String,
    pub malloc_count: u64,
    pub realloc_count: u64,
    pub free_count: u64,
    pub requested_bytes: u64,
    pub allocated_bytes: u64,
    pub overhead_bytes: u64,
    /// Share of the grand total's overhead, 0-100
    pub overhead_percentage: f64,
}

impl StatsRow {
    /// Build a row from an accumulator, with its overhead expressed as
    /// a share of `total_overhead`.
    pub fn from_stats(label: impl Into<String>, stats: &MemoryStats, total_overhead: u64) -> Self {
        Self {
            label: label.into(),
            malloc_count: stats.malloc_count,
            realloc_count: stats.realloc_count,
            free_count: stats.free_count,
            requested_bytes: stats.requested_bytes,
            allocated_bytes: stats.allocated_bytes,
            overhead_bytes: stats.overhead_bytes(),
            overhead_percentage: stats.overhead_percentage(total_overhead),
        }
    }

    pub fn from_category(category: &Category, total_overhead: u64) -> Self {
        Self::from_stats(category.label.clone(), &category.stats, total_overhead)
    }
}

/// What consolidation did to the trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationSummary {
    pub frees_resolved: u64,
    pub unmatched_frees: u64,
    pub records_retired: u64,
    /// Records still active: one per live allocation
    pub live_records: u64,
}

impl ConsolidationSummary {
    pub fn new(outcome: &ConsolidationOutcome, live_records: u64) -> Self {
        Self {
            frees_resolved: outcome.frees_resolved,
            unmatched_frees: outcome.unmatched_frees,
            records_retired: outcome.records_retired,
            live_records,
        }
    }
}

/// The full analysis report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub schema_version: String,
    pub pid: u32,
    pub generated_at: String,
    pub totals: StatsRow,
    /// Per-thread rows, descending by overhead
    pub threads: Vec<StatsRow>,
    /// Per-subsystem rows, descending by overhead
    pub subsystems: Vec<StatsRow>,
    pub consolidation: ConsolidationSummary,
    /// Selected histogram mode's rows, ascending by key
    pub histogram: Vec<RenderedRow>,
}

impl AnalysisReport {
    pub fn new(
        pid: u32,
        totals: StatsRow,
        threads: Vec<StatsRow>,
        subsystems: Vec<StatsRow>,
        consolidation: ConsolidationSummary,
        histogram: Vec<RenderedRow>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            pid,
            generated_at: Utc::now().to_rfc3339(),
            totals,
            threads,
            subsystems,
            consolidation,
            histogram,
        }
    }
}

/// Report over the duration log, always count-based
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationReport {
    pub schema_version: String,
    pub pid: u32,
    pub generated_at: String,
    pub malloc_by_size: Vec<RenderedRow>,
    pub realloc_by_size: Vec<RenderedRow>,
    pub malloc_by_duration: Vec<RenderedRow>,
    pub realloc_by_duration: Vec<RenderedRow>,
    pub free_by_duration: Vec<RenderedRow>,
}

impl DurationReport {
    pub fn new(
        pid: u32,
        malloc_by_size: Vec<RenderedRow>,
        realloc_by_size: Vec<RenderedRow>,
        malloc_by_duration: Vec<RenderedRow>,
        realloc_by_duration: Vec<RenderedRow>,
        free_by_duration: Vec<RenderedRow>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            pid,
            generated_at: Utc::now().to_rfc3339(),
            malloc_by_size,
            realloc_by_size,
            malloc_by_duration,
            realloc_by_duration,
            free_by_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_row_from_accumulator() {
        let stats = MemoryStats {
            malloc_count: 3,
            realloc_count: 1,
            free_count: 2,
            requested_bytes: 100,
            allocated_bytes: 150,
        };
        let row = StatsRow::from_stats("compiler", &stats, 200);

        assert_eq!(row.label, "compiler");
        assert_eq!(row.overhead_bytes, 50);
        assert_eq!(row.overhead_percentage, 25.0);
    }
}
