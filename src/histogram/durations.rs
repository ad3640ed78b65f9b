//! Exact-value duration histograms.
//!
//! Symmetric construction to the size histograms, but over duration
//! events and always count-based: durations have no overhead concept.
//! Per operation type there is a histogram keyed by size and one keyed
//! by duration, plus a nested duration histogram per distinct size
//! (how long did allocations of exactly this size take?).

use super::render::{fill_len, passes_cutoff, RenderedRow, Scale};
use crate::trace::event::{DurationEvent, DurationOp};
use log::debug;
use std::collections::BTreeMap;

/// A count histogram over exact u64 keys
#[derive(Debug, Clone, Default)]
pub struct CountHistogram {
    buckets: BTreeMap<u64, u64>,
    max_count: u64,
}

impl CountHistogram {
    /// Add `n` occurrences of `key`
    pub fn add(&mut self, key: u64, n: u64) {
        let count = self.buckets.entry(key).or_insert(0);
        *count += n;
        self.max_count = self.max_count.max(*count);
    }

    pub fn count(&self, key: u64) -> u64 {
        self.buckets.get(&key).copied().unwrap_or(0)
    }

    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Renderable rows, ascending by key; same fill contract as the
    /// size histograms but always count-governed.
    pub fn rows(&self, width: usize, cutoff: f64, scale: Scale) -> Vec<RenderedRow> {
        self.buckets
            .iter()
            .filter(|&(_, &count)| passes_cutoff(count, self.max_count, cutoff))
            .map(|(&key, &count)| RenderedRow {
                key,
                count,
                overhead: 0,
                fill_ratio: count as f64 / self.max_count as f64,
                fill: fill_len(count, self.max_count, width, scale),
            })
            .collect()
    }
}

/// All duration histograms for one trace
#[derive(Debug, Default)]
pub struct DurationHistograms {
    /// Occurrences keyed by requested size, mallocs only
    pub malloc_by_size: CountHistogram,
    /// Occurrences keyed by requested size, reallocs only
    pub realloc_by_size: CountHistogram,
    pub malloc_by_duration: CountHistogram,
    pub realloc_by_duration: CountHistogram,
    pub free_by_duration: CountHistogram,
    /// Duration histogram per distinct malloc size
    pub malloc_duration_by_size: BTreeMap<u64, CountHistogram>,
    /// Duration histogram per distinct realloc size
    pub realloc_duration_by_size: BTreeMap<u64, CountHistogram>,
}

impl DurationHistograms {
    /// Bucket a list of (already tuple-merged) duration events
    pub fn build(events: &[DurationEvent]) -> Self {
        let mut hist = Self::default();

        for event in events {
            match event.op {
                DurationOp::Malloc => {
                    hist.malloc_by_size.add(event.requested, event.count);
                    hist.malloc_by_duration.add(event.duration, event.count);
                    hist.malloc_duration_by_size
                        .entry(event.requested)
                        .or_default()
                        .add(event.duration, event.count);
                }
                DurationOp::Realloc => {
                    hist.realloc_by_size.add(event.requested, event.count);
                    hist.realloc_by_duration.add(event.duration, event.count);
                    hist.realloc_duration_by_size
                        .entry(event.requested)
                        .or_default()
                        .add(event.duration, event.count);
                }
                DurationOp::Free => {
                    hist.free_by_duration.add(event.duration, event.count);
                }
            }
        }

        debug!(
            "Built duration histograms: {} malloc sizes, {} realloc sizes, {} free durations",
            hist.malloc_by_size.len(),
            hist.realloc_by_size.len(),
            hist.free_by_duration.len()
        );

        hist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(op: DurationOp, duration: u64, requested: u64, count: u64) -> DurationEvent {
        DurationEvent {
            duration,
            requested,
            actual: requested,
            op,
            count,
        }
    }

    #[test]
    fn test_build_routes_by_op() {
        let events = vec![
            event(DurationOp::Malloc, 100, 64, 3),
            event(DurationOp::Malloc, 200, 64, 1),
            event(DurationOp::Realloc, 150, 128, 2),
            event(DurationOp::Free, 50, 0, 5),
        ];

        let hist = DurationHistograms::build(&events);

        assert_eq!(hist.malloc_by_size.count(64), 4);
        assert_eq!(hist.malloc_by_duration.count(100), 3);
        assert_eq!(hist.realloc_by_size.count(128), 2);
        assert_eq!(hist.free_by_duration.count(50), 5);
        assert!(hist.realloc_by_duration.count(150) == 2);
    }

    #[test]
    fn test_nested_per_size_durations() {
        let events = vec![
            event(DurationOp::Malloc, 100, 64, 2),
            event(DurationOp::Malloc, 900, 64, 1),
            event(DurationOp::Malloc, 100, 32, 7),
        ];

        let hist = DurationHistograms::build(&events);
        let per_64 = &hist.malloc_duration_by_size[&64];

        assert_eq!(per_64.count(100), 2);
        assert_eq!(per_64.count(900), 1);
        assert_eq!(hist.malloc_duration_by_size[&32].count(100), 7);
    }

    #[test]
    fn test_rows_ascend_and_scale() {
        let mut hist = CountHistogram::default();
        hist.add(500, 10);
        hist.add(10, 5);
        hist.add(90, 1);

        let rows = hist.rows(40, 0.0, Scale::Linear);
        let keys: Vec<u64> = rows.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![10, 90, 500]);
        assert_eq!(rows[2].fill, 40);
        assert_eq!(rows[0].fill, 20);
    }
}
