//! Exact-value allocation-size histograms.
//!
//! Two histograms are built from the same records, one keyed by the
//! requested size and one by the actual allocator size. Keys are exact
//! values, not ranges: every distinct size gets its own bucket. Both
//! histograms group the same (actual - requested) overhead values, so
//! their overhead totals must agree exactly; that cross-check is fatal
//! when it fails.

use super::render::{fill_len, passes_cutoff, RenderedRow, Scale};
use crate::trace::{AllocKind, AllocationTrace};
use crate::utils::error::HistogramError;
use log::{debug, info};
use std::collections::BTreeMap;

/// One exact-size bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeBucket {
    /// Requested size associated with this bucket's key
    pub requested: u64,
    /// Actual allocator size associated with this bucket's key
    pub actual: u64,
    pub count: u64,
    /// Cumulative (actual - requested) across the bucket's records
    pub overhead: u64,
}

/// Which of the two size histograms a query addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum KeyedBy {
    #[default]
    Requested,
    Actual,
}

/// Governing value for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HistogramMode {
    #[default]
    Count,
    Overhead,
}

/// External collaborator that answers "what does the allocator really
/// hand out for this requested size?" for sizes absent from the trace.
///
/// Same order, same length; any failure aborts the run.
pub trait SizeResolver {
    fn resolve(&self, requested: &[u64]) -> Result<Vec<u64>, HistogramError>;
}

/// The paired size histograms plus their tracked extrema
#[derive(Debug, Default)]
pub struct SizeHistograms {
    by_requested: BTreeMap<u64, SizeBucket>,
    by_actual: BTreeMap<u64, SizeBucket>,
    max_count_requested: u64,
    max_count_actual: u64,
    max_bucket_overhead: u64,
    total_overhead: u64,
}

impl SizeHistograms {
    /// Build both histograms from every record in the trace, live and
    /// freed alike, optionally restricted to one subsystem tag.
    ///
    /// # Errors
    /// `HistogramError::OverheadMismatch` if the requested-keyed and
    /// actual-keyed overhead totals disagree (cross-check invariant).
    pub fn build(trace: &AllocationTrace, tag_filter: Option<u64>) -> Result<Self, HistogramError> {
        let mut hist = Self::default();

        for event in trace.iter() {
            if let Some(tag) = tag_filter {
                if event.record.tag != tag {
                    continue;
                }
            }
            // Only records that allocate carry sizes
            if !matches!(
                event.kind(),
                Some(AllocKind::Malloc) | Some(AllocKind::Realloc)
            ) {
                continue;
            }

            let requested = event.record.requested;
            let actual = event.record.actual;
            let overhead = event.overhead();

            let bucket = hist.by_requested.entry(requested).or_insert(SizeBucket {
                requested,
                actual,
                ..SizeBucket::default()
            });
            bucket.count += 1;
            bucket.overhead += overhead;
            hist.max_count_requested = hist.max_count_requested.max(bucket.count);
            hist.max_bucket_overhead = hist.max_bucket_overhead.max(bucket.overhead);

            let bucket = hist.by_actual.entry(actual).or_insert(SizeBucket {
                requested,
                actual,
                ..SizeBucket::default()
            });
            bucket.count += 1;
            bucket.overhead += overhead;
            hist.max_count_actual = hist.max_count_actual.max(bucket.count);
            hist.max_bucket_overhead = hist.max_bucket_overhead.max(bucket.overhead);

            hist.total_overhead += overhead;
        }

        hist.cross_check()?;
        debug!(
            "Built size histograms: {} requested keys, {} actual keys, {} overhead bytes",
            hist.by_requested.len(),
            hist.by_actual.len(),
            hist.total_overhead
        );

        Ok(hist)
    }

    /// Verify the grouping invariant: both histograms sum the same
    /// underlying overhead values.
    fn cross_check(&self) -> Result<(), HistogramError> {
        let by_requested: u64 = self.by_requested.values().map(|b| b.overhead).sum();
        let by_actual: u64 = self.by_actual.values().map(|b| b.overhead).sum();
        if by_requested != by_actual {
            return Err(HistogramError::OverheadMismatch {
                by_requested,
                by_actual,
            });
        }
        Ok(())
    }

    pub fn total_overhead(&self) -> u64 {
        self.total_overhead
    }

    pub fn max_count(&self, keyed: KeyedBy) -> u64 {
        match keyed {
            KeyedBy::Requested => self.max_count_requested,
            KeyedBy::Actual => self.max_count_actual,
        }
    }

    pub fn max_bucket_overhead(&self) -> u64 {
        self.max_bucket_overhead
    }

    pub fn bucket(&self, keyed: KeyedBy, key: u64) -> Option<&SizeBucket> {
        match keyed {
            KeyedBy::Requested => self.by_requested.get(&key),
            KeyedBy::Actual => self.by_actual.get(&key),
        }
    }

    pub fn bucket_count(&self, keyed: KeyedBy) -> usize {
        match keyed {
            KeyedBy::Requested => self.by_requested.len(),
            KeyedBy::Actual => self.by_actual.len(),
        }
    }

    /// Renderable rows for one mode, ascending by key.
    ///
    /// Only buckets whose share of the governing maximum exceeds
    /// `cutoff` are emitted.
    pub fn rows(
        &self,
        keyed: KeyedBy,
        mode: HistogramMode,
        width: usize,
        cutoff: f64,
        scale: Scale,
    ) -> Vec<RenderedRow> {
        let map = match keyed {
            KeyedBy::Requested => &self.by_requested,
            KeyedBy::Actual => &self.by_actual,
        };
        let max = match mode {
            HistogramMode::Count => self.max_count(keyed),
            HistogramMode::Overhead => self.max_bucket_overhead,
        };

        map.iter()
            .filter_map(|(&key, bucket)| {
                let value = match mode {
                    HistogramMode::Count => bucket.count,
                    HistogramMode::Overhead => bucket.overhead,
                };
                if !passes_cutoff(value, max, cutoff) {
                    return None;
                }
                Some(RenderedRow {
                    key,
                    count: bucket.count,
                    overhead: bucket.overhead,
                    fill_ratio: value as f64 / max as f64,
                    fill: fill_len(value, max, width, scale),
                })
            })
            .collect()
    }

    /// Estimate the allocated-byte total of a hypothetical trace with
    /// no per-allocation tracing header.
    ///
    /// Each live record's requested size shrinks by `header_overhead`;
    /// adjusted sizes absent from the requested-keyed histogram are
    /// resolved through `resolver` (one batch call) and inserted as new
    /// buckets. A live record whose adjusted size still has no bucket
    /// afterwards is fatal.
    pub fn hypothetical_allocated(
        &mut self,
        trace: &AllocationTrace,
        header_overhead: u64,
        resolver: &dyn SizeResolver,
    ) -> Result<u64, HistogramError> {
        let live = || {
            trace.iter().filter(|e| {
                e.is_active()
                    && matches!(
                        e.kind(),
                        Some(AllocKind::Malloc) | Some(AllocKind::Realloc)
                    )
            })
        };

        // Distinct adjusted sizes with no bucket yet
        let missing: Vec<u64> = {
            let mut sizes: Vec<u64> = live()
                .map(|e| e.record.requested.saturating_sub(header_overhead))
                .filter(|size| !self.by_requested.contains_key(size))
                .collect();
            sizes.sort_unstable();
            sizes.dedup();
            sizes
        };

        if !missing.is_empty() {
            info!(
                "Resolving {} size class(es) absent from the trace",
                missing.len()
            );
            let resolved = resolver.resolve(&missing)?;
            if resolved.len() != missing.len() {
                return Err(HistogramError::ResolverShortfall {
                    want: missing.len(),
                    got: resolved.len(),
                });
            }
            for (&requested, &actual) in missing.iter().zip(resolved.iter()) {
                self.by_requested.insert(
                    requested,
                    SizeBucket {
                        requested,
                        actual,
                        count: 0,
                        overhead: 0,
                    },
                );
            }
        }

        let mut allocated = 0u64;
        for event in live() {
            let adjusted = event.record.requested.saturating_sub(header_overhead);
            let bucket = self
                .by_requested
                .get(&adjusted)
                .ok_or(HistogramError::UnresolvedSize(adjusted))?;
            allocated += bucket.actual;
        }

        Ok(allocated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::AllocRecord;

    fn malloc(requested: u64, actual: u64) -> AllocRecord {
        AllocRecord {
            timestamp: 0,
            thread_id: 1,
            ptr: 0x10,
            prev_ptr: 0,
            call_sites: [0; 4],
            requested,
            actual,
            tag: 0,
        }
    }

    struct FixedResolver(Vec<u64>);

    impl SizeResolver for FixedResolver {
        fn resolve(&self, requested: &[u64]) -> Result<Vec<u64>, HistogramError> {
            assert_eq!(requested.len(), self.0.len());
            Ok(self.0.clone())
        }
    }

    struct FailingResolver;

    impl SizeResolver for FailingResolver {
        fn resolve(&self, _requested: &[u64]) -> Result<Vec<u64>, HistogramError> {
            Err(HistogramError::ResolverFailed("no live process".into()))
        }
    }

    #[test]
    fn test_same_requested_size_shares_bucket() {
        let trace =
            AllocationTrace::from_records(vec![malloc(64, 80), malloc(64, 96)]);
        let hist = SizeHistograms::build(&trace, None).unwrap();

        let bucket = hist.bucket(KeyedBy::Requested, 64).unwrap();
        assert_eq!(bucket.count, 2);
        assert_eq!(bucket.overhead, 16 + 32);
        assert_eq!(hist.bucket_count(KeyedBy::Requested), 1);
        assert_eq!(hist.bucket_count(KeyedBy::Actual), 2);
    }

    #[test]
    fn test_rows_ascend_by_key() {
        let trace = AllocationTrace::from_records(vec![
            malloc(512, 512),
            malloc(8, 16),
            malloc(128, 144),
        ]);
        let hist = SizeHistograms::build(&trace, None).unwrap();
        let rows = hist.rows(KeyedBy::Requested, HistogramMode::Count, 40, 0.0, Scale::Linear);

        let keys: Vec<u64> = rows.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![8, 128, 512]);
    }

    #[test]
    fn test_cutoff_hides_rare_buckets() {
        let mut records = vec![malloc(8, 8); 100];
        records.push(malloc(9999, 9999));
        let trace = AllocationTrace::from_records(records);
        let hist = SizeHistograms::build(&trace, None).unwrap();

        let rows = hist.rows(KeyedBy::Requested, HistogramMode::Count, 40, 0.05, Scale::Linear);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, 8);
        assert_eq!(rows[0].fill, 40);
    }

    #[test]
    fn test_tag_filter() {
        let mut a = malloc(8, 16);
        a.tag = 1;
        let mut b = malloc(8, 16);
        b.tag = 2;
        let trace = AllocationTrace::from_records(vec![a, b]);

        let hist = SizeHistograms::build(&trace, Some(2)).unwrap();
        assert_eq!(hist.bucket(KeyedBy::Requested, 8).unwrap().count, 1);
    }

    #[test]
    fn test_hypothetical_uses_resolver_for_missing_sizes() {
        // One live malloc of requested 80 with a 16-byte tracing header;
        // adjusted size 64 is absent from the histogram keys.
        let trace = AllocationTrace::from_records(vec![malloc(80, 96)]);
        let mut hist = SizeHistograms::build(&trace, None).unwrap();

        let resolver = FixedResolver(vec![72]);
        let total = hist
            .hypothetical_allocated(&trace, 16, &resolver)
            .unwrap();
        assert_eq!(total, 72);
    }

    #[test]
    fn test_hypothetical_resolver_failure_is_fatal() {
        let trace = AllocationTrace::from_records(vec![malloc(80, 96)]);
        let mut hist = SizeHistograms::build(&trace, None).unwrap();

        let err = hist.hypothetical_allocated(&trace, 16, &FailingResolver);
        assert!(matches!(err, Err(HistogramError::ResolverFailed(_))));
    }

    #[test]
    fn test_overhead_totals_agree() {
        let trace = AllocationTrace::from_records(vec![
            malloc(8, 16),
            malloc(8, 32),
            malloc(100, 112),
            malloc(200, 200),
        ]);
        let hist = SizeHistograms::build(&trace, None).unwrap();
        assert_eq!(hist.total_overhead(), 8 + 24 + 12);
    }
}
