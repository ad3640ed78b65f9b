//! Trace consolidation: resolving malloc/realloc/free chains.
//!
//! The trace is the entire operation history of a process run.
//! Consolidation determines which records correspond to memory still
//! live when the trace ends, by retiring (deactivating) every record
//! whose allocation was later freed or superseded by a realloc.
//!
//! Two passes:
//! 1. Free-chain retirement, parallel over index stripes. Every free
//!    walks backward through the realloc chain it terminates and
//!    retires each link down to the originating malloc.
//! 2. Superseded-realloc retirement, sequential. Every surviving
//!    realloc retires the older links of its own chain, leaving one
//!    record per live allocation.
//!
//! Workers claim deactivations with a compare-exchange, so a chain walk
//! that crosses stripe boundaries can never retire a record twice. The
//! join before Pass 2 is the required barrier between the parallel
//! writes and the sequential reads.

use crate::trace::{AllocKind, AllocationTrace};
use crate::utils::config::DEFAULT_WORKERS;
use crate::utils::error::ConsolidateError;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};

/// Policy for frees with no matching earlier allocation.
///
/// The capture side can attach mid-run, so a free whose malloc predates
/// the trace is not necessarily a bug; the default therefore only
/// warns. `Fail` turns the condition fatal for traces known to cover
/// the whole process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmatchedFreePolicy {
    #[default]
    Warn,
    Fail,
}

/// Tuning knobs for a consolidation run
#[derive(Debug, Clone)]
pub struct ConsolidateOptions {
    /// Pass-1 worker count (stripes); clamped to at least 1
    pub workers: usize,
    pub unmatched_policy: UnmatchedFreePolicy,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            unmatched_policy: UnmatchedFreePolicy::default(),
        }
    }
}

/// Counters describing what a consolidation run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationOutcome {
    /// Frees whose chain walk found the originating allocation
    pub frees_resolved: u64,
    /// Frees with no matching earlier allocation
    pub unmatched_frees: u64,
    /// Records deactivated across both passes (including the frees)
    pub records_retired: u64,
}

/// Consolidate a trace in place.
///
/// On return the active set holds exactly one record per still-live
/// allocation: an unreclaimed malloc or the newest realloc in its
/// chain. Running again on an already consolidated trace is a no-op.
pub fn consolidate(
    trace: &AllocationTrace,
    opts: &ConsolidateOptions,
) -> Result<ConsolidationOutcome, ConsolidateError> {
    let workers = opts.workers.max(1);
    info!(
        "Consolidating {} records with {} worker(s)",
        trace.len(),
        workers
    );

    let resolved = AtomicU64::new(0);
    let unmatched = AtomicU64::new(0);
    let retired = AtomicU64::new(0);

    // Pass 1: free-chain retirement, one stripe per worker. Joining the
    // scope is the barrier that orders these writes before Pass 2.
    std::thread::scope(|scope| {
        for worker in 0..workers {
            let resolved = &resolved;
            let unmatched = &unmatched;
            let retired = &retired;
            scope.spawn(move || {
                if trace.len() <= worker {
                    return;
                }
                // Scan the stripe {worker, worker + k, ...} from the
                // highest index downward.
                let steps = (trace.len() - 1 - worker) / workers;
                for step in (0..=steps).rev() {
                    let idx = worker + step * workers;
                    let event = trace.get(idx);
                    if !event.is_active() || event.kind() != Some(AllocKind::Free) {
                        continue;
                    }

                    let walk = retire_chain(trace, idx, event.record.ptr);
                    retired.fetch_add(walk.retired, Ordering::Relaxed);
                    if walk.matched {
                        resolved.fetch_add(1, Ordering::Relaxed);
                    } else {
                        unmatched.fetch_add(1, Ordering::Relaxed);
                    }

                    // The free itself always retires, matched or not
                    if trace.deactivate(idx) {
                        retired.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    let unmatched_frees = unmatched.load(Ordering::Relaxed);
    if unmatched_frees > 0 {
        warn!(
            "{} free record(s) had no matching allocation in the trace",
            unmatched_frees
        );
        if opts.unmatched_policy == UnmatchedFreePolicy::Fail {
            return Err(ConsolidateError::UnmatchedFree {
                count: unmatched_frees,
            });
        }
    }

    // Pass 2: every surviving realloc retires the older links of its
    // chain, leaving only the newest record per live allocation.
    let mut pass2_retired = 0u64;
    for idx in (0..trace.len()).rev() {
        let event = trace.get(idx);
        if !event.is_active() || event.kind() != Some(AllocKind::Realloc) {
            continue;
        }
        pass2_retired += retire_chain(trace, idx, event.record.prev_ptr).retired;
    }

    let outcome = ConsolidationOutcome {
        frees_resolved: resolved.load(Ordering::Relaxed),
        unmatched_frees,
        records_retired: retired.load(Ordering::Relaxed) + pass2_retired,
    };
    debug!(
        "Consolidation done: {} resolved, {} unmatched, {} retired, {} still active",
        outcome.frees_resolved,
        outcome.unmatched_frees,
        outcome.records_retired,
        trace.active_count()
    );

    Ok(outcome)
}

struct ChainWalk {
    /// True if the walk reached the originating malloc
    matched: bool,
    retired: u64,
}

/// Walk strictly backward from `start` retiring the chain that ends at
/// pointer `target`.
///
/// The nearest earlier active record whose current pointer equals the
/// target is the previous link: a malloc terminates the chain, a
/// realloc is retired and the walk continues with its own previous
/// pointer. A realloc chain can be arbitrarily long.
fn retire_chain(trace: &AllocationTrace, start: usize, mut target: u64) -> ChainWalk {
    let mut retired = 0u64;

    let mut idx = start;
    while idx > 0 {
        idx -= 1;
        let event = trace.get(idx);
        if !event.is_active() || event.record.ptr != target {
            continue;
        }

        match event.kind() {
            Some(AllocKind::Malloc) => {
                if trace.deactivate(idx) {
                    retired += 1;
                }
                return ChainWalk {
                    matched: true,
                    retired,
                };
            }
            Some(AllocKind::Realloc) => {
                if trace.deactivate(idx) {
                    retired += 1;
                }
                target = event.record.prev_ptr;
            }
            // Frees and unmodeled records never start a chain link
            _ => {}
        }
    }

    ChainWalk {
        matched: false,
        retired,
    }
}
