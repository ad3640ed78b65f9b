//! Aggregation of the active trace set into per-category statistics.
//!
//! Runs after consolidation: only active records count. A record lands
//! in every category whose predicate matches; thread and subsystem
//! predicates are id-equality tests, so in practice each record joins
//! at most one category per axis.

pub mod category;

use crate::decoder::ThreadRecord;
use crate::trace::AllocationTrace;
use crate::utils::config::subsystem_name;
use log::debug;

pub use category::{Category, MemoryStats, Selector};

/// Clear and refill the categories from the trace's active set.
///
/// Returns the grand total across all categories. Overhead percentages
/// are computed against this total's overhead by the caller (ranking
/// and report code), not stored here.
pub fn aggregate(trace: &AllocationTrace, categories: &mut [Category]) -> MemoryStats {
    for cat in categories.iter_mut() {
        cat.stats = MemoryStats::default();
    }

    for event in trace.iter().filter(|e| e.is_active()) {
        for cat in categories.iter_mut() {
            if cat.matches(event) {
                cat.stats.add_event(event);
            }
        }
    }

    let mut total = MemoryStats::default();
    for cat in categories.iter() {
        total.merge(&cat.stats);
    }

    debug!(
        "Aggregated {} active record(s) into {} categories",
        trace.active_count(),
        categories.len()
    );

    total
}

/// Order categories for reporting: descending overhead, ties broken by
/// descending allocated bytes.
pub fn rank_categories(categories: &mut [Category]) {
    categories.sort_by(|a, b| {
        b.stats
            .overhead_bytes()
            .cmp(&a.stats.overhead_bytes())
            .then(b.stats.allocated_bytes.cmp(&a.stats.allocated_bytes))
    });
}

/// One thread category per decoded thread record.
///
/// The first trace record's thread is labelled as the main thread when
/// no thread record names it; this is the capture-order convention, not
/// a guarantee.
pub fn thread_categories(trace: &AllocationTrace, threads: &[ThreadRecord]) -> Vec<Category> {
    let mut categories: Vec<Category> = threads
        .iter()
        .map(|t| Category::thread(t.name.clone(), t.thread_id))
        .collect();

    if let Some(main_id) = trace.main_thread_id() {
        if !categories
            .iter()
            .any(|c| c.selector == Selector::Thread(main_id))
        {
            categories.push(Category::thread(format!("thread-{} (main?)", main_id), main_id));
        }
    }

    // Any further unnamed threads seen in the trace get numeric labels
    for event in trace.iter() {
        let id = event.record.thread_id;
        if !categories.iter().any(|c| c.selector == Selector::Thread(id)) {
            categories.push(Category::thread(format!("thread-{}", id), id));
        }
    }

    categories
}

/// One subsystem category per distinct tag seen in the trace
pub fn subsystem_categories(trace: &AllocationTrace) -> Vec<Category> {
    let mut categories: Vec<Category> = Vec::new();
    for event in trace.iter() {
        let tag = event.record.tag;
        if !categories
            .iter()
            .any(|c| c.selector == Selector::Subsystem(tag))
        {
            categories.push(Category::subsystem(subsystem_name(tag), tag));
        }
    }
    categories
}
