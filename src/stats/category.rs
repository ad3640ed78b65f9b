//! Per-category memory statistics accumulators.

use crate::trace::event::{AllocKind, AllocationEvent};
use serde::Serialize;

/// Accumulated counters for one reporting category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub malloc_count: u64,
    pub realloc_count: u64,
    pub free_count: u64,
    pub requested_bytes: u64,
    pub allocated_bytes: u64,
}

impl MemoryStats {
    /// Fold one classified event into the counters.
    ///
    /// Frees bump their count only; mallocs and reallocs additionally
    /// contribute requested and allocated bytes.
    pub fn add_event(&mut self, event: &AllocationEvent) {
        match event.kind() {
            Some(AllocKind::Free) => self.free_count += 1,
            Some(AllocKind::Malloc) => {
                self.malloc_count += 1;
                self.requested_bytes += event.record.requested;
                self.allocated_bytes += event.record.actual;
            }
            Some(AllocKind::Realloc) => {
                self.realloc_count += 1;
                self.requested_bytes += event.record.requested;
                self.allocated_bytes += event.record.actual;
            }
            None => {}
        }
    }

    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: &MemoryStats) {
        self.malloc_count += other.malloc_count;
        self.realloc_count += other.realloc_count;
        self.free_count += other.free_count;
        self.requested_bytes += other.requested_bytes;
        self.allocated_bytes += other.allocated_bytes;
    }

    /// Allocator overhead: bytes handed out beyond what was asked for
    pub fn overhead_bytes(&self) -> u64 {
        self.allocated_bytes.saturating_sub(self.requested_bytes)
    }

    /// This accumulator's overhead as a percentage of `total_overhead`
    pub fn overhead_percentage(&self, total_overhead: u64) -> f64 {
        if total_overhead == 0 {
            0.0
        } else {
            (self.overhead_bytes() as f64 / total_overhead as f64) * 100.0
        }
    }
}

/// Membership predicate for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Events on one thread
    Thread(u64),
    /// Events tagged with one subsystem
    Subsystem(u64),
}

/// A named reporting bucket owning one accumulator
#[derive(Debug, Clone)]
pub struct Category {
    pub label: String,
    pub selector: Selector,
    pub stats: MemoryStats,
}

impl Category {
    pub fn thread(label: impl Into<String>, thread_id: u64) -> Self {
        Self {
            label: label.into(),
            selector: Selector::Thread(thread_id),
            stats: MemoryStats::default(),
        }
    }

    pub fn subsystem(label: impl Into<String>, tag: u64) -> Self {
        Self {
            label: label.into(),
            selector: Selector::Subsystem(tag),
            stats: MemoryStats::default(),
        }
    }

    /// Does this event belong to this category?
    pub fn matches(&self, event: &AllocationEvent) -> bool {
        match self.selector {
            Selector::Thread(id) => event.record.thread_id == id,
            Selector::Subsystem(tag) => event.record.tag == tag,
        }
    }
}
