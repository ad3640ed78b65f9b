//! Allocation and duration event types.
//!
//! An allocation event is one malloc/realloc/free observed by the
//! tracer. Its classification is a pure function of the requested size
//! and the previous-pointer field, and is total over the three modeled
//! operations; the fourth combination (requested == 0 with a non-zero
//! previous pointer) is not produced by the capture side and decodes
//! to `None`.

use crate::decoder::{AllocRecord, DurationRecord, OpFlags};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// Classification of one allocation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocKind {
    Malloc,
    Realloc,
    Free,
}

/// One memory operation plus its consolidation state
///
/// The `active` flag starts true and transitions to false exactly once,
/// driven by the consolidation engine. It is atomic because Pass-1
/// workers claim records across stripe boundaries.
#[derive(Debug)]
pub struct AllocationEvent {
    pub record: AllocRecord,
    active: AtomicBool,
}

impl AllocationEvent {
    pub fn new(record: AllocRecord) -> Self {
        Self {
            record,
            active: AtomicBool::new(true),
        }
    }

    /// Classify this event; `None` for the unmodeled combination
    /// requested == 0 with a non-zero previous pointer.
    pub fn kind(&self) -> Option<AllocKind> {
        classify(self.record.requested, self.record.prev_ptr)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Claim the one-way active -> inactive transition.
    ///
    /// Returns true only for the caller that actually performed the
    /// transition; concurrent claimants see false.
    pub fn deactivate(&self) -> bool {
        self.active
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Overhead contributed by this event (actual - requested)
    pub fn overhead(&self) -> u64 {
        self.record.actual.saturating_sub(self.record.requested)
    }
}

/// Classify a (requested, prev_ptr) pair
///
/// **Public** - also exercised directly by property tests
pub fn classify(requested: u64, prev_ptr: u64) -> Option<AllocKind> {
    match (requested, prev_ptr) {
        (0, 0) => Some(AllocKind::Free),
        (_, 0) => Some(AllocKind::Malloc),
        (0, _) => None,
        (_, _) => Some(AllocKind::Realloc),
    }
}

/// One timed operation, merged by equality
///
/// Identical (duration, requested, actual, op) tuples are folded into a
/// single event with a repeat count instead of kept as separate rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationEvent {
    pub duration: u64,
    pub requested: u64,
    pub actual: u64,
    pub op: DurationOp,
    pub count: u64,
}

/// Operation type of a duration event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationOp {
    Malloc,
    Realloc,
    Free,
}

impl DurationOp {
    /// Map record bit flags to an operation; `None` for an empty or
    /// multi-bit flag byte (malformed record).
    pub fn from_flags(flags: OpFlags) -> Option<Self> {
        match (flags.is_malloc(), flags.is_realloc(), flags.is_free()) {
            (true, false, false) => Some(Self::Malloc),
            (false, true, false) => Some(Self::Realloc),
            (false, false, true) => Some(Self::Free),
            _ => None,
        }
    }
}

impl DurationEvent {
    /// Build from a decoded record, if its op flags are well-formed
    pub fn from_record(record: &DurationRecord) -> Option<Self> {
        Some(Self {
            duration: record.duration,
            requested: record.requested,
            actual: record.actual,
            op: DurationOp::from_flags(record.op)?,
            count: 1,
        })
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_totality() {
        // Every modeled (requested, prev_ptr) combination maps to
        // exactly one kind; the unmodeled case maps to None.
        assert_eq!(classify(0, 0), Some(AllocKind::Free));
        assert_eq!(classify(64, 0), Some(AllocKind::Malloc));
        assert_eq!(classify(64, 0x1000), Some(AllocKind::Realloc));
        assert_eq!(classify(0, 0x1000), None);
    }

    #[test]
    fn test_classification_is_exclusive_over_samples() {
        for requested in [0u64, 1, 8, 4096, u64::MAX] {
            for prev in [0u64, 1, 0xffff_0000] {
                let kinds = [
                    classify(requested, prev) == Some(AllocKind::Free),
                    classify(requested, prev) == Some(AllocKind::Malloc),
                    classify(requested, prev) == Some(AllocKind::Realloc),
                ];
                let matched = kinds.iter().filter(|&&k| k).count();
                if requested == 0 && prev != 0 {
                    assert_eq!(matched, 0);
                } else {
                    assert_eq!(matched, 1);
                }
            }
        }
    }

    #[test]
    fn test_deactivate_claims_once() {
        let event = AllocationEvent::new(AllocRecord {
            timestamp: 0,
            thread_id: 1,
            ptr: 0x10,
            prev_ptr: 0,
            call_sites: [0; 4],
            requested: 8,
            actual: 16,
            tag: 0,
        });

        assert!(event.is_active());
        assert!(event.deactivate());
        assert!(!event.deactivate());
        assert!(!event.is_active());
    }

    #[test]
    fn test_duration_op_rejects_malformed_flags() {
        assert_eq!(DurationOp::from_flags(OpFlags(0)), None);
        assert_eq!(DurationOp::from_flags(OpFlags(3)), None);
        assert_eq!(DurationOp::from_flags(OpFlags(4)), Some(DurationOp::Free));
    }
}
