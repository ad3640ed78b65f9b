//! The allocation trace model.
//!
//! A trace is the complete ordered history of allocation operations
//! from one process run. Records are kept in file order, which is
//! timestamp order; index position is load-bearing because chain
//! resolution always walks backward from a later index to an earlier
//! one. Records are never removed or reordered, only deactivated.

pub mod event;

use crate::decoder::{AllocRecord, MappedLog};
use event::{AllocationEvent, DurationEvent};
use log::{debug, warn};

pub use event::{classify, AllocKind, DurationOp};

/// The full ordered allocation trace
pub struct AllocationTrace {
    events: Vec<AllocationEvent>,
}

impl AllocationTrace {
    /// Decode every complete allocation record from a mapped log
    pub fn from_log(log: &MappedLog) -> Self {
        let events = (0..log.len())
            .map(|i| AllocationEvent::new(AllocRecord::decode(log.record(i))))
            .collect::<Vec<_>>();
        debug!("Loaded allocation trace with {} events", events.len());
        Self { events }
    }

    /// Build a trace from already-decoded records (tests, synthetic traces)
    pub fn from_records(records: Vec<AllocRecord>) -> Self {
        Self {
            events: records.into_iter().map(AllocationEvent::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, i: usize) -> &AllocationEvent {
        &self.events[i]
    }

    /// Iterate events in trace order
    pub fn iter(&self) -> impl Iterator<Item = &AllocationEvent> {
        self.events.iter()
    }

    /// Thread id of the first record in the trace.
    ///
    /// Convention, not a guarantee: the capture side happens to emit the
    /// process main thread's first operation first. Returns `None` for
    /// an empty trace.
    pub fn main_thread_id(&self) -> Option<u64> {
        self.events.first().map(|e| e.record.thread_id)
    }

    /// Claim the deactivation of record `i`; true if this call did it
    pub fn deactivate(&self, i: usize) -> bool {
        self.events[i].deactivate()
    }

    pub fn is_active(&self, i: usize) -> bool {
        self.events[i].is_active()
    }

    /// Number of currently active records
    pub fn active_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_active()).count()
    }
}

/// Decode a duration log, folding identical tuples into repeat counts.
///
/// Records with malformed op flags are dropped with a warning.
pub fn load_durations(log: &MappedLog) -> Vec<DurationEvent> {
    use crate::decoder::DurationRecord;

    let mut counts: std::collections::HashMap<(u64, u64, u64, DurationOp), u64> =
        std::collections::HashMap::new();
    let mut malformed = 0u64;

    for i in 0..log.len() {
        let record = DurationRecord::decode(log.record(i));
        let Some(event) = DurationEvent::from_record(&record) else {
            malformed += 1;
            continue;
        };
        *counts
            .entry((event.duration, event.requested, event.actual, event.op))
            .or_insert(0) += 1;
    }

    let events: Vec<DurationEvent> = counts
        .into_iter()
        .map(|((duration, requested, actual, op), count)| DurationEvent {
            duration,
            requested,
            actual,
            op,
            count,
        })
        .collect();

    if malformed > 0 {
        warn!("Dropped {} duration record(s) with malformed op flags", malformed);
    }
    debug!(
        "Loaded {} distinct duration tuples from {} records",
        events.len(),
        log.len()
    );

    events
}
