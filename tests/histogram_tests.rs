//! Histogram construction and rendering over generated traces.

use pretty_assertions::assert_eq;

use mtrace_analyzer::decoder::AllocRecord;
use mtrace_analyzer::histogram::{HistogramMode, KeyedBy, Scale, SizeHistograms};
use mtrace_analyzer::trace::AllocationTrace;

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

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 16
    }
}

#[test]
fn equal_requested_sizes_share_a_bucket() {
    let trace = AllocationTrace::from_records(vec![malloc(64, 80), malloc(64, 72)]);
    let hist = SizeHistograms::build(&trace, None).unwrap();

    let bucket = hist.bucket(KeyedBy::Requested, 64).unwrap();
    assert_eq!(bucket.count, 2);
    assert_eq!(bucket.overhead, 16 + 8);
}

#[test]
fn overhead_cross_check_holds_for_random_traces() {
    // Both histograms group the same (actual - requested) values, so
    // their totals must agree for any trace; build() verifies this
    // internally and returns Err on violation.
    let mut rng = Lcg(0xfeed);
    for _ in 0..20 {
        let records: Vec<AllocRecord> = (0..500)
            .map(|_| {
                // Cluster sizes so keys collide across records
                let requested = 8 * (1 + rng.next() % 32);
                let actual = requested + 16 * (rng.next() % 4);
                malloc(requested, actual)
            })
            .collect();

        let expected: u64 = records.iter().map(|r| r.actual - r.requested).sum();
        let trace = AllocationTrace::from_records(records);
        let hist = SizeHistograms::build(&trace, None).unwrap();
        assert_eq!(hist.total_overhead(), expected);
    }
}

#[test]
fn buckets_enumerate_strictly_ascending() {
    let mut rng = Lcg(1);
    let records: Vec<AllocRecord> = (0..200)
        .map(|_| {
            let requested = 1 + rng.next() % 10_000;
            malloc(requested, requested + 8)
        })
        .collect();
    let trace = AllocationTrace::from_records(records);
    let hist = SizeHistograms::build(&trace, None).unwrap();

    for keyed in [KeyedBy::Requested, KeyedBy::Actual] {
        let rows = hist.rows(keyed, HistogramMode::Count, 40, 0.0, Scale::Linear);
        assert!(!rows.is_empty());
        for pair in rows.windows(2) {
            assert!(pair[0].key < pair[1].key, "keys must strictly ascend");
        }
    }
}

#[test]
fn overhead_mode_is_governed_by_max_bucket_overhead() {
    let trace = AllocationTrace::from_records(vec![
        malloc(8, 8),     // no overhead
        malloc(100, 150), // overhead 50
        malloc(200, 225), // overhead 25
    ]);
    let hist = SizeHistograms::build(&trace, None).unwrap();

    let rows = hist.rows(
        KeyedBy::Requested,
        HistogramMode::Overhead,
        100,
        0.0,
        Scale::Linear,
    );

    // Zero-overhead bucket fails the cutoff even at 0.0 (share must
    // exceed the threshold); the others scale against max 50.
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key, 100);
    assert_eq!(rows[0].fill, 100);
    assert_eq!(rows[1].key, 200);
    assert_eq!(rows[1].fill, 50);
}

#[test]
fn freed_records_still_count_in_histograms() {
    // Histograms cover the whole history, not just the live set
    let trace = AllocationTrace::from_records(vec![malloc(64, 80)]);
    trace.deactivate(0);

    let hist = SizeHistograms::build(&trace, None).unwrap();
    assert_eq!(hist.bucket(KeyedBy::Requested, 64).unwrap().count, 1);
}
