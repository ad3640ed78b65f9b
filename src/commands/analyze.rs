//! The `analyze` command: consolidate an allocation trace and report
//! per-thread / per-subsystem statistics plus a size histogram.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;

use mtrace_analyzer::consolidate::{consolidate, ConsolidateOptions, UnmatchedFreePolicy};
use mtrace_analyzer::decoder::{decode_meta_log, MappedLog, TraceFiles};
use mtrace_analyzer::histogram::{HistogramMode, KeyedBy, Scale, SizeHistograms};
use mtrace_analyzer::report::{
    write_report, AnalysisReport, ConsolidationSummary, StatsRow,
};
use mtrace_analyzer::stats::{aggregate, rank_categories, subsystem_categories, thread_categories};
use mtrace_analyzer::trace::AllocationTrace;
use mtrace_analyzer::utils::config::ALLOC_RECORD_SIZE;

/// Arguments for the analyze command
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub dir: PathBuf,
    pub pid: u32,
    pub subsystem: Option<u64>,
    pub mode: HistogramMode,
    pub keyed: KeyedBy,
    pub scale: Scale,
    pub width: usize,
    pub cutoff: f64,
    pub workers: usize,
    pub strict_frees: bool,
    pub output: Option<PathBuf>,
    pub summary: bool,
}

/// Validate arguments before doing any work
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    anyhow::ensure!(args.width > 0, "Histogram width must be positive");
    anyhow::ensure!(
        (0.0..1.0).contains(&args.cutoff),
        "Cutoff must be in [0, 1)"
    );
    anyhow::ensure!(args.workers > 0, "Worker count must be positive");
    Ok(())
}

/// Run the full analysis pipeline
pub fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    let files = TraceFiles::locate(&args.dir, args.pid);
    files.warn_missing();

    // Decode
    let alloc_log = MappedLog::open(&files.alloc_log, ALLOC_RECORD_SIZE)
        .context("opening allocation log")?;
    let trace = AllocationTrace::from_log(&alloc_log);
    info!("Decoded {} allocation record(s)", trace.len());

    let (metadata, threads) = match MappedLog::open(&files.metadata_log, 1) {
        Ok(log) => decode_meta_log(&log),
        Err(e) => {
            debug!("No metadata log ({}); using defaults", e);
            Default::default()
        }
    };
    debug!(
        "Tracking level {:?}, header overhead {} byte(s), {} named thread(s)",
        metadata.tracking_level,
        metadata.header_overhead,
        threads.len()
    );

    // Consolidate
    let opts = ConsolidateOptions {
        workers: args.workers,
        unmatched_policy: if args.strict_frees {
            UnmatchedFreePolicy::Fail
        } else {
            UnmatchedFreePolicy::Warn
        },
    };
    let outcome = consolidate(&trace, &opts).context("consolidating trace")?;
    let live_records = trace.active_count() as u64;
    info!(
        "{} live allocation(s) after consolidation ({} record(s) retired)",
        live_records, outcome.records_retired
    );

    // Aggregate
    let mut thread_cats = thread_categories(&trace, &threads);
    let totals = aggregate(&trace, &mut thread_cats);
    rank_categories(&mut thread_cats);

    let mut subsystem_cats = subsystem_categories(&trace);
    aggregate(&trace, &mut subsystem_cats);
    rank_categories(&mut subsystem_cats);

    let total_overhead = totals.overhead_bytes();

    // Histogram
    let histograms =
        SizeHistograms::build(&trace, args.subsystem).context("building size histograms")?;
    let rows = histograms.rows(args.keyed, args.mode, args.width, args.cutoff, args.scale);

    let report = AnalysisReport::new(
        args.pid,
        StatsRow::from_stats("total", &totals, total_overhead),
        thread_cats
            .iter()
            .map(|c| StatsRow::from_category(c, total_overhead))
            .collect(),
        subsystem_cats
            .iter()
            .map(|c| StatsRow::from_category(c, total_overhead))
            .collect(),
        ConsolidationSummary::new(&outcome, live_records),
        rows,
    );

    if args.summary {
        print_summary(&report);
    }

    if let Some(path) = &args.output {
        write_report(&report, path).context("writing report")?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

/// Plain-text summary of the report values
fn print_summary(report: &AnalysisReport) {
    println!("=== Consolidation ===");
    println!("  Live allocations:  {}", report.consolidation.live_records);
    println!("  Frees resolved:    {}", report.consolidation.frees_resolved);
    println!("  Unmatched frees:   {}", report.consolidation.unmatched_frees);
    println!();

    println!("=== Totals ===");
    print_row(&report.totals);
    println!();

    println!("=== Threads (by overhead) ===");
    for row in &report.threads {
        print_row(row);
    }
    println!();

    println!("=== Subsystems (by overhead) ===");
    for row in &report.subsystems {
        print_row(row);
    }
    println!();

    println!("=== Histogram ===");
    for row in &report.histogram {
        println!(
            "  {:>12}  {:>8}  {:>10}  {}",
            row.key,
            row.count,
            row.overhead,
            "#".repeat(row.fill)
        );
    }
}

fn print_row(row: &StatsRow) {
    println!(
        "  {:<24} malloc {:>8}  realloc {:>8}  free {:>8}  requested {:>12}  allocated {:>12}  overhead {:>10} ({:.1}%)",
        row.label,
        row.malloc_count,
        row.realloc_count,
        row.free_count,
        row.requested_bytes,
        row.allocated_bytes,
        row.overhead_bytes,
        row.overhead_percentage
    );
}
