//! The `durations` command: bucket the duration log and report how
//! long malloc/realloc/free operations took, overall and per size.

use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use mtrace_analyzer::decoder::{MappedLog, TraceFiles};
use mtrace_analyzer::histogram::{CountHistogram, DurationHistograms, Scale};
use mtrace_analyzer::report::{write_report, DurationReport};
use mtrace_analyzer::trace::load_durations;
use mtrace_analyzer::utils::config::DURATION_RECORD_SIZE;

/// Arguments for the durations command
#[derive(Debug, Clone)]
pub struct DurationsArgs {
    pub dir: PathBuf,
    pub pid: u32,
    pub scale: Scale,
    pub width: usize,
    pub cutoff: f64,
    pub output: Option<PathBuf>,
    pub summary: bool,
}

/// Run the duration analysis pipeline
pub fn execute_durations(args: DurationsArgs) -> Result<()> {
    let files = TraceFiles::locate(&args.dir, args.pid);

    let log = MappedLog::open(&files.duration_log, DURATION_RECORD_SIZE)
        .context("opening duration log")?;
    let events = load_durations(&log);
    info!("Loaded {} distinct duration tuple(s)", events.len());

    let histograms = DurationHistograms::build(&events);

    let report = DurationReport::new(
        args.pid,
        histograms.malloc_by_size.rows(args.width, args.cutoff, args.scale),
        histograms.realloc_by_size.rows(args.width, args.cutoff, args.scale),
        histograms.malloc_by_duration.rows(args.width, args.cutoff, args.scale),
        histograms.realloc_by_duration.rows(args.width, args.cutoff, args.scale),
        histograms.free_by_duration.rows(args.width, args.cutoff, args.scale),
    );

    if args.summary {
        print_histogram("malloc by size", &histograms.malloc_by_size, &args);
        print_histogram("realloc by size", &histograms.realloc_by_size, &args);
        print_histogram("malloc by duration", &histograms.malloc_by_duration, &args);
        print_histogram("realloc by duration", &histograms.realloc_by_duration, &args);
        print_histogram("free by duration", &histograms.free_by_duration, &args);

        for (size, hist) in &histograms.malloc_duration_by_size {
            print_histogram(&format!("malloc size {} by duration", size), hist, &args);
        }
        for (size, hist) in &histograms.realloc_duration_by_size {
            print_histogram(&format!("realloc size {} by duration", size), hist, &args);
        }
    }

    if let Some(path) = &args.output {
        write_report(&report, path).context("writing duration report")?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn print_histogram(title: &str, hist: &CountHistogram, args: &DurationsArgs) {
    if hist.is_empty() {
        return;
    }
    println!("=== {} ===", title);
    for row in hist.rows(args.width, args.cutoff, args.scale) {
        println!(
            "  {:>12}  {:>8}  {}",
            row.key,
            row.count,
            "#".repeat(row.fill)
        );
    }
    println!();
}
