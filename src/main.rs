//! Malloc Trace Analyzer CLI
//!
//! Consolidates native allocation traces and reports per-thread and
//! per-subsystem memory statistics plus size/duration histograms.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

mod commands;

use commands::{execute_analyze, execute_durations, AnalyzeArgs, DurationsArgs};
use mtrace_analyzer::histogram::{HistogramMode, KeyedBy, Scale};
use mtrace_analyzer::utils::config::{
    DEFAULT_CUTOFF, DEFAULT_HISTOGRAM_WIDTH, DEFAULT_WORKERS, SCHEMA_VERSION,
};

/// Malloc Trace Analyzer - allocation-trace consolidation & statistics
#[derive(Parser, Debug)]
#[command(name = "mtrace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Consolidate an allocation trace and report statistics
    Analyze {
        /// Directory holding the trace logs
        #[arg(short, long)]
        dir: PathBuf,

        /// Process id the logs were captured from
        #[arg(short, long)]
        pid: u32,

        /// Restrict the histogram to one subsystem tag
        #[arg(long)]
        subsystem: Option<u64>,

        /// Histogram governing value
        #[arg(long, value_enum, default_value_t = HistogramMode::Count)]
        mode: HistogramMode,

        /// Histogram key
        #[arg(long, value_enum, default_value_t = KeyedBy::Requested)]
        keyed: KeyedBy,

        /// Fill scaling function
        #[arg(long, value_enum, default_value_t = Scale::Linear)]
        scale: Scale,

        /// Histogram display width
        #[arg(long, default_value_t = DEFAULT_HISTOGRAM_WIDTH)]
        width: usize,

        /// Hide buckets below this share of the maximum (0-1)
        #[arg(long, default_value_t = DEFAULT_CUTOFF)]
        cutoff: f64,

        /// Consolidation worker count
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Treat unmatched frees as fatal instead of warnings
        #[arg(long)]
        strict_frees: bool,

        /// Output path for the JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Bucket the duration log into per-operation histograms
    Durations {
        /// Directory holding the trace logs
        #[arg(short, long)]
        dir: PathBuf,

        /// Process id the logs were captured from
        #[arg(short, long)]
        pid: u32,

        /// Fill scaling function
        #[arg(long, value_enum, default_value_t = Scale::Linear)]
        scale: Scale,

        /// Histogram display width
        #[arg(long, default_value_t = DEFAULT_HISTOGRAM_WIDTH)]
        width: usize,

        /// Hide buckets below this share of the maximum (0-1)
        #[arg(long, default_value_t = DEFAULT_CUTOFF)]
        cutoff: f64,

        /// Output path for the JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the histograms to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Analyze {
            dir,
            pid,
            subsystem,
            mode,
            keyed,
            scale,
            width,
            cutoff,
            workers,
            strict_frees,
            output,
            summary,
        } => {
            let args = AnalyzeArgs {
                dir,
                pid,
                subsystem,
                mode,
                keyed,
                scale,
                width,
                cutoff,
                workers,
                strict_frees,
                output,
                summary,
            };
            commands::analyze::validate_args(&args)?;
            execute_analyze(args)?;
        }

        Commands::Durations {
            dir,
            pid,
            scale,
            width,
            cutoff,
            output,
            summary,
        } => {
            execute_durations(DurationsArgs {
                dir,
                pid,
                scale,
                width,
                cutoff,
                output,
                summary,
            })?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// Display version information
fn display_version() {
    println!("Malloc Trace Analyzer v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Consolidation and statistics engine for native allocation traces.");
}
