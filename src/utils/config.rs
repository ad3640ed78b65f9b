//! Configuration and constants for the analyzer.

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Fixed on-disk record sizes (bytes). The trace files carry no framing;
// record boundaries are implied by these constants alone.
pub const ALLOC_RECORD_SIZE: usize = 88;
pub const DURATION_RECORD_SIZE: usize = 25;
pub const THREAD_RECORD_SIZE: usize = 40;
pub const METADATA_RECORD_SIZE: usize = 16;

/// Length of the fixed thread-name buffer inside a thread record
pub const THREAD_NAME_LEN: usize = 32;

/// Number of opaque call-site identifiers carried per allocation record
pub const CALL_SITE_SLOTS: usize = 4;

/// Default number of Pass-1 consolidation workers
pub const DEFAULT_WORKERS: usize = 8;

/// Default histogram display width (characters of fill)
pub const DEFAULT_HISTOGRAM_WIDTH: usize = 60;

/// Default cutoff: buckets below this share of the governing maximum
/// are omitted from rendered output (0.5%)
pub const DEFAULT_CUTOFF: f64 = 0.005;

// Trace log file-name patterns, keyed by process id.
// The capture side writes three logs per traced process.
pub const ALLOC_LOG_PATTERN: &str = "mtrace_{pid}_alloc.log";
pub const DURATION_LOG_PATTERN: &str = "mtrace_{pid}_duration.log";
pub const METADATA_LOG_PATTERN: &str = "mtrace_{pid}_meta.log";

// Subsystem tag -> human-readable name. Tags are assigned by the capture
// side; anything unlisted is reported under its numeric tag.
pub const SUBSYSTEM_NAMES: &[(u64, &str)] = &[
    (0, "unknown"),
    (1, "heap-metadata"),
    (2, "thread-stacks"),
    (3, "compiler"),
    (4, "class-data"),
    (5, "gc"),
    (6, "code-cache"),
    (7, "symbols"),
    (8, "internal"),
];

/// Look up the display name for a subsystem tag
pub fn subsystem_name(tag: u64) -> String {
    SUBSYSTEM_NAMES
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("subsystem-{}", tag))
}
