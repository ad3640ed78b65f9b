//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs.

use thiserror::Error;

/// Errors that can occur while mapping and decoding trace logs
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Cannot open trace log {path}: {source}")]
    OpenFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot memory-map trace log {path}: {source}")]
    MapFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Trace log {path} is too large to index on this platform ({len} bytes)")]
    LengthOverflow { path: String, len: u64 },

    #[error("Record size must be non-zero")]
    ZeroRecordSize,
}

/// Errors that can occur during trace consolidation
#[derive(Error, Debug)]
pub enum ConsolidateError {
    #[error("{count} free record(s) had no matching allocation (strict mode)")]
    UnmatchedFree { count: u64 },
}

/// Errors that can occur while building or extending histograms
#[derive(Error, Debug)]
pub enum HistogramError {
    #[error(
        "Overhead cross-check failed: requested-keyed total {by_requested} \
         != actual-keyed total {by_actual}"
    )]
    OverheadMismatch { by_requested: u64, by_actual: u64 },

    #[error("Size resolver failed: {0}")]
    ResolverFailed(String),

    #[error("Size resolver returned {got} sizes for {want} requests")]
    ResolverShortfall { want: usize, got: usize },

    #[error("No histogram bucket for requested size {0} and resolver could not supply one")]
    UnresolvedSize(u64),
}

/// Errors that can occur during report output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
