//! Exact-value histograms over allocation sizes and operation
//! durations, plus the shared fill-length rendering contract.

pub mod durations;
pub mod render;
pub mod sizes;

// Re-export main types
pub use durations::{CountHistogram, DurationHistograms};
pub use render::{fill_len, scale_percent, RenderedRow, Scale};
pub use sizes::{HistogramMode, KeyedBy, SizeBucket, SizeHistograms, SizeResolver};
