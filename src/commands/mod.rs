//! CLI command implementations.

pub mod analyze;
pub mod durations;

pub use analyze::{execute_analyze, AnalyzeArgs};
pub use durations::{execute_durations, DurationsArgs};
