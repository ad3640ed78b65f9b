//! Malloc Trace Analyzer
//!
//! Consolidation and statistics engine for native allocation traces
//! (malloc / realloc / free) captured from a running process.
//!
//! Given the complete trace of one process run, this crate:
//! - resolves realloc/free chains backward to find which records
//!   represent memory still live at the end of the trace,
//! - aggregates per-thread and per-subsystem memory statistics, and
//! - builds exact-value size and duration histograms for
//!   allocator-efficiency diagnosis.
//!
//! This crate provides the core implementation for the `mtrace` CLI
//! tool; the presentation layer consumes the numeric report values.

pub mod consolidate;
pub mod decoder;
pub mod histogram;
pub mod report;
pub mod stats;
pub mod trace;
pub mod utils;
