//! Shared utilities: configuration constants and error types.

pub mod config;
pub mod error;
