//! Fill-length computation for histogram rendering.
//!
//! The engine produces values, not layout: for each bucket the caller
//! gets its share of the governing maximum and a fill length scaled to
//! a display width. Two scales are offered; the quadratic one eases
//! small values up so sparse buckets stay visible.

use serde::{Deserialize, Serialize};

/// Fill scaling function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Scale {
    #[default]
    Linear,
    Quadratic,
}

/// Quadratic easing through (0,0), (25,50) and (100,100) on a 0-100
/// percent scale, clamped to 100.
fn quadratic_ease(percent: f64) -> f64 {
    let eased = -percent * percent / 75.0 + 7.0 * percent / 3.0;
    eased.clamp(0.0, 100.0)
}

/// Map a 0-100 percentage through the chosen scale
pub fn scale_percent(percent: f64, scale: Scale) -> f64 {
    match scale {
        Scale::Linear => percent.clamp(0.0, 100.0),
        Scale::Quadratic => quadratic_ease(percent),
    }
}

/// Fill length for a bucket value against the governing maximum
pub fn fill_len(value: u64, max: u64, width: usize, scale: Scale) -> usize {
    if max == 0 {
        return 0;
    }
    let percent = (value as f64 / max as f64) * 100.0;
    (scale_percent(percent, scale) / 100.0 * width as f64).round() as usize
}

/// Does this bucket's share of the maximum exceed the render cutoff?
pub fn passes_cutoff(value: u64, max: u64, cutoff: f64) -> bool {
    max > 0 && (value as f64 / max as f64) > cutoff
}

/// One renderable histogram row, in ascending key order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderedRow {
    pub key: u64,
    pub count: u64,
    pub overhead: u64,
    /// value / governing maximum, before scaling
    pub fill_ratio: f64,
    /// scaled fill length in display characters
    pub fill: usize,
}
