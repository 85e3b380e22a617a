//! Motion feature extraction
//!
//! This module derives the statistics the classifier works from:
//! - Mean and population variance of the accelerometer magnitude
//! - A zero-crossing frequency proxy (sign changes of the centered signal
//!   per notional second at the assumed capture rate)

use crate::window::SampleWindow;
use serde::{Deserialize, Serialize};

/// Statistics computed over one accelerometer window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionFeatures {
    pub mean: f64,
    pub variance: f64,
    /// Zero crossings per second; a proxy, not a spectral estimate
    pub frequency: f64,
    pub sample_count: usize,
}

/// Feature deriver for magnitude windows
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Derive features from a window. Returns `None` for an empty window.
    pub fn derive(window: &SampleWindow, sample_rate_hz: f64) -> Option<MotionFeatures> {
        let values = window.to_vec();
        Self::derive_from_slice(&values, sample_rate_hz)
    }

    /// Derive features from raw magnitudes in arrival order
    pub fn derive_from_slice(values: &[f64], sample_rate_hz: f64) -> Option<MotionFeatures> {
        if values.is_empty() || sample_rate_hz <= 0.0 {
            return None;
        }

        let mean = compute_mean(values);
        let variance = compute_variance(values, mean);
        let crossings = count_zero_crossings(values, mean);
        let seconds = values.len() as f64 / sample_rate_hz;

        Some(MotionFeatures {
            mean,
            variance,
            frequency: crossings as f64 / seconds,
            sample_count: values.len(),
        })
    }
}

fn compute_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance about `mean`
fn compute_variance(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Count sign changes of `(v - mean)` between consecutive samples.
/// A sample sitting exactly on the mean never counts as a crossing.
fn count_zero_crossings(values: &[f64], mean: f64) -> usize {
    values
        .windows(2)
        .filter(|pair| (pair[0] - mean) * (pair[1] - mean) < 0.0)
        .count()
}
