//! Classifier configuration
//!
//! All tunable numbers live here so thresholds can be adjusted (or swept in
//! tests) without touching the classification rules. Configs deserialize
//! with defaults, so a JSON file only needs the fields it overrides.

use crate::error::ContextError;
use serde::{Deserialize, Serialize};

/// Samples retained per window (10 s at 10 Hz)
pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

/// Accelerometer samples required before classification runs (5 s at 10 Hz)
pub const DEFAULT_MIN_SAMPLES: usize = 50;

/// Assumed motion sensor capture rate
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 10.0;

/// Candidate confidence a state change must exceed
pub const DEFAULT_HYSTERESIS_CONFIDENCE: f64 = 0.7;

/// Largest derived sample magnitude a window accepts; larger readings are corrupt
pub const MAX_SAMPLE_MAGNITUDE: f64 = 1.0e6;

/// Lifting: large variance at low oscillation frequency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftingRule {
    pub min_variance: f64,
    pub max_frequency: f64,
    pub confidence_divisor: f64,
    pub confidence_ceiling: f64,
}

/// Walking: moderate variance with a regular gait frequency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkingRule {
    pub min_variance: f64,
    pub min_frequency: f64,
    pub confidence_divisor: f64,
    pub confidence_ceiling: f64,
}

/// Operating machinery: high-frequency vibration regardless of variance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineryRule {
    pub min_frequency: f64,
    pub confidence_divisor: f64,
    pub confidence_ceiling: f64,
}

/// Driving: smooth motion confirmed by location speed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivingRule {
    pub max_variance: f64,
    /// Ground speed (m/s) the last fix must exceed
    pub min_speed_mps: f64,
    pub confidence: f64,
}

/// Per-activity thresholds, evaluated in field order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdTable {
    pub lifting: LiftingRule,
    pub walking: WalkingRule,
    pub operating_machinery: MachineryRule,
    pub driving: DrivingRule,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            lifting: LiftingRule {
                min_variance: 2.0,
                max_frequency: 1.0,
                confidence_divisor: 3.0,
                confidence_ceiling: 0.95,
            },
            walking: WalkingRule {
                min_variance: 0.5,
                min_frequency: 1.5,
                confidence_divisor: 3.0,
                confidence_ceiling: 0.90,
            },
            operating_machinery: MachineryRule {
                min_frequency: 3.0,
                confidence_divisor: 5.0,
                confidence_ceiling: 0.85,
            },
            driving: DrivingRule {
                max_variance: 0.3,
                min_speed_mps: 5.0,
                confidence: 0.80,
            },
        }
    }
}

/// Full detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Maximum entries per sample window
    pub window_capacity: usize,
    /// Accelerometer entries needed before classifying
    pub min_samples: usize,
    /// Capture rate used to turn zero crossings into crossings per second
    pub sample_rate_hz: f64,
    /// A new activity is accepted only above this confidence
    pub hysteresis_confidence: f64,
    /// Classify on every Nth accelerometer sample once the window is warm
    pub classify_every: usize,
    /// Drop location fixes older than the one already held
    pub monotonic_location_fixes: bool,
    pub thresholds: ThresholdTable,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            min_samples: DEFAULT_MIN_SAMPLES,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            hysteresis_confidence: DEFAULT_HYSTERESIS_CONFIDENCE,
            classify_every: 1,
            monotonic_location_fixes: false,
            thresholds: ThresholdTable::default(),
        }
    }
}

impl ClassifierConfig {
    /// Load a config from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, ContextError> {
        let config: ClassifierConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ContextError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the invariants the classifier relies on
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.window_capacity == 0 {
            return Err(invalid("window_capacity must be positive"));
        }
        if self.min_samples == 0 || self.min_samples > self.window_capacity {
            return Err(invalid(format!(
                "min_samples must be within 1..={}, got {}",
                self.window_capacity, self.min_samples
            )));
        }
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(invalid("sample_rate_hz must be positive"));
        }
        if self.classify_every == 0 {
            return Err(invalid("classify_every must be at least 1"));
        }
        check_unit("hysteresis_confidence", self.hysteresis_confidence)?;

        let t = &self.thresholds;
        check_unit("lifting.confidence_ceiling", t.lifting.confidence_ceiling)?;
        check_unit("walking.confidence_ceiling", t.walking.confidence_ceiling)?;
        check_unit(
            "operating_machinery.confidence_ceiling",
            t.operating_machinery.confidence_ceiling,
        )?;
        check_unit("driving.confidence", t.driving.confidence)?;
        check_positive("lifting.confidence_divisor", t.lifting.confidence_divisor)?;
        check_positive("walking.confidence_divisor", t.walking.confidence_divisor)?;
        check_positive(
            "operating_machinery.confidence_divisor",
            t.operating_machinery.confidence_divisor,
        )?;

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ContextError {
    ContextError::InvalidConfig(msg.into())
}

fn check_unit(name: &str, value: f64) -> Result<(), ContextError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be within [0, 1], got {value}")))
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), ContextError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be positive, got {value}")))
    }
}
