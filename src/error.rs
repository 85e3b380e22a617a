//! Error types for the context engine

use crate::types::{Permission, SensorKind};
use thiserror::Error;

/// Errors surfaced by the detector, its configuration, and the replay pipeline
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Required permission not granted: {0}")]
    PermissionDenied(Permission),

    #[error("Monitoring session already active")]
    AlreadyActive,

    #[error("Non-finite {kind} sample rejected")]
    NonFiniteSample { kind: SensorKind },

    #[error("{kind} sample magnitude {magnitude} out of range")]
    SampleOutOfRange { kind: SensorKind, magnitude: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Schema violations found in a replayed sensor event
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{kind} axis {axis} is not finite")]
    NonFiniteAxis { kind: SensorKind, axis: char },

    #[error("{kind} magnitude {magnitude} out of range")]
    MagnitudeOutOfRange { kind: SensorKind, magnitude: f64 },

    #[error("Latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("Accuracy must be a finite non-negative number, got {0}")]
    InvalidAccuracy(f64),

    #[error("Speed must be a finite non-negative number, got {0}")]
    InvalidSpeed(f64),
}
