//! Sensor event schema for recorded streams
//!
//! A recorded session is a sequence of timestamped events, one per line
//! (NDJSON) or as a JSON array:
//!
//! ```json
//! {"timestamp":"2024-03-01T08:00:00.000Z","kind":"accelerometer","x":0.1,"y":0.2,"z":9.8}
//! {"timestamp":"2024-03-01T08:00:05.000Z","kind":"location","latitude":34.05,"longitude":-118.24,"accuracy":6.0,"speed":12.5}
//! ```

use crate::config::MAX_SAMPLE_MAGNITUDE;
use crate::error::{ContextError, ValidationError};
use crate::types::{Axes, LocationFix, SensorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current sensor event schema version
pub const SCHEMA_VERSION: &str = "ctx.sensor_event.v1";

/// Payload of one sensor event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SensorReading {
    Accelerometer {
        x: f64,
        y: f64,
        z: f64,
    },
    Gyroscope {
        x: f64,
        y: f64,
        z: f64,
    },
    Magnetometer {
        x: f64,
        y: f64,
        z: f64,
    },
    Location {
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
    },
}

/// Timestamped sensor event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub reading: SensorReading,
}

impl SensorEvent {
    /// Motion sensor kind and axes, or `None` for location events
    pub fn motion(&self) -> Option<(SensorKind, Axes)> {
        match self.reading {
            SensorReading::Accelerometer { x, y, z } => {
                Some((SensorKind::Accelerometer, Axes::new(x, y, z)))
            }
            SensorReading::Gyroscope { x, y, z } => Some((SensorKind::Gyroscope, Axes::new(x, y, z))),
            SensorReading::Magnetometer { x, y, z } => {
                Some((SensorKind::Magnetometer, Axes::new(x, y, z)))
            }
            SensorReading::Location { .. } => None,
        }
    }

    /// Location fix stamped with the event time, or `None` for motion events
    pub fn location_fix(&self) -> Option<LocationFix> {
        match self.reading {
            SensorReading::Location {
                latitude,
                longitude,
                accuracy,
                speed,
            } => Some(LocationFix {
                latitude,
                longitude,
                accuracy,
                speed,
                timestamp: Some(self.timestamp),
            }),
            _ => None,
        }
    }

    /// Check ranges and finiteness
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some((kind, axes)) = self.motion() {
            for (axis, value) in [('x', axes.x), ('y', axes.y), ('z', axes.z)] {
                if !value.is_finite() {
                    return Err(ValidationError::NonFiniteAxis { kind, axis });
                }
            }
            if let Some(magnitude) = axes.window_scalar(kind) {
                if magnitude > MAX_SAMPLE_MAGNITUDE {
                    return Err(ValidationError::MagnitudeOutOfRange { kind, magnitude });
                }
            }
            return Ok(());
        }

        match self.location_fix() {
            Some(fix) => fix.validate(),
            None => Ok(()),
        }
    }
}

/// Parse a JSON array of sensor events
pub fn parse_array(json: &str) -> Result<Vec<SensorEvent>, ContextError> {
    let events: Vec<SensorEvent> = serde_json::from_str(json)?;
    Ok(events)
}

/// Parse NDJSON sensor events, skipping blank lines
pub fn parse_ndjson(ndjson: &str) -> Result<Vec<SensorEvent>, ContextError> {
    let mut events = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<SensorEvent>(trimmed) {
            Ok(event) => events.push(event),
            Err(e) => {
                return Err(ContextError::ParseError(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(events)
}

/// Index and error of every invalid event
pub fn validate_events(events: &[SensorEvent]) -> Vec<(usize, ValidationError)> {
    events
        .iter()
        .enumerate()
        .filter_map(|(idx, event)| event.validate().err().map(|e| (idx, e)))
        .collect()
}
