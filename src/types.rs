//! Core types for the context engine
//!
//! These are the values that cross the detector boundary: raw sensor axes in,
//! activity labels and context snapshots out. The activity and orientation
//! enumerations are a contract that presentation code matches on exhaustively.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw 3-axis sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Axes {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Axes {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm, the scalar stored for accelerometer readings
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y).hypot(self.z)
    }

    /// Sum of absolute axis values, the scalar stored for gyroscope readings
    pub fn abs_sum(&self) -> f64 {
        self.x.abs() + self.y.abs() + self.z.abs()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Scalar a `kind` reading contributes to its window; `None` for sensors
    /// without a window
    pub fn window_scalar(&self, kind: SensorKind) -> Option<f64> {
        match kind {
            SensorKind::Accelerometer => Some(self.magnitude()),
            SensorKind::Gyroscope => Some(self.abs_sum()),
            SensorKind::Magnetometer => None,
        }
    }
}

/// Motion sensor that produced a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    /// Accepted at ~1 Hz but not used for classification
    Magnetometer,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::Magnetometer => "magnetometer",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete activity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityState {
    #[default]
    Idle,
    Walking,
    Lifting,
    OperatingMachinery,
    Driving,
}

impl ActivityState {
    pub const ALL: [ActivityState; 5] = [
        ActivityState::Idle,
        ActivityState::Walking,
        ActivityState::Lifting,
        ActivityState::OperatingMachinery,
        ActivityState::Driving,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityState::Idle => "IDLE",
            ActivityState::Walking => "WALKING",
            ActivityState::Lifting => "LIFTING",
            ActivityState::OperatingMachinery => "OPERATING_MACHINERY",
            ActivityState::Driving => "DRIVING",
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Screen orientation reported alongside the activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    LandscapeLeft,
    LandscapeRight,
    UpsideDown,
}

impl DeviceOrientation {
    /// Derive orientation from viewport dimensions.
    ///
    /// Viewport size alone cannot tell left from right or upright from
    /// upside-down, so a wide viewport is `LandscapeLeft` and anything else
    /// is `Portrait`.
    pub fn from_viewport(width: f64, height: f64) -> Self {
        if width > height {
            DeviceOrientation::LandscapeLeft
        } else {
            DeviceOrientation::Portrait
        }
    }

    /// Derive orientation from a clockwise screen rotation in degrees.
    /// Angles snap to the nearest quarter turn.
    pub fn from_rotation_degrees(degrees: f64) -> Self {
        let quarter = ((degrees / 90.0).round() as i64).rem_euclid(4);
        match quarter {
            1 => DeviceOrientation::LandscapeLeft,
            2 => DeviceOrientation::UpsideDown,
            3 => DeviceOrientation::LandscapeRight,
            _ => DeviceOrientation::Portrait,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceOrientation::Portrait => "PORTRAIT",
            DeviceOrientation::LandscapeLeft => "LANDSCAPE_LEFT",
            DeviceOrientation::LandscapeRight => "LANDSCAPE_RIGHT",
            DeviceOrientation::UpsideDown => "UPSIDE_DOWN",
        }
    }
}

/// Location fix received from the host positioning service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy (meters)
    pub accuracy: f64,
    /// Ground speed (m/s), when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            speed: None,
            timestamp: None,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Check coordinate ranges and that accuracy and speed are finite and non-negative
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::LatitudeOutOfRange(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::LongitudeOutOfRange(self.longitude));
        }
        if !(self.accuracy.is_finite() && self.accuracy >= 0.0) {
            return Err(ValidationError::InvalidAccuracy(self.accuracy));
        }
        if let Some(speed) = self.speed {
            if !(speed.is_finite() && speed >= 0.0) {
                return Err(ValidationError::InvalidSpeed(speed));
            }
        }
        Ok(())
    }
}

/// Location as published in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLocation {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: f64,
}

impl From<&LocationFix> for SnapshotLocation {
    fn from(fix: &LocationFix) -> Self {
        Self {
            lat: fix.latitude,
            lng: fix.longitude,
            accuracy: fix.accuracy,
        }
    }
}

/// Read model returned by `ContextDetector::get_current_context`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSnapshot {
    pub activity: ActivityState,
    /// Confidence in `activity` (0-1)
    pub confidence: f64,
    pub location: Option<SnapshotLocation>,
    pub nearest_beacon: Option<String>,
    pub orientation: DeviceOrientation,
}

/// Host permission needed to start a monitoring session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Location,
    Motion,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Location => f.write_str("location"),
            Permission::Motion => f.write_str("motion"),
        }
    }
}

/// Outcome of a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionGrant {
    Granted,
    Denied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axes_scalars() {
        let axes = Axes::new(3.0, -4.0, 0.0);
        assert!((axes.magnitude() - 5.0).abs() < 1e-12);
        assert!((axes.abs_sum() - 7.0).abs() < 1e-12);
        assert!(!Axes::new(f64::NAN, 0.0, 0.0).is_finite());
    }

    #[test]
    fn test_magnitude_does_not_overflow_for_large_axes() {
        let axes = Axes::new(3e200, 4e200, 0.0);
        assert!(axes.magnitude().is_finite());
        assert!((axes.magnitude() / 5e200 - 1.0).abs() < 1e-12);

        let saturated = Axes::new(f64::MAX, f64::MAX, 0.0);
        assert_eq!(saturated.window_scalar(SensorKind::Gyroscope), Some(f64::INFINITY));
        assert_eq!(saturated.window_scalar(SensorKind::Magnetometer), None);
    }

    #[test]
    fn test_location_fix_validation() {
        assert_eq!(LocationFix::new(34.05, -118.24, 5.0).with_speed(0.0).validate(), Ok(()));
        assert!(matches!(
            LocationFix::new(f64::NAN, 0.0, 5.0).validate(),
            Err(ValidationError::LatitudeOutOfRange(lat)) if lat.is_nan()
        ));
        assert_eq!(
            LocationFix::new(0.0, 181.0, 5.0).validate(),
            Err(ValidationError::LongitudeOutOfRange(181.0))
        );
        assert_eq!(
            LocationFix::new(0.0, 0.0, -1.0).validate(),
            Err(ValidationError::InvalidAccuracy(-1.0))
        );
        assert!(matches!(
            LocationFix::new(0.0, 0.0, 5.0).with_speed(f64::NAN).validate(),
            Err(ValidationError::InvalidSpeed(s)) if s.is_nan()
        ));
    }

    #[test]
    fn test_orientation_from_viewport() {
        assert_eq!(
            DeviceOrientation::from_viewport(800.0, 400.0),
            DeviceOrientation::LandscapeLeft
        );
        assert_eq!(
            DeviceOrientation::from_viewport(400.0, 800.0),
            DeviceOrientation::Portrait
        );
        assert_eq!(
            DeviceOrientation::from_viewport(500.0, 500.0),
            DeviceOrientation::Portrait
        );
    }

    #[test]
    fn test_orientation_from_rotation() {
        assert_eq!(
            DeviceOrientation::from_rotation_degrees(0.0),
            DeviceOrientation::Portrait
        );
        assert_eq!(
            DeviceOrientation::from_rotation_degrees(90.0),
            DeviceOrientation::LandscapeLeft
        );
        assert_eq!(
            DeviceOrientation::from_rotation_degrees(180.0),
            DeviceOrientation::UpsideDown
        );
        assert_eq!(
            DeviceOrientation::from_rotation_degrees(-90.0),
            DeviceOrientation::LandscapeRight
        );
        assert_eq!(
            DeviceOrientation::from_rotation_degrees(361.0),
            DeviceOrientation::Portrait
        );
    }

    #[test]
    fn test_snapshot_wire_names() {
        let snapshot = ContextSnapshot {
            activity: ActivityState::OperatingMachinery,
            confidence: 0.8,
            location: None,
            nearest_beacon: Some("2000:1000".to_string()),
            orientation: DeviceOrientation::LandscapeRight,
        };

        let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["activity"], "OPERATING_MACHINERY");
        assert_eq!(json["nearestBeacon"], "2000:1000");
        assert_eq!(json["orientation"], "LANDSCAPE_RIGHT");
        assert!(json["location"].is_null());
    }
}
