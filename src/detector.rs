//! Streaming context detector
//!
//! `ContextDetector` owns the sliding windows and the held activity for one
//! monitoring session. Motion samples are ingested one at a time; once the
//! accelerometer window is warm every accelerometer sample (or every Nth, per
//! `classify_every`) runs feature extraction and classification
//! synchronously, and the result passes through the hysteresis gate.
//!
//! Snapshots are pure reads and may be taken on any cadence.

use crate::classifier::{self, ActivityGate, Candidate, GateDecision};
use crate::config::{ClassifierConfig, MAX_SAMPLE_MAGNITUDE};
use crate::error::ContextError;
use crate::features::{FeatureDeriver, MotionFeatures};
use crate::providers::{
    BeaconProvider, FixedOrientation, NoBeacons, OrientationProvider, PermissionProvider,
};
use crate::types::{
    ActivityState, Axes, ContextSnapshot, LocationFix, Permission, PermissionGrant, SensorKind,
    SnapshotLocation,
};
use crate::window::SampleWindow;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Permissions requested, in order, when a session starts
pub const REQUIRED_PERMISSIONS: [Permission; 2] = [Permission::Location, Permission::Motion];

/// Activity detector for one device
pub struct ContextDetector {
    config: ClassifierConfig,
    accel: SampleWindow,
    gyro: SampleWindow,
    gate: ActivityGate,
    location: Option<LocationFix>,
    last_features: Option<MotionFeatures>,
    last_candidate: Option<Candidate>,
    last_magnetometer: Option<Axes>,
    magnetometer_samples: u64,
    accel_since_classify: usize,
    active: bool,
    session_id: Option<Uuid>,
    orientation: Box<dyn OrientationProvider + Send>,
    beacons: Box<dyn BeaconProvider + Send>,
}

impl ContextDetector {
    /// Create a detector with a validated configuration.
    ///
    /// Orientation defaults to a fixed portrait reading and beacons to none;
    /// use `with_orientation` / `with_beacons` to wire real providers.
    pub fn new(config: ClassifierConfig) -> Result<Self, ContextError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Create a detector with the default thresholds
    pub fn with_defaults() -> Self {
        Self::build(ClassifierConfig::default())
    }

    fn build(config: ClassifierConfig) -> Self {
        Self {
            accel: SampleWindow::new(config.window_capacity),
            gyro: SampleWindow::new(config.window_capacity),
            gate: ActivityGate::new(config.hysteresis_confidence),
            location: None,
            last_features: None,
            last_candidate: None,
            last_magnetometer: None,
            magnetometer_samples: 0,
            accel_since_classify: 0,
            active: false,
            session_id: None,
            orientation: Box::new(FixedOrientation::default()),
            beacons: Box::new(NoBeacons),
            config,
        }
    }

    pub fn with_orientation(mut self, provider: impl OrientationProvider + Send + 'static) -> Self {
        self.orientation = Box::new(provider);
        self
    }

    pub fn with_beacons(mut self, provider: impl BeaconProvider + Send + 'static) -> Self {
        self.beacons = Box::new(provider);
        self
    }

    /// Request permissions and start a monitoring session.
    ///
    /// On denial the detector stays inactive and ingests nothing. Starting a
    /// new session clears the windows, activity, and location of the previous
    /// one. Calling this while a session is active fails with `AlreadyActive`.
    pub fn initialize(
        &mut self,
        permissions: &mut dyn PermissionProvider,
    ) -> Result<Uuid, ContextError> {
        if self.active {
            return Err(ContextError::AlreadyActive);
        }

        for permission in REQUIRED_PERMISSIONS {
            if permissions.request(permission) == PermissionGrant::Denied {
                warn!(%permission, "context monitoring not started: permission denied");
                return Err(ContextError::PermissionDenied(permission));
            }
        }

        self.reset_session();
        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.active = true;

        info!(%session_id, "context monitoring started");
        Ok(session_id)
    }

    /// Ingest one motion sample.
    ///
    /// Samples arriving while no session is active are ignored. Non-finite
    /// readings, and readings whose derived magnitude exceeds
    /// `MAX_SAMPLE_MAGNITUDE`, are rejected before they reach a window.
    pub fn ingest_motion_sample(&mut self, axes: Axes, kind: SensorKind) -> Result<(), ContextError> {
        if !self.active {
            trace!(%kind, "sample ignored: monitoring inactive");
            return Ok(());
        }
        if !axes.is_finite() {
            warn!(%kind, "non-finite sample rejected");
            return Err(ContextError::NonFiniteSample { kind });
        }

        match kind {
            SensorKind::Accelerometer => {
                self.accel.push(bounded(kind, axes.magnitude())?);
                self.accel_since_classify += 1;

                if self.accel.len() >= self.config.min_samples
                    && self.accel_since_classify >= self.config.classify_every
                {
                    self.accel_since_classify = 0;
                    self.classify();
                }
            }
            SensorKind::Gyroscope => self.gyro.push(bounded(kind, axes.abs_sum())?),
            SensorKind::Magnetometer => {
                self.magnetometer_samples += 1;
                self.last_magnetometer = Some(axes);
            }
        }

        Ok(())
    }

    /// Store a location fix, replacing the previous one.
    ///
    /// Returns `Ok(false)` when the fix was dropped: no session is active, or
    /// `monotonic_location_fixes` is set and the fix is older than the one held.
    /// Out-of-range coordinates, or a non-finite accuracy or speed, are rejected.
    pub fn ingest_location_fix(&mut self, fix: LocationFix) -> Result<bool, ContextError> {
        if !self.active {
            trace!("location fix ignored: monitoring inactive");
            return Ok(false);
        }
        if let Err(e) = fix.validate() {
            warn!(error = %e, "invalid location fix rejected");
            return Err(e.into());
        }

        if self.config.monotonic_location_fixes {
            let held = self.location.as_ref().and_then(|l| l.timestamp);
            if let (Some(held), Some(incoming)) = (held, fix.timestamp) {
                if incoming < held {
                    debug!(%incoming, %held, "stale location fix dropped");
                    return Ok(false);
                }
            }
        }

        self.location = Some(fix);
        Ok(true)
    }

    fn classify(&mut self) {
        let Some(features) = FeatureDeriver::derive(&self.accel, self.config.sample_rate_hz) else {
            return;
        };
        let speed = self.location.as_ref().and_then(|l| l.speed);
        let candidate = classifier::classify(&features, speed, &self.config.thresholds);

        self.last_features = Some(features);
        self.apply_candidate(candidate);
    }

    fn apply_candidate(&mut self, candidate: Candidate) {
        self.last_candidate = Some(candidate);

        match self.gate.offer(candidate) {
            GateDecision::Accepted { from, to } => {
                debug!(
                    %from,
                    %to,
                    confidence = candidate.confidence,
                    "activity changed"
                );
            }
            GateDecision::Rejected => {
                trace!(
                    candidate = %candidate.activity,
                    confidence = candidate.confidence,
                    held = %self.gate.activity(),
                    "candidate below hysteresis threshold"
                );
            }
            GateDecision::Unchanged => {}
        }
    }

    /// Current context; a pure read with no side effects
    pub fn get_current_context(&self) -> ContextSnapshot {
        ContextSnapshot {
            activity: self.gate.activity(),
            confidence: self.gate.confidence(),
            location: self.location.as_ref().map(SnapshotLocation::from),
            nearest_beacon: self.beacons.nearest_beacon(),
            orientation: self.orientation.orientation(),
        }
    }

    /// End the session. The last snapshot stays readable; later samples are ignored.
    pub fn stop_monitoring(&mut self) {
        if self.active {
            info!(session_id = ?self.session_id, "context monitoring stopped");
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activity(&self) -> ActivityState {
        self.gate.activity()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Features from the most recent classification pass
    pub fn last_features(&self) -> Option<MotionFeatures> {
        self.last_features
    }

    /// Candidate from the most recent pass, whether or not the gate accepted it
    pub fn last_candidate(&self) -> Option<Candidate> {
        self.last_candidate
    }

    pub fn location(&self) -> Option<&LocationFix> {
        self.location.as_ref()
    }

    /// Accelerometer magnitude window
    pub fn accelerometer_window(&self) -> &SampleWindow {
        &self.accel
    }

    /// Gyroscope rotation-magnitude window
    pub fn rotation_window(&self) -> &SampleWindow {
        &self.gyro
    }

    pub fn magnetometer_samples(&self) -> u64 {
        self.magnetometer_samples
    }

    pub fn last_magnetometer(&self) -> Option<Axes> {
        self.last_magnetometer
    }

    fn reset_session(&mut self) {
        self.accel.clear();
        self.gyro.clear();
        self.gate.reset();
        self.location = None;
        self.last_features = None;
        self.last_candidate = None;
        self.last_magnetometer = None;
        self.magnetometer_samples = 0;
        self.accel_since_classify = 0;
    }
}

/// Derived window scalar, or an error when it would poison the window statistics
fn bounded(kind: SensorKind, magnitude: f64) -> Result<f64, ContextError> {
    if magnitude > MAX_SAMPLE_MAGNITUDE {
        warn!(%kind, magnitude, "out-of-range sample rejected");
        return Err(ContextError::SampleOutOfRange { kind, magnitude });
    }
    Ok(magnitude)
}

impl Default for ContextDetector {
    fn default() -> Self {
        Self::with_defaults()
    }
}
