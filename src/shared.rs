//! Thread-safe detector handle
//!
//! On hosts where sensor callbacks and the UI read timer run on different
//! threads, the windows and held state sit behind a single mutex. Clones
//! share one detector.

use crate::detector::ContextDetector;
use crate::error::ContextError;
use crate::providers::PermissionProvider;
use crate::types::{Axes, ContextSnapshot, LocationFix, SensorKind};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct SharedContextDetector {
    inner: Arc<Mutex<ContextDetector>>,
}

impl SharedContextDetector {
    pub fn new(detector: ContextDetector) -> Self {
        Self {
            inner: Arc::new(Mutex::new(detector)),
        }
    }

    pub fn initialize(
        &self,
        permissions: &mut dyn PermissionProvider,
    ) -> Result<Uuid, ContextError> {
        self.inner.lock().initialize(permissions)
    }

    pub fn ingest_motion_sample(&self, axes: Axes, kind: SensorKind) -> Result<(), ContextError> {
        self.inner.lock().ingest_motion_sample(axes, kind)
    }

    pub fn ingest_location_fix(&self, fix: LocationFix) -> Result<bool, ContextError> {
        self.inner.lock().ingest_location_fix(fix)
    }

    pub fn get_current_context(&self) -> ContextSnapshot {
        self.inner.lock().get_current_context()
    }

    /// Once this returns, no in-flight or later sample can change state
    pub fn stop_monitoring(&self) {
        self.inner.lock().stop_monitoring();
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().is_active()
    }

    /// Run a closure with exclusive access to the detector
    pub fn with<R>(&self, f: impl FnOnce(&mut ContextDetector) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<ContextDetector> for SharedContextDetector {
    fn from(detector: ContextDetector) -> Self {
        Self::new(detector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::StaticPermissions;
    use crate::types::ActivityState;
    use std::thread;

    #[test]
    fn test_ingest_and_read_across_threads() {
        let shared = SharedContextDetector::new(ContextDetector::with_defaults());
        shared.initialize(&mut StaticPermissions::granted()).unwrap();

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                let offset = 2.5_f64.sqrt();
                for i in 0..50 {
                    let z = if i < 25 { 9.8 + offset } else { 9.8 - offset };
                    shared
                        .ingest_motion_sample(Axes::new(0.0, 0.0, z), SensorKind::Accelerometer)
                        .unwrap();
                }
            })
        };

        let reader = {
            let shared = shared.clone();
            thread::spawn(move || {
                for _ in 0..20 {
                    let snapshot = shared.get_current_context();
                    assert!((0.0..=1.0).contains(&snapshot.confidence));
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();

        assert_eq!(shared.get_current_context().activity, ActivityState::Lifting);
        assert_eq!(shared.with(|d| d.accelerometer_window().len()), 50);
    }

    #[test]
    fn test_stop_from_another_handle() {
        let shared = SharedContextDetector::from(ContextDetector::with_defaults());
        shared.initialize(&mut StaticPermissions::granted()).unwrap();

        let other = shared.clone();
        other.stop_monitoring();

        assert!(!shared.is_active());
        shared
            .ingest_motion_sample(Axes::new(0.0, 0.0, 9.8), SensorKind::Accelerometer)
            .unwrap();
        assert_eq!(shared.with(|d| d.accelerometer_window().len()), 0);
    }
}
