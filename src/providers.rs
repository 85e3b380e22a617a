//! Injectable host capabilities
//!
//! The detector never talks to a platform API directly. Permissions, screen
//! orientation, and beacon proximity are supplied through these traits so the
//! same core runs on a phone, an embedded board, or a test harness.

use crate::types::{DeviceOrientation, Permission, PermissionGrant};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Grants or denies host permissions when a session starts
pub trait PermissionProvider {
    fn request(&mut self, permission: Permission) -> PermissionGrant;
}

/// Reports the current screen orientation at snapshot time
pub trait OrientationProvider {
    fn orientation(&self) -> DeviceOrientation;
}

/// Reports the identifier of the nearest ranged beacon, if any
pub trait BeaconProvider {
    fn nearest_beacon(&self) -> Option<String>;
}

impl<F> OrientationProvider for F
where
    F: Fn() -> DeviceOrientation,
{
    fn orientation(&self) -> DeviceOrientation {
        self()
    }
}

/// Permission provider with a fixed answer per permission
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    denied: HashSet<Permission>,
}

impl StaticPermissions {
    pub fn granted() -> Self {
        Self::default()
    }

    pub fn denying(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            denied: permissions.into_iter().collect(),
        }
    }
}

impl PermissionProvider for StaticPermissions {
    fn request(&mut self, permission: Permission) -> PermissionGrant {
        if self.denied.contains(&permission) {
            PermissionGrant::Denied
        } else {
            PermissionGrant::Granted
        }
    }
}

/// Orientation that never changes
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOrientation(pub DeviceOrientation);

impl OrientationProvider for FixedOrientation {
    fn orientation(&self) -> DeviceOrientation {
        self.0
    }
}

/// Display dimensions in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 390.0,
            height: 844.0,
        }
    }
}

/// Viewport cell the host updates on resize; orientation is derived on read.
///
/// Clones share the same cell, so the host can keep one handle while the
/// detector holds another.
#[derive(Debug, Clone, Default)]
pub struct SharedViewport {
    inner: Arc<Mutex<Viewport>>,
}

impl SharedViewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Viewport { width, height })),
        }
    }

    pub fn set(&self, width: f64, height: f64) {
        *self.inner.lock() = Viewport { width, height };
    }

    pub fn get(&self) -> Viewport {
        *self.inner.lock()
    }
}

impl OrientationProvider for SharedViewport {
    fn orientation(&self) -> DeviceOrientation {
        let viewport = self.get();
        DeviceOrientation::from_viewport(viewport.width, viewport.height)
    }
}

/// Beacon provider for deployments without beacon hardware
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBeacons;

impl BeaconProvider for NoBeacons {
    fn nearest_beacon(&self) -> Option<String> {
        None
    }
}

/// Coarse proximity bucket reported by beacon ranging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proximity {
    Immediate,
    Near,
    Far,
    Unknown,
}

/// One beacon from a ranging callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedBeacon {
    pub major: u16,
    pub minor: u16,
    /// Estimated distance (meters); lower is closer
    pub accuracy: f64,
    pub proximity: Proximity,
}

/// Holds the latest ranging result, closest beacon first.
///
/// Beacons with unknown proximity are discarded. The nearest beacon is named
/// `"major:minor"`.
#[derive(Debug, Clone, Default)]
pub struct BeaconRanging {
    beacons: Arc<Mutex<Vec<RangedBeacon>>>,
}

impl BeaconRanging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the ranged set with a new callback result
    pub fn update(&self, beacons: Vec<RangedBeacon>) {
        let mut ranged: Vec<RangedBeacon> = beacons
            .into_iter()
            .filter(|b| b.proximity != Proximity::Unknown && b.accuracy.is_finite())
            .collect();
        ranged.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy));
        *self.beacons.lock() = ranged;
    }

    pub fn len(&self) -> usize {
        self.beacons.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.beacons.lock().is_empty()
    }
}

impl BeaconProvider for BeaconRanging {
    fn nearest_beacon(&self) -> Option<String> {
        self.beacons
            .lock()
            .first()
            .map(|b| format!("{}:{}", b.major, b.minor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_permissions() {
        let mut all = StaticPermissions::granted();
        assert_eq!(all.request(Permission::Location), PermissionGrant::Granted);

        let mut no_location = StaticPermissions::denying([Permission::Location]);
        assert_eq!(
            no_location.request(Permission::Location),
            PermissionGrant::Denied
        );
        assert_eq!(
            no_location.request(Permission::Motion),
            PermissionGrant::Granted
        );
    }

    #[test]
    fn test_closure_orientation() {
        let provider = || DeviceOrientation::UpsideDown;
        assert_eq!(provider.orientation(), DeviceOrientation::UpsideDown);
    }

    #[test]
    fn test_shared_viewport_tracks_resize() {
        let viewport = SharedViewport::new(390.0, 844.0);
        let detector_side = viewport.clone();
        assert_eq!(detector_side.orientation(), DeviceOrientation::Portrait);

        viewport.set(844.0, 390.0);
        assert_eq!(detector_side.orientation(), DeviceOrientation::LandscapeLeft);
    }

    #[test]
    fn test_beacon_ranging_picks_closest_known() {
        let ranging = BeaconRanging::new();
        assert_eq!(ranging.nearest_beacon(), None);

        ranging.update(vec![
            RangedBeacon {
                major: 2000,
                minor: 1001,
                accuracy: 4.5,
                proximity: Proximity::Far,
            },
            RangedBeacon {
                major: 2000,
                minor: 1000,
                accuracy: 0.4,
                proximity: Proximity::Unknown,
            },
            RangedBeacon {
                major: 2000,
                minor: 1002,
                accuracy: 1.2,
                proximity: Proximity::Near,
            },
        ]);

        assert_eq!(ranging.len(), 2);
        assert_eq!(ranging.nearest_beacon().as_deref(), Some("2000:1002"));

        ranging.update(Vec::new());
        assert_eq!(ranging.nearest_beacon(), None);
    }
}
