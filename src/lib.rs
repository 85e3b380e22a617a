//! Context Engine - On-device activity context detection
//!
//! The engine turns a stream of motion-sensor samples into a discrete
//! activity label with a confidence score, through a deterministic pipeline:
//! sample windows → feature extraction → threshold classification →
//! hysteresis gate → context snapshot.
//!
//! ## Modules
//!
//! - **Detector**: Session lifecycle, ingestion, and snapshots
//! - **Classifier**: Threshold rules and the state-change gate
//! - **Pipeline**: Replay of recorded sensor streams at a fixed read cadence

pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod providers;
pub mod schema;
pub mod shared;
pub mod types;
pub mod ui;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{ActivityGate, Candidate};
pub use config::{ClassifierConfig, ThresholdTable};
pub use detector::ContextDetector;
pub use error::{ContextError, ValidationError};
pub use pipeline::{replay_events, replay_ndjson, ContextRecord, ContextReplayer};
pub use providers::{BeaconProvider, OrientationProvider, PermissionProvider};
pub use shared::SharedContextDetector;
pub use types::{ActivityState, Axes, ContextSnapshot, DeviceOrientation, LocationFix, SensorKind};
pub use ui::UiMode;

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by tooling
pub const PRODUCER_NAME: &str = "context-engine";
