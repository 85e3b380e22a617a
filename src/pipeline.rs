//! Replay pipeline
//!
//! Drives a detector from a recorded sensor stream the way a host app does
//! live: every event is ingested as it arrives, and a snapshot is read on an
//! independent cadence of event time (one per second by default).
//!
//! Pipeline stages per event:
//! 1. Schema validation
//! 2. Snapshot tick, if the event crosses the next read time
//! 3. Ingestion into the detector

use crate::config::ClassifierConfig;
use crate::detector::ContextDetector;
use crate::error::ContextError;
use crate::providers::{PermissionProvider, StaticPermissions};
use crate::schema::{self, SensorEvent};
use crate::types::ContextSnapshot;
use crate::ui::{suggested_actions, UiMode};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default snapshot read cadence
pub const DEFAULT_SNAPSHOT_INTERVAL_MS: i64 = 1000;

/// Snapshot read at one tick, with the presentation decisions derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<Uuid>,
    pub context: ContextSnapshot,
    pub ui_mode: UiMode,
    pub suggested_actions: Vec<String>,
}

/// Stateful replayer wrapping one detector session
pub struct ContextReplayer {
    detector: ContextDetector,
    snapshot_interval: Duration,
    next_snapshot_at: Option<DateTime<Utc>>,
    last_timestamp: Option<DateTime<Utc>>,
    events_processed: usize,
}

impl ContextReplayer {
    pub fn new(detector: ContextDetector, snapshot_interval: Duration) -> Self {
        let snapshot_interval = if snapshot_interval <= Duration::zero() {
            Duration::milliseconds(DEFAULT_SNAPSHOT_INTERVAL_MS)
        } else {
            snapshot_interval
        };

        Self {
            detector,
            snapshot_interval,
            next_snapshot_at: None,
            last_timestamp: None,
            events_processed: 0,
        }
    }

    /// Start the detector session
    pub fn start(&mut self, permissions: &mut dyn PermissionProvider) -> Result<Uuid, ContextError> {
        self.detector.initialize(permissions)
    }

    /// Validate and ingest one event. Returns a record when the event
    /// crosses a snapshot tick; the record reflects state before the event.
    pub fn process_event(
        &mut self,
        event: &SensorEvent,
    ) -> Result<Option<ContextRecord>, ContextError> {
        event.validate()?;

        let mut record = None;
        match self.next_snapshot_at {
            None => self.next_snapshot_at = Some(event.timestamp + self.snapshot_interval),
            Some(tick) if event.timestamp >= tick => {
                record = Some(self.record_at(tick));
                let mut next = tick + self.snapshot_interval;
                while next <= event.timestamp {
                    next += self.snapshot_interval;
                }
                self.next_snapshot_at = Some(next);
            }
            Some(_) => {}
        }

        if let Some((kind, axes)) = event.motion() {
            self.detector.ingest_motion_sample(axes, kind)?;
        } else if let Some(fix) = event.location_fix() {
            self.detector.ingest_location_fix(fix)?;
        }

        self.last_timestamp = Some(event.timestamp);
        self.events_processed += 1;
        Ok(record)
    }

    /// Stop the session and return a final record at the last event time
    pub fn finish(&mut self) -> Option<ContextRecord> {
        let record = self.last_timestamp.map(|ts| self.record_at(ts));
        self.detector.stop_monitoring();
        record
    }

    fn record_at(&self, timestamp: DateTime<Utc>) -> ContextRecord {
        let context = self.detector.get_current_context();
        ContextRecord {
            timestamp,
            session_id: self.detector.session_id(),
            ui_mode: UiMode::for_activity(context.activity),
            suggested_actions: suggested_actions(&context),
            context,
        }
    }

    pub fn detector(&self) -> &ContextDetector {
        &self.detector
    }

    pub fn events_processed(&self) -> usize {
        self.events_processed
    }
}

/// Replay a slice of events through a fresh detector (stateless, one-shot)
pub fn replay_events(
    events: &[SensorEvent],
    config: ClassifierConfig,
    snapshot_interval: Duration,
) -> Result<Vec<ContextRecord>, ContextError> {
    let detector = ContextDetector::new(config)?;
    let mut replayer = ContextReplayer::new(detector, snapshot_interval);
    replayer.start(&mut StaticPermissions::granted())?;

    let mut records = Vec::new();
    for event in events {
        if let Some(record) = replayer.process_event(event)? {
            records.push(record);
        }
    }
    records.extend(replayer.finish());

    Ok(records)
}

/// Replay an NDJSON stream at the default one-second read cadence
///
/// # Example
/// ```ignore
/// let records = replay_ndjson(&recorded, ClassifierConfig::default())?;
/// ```
pub fn replay_ndjson(
    input: &str,
    config: ClassifierConfig,
) -> Result<Vec<ContextRecord>, ContextError> {
    let events = schema::parse_ndjson(input)?;
    replay_events(
        &events,
        config,
        Duration::milliseconds(DEFAULT_SNAPSHOT_INTERVAL_MS),
    )
}
