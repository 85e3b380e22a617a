//! Presentation contract
//!
//! Maps a snapshot to the interface mode and suggested actions the mobile
//! client renders. Every match on `ActivityState` here is exhaustive, so a
//! new activity will not compile until each consumer decides how to show it.

use crate::types::{ActivityState, ContextSnapshot};
use serde::{Deserialize, Serialize};

/// Interface layout selected from the current activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiMode {
    /// Full touch interface
    Normal,
    /// Hands busy: voice commands only
    Voice,
    /// Eyes on the road: status only
    Minimal,
}

impl UiMode {
    pub fn for_activity(activity: ActivityState) -> Self {
        match activity {
            ActivityState::Lifting | ActivityState::OperatingMachinery => UiMode::Voice,
            ActivityState::Driving => UiMode::Minimal,
            ActivityState::Idle | ActivityState::Walking => UiMode::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UiMode::Normal => "normal",
            UiMode::Voice => "voice",
            UiMode::Minimal => "minimal",
        }
    }
}

/// Priority tasks to surface for the current context
pub fn suggested_actions(snapshot: &ContextSnapshot) -> Vec<String> {
    if snapshot.activity == ActivityState::Lifting {
        return vec!["Safety Check".to_string(), "Material Verification".to_string()];
    }

    if let Some(beacon) = &snapshot.nearest_beacon {
        return vec![format!("Zone: {beacon}"), "Inspect Equipment".to_string()];
    }

    vec![
        "Daily Report".to_string(),
        "Task Assignment".to_string(),
        "Site Photos".to_string(),
    ]
}
