//! Activity classification rules and the hysteresis gate
//!
//! Classification is a fixed, explainable rule list evaluated in priority
//! order (first match wins):
//!
//! 1. Lifting: high variance, low frequency
//! 2. Walking: moderate variance, gait-range frequency
//! 3. Operating machinery: high frequency
//! 4. Driving: low variance while the last location fix reports speed
//! 5. Idle with zero confidence otherwise
//!
//! The gate then decides whether a candidate may replace the held activity.

use crate::config::ThresholdTable;
use crate::features::MotionFeatures;
use crate::types::ActivityState;
use serde::{Deserialize, Serialize};

/// Activity proposed by one classification pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub activity: ActivityState,
    pub confidence: f64,
}

impl Candidate {
    pub fn idle() -> Self {
        Self {
            activity: ActivityState::Idle,
            confidence: 0.0,
        }
    }
}

/// Apply the threshold rules to one feature set.
///
/// `speed_mps` is the ground speed of the most recent location fix, if any.
pub fn classify(
    features: &MotionFeatures,
    speed_mps: Option<f64>,
    thresholds: &ThresholdTable,
) -> Candidate {
    let variance = features.variance;
    let frequency = features.frequency;

    let lifting = &thresholds.lifting;
    if variance > lifting.min_variance && frequency < lifting.max_frequency {
        return Candidate {
            activity: ActivityState::Lifting,
            confidence: capped(variance / lifting.confidence_divisor, lifting.confidence_ceiling),
        };
    }

    let walking = &thresholds.walking;
    if variance > walking.min_variance && frequency > walking.min_frequency {
        return Candidate {
            activity: ActivityState::Walking,
            confidence: capped(frequency / walking.confidence_divisor, walking.confidence_ceiling),
        };
    }

    let machinery = &thresholds.operating_machinery;
    if frequency > machinery.min_frequency {
        return Candidate {
            activity: ActivityState::OperatingMachinery,
            confidence: capped(
                frequency / machinery.confidence_divisor,
                machinery.confidence_ceiling,
            ),
        };
    }

    let driving = &thresholds.driving;
    let moving_fast = speed_mps.is_some_and(|speed| speed > driving.min_speed_mps);
    if variance < driving.max_variance && moving_fast {
        return Candidate {
            activity: ActivityState::Driving,
            confidence: driving.confidence.clamp(0.0, 1.0),
        };
    }

    Candidate::idle()
}

fn capped(ratio: f64, ceiling: f64) -> f64 {
    ratio.min(ceiling).clamp(0.0, 1.0)
}

/// Outcome of offering a candidate to the gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    /// The candidate replaced the held activity
    Accepted {
        from: ActivityState,
        to: ActivityState,
    },
    /// The candidate matches the held activity; nothing changes
    Unchanged,
    /// The candidate differs but is not confident enough
    Rejected,
}

/// Hysteresis gate holding the current activity and its confidence.
///
/// A candidate replaces the held state only when it names a different
/// activity and its confidence exceeds the threshold. Rejected candidates
/// are discarded, never blended in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityGate {
    activity: ActivityState,
    confidence: f64,
    threshold: f64,
}

impl ActivityGate {
    pub fn new(threshold: f64) -> Self {
        Self {
            activity: ActivityState::Idle,
            confidence: 0.0,
            threshold,
        }
    }

    pub fn offer(&mut self, candidate: Candidate) -> GateDecision {
        if candidate.activity == self.activity {
            return GateDecision::Unchanged;
        }
        if candidate.confidence <= self.threshold {
            return GateDecision::Rejected;
        }

        let from = self.activity;
        self.activity = candidate.activity;
        self.confidence = candidate.confidence.clamp(0.0, 1.0);
        GateDecision::Accepted {
            from,
            to: candidate.activity,
        }
    }

    pub fn activity(&self) -> ActivityState {
        self.activity
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Return to `Idle` with zero confidence
    pub fn reset(&mut self) {
        self.activity = ActivityState::Idle;
        self.confidence = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(variance: f64, frequency: f64) -> MotionFeatures {
        MotionFeatures {
            mean: 9.8,
            variance,
            frequency,
            sample_count: 50,
        }
    }

    fn run(variance: f64, frequency: f64, speed: Option<f64>) -> Candidate {
        classify(&features(variance, frequency), speed, &ThresholdTable::default())
    }

    #[test]
    fn test_lifting() {
        let c = run(2.5, 0.2, None);
        assert_eq!(c.activity, ActivityState::Lifting);
        assert!((c.confidence - 2.5 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_lifting_confidence_capped() {
        let c = run(10.0, 0.2, None);
        assert_eq!(c.activity, ActivityState::Lifting);
        assert_eq!(c.confidence, 0.95);
    }

    #[test]
    fn test_lifting_takes_priority_over_driving() {
        let c = run(2.5, 0.0, Some(20.0));
        assert_eq!(c.activity, ActivityState::Lifting);
    }

    #[test]
    fn test_high_variance_high_frequency_is_walking() {
        let c = run(2.5, 2.4, None);
        assert_eq!(c.activity, ActivityState::Walking);
        assert!((c.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_walking_confidence_capped() {
        let c = run(1.0, 9.8, None);
        assert_eq!(c.activity, ActivityState::Walking);
        assert_eq!(c.confidence, 0.90);
    }

    #[test]
    fn test_operating_machinery() {
        let c = run(0.1, 4.0, None);
        assert_eq!(c.activity, ActivityState::OperatingMachinery);
        assert!((c.confidence - 0.8).abs() < 1e-9);

        let capped = run(0.1, 9.0, None);
        assert_eq!(capped.confidence, 0.85);
    }

    #[test]
    fn test_driving_requires_speed() {
        assert_eq!(run(0.2, 0.2, None).activity, ActivityState::Idle);
        assert_eq!(run(0.2, 0.2, Some(5.0)).activity, ActivityState::Idle);

        let c = run(0.2, 0.2, Some(12.0));
        assert_eq!(c.activity, ActivityState::Driving);
        assert_eq!(c.confidence, 0.80);
    }

    #[test]
    fn test_rule_thresholds_are_strict() {
        const EPS: f64 = 1e-9;

        // Each rule fails exactly at its threshold and matches just past it
        let cases = [
            ((2.0, 0.5, None), (2.0 + EPS, 0.5, None), ActivityState::Lifting),
            ((2.5, 1.0, None), (2.5, 1.0 - EPS, None), ActivityState::Lifting),
            ((0.5, 2.0, None), (0.5 + EPS, 2.0, None), ActivityState::Walking),
            ((1.0, 1.5, None), (1.0, 1.5 + EPS, None), ActivityState::Walking),
            ((0.1, 3.0, None), (0.1, 3.0 + EPS, None), ActivityState::OperatingMachinery),
            ((0.3, 0.0, Some(10.0)), (0.3 - EPS, 0.0, Some(10.0)), ActivityState::Driving),
        ];

        for ((v, f, speed), (nv, nf, nspeed), activity) in cases {
            assert_eq!(
                run(v, f, speed).activity,
                ActivityState::Idle,
                "variance {v} frequency {f} must not match {activity}"
            );
            assert_eq!(
                run(nv, nf, nspeed).activity,
                activity,
                "variance {nv} frequency {nf}"
            );
        }
    }

    #[test]
    fn test_fallback_is_idle() {
        assert_eq!(run(0.0, 0.0, None), Candidate::idle());
        // Between driving and walking variance bands with no rule matching
        assert_eq!(run(0.4, 1.0, Some(30.0)), Candidate::idle());
    }

    #[test]
    fn test_gate_accepts_confident_change() {
        let mut gate = ActivityGate::new(0.7);
        let decision = gate.offer(Candidate {
            activity: ActivityState::Walking,
            confidence: 0.9,
        });

        assert_eq!(
            decision,
            GateDecision::Accepted {
                from: ActivityState::Idle,
                to: ActivityState::Walking
            }
        );
        assert_eq!(gate.activity(), ActivityState::Walking);
        assert_eq!(gate.confidence(), 0.9);
    }

    #[test]
    fn test_gate_rejects_low_confidence_change() {
        let mut gate = ActivityGate::new(0.7);
        gate.offer(Candidate {
            activity: ActivityState::Walking,
            confidence: 0.9,
        });

        let decision = gate.offer(Candidate {
            activity: ActivityState::Lifting,
            confidence: 0.69,
        });

        assert_eq!(decision, GateDecision::Rejected);
        assert_eq!(gate.activity(), ActivityState::Walking);
        assert_eq!(gate.confidence(), 0.9);
    }

    #[test]
    fn test_gate_threshold_is_strict() {
        let mut gate = ActivityGate::new(0.7);
        let decision = gate.offer(Candidate {
            activity: ActivityState::Driving,
            confidence: 0.7,
        });
        assert_eq!(decision, GateDecision::Rejected);
    }

    #[test]
    fn test_gate_same_activity_keeps_confidence() {
        let mut gate = ActivityGate::new(0.7);
        gate.offer(Candidate {
            activity: ActivityState::Walking,
            confidence: 0.9,
        });

        let decision = gate.offer(Candidate {
            activity: ActivityState::Walking,
            confidence: 0.75,
        });

        assert_eq!(decision, GateDecision::Unchanged);
        assert_eq!(gate.confidence(), 0.9);
    }

    #[test]
    fn test_idle_candidate_never_displaces() {
        let mut gate = ActivityGate::new(0.7);
        gate.offer(Candidate {
            activity: ActivityState::Lifting,
            confidence: 0.8,
        });

        assert_eq!(gate.offer(Candidate::idle()), GateDecision::Rejected);
        assert_eq!(gate.activity(), ActivityState::Lifting);
    }
}
