//! Geofence monitor: containment, crossing detection, and alarm state
//!
//! The monitor is a pure synchronous state machine. Every operation applies
//! one external event (position sample, fence edit, acknowledgment) and
//! returns what changed, so callers can fan the changes out to signalers
//! and displays without the monitor knowing about them.

use serde::{Deserialize, Serialize};

use crate::fence::{normalize_radius, Fence, PlaceInfo, TriggerCondition};
use crate::geo::{distance_meters, Coordinate};

/// Result of a containment evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub distance_meters: f64,
    pub is_inside: bool,
}

/// What a single applied event changed.
///
/// `evaluation` is present whenever both a fence center and a position were
/// available. `alarm_changed` is present only when `alarm_active` flipped,
/// carrying the new value — consumers are edge-triggered, like the monitor
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Outcome {
    pub evaluation: Option<Evaluation>,
    pub alarm_changed: Option<bool>,
}

/// The geofence monitoring state machine
#[derive(Debug, Clone)]
pub struct GeofenceMonitor {
    fence: Fence,
    trigger: TriggerCondition,
    last_position: Option<Coordinate>,
    // None until the first evaluable sample. The tri-state is what prevents
    // a spurious crossing on that first sample.
    last_containment: Option<bool>,
    alarm_active: bool,
    place_info: Option<PlaceInfo>,
}

impl GeofenceMonitor {
    pub fn new(fence: Fence, trigger: TriggerCondition) -> Self {
        Self {
            fence: Fence {
                center: fence.center,
                radius_meters: normalize_radius(fence.radius_meters),
            },
            trigger,
            last_position: None,
            last_containment: None,
            alarm_active: false,
            place_info: None,
        }
    }

    pub fn fence(&self) -> Fence {
        self.fence
    }

    pub fn trigger(&self) -> TriggerCondition {
        self.trigger
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm_active
    }

    pub fn last_position(&self) -> Option<Coordinate> {
        self.last_position
    }

    pub fn last_containment(&self) -> Option<bool> {
        self.last_containment
    }

    pub fn place_info(&self) -> Option<&PlaceInfo> {
        self.place_info.as_ref()
    }

    /// Apply a new position sample
    pub fn update_position(&mut self, position: Coordinate) -> Outcome {
        self.last_position = Some(position);
        self.evaluate()
    }

    /// Replace the fence center (map click or place selection).
    ///
    /// Clears any active alarm and the cached place label, then re-evaluates
    /// against the new fence. The evaluation may immediately re-raise the
    /// alarm if the last position crosses relative to the new center.
    pub fn designate_center(&mut self, center: Coordinate, place: Option<PlaceInfo>) -> Outcome {
        self.fence.center = Some(center);
        self.place_info = place;
        let cleared = self.clear_alarm();
        let mut outcome = self.evaluate();
        if outcome.alarm_changed.is_none() && cleared {
            outcome.alarm_changed = Some(false);
        }
        outcome
    }

    /// Apply a radius edit after normalization
    pub fn set_radius(&mut self, raw_meters: f64) -> Outcome {
        self.fence.radius_meters = normalize_radius(raw_meters);
        self.evaluate()
    }

    /// Change the trigger condition.
    ///
    /// Unconditionally clears the alarm so no stale alarm from the old rule
    /// survives. Containment is not recomputed here; the next position or
    /// fence event re-derives it.
    pub fn set_trigger(&mut self, trigger: TriggerCondition) -> Outcome {
        self.trigger = trigger;
        Outcome {
            evaluation: None,
            alarm_changed: self.clear_alarm().then_some(false),
        }
    }

    /// Acknowledge the alarm, forcing it inactive
    pub fn acknowledge(&mut self) -> Outcome {
        Outcome {
            evaluation: None,
            alarm_changed: self.clear_alarm().then_some(false),
        }
    }

    fn clear_alarm(&mut self) -> bool {
        let was_active = self.alarm_active;
        self.alarm_active = false;
        was_active
    }

    /// Recompute distance, containment, and crossing against the current
    /// fence. A no-op while either the fence center or a position is absent.
    fn evaluate(&mut self) -> Outcome {
        let (Some(center), Some(position)) = (self.fence.center, self.last_position) else {
            return Outcome::default();
        };

        let distance = distance_meters(position, center);
        // Boundary-inclusive: a sample exactly on the radius is inside
        let is_inside = distance <= self.fence.radius_meters;
        let evaluation = Evaluation {
            distance_meters: distance,
            is_inside,
        };

        let Some(previous) = self.last_containment else {
            // First evaluable sample: establish containment, never alarm
            self.last_containment = Some(is_inside);
            return Outcome {
                evaluation: Some(evaluation),
                alarm_changed: None,
            };
        };

        let mut alarm_changed = None;
        if is_inside != previous {
            let raises = match self.trigger {
                TriggerCondition::Enter => is_inside,
                TriggerCondition::Leave => !is_inside,
            };
            // A crossing in the non-configured direction never clears the
            // alarm; only acknowledgment or a trigger change does.
            if raises && !self.alarm_active {
                self.alarm_active = true;
                alarm_changed = Some(true);
            }
        }
        self.last_containment = Some(is_inside);

        Outcome {
            evaluation: Some(evaluation),
            alarm_changed,
        }
    }
}

impl Default for GeofenceMonitor {
    fn default() -> Self {
        Self::new(Fence::default(), TriggerCondition::Enter)
    }
}
