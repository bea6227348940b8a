//! Fence definition and radius normalization policy

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geo::Coordinate;

/// Default fence radius in meters
pub const DEFAULT_RADIUS_METERS: f64 = 500.0;

/// Smallest allowed fence radius in meters
pub const MIN_RADIUS_METERS: f64 = 100.0;

/// Largest allowed fence radius in meters
pub const MAX_RADIUS_METERS: f64 = 15_000.0;

/// Radii above this value snap to the coarse 500 m lattice
const SNAP_THRESHOLD_METERS: f64 = 5_000.0;

/// Snap step for large radii
const SNAP_STEP_METERS: f64 = 500.0;

/// Which boundary crossing direction raises the alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCondition {
    Enter,
    Leave,
}

impl fmt::Display for TriggerCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerCondition::Enter => write!(f, "enter"),
            TriggerCondition::Leave => write!(f, "leave"),
        }
    }
}

/// Label for a fence center designated via place search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceInfo {
    pub name: String,
    pub address: String,
}

/// A circular geofence. The center is absent until the user designates one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fence {
    pub center: Option<Coordinate>,
    pub radius_meters: f64,
}

impl Default for Fence {
    fn default() -> Self {
        Self {
            center: None,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }
}

/// Clamp a raw radius edit to [100, 15000] and snap values above 5000 to
/// the nearest multiple of 500. Values at or below 5000 pass through
/// unsnapped: fine control near small radii, coarse control for large ones.
pub fn normalize_radius(raw: f64) -> f64 {
    let clamped = raw.clamp(MIN_RADIUS_METERS, MAX_RADIUS_METERS);
    if clamped > SNAP_THRESHOLD_METERS {
        (clamped / SNAP_STEP_METERS).round() * SNAP_STEP_METERS
    } else {
        clamped
    }
}
