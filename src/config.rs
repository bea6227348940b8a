//! Configuration types for the geofence service

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::fence::{normalize_radius, Fence, TriggerCondition, DEFAULT_RADIUS_METERS};
use crate::geo::Coordinate;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fence: FenceConfig,
    #[serde(default = "default_trigger")]
    pub trigger: TriggerCondition,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fence: FenceConfig::default(),
            trigger: default_trigger(),
            alarm: AlarmConfig::default(),
            history_size: default_history_size(),
        }
    }
}

/// Initial fence definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FenceConfig {
    /// Optional starting center; usually designated interactively later
    #[serde(default)]
    pub center: Option<Coordinate>,
    #[serde(default = "default_radius_meters")]
    pub radius_meters: f64,
}

impl Default for FenceConfig {
    fn default() -> Self {
        Self {
            center: None,
            radius_meters: default_radius_meters(),
        }
    }
}

impl FenceConfig {
    /// Build the initial fence, normalizing the radius the same way an
    /// interactive edit would
    pub fn to_fence(&self) -> Fence {
        Fence {
            center: self.center,
            radius_meters: normalize_radius(self.radius_meters),
        }
    }
}

/// Alarm signaling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    #[serde(default = "default_repeat_interval_ms")]
    pub repeat_interval_ms: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            repeat_interval_ms: default_repeat_interval_ms(),
        }
    }
}

fn default_trigger() -> TriggerCondition {
    TriggerCondition::Enter
}

fn default_radius_meters() -> f64 {
    DEFAULT_RADIUS_METERS
}

fn default_repeat_interval_ms() -> u64 {
    2000
}

fn default_history_size() -> usize {
    100
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::GeofenceError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
