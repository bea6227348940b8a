//! Error types for the geofence service

/// Errors that can occur in the geofence service
#[derive(Debug, thiserror::Error)]
pub enum GeofenceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Signaler error: {0}")]
    Signaler(String),

    #[error("Engine unavailable: {0}")]
    Engine(String),
}

/// Result type alias for geofence operations
pub type Result<T> = std::result::Result<T, GeofenceError>;
