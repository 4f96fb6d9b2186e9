use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures of the remote presence channel. None of these are fatal:
/// write failures keep the optimistic value, read failures keep the last
/// known value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenceError {
    #[error("presence write failed: {0}")]
    WriteFailed(String),

    #[error("presence read failed: {0}")]
    ReadFailed(String),

    #[error("presence write timed out after {0}s")]
    Timeout(u64),

    #[error("presence channel closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location permission revoked")]
    PermissionRevoked,

    #[error("location provider unavailable: {0}")]
    ProviderUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("map style not loaded")]
    StyleNotLoaded,

    #[error("marker operation failed: {0}")]
    MarkerFailed(String),

    #[error("camera update failed: {0}")]
    CameraFailed(String),

    #[error("map surface released")]
    Released,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("surface already destroyed")]
    Destroyed,
}

#[derive(Debug, thiserror::Error)]
pub enum RideLinkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Presence(#[from] PresenceError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
