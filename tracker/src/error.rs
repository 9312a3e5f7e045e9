//! Error taxonomy of the tracker service.

use hardware::BaseError;
use shared::ConfigError;
use thiserror::Error;

/// Kind of resource a tracker or base depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ComponentKind {
    Servo,
    Base,
    Camera,
    Vision,
}

/// Errors surfaced by the tracker service.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Attributes missing or malformed; fatal to construction.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// A dependency could not be resolved; fatal to construction.
    #[error("{kind} {name:?} is unavailable")]
    ComponentUnavailable { kind: ComponentKind, name: String },

    /// DoCommand key not recognised; no state was changed.
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    /// The base rejected a direct command (outside the tracking loop).
    #[error("Base error: {0}")]
    Base(#[from] BaseError),
}

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;
