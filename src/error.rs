use thiserror::Error;

/// Telemetry engine error types
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Unknown exercise type: {0}")]
    UnknownExerciseType(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Session already tracking")]
    AlreadyTracking,

    #[error("Session not tracking")]
    NotTracking,

    #[error("Invalid session log: {0}")]
    InvalidLog(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine operations
pub type TResult<T> = Result<T, TelemetryError>;
