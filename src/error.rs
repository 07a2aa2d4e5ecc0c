//! Error types for the offer flow.

/// Top-level error type for the wizard service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend API error: {0}")]
    Api(#[from] ApiError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the external property backend.
///
/// No retry/timeout classification is attached — every remote failure
/// requires explicit user re-initiation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Backend returned status {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Property not found: {id}")]
    PropertyNotFound { id: String },

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Synchronous input validation errors — detected before any network
/// call and surfaced inline next to the offending field.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field {field} is required")]
    Required { field: String },

    #[error("Invalid value for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("Fields {first} and {second} do not match")]
    Mismatch { first: String, second: String },

    #[error("No file selected")]
    NoFileSelected,
}

/// Errors from the flow engine itself.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Unknown turn: {id}")]
    UnknownTurn { id: String },

    #[error("Turn {id} is not interactive")]
    NotInteractive { id: String },

    #[error("Turn {id} was already resolved")]
    AlreadyResolved { id: String },

    #[error("Turn {id} has a submission in flight")]
    SubmissionInFlight { id: String },

    #[error("Controller is disposed")]
    Disposed,

    #[error("No step script defined for step {step}")]
    NoScript { step: usize },
}

/// Result type alias for the wizard service.
pub type Result<T> = std::result::Result<T, Error>;
