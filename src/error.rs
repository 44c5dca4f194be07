//! Unified error hierarchy for fittrack
//!
//! Every failure is scoped to a single user action: nothing here is fatal to
//! the process. Variants carry enough structure for the CLI to pick a
//! notification and for tracing to pick a level.

use thiserror::Error;

/// Top-level error type for all fittrack operations
#[derive(Debug, Error)]
pub enum FitTrackError {
    /// Malformed user input (workout/goal drafts, AI request parameters)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// AI response could not be turned into typed entities
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// Persistence failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// AI service failures
    #[error("AI service error: {0}")]
    Ai(#[from] AiError),

    /// No active or completed goal with this id
    #[error("Goal not found: {0}")]
    GoalNotFound(String),

    /// No planned or logged workout with this id
    #[error("Workout not found: {0}")]
    WorkoutNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Input validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required text field is blank
    #[error("{field} is required")]
    Required { field: String },

    /// A numeric field is outside its accepted range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        value: i64,
    },

    /// Per-set values do not line up with the set count
    #[error("{exercise}: expected {sets} {field} values, got {actual}")]
    MisalignedSets {
        exercise: String,
        field: String,
        sets: u32,
        actual: usize,
    },

    /// A date is outside the window the action accepts
    #[error("Invalid date for {field}: {reason}")]
    InvalidDate { field: String, reason: String },

    /// A value could not be parsed at all
    #[error("Could not parse {field} from '{input}': {reason}")]
    Unparseable {
        field: String,
        input: String,
        reason: String,
    },
}

/// Errors turning an externally generated payload into typed entities
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    /// Payload is not JSON at all
    #[error("Invalid JSON: {reason}")]
    InvalidJson { reason: String },

    /// Payload is JSON but not an object
    #[error("Expected a JSON object, got {found}")]
    NotAnObject { found: String },

    /// A required field is absent or null
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A field is present but has the wrong shape
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

/// Persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite backend failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored value does not decode into the expected shape
    #[error("Corrupt value under key '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// Value could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage location could not be prepared
    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },
}

/// AI service errors
#[derive(Debug, Error)]
pub enum AiError {
    /// No API key in the configured environment variable
    #[error("API key not configured (set {env_var})")]
    MissingApiKey { env_var: String },

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Service answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Service answered without any message content
    #[error("Empty response from {operation}")]
    EmptyResponse { operation: String },

    /// Response envelope could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Result type alias for fittrack operations
pub type Result<T> = std::result::Result<T, FitTrackError>;

impl FitTrackError {
    /// Whether retrying the same user action can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FitTrackError::Adapter(_)
                | FitTrackError::Ai(AiError::Request(_))
                | FitTrackError::Ai(AiError::EmptyResponse { .. })
                | FitTrackError::Ai(AiError::Malformed(_))
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FitTrackError::Validation(_) => ErrorSeverity::Warning,
            FitTrackError::GoalNotFound(_) | FitTrackError::WorkoutNotFound(_) => {
                ErrorSeverity::Warning
            }
            FitTrackError::Adapter(_) => ErrorSeverity::Warning,
            FitTrackError::Ai(AiError::MissingApiKey { .. }) => ErrorSeverity::Error,
            FitTrackError::Ai(_) => ErrorSeverity::Warning,
            FitTrackError::Storage(StorageError::Corrupt { .. }) => ErrorSeverity::Critical,
            FitTrackError::Storage(_) => ErrorSeverity::Error,
            FitTrackError::Configuration(_) | FitTrackError::Io(_) => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            FitTrackError::Adapter(_) => {
                "The AI service returned something unexpected, try again.".to_string()
            }
            FitTrackError::Ai(AiError::MissingApiKey { env_var }) => {
                format!("No AI API key found. Set {} or add it to .env.", env_var)
            }
            FitTrackError::Ai(AiError::EmptyResponse { operation }) => {
                format!("Failed to {}: empty response, try again.", operation)
            }
            FitTrackError::Ai(_) => "Could not reach the AI service, try again later.".to_string(),
            FitTrackError::Storage(StorageError::Corrupt { key, .. }) => {
                format!("Saved data under '{}' is unreadable.", key)
            }
            FitTrackError::Validation(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Stored data can no longer be trusted
    Critical,
    /// Error that prevents the action
    Error,
    /// Recoverable by correcting input or retrying
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
