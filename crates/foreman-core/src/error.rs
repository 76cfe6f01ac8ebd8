//! Error types for the foreman library.

use std::fmt;
use std::path::PathBuf;

use jiff::civil::Date;
use thiserror::Error;

/// Comprehensive error type for all foreman operations.
#[derive(Error, Debug)]
pub enum ForemanError {
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// A persisted record could not be decoded. Never papered over with a
    /// fresh record.
    #[error("Corrupted {record} record: {reason}")]
    StateCorruption { record: String, reason: String },
    /// No viable plan could be built for the date
    #[error("Cannot plan {date}: {reason}")]
    Planning { date: Date, reason: String },
    /// No plan persisted for the given date
    #[error("No plan exists for {date}")]
    PlanNotFound { date: Date },
    /// A collaborator call failed outside of an entry's retry envelope
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Failure reported by an external collaborator.
///
/// The split between the two variants drives the retry policy: only
/// [`CollaboratorError::Transient`] is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Timeouts, rate limits, connection resets and upstream 5xx responses
    #[error("{service}: transient failure: {message}")]
    Transient { service: String, message: String },
    /// Authentication, permission and validation failures
    #[error("{service}: {kind}: {message}")]
    Permanent {
        service: String,
        kind: PermanentKind,
        message: String,
    },
}

/// Classification of non-retryable collaborator failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermanentKind {
    Authentication,
    PermissionDenied,
    InvalidRequest,
    NotFound,
    NotConfigured,
}

impl fmt::Display for PermanentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PermanentKind::Authentication => "authentication failed",
            PermanentKind::PermissionDenied => "permission denied",
            PermanentKind::InvalidRequest => "invalid request",
            PermanentKind::NotFound => "not found",
            PermanentKind::NotConfigured => "not configured",
        };
        f.write_str(label)
    }
}

impl CollaboratorError {
    /// Creates a transient (retryable) error.
    pub fn transient(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Creates a permanent (non-retryable) error.
    pub fn permanent(
        service: impl Into<String>,
        kind: PermanentKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Permanent {
            service: service.into(),
            kind,
            message: message.into(),
        }
    }

    /// Whether the retry policy may attempt the call again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Short label persisted alongside failed plan entries.
    pub fn classification(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "transient",
            Self::Permanent { kind, .. } => match kind {
                PermanentKind::Authentication => "authentication",
                PermanentKind::PermissionDenied => "permission-denied",
                PermanentKind::InvalidRequest => "invalid-request",
                PermanentKind::NotFound => "not-found",
                PermanentKind::NotConfigured => "not-configured",
            },
        }
    }
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> ForemanError {
        ForemanError::Database {
            message: self.message,
            source,
        }
    }
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    /// Create a new invalid input error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> ForemanError {
        ForemanError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl ForemanError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    /// Creates a state corruption error for the named record.
    pub fn corruption(record: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::StateCorruption {
            record: record.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Maps a `spawn_blocking` join failure.
    pub(crate) fn join(error: tokio::task::JoinError) -> Self {
        Self::configuration(format!("Task join error: {error}"))
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| ForemanError::database(message).with_source(e))
    }
}

/// Result type alias for foreman operations
pub type Result<T> = std::result::Result<T, ForemanError>;
