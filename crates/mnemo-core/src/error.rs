//! Error types for mnemo operations.
//!
//! Provides a structured error hierarchy with error codes for
//! programmatic handling. Every mutation entry point maps failures here
//! and rolls back before returning, so callers may retry whole
//! operations safely.

use thiserror::Error;

/// Result type alias for mnemo operations.
pub type DeckResult<T> = Result<T, DeckError>;

/// Main error type for all mnemo operations.
#[derive(Error, Debug)]
pub enum DeckError {
    /// Input validation failed. Nothing was persisted.
    #[error("Validation error: {message}")]
    Validation { message: String, code: ErrorCode },

    /// A referenced note or reviewable does not exist.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        id: Option<String>,
    },

    /// A note update carried a stale expected version.
    #[error("Conflict: {message}")]
    Conflict { message: String, code: ErrorCode },

    /// Database operation failed. Constraint failures from the store
    /// surface here unchanged.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Scheduler adapter failed to compute a next memory state.
    #[error("Scheduler error: {message}")]
    Scheduler { message: String, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValTooFewFields,
    ValEmptyFieldValue,
    ValNoCollections,
    ValEmptyUpdate,
    ValInvalidInput,

    // Note / reviewable lookup (NOTE_xxx)
    NoteNotFound,
    ReviewableNotFound,

    // Concurrency (CON_xxx)
    ConVersionMismatch,

    // Database (DB_xxx)
    DbOperationFailed,

    // Scheduler (SCHED_xxx)
    SchedComputeFailed,
    SchedInvalidParams,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValTooFewFields => "VAL_001",
            ErrorCode::ValEmptyFieldValue => "VAL_002",
            ErrorCode::ValNoCollections => "VAL_003",
            ErrorCode::ValEmptyUpdate => "VAL_004",
            ErrorCode::ValInvalidInput => "VAL_005",
            ErrorCode::NoteNotFound => "NOTE_001",
            ErrorCode::ReviewableNotFound => "NOTE_002",
            ErrorCode::ConVersionMismatch => "CON_001",
            ErrorCode::DbOperationFailed => "DB_001",
            ErrorCode::SchedComputeFailed => "SCHED_001",
            ErrorCode::SchedInvalidParams => "SCHED_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl DeckError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
        }
    }

    /// Create a validation error with a specific code.
    pub fn validation_with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::Validation {
            message: message.into(),
            code,
        }
    }

    /// Create a note-not-found error.
    pub fn note_not_found(note_id: impl Into<String>) -> Self {
        let id = note_id.into();
        Self::NotFound {
            message: format!("Note with id '{}' not found", id),
            code: ErrorCode::NoteNotFound,
            id: Some(id),
        }
    }

    /// Create a reviewable-not-found error.
    pub fn reviewable_not_found(reviewable_id: impl Into<String>) -> Self {
        let id = reviewable_id.into();
        Self::NotFound {
            message: format!("Reviewable with id '{}' not found", id),
            code: ErrorCode::ReviewableNotFound,
            id: Some(id),
        }
    }

    /// Create a version-conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            code: ErrorCode::ConVersionMismatch,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Create a scheduler error.
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler {
            message: message.into(),
            code: ErrorCode::SchedComputeFailed,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Conflict { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Scheduler { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }
}

impl From<rusqlite::Error> for DeckError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DeckError::validation("bad input");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("bad input"));
    }

    #[test]
    fn test_note_not_found_error() {
        let err = DeckError::note_not_found("n-1");
        assert_eq!(err.code(), ErrorCode::NoteNotFound);
        assert!(err.to_string().contains("n-1"));
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValTooFewFields.as_str(), "VAL_001");
        assert_eq!(ErrorCode::ConVersionMismatch.as_str(), "CON_001");
    }
}
