//! Error types for the rusunawa issue workflow.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=api, 3=not_found, 4=validation, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Data anomalies inside the workflow model (unknown phase tags, dangling
//! comment parents, unrecognized statuses) never surface here; they are
//! resolved by the model itself.

use thiserror::Error;

/// Result type alias for rusunawa operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Collaborator API (exit 2)
    ApiError,
    HttpError,
    MalformedRecord,

    // Not Found (exit 3)
    IssueNotFound,
    AttachmentNotFound,

    // Validation (exit 4)
    InvalidTransition,
    EvidenceRequired,
    MultiplePrimary,
    InvalidArgument,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::ApiError => "API_ERROR",
            Self::HttpError => "HTTP_ERROR",
            Self::MalformedRecord => "MALFORMED_RECORD",
            Self::IssueNotFound => "ISSUE_NOT_FOUND",
            Self::AttachmentNotFound => "ATTACHMENT_NOT_FOUND",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::EvidenceRequired => "EVIDENCE_REQUIRED",
            Self::MultiplePrimary => "MULTIPLE_PRIMARY",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::ApiError | Self::HttpError | Self::MalformedRecord => 2,
            Self::IssueNotFound | Self::AttachmentNotFound => 3,
            Self::InvalidTransition
            | Self::EvidenceRequired
            | Self::MultiplePrimary
            | Self::InvalidArgument => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether the caller should retry, either with corrected input or
    /// after a transient network failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition
                | Self::EvidenceRequired
                | Self::MultiplePrimary
                | Self::InvalidArgument
                | Self::HttpError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in rusunawa operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Issue not found: {id}")]
    IssueNotFound { id: i64 },

    #[error("Attachment not found: {id}")]
    AttachmentNotFound { id: i64 },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: String,
        to: String,
        /// The only status the policy allows next, if any.
        allowed: Option<String>,
    },

    #[error("Moving to '{status}' requires at least one {phase} photo")]
    EvidenceRequired { status: String, phase: String },

    #[error("More than one primary attachment for phase '{phase}'")]
    MultiplePrimary { phase: String },

    #[error("Collaborator API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed {kind} record: {reason}")]
    MalformedRecord { kind: &'static str, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::IssueNotFound { .. } => ErrorCode::IssueNotFound,
            Self::AttachmentNotFound { .. } => ErrorCode::AttachmentNotFound,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::EvidenceRequired { .. } => ErrorCode::EvidenceRequired,
            Self::MultiplePrimary { .. } => ErrorCode::MultiplePrimary,
            Self::Api { .. } => ErrorCode::ApiError,
            Self::MalformedRecord { .. } => ErrorCode::MalformedRecord,
            Self::Http(_) => ErrorCode::HttpError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::IssueNotFound { id } => Some(format!(
                "No issue with ID {id}. Check the ID or the configured API URL (`rusunawa config show`)."
            )),

            Self::InvalidTransition { from, allowed, .. } => Some(match allowed {
                Some(next) => format!("From '{from}' the only allowed next status is '{next}'."),
                None => format!("'{from}' is terminal; no further transition is possible."),
            }),

            Self::EvidenceRequired { phase, .. } => Some(format!(
                "Attach at least one {phase} photo to the status update."
            )),

            Self::MultiplePrimary { .. } => {
                Some("Flag at most one attachment as primary per upload.".to_string())
            }

            Self::Http(_) => Some(
                "Could not reach the collaborator API. Set RUSUNAWA_API_URL or pass --api-url."
                    .to_string(),
            ),

            Self::InvalidArgument(msg) => {
                if msg.contains("status") {
                    Some(
                        "Valid statuses: open, in_progress, resolved, closed. \
                         Synonyms: new→open, wip→in_progress, fixed→resolved, done→closed"
                            .to_string(),
                    )
                } else if msg.contains("priority") {
                    Some("Valid priorities: low, medium, high".to_string())
                } else if msg.contains("phase") {
                    Some("Valid phases: report, progress, completion, feedback".to_string())
                } else {
                    None
                }
            }

            Self::Config(_) => Some(
                "Check ~/.rusunawa/config.json (or the file named by RUSUNAWA_CONFIG).".to_string(),
            ),

            Self::AttachmentNotFound { .. }
            | Self::Api { .. }
            | Self::MalformedRecord { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
