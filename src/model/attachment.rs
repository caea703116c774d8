//! Attachment model.
//!
//! Attachments are photos attached to an issue as evidence. Each belongs to
//! exactly one [`Phase`] of the issue workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::issue::IssueStatus;

/// Workflow phase an attachment documents.
///
/// Phases correspond one-to-one with issue statuses:
/// report ↔ open, progress ↔ in_progress, completion ↔ resolved,
/// feedback ↔ closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Report,
    Progress,
    Completion,
    Feedback,
}

impl Phase {
    /// All phases in precedence order.
    pub const ALL: [Self; 4] = [Self::Report, Self::Progress, Self::Completion, Self::Feedback];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Progress => "progress",
            Self::Completion => "completion",
            Self::Feedback => "feedback",
        }
    }

    /// Parse a canonical phase name (exact, lowercase).
    #[must_use]
    pub fn from_canonical(s: &str) -> Option<Self> {
        match s {
            "report" => Some(Self::Report),
            "progress" => Some(Self::Progress),
            "completion" => Some(Self::Completion),
            "feedback" => Some(Self::Feedback),
            _ => None,
        }
    }

    /// The phase documenting work done while an issue holds `status`.
    #[must_use]
    pub const fn for_status(status: &IssueStatus) -> Option<Self> {
        match status {
            IssueStatus::Open => Some(Self::Report),
            IssueStatus::InProgress => Some(Self::Progress),
            IssueStatus::Resolved => Some(Self::Completion),
            IssueStatus::Closed => Some(Self::Feedback),
            IssueStatus::Unknown(_) => None,
        }
    }

    /// The status this phase corresponds to.
    #[must_use]
    pub const fn status(&self) -> IssueStatus {
        match self {
            Self::Report => IssueStatus::Open,
            Self::Progress => IssueStatus::InProgress,
            Self::Completion => IssueStatus::Resolved,
            Self::Feedback => IssueStatus::Closed,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attachment identity.
///
/// Rows from the attachment table carry an integer ID. The legacy schema
/// stored one image per issue with no row of its own; it is addressed by the
/// sentinel `legacy_<issueId>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AttachmentId {
    Row(i64),
    Legacy(i64),
}

impl AttachmentId {
    pub const LEGACY_PREFIX: &'static str = "legacy_";

    /// The numeric row ID, if this is a row attachment.
    #[must_use]
    pub const fn row(&self) -> Option<i64> {
        match self {
            Self::Row(id) => Some(*id),
            Self::Legacy(_) => None,
        }
    }

    #[must_use]
    pub const fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row(id) => write!(f, "{id}"),
            Self::Legacy(issue_id) => write!(f, "{}{issue_id}", Self::LEGACY_PREFIX),
        }
    }
}

impl From<AttachmentId> for String {
    fn from(id: AttachmentId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for AttachmentId {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::str::FromStr for AttachmentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix(Self::LEGACY_PREFIX) {
            return rest
                .parse()
                .map(Self::Legacy)
                .map_err(|_| format!("Invalid legacy attachment id: {s}"));
        }
        s.parse()
            .map(Self::Row)
            .map_err(|_| format!("Invalid attachment id: {s}"))
    }
}

/// Availability of an attachment's binary content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum AttachmentContent {
    /// Base64 payload already in hand.
    Inline(String),
    /// Not fetched yet; retrievable from the collaborator API.
    Remote,
    /// A fetch was attempted and failed. Metadata only.
    Unavailable,
}

impl AttachmentContent {
    #[must_use]
    pub const fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

/// A photo attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Option<AttachmentId>,
    pub issue_id: i64,
    pub uploader_id: Option<i64>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub content: AttachmentContent,
    pub description: Option<String>,
    /// Explicit phase supplied by the uploader, if any.
    pub phase: Option<String>,
    /// Free-text "attachment type" tag from older records.
    pub attachment_type: Option<String>,
    pub is_primary: bool,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Attachment {
    /// Create an attachment row with remote content and no tags.
    pub fn new(id: i64, issue_id: i64) -> Self {
        Self {
            id: Some(AttachmentId::Row(id)),
            issue_id,
            uploader_id: None,
            file_name: None,
            mime_type: None,
            content: AttachmentContent::Remote,
            description: None,
            phase: None,
            attachment_type: None,
            is_primary: false,
            uploaded_at: None,
        }
    }

    /// Set the explicit phase.
    #[must_use]
    pub fn with_phase(mut self, phase: &str) -> Self {
        self.phase = Some(phase.to_string());
        self
    }

    /// Set the legacy attachment type tag.
    #[must_use]
    pub fn with_type(mut self, attachment_type: &str) -> Self {
        self.attachment_type = Some(attachment_type.to_string());
        self
    }

    /// Set the file name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: &str) -> Self {
        self.file_name = Some(file_name.to_string());
        self
    }

    /// Flag as the primary attachment of its phase.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Key used for deduplication: the ID, else the file name.
    ///
    /// Records with neither are never considered duplicates.
    #[must_use]
    pub fn identity_key(&self) -> Option<String> {
        match (&self.id, &self.file_name) {
            (Some(id), _) => Some(format!("id:{id}")),
            (None, Some(name)) if !name.is_empty() => Some(format!("file:{name}")),
            _ => None,
        }
    }

    /// Display name, falling back to the ID.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.file_name, &self.id) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(id)) => format!("attachment {id}"),
            _ => "attachment".to_string(),
        }
    }
}

/// Payload returned by the legacy single-image accessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyImage {
    pub content: String,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

/// Binary content of one attachment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPayload {
    pub content: String,
    pub mime_type: Option<String>,
}
