//! Status transition policy.
//!
//! Issues move along a single chain with no skips and no reversals:
//!
//! ```text
//! open -> in_progress -> resolved -> closed
//! ```
//!
//! Moving into `resolved` must be backed by at least one completion photo.
//! Priority plays no part in any of these rules. Administrative overrides
//! happen outside this policy.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{IssueStatus, Phase};

/// The single legal next status, or `None` from `closed` or an unknown
/// status.
#[must_use]
pub fn next_status(current: &IssueStatus) -> Option<IssueStatus> {
    match current {
        IssueStatus::Open => Some(IssueStatus::InProgress),
        IssueStatus::InProgress => Some(IssueStatus::Resolved),
        IssueStatus::Resolved => Some(IssueStatus::Closed),
        IssueStatus::Closed | IssueStatus::Unknown(_) => None,
    }
}

/// Whether the transition out of `current` needs a photo.
///
/// True exactly when the next status is `resolved`.
#[must_use]
pub fn is_image_required(current: &IssueStatus) -> bool {
    matches!(next_status(current), Some(IssueStatus::Resolved))
}

/// Check a proposed transition against the policy.
///
/// # Errors
///
/// Returns [`Error::InvalidTransition`] for skips, reversals, no-op
/// transitions and transitions out of `closed` or an unknown status.
pub fn check_transition(from: &IssueStatus, to: &IssueStatus) -> Result<()> {
    let allowed = next_status(from);
    if allowed.as_ref() == Some(to) {
        return Ok(());
    }

    Err(Error::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
        allowed: allowed.map(|s| s.to_string()),
    })
}

/// A photo to upload together with a status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttachment {
    pub file_name: String,
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub content: String,
    pub description: Option<String>,
    pub is_primary: bool,
}

impl PendingAttachment {
    /// Whether the declared MIME type is `image/*`.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type
            .split_once('/')
            .is_some_and(|(kind, sub)| {
                kind.trim().eq_ignore_ascii_case("image") && !sub.trim().is_empty()
            })
    }

    /// Number of bytes the base64 payload decodes to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the payload is not valid base64.
    pub fn decoded_len(&self) -> Result<usize> {
        base64::engine::general_purpose::STANDARD
            .decode(self.content.trim())
            .map(|bytes| bytes.len())
            .map_err(|e| {
                Error::InvalidArgument(format!("'{}' is not valid base64: {e}", self.file_name))
            })
    }
}

/// A staff request to advance an issue, with optional evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub target: IssueStatus,
    pub note: Option<String>,
    #[serde(default)]
    pub attachments: Vec<PendingAttachment>,
}

impl StatusUpdate {
    pub fn new(target: IssueStatus) -> Self {
        Self {
            target,
            note: None,
            attachments: Vec::new(),
        }
    }

    /// Set the note recorded in the status history.
    #[must_use]
    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    /// Add a photo to the update.
    #[must_use]
    pub fn with_attachment(mut self, attachment: PendingAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Phase the update's attachments are filed under.
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        Phase::for_status(&self.target)
    }

    /// Validate the update against an issue currently in `current`.
    ///
    /// Checks, in order: the transition is legal, required evidence is
    /// present, every payload is valid non-empty base64 with an `image/*`
    /// MIME type, and at most one attachment is flagged primary.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as [`Error::InvalidTransition`],
    /// [`Error::EvidenceRequired`], [`Error::InvalidArgument`] or
    /// [`Error::MultiplePrimary`].
    pub fn validate(&self, current: &IssueStatus) -> Result<()> {
        check_transition(current, &self.target)?;

        // check_transition guarantees a known target, so the phase exists
        let phase = self.phase().unwrap_or(Phase::Report);

        if is_image_required(current) && self.attachments.is_empty() {
            return Err(Error::EvidenceRequired {
                status: self.target.to_string(),
                phase: phase.to_string(),
            });
        }

        for attachment in &self.attachments {
            if attachment.decoded_len()? == 0 {
                return Err(Error::InvalidArgument(format!(
                    "'{}' has empty content",
                    attachment.file_name
                )));
            }
            if !attachment.is_image() {
                return Err(Error::InvalidArgument(format!(
                    "'{}' is {}, not an image",
                    attachment.file_name, attachment.mime_type
                )));
            }
        }

        if self.attachments.iter().filter(|a| a.is_primary).count() > 1 {
            return Err(Error::MultiplePrimary {
                phase: phase.to_string(),
            });
        }

        Ok(())
    }
}
