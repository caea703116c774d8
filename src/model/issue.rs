//! Issue model.
//!
//! An issue is a maintenance report raised by a tenant. Its status moves
//! along a fixed chain (see [`crate::workflow`]); priority is assigned by
//! staff independently of status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue lifecycle status.
///
/// Values outside the four canonical statuses are kept verbatim in
/// `Unknown` so upstream data never fails to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IssueStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
    Unknown(String),
}

impl IssueStatus {
    /// The canonical statuses in lifecycle order.
    pub const CHAIN: [Self; 4] = [Self::Open, Self::InProgress, Self::Resolved, Self::Closed];

    /// Get the string representation used by the collaborator API.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Unknown(raw) => raw,
        }
    }

    /// Position in the lifecycle chain, `None` for unknown statuses.
    #[must_use]
    pub const fn rank(&self) -> Option<usize> {
        match self {
            Self::Open => Some(0),
            Self::InProgress => Some(1),
            Self::Resolved => Some(2),
            Self::Closed => Some(3),
            Self::Unknown(_) => None,
        }
    }

    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<&str> for IssueStatus {
    fn from(s: &str) -> Self {
        match s {
            "open" => Self::Open,
            "in_progress" => Self::InProgress,
            "resolved" => Self::Resolved,
            "closed" => Self::Closed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for IssueStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<IssueStatus> for String {
    fn from(status: IssueStatus) -> Self {
        match status {
            IssueStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staff-assigned urgency. Orthogonal to status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata about the single image stored by the older schema generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyImageInfo {
    /// The backend's `has_image` flag.
    pub flagged: bool,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

impl LegacyImageInfo {
    /// Whether the issue claims to carry a legacy image.
    ///
    /// The flag alone is enough, as is the presence of any legacy image
    /// field. The claim may still turn out false when fetched.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.flagged || self.mime_type.is_some() || self.file_name.is_some()
    }
}

/// A maintenance issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub description: String,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub status: IssueStatus,
    pub reporter_id: Option<i64>,
    pub reporter_name: Option<String>,
    pub reported_at: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub legacy_image: LegacyImageInfo,
}

impl Issue {
    /// Create an open issue with no optional metadata.
    pub fn new(id: i64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            category: None,
            priority: None,
            status: IssueStatus::Open,
            reporter_id: None,
            reporter_name: None,
            reported_at: None,
            assigned_at: None,
            resolved_at: None,
            closed_at: None,
            legacy_image: LegacyImageInfo::default(),
        }
    }

    /// Set the status.
    #[must_use]
    pub fn with_status(mut self, status: IssueStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Mark the issue as carrying a legacy single image.
    #[must_use]
    pub fn with_legacy_image(mut self, mime_type: Option<&str>) -> Self {
        self.legacy_image.flagged = true;
        self.legacy_image.mime_type = mime_type.map(ToString::to_string);
        self
    }

    /// Whether a legacy image is expected for this issue.
    #[must_use]
    pub fn has_legacy_image(&self) -> bool {
        self.legacy_image.is_present()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(IssueStatus::from("open"), IssueStatus::Open);
        assert_eq!(IssueStatus::from("in_progress"), IssueStatus::InProgress);
        assert_eq!(IssueStatus::from("resolved"), IssueStatus::Resolved);
        assert_eq!(IssueStatus::from("closed"), IssueStatus::Closed);
        assert_eq!(
            IssueStatus::from("bogus"),
            IssueStatus::Unknown("bogus".to_string())
        );
    }

    #[test]
    fn test_unknown_status_round_trips_verbatim() {
        let status = IssueStatus::from("on_hold");
        assert_eq!(status.as_str(), "on_hold");
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"on_hold\"");
        assert!(!status.is_known());
        assert_eq!(status.rank(), None);
    }

    #[test]
    fn test_legacy_image_presence() {
        let mut info = LegacyImageInfo::default();
        assert!(!info.is_present());
        info.mime_type = Some("image/jpeg".to_string());
        assert!(info.is_present());

        let issue = Issue::new(4, "Leaking tap").with_legacy_image(None);
        assert!(issue.has_legacy_image());
    }
}
