//! Comment model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who may see a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    /// Staff-only. Hiding these from tenants is the authorization layer's job.
    Internal,
}

/// Visibility toggle applied before threading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityFilter {
    #[default]
    All,
    Public,
    Internal,
}

impl VisibilityFilter {
    #[must_use]
    pub const fn allows(&self, visibility: Visibility) -> bool {
        match self {
            Self::All => true,
            Self::Public => matches!(visibility, Visibility::Public),
            Self::Internal => matches!(visibility, Visibility::Internal),
        }
    }
}

impl fmt::Display for VisibilityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Public => "public",
            Self::Internal => "internal",
        })
    }
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub issue_id: i64,
    pub author_id: Option<i64>,
    /// Resolved by the collaborator API; not owned by this crate.
    pub author_name: Option<String>,
    pub body: String,
    /// Free-form tag such as "general", "question" or "status_update".
    pub comment_type: String,
    pub visibility: Visibility,
    /// `None` or `Some(0)` marks a root comment.
    pub parent_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// Create a public root comment of type "general".
    pub fn new(id: i64, issue_id: i64, body: impl Into<String>) -> Self {
        Self {
            id,
            issue_id,
            author_id: None,
            author_name: None,
            body: body.into(),
            comment_type: "general".to_string(),
            visibility: Visibility::Public,
            parent_id: None,
            created_at: None,
        }
    }

    /// Reply to another comment.
    #[must_use]
    pub fn reply_to(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the creation timestamp.
    #[must_use]
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Mark as internal (staff-only).
    #[must_use]
    pub fn internal(mut self) -> Self {
        self.visibility = Visibility::Internal;
        self
    }

    /// The parent reference with the zero sentinel stripped.
    #[must_use]
    pub fn parent(&self) -> Option<i64> {
        self.parent_id.filter(|id| *id != 0)
    }
}
