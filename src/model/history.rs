//! Status history model.
//!
//! Read-only audit rows produced by the collaborator backend whenever an
//! issue's status changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::issue::IssueStatus;

/// One recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub issue_id: i64,
    pub from: Option<IssueStatus>,
    pub to: IssueStatus,
    pub changed_by: Option<String>,
    pub note: Option<String>,
    pub changed_at: Option<DateTime<Utc>>,
}
