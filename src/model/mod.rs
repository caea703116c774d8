//! Data models for the issue workflow.
//!
//! This module contains the canonical record shapes the workflow model
//! operates on:
//! - Issue
//! - Attachment
//! - Comment
//! - StatusHistoryEntry
//!
//! Collaborator API payloads are normalized into these types by
//! [`crate::api::wire`] before reaching the model.

pub mod attachment;
pub mod comment;
pub mod history;
pub mod issue;

pub use attachment::{Attachment, AttachmentContent, AttachmentId, AttachmentPayload, LegacyImage, Phase};
pub use comment::{Comment, Visibility, VisibilityFilter};
pub use history::StatusHistoryEntry;
pub use issue::{Issue, IssueStatus, LegacyImageInfo, Priority};
