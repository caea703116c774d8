//! Collaborator REST API access.
//!
//! The workflow model never talks to the network itself. This module fetches
//! issues, attachments, comments and status history from the dormitory
//! backend and normalizes them into [`crate::model`] records.
//!
//! # Submodules
//!
//! - [`client`] - reqwest-backed HTTP implementation of [`IssueApi`]
//! - [`content`] - resolving where an attachment's image comes from
//! - [`wire`] - snake_case/camelCase tolerant field normalization

pub mod client;
pub mod content;
pub mod wire;

pub use client::HttpIssueApi;
pub use content::{resolve_attachment_source, ContentRef};

use std::future::Future;

use crate::error::Result;
use crate::model::{
    Attachment, AttachmentPayload, Comment, Issue, LegacyImage, Phase, StatusHistoryEntry,
};

/// Read access to the collaborator backend.
///
/// Implemented by [`HttpIssueApi`]; tests substitute in-memory fakes.
pub trait IssueApi: Send + Sync {
    /// `GET /issues/{id}`
    fn get_issue(&self, issue_id: i64) -> impl Future<Output = Result<Issue>> + Send;

    /// `GET /issues/{id}/attachments[?type=phase]`
    fn list_attachments(
        &self,
        issue_id: i64,
        phase: Option<Phase>,
    ) -> impl Future<Output = Result<Vec<Attachment>>> + Send;

    /// `GET /issues/{id}/image`
    ///
    /// `Ok(None)` when the backend has no legacy image for the issue.
    fn get_legacy_image(
        &self,
        issue_id: i64,
    ) -> impl Future<Output = Result<Option<LegacyImage>>> + Send;

    /// `GET /issue-attachments/{attachmentId}`
    fn get_attachment_content(
        &self,
        attachment_id: i64,
    ) -> impl Future<Output = Result<AttachmentPayload>> + Send;

    /// `GET /issues/{id}/comments`
    fn list_comments(&self, issue_id: i64) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    /// `GET /issues/{id}/status-history`
    fn status_history(
        &self,
        issue_id: i64,
    ) -> impl Future<Output = Result<Vec<StatusHistoryEntry>>> + Send;
}
