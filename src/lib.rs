//! Rusunawa issue workflow model.
//!
//! Evidence and status rules for dormitory maintenance issues: the linear
//! status chain, which transitions need photo evidence, how photos from
//! the legacy single-image schema and the current attachment table are
//! classified and merged by phase, and how flat comment lists become
//! reply threads.
//!
//! # Architecture
//!
//! - [`model`] - Record types (Issue, Attachment, Comment, StatusHistoryEntry)
//! - [`workflow`] - Status transition policy and update validation
//! - [`validate`] - Status/priority/phase normalization
//! - [`evidence`] - Phase bucketing of legacy and current attachments
//! - [`comments`] - Visibility filtering and comment threading
//! - [`api`] - Collaborator REST client and wire normalization
//! - [`service`] - Issue view assembly over the API
//! - [`config`] - Configuration management
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cli;
pub mod comments;
pub mod config;
pub mod error;
pub mod evidence;
pub mod model;
pub mod service;
pub mod validate;
pub mod workflow;

pub use comments::{build_comment_tree, filter_comments, CommentTree};
pub use error::{Error, Result};
pub use evidence::{organize_attachments, EvidenceBuckets};
pub use validate::classify_attachment;
pub use workflow::{is_image_required, next_status};
