//! Attachment image sources.
//!
//! Presentation code needs to know where to get an attachment's picture:
//! bytes already in hand, a URL on the collaborator API, or nothing at all
//! (show a placeholder). That decision lives here and is made at render
//! time only.

use base64::Engine;
use serde::Serialize;

use crate::model::{Attachment, AttachmentContent, AttachmentId};

/// Fallback MIME type for payloads that arrive without one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Where an attachment's image comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentRef {
    Inline { mime_type: String, data: String },
    Remote { url: String },
    Placeholder,
}

impl ContentRef {
    /// A `data:` URL for inline content.
    #[must_use]
    pub fn data_url(&self) -> Option<String> {
        match self {
            Self::Inline { mime_type, data } => Some(format!("data:{mime_type};base64,{data}")),
            _ => None,
        }
    }

    /// Decoded size of inline content. `None` for other sources or a
    /// payload that is not valid base64.
    #[must_use]
    pub fn inline_size(&self) -> Option<usize> {
        match self {
            Self::Inline { data, .. } => base64::engine::general_purpose::STANDARD
                .decode(data.trim())
                .ok()
                .map(|bytes| bytes.len()),
            _ => None,
        }
    }
}

/// Decide where to load `attachment`'s image from.
///
/// `base_url` is the collaborator API root. Unavailable content and
/// ID-less remote records resolve to [`ContentRef::Placeholder`].
#[must_use]
pub fn resolve_attachment_source(attachment: &Attachment, base_url: &str) -> ContentRef {
    let base = base_url.trim_end_matches('/');
    match &attachment.content {
        AttachmentContent::Inline(data) if !data.trim().is_empty() => ContentRef::Inline {
            mime_type: attachment
                .mime_type
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string()),
            data: data.clone(),
        },
        AttachmentContent::Remote => match attachment.id {
            Some(AttachmentId::Row(id)) => ContentRef::Remote {
                url: format!("{base}/issue-attachments/{id}"),
            },
            Some(AttachmentId::Legacy(issue_id)) => ContentRef::Remote {
                url: format!("{base}/issues/{issue_id}/image"),
            },
            None => ContentRef::Placeholder,
        },
        _ => ContentRef::Placeholder,
    }
}
