//! Field normalization for collaborator API payloads.
//!
//! The backend has gone through two generations that disagree on naming:
//! some records use snake_case (`file_name`), others camelCase
//! (`fileName`), and a few carry both. Every lookup here tries the
//! camelCase spelling first. Numbers may arrive as JSON numbers or numeric
//! strings, booleans as `true`/`1`/`"true"`.
//!
//! This is the only place that knows about those spellings; the rest of the
//! crate sees canonical [`crate::model`] records.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{
    Attachment, AttachmentContent, AttachmentId, AttachmentPayload, Comment, Issue, IssueStatus,
    LegacyImage, LegacyImageInfo, StatusHistoryEntry, Visibility,
};
use crate::validate::normalize_priority;

type Object = Map<String, Value>;

// ── Envelopes ────────────────────────────────────────────────

/// Strip a response envelope.
///
/// Accepts the bare payload, `{"data": ...}`, or `{"<key>": ...}` for any of
/// the given keys. Only object and list members count as envelopes, so a
/// record with a scalar `data` field is left alone.
#[must_use]
pub fn unwrap_envelope<'a>(value: &'a Value, keys: &[&str]) -> &'a Value {
    let Some(obj) = value.as_object() else {
        return value;
    };
    envelope_keys(keys)
        .find_map(|key| obj.get(key).filter(|v| v.is_object() || v.is_array()))
        .map_or(value, |inner| unwrap_envelope(inner, keys))
}

fn envelope_keys<'k>(keys: &'k [&str]) -> impl Iterator<Item = &'k str> {
    keys.iter().copied().chain(std::iter::once("data"))
}

/// Extract a list payload, treating `null` as empty.
fn unwrap_list<'a>(value: &'a Value, keys: &[&str], kind: &'static str) -> Result<&'a [Value]> {
    match unwrap_envelope(value, keys) {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(&[]),
        // `{"attachments": null}` and friends
        Value::Object(obj) if envelope_keys(keys).any(|k| obj.get(k).is_some_and(Value::is_null)) => {
            Ok(&[])
        }
        other => Err(Error::MalformedRecord {
            kind,
            reason: format!("expected a list, got {}", type_name(other)),
        }),
    }
}

fn as_object<'a>(value: &'a Value, kind: &'static str) -> Result<&'a Object> {
    value.as_object().ok_or_else(|| Error::MalformedRecord {
        kind,
        reason: format!("expected an object, got {}", type_name(value)),
    })
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Field access ─────────────────────────────────────────────

/// First non-null value among the given spellings, in order.
fn field<'a>(obj: &'a Object, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| obj.get(*name).filter(|v| !v.is_null()))
}

fn text(obj: &Object, names: &[&str]) -> Option<String> {
    field(obj, names).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn non_empty_text(obj: &Object, names: &[&str]) -> Option<String> {
    text(obj, names).filter(|s| !s.trim().is_empty())
}

fn int(obj: &Object, names: &[&str]) -> Option<i64> {
    field(obj, names).and_then(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn flag(obj: &Object, names: &[&str]) -> Option<bool> {
    field(obj, names).and_then(|v| match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn timestamp(obj: &Object, names: &[&str]) -> Option<DateTime<Utc>> {
    field(obj, names).and_then(parse_timestamp)
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or Unix milliseconds.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                        .ok()
                        .map(|naive| naive.and_utc())
                })
        }
        _ => None,
    }
}

// ── Issue ────────────────────────────────────────────────────

/// Status strings arrive in mixed case and with stray whitespace.
fn status_from_text(raw: &str) -> IssueStatus {
    IssueStatus::from(raw.trim().to_lowercase())
}

/// Normalize one issue record.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] if the record is not an object or
/// has no usable ID.
pub fn issue_from_value(value: &Value) -> Result<Issue> {
    let obj = as_object(unwrap_envelope(value, &["issue"]), "issue")?;
    let id = int(obj, &["issueId", "issue_id", "id"]).ok_or_else(|| Error::MalformedRecord {
        kind: "issue",
        reason: "missing id".to_string(),
    })?;

    let status = text(obj, &["status"]).map_or(IssueStatus::Open, |s| status_from_text(&s));

    // Unknown priorities are treated as unset rather than rejected
    let priority = text(obj, &["priority"]).and_then(|p| normalize_priority(&p).ok());

    Ok(Issue {
        id,
        description: text(obj, &["description", "title"]).unwrap_or_default(),
        category: non_empty_text(obj, &["category", "categoryName", "category_name"]),
        priority,
        status,
        reporter_id: int(obj, &["reportedBy", "reported_by", "tenantId", "tenant_id"]),
        reporter_name: non_empty_text(obj, &["reporterName", "reporter_name", "tenantName", "tenant_name"]),
        reported_at: timestamp(obj, &["reportedAt", "reported_at", "createdAt", "created_at"]),
        assigned_at: timestamp(obj, &["assignedAt", "assigned_at"]),
        resolved_at: timestamp(obj, &["resolvedAt", "resolved_at"]),
        closed_at: timestamp(obj, &["closedAt", "closed_at"]),
        legacy_image: LegacyImageInfo {
            flagged: flag(obj, &["hasImage", "has_image", "hasAttachment", "has_attachment"])
                .unwrap_or(false),
            mime_type: non_empty_text(obj, &["imageType", "image_type", "imageMimeType", "image_mime_type"]),
            file_name: non_empty_text(obj, &["imageName", "image_name", "imageFileName", "image_file_name"]),
        },
    })
}

// ── Attachments ──────────────────────────────────────────────

fn attachment_id(obj: &Object) -> Option<AttachmentId> {
    match field(obj, &["attachmentId", "attachment_id", "id"])? {
        Value::Number(n) => n.as_i64().map(AttachmentId::Row),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Normalize one attachment record of the current storage generation.
///
/// `issue_id` fills in the owning issue when the record omits it, and
/// `requested_phase` is the phase filter the list was fetched with, used as
/// the explicit phase when the record carries none.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] if the record is not an object.
pub fn attachment_from_value(
    value: &Value,
    issue_id: i64,
    requested_phase: Option<&str>,
) -> Result<Attachment> {
    let obj = as_object(value, "attachment")?;

    let content = non_empty_text(obj, &["fileContent", "file_content", "content", "data"])
        .map_or(AttachmentContent::Remote, AttachmentContent::Inline);

    Ok(Attachment {
        id: attachment_id(obj),
        issue_id: int(obj, &["issueId", "issue_id"]).unwrap_or(issue_id),
        uploader_id: int(obj, &["uploadedBy", "uploaded_by", "uploaderId", "uploader_id"]),
        file_name: non_empty_text(obj, &["fileName", "file_name", "filename", "name"]),
        mime_type: non_empty_text(obj, &["fileType", "file_type", "mimeType", "mime_type", "contentType", "content_type"]),
        content,
        description: non_empty_text(obj, &["description", "contextDescription", "context_description"]),
        phase: non_empty_text(obj, &["phase", "attachmentPhase", "attachment_phase"])
            .or_else(|| requested_phase.map(ToString::to_string)),
        attachment_type: non_empty_text(obj, &["attachmentType", "attachment_type", "type"]),
        is_primary: flag(obj, &["isPrimary", "is_primary"]).unwrap_or(false),
        uploaded_at: timestamp(obj, &["uploadedAt", "uploaded_at", "createdAt", "created_at"]),
    })
}

/// Normalize an attachment list response.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] if the payload is not a list of
/// objects.
pub fn attachments_from_value(
    value: &Value,
    issue_id: i64,
    requested_phase: Option<&str>,
) -> Result<Vec<Attachment>> {
    unwrap_list(value, &["attachments"], "attachment")?
        .iter()
        .map(|item| attachment_from_value(item, issue_id, requested_phase))
        .collect()
}

/// Normalize the legacy single-image payload.
///
/// Returns `None` when the payload carries no content.
#[must_use]
pub fn legacy_image_from_value(value: &Value) -> Option<LegacyImage> {
    let obj = unwrap_envelope(value, &["image"]).as_object()?;
    Some(LegacyImage {
        content: non_empty_text(obj, &["imageContent", "image_content", "content", "data"])?,
        mime_type: non_empty_text(obj, &["contentType", "content_type", "mimeType", "mime_type", "imageType", "image_type"]),
        file_name: non_empty_text(obj, &["fileName", "file_name", "imageName", "image_name"]),
    })
}

/// Normalize one attachment content payload.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] if no content is present.
pub fn attachment_payload_from_value(value: &Value) -> Result<AttachmentPayload> {
    let obj = as_object(unwrap_envelope(value, &["attachment"]), "attachment content")?;
    let content = non_empty_text(obj, &["fileContent", "file_content", "content", "data"])
        .ok_or_else(|| Error::MalformedRecord {
            kind: "attachment content",
            reason: "missing content".to_string(),
        })?;
    Ok(AttachmentPayload {
        content,
        mime_type: non_empty_text(obj, &["fileType", "file_type", "mimeType", "mime_type", "contentType", "content_type"]),
    })
}

// ── Comments ─────────────────────────────────────────────────

/// Normalize one comment record.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] if the record is not an object or
/// has no usable ID.
pub fn comment_from_value(value: &Value, issue_id: i64) -> Result<Comment> {
    let obj = as_object(value, "comment")?;
    let id = int(obj, &["commentId", "comment_id", "id"]).ok_or_else(|| Error::MalformedRecord {
        kind: "comment",
        reason: "missing id".to_string(),
    })?;

    let internal = flag(obj, &["isInternal", "is_internal"]).unwrap_or_else(|| {
        text(obj, &["visibility"]).is_some_and(|v| v.eq_ignore_ascii_case("internal"))
    });

    Ok(Comment {
        id,
        issue_id: int(obj, &["issueId", "issue_id"]).unwrap_or(issue_id),
        author_id: int(obj, &["userId", "user_id", "authorId", "author_id"]),
        author_name: non_empty_text(obj, &["userName", "user_name", "authorName", "author_name"]),
        body: text(obj, &["content", "comment", "body", "text"]).unwrap_or_default(),
        comment_type: non_empty_text(obj, &["commentType", "comment_type", "type"])
            .unwrap_or_else(|| "general".to_string()),
        visibility: if internal {
            Visibility::Internal
        } else {
            Visibility::Public
        },
        parent_id: int(obj, &["parentCommentId", "parent_comment_id", "parentId", "parent_id"]),
        created_at: timestamp(obj, &["createdAt", "created_at"]),
    })
}

/// Normalize a comment list response.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] on a non-list payload or a comment
/// without an ID.
pub fn comments_from_value(value: &Value, issue_id: i64) -> Result<Vec<Comment>> {
    unwrap_list(value, &["comments"], "comment")?
        .iter()
        .map(|item| comment_from_value(item, issue_id))
        .collect()
}

// ── Status history ───────────────────────────────────────────

/// Normalize a status history response.
///
/// Rows without a target status are skipped.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] on a non-list payload.
pub fn history_from_value(value: &Value, issue_id: i64) -> Result<Vec<StatusHistoryEntry>> {
    let rows = unwrap_list(value, &["history", "statusHistory", "status_history"], "status history")?;
    Ok(rows
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            let to = text(obj, &["newStatus", "new_status", "status"])?;
            Some(StatusHistoryEntry {
                issue_id: int(obj, &["issueId", "issue_id"]).unwrap_or(issue_id),
                from: text(obj, &["oldStatus", "old_status"]).map(|s| status_from_text(&s)),
                to: status_from_text(&to),
                changed_by: text(obj, &["changedByName", "changed_by_name", "changedBy", "changed_by"]),
                note: non_empty_text(obj, &["notes", "note", "reason"]),
                changed_at: timestamp(obj, &["changedAt", "changed_at", "createdAt", "created_at"]),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_snake_case() {
        let issue = issue_from_value(&json!({
            "issue_id": 12,
            "description": "Leaking tap",
            "status": "in_progress",
            "priority": "high",
            "reported_by": "4",
            "reported_at": "2024-02-01 08:30:00",
            "has_image": 1
        }))
        .unwrap();

        assert_eq!(issue.id, 12);
        assert_eq!(issue.status, IssueStatus::InProgress);
        assert_eq!(issue.priority, Some(crate::model::Priority::High));
        assert_eq!(issue.reporter_id, Some(4));
        assert!(issue.reported_at.is_some());
        assert!(issue.has_legacy_image());
    }

    #[test]
    fn test_issue_envelope_and_camel_preference() {
        let issue = issue_from_value(&json!({
            "issue": {
                "issueId": 7,
                "issue_id": 8,
                "status": "RESOLVED",
                "imageType": "image/jpeg",
                "priority": "whenever"
            }
        }))
        .unwrap();

        assert_eq!(issue.id, 7);
        assert_eq!(issue.status, IssueStatus::Resolved);
        assert_eq!(issue.priority, None);
        assert!(issue.has_legacy_image());
    }

    #[test]
    fn test_issue_without_id_is_malformed() {
        assert!(matches!(
            issue_from_value(&json!({"description": "?"})),
            Err(Error::MalformedRecord { kind: "issue", .. })
        ));
        assert!(issue_from_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_attachment_mixed_naming() {
        let attachments = attachments_from_value(
            &json!({"attachments": [
                {"attachment_id": 3, "file_name": "a.jpg", "attachment_type": "before_after", "is_primary": true},
                {"attachmentId": "4", "fileName": "b.jpg", "file_name": "ignored.jpg", "fileContent": "aGk="},
                {"id": "legacy_12", "fileType": "image/png"}
            ]}),
            12,
            Some("completion"),
        )
        .unwrap();

        assert_eq!(attachments.len(), 3);
        assert_eq!(attachments[0].id, Some(AttachmentId::Row(3)));
        assert!(attachments[0].is_primary);
        assert_eq!(attachments[0].attachment_type.as_deref(), Some("before_after"));
        assert_eq!(attachments[0].phase.as_deref(), Some("completion"));
        assert_eq!(attachments[0].content, AttachmentContent::Remote);

        assert_eq!(attachments[1].file_name.as_deref(), Some("b.jpg"));
        assert_eq!(attachments[1].content, AttachmentContent::Inline("aGk=".to_string()));

        assert_eq!(attachments[2].id, Some(AttachmentId::Legacy(12)));
        assert_eq!(attachments[2].issue_id, 12);
    }

    #[test]
    fn test_null_list_is_empty() {
        assert!(attachments_from_value(&json!({"data": null}), 1, None).unwrap().is_empty());
        assert!(comments_from_value(&Value::Null, 1).unwrap().is_empty());
        assert!(comments_from_value(&json!("nope"), 1).is_err());
    }

    #[test]
    fn test_legacy_image_payload() {
        let image = legacy_image_from_value(&json!({
            "image_content": "aGVsbG8=",
            "content_type": "image/jpeg"
        }))
        .unwrap();
        assert_eq!(image.content, "aGVsbG8=");
        assert_eq!(image.mime_type.as_deref(), Some("image/jpeg"));

        assert!(legacy_image_from_value(&json!({"image_content": ""})).is_none());
        assert!(legacy_image_from_value(&json!({})).is_none());
    }

    #[test]
    fn test_comment_fields() {
        let comments = comments_from_value(
            &json!([
                {"comment_id": 1, "content": "Any update?", "parent_comment_id": 0, "created_at": "2024-02-01T10:00:00Z"},
                {"commentId": 2, "comment": "Tomorrow", "parentCommentId": 1, "isInternal": false, "commentType": "feedback"},
                {"id": 3, "content": "Order parts", "visibility": "internal"}
            ]),
            5,
        )
        .unwrap();

        assert_eq!(comments[0].parent(), None);
        assert_eq!(comments[0].issue_id, 5);
        assert!(comments[0].created_at.is_some());
        assert_eq!(comments[1].parent(), Some(1));
        assert_eq!(comments[1].body, "Tomorrow");
        assert_eq!(comments[1].comment_type, "feedback");
        assert_eq!(comments[2].visibility, Visibility::Internal);
        assert_eq!(comments[2].comment_type, "general");
    }

    #[test]
    fn test_history_rows() {
        let history = history_from_value(
            &json!({"history": [
                {"old_status": "open", "new_status": "in_progress", "changed_by": "Pak Budi", "notes": "Assigned"},
                {"note": "no status, skipped"}
            ]}),
            3,
        )
        .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from, Some(IssueStatus::Open));
        assert_eq!(history[0].to, IssueStatus::InProgress);
        assert_eq!(history[0].note.as_deref(), Some("Assigned"));
    }

    #[test]
    fn test_history_status_case_insensitive() {
        let history = history_from_value(
            &json!([{"oldStatus": " In_Progress", "newStatus": "RESOLVED "}]),
            3,
        )
        .unwrap();
        assert_eq!(history[0].from, Some(IssueStatus::InProgress));
        assert_eq!(history[0].to, IssueStatus::Resolved);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp(&json!("2024-02-01T10:00:00+07:00")).is_some());
        assert!(parse_timestamp(&json!("2024-02-01 10:00:00")).is_some());
        assert!(parse_timestamp(&json!("2024-02-01T10:00:00.123")).is_some());
        assert!(parse_timestamp(&json!(1_706_781_600_000_i64)).is_some());
        assert!(parse_timestamp(&json!("yesterday")).is_none());
    }
}
