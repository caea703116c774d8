//! HTTP client for the collaborator backend.

use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::wire;
use super::IssueApi;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::model::{
    Attachment, AttachmentPayload, Comment, Issue, LegacyImage, Phase, StatusHistoryEntry,
};

/// What a 404 means for the request being made.
#[derive(Debug, Clone, Copy)]
enum Missing {
    Issue(i64),
    Attachment(i64),
    /// The resource is optional; a 404 means "none".
    Nothing,
}

/// reqwest-backed [`IssueApi`].
pub struct HttpIssueApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpIssueApi {
    /// Create a client for `base_url` (e.g. `http://localhost:8080/api`).
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Create a client from resolved settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.api_url, settings.timeout())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET a JSON document. `Ok(None)` only for a 404 on an optional
    /// resource.
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
        missing: Missing,
    ) -> Result<Option<Value>> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, ?query, "GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return match missing {
                Missing::Issue(id) => Err(Error::IssueNotFound { id }),
                Missing::Attachment(id) => Err(Error::AttachmentNotFound { id }),
                Missing::Nothing => Ok(None),
            };
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        // Some endpoints answer 204 or an empty body for "nothing here"
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn get_required(&self, path: &str, query: &[(&str, &str)], missing: Missing) -> Result<Value> {
        self.get_json(path, query, missing)
            .await
            .map(Option::unwrap_or_default)
    }
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error", "detail"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(ToString::to_string))
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}

impl IssueApi for HttpIssueApi {
    async fn get_issue(&self, issue_id: i64) -> Result<Issue> {
        let value = self
            .get_required(&format!("/issues/{issue_id}"), &[], Missing::Issue(issue_id))
            .await?;
        wire::issue_from_value(&value)
    }

    async fn list_attachments(&self, issue_id: i64, phase: Option<Phase>) -> Result<Vec<Attachment>> {
        let query: Vec<(&str, &str)> = phase.iter().map(|p| ("type", p.as_str())).collect();
        let value = self
            .get_required(
                &format!("/issues/{issue_id}/attachments"),
                &query,
                Missing::Issue(issue_id),
            )
            .await?;
        wire::attachments_from_value(&value, issue_id, phase.map(|p| p.as_str()))
    }

    async fn get_legacy_image(&self, issue_id: i64) -> Result<Option<LegacyImage>> {
        let value = self
            .get_json(&format!("/issues/{issue_id}/image"), &[], Missing::Nothing)
            .await?;
        Ok(value.as_ref().and_then(wire::legacy_image_from_value))
    }

    async fn get_attachment_content(&self, attachment_id: i64) -> Result<AttachmentPayload> {
        let value = self
            .get_required(
                &format!("/issue-attachments/{attachment_id}"),
                &[],
                Missing::Attachment(attachment_id),
            )
            .await?;
        wire::attachment_payload_from_value(&value)
    }

    async fn list_comments(&self, issue_id: i64) -> Result<Vec<Comment>> {
        let value = self
            .get_required(&format!("/issues/{issue_id}/comments"), &[], Missing::Issue(issue_id))
            .await?;
        wire::comments_from_value(&value, issue_id)
    }

    async fn status_history(&self, issue_id: i64) -> Result<Vec<StatusHistoryEntry>> {
        let value = self
            .get_required(
                &format!("/issues/{issue_id}/status-history"),
                &[],
                Missing::Issue(issue_id),
            )
            .await?;
        wire::history_from_value(&value, issue_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttachmentContent, IssueStatus};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> HttpIssueApi {
        HttpIssueApi::new(&format!("{}/api/", server.uri()), Duration::from_secs(5))
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = HttpIssueApi::new("http://localhost:8080/api///", Duration::from_secs(1));
        assert_eq!(api.base_url(), "http://localhost:8080/api");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"message":"Issue locked"}"#), "Issue locked");
        assert_eq!(error_message("plain failure"), "plain failure");
        assert_eq!(error_message(""), "no response body");
    }

    #[tokio::test]
    async fn test_get_issue() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/issues/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issue": {"issue_id": 12, "description": "Leak", "status": "open", "has_image": true}
            })))
            .mount(&server)
            .await;

        let issue = api(&server).get_issue(12).await.unwrap();
        assert_eq!(issue.id, 12);
        assert_eq!(issue.status, IssueStatus::Open);
        assert!(issue.has_legacy_image());
    }

    #[tokio::test]
    async fn test_missing_issue_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/issues/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = api(&server).get_issue(404).await.unwrap_err();
        assert!(matches!(err, Error::IssueNotFound { id: 404 }));
    }

    #[tokio::test]
    async fn test_server_error_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/issues/1/comments"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
            .mount(&server)
            .await;

        match api(&server).list_comments(1).await {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "db down");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_attachments_with_phase_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/issues/3/attachments"))
            .and(query_param("type", "completion"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "attachments": [{"attachment_id": 8, "file_name": "after.jpg"}]
            })))
            .mount(&server)
            .await;

        let attachments = api(&server)
            .list_attachments(3, Some(Phase::Completion))
            .await
            .unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].phase.as_deref(), Some("completion"));
        assert_eq!(attachments[0].content, AttachmentContent::Remote);
    }

    #[tokio::test]
    async fn test_legacy_image_absent_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/issues/5/image"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert_eq!(api(&server).get_legacy_image(5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_attachment_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/issue-attachments/8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "file_content": "aGVsbG8=", "file_type": "image/jpeg"
            })))
            .mount(&server)
            .await;

        let payload = api(&server).get_attachment_content(8).await.unwrap();
        assert_eq!(payload.content, "aGVsbG8=");
        assert_eq!(payload.mime_type.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn test_empty_history_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/issues/2/status-history"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        assert!(api(&server).status_history(2).await.unwrap().is_empty());
    }
}
