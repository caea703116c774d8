//! Issue view assembly.
//!
//! Fetches everything an issue detail screen needs from an [`IssueApi`],
//! runs the workflow model over it, and returns a single [`IssueView`].
//!
//! Failures of the issue itself, the attachment list, comments or history
//! propagate. The legacy image and per-attachment content are best effort:
//! a failed fetch is logged and the record degrades to "no image" or
//! [`AttachmentContent::Unavailable`].

use serde::Serialize;
use tracing::{debug, warn};

use crate::api::IssueApi;
use crate::comments::{build_comment_tree, filter_comments, ThreadedComment};
use crate::error::Result;
use crate::evidence::{organize_attachments, EvidenceBuckets, EvidenceCounts};
use crate::model::{
    Attachment, AttachmentContent, AttachmentId, Issue, IssueStatus, LegacyImage, Phase,
    StatusHistoryEntry, VisibilityFilter,
};
use crate::workflow::{is_image_required, next_status};

/// What to load for an issue view.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub visibility: VisibilityFilter,
    /// Ask the backend for one phase only.
    pub phase: Option<Phase>,
    /// Fetch binary content for remote attachment rows.
    pub fetch_content: bool,
    pub include_comments: bool,
    pub include_history: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            visibility: VisibilityFilter::All,
            phase: None,
            fetch_content: false,
            include_comments: true,
            include_history: true,
        }
    }
}

impl ViewOptions {
    #[must_use]
    pub const fn with_visibility(mut self, visibility: VisibilityFilter) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub const fn with_phase(mut self, phase: Option<Phase>) -> Self {
        self.phase = phase;
        self
    }

    #[must_use]
    pub const fn with_content(mut self, fetch_content: bool) -> Self {
        self.fetch_content = fetch_content;
        self
    }

    /// Evidence only: skip comments and history.
    #[must_use]
    pub const fn evidence_only(mut self) -> Self {
        self.include_comments = false;
        self.include_history = false;
        self
    }
}

/// Everything the issue detail screen shows.
#[derive(Debug, Clone, Serialize)]
pub struct IssueView {
    pub issue: Issue,
    pub next_status: Option<IssueStatus>,
    pub image_required: bool,
    pub evidence: EvidenceBuckets,
    pub counts: EvidenceCounts,
    pub missing_evidence: Vec<Phase>,
    pub comment_count: usize,
    pub comments: Vec<ThreadedComment>,
    pub history: Vec<StatusHistoryEntry>,
}

/// Load and assemble the view for `issue_id`.
///
/// # Errors
///
/// Returns the API error if the issue, its attachment list, its comments
/// or its history cannot be fetched.
pub async fn load_issue_view<A: IssueApi>(
    api: &A,
    issue_id: i64,
    options: ViewOptions,
) -> Result<IssueView> {
    let issue = api.get_issue(issue_id).await?;
    debug!(issue_id, status = %issue.status, "Loaded issue");

    let legacy = if issue.has_legacy_image() {
        fetch_legacy_image(api, issue_id).await
    } else {
        None
    };

    let mut rows = api.list_attachments(issue_id, options.phase).await?;
    if options.fetch_content {
        fetch_contents(api, &mut rows).await;
    }

    let mut evidence = organize_attachments(&issue, legacy, rows);
    evidence.normalize_primary();
    if let Some(phase) = options.phase {
        evidence = only_phase(evidence, phase);
    }

    let (comment_count, comments) = if options.include_comments {
        let all = api.list_comments(issue_id).await?;
        let visible = filter_comments(&all, options.visibility);
        let tree = build_comment_tree(visible);
        (tree.len(), tree.to_threads())
    } else {
        (0, Vec::new())
    };

    let history = if options.include_history {
        api.status_history(issue_id).await?
    } else {
        Vec::new()
    };

    Ok(IssueView {
        next_status: next_status(&issue.status),
        image_required: is_image_required(&issue.status),
        counts: evidence.counts(),
        missing_evidence: evidence.missing_evidence(&issue.status),
        evidence,
        comment_count,
        comments,
        history,
        issue,
    })
}

async fn fetch_legacy_image<A: IssueApi>(api: &A, issue_id: i64) -> Option<LegacyImage> {
    match api.get_legacy_image(issue_id).await {
        Ok(image) => image,
        Err(e) => {
            warn!(issue_id, error = %e, "Legacy image unavailable");
            None
        }
    }
}

/// Fill in content for remote rows, one request at a time.
async fn fetch_contents<A: IssueApi>(api: &A, rows: &mut [Attachment]) {
    for attachment in rows.iter_mut() {
        let Some(AttachmentId::Row(id)) = attachment.id else {
            continue;
        };
        if attachment.content != AttachmentContent::Remote {
            continue;
        }

        match api.get_attachment_content(id).await {
            Ok(payload) if !payload.content.trim().is_empty() => {
                if attachment.mime_type.is_none() {
                    attachment.mime_type = payload.mime_type;
                }
                attachment.content = AttachmentContent::Inline(payload.content);
            }
            Ok(_) => {
                warn!(attachment_id = id, "Attachment content is empty");
                attachment.content = AttachmentContent::Unavailable;
            }
            Err(e) => {
                warn!(attachment_id = id, error = %e, "Attachment content unavailable");
                attachment.content = AttachmentContent::Unavailable;
            }
        }
    }
}

/// Keep a single bucket. The legacy report photo is not part of a
/// phase-filtered listing for other phases.
fn only_phase(mut evidence: EvidenceBuckets, phase: Phase) -> EvidenceBuckets {
    let mut filtered = EvidenceBuckets::default();
    let kept = std::mem::take(match phase {
        Phase::Report => &mut evidence.report,
        Phase::Progress => &mut evidence.progress,
        Phase::Completion => &mut evidence.completion,
        Phase::Feedback => &mut evidence.feedback,
    });
    match phase {
        Phase::Report => filtered.report = kept,
        Phase::Progress => filtered.progress = kept,
        Phase::Completion => filtered.completion = kept,
        Phase::Feedback => filtered.feedback = kept,
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{AttachmentPayload, Comment};
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeApi {
        issues: HashMap<i64, Issue>,
        legacy: Option<LegacyImage>,
        legacy_fails: bool,
        attachments: Vec<Attachment>,
        contents: HashMap<i64, AttachmentPayload>,
        comments: Vec<Comment>,
        history: Vec<StatusHistoryEntry>,
    }

    impl FakeApi {
        fn with_issue(issue: Issue) -> Self {
            let mut api = Self::default();
            api.issues.insert(issue.id, issue);
            api
        }
    }

    impl IssueApi for FakeApi {
        async fn get_issue(&self, issue_id: i64) -> Result<Issue> {
            self.issues
                .get(&issue_id)
                .cloned()
                .ok_or(Error::IssueNotFound { id: issue_id })
        }

        async fn list_attachments(&self, _issue_id: i64, phase: Option<Phase>) -> Result<Vec<Attachment>> {
            Ok(self
                .attachments
                .iter()
                .filter(|a| phase.is_none_or(|p| a.phase.as_deref() == Some(p.as_str())))
                .cloned()
                .collect())
        }

        async fn get_legacy_image(&self, _issue_id: i64) -> Result<Option<LegacyImage>> {
            if self.legacy_fails {
                return Err(Error::Api {
                    status: 500,
                    message: "image store offline".to_string(),
                });
            }
            Ok(self.legacy.clone())
        }

        async fn get_attachment_content(&self, attachment_id: i64) -> Result<AttachmentPayload> {
            self.contents
                .get(&attachment_id)
                .cloned()
                .ok_or(Error::AttachmentNotFound { id: attachment_id })
        }

        async fn list_comments(&self, _issue_id: i64) -> Result<Vec<Comment>> {
            Ok(self.comments.clone())
        }

        async fn status_history(&self, _issue_id: i64) -> Result<Vec<StatusHistoryEntry>> {
            Ok(self.history.clone())
        }
    }

    fn legacy_image() -> LegacyImage {
        LegacyImage {
            content: "aGVsbG8=".to_string(),
            mime_type: Some("image/png".to_string()),
            file_name: Some("report.png".to_string()),
        }
    }

    #[tokio::test]
    async fn test_view_for_in_progress_issue() {
        let issue = Issue::new(3, "Leaking tap")
            .with_status(IssueStatus::InProgress)
            .with_legacy_image(Some("image/png"));
        let mut api = FakeApi::with_issue(issue);
        api.legacy = Some(legacy_image());
        api.attachments = vec![
            Attachment::new(10, 3).with_type("work_in_progress"),
            Attachment::new(11, 3).with_phase("completion").primary(),
        ];
        api.comments = vec![
            Comment::new(1, 3, "On it"),
            Comment::new(2, 3, "Thanks").reply_to(1),
            Comment::new(3, 3, "Staff only").internal(),
        ];

        let view = load_issue_view(&api, 3, ViewOptions::default()).await.unwrap();

        assert_eq!(view.next_status, Some(IssueStatus::Resolved));
        assert!(view.image_required);
        assert_eq!(view.counts.report, 1);
        assert_eq!(view.counts.progress, 1);
        assert_eq!(view.counts.completion, 1);
        assert!(view.missing_evidence.is_empty());
        assert_eq!(view.comment_count, 3);
        assert_eq!(view.comments.iter().map(|t| t.replies.len()).sum::<usize>(), 1);
    }

    #[tokio::test]
    async fn test_legacy_failure_degrades_to_no_image() {
        let issue = Issue::new(4, "Broken lock").with_legacy_image(None);
        let mut api = FakeApi::with_issue(issue);
        api.legacy_fails = true;
        api.attachments = vec![Attachment::new(20, 4).with_phase("report")];

        let view = load_issue_view(&api, 4, ViewOptions::default()).await.unwrap();

        assert_eq!(view.evidence.report.len(), 1);
        assert!(!view.evidence.report[0].id.unwrap().is_legacy());
    }

    #[tokio::test]
    async fn test_content_failure_marks_only_that_attachment() {
        let issue = Issue::new(5, "Mould").with_status(IssueStatus::Resolved);
        let mut api = FakeApi::with_issue(issue);
        api.attachments = vec![
            Attachment::new(30, 5).with_phase("completion"),
            Attachment::new(31, 5).with_phase("completion"),
        ];
        api.contents.insert(
            30,
            AttachmentPayload {
                content: "aGVsbG8=".to_string(),
                mime_type: Some("image/jpeg".to_string()),
            },
        );

        let options = ViewOptions::default().with_content(true);
        let view = load_issue_view(&api, 5, options).await.unwrap();

        let completion = &view.evidence.completion;
        assert_eq!(completion.len(), 2);
        assert_eq!(completion[0].content, AttachmentContent::Inline("aGVsbG8=".to_string()));
        assert_eq!(completion[0].mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(completion[1].content, AttachmentContent::Unavailable);
        assert_eq!(view.counts.unavailable, 1);
        assert!(view.missing_evidence.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_without_completion_photos() {
        let issue = Issue::new(6, "Flickering light").with_status(IssueStatus::Resolved);
        let api = FakeApi::with_issue(issue);

        let view = load_issue_view(&api, 6, ViewOptions::default()).await.unwrap();

        assert_eq!(view.next_status, Some(IssueStatus::Closed));
        assert!(!view.image_required);
        assert_eq!(view.missing_evidence, vec![Phase::Completion]);
    }

    #[tokio::test]
    async fn test_visibility_and_phase_options() {
        let issue = Issue::new(7, "Door").with_legacy_image(None);
        let mut api = FakeApi::with_issue(issue);
        api.legacy = Some(legacy_image());
        api.attachments = vec![
            Attachment::new(40, 7).with_phase("progress"),
            Attachment::new(41, 7).with_phase("completion"),
        ];
        api.comments = vec![
            Comment::new(1, 7, "Public note"),
            Comment::new(2, 7, "Internal note").internal(),
        ];

        let options = ViewOptions::default()
            .with_visibility(VisibilityFilter::Public)
            .with_phase(Some(Phase::Progress));
        let view = load_issue_view(&api, 7, options).await.unwrap();

        assert_eq!(view.evidence.len(), 1);
        assert_eq!(view.evidence.progress.len(), 1);
        assert_eq!(view.comment_count, 1);

        let evidence_only = ViewOptions::default().evidence_only();
        let view = load_issue_view(&api, 7, evidence_only).await.unwrap();
        assert_eq!(view.evidence.len(), 3);
        assert!(view.comments.is_empty());
    }

    #[tokio::test]
    async fn test_missing_issue_propagates() {
        let api = FakeApi::default();
        let err = load_issue_view(&api, 99, ViewOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::IssueNotFound { id: 99 }));
    }
}
