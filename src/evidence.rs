//! Evidence aggregation.
//!
//! Photos come from two storage generations: the legacy schema kept at most
//! one image per issue, the current one keeps any number of attachment rows.
//! Aggregation is a two-phase merge:
//!
//! 1. the legacy adapter turns the legacy image into zero or one synthetic
//!    attachment (`legacy_<issueId>`, phase `report`, primary);
//! 2. every attachment row is classified into a phase;
//!
//! then a single merge step buckets them by phase and drops duplicates.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::model::{
    Attachment, AttachmentContent, AttachmentId, Issue, IssueStatus, LegacyImage, Phase,
};
use crate::validate::classify_attachment;

/// Attachments grouped by workflow phase.
///
/// All four buckets always exist, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBuckets {
    pub report: Vec<Attachment>,
    pub progress: Vec<Attachment>,
    pub completion: Vec<Attachment>,
    pub feedback: Vec<Attachment>,
}

/// Bucket sizes, for summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvidenceCounts {
    pub report: usize,
    pub progress: usize,
    pub completion: usize,
    pub feedback: usize,
    /// Attachments whose content could not be fetched.
    pub unavailable: usize,
}

impl EvidenceBuckets {
    #[must_use]
    pub fn bucket(&self, phase: Phase) -> &[Attachment] {
        match phase {
            Phase::Report => &self.report,
            Phase::Progress => &self.progress,
            Phase::Completion => &self.completion,
            Phase::Feedback => &self.feedback,
        }
    }

    fn bucket_mut(&mut self, phase: Phase) -> &mut Vec<Attachment> {
        match phase {
            Phase::Report => &mut self.report,
            Phase::Progress => &mut self.progress,
            Phase::Completion => &mut self.completion,
            Phase::Feedback => &mut self.feedback,
        }
    }

    /// Iterate `(phase, attachment)` in phase order, then input order.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, &Attachment)> {
        Phase::ALL
            .into_iter()
            .flat_map(move |phase| self.bucket(phase).iter().map(move |a| (phase, a)))
    }

    /// Total number of attachments across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        Phase::ALL.iter().map(|p| self.bucket(*p).len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn counts(&self) -> EvidenceCounts {
        EvidenceCounts {
            report: self.report.len(),
            progress: self.progress.len(),
            completion: self.completion.len(),
            feedback: self.feedback.len(),
            unavailable: self.iter().filter(|(_, a)| !a.content.is_available()).count(),
        }
    }

    /// The attachment to show prominently for a phase.
    ///
    /// The first primary-flagged attachment wins; later flags are ignored.
    /// Without any flag, the first attachment of the phase is used.
    #[must_use]
    pub fn primary(&self, phase: Phase) -> Option<&Attachment> {
        let bucket = self.bucket(phase);
        bucket.iter().find(|a| a.is_primary).or_else(|| bucket.first())
    }

    /// Clear every primary flag after the first one in each phase.
    ///
    /// Upstream data does not guarantee a single primary per phase; this
    /// makes the rendered state consistent.
    pub fn normalize_primary(&mut self) {
        for phase in Phase::ALL {
            let mut seen = false;
            for attachment in self.bucket_mut(phase) {
                if attachment.is_primary {
                    if seen {
                        attachment.is_primary = false;
                    }
                    seen = true;
                }
            }
        }
    }

    #[must_use]
    pub fn has_completion_evidence(&self) -> bool {
        !self.completion.is_empty()
    }

    /// Phases an issue in `status` should have photos for but does not.
    ///
    /// A resolution claim must be verifiable, so `resolved` and `closed`
    /// require completion photos. No other phase is mandatory.
    #[must_use]
    pub fn missing_evidence(&self, status: &IssueStatus) -> Vec<Phase> {
        match status {
            IssueStatus::Resolved | IssueStatus::Closed if !self.has_completion_evidence() => {
                vec![Phase::Completion]
            }
            _ => Vec::new(),
        }
    }
}

/// Legacy adapter: synthesize the attachment for an issue's legacy image.
///
/// Yields a record only when the issue claims a legacy image and the
/// accessor actually returned a non-empty payload. The flag is known to be
/// stale at times, so an absent payload simply means no image.
#[must_use]
pub fn legacy_attachment(issue: &Issue, legacy: Option<LegacyImage>) -> Option<Attachment> {
    if !issue.has_legacy_image() {
        return None;
    }

    let image = legacy.filter(|img| !img.content.trim().is_empty())?;

    Some(Attachment {
        id: Some(AttachmentId::Legacy(issue.id)),
        issue_id: issue.id,
        uploader_id: issue.reporter_id,
        file_name: image.file_name.or_else(|| issue.legacy_image.file_name.clone()),
        mime_type: image.mime_type.or_else(|| issue.legacy_image.mime_type.clone()),
        content: AttachmentContent::Inline(image.content),
        description: None,
        phase: Some(Phase::Report.as_str().to_string()),
        attachment_type: None,
        is_primary: true,
        uploaded_at: issue.reported_at,
    })
}

/// Group an issue's photos by workflow phase.
///
/// `legacy` is the payload returned by the legacy image accessor, `None` if
/// the issue has no legacy image or fetching it failed. `raw` is the flat
/// list of attachment rows in the order the API returned them.
///
/// Duplicates (same ID, or same file name for ID-less records) are dropped;
/// the copy in the earliest phase wins, and within a phase the earliest in
/// input order. The legacy record precedes every row. Attachments with
/// unavailable content stay in their bucket.
#[must_use]
pub fn organize_attachments(
    issue: &Issue,
    legacy: Option<LegacyImage>,
    raw: Vec<Attachment>,
) -> EvidenceBuckets {
    let classified = legacy_attachment(issue, legacy)
        .map(|a| (Phase::Report, a))
        .into_iter()
        .chain(raw.into_iter().map(|a| {
            let phase = classify_attachment(a.phase.as_deref(), a.attachment_type.as_deref());
            (phase, a)
        }))
        .collect::<Vec<_>>();

    let mut buckets = EvidenceBuckets::default();
    let mut seen = HashSet::new();
    let mut dropped = 0usize;

    for phase in Phase::ALL {
        for (_, attachment) in classified.iter().filter(|(p, _)| *p == phase) {
            if let Some(key) = attachment.identity_key() {
                if !seen.insert(key) {
                    dropped += 1;
                    continue;
                }
            }
            buckets.bucket_mut(phase).push(attachment.clone());
        }
    }

    debug!(
        issue_id = issue.id,
        total = buckets.len(),
        duplicates = dropped,
        "Organized attachments"
    );

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn legacy_image() -> LegacyImage {
        LegacyImage {
            content: "aGVsbG8=".to_string(),
            mime_type: Some("image/png".to_string()),
            file_name: None,
        }
    }

    #[test]
    fn test_legacy_only_issue() {
        let issue = Issue::new(9, "Broken window").with_legacy_image(Some("image/png"));
        let buckets = organize_attachments(&issue, Some(legacy_image()), Vec::new());

        assert_eq!(buckets.report.len(), 1);
        assert!(buckets.progress.is_empty());
        assert!(buckets.completion.is_empty());
        assert!(buckets.feedback.is_empty());

        let legacy = &buckets.report[0];
        assert!(legacy.is_primary);
        assert_eq!(legacy.id, Some(AttachmentId::Legacy(9)));
        assert_eq!(legacy.id.unwrap().to_string(), "legacy_9");
    }

    #[test]
    fn test_missing_legacy_payload_is_absence() {
        let issue = Issue::new(9, "Broken window").with_legacy_image(None);
        assert!(organize_attachments(&issue, None, Vec::new()).is_empty());

        let empty = LegacyImage {
            content: String::new(),
            mime_type: None,
            file_name: None,
        };
        assert!(organize_attachments(&issue, Some(empty), Vec::new()).is_empty());
    }

    #[test]
    fn test_legacy_payload_ignored_without_flag() {
        let issue = Issue::new(9, "Broken window");
        assert!(legacy_attachment(&issue, Some(legacy_image())).is_none());
    }

    #[test]
    fn test_rows_bucketed_in_input_order() {
        let issue = Issue::new(1, "Door");
        let raw = vec![
            Attachment::new(10, 1).with_type("evidence"),
            Attachment::new(11, 1).with_phase("completion"),
            Attachment::new(12, 1).with_type("before_after"),
            Attachment::new(13, 1).with_type("satisfaction"),
            Attachment::new(14, 1).with_type("work_in_progress"),
            Attachment::new(15, 1),
        ];
        let buckets = organize_attachments(&issue, None, raw);

        let ids = |phase| {
            buckets
                .bucket(phase)
                .iter()
                .map(|a| a.id.unwrap().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(Phase::Report), vec!["10", "15"]);
        assert_eq!(ids(Phase::Progress), vec!["14"]);
        assert_eq!(ids(Phase::Completion), vec!["11", "12"]);
        assert_eq!(ids(Phase::Feedback), vec!["13"]);
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let issue = Issue::new(1, "Door");
        let raw = vec![
            Attachment::new(7, 1).with_type("progress"),
            Attachment::new(7, 1).with_type("progress"),
        ];
        let buckets = organize_attachments(&issue, None, raw);
        assert_eq!(buckets.len(), 1);
    }

    #[test]
    fn test_duplicate_prefers_earlier_phase() {
        let issue = Issue::new(1, "Door");
        let raw = vec![
            Attachment::new(7, 1).with_type("feedback"),
            Attachment::new(7, 1).with_type("evidence"),
        ];
        let buckets = organize_attachments(&issue, None, raw);
        assert_eq!(buckets.report.len(), 1);
        assert!(buckets.feedback.is_empty());
    }

    #[test]
    fn test_file_name_dedup_for_idless_records() {
        let issue = Issue::new(1, "Door");
        let mut a = Attachment::new(0, 1).with_file_name("leak.jpg");
        a.id = None;
        let mut b = a.clone();
        b.attachment_type = Some("progress".to_string());
        let mut anonymous = Attachment::new(0, 1);
        anonymous.id = None;

        let buckets =
            organize_attachments(&issue, None, vec![a, b, anonymous.clone(), anonymous]);
        assert_eq!(buckets.report.len(), 3);
        assert!(buckets.progress.is_empty());
    }

    #[test]
    fn test_unavailable_content_is_kept() {
        let issue = Issue::new(1, "Door");
        let mut row = Attachment::new(3, 1).with_type("completion");
        row.content = AttachmentContent::Unavailable;
        let buckets = organize_attachments(&issue, None, vec![row]);
        assert_eq!(buckets.completion.len(), 1);
        assert_eq!(buckets.counts().unavailable, 1);
    }

    #[test]
    fn test_primary_selection_and_normalization() {
        let issue = Issue::new(1, "Door");
        let raw = vec![
            Attachment::new(1, 1).with_type("completion"),
            Attachment::new(2, 1).with_type("completion").primary(),
            Attachment::new(3, 1).with_type("completion").primary(),
            Attachment::new(4, 1).with_type("progress"),
        ];
        let mut buckets = organize_attachments(&issue, None, raw);

        assert_eq!(buckets.primary(Phase::Completion).unwrap().id, Some(AttachmentId::Row(2)));
        assert_eq!(buckets.primary(Phase::Progress).unwrap().id, Some(AttachmentId::Row(4)));
        assert!(buckets.primary(Phase::Feedback).is_none());

        buckets.normalize_primary();
        let flagged: Vec<_> = buckets.completion.iter().filter(|a| a.is_primary).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, Some(AttachmentId::Row(2)));
    }

    #[test]
    fn test_missing_completion_evidence() {
        let issue = Issue::new(1, "Door");
        let empty = organize_attachments(&issue, None, Vec::new());
        assert_eq!(empty.missing_evidence(&IssueStatus::Resolved), vec![Phase::Completion]);
        assert_eq!(empty.missing_evidence(&IssueStatus::Closed), vec![Phase::Completion]);
        assert!(empty.missing_evidence(&IssueStatus::InProgress).is_empty());

        let done = organize_attachments(
            &issue,
            None,
            vec![Attachment::new(1, 1).with_type("resolved")],
        );
        assert!(done.missing_evidence(&IssueStatus::Resolved).is_empty());
    }

    fn arb_attachment() -> impl Strategy<Value = Attachment> {
        (
            0i64..8,
            proptest::option::of(prop_oneof![
                Just("evidence"),
                Just("progress"),
                Just("before_after"),
                Just("verification"),
                Just("junk"),
            ]),
        )
            .prop_map(|(id, tag)| {
                let a = Attachment::new(id, 1);
                match tag {
                    Some(t) => a.with_type(t),
                    None => a,
                }
            })
    }

    proptest! {
        #[test]
        fn prop_never_drops_non_duplicates(raw in proptest::collection::vec(arb_attachment(), 0..20), legacy in any::<bool>()) {
            let mut issue = Issue::new(1, "Door");
            if legacy {
                issue = issue.with_legacy_image(None);
            }
            let payload = legacy.then(legacy_image);

            let mut distinct: HashSet<String> = raw.iter().filter_map(Attachment::identity_key).collect();
            if legacy {
                distinct.insert(format!("id:{}", AttachmentId::Legacy(1)));
            }

            let buckets = organize_attachments(&issue, payload, raw);
            prop_assert_eq!(buckets.len(), distinct.len());
        }
    }
}
