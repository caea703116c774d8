//! Input normalization and attachment classification.
//!
//! Provides O(1) lookup sets and synonym maps for statuses, priorities and
//! attachment phases. Status and priority use three-tier resolution:
//! exact match → synonym lookup → error with suggestion. Phase
//! classification never fails; unrecognized tags land in `report`.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::model::{IssueStatus, Phase, Priority};

// ── Valid value sets (O(1) lookups) ──────────────────────────

pub static VALID_STATUSES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["open", "in_progress", "resolved", "closed"].into_iter().collect());

pub static VALID_PRIORITIES: LazyLock<HashSet<&str>> =
    LazyLock::new(|| ["low", "medium", "high"].into_iter().collect());

// ── Synonym maps ─────────────────────────────────────────────

pub static STATUS_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("new", "open"),
        ("reported", "open"),
        ("pending", "open"),
        ("wip", "in_progress"),
        ("in-progress", "in_progress"),
        ("inprogress", "in_progress"),
        ("working", "in_progress"),
        ("started", "in_progress"),
        ("assigned", "in_progress"),
        ("fixed", "resolved"),
        ("repaired", "resolved"),
        ("completed", "resolved"),
        ("done", "closed"),
        ("verified", "closed"),
        ("finished", "closed"),
    ]
    .into_iter()
    .collect()
});

pub static PRIORITY_SYNONYMS: LazyLock<HashMap<&str, &str>> = LazyLock::new(|| {
    [
        ("minor", "low"),
        ("trivial", "low"),
        ("normal", "medium"),
        ("default", "medium"),
        ("urgent", "high"),
        ("critical", "high"),
        ("important", "high"),
    ]
    .into_iter()
    .collect()
});

/// Phase tags, including legacy "attachment type" values and the status
/// each phase corresponds to.
pub static PHASE_ALIASES: LazyLock<HashMap<&str, Phase>> = LazyLock::new(|| {
    [
        ("report", Phase::Report),
        ("evidence", Phase::Report),
        ("initial", Phase::Report),
        ("open", Phase::Report),
        ("progress", Phase::Progress),
        ("work_in_progress", Phase::Progress),
        ("in_progress", Phase::Progress),
        ("completion", Phase::Completion),
        ("resolved", Phase::Completion),
        ("before_after", Phase::Completion),
        ("feedback", Phase::Feedback),
        ("verification", Phase::Feedback),
        ("satisfaction", Phase::Feedback),
        ("closed", Phase::Feedback),
    ]
    .into_iter()
    .collect()
});

/// Normalize a status string via exact match or synonym lookup.
///
/// Returns the canonical status, or an error with the original input
/// and an optional suggestion.
pub fn normalize_status(input: &str) -> Result<IssueStatus, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    // Tier 1: exact match
    if VALID_STATUSES.contains(lower.as_str()) {
        return Ok(IssueStatus::from(lower.as_str()));
    }

    // Tier 2: synonym lookup
    if let Some(&canonical) = STATUS_SYNONYMS.get(lower.as_str()) {
        return Ok(IssueStatus::from(canonical));
    }

    // Tier 3: find closest suggestion
    let suggestion = find_closest_match(&lower, &VALID_STATUSES, &STATUS_SYNONYMS);
    Err((input.to_string(), suggestion))
}

/// Normalize a priority string via exact match or synonym lookup.
pub fn normalize_priority(input: &str) -> Result<Priority, (String, Option<String>)> {
    let lower = input.trim().to_lowercase();

    let canonical = if VALID_PRIORITIES.contains(lower.as_str()) {
        Some(lower.as_str())
    } else {
        PRIORITY_SYNONYMS.get(lower.as_str()).copied()
    };

    match canonical {
        Some("low") => Ok(Priority::Low),
        Some("medium") => Ok(Priority::Medium),
        Some("high") => Ok(Priority::High),
        _ => {
            let suggestion = find_closest_match(&lower, &VALID_PRIORITIES, &PRIORITY_SYNONYMS);
            Err((input.to_string(), suggestion))
        }
    }
}

/// Resolve one phase tag, if it is known.
#[must_use]
pub fn phase_alias(tag: &str) -> Option<Phase> {
    let lower = tag.trim().to_lowercase();
    PHASE_ALIASES.get(lower.as_str()).copied()
}

/// Classify an attachment into a workflow phase.
///
/// An explicit phase wins when it is canonical; a non-canonical explicit
/// phase goes through the alias table, then the legacy type tag does.
/// Anything unrecognized lands in [`Phase::Report`], the earliest phase, so
/// an attachment is at worst shown in the wrong tab, never hidden.
#[must_use]
pub fn classify_attachment(explicit_phase: Option<&str>, legacy_type: Option<&str>) -> Phase {
    if let Some(phase) = explicit_phase.and_then(Phase::from_canonical) {
        return phase;
    }

    explicit_phase
        .and_then(phase_alias)
        .or_else(|| legacy_type.and_then(phase_alias))
        .unwrap_or(Phase::Report)
}

/// Find the closest matching value across valid set and synonyms.
fn find_closest_match(
    input: &str,
    valid: &HashSet<&str>,
    synonyms: &HashMap<&str, &str>,
) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;

    for &v in valid.iter().chain(synonyms.keys()) {
        let dist = levenshtein_distance(input, v);
        if dist > 3 || best.is_some_and(|(_, d)| d <= dist) {
            continue;
        }
        // For synonyms, suggest what it maps to
        let target = synonyms.get(v).copied().unwrap_or(v);
        best = Some((target, dist));
    }

    best.map(|(v, _)| v.to_string())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single-row optimization
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_status() {
        assert_eq!(normalize_status("open"), Ok(IssueStatus::Open));
        assert_eq!(normalize_status("IN_PROGRESS"), Ok(IssueStatus::InProgress));
        assert_eq!(normalize_status("wip"), Ok(IssueStatus::InProgress));
        assert_eq!(normalize_status("fixed"), Ok(IssueStatus::Resolved));
        assert_eq!(normalize_status("done"), Ok(IssueStatus::Closed));
        assert!(normalize_status("nonsense").is_err());
    }

    #[test]
    fn test_normalize_status_suggests_close_match() {
        let (input, suggestion) = normalize_status("resolvd").unwrap_err();
        assert_eq!(input, "resolvd");
        assert_eq!(suggestion.as_deref(), Some("resolved"));
    }

    #[test]
    fn test_normalize_priority() {
        assert_eq!(normalize_priority("high"), Ok(Priority::High));
        assert_eq!(normalize_priority("Urgent"), Ok(Priority::High));
        assert_eq!(normalize_priority("normal"), Ok(Priority::Medium));
        assert_eq!(normalize_priority("low"), Ok(Priority::Low));
        assert!(normalize_priority("p0").is_err());
    }

    #[test]
    fn test_legacy_tag_table() {
        for tag in ["evidence", "initial", "report"] {
            assert_eq!(classify_attachment(None, Some(tag)), Phase::Report);
        }
        for tag in ["progress", "work_in_progress"] {
            assert_eq!(classify_attachment(None, Some(tag)), Phase::Progress);
        }
        for tag in ["completion", "resolved", "before_after"] {
            assert_eq!(classify_attachment(None, Some(tag)), Phase::Completion);
        }
        for tag in ["feedback", "verification", "satisfaction"] {
            assert_eq!(classify_attachment(None, Some(tag)), Phase::Feedback);
        }
    }

    #[test]
    fn test_before_after_is_completion() {
        assert_eq!(classify_attachment(None, Some("before_after")), Phase::Completion);
    }

    #[test]
    fn test_explicit_phase_wins_over_tag() {
        assert_eq!(
            classify_attachment(Some("feedback"), Some("evidence")),
            Phase::Feedback
        );
        // Status-named explicit phase resolves through the alias table
        assert_eq!(
            classify_attachment(Some("in_progress"), Some("evidence")),
            Phase::Progress
        );
        // Unknown explicit phase falls through to the tag
        assert_eq!(
            classify_attachment(Some("whatever"), Some("verification")),
            Phase::Feedback
        );
    }

    #[test]
    fn test_unknown_defaults_to_report() {
        assert_eq!(classify_attachment(None, None), Phase::Report);
        assert_eq!(classify_attachment(Some(""), Some("")), Phase::Report);
        assert_eq!(classify_attachment(None, Some("selfie")), Phase::Report);
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    proptest! {
        #[test]
        fn prop_classification_is_total(phase in ".*", tag in ".*") {
            let result = classify_attachment(Some(&phase), Some(&tag));
            prop_assert!(Phase::ALL.contains(&result));
        }

        #[test]
        fn prop_canonical_phase_round_trips(idx in 0usize..4, tag in proptest::option::of(".*")) {
            let phase = Phase::ALL[idx];
            prop_assert_eq!(classify_attachment(Some(phase.as_str()), tag.as_deref()), phase);
        }
    }
}
