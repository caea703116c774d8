//! Issue command implementations.

use colored::Colorize;
use serde::Serialize;

use crate::api::{resolve_attachment_source, ContentRef, HttpIssueApi, IssueApi};
use crate::cli::IssueCommands;
use crate::comments::{build_comment_tree, filter_comments, CommentTree, ThreadedComment};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::evidence::{EvidenceBuckets, EvidenceCounts};
use crate::model::{
    Attachment, Comment, Issue, IssueStatus, Phase, StatusHistoryEntry, Visibility, VisibilityFilter,
};
use crate::service::{load_issue_view, IssueView, ViewOptions};
use crate::validate::phase_alias;

#[derive(Serialize)]
struct ShowOutput<'a> {
    issue: &'a Issue,
    next_status: Option<&'a IssueStatus>,
    image_required: bool,
    counts: EvidenceCounts,
    missing_evidence: &'a [Phase],
}

#[derive(Serialize)]
struct EvidenceOutput<'a> {
    issue_id: i64,
    phase: Option<Phase>,
    counts: EvidenceCounts,
    missing_evidence: &'a [Phase],
    evidence: &'a EvidenceBuckets,
}

#[derive(Serialize)]
struct CommentsOutput {
    issue_id: i64,
    visibility: VisibilityFilter,
    count: usize,
    threads: Vec<ThreadedComment>,
}

#[derive(Serialize)]
struct HistoryOutput<'a> {
    issue_id: i64,
    count: usize,
    history: &'a [StatusHistoryEntry],
}

/// Execute issue commands.
///
/// # Errors
///
/// Returns an error if settings cannot be resolved, the backend request
/// fails, or an argument is invalid.
pub fn execute(
    command: &IssueCommands,
    api_url: Option<&str>,
    timeout: Option<u64>,
    json: bool,
) -> Result<()> {
    let settings = Settings::resolve(api_url, timeout)?;
    let api = HttpIssueApi::from_settings(&settings);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;

    rt.block_on(async {
        match command {
            IssueCommands::Show { id } => show(&api, *id, json).await,
            IssueCommands::Evidence { id, phase, content } => {
                let phase = phase.as_deref().map(parse_phase).transpose()?;
                evidence(&api, *id, phase, *content, json).await
            }
            IssueCommands::Comments { id, visibility } => {
                comments(&api, *id, (*visibility).into(), json).await
            }
            IssueCommands::History { id } => history(&api, *id, json).await,
        }
    })
}

fn parse_phase(input: &str) -> Result<Phase> {
    phase_alias(input).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "Unknown phase '{input}'. Valid phases: report, progress, completion, feedback"
        ))
    })
}

async fn show(api: &HttpIssueApi, id: i64, json: bool) -> Result<()> {
    let view = load_issue_view(api, id, ViewOptions::default().evidence_only()).await?;

    if json {
        let output = ShowOutput {
            issue: &view.issue,
            next_status: view.next_status.as_ref(),
            image_required: view.image_required,
            counts: view.counts,
            missing_evidence: &view.missing_evidence,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    print_issue_header(&view);
    println!();
    print_counts(&view.counts);
    print_missing(&view.missing_evidence);
    Ok(())
}

fn print_issue_header(view: &IssueView) {
    let issue = &view.issue;
    println!("{} {}", format!("#{}", issue.id).bold(), issue.description);
    println!();
    println!("Status:   {}", issue.status);
    if let Some(priority) = &issue.priority {
        println!("Priority: {priority}");
    }
    if let Some(category) = &issue.category {
        println!("Category: {category}");
    }
    if let Some(reporter) = &issue.reporter_name {
        println!("Reporter: {reporter}");
    }
    if let Some(at) = issue.reported_at {
        println!("Reported: {}", at.format("%Y-%m-%d %H:%M"));
    }

    match &view.next_status {
        Some(next) if view.image_required => {
            println!("Next:     {next} {}", "(photo required)".yellow());
        }
        Some(next) => println!("Next:     {next}"),
        None => println!("Next:     {}", "(terminal)".dimmed()),
    }
}

fn print_counts(counts: &EvidenceCounts) {
    println!(
        "Evidence: {} report, {} progress, {} completion, {} feedback",
        counts.report, counts.progress, counts.completion, counts.feedback
    );
    if counts.unavailable > 0 {
        println!("          {}", format!("{} unavailable", counts.unavailable).red());
    }
}

fn print_missing(missing: &[Phase]) {
    for phase in missing {
        println!("{} no {} photos", "Missing:".red().bold(), phase);
    }
}

async fn evidence(
    api: &HttpIssueApi,
    id: i64,
    phase: Option<Phase>,
    fetch_content: bool,
    json: bool,
) -> Result<()> {
    let options = ViewOptions::default()
        .evidence_only()
        .with_phase(phase)
        .with_content(fetch_content);
    let view = load_issue_view(api, id, options).await?;

    if json {
        let output = EvidenceOutput {
            issue_id: id,
            phase,
            counts: view.counts,
            missing_evidence: &view.missing_evidence,
            evidence: &view.evidence,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    let phases = phase.map_or_else(|| Phase::ALL.to_vec(), |p| vec![p]);
    for phase in phases {
        let bucket = view.evidence.bucket(phase);
        let primary = view.evidence.primary(phase);
        println!("{} ({})", phase.as_str().bold(), bucket.len());
        if bucket.is_empty() {
            println!("  {}", "no photos".dimmed());
        }
        for attachment in bucket {
            let is_primary = primary.is_some_and(|p| std::ptr::eq(p, attachment));
            print_attachment(attachment, is_primary, api.base_url());
        }
    }
    print_missing(&view.missing_evidence);
    Ok(())
}

fn print_attachment(attachment: &Attachment, is_primary: bool, base_url: &str) {
    let marker = if is_primary { "*".yellow() } else { " ".normal() };
    let content = resolve_attachment_source(attachment, base_url);
    let source = match &content {
        ContentRef::Inline { mime_type, .. } => {
            let size = content
                .inline_size()
                .map_or_else(|| "invalid data".to_string(), |n| format!("{n} bytes"));
            format!("{mime_type}, {size}")
        }
        ContentRef::Remote { url } => url.clone(),
        ContentRef::Placeholder => "unavailable".red().to_string(),
    };
    println!(" {marker} {} {}", attachment.display_name(), source.dimmed());
    if let Some(description) = &attachment.description {
        println!("     {description}");
    }
}

async fn comments(
    api: &HttpIssueApi,
    id: i64,
    visibility: VisibilityFilter,
    json: bool,
) -> Result<()> {
    let all = api.list_comments(id).await?;
    let tree = build_comment_tree(filter_comments(&all, visibility));

    if json {
        let output = CommentsOutput {
            issue_id: id,
            visibility,
            count: tree.len(),
            threads: tree.to_threads(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if tree.is_empty() {
        println!("No comments.");
        return Ok(());
    }
    print_tree(&tree);
    Ok(())
}

fn print_tree(tree: &CommentTree) {
    for (depth, comment) in tree.walk() {
        let indent = "  ".repeat(depth);
        println!("{indent}{}", comment_heading(comment));
        for line in comment.body.lines() {
            println!("{indent}  {line}");
        }
    }
}

fn comment_heading(comment: &Comment) -> String {
    let author = comment.author_name.as_deref().unwrap_or("unknown");
    let mut heading = format!("{} {}", author.bold(), format!("#{}", comment.id).dimmed());
    if let Some(at) = comment.created_at {
        heading.push(' ');
        heading.push_str(&at.format("%Y-%m-%d %H:%M").to_string().dimmed().to_string());
    }
    if comment.visibility == Visibility::Internal {
        heading.push(' ');
        heading.push_str(&"[internal]".yellow().to_string());
    }
    heading
}

async fn history(api: &HttpIssueApi, id: i64, json: bool) -> Result<()> {
    let history = api.status_history(id).await?;

    if json {
        let output = HistoryOutput {
            issue_id: id,
            count: history.len(),
            history: &history,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("No status changes recorded.");
        return Ok(());
    }

    for entry in &history {
        let when = entry
            .changed_at
            .map_or_else(|| "unknown time".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        let from = entry
            .from
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        print!("{}  {from} -> {}", when.dimmed(), entry.to.to_string().bold());
        if let Some(by) = &entry.changed_by {
            print!("  by {by}");
        }
        println!();
        if let Some(note) = &entry.note {
            println!("    {note}");
        }
    }
    Ok(())
}
