//! Workflow command implementations.
//!
//! Pure rule lookups and local validation: no network access.

use base64::Engine;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::WorkflowCommands;
use crate::error::{Error, Result};
use crate::model::{IssueStatus, Phase};
use crate::validate::{classify_attachment, normalize_status};
use crate::workflow::{is_image_required, next_status, PendingAttachment, StatusUpdate};

#[derive(Serialize)]
struct NextOutput {
    status: IssueStatus,
    next_status: Option<IssueStatus>,
    image_required: bool,
    /// Phase the photo must be filed under when one is required.
    evidence_phase: Option<Phase>,
}

#[derive(Serialize)]
struct ClassifyOutput<'a> {
    phase: Phase,
    explicit_phase: Option<&'a str>,
    tag: Option<&'a str>,
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    valid: bool,
    from: IssueStatus,
    to: IssueStatus,
    phase: Option<Phase>,
    note: Option<&'a str>,
    attachments: Vec<CheckedAttachment<'a>>,
}

#[derive(Serialize)]
struct CheckedAttachment<'a> {
    file_name: &'a str,
    mime_type: &'a str,
    bytes: usize,
    is_primary: bool,
}

/// Execute workflow commands.
///
/// # Errors
///
/// Returns an error if the status is not recognized or JSON serialization
/// fails.
pub fn execute(command: &WorkflowCommands, json: bool) -> Result<()> {
    match command {
        WorkflowCommands::Next { status } => next(status, json),
        WorkflowCommands::Classify { phase, tag } => classify(phase.as_deref(), tag.as_deref(), json),
        WorkflowCommands::Check {
            from,
            to,
            photos,
            primary,
            note,
        } => check(from, to, photos, primary, note.as_deref(), json),
    }
}

fn parse_status(input: &str) -> Result<IssueStatus> {
    normalize_status(input).map_err(|(value, suggestion)| {
        let mut msg = format!("Unknown status '{value}'");
        if let Some(s) = suggestion {
            msg.push_str(&format!(". Did you mean '{s}'?"));
        }
        Error::InvalidArgument(msg)
    })
}

fn next(input: &str, json: bool) -> Result<()> {
    let status = parse_status(input)?;

    let next = next_status(&status);
    let image_required = is_image_required(&status);
    let evidence_phase = next
        .as_ref()
        .filter(|_| image_required)
        .and_then(Phase::for_status);

    if json {
        let output = NextOutput {
            status,
            next_status: next,
            image_required,
            evidence_phase,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    match next {
        Some(next) => {
            println!("{} -> {}", status, next.to_string().green().bold());
            if let Some(phase) = evidence_phase {
                println!(
                    "  {} at least one {} photo is required",
                    "!".yellow(),
                    phase.as_str().bold()
                );
            } else {
                println!("  No photo required");
            }
        }
        None => println!("{status} is terminal"),
    }
    Ok(())
}

fn classify(explicit_phase: Option<&str>, tag: Option<&str>, json: bool) -> Result<()> {
    let phase = classify_attachment(explicit_phase, tag);

    if json {
        let output = ClassifyOutput {
            phase,
            explicit_phase,
            tag,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{}", phase.as_str().bold());
    Ok(())
}

fn check(
    from: &str,
    to: &str,
    photos: &[PathBuf],
    primary: &[PathBuf],
    note: Option<&str>,
    json: bool,
) -> Result<()> {
    let from = parse_status(from)?;
    let mut update = StatusUpdate::new(parse_status(to)?);
    if let Some(note) = note {
        update = update.with_note(note);
    }
    for path in primary {
        update = update.with_attachment(read_photo(path, true)?);
    }
    for path in photos {
        update = update.with_attachment(read_photo(path, false)?);
    }

    update.validate(&from)?;

    if json {
        let attachments = update
            .attachments
            .iter()
            .map(|a| {
                Ok(CheckedAttachment {
                    file_name: &a.file_name,
                    mime_type: &a.mime_type,
                    bytes: a.decoded_len()?,
                    is_primary: a.is_primary,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let output = CheckOutput {
            valid: true,
            from,
            to: update.target.clone(),
            phase: update.phase(),
            note: update.note.as_deref(),
            attachments,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("{} {} -> {}", "ok".green().bold(), from, update.target);
    if let Some(phase) = update.phase().filter(|_| !update.attachments.is_empty()) {
        println!("  {} photo(s) filed under {phase}", update.attachments.len());
    }
    Ok(())
}

/// Read a photo from disk as a base64 attachment.
fn read_photo(path: &Path, is_primary: bool) -> Result<PendingAttachment> {
    let bytes = fs::read(path)?;
    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    Ok(PendingAttachment {
        mime_type: mime_for(path),
        content: base64::engine::general_purpose::STANDARD.encode(bytes),
        file_name,
        description: None,
        is_primary,
    })
}

/// MIME type guessed from the file extension; unknown extensions are
/// `application/octet-stream` and fail evidence validation.
fn mime_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for(Path::new("after.PNG")), "image/png");
        assert_eq!(mime_for(Path::new("before.jpg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("noext")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("invoice.pdf")), "application/pdf");
    }

    #[test]
    fn test_read_photo_encodes_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("after.png");
        fs::write(&path, b"hello").unwrap();

        let photo = read_photo(&path, true).unwrap();
        assert_eq!(photo.file_name, "after.png");
        assert_eq!(photo.content, "aGVsbG8=");
        assert_eq!(photo.decoded_len().unwrap(), 5);
        assert!(photo.is_primary);
    }

    #[test]
    fn test_check_requires_completion_photo() {
        let err = check("in_progress", "resolved", &[], &[], None, true).unwrap_err();
        assert!(matches!(err, Error::EvidenceRequired { .. }));

        let err = check("open", "closed", &[], &[], None, true).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[test]
    fn test_check_rejects_pdf_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.pdf");
        fs::write(&path, b"%PDF-1.7").unwrap();

        let err = check("in_progress", "resolved", &[path], &[], None, true).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref msg) if msg.contains("application/pdf")));
    }
}
