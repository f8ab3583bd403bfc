// src/ingest/attachments.rs
//! Attachment retrieval — linked files downloaded into a per-record
//! directory.
//!
//! Downloads fan out concurrently; one failed file is logged and excluded
//! without aborting its siblings. The record's directory is created
//! lazily, only once at least one download has succeeded, so empty
//! directories never litter the attachment tree.

use crate::api::NotionGateway;
use crate::constants::FILENAME_MAX_LENGTH;
use crate::model::properties::FileRef;
use crate::types::{Warning, WarningLevel};
use futures::future::join_all;
use std::path::Path;
use url::Url;

/// Outcome of one record's attachment pass.
#[derive(Debug, Default)]
pub struct AttachmentOutcome {
    /// Sanitized filenames that were downloaded and written.
    pub stored: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// Downloads every file reference of one record into
/// `<attachment_root>/<record_name>/`, concurrently.
pub async fn fetch_attachments(
    gateway: &dyn NotionGateway,
    attachment_root: &Path,
    record_name: &str,
    refs: &[FileRef],
) -> AttachmentOutcome {
    let mut outcome = AttachmentOutcome::default();
    if refs.is_empty() {
        return outcome;
    }

    let downloads = join_all(refs.iter().map(|file| async move {
        let name = sanitize_filename(&file.name);
        match download_one(gateway, &file.url).await {
            Ok(bytes) => Ok((name, bytes)),
            Err(message) => Err((name, message)),
        }
    }))
    .await;

    let record_dir = attachment_root.join(record_name);
    let mut dir_ready = false;

    for download in downloads {
        match download {
            Ok((name, bytes)) => {
                if !dir_ready {
                    if let Err(err) = tokio::fs::create_dir_all(&record_dir).await {
                        log::warn!(
                            "Could not create attachment directory {}: {}",
                            record_dir.display(),
                            err
                        );
                        outcome.warnings.push(
                            Warning::new(WarningLevel::Error, "attachment directory unavailable")
                                .with_context(record_dir.display().to_string()),
                        );
                        return outcome;
                    }
                    dir_ready = true;
                }
                match tokio::fs::write(record_dir.join(&name), bytes).await {
                    Ok(()) => outcome.stored.push(name),
                    Err(err) => {
                        log::warn!("Failed to store attachment {}: {}", name, err);
                        outcome.warnings.push(
                            Warning::new(WarningLevel::Warning, "attachment not stored")
                                .with_context(format!("{}: {}", name, err)),
                        );
                    }
                }
            }
            Err((name, message)) => {
                log::warn!("Failed to download {}: {}", name, message);
                outcome.warnings.push(
                    Warning::new(WarningLevel::Warning, "attachment download failed")
                        .with_context(format!("{}: {}", name, message)),
                );
            }
        }
    }

    outcome
}

async fn download_one(gateway: &dyn NotionGateway, url: &str) -> Result<Vec<u8>, String> {
    let parsed = Url::parse(url).map_err(|e| format!("invalid URL {}: {}", url, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("refusing non-HTTP URL {}", url));
    }
    gateway.download(url).await.map_err(|e| e.to_string())
}

/// Sanitizes a declared filename for the local filesystem: characters
/// illegal in filesystem paths become underscores and the length is
/// capped at a filesystem-safe maximum.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();
    sanitized.chars().take(FILENAME_MAX_LENGTH).collect()
}
