// src/ingest/mod.rs
//! The ingestion pipeline — listing, change detection, assembly, persist.
//!
//! One run: load the existing cache, list the remote collection, skip
//! records whose last-modified stamp matches the cached row, assemble the
//! rest (each record drives its sub-fetches concurrently), and merge the
//! staged records into the store. Failures local to one record are
//! absorbed into warnings; a listing failure aborts the run and leaves
//! the previous store untouched.

pub mod assembler;
pub mod attachments;
pub mod extractor;
pub mod resolver;

use crate::api::NotionGateway;
use crate::config::SyncConfig;
use crate::error::AppError;
use crate::model::{RawTask, TaskRecord};
use crate::store::CacheStore;
use crate::types::{Warning, WarningLevel};
use assembler::RecordAssembler;
use chrono::DateTime;
use resolver::RelationResolver;
use std::collections::HashMap;

/// What one ingestion run did.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// Records returned by the listing.
    pub listed: usize,
    /// Records assembled because they were new or changed.
    pub assembled: usize,
    /// Records skipped as unchanged.
    pub skipped: usize,
    /// Records dropped because their assembly failed.
    pub failed: usize,
    /// Rows in the store after the merge.
    pub store_rows: usize,
    /// Every absorbed failure, for the operator.
    pub warnings: Vec<Warning>,
}

/// Runs one full ingestion pass against the configured collection.
pub async fn run_sync(
    gateway: &dyn NotionGateway,
    config: &SyncConfig,
    store: &CacheStore,
) -> Result<SyncOutcome, AppError> {
    let mut outcome = SyncOutcome::default();

    let existing = store.load()?;
    let cached_stamps: HashMap<&str, &str> = existing
        .iter()
        .map(|row| (row.uid.as_str(), row.updated_time.as_str()))
        .collect();
    outcome.store_rows = existing.len();

    log::info!(
        "Fetching tasks from Notion (limit: {})...",
        config
            .limit
            .map(|l| l.to_string())
            .unwrap_or_else(|| "no limit".to_string())
    );

    let raw_tasks = match gateway.query_records(&config.database_id, config.limit).await {
        Ok(tasks) => tasks,
        Err(AppError::CollectionNotFound { database, message }) => {
            log::error!("CRITICAL ERROR: task database not found (404): {}", message);
            log::error!("1. Check that NOTION_DATABASE_ID ({}) is correct.", database);
            log::error!("2. Ensure the integration is added to the database connections.");
            outcome.warnings.push(
                Warning::new(WarningLevel::Error, "task database not found")
                    .with_context(database),
            );
            return Ok(outcome);
        }
        Err(err) => return Err(err),
    };
    outcome.listed = raw_tasks.len();

    match raw_tasks.first() {
        Some(first) => {
            outcome
                .warnings
                .extend(check_schema_health(first, config));
        }
        None => log::warn!("No tasks found in database. Cannot verify schema."),
    }

    let resolver = RelationResolver::new(&config.properties.nid);
    let attachment_dir = config.attachment_dir();
    let assembler =
        RecordAssembler::new(gateway, &resolver, &config.properties, &attachment_dir);

    let mut staged: Vec<TaskRecord> = Vec::new();
    for raw in &raw_tasks {
        if is_unchanged(&cached_stamps, raw, config.updated_tolerance_secs) {
            outcome.skipped += 1;
            continue;
        }
        match assembler.assemble(raw).await {
            Ok((record, warnings)) => {
                outcome.warnings.extend(warnings);
                staged.push(record);
            }
            Err(err) => {
                log::warn!("Skipping record {}: assembly failed: {}", raw.uid, err);
                outcome.failed += 1;
                outcome.warnings.push(
                    Warning::new(WarningLevel::Error, "record assembly failed")
                        .with_context(format!("{}: {}", raw.uid, err)),
                );
            }
        }
    }
    outcome.assembled = staged.len();

    log::info!(
        "Listed {} tasks: {} new/updated, {} unchanged, {} failed ({} relations resolved)",
        outcome.listed,
        outcome.assembled,
        outcome.skipped,
        outcome.failed,
        resolver.resolved_count(),
    );

    outcome.store_rows = store.sync(staged)?;
    Ok(outcome)
}

/// Whether a fresh listing row matches its cached counterpart.
///
/// Default policy is exact equality of the last-modified stamps — the
/// original mirror's behavior, kept for compatibility. A tolerance window
/// can be opted into where backend stamp truncation causes false
/// re-assembly.
fn is_unchanged(
    cached_stamps: &HashMap<&str, &str>,
    raw: &RawTask,
    tolerance_secs: Option<u64>,
) -> bool {
    let Some(cached) = cached_stamps.get(raw.uid.as_str()) else {
        return false;
    };

    if *cached == raw.last_edited_time {
        return true;
    }

    let Some(tolerance) = tolerance_secs else {
        return false;
    };
    match (
        DateTime::parse_from_rfc3339(cached),
        DateTime::parse_from_rfc3339(&raw.last_edited_time),
    ) {
        (Ok(cached), Ok(fresh)) => {
            (fresh - cached).num_seconds().unsigned_abs() <= tolerance
        }
        _ => false,
    }
}

/// Verifies that the configured property names exist in the remote
/// schema, using the first listed record as the witness. Users rename
/// columns; a renamed column silently null-fills its field, so the
/// mismatch is surfaced loudly up front.
fn check_schema_health(first: &RawTask, config: &SyncConfig) -> Vec<Warning> {
    let names = &config.properties;
    let checks: [(&str, &str); 9] = [
        ("NID", &names.nid),
        ("Status", &names.status),
        ("Priority", &names.priority),
        ("Due Date", &names.due),
        ("Started", &names.started),
        ("Completed", &names.completed),
        ("Files", &names.files_media),
        ("Tags", &names.tags),
        ("Parent Tags", &names.parent_tags),
    ];

    let mut warnings = Vec::new();
    for (label, property) in checks {
        if first.properties.contains_key(property) {
            log::info!("[{}] Found property '{}'", label, property);
        } else {
            log::warn!("MISSING: '{}' ({})", property, label);
            warnings.push(
                Warning::new(WarningLevel::Warning, "configured property not found in schema")
                    .with_context(format!("{} ({})", property, label)),
            );
        }
    }

    if !warnings.is_empty() {
        log::warn!(
            "{} configured properties were not found in Notion. Available properties: {}",
            warnings.len(),
            first
                .properties
                .keys()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
        log::warn!("Check your environment overrides if you renamed these columns in Notion.");
    }
    warnings
}
