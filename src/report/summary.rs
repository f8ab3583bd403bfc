// src/report/summary.rs
//! Plain-text digest of the cache store.
//!
//! The textual counterpart of the original analysis step: distribution
//! tables and lists derived from the cached records, written to one
//! stable file so diffs between runs show what moved.

use super::{completed_day, normalized_status, parse_day};
use crate::error::AppError;
use crate::model::TaskRecord;
use chrono::NaiveDate;
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Statuses that mean a task no longer needs attention.
const CLOSED_STATUSES: [&str; 3] = ["done", "canceled", "duplicate"];

/// Writes the digest next to the store and returns nothing on success.
pub fn write_digest(
    records: &[TaskRecord],
    path: &Path,
    today: NaiveDate,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, summarize(records, today))?;
    log::info!("Analysis digest saved to {}", path.display());
    Ok(())
}

/// Renders the digest for the given records.
pub fn summarize(records: &[TaskRecord], today: NaiveDate) -> String {
    let mut out = String::new();

    section(&mut out, "TASK OVERVIEW");
    let _ = writeln!(out, "Total tasks: {}", records.len());
    let with_body = records
        .iter()
        .filter(|r| !r.body_content.trim().is_empty())
        .count();
    let _ = writeln!(out, "Tasks with body content: {}", with_body);
    let with_files = records
        .iter()
        .filter(|r| !r.files_and_media.is_empty())
        .count();
    let _ = writeln!(out, "Tasks with attachments: {}", with_files);

    section(&mut out, "TASKS BY STATUS");
    write_distribution(&mut out, count_by(records, |r| Some(normalized_status(r))));

    section(&mut out, "TASKS BY PRIORITY");
    write_distribution(
        &mut out,
        count_by(records, |r| {
            Some(r.priority.clone().unwrap_or_else(|| "none".to_string()))
        }),
    );

    section(&mut out, "OVERDUE TASKS");
    let mut overdue: Vec<&TaskRecord> = records
        .iter()
        .filter(|r| !CLOSED_STATUSES.contains(&normalized_status(r).as_str()))
        .filter(|r| {
            r.due
                .as_deref()
                .and_then(parse_day)
                .is_some_and(|due| due < today)
        })
        .collect();
    overdue.sort_by_key(|r| r.due.clone());
    if overdue.is_empty() {
        out.push_str("None.\n");
    } else {
        for record in &overdue {
            let _ = writeln!(
                out,
                "- [{}] {} (due {})",
                record.reference_name(),
                record.name,
                record.due.as_deref().unwrap_or("?")
            );
        }
    }

    section(&mut out, "COMPLETION TIMES");
    let durations: Vec<i64> = records
        .iter()
        .filter_map(|r| {
            let created = r.created.as_deref().and_then(parse_day)?;
            let completed = completed_day(r)?;
            Some((completed - created).num_days())
        })
        .filter(|days| *days >= 0)
        .collect();
    if durations.is_empty() {
        out.push_str("No completed tasks with creation dates.\n");
    } else {
        let total: i64 = durations.iter().sum();
        let _ = writeln!(out, "Completed tasks measured: {}", durations.len());
        let _ = writeln!(
            out,
            "Days from creation to completion: avg {:.1}, min {}, max {}",
            total as f64 / durations.len() as f64,
            durations.iter().min().unwrap_or(&0),
            durations.iter().max().unwrap_or(&0)
        );
    }

    section(&mut out, "TASK RELATIONSHIPS");
    let parents = records
        .iter()
        .filter(|r| !r.children_uids.is_empty())
        .count();
    let subtasks = records.iter().filter(|r| r.parent_uid.is_some()).count();
    let _ = writeln!(out, "Container tasks (with sub-items): {}", parents);
    let _ = writeln!(out, "Sub-tasks (with a parent): {}", subtasks);
    let _ = writeln!(
        out,
        "Standalone tasks: {}",
        records.len().saturating_sub(parents + subtasks)
    );

    section(&mut out, "TAGS");
    let tag_counts = count_by_many(records, |r| r.tags.iter().cloned().collect());
    if tag_counts.is_empty() {
        out.push_str("No tags in use.\n");
    } else {
        write_distribution(&mut out, tag_counts);
    }

    out
}

fn section(out: &mut String, title: &str) {
    let rule = "-".repeat(40);
    let _ = writeln!(out, "\n{}\n{}\n{}", rule, title, rule);
}

fn count_by<F>(records: &[TaskRecord], key: F) -> IndexMap<String, usize>
where
    F: Fn(&TaskRecord) -> Option<String>,
{
    count_by_many(records, |r| key(r).into_iter().collect())
}

fn count_by_many<F>(records: &[TaskRecord], keys: F) -> IndexMap<String, usize>
where
    F: Fn(&TaskRecord) -> Vec<String>,
{
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for record in records {
        for key in keys(record) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts.sort_by(|_, a, _, b| b.cmp(a));
    counts
}

fn write_distribution(out: &mut String, counts: IndexMap<String, usize>) {
    for (key, count) in counts {
        let _ = writeln!(out, "{:<24} {}", key, count);
    }
}
