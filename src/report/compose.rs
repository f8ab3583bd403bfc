// src/report/compose.rs
//! Period status report composition.
//!
//! Reads the cached records and the attachment directories, never the
//! network. The report is a Markdown document: a To-Do section filtered
//! to what matters when the list overflows, tasks completed inside the
//! window, work in progress, and optionally everything that fits no
//! standard status — each section grouped under its parent task.

use super::{
    completed_day, matches_filter_tags, normalized_status, parse_day, priority_score,
    STANDARD_STATUSES,
};
use crate::config::SyncConfig;
use crate::constants::{
    ATTACHMENT_EXCERPT_LENGTH, CHARS_PER_RECORD_ESTIMATE, DUE_SOON_WINDOW_DAYS,
    REPORT_TODO_OVERFLOW_LIMIT,
};
use crate::error::AppError;
use crate::model::TaskRecord;
use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Attachment extensions whose content is inlined into the report.
/// Spreadsheet formats are skipped — they ruin the document's formatting.
const READABLE_EXTENSIONS: [&str; 8] = ["txt", "md", "py", "json", "log", "html", "css", "js"];

/// Composes the configured period report and writes it under the reports
/// directory. Returns the written path.
pub fn write_report(
    records: &[TaskRecord],
    config: &SyncConfig,
    today: NaiveDate,
) -> Result<PathBuf, AppError> {
    let period = config.report.ok_or_else(|| {
        AppError::MissingConfiguration("no report period configured".to_string())
    })?;

    let custom_start = config.report_start.as_deref().and_then(parse_day);
    let custom_end = config.report_end.as_deref().and_then(parse_day);
    let end = custom_end.unwrap_or(today);
    let start = custom_start.unwrap_or_else(|| end - Duration::days(period.days()));

    let (title, filename) = match (custom_start, custom_end) {
        (Some(start), Some(end)) => (
            format!(
                "Status Report - {} to {}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
            format!(
                "report_{}_to_{}{}.md",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d"),
                tag_suffix(&config.filter_tags)
            ),
        ),
        _ => (
            period.title(end),
            format!(
                "{}_{}{}.md",
                period.slug(),
                end.format("%Y-%m-%d"),
                tag_suffix(&config.filter_tags)
            ),
        ),
    };

    let markdown = compose(records, config, title, start, end, today);

    let reports_dir = config.reports_dir();
    fs::create_dir_all(&reports_dir)?;
    let path = reports_dir.join(filename);
    fs::write(&path, markdown)?;
    log::info!("Report saved to {}", path.display());
    Ok(path)
}

fn tag_suffix(filter_tags: &[String]) -> String {
    filter_tags
        .first()
        .map(|tag| format!("_{}", tag))
        .unwrap_or_default()
}

fn compose(
    records: &[TaskRecord],
    config: &SyncConfig,
    title: String,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> String {
    let records: Vec<&TaskRecord> = records
        .iter()
        .filter(|r| matches_filter_tags(r, &config.filter_tags))
        .collect();

    let nid_to_name: HashMap<i64, &str> = records
        .iter()
        .filter_map(|r| r.nid.map(|nid| (nid, r.name.as_str())))
        .collect();
    let parent_nids: HashSet<i64> = records
        .iter()
        .filter(|r| !r.children_uids.is_empty())
        .filter_map(|r| r.nid)
        .collect();

    let group_of = |record: &TaskRecord| -> String {
        record
            .parent_nid
            .and_then(|nid| nid_to_name.get(&nid))
            .map(|name| name.to_string())
            .unwrap_or_else(|| "General / No Project".to_string())
    };

    // Container tasks with nothing to show are dropped from the listings:
    // their sub-tasks carry the actual work.
    let cleaned = |record: &&TaskRecord| -> bool {
        let is_parent = record.nid.is_some_and(|nid| parent_nids.contains(&nid));
        let body_visible = config.include_body && !record.body_content.trim().is_empty();
        !(is_parent && !body_visible)
    };

    let mut todo: Vec<&TaskRecord> = records
        .iter()
        .copied()
        .filter(|r| normalized_status(r) == "to do")
        .filter(&cleaned)
        .collect();
    if todo.len() > REPORT_TODO_OVERFLOW_LIMIT {
        // Busy list: keep what is due soon or important, drop the rest.
        let cutoff = end + Duration::days(DUE_SOON_WINDOW_DAYS);
        todo.retain(|r| {
            let due_soon = r
                .due
                .as_deref()
                .and_then(parse_day)
                .is_some_and(|due| due <= cutoff);
            due_soon || priority_score(r) <= 1
        });
    }
    todo.sort_by_key(|r| {
        (
            group_of(r),
            priority_score(r),
            r.due.as_deref().and_then(parse_day).unwrap_or(NaiveDate::MAX),
        )
    });

    let mut completed: Vec<&TaskRecord> = records
        .iter()
        .copied()
        .filter(|r| normalized_status(r) == "done")
        .filter(|r| completed_day(r).is_some_and(|day| day >= start && day <= end))
        .filter(&cleaned)
        .collect();
    completed.sort_by(|a, b| {
        group_of(a)
            .cmp(&group_of(b))
            .then(completed_day(b).cmp(&completed_day(a)))
    });

    let mut in_progress: Vec<&TaskRecord> = records
        .iter()
        .copied()
        .filter(|r| normalized_status(r) == "doing")
        .filter(&cleaned)
        .collect();
    in_progress.sort_by_key(|r| (group_of(r), priority_score(r)));

    let uncategorized: Vec<&TaskRecord> = records
        .iter()
        .copied()
        .filter(|r| !STANDARD_STATUSES.contains(&normalized_status(r).as_str()))
        .collect();

    let mut out = String::with_capacity(records.len() * CHARS_PER_RECORD_ESTIMATE);
    let _ = writeln!(out, "# {}\n", title);
    let _ = writeln!(
        out,
        "Period: {} to {}  ",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );
    let _ = writeln!(out, "Generated on: {}\n", today.format("%Y-%m-%d"));

    write_section(
        &mut out,
        "## 1. To Do",
        &todo,
        &group_of,
        config,
        "No immediate high priority goals with due dates.",
    );
    write_section(
        &mut out,
        "## 2. Completed Tasks",
        &completed,
        &group_of,
        config,
        "No tasks completed in this period.",
    );
    write_section(
        &mut out,
        "## 3. In Progress",
        &in_progress,
        &group_of,
        config,
        "No tasks currently in progress.",
    );

    if config.include_uncategorized && !uncategorized.is_empty() {
        let _ = writeln!(out, "## 4. Uncategorized / Other Tasks\n");
        let _ = writeln!(
            out,
            "These tasks do not match standard status filters (To Do, Doing, Done).\n"
        );
        for (index, record) in uncategorized.iter().enumerate() {
            let _ = writeln!(out, "{}. **{}**", letter(index), record.name);
        }
        out.push('\n');
    }

    out
}

/// Writes one grouped section: a header per parent group, lettered task
/// items beneath it.
fn write_section(
    out: &mut String,
    heading: &str,
    tasks: &[&TaskRecord],
    group_of: &dyn Fn(&TaskRecord) -> String,
    config: &SyncConfig,
    empty_note: &str,
) {
    let _ = writeln!(out, "{}\n", heading);
    if tasks.is_empty() {
        let _ = writeln!(out, "{}\n", empty_note);
        return;
    }

    let mut current_group: Option<String> = None;
    for (index, record) in tasks.iter().enumerate() {
        let group = group_of(record);
        if current_group.as_deref() != Some(group.as_str()) {
            let _ = writeln!(out, "### {}\n", group.to_uppercase());
            current_group = Some(group);
        }

        let _ = writeln!(out, "{}. **{}**", letter(index), record.name);
        if config.include_body {
            write_body(out, record, config);
        }
        if config.include_attachments {
            write_attachment_excerpts(out, record, &config.attachment_dir());
        }
    }
    out.push('\n');
}

/// Lettered list markers: a..z, wrapping for longer sections.
fn letter(index: usize) -> char {
    (b'a' + (index % 26) as u8) as char
}

fn write_body(out: &mut String, record: &TaskRecord, config: &SyncConfig) {
    let body = record.body_content.trim();
    if body.is_empty() {
        return;
    }

    let lines: Vec<&str> = body.lines().collect();
    let truncated = config.body_max_lines > 0 && lines.len() > config.body_max_lines;
    let shown = if truncated {
        &lines[..config.body_max_lines]
    } else {
        &lines[..]
    };

    for line in shown {
        let _ = writeln!(out, "   {}", line);
    }
    if truncated {
        let _ = writeln!(out, "   ... (Truncated)");
    }
}

/// Inlines excerpts of readable attachments stored for this record.
fn write_attachment_excerpts(out: &mut String, record: &TaskRecord, attachment_root: &Path) {
    let record_dir = attachment_root.join(record.reference_name());
    for filename in &record.files_and_media {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !READABLE_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }
        let Ok(content) = fs::read_to_string(record_dir.join(filename)) else {
            continue;
        };
        let mut excerpt: String = content.chars().take(ATTACHMENT_EXCERPT_LENGTH).collect();
        if content.chars().count() > ATTACHMENT_EXCERPT_LENGTH {
            excerpt.push_str("... [Truncated]");
        }
        let _ = writeln!(out, "\n   --- Attachment: {} ---", filename);
        for line in excerpt.lines() {
            let _ = writeln!(out, "   {}", line);
        }
    }
}
