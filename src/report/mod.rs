// src/report/mod.rs
//! Downstream consumers of the cache store.
//!
//! Everything in this module is a pure reader: it loads the table the
//! ingestion core produced and derives human-facing artifacts from it —
//! a plain-text digest and a Markdown period report. Nothing here
//! touches the network or writes back into the store.

pub mod compose;
pub mod summary;

use crate::model::TaskRecord;
use chrono::{Datelike, NaiveDate};

/// Reporting window presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Yearly,
}

impl ReportPeriod {
    /// Window length in days, counted back from the end date.
    pub fn days(self) -> i64 {
        match self {
            ReportPeriod::Daily => 1,
            ReportPeriod::Weekly => 7,
            ReportPeriod::Biweekly => 14,
            ReportPeriod::Monthly => 30,
            ReportPeriod::Yearly => 365,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            ReportPeriod::Daily => "daily",
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Biweekly => "biweekly",
            ReportPeriod::Monthly => "monthly",
            ReportPeriod::Yearly => "yearly",
        }
    }

    /// Human-facing report title for a window ending at `end`.
    pub fn title(self, end: NaiveDate) -> String {
        match self {
            ReportPeriod::Daily => format!("Daily Status Report - {}", end.format("%Y-%m-%d")),
            ReportPeriod::Weekly => {
                format!("Weekly Status Report - Week {}", end.iso_week().week())
            }
            ReportPeriod::Biweekly => format!(
                "Biweekly Status Report - Weeks {} & {}",
                end.iso_week().week().saturating_sub(1),
                end.iso_week().week()
            ),
            ReportPeriod::Monthly => {
                format!("Monthly Status Report - {}", end.format("%B %Y"))
            }
            ReportPeriod::Yearly => format!("Yearly Status Report - {}", end.year()),
        }
    }
}

/// Statuses the report sections know how to place.
pub(crate) const STANDARD_STATUSES: [&str; 7] = [
    "to do",
    "doing",
    "done",
    "canceled",
    "duplicate",
    "notes",
    "paused",
];

/// Lowercased, trimmed status with an explicit bucket for absence.
pub(crate) fn normalized_status(record: &TaskRecord) -> String {
    record
        .status
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Maps the priority labels onto an orderable score; unknown labels sort
/// after everything the scale knows about.
pub(crate) fn priority_score(record: &TaskRecord) -> u8 {
    match record.priority.as_deref() {
        Some("Critical (48hrs)") => 0,
        Some("High (1wk)") => 1,
        Some("Medium (2wks)") => 2,
        Some("Low (>month)") => 3,
        Some("Note") => 4,
        _ => 5,
    }
}

/// Lenient date-of-day parsing for stored stamps: accepts both bare dates
/// and full RFC 3339 timestamps by reading the leading `yyyy-mm-dd`.
pub(crate) fn parse_day(stamp: &str) -> Option<NaiveDate> {
    let day = stamp.get(0..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// The day a task was completed. Done tasks without an explicit
/// completion date fall back to their last-modified day, which keeps
/// them countable in period windows.
pub(crate) fn completed_day(record: &TaskRecord) -> Option<NaiveDate> {
    if let Some(completed) = record.completed.as_deref().and_then(parse_day) {
        return Some(completed);
    }
    if normalized_status(record) == "done" {
        return parse_day(&record.updated_time);
    }
    None
}

/// Whether a record carries any of the filter tags (directly or through
/// its parent). An empty filter admits everything.
pub(crate) fn matches_filter_tags(record: &TaskRecord, filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    record
        .tags
        .iter()
        .chain(record.parent_tags.iter())
        .any(|tag| filter.contains(tag))
}
