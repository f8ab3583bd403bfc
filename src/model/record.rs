// src/model/record.rs
//! The assembled task record — one row of the cache store.
//!
//! Scalar fields are kept as the remote side printed them (timestamps
//! included): change detection compares the stored `Updated Time` against
//! the fresh stamp by equality, so any re-formatting here would defeat
//! the skip. List-valued fields are encoded as JSON arrays inside their
//! CSV cell.

use csv::StringRecord;
use std::collections::HashMap;

/// Column headers of the cache store, in write order.
pub const CACHE_HEADERS: [&str; 19] = [
    "UID",
    "NID",
    "Name",
    "Body Content",
    "Status",
    "Started",
    "Completed",
    "Due",
    "Updated Time",
    "Priority",
    "Files & Media",
    "Created",
    "Parent UID",
    "Parent NID",
    "Children UIDs",
    "Children NIDs",
    "Tags",
    "Parent Tags",
    "Comments",
];

/// One normalized task record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskRecord {
    /// Opaque external identifier; stable, globally unique; the merge key.
    pub uid: String,
    /// Domain-facing numeric identifier; optional on the remote side.
    pub nid: Option<i64>,
    pub name: String,
    /// Flattened text of every content block beneath the record.
    pub body_content: String,
    pub status: Option<String>,
    pub started: Option<String>,
    pub completed: Option<String>,
    pub due: Option<String>,
    /// System last-modified stamp — authoritative for change detection.
    pub updated_time: String,
    pub priority: Option<String>,
    /// Sanitized local filenames of successfully stored attachments.
    pub files_and_media: Vec<String>,
    pub created: Option<String>,
    pub parent_uid: Option<String>,
    pub parent_nid: Option<i64>,
    pub children_uids: Vec<String>,
    /// Resolved NIDs aligned with `children_uids`; unresolved stay None.
    pub children_nids: Vec<Option<i64>>,
    pub tags: Vec<String>,
    pub parent_tags: Vec<String>,
    pub comments: String,
}

impl TaskRecord {
    /// The name used for this record's attachment directory and for
    /// human-facing references: the NID when present, the UID otherwise.
    pub fn reference_name(&self) -> String {
        match self.nid {
            Some(nid) => nid.to_string(),
            None => self.uid.clone(),
        }
    }

    /// Encode as a CSV row in `CACHE_HEADERS` order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.uid.clone(),
            opt_i64(self.nid),
            self.name.clone(),
            self.body_content.clone(),
            opt_str(&self.status),
            opt_str(&self.started),
            opt_str(&self.completed),
            opt_str(&self.due),
            self.updated_time.clone(),
            opt_str(&self.priority),
            encode_strings(&self.files_and_media),
            opt_str(&self.created),
            opt_str(&self.parent_uid),
            opt_i64(self.parent_nid),
            encode_strings(&self.children_uids),
            encode_nids(&self.children_nids),
            encode_strings(&self.tags),
            encode_strings(&self.parent_tags),
            self.comments.clone(),
        ]
    }

    /// Decode from a CSV row with lenient coercion: columns missing from
    /// the header are synthesized as null/empty, malformed cells degrade
    /// to their default. Old stores stay readable after column additions.
    pub fn from_row(header_index: &HashMap<String, usize>, row: &StringRecord) -> Self {
        let cell = |name: &str| -> &str {
            header_index
                .get(name)
                .and_then(|&i| row.get(i))
                .unwrap_or("")
        };
        let optional = |name: &str| -> Option<String> {
            let value = cell(name);
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        };

        Self {
            uid: cell("UID").to_string(),
            nid: cell("NID").parse().ok(),
            name: cell("Name").to_string(),
            body_content: cell("Body Content").to_string(),
            status: optional("Status"),
            started: optional("Started"),
            completed: optional("Completed"),
            due: optional("Due"),
            updated_time: cell("Updated Time").to_string(),
            priority: optional("Priority"),
            files_and_media: decode_strings(cell("Files & Media")),
            created: optional("Created"),
            parent_uid: optional("Parent UID"),
            parent_nid: cell("Parent NID").parse().ok(),
            children_uids: decode_strings(cell("Children UIDs")),
            children_nids: decode_nids(cell("Children NIDs")),
            tags: decode_strings(cell("Tags")),
            parent_tags: decode_strings(cell("Parent Tags")),
            comments: cell("Comments").to_string(),
        }
    }
}

fn opt_str(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_i64(value: Option<i64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_default()
}

fn encode_strings(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn decode_strings(cell: &str) -> Vec<String> {
    if cell.is_empty() {
        return Vec::new();
    }
    serde_json::from_str(cell).unwrap_or_default()
}

fn encode_nids(values: &[Option<i64>]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn decode_nids(cell: &str) -> Vec<Option<i64>> {
    if cell.is_empty() {
        return Vec::new();
    }
    serde_json::from_str(cell).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn header_index() -> HashMap<String, usize> {
        CACHE_HEADERS
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_string(), i))
            .collect()
    }

    fn sample() -> TaskRecord {
        TaskRecord {
            uid: "216cd412-8533-8087-a989-cf37889137c3".to_string(),
            nid: Some(7),
            name: "Ship ingestion".to_string(),
            body_content: "line one\nline two".to_string(),
            status: Some("Doing".to_string()),
            updated_time: "2025-06-20T10:00:00.000Z".to_string(),
            files_and_media: vec!["notes.txt".to_string()],
            children_uids: vec!["child-a".to_string()],
            children_nids: vec![None],
            tags: vec!["infra".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn row_round_trip() {
        let record = sample();
        let row = StringRecord::from(record.to_row());
        let decoded = TaskRecord::from_row(&header_index(), &row);
        assert_eq!(decoded, record);
    }

    #[test]
    fn missing_columns_decode_as_absent() {
        // A store written before the Comments/Parent Tags columns existed.
        let headers: HashMap<String, usize> =
            [("UID", 0), ("Name", 1), ("Updated Time", 2)]
                .into_iter()
                .map(|(h, i)| (h.to_string(), i))
                .collect();
        let row = StringRecord::from(vec!["uid-1", "Old task", "2024-01-01T00:00:00Z"]);
        let record = TaskRecord::from_row(&headers, &row);

        assert_eq!(record.uid, "uid-1");
        assert_eq!(record.name, "Old task");
        assert_eq!(record.status, None);
        assert!(record.tags.is_empty());
        assert!(record.children_nids.is_empty());
    }

    #[test]
    fn reference_name_falls_back_to_uid() {
        let mut record = sample();
        assert_eq!(record.reference_name(), "7");
        record.nid = None;
        assert_eq!(record.reference_name(), record.uid);
    }

    #[test]
    fn malformed_list_cells_degrade_to_empty() {
        let mut row: Vec<String> = sample().to_row();
        let tags_at = CACHE_HEADERS.iter().position(|h| *h == "Tags").unwrap();
        row[tags_at] = "not json".to_string();
        let record = TaskRecord::from_row(&header_index(), &StringRecord::from(row));
        assert!(record.tags.is_empty());
    }
}
