// src/store/mod.rs
//! The durable cache store — a row-oriented CSV table keyed by UID.
//!
//! This module exclusively owns the read-modify-write cycle: no other
//! component touches the file. Each sync loads the current rows, merges
//! the staged records (deduplicating by UID, keeping the freshest
//! occurrence), and rewrites the file atomically via a temp file and
//! rename — a crashed run can never leave a half-written store behind.

use crate::error::AppError;
use crate::model::{TaskRecord, CACHE_HEADERS};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Handle on the durable table.
pub struct CacheStore {
    csv_path: PathBuf,
    json_mirror: Option<PathBuf>,
}

/// The store's state at the start of a read-modify-write cycle.
struct Snapshot {
    rows: Vec<TaskRecord>,
    modified: Option<SystemTime>,
}

impl CacheStore {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            json_mirror: None,
        }
    }

    /// Also maintain a pretty-printed JSON mirror of the table.
    pub fn with_json_mirror(mut self, path: impl Into<PathBuf>) -> Self {
        self.json_mirror = Some(path.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.csv_path
    }

    /// Loads all rows. An absent file is an empty store; unknown columns
    /// are ignored and missing ones null-filled (lenient coercion).
    pub fn load(&self) -> Result<Vec<TaskRecord>, AppError> {
        Ok(self.snapshot()?.rows)
    }

    fn snapshot(&self) -> Result<Snapshot, AppError> {
        let modified = match fs::metadata(&self.csv_path) {
            Ok(meta) => meta.modified().ok(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Snapshot {
                    rows: Vec::new(),
                    modified: None,
                });
            }
            Err(err) => return Err(err.into()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.csv_path)?;
        let header_index: HashMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(index, name)| (name.to_string(), index))
            .collect();

        let mut rows = Vec::new();
        for row in reader.records() {
            rows.push(TaskRecord::from_row(&header_index, &row?));
        }

        Ok(Snapshot { rows, modified })
    }

    /// Merges staged records into the store and rewrites it atomically.
    ///
    /// Returns the row count after the merge. An empty staged set is a
    /// no-op: the previous file is left byte-identical. If the file
    /// changes on disk between the read and the rename, the full
    /// read-merge-write cycle is retried once before surfacing
    /// `PersistConflict`.
    pub fn sync(&self, staged: Vec<TaskRecord>) -> Result<usize, AppError> {
        if staged.is_empty() {
            log::info!("No new or updated tasks to save.");
            return Ok(self.load()?.len());
        }

        let mut first_attempt = true;
        loop {
            let snapshot = self.snapshot()?;
            let merged = merge_records(snapshot.rows, staged.clone());

            match self.rewrite(&merged, snapshot.modified) {
                Ok(()) => {
                    if let Some(mirror) = &self.json_mirror {
                        write_json_mirror(mirror, &merged)?;
                    }
                    log::info!(
                        "Saved {} new/updated tasks to {} ({} rows total).",
                        staged.len(),
                        self.csv_path.display(),
                        merged.len()
                    );
                    return Ok(merged.len());
                }
                Err(AppError::PersistConflict { .. }) if first_attempt => {
                    log::warn!(
                        "Cache store {} changed during sync; retrying the merge once",
                        self.csv_path.display()
                    );
                    first_attempt = false;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Writes rows to a temp file and renames it over the store, unless
    /// the store was modified since `expected_modified`.
    fn rewrite(
        &self,
        rows: &[TaskRecord],
        expected_modified: Option<SystemTime>,
    ) -> Result<(), AppError> {
        if let Some(parent) = self.csv_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.csv_path.with_extension("csv.tmp");
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        writer.write_record(CACHE_HEADERS)?;
        for row in rows {
            writer.write_record(row.to_row())?;
        }
        writer.flush()?;
        drop(writer);

        let current_modified = match fs::metadata(&self.csv_path) {
            Ok(meta) => meta.modified().ok(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        if current_modified != expected_modified {
            let _ = fs::remove_file(&tmp_path);
            return Err(AppError::PersistConflict {
                path: self.csv_path.display().to_string(),
            });
        }

        fs::rename(&tmp_path, &self.csv_path)?;
        Ok(())
    }
}

/// Concatenates staged records onto the existing rows and deduplicates by
/// UID, keeping the last (freshest) occurrence at its later position —
/// an updated record moves to the end of the table.
pub fn merge_records(existing: Vec<TaskRecord>, staged: Vec<TaskRecord>) -> Vec<TaskRecord> {
    let mut combined = existing;
    combined.extend(staged);

    let mut seen: HashSet<String> = HashSet::with_capacity(combined.len());
    let mut deduped: Vec<TaskRecord> = Vec::with_capacity(combined.len());
    for record in combined.into_iter().rev() {
        if seen.insert(record.uid.clone()) {
            deduped.push(record);
        }
    }
    deduped.reverse();
    deduped
}

/// Writes the merged table as pretty-printed JSON, one object per row.
fn write_json_mirror(path: &Path, rows: &[TaskRecord]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let values: Vec<serde_json::Value> = rows
        .iter()
        .map(|r| {
            json!({
                "UID": r.uid,
                "NID": r.nid,
                "Name": r.name,
                "Body Content": r.body_content,
                "Status": r.status,
                "Started": r.started,
                "Completed": r.completed,
                "Due": r.due,
                "Updated Time": r.updated_time,
                "Priority": r.priority,
                "Files & Media": r.files_and_media,
                "Created": r.created,
                "Parent UID": r.parent_uid,
                "Parent NID": r.parent_nid,
                "Children UIDs": r.children_uids,
                "Children NIDs": r.children_nids,
                "Tags": r.tags,
                "Parent Tags": r.parent_tags,
                "Comments": r.comments,
            })
        })
        .collect();
    fs::write(path, serde_json::to_string_pretty(&values)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(uid: &str, name: &str, updated: &str) -> TaskRecord {
        TaskRecord {
            uid: uid.to_string(),
            name: name.to_string(),
            updated_time: updated.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn merge_keeps_the_last_occurrence_per_uid() {
        let existing = vec![
            record("a", "old a", "t1"),
            record("b", "b", "t1"),
        ];
        let staged = vec![
            record("a", "new a", "t2"),
            record("c", "c", "t2"),
        ];

        let merged = merge_records(existing, staged);
        let names: Vec<&str> = merged.iter().map(|r| r.name.as_str()).collect();
        // "a" was updated, so it moves behind the untouched "b".
        assert_eq!(names, vec!["b", "new a", "c"]);
        assert_eq!(merged.iter().filter(|r| r.uid == "a").count(), 1);
        assert_eq!(merged[1].updated_time, "t2");
    }

    #[test]
    fn load_of_missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("pages.csv"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn sync_round_trips_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("pages.csv"));

        let mut first = record("uid-1", "Write tests", "2025-06-20T10:00:00.000Z");
        first.nid = Some(12);
        first.tags = vec!["infra".to_string()];
        first.body_content = "line one\nline two, with a comma".to_string();

        let rows = store.sync(vec![first.clone()]).unwrap();
        assert_eq!(rows, 1);
        assert_eq!(store.load().unwrap(), vec![first]);
    }

    #[test]
    fn empty_staged_set_leaves_the_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("pages.csv"));
        store
            .sync(vec![record("uid-1", "A", "t1")])
            .unwrap();

        let before = fs::read(store.path()).unwrap();
        let rows = store.sync(Vec::new()).unwrap();
        let after = fs::read(store.path()).unwrap();

        assert_eq!(rows, 1);
        assert_eq!(before, after);
    }

    #[test]
    fn updated_rows_replace_their_predecessor() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("pages.csv"));
        store
            .sync(vec![
                record("uid-1", "A", "t1"),
                record("uid-2", "B", "t1"),
            ])
            .unwrap();

        store
            .sync(vec![record("uid-1", "A v2", "t2")])
            .unwrap();

        let rows = store.load().unwrap();
        assert_eq!(rows.len(), 2);
        let a = rows.iter().find(|r| r.uid == "uid-1").unwrap();
        assert_eq!(a.name, "A v2");
        assert_eq!(a.updated_time, "t2");
    }

    #[test]
    fn json_mirror_tracks_the_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("pages.csv"))
            .with_json_mirror(dir.path().join("pages.json"));
        store
            .sync(vec![record("uid-1", "A", "t1")])
            .unwrap();

        let mirror = fs::read_to_string(dir.path().join("pages.json")).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&mirror).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["UID"], "uid-1");
        assert_eq!(parsed[0]["NID"], serde_json::Value::Null);
    }
}
