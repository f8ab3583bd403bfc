// tests/ingestion.rs
//! End-to-end ingestion runs against an in-memory gateway double.
//!
//! These tests exercise the full pipeline — listing, change detection,
//! concurrent assembly, relation resolution, attachment storage, and the
//! merge into the cache store — without any network.

use async_trait::async_trait;
use notion2report::api::parser::{block_from_value, task_from_value};
use notion2report::api::NotionGateway;
use notion2report::config::SyncConfig;
use notion2report::error::AppError;
use notion2report::ingest::run_sync;
use notion2report::model::{Block, Comment, RawTask};
use notion2report::store::CacheStore;
use notion2report::types::{BlockId, DatabaseId, PageId, RichTextItem};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// In-memory gateway: listing rows, block trees keyed by parent ID,
/// point-lookup records, comments, and downloadable files.
#[derive(Default)]
struct MockGateway {
    tasks: Vec<RawTask>,
    children: HashMap<String, Vec<Value>>,
    /// Delay before serving a parent's children, to scramble completion
    /// order across sibling subtrees.
    delays_ms: HashMap<String, u64>,
    records: HashMap<String, RawTask>,
    comments: HashMap<String, Vec<Comment>>,
    files: HashMap<String, Vec<u8>>,
    collection_missing: bool,
}

#[async_trait]
impl NotionGateway for MockGateway {
    async fn query_records(
        &self,
        database: &DatabaseId,
        limit: Option<usize>,
    ) -> Result<Vec<RawTask>, AppError> {
        if self.collection_missing {
            return Err(AppError::CollectionNotFound {
                database: database.to_hyphenated(),
                message: "Could not find database".to_string(),
            });
        }
        let mut tasks = self.tasks.clone();
        if let Some(limit) = limit {
            tasks.truncate(limit);
        }
        Ok(tasks)
    }

    async fn retrieve_children(&self, parent: &BlockId) -> Result<Vec<Block>, AppError> {
        if let Some(delay) = self.delays_ms.get(parent.as_str()) {
            tokio::time::sleep(Duration::from_millis(*delay)).await;
        }
        Ok(self
            .children
            .get(parent.as_str())
            .map(|values| values.iter().map(block_from_value).collect())
            .unwrap_or_default())
    }

    async fn retrieve_record(&self, id: &PageId) -> Result<RawTask, AppError> {
        self.records.get(id.as_str()).cloned().ok_or_else(|| {
            AppError::MalformedResponse(format!("no record {}", id))
        })
    }

    async fn list_comments(&self, page: &PageId) -> Result<Vec<Comment>, AppError> {
        Ok(self.comments.get(page.as_str()).cloned().unwrap_or_default())
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AppError> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::MalformedResponse(format!("no file at {}", url)))
    }
}

fn page_id(n: u32) -> String {
    format!("00000000-0000-4000-8000-{:012x}", n)
}

fn block_id(n: u32) -> String {
    format!("00000000-0000-4000-9000-{:012x}", n)
}

/// Normalized (non-hyphenated) form, for keying the mock maps.
fn key(id: &str) -> String {
    id.replace('-', "")
}

fn task_json(n: u32, name: &str, stamp: &str, extra_properties: Value) -> Value {
    let mut properties = json!({
        "Name": {"type": "title", "title": [{"plain_text": name}]},
        "NID": {"type": "unique_id", "unique_id": {"number": n, "prefix": "TASK"}},
        "Status": {"type": "status", "status": {"name": "Doing"}},
    });
    if let (Some(base), Some(extra)) =
        (properties.as_object_mut(), extra_properties.as_object())
    {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    json!({
        "id": page_id(n),
        "created_time": "2025-06-01T00:00:00.000Z",
        "last_edited_time": stamp,
        "properties": properties,
    })
}

fn raw_task(value: Value) -> RawTask {
    task_from_value(&value).expect("test task JSON should parse")
}

fn paragraph(id: u32, text: &str, has_children: bool) -> Value {
    json!({
        "id": block_id(id),
        "type": "paragraph",
        "has_children": has_children,
        "paragraph": {"rich_text": [{"plain_text": text}]}
    })
}

fn config_for(dir: &Path) -> SyncConfig {
    SyncConfig {
        data_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

fn store_for(config: &SyncConfig) -> CacheStore {
    CacheStore::new(config.cache_path())
}

#[tokio::test]
async fn full_run_assembles_and_persists_records() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let store = store_for(&config);

    let mut gateway = MockGateway::default();
    gateway.tasks = vec![raw_task(task_json(
        1,
        "Build the mirror",
        "2025-06-20T10:00:00.000Z",
        json!({
            "Due": {"type": "date", "date": {"start": "2025-07-01"}},
            "Tags": {"type": "multi_select", "multi_select": [{"name": "infra"}]},
            "Parent item": {"type": "relation", "relation": [{"id": page_id(2)}]},
            "Files & media": {"type": "files", "files": [
                {"name": "notes?.txt", "type": "external",
                 "external": {"url": "https://files.example/notes.txt"}}
            ]},
        }),
    ))];
    gateway.children.insert(
        key(&page_id(1)),
        vec![
            paragraph(10, "First line", false),
            json!({
                "id": block_id(11),
                "type": "to_do",
                "has_children": false,
                "to_do": {"rich_text": [{"plain_text": "write tests"}], "checked": true}
            }),
        ],
    );
    gateway.records.insert(
        key(&page_id(2)),
        raw_task(task_json(2, "Parent epic", "2025-06-01T00:00:00.000Z", json!({}))),
    );
    gateway.comments.insert(
        key(&page_id(1)),
        vec![Comment {
            rich_text: vec![RichTextItem::plain("looks good")],
        }],
    );
    gateway.files.insert(
        "https://files.example/notes.txt".to_string(),
        b"attachment body".to_vec(),
    );

    let outcome = run_sync(&gateway, &config, &store).await.unwrap();
    assert_eq!(outcome.listed, 1);
    assert_eq!(outcome.assembled, 1);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.store_rows, 1);

    let rows = store.load().unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.uid, page_id(1));
    assert_eq!(row.nid, Some(1));
    assert_eq!(row.name, "Build the mirror");
    assert_eq!(row.body_content, "First line\n[x] write tests");
    assert_eq!(row.status.as_deref(), Some("Doing"));
    assert_eq!(row.due.as_deref(), Some("2025-07-01"));
    assert_eq!(row.parent_uid.as_deref(), Some(page_id(2)).as_deref());
    assert_eq!(row.parent_nid, Some(2));
    assert_eq!(row.tags, vec!["infra"]);
    assert_eq!(row.comments, "looks good");
    assert_eq!(row.files_and_media, vec!["notes_.txt"]);

    let stored = fs::read(config.attachment_dir().join("1").join("notes_.txt")).unwrap();
    assert_eq!(stored, b"attachment body".to_vec());
}

#[tokio::test]
async fn unchanged_reruns_leave_the_store_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let store = store_for(&config);

    let mut gateway = MockGateway::default();
    gateway.tasks = vec![
        raw_task(task_json(1, "Task one", "2025-06-20T10:00:00.000Z", json!({}))),
        raw_task(task_json(2, "Task two", "2025-06-19T08:00:00.000Z", json!({}))),
    ];

    let first = run_sync(&gateway, &config, &store).await.unwrap();
    assert_eq!(first.assembled, 2);
    let bytes_after_first = fs::read(store.path()).unwrap();

    let second = run_sync(&gateway, &config, &store).await.unwrap();
    assert_eq!(second.assembled, 0);
    assert_eq!(second.skipped, 2);
    let bytes_after_second = fs::read(store.path()).unwrap();

    assert_eq!(bytes_after_first, bytes_after_second);
}

#[tokio::test]
async fn changed_records_merge_to_a_single_fresh_row() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let store = store_for(&config);

    let mut gateway = MockGateway::default();
    gateway.tasks = vec![
        raw_task(task_json(1, "Stable", "2025-06-01T00:00:00.000Z", json!({}))),
        raw_task(task_json(2, "Evolving", "2025-06-01T00:00:00.000Z", json!({}))),
    ];
    run_sync(&gateway, &config, &store).await.unwrap();

    gateway.tasks[1] = raw_task(task_json(
        2,
        "Evolving v2",
        "2025-06-21T12:00:00.000Z",
        json!({}),
    ));
    let outcome = run_sync(&gateway, &config, &store).await.unwrap();
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.assembled, 1);

    let rows = store.load().unwrap();
    assert_eq!(rows.len(), 2);
    let evolving: Vec<_> = rows.iter().filter(|r| r.uid == page_id(2)).collect();
    assert_eq!(evolving.len(), 1);
    assert_eq!(evolving[0].name, "Evolving v2");
    assert_eq!(evolving[0].updated_time, "2025-06-21T12:00:00.000Z");
}

#[tokio::test]
async fn unresolvable_parent_leaves_the_field_null() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let store = store_for(&config);

    let mut gateway = MockGateway::default();
    gateway.tasks = vec![raw_task(task_json(
        1,
        "Orphan",
        "2025-06-20T10:00:00.000Z",
        json!({
            "Parent item": {"type": "relation", "relation": [{"id": page_id(999)}]},
            "Sub-item": {"type": "relation", "relation": [{"id": page_id(998)}]},
        }),
    ))];
    // Neither reference exists in the point-lookup map.

    let outcome = run_sync(&gateway, &config, &store).await.unwrap();
    assert_eq!(outcome.assembled, 1);
    assert_eq!(outcome.failed, 0);

    let rows = store.load().unwrap();
    assert_eq!(rows[0].parent_uid.as_deref(), Some(page_id(999)).as_deref());
    assert_eq!(rows[0].parent_nid, None);
    assert_eq!(rows[0].children_nids, vec![None]);
}

#[tokio::test]
async fn sibling_subtrees_flatten_in_document_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let store = store_for(&config);

    let mut gateway = MockGateway::default();
    gateway.tasks = vec![raw_task(task_json(
        1,
        "Ordered",
        "2025-06-20T10:00:00.000Z",
        json!({}),
    ))];
    gateway
        .children
        .insert(key(&page_id(1)), vec![paragraph(10, "A", true)]);
    gateway.children.insert(
        key(&block_id(10)),
        vec![paragraph(11, "B", true), paragraph(12, "C", true)],
    );
    gateway
        .children
        .insert(key(&block_id(11)), vec![paragraph(13, "B.1", false)]);
    gateway
        .children
        .insert(key(&block_id(12)), vec![paragraph(14, "C.1", false)]);
    // The earlier sibling's subtree resolves last.
    gateway.delays_ms.insert(key(&block_id(11)), 80);
    gateway.delays_ms.insert(key(&block_id(12)), 5);

    run_sync(&gateway, &config, &store).await.unwrap();

    let rows = store.load().unwrap();
    assert_eq!(rows[0].body_content, "A\nB\nB.1\nC\nC.1");
}

#[tokio::test]
async fn missing_collection_degrades_to_an_empty_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let store = store_for(&config);

    let gateway = MockGateway {
        collection_missing: true,
        ..Default::default()
    };

    let outcome = run_sync(&gateway, &config, &store).await.unwrap();
    assert_eq!(outcome.listed, 0);
    assert!(!outcome.warnings.is_empty());
    // The run aborted before any write: no store file appears.
    assert!(!config.cache_path().exists());
}

#[tokio::test]
async fn listing_limit_caps_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig {
        data_dir: dir.path().to_path_buf(),
        limit: Some(1),
        ..Default::default()
    };
    let store = store_for(&config);

    let mut gateway = MockGateway::default();
    gateway.tasks = vec![
        raw_task(task_json(1, "Kept", "2025-06-20T10:00:00.000Z", json!({}))),
        raw_task(task_json(2, "Beyond the limit", "2025-06-20T10:00:00.000Z", json!({}))),
    ];

    let outcome = run_sync(&gateway, &config, &store).await.unwrap();
    assert_eq!(outcome.listed, 1);
    assert_eq!(store.load().unwrap().len(), 1);
}
