// src/api/parser.rs
//! Parsing of Notion API responses into the domain model.
//!
//! Success bodies are parsed leniently: a record needs its identifier and
//! system timestamps, everything else degrades to an explicit absence.
//! Block parsing is total — an unrecognized or malformed block becomes an
//! `Unsupported` fallback instead of an error, so one odd block never
//! costs a whole record.
//!
//! Error bodies are mapped onto the typed [`NotionErrorCode`] vocabulary.

use super::client::ApiResponse;
use super::pagination::PaginatedResponse;
use crate::error::{AppError, NotionErrorCode};
use crate::model::blocks::*;
use crate::model::properties::rich_text_runs;
use crate::model::{Block, BlockCommon, Comment, RawTask};
use crate::types::{BlockId, DatabaseId, PageId};
use serde::Deserialize;
use serde_json::Value;

/// Paginated list envelope shared by every list endpoint.
#[derive(Debug, Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

/// Error body returned alongside non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Parses a successful response body as JSON, or maps the error body onto
/// the typed vocabulary.
fn parse_api_value(result: ApiResponse<String>) -> Result<Value, AppError> {
    if result.status.is_success() {
        serde_json::from_str(&result.data).map_err(|e| {
            log::error!("Failed to parse response from {}: {}", result.url, e);
            AppError::MalformedResponse(format!("{} from {}", e, result.url))
        })
    } else {
        Err(service_error(&result))
    }
}

/// Maps a non-success response onto `AppError::NotionService`.
fn service_error(result: &ApiResponse<String>) -> AppError {
    let code = match serde_json::from_str::<ErrorEnvelope>(&result.data) {
        Ok(body) if !body.code.is_empty() => {
            return AppError::NotionService {
                code: NotionErrorCode::from_api_response(&body.code),
                message: body.message,
                status: result.status,
            };
        }
        _ => NotionErrorCode::from_http_status(result.status.as_u16()),
    };
    AppError::NotionService {
        code,
        message: format!("HTTP {} from {}: {}", result.status, result.url, result.data),
        status: result.status,
    }
}

/// Parses one page of the task collection listing.
///
/// A not-found here is distinguished as `CollectionNotFound`: it means the
/// configured database ID is wrong or the integration was never added to
/// the database's connections — misconfiguration, not transient failure.
pub fn parse_tasks_page(
    result: ApiResponse<String>,
    database: &DatabaseId,
) -> Result<PaginatedResponse<RawTask>, AppError> {
    let envelope = match parse_api_value(result) {
        Ok(value) => parse_list_envelope(value)?,
        Err(AppError::NotionService { code, message, .. }) if code.is_not_found() => {
            return Err(AppError::CollectionNotFound {
                database: database.to_hyphenated(),
                message,
            });
        }
        Err(err) => return Err(err),
    };

    let results = envelope
        .results
        .iter()
        .map(task_from_value)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PaginatedResponse {
        results,
        next_cursor: envelope.next_cursor,
        has_more: envelope.has_more,
    })
}

/// Parses one page of a block's children listing.
pub fn parse_blocks_page(
    result: ApiResponse<String>,
) -> Result<PaginatedResponse<Block>, AppError> {
    let envelope = parse_list_envelope(parse_api_value(result)?)?;
    let results = envelope.results.iter().map(block_from_value).collect();

    Ok(PaginatedResponse {
        results,
        next_cursor: envelope.next_cursor,
        has_more: envelope.has_more,
    })
}

/// Parses one page of a comments listing.
pub fn parse_comments_page(
    result: ApiResponse<String>,
) -> Result<PaginatedResponse<Comment>, AppError> {
    let envelope = parse_list_envelope(parse_api_value(result)?)?;
    let results = envelope
        .results
        .iter()
        .map(|comment| Comment {
            rich_text: rich_text_runs(comment.get("rich_text").unwrap_or(&Value::Null)),
        })
        .collect();

    Ok(PaginatedResponse {
        results,
        next_cursor: envelope.next_cursor,
        has_more: envelope.has_more,
    })
}

/// Parses a point-get of a single record.
pub fn parse_record_response(result: ApiResponse<String>) -> Result<RawTask, AppError> {
    let value = parse_api_value(result)?;
    task_from_value(&value)
}

fn parse_list_envelope(value: Value) -> Result<ListEnvelope, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::MalformedResponse(format!("list envelope: {}", e)))
}

/// Builds a raw task from a listing row. The identifier and last-modified
/// stamp are required — without them the record can be neither keyed nor
/// change-detected — everything else is optional.
pub fn task_from_value(value: &Value) -> Result<RawTask, AppError> {
    let uid = value
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::MalformedResponse("record without an id".to_string()))?;
    let id = PageId::parse(uid)?;
    let last_edited_time = value
        .get("last_edited_time")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AppError::MalformedResponse(format!("record {} without last_edited_time", uid))
        })?;
    let created_time = value
        .get("created_time")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let properties = match value.get("properties") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => Default::default(),
    };

    Ok(RawTask {
        id,
        uid: uid.to_string(),
        created_time: created_time.to_string(),
        last_edited_time: last_edited_time.to_string(),
        properties,
    })
}

/// Builds a block from its wire representation. Total: anything this
/// client doesn't recognize (or that is missing its payload) degrades to
/// the `Unsupported` arm carrying the raw type tag.
pub fn block_from_value(value: &Value) -> Block {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| BlockId::parse(s).ok())
        .unwrap_or_else(BlockId::new_v4);
    let common = BlockCommon {
        id,
        has_children: value
            .get("has_children")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        archived: value
            .get("archived")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        children: Vec::new(),
    };

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Block::Unsupported(UnsupportedBlock {
            common,
            block_type: "unknown".to_string(),
        });
    };
    let payload = value.get(kind).cloned().unwrap_or(Value::Null);

    let text_content = || TextBlockContent {
        rich_text: rich_text_runs(payload.get("rich_text").unwrap_or(&Value::Null)),
    };

    match kind {
        "paragraph" => Block::Paragraph(ParagraphBlock {
            common,
            content: text_content(),
        }),
        "heading_1" => Block::Heading1(Heading1Block {
            common,
            content: text_content(),
        }),
        "heading_2" => Block::Heading2(Heading2Block {
            common,
            content: text_content(),
        }),
        "heading_3" => Block::Heading3(Heading3Block {
            common,
            content: text_content(),
        }),
        "bulleted_list_item" => Block::BulletedListItem(BulletedListItemBlock {
            common,
            content: text_content(),
        }),
        "numbered_list_item" => Block::NumberedListItem(NumberedListItemBlock {
            common,
            content: text_content(),
        }),
        "to_do" => {
            let checked = payload
                .get("checked")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Block::ToDo(ToDoBlock {
                content: text_content(),
                common,
                checked,
            })
        }
        "toggle" => Block::Toggle(ToggleBlock {
            common,
            content: text_content(),
        }),
        "quote" => Block::Quote(QuoteBlock {
            common,
            content: text_content(),
        }),
        "callout" => Block::Callout(CalloutBlock {
            common,
            content: text_content(),
        }),
        "equation" => Block::Equation(EquationBlock {
            common,
            expression: payload
                .get("expression")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        "code" => Block::Code(CodeBlock {
            content: text_content(),
            common,
            language: payload
                .get("language")
                .and_then(Value::as_str)
                .unwrap_or("plain")
                .to_string(),
        }),
        "table" => Block::Table(TableBlock { common }),
        "table_row" => {
            let cells = payload
                .get("cells")
                .and_then(Value::as_array)
                .map(|cells| cells.iter().map(rich_text_runs).collect())
                .unwrap_or_default();
            Block::TableRow(TableRowBlock { common, cells })
        }
        "image" | "video" | "file" | "pdf" | "audio" => {
            let media = MediaBlock {
                common,
                source: file_object_from(&payload),
            };
            match kind {
                "image" => Block::Image(media),
                "video" => Block::Video(media),
                "file" => Block::File(media),
                "pdf" => Block::Pdf(media),
                _ => Block::Audio(media),
            }
        }
        "bookmark" | "embed" | "link_preview" => {
            let link = LinkBlock {
                common,
                url: payload
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            };
            match kind {
                "bookmark" => Block::Bookmark(link),
                "embed" => Block::Embed(link),
                _ => Block::LinkPreview(link),
            }
        }
        "child_page" => Block::ChildPage(ChildPageBlock {
            common,
            title: payload
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("Untitled")
                .to_string(),
        }),
        "divider" => Block::Divider(DividerBlock { common }),
        "synced_block" => Block::Synced(SyncedBlock { common }),
        other => Block::Unsupported(UnsupportedBlock {
            common,
            block_type: other.to_string(),
        }),
    }
}

/// Resolves the hosting variant of a file payload to its download URL.
fn file_object_from(payload: &Value) -> Option<FileObject> {
    if let Some(url) = payload
        .get("external")
        .and_then(|e| e.get("url"))
        .and_then(Value::as_str)
    {
        return Some(FileObject::External {
            url: url.to_string(),
        });
    }
    if let Some(url) = payload
        .get("file")
        .and_then(|f| f.get("url"))
        .and_then(Value::as_str)
    {
        return Some(FileObject::Hosted {
            url: url.to_string(),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    fn response(status: StatusCode, body: Value) -> ApiResponse<String> {
        ApiResponse {
            data: body.to_string(),
            status,
            url: "https://api.notion.com/v1/test".to_string(),
            retry_after_secs: None,
        }
    }

    fn database() -> DatabaseId {
        DatabaseId::parse("00000000000000000000000000000001").unwrap()
    }

    #[test]
    fn parses_a_listing_page() {
        let body = json!({
            "results": [{
                "id": "550e8400-e29b-41d4-a716-446655440000",
                "created_time": "2025-06-01T00:00:00.000Z",
                "last_edited_time": "2025-06-20T10:00:00.000Z",
                "properties": {"Name": {"title": [{"plain_text": "A"}]}}
            }],
            "has_more": true,
            "next_cursor": "cursor-2"
        });

        let page = parse_tasks_page(response(StatusCode::OK, body), &database()).unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("cursor-2"));
        assert_eq!(page.results[0].uid, "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(
            page.results[0].last_edited_time,
            "2025-06-20T10:00:00.000Z"
        );
    }

    #[test]
    fn missing_collection_is_distinguished() {
        let body = json!({
            "object": "error",
            "status": 404,
            "code": "object_not_found",
            "message": "Could not find database"
        });

        let err =
            parse_tasks_page(response(StatusCode::NOT_FOUND, body), &database()).unwrap_err();
        assert!(matches!(err, AppError::CollectionNotFound { .. }));
    }

    #[test]
    fn other_failures_carry_status_and_body() {
        let body = json!({"code": "validation_error", "message": "bad cursor"});
        let err =
            parse_tasks_page(response(StatusCode::BAD_REQUEST, body), &database()).unwrap_err();
        match err {
            AppError::NotionService { code, status, .. } => {
                assert_eq!(code, NotionErrorCode::ValidationFailed);
                assert_eq!(status, StatusCode::BAD_REQUEST);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn point_get_not_found_stays_a_service_error() {
        let body = json!({"code": "object_not_found", "message": "gone"});
        let err = parse_record_response(response(StatusCode::NOT_FOUND, body)).unwrap_err();
        assert!(matches!(
            err,
            AppError::NotionService {
                code: NotionErrorCode::ObjectNotFound,
                ..
            }
        ));
    }

    #[test]
    fn block_parsing_is_total() {
        let known = json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "type": "to_do",
            "has_children": false,
            "to_do": {"rich_text": [{"plain_text": "buy milk"}], "checked": true}
        });
        let unknown = json!({
            "id": "550e8400-e29b-41d4-a716-446655440001",
            "type": "ai_block",
            "ai_block": {}
        });

        match block_from_value(&known) {
            Block::ToDo(todo) => assert!(todo.checked),
            other => panic!("expected to_do, got {}", other.kind()),
        }
        match block_from_value(&unknown) {
            Block::Unsupported(b) => assert_eq!(b.block_type, "ai_block"),
            other => panic!("expected fallback, got {}", other.kind()),
        }
    }

    #[test]
    fn media_urls_resolve_both_hostings() {
        let external = json!({
            "id": "550e8400-e29b-41d4-a716-446655440002",
            "type": "image",
            "image": {"type": "external", "external": {"url": "https://x/cat.png"}}
        });
        let hosted = json!({
            "id": "550e8400-e29b-41d4-a716-446655440003",
            "type": "video",
            "video": {"type": "file", "file": {"url": "https://h/v.mp4", "expiry_time": "2025-01-01T00:00:00Z"}}
        });

        match block_from_value(&external) {
            Block::Image(m) => assert_eq!(m.source.unwrap().url(), "https://x/cat.png"),
            other => panic!("expected image, got {}", other.kind()),
        }
        match block_from_value(&hosted) {
            Block::Video(m) => assert_eq!(m.source.unwrap().url(), "https://h/v.mp4"),
            other => panic!("expected video, got {}", other.kind()),
        }
    }
}
