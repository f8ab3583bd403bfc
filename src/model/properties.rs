// src/model/properties.rs
//! Typed accessors over a record's untyped property map.
//!
//! Every accessor is total: a missing property, a renamed column, or an
//! unexpected payload shape yields an explicit absence (`None` / empty),
//! never a panic. The remote schema is user-editable, so these functions
//! are the only place allowed to assume anything about its shape.

use crate::types::RichTextItem;
use indexmap::IndexMap;
use serde_json::Value;

/// External file reference as it appears in a `files` property.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRef {
    pub name: String,
    pub url: String,
}

/// Title text: the concatenated plain text of the title runs.
pub fn title_text(props: &IndexMap<String, Value>, name: &str) -> Option<String> {
    let runs = props.get(name)?.get("title")?.as_array()?;
    let text: String = runs
        .iter()
        .filter_map(|r| r.get("plain_text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Name of a select-like property. Accepts both `select` and `status`
/// payloads — Notion migrated status columns to their own type, and user
/// databases contain both.
pub fn select_name(props: &IndexMap<String, Value>, name: &str) -> Option<String> {
    let prop = props.get(name)?;
    let option = prop.get("select").or_else(|| prop.get("status"))?;
    Some(option.get("name")?.as_str()?.to_string())
}

/// Start of a date property, verbatim (may carry a time component).
pub fn date_start(props: &IndexMap<String, Value>, name: &str) -> Option<String> {
    Some(
        props
            .get(name)?
            .get("date")?
            .get("start")?
            .as_str()?
            .to_string(),
    )
}

/// The numeric component of a `unique_id` property.
pub fn unique_id_number(props: &IndexMap<String, Value>, name: &str) -> Option<i64> {
    props
        .get(name)?
        .get("unique_id")?
        .get("number")?
        .as_i64()
}

/// Raw relation references, in response order.
pub fn relation_ids(props: &IndexMap<String, Value>, name: &str) -> Vec<String> {
    let Some(items) = props
        .get(name)
        .and_then(|p| p.get("relation"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| item.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// File references from a `files` property, with the download URL already
/// resolved across external and Notion-hosted variants.
pub fn file_refs(props: &IndexMap<String, Value>, name: &str) -> Vec<FileRef> {
    let Some(files) = props
        .get(name)
        .and_then(|p| p.get("files"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    files
        .iter()
        .filter_map(|file| {
            let name = file.get("name").and_then(Value::as_str)?;
            let url = match file.get("type").and_then(Value::as_str) {
                Some("external") => file.get("external")?.get("url")?.as_str()?,
                Some("file") => file.get("file")?.get("url")?.as_str()?,
                _ => return None,
            };
            Some(FileRef {
                name: name.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Option names of a `multi_select` property, in response order.
pub fn multi_select_names(props: &IndexMap<String, Value>, name: &str) -> Vec<String> {
    let Some(options) = props
        .get(name)
        .and_then(|p| p.get("multi_select"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    option_names(options)
}

/// Tag names from a property that is either a `multi_select` or a rollup
/// aggregating multi-selects from related records (the "parent tags"
/// column is usually the latter).
pub fn rollup_tag_names(props: &IndexMap<String, Value>, name: &str) -> Vec<String> {
    let Some(prop) = props.get(name) else {
        return Vec::new();
    };

    match prop.get("type").and_then(Value::as_str) {
        Some("rollup") => {
            let Some(array) = prop
                .get("rollup")
                .and_then(|r| r.get("array"))
                .and_then(Value::as_array)
            else {
                return Vec::new();
            };
            array
                .iter()
                .filter_map(|item| item.get("multi_select").and_then(Value::as_array))
                .flat_map(|options| option_names(options))
                .collect()
        }
        Some("multi_select") => multi_select_names(props, name),
        _ => Vec::new(),
    }
}

fn option_names(options: &[Value]) -> Vec<String> {
    options
        .iter()
        .filter_map(|o| o.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Parse a run sequence out of a JSON array of rich text items.
pub fn rich_text_runs(value: &Value) -> Vec<RichTextItem> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> IndexMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn title_concatenates_runs() {
        let p = props(json!({
            "Name": {"title": [
                {"plain_text": "Fix "}, {"plain_text": "login"}
            ]}
        }));
        assert_eq!(title_text(&p, "Name").as_deref(), Some("Fix login"));
        assert_eq!(title_text(&p, "Missing"), None);
    }

    #[test]
    fn select_accepts_status_payloads() {
        let p = props(json!({
            "Status": {"type": "status", "status": {"name": "Doing"}},
            "Priority": {"type": "select", "select": {"name": "High (1wk)"}},
            "Empty": {"type": "select", "select": null},
        }));
        assert_eq!(select_name(&p, "Status").as_deref(), Some("Doing"));
        assert_eq!(select_name(&p, "Priority").as_deref(), Some("High (1wk)"));
        assert_eq!(select_name(&p, "Empty"), None);
    }

    #[test]
    fn unique_id_and_dates() {
        let p = props(json!({
            "NID": {"type": "unique_id", "unique_id": {"number": 42, "prefix": "TASK"}},
            "Due": {"type": "date", "date": {"start": "2025-07-01", "end": null}},
        }));
        assert_eq!(unique_id_number(&p, "NID"), Some(42));
        assert_eq!(date_start(&p, "Due").as_deref(), Some("2025-07-01"));
        assert_eq!(date_start(&p, "NID"), None);
    }

    #[test]
    fn relations_and_files() {
        let p = props(json!({
            "Parent item": {"relation": [{"id": "aaa"}]},
            "Files": {"files": [
                {"name": "notes.txt", "type": "external", "external": {"url": "https://x/notes.txt"}},
                {"name": "img.png", "type": "file", "file": {"url": "https://h/img.png", "expiry_time": "2025-01-01T00:00:00Z"}},
                {"name": "broken", "type": "file", "file": {}},
            ]},
        }));
        assert_eq!(relation_ids(&p, "Parent item"), vec!["aaa"]);
        let refs = file_refs(&p, "Files");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].url, "https://x/notes.txt");
        assert_eq!(refs[1].name, "img.png");
    }

    #[test]
    fn rollup_tags_flatten_nested_multi_selects() {
        let p = props(json!({
            "Parent Tags": {"type": "rollup", "rollup": {"array": [
                {"type": "multi_select", "multi_select": [{"name": "infra"}, {"name": "q3"}]},
                {"type": "multi_select", "multi_select": [{"name": "infra"}]},
            ]}},
            "Tags": {"type": "multi_select", "multi_select": [{"name": "bug"}]},
        }));
        assert_eq!(rollup_tag_names(&p, "Parent Tags"), vec!["infra", "q3", "infra"]);
        assert_eq!(rollup_tag_names(&p, "Tags"), vec!["bug"]);
        assert!(rollup_tag_names(&p, "Missing").is_empty());
    }
}
