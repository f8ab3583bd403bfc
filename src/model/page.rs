// src/model/page.rs
//! Raw listing rows as returned by the query endpoint.
//!
//! A `RawTask` is a page before assembly: system timestamps plus the
//! untyped property map. Property values stay as JSON until the typed
//! accessors in [`super::properties`] pull out what the assembler needs —
//! the remote schema is user-editable, so eager typing would turn every
//! renamed column into a parse failure.

use crate::types::{PageId, RichTextItem};
use indexmap::IndexMap;
use serde_json::Value;

/// One row of the remote task collection, as listed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTask {
    /// Normalized ID for API calls.
    pub id: PageId,
    /// The ID exactly as the remote side printed it — the merge key.
    pub uid: String,
    /// System creation stamp, kept verbatim.
    pub created_time: String,
    /// System last-modified stamp, kept verbatim. Authoritative for
    /// change detection; user-editable date properties are not.
    pub last_edited_time: String,
    /// The record's property map, keyed by column name.
    pub properties: IndexMap<String, Value>,
}

/// One comment attached to a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub rich_text: Vec<RichTextItem>,
}
