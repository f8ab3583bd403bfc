// src/types/rich_text.rs
//! Rich text wire model.
//!
//! Mirrors the shape the API returns for text runs: a plain-text
//! projection plus styling annotations and an optional link. The
//! `plain_text` field is the canonical fallback rendering for every run
//! variant (text, mention, equation), so the flattener never needs to
//! dispatch on run type.

use serde::{Deserialize, Serialize};

/// One styled run of text inside a block, cell, or comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextItem {
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl RichTextItem {
    /// Create a plain, unstyled text run — the most common variant.
    ///
    /// This is the vocabulary for constructing rich text in tests and
    /// builders. Instead of a struct literal with defaults, just:
    /// ```ignore
    /// RichTextItem::plain("hello")
    /// ```
    pub fn plain(text: &str) -> Self {
        Self {
            plain_text: text.to_string(),
            href: None,
            annotations: Annotations::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

/// Concatenates the plain text of a run sequence, ignoring styling.
pub fn plain_text(runs: &[RichTextItem]) -> String {
    runs.iter().map(|r| r.plain_text.as_str()).collect()
}
