use super::common::BlockCommon;
use crate::types::RichTextItem;

/// Text content shared by every rich-text-bearing block kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextBlockContent {
    pub rich_text: Vec<RichTextItem>,
}

/// Paragraph block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParagraphBlock {
    pub common: BlockCommon,
    pub content: TextBlockContent,
}

/// Heading 1 block
#[derive(Debug, Clone, PartialEq)]
pub struct Heading1Block {
    pub common: BlockCommon,
    pub content: TextBlockContent,
}

/// Heading 2 block
#[derive(Debug, Clone, PartialEq)]
pub struct Heading2Block {
    pub common: BlockCommon,
    pub content: TextBlockContent,
}

/// Heading 3 block
#[derive(Debug, Clone, PartialEq)]
pub struct Heading3Block {
    pub common: BlockCommon,
    pub content: TextBlockContent,
}

/// Bulleted list item block
#[derive(Debug, Clone, PartialEq)]
pub struct BulletedListItemBlock {
    pub common: BlockCommon,
    pub content: TextBlockContent,
}

/// Numbered list item block
#[derive(Debug, Clone, PartialEq)]
pub struct NumberedListItemBlock {
    pub common: BlockCommon,
    pub content: TextBlockContent,
}

/// To-do block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToDoBlock {
    pub common: BlockCommon,
    pub content: TextBlockContent,
    pub checked: bool,
}

/// Toggle block
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleBlock {
    pub common: BlockCommon,
    pub content: TextBlockContent,
}

/// Quote block
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteBlock {
    pub common: BlockCommon,
    pub content: TextBlockContent,
}

/// Callout block
#[derive(Debug, Clone, PartialEq)]
pub struct CalloutBlock {
    pub common: BlockCommon,
    pub content: TextBlockContent,
}

/// Equation block
#[derive(Debug, Clone, PartialEq)]
pub struct EquationBlock {
    pub common: BlockCommon,
    pub expression: String,
}

/// Code block
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    pub common: BlockCommon,
    pub language: String,
    pub content: TextBlockContent,
}

/// Table block — its rows arrive as `table_row` children.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub common: BlockCommon,
}

/// Table row block
#[derive(Debug, Clone, PartialEq)]
pub struct TableRowBlock {
    pub common: BlockCommon,
    pub cells: Vec<Vec<RichTextItem>>,
}

/// Media block. Image, video, file, pdf, and audio payloads share this
/// shape; the enum variant carries the kind.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaBlock {
    pub common: BlockCommon,
    pub source: Option<FileObject>,
}

/// Link-carrying block: bookmark, embed, or link preview.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkBlock {
    pub common: BlockCommon,
    pub url: String,
}

/// Child page block
#[derive(Debug, Clone, PartialEq)]
pub struct ChildPageBlock {
    pub common: BlockCommon,
    pub title: String,
}

/// Divider block
#[derive(Debug, Clone, PartialEq)]
pub struct DividerBlock {
    pub common: BlockCommon,
}

/// Synced block. Carries no content of its own; its children do.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedBlock {
    pub common: BlockCommon,
}

/// Fallback for the wire tag `unsupported` and for any kind this client
/// doesn't recognize yet. Keeping the raw tag lets the flattener name
/// what was skipped instead of dropping it silently.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsupportedBlock {
    pub common: BlockCommon,
    pub block_type: String,
}

/// Where a file lives: externally hosted (caller-provided URL) or hosted
/// by Notion (pre-signed, expiring URL).
#[derive(Debug, Clone, PartialEq)]
pub enum FileObject {
    External { url: String },
    Hosted { url: String },
}

impl FileObject {
    /// The resolved download URL, regardless of hosting.
    pub fn url(&self) -> &str {
        match self {
            FileObject::External { url } => url,
            FileObject::Hosted { url } => url,
        }
    }
}
