// src/ingest/extractor.rs
//! Recursive content extraction: fetch a block tree, flatten it to text.
//!
//! Fetching and flattening are deliberately separate passes: the fetch is
//! concurrent and failure-prone, the flatten is pure and order-sensitive.
//! Sibling subtrees are fetched in parallel but re-joined in original
//! sibling order before flattening, so document order never depends on
//! network completion order.

use crate::api::NotionGateway;
use crate::error::AppError;
use crate::model::{Block, TableRowBlock, ToDoBlock};
use crate::types::{plain_text, BlockId, RichTextItem};
use futures::future::{try_join_all, BoxFuture, FutureExt};

/// Fetches the full nested block tree beneath a root and flattens it into
/// ordered text fragments.
pub async fn extract_tree(
    gateway: &dyn NotionGateway,
    root: &BlockId,
) -> Result<Vec<String>, AppError> {
    let blocks = fetch_block_tree(gateway, root).await?;
    Ok(flatten_blocks(&blocks))
}

/// Recursively fetches all blocks beneath `root`, depth-first, attaching
/// children to their parents.
///
/// Direct children arrive paginated from the gateway; each child that
/// declares descendants gets its own subtree fetch. The fan-out is joined
/// with `try_join_all`, which yields results in input order — completion
/// order is irrelevant to the final tree shape.
pub fn fetch_block_tree<'a>(
    gateway: &'a dyn NotionGateway,
    root: &'a BlockId,
) -> BoxFuture<'a, Result<Vec<Block>, AppError>> {
    async move {
        let mut blocks = gateway.retrieve_children(root).await?;

        let parents: Vec<usize> = blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| block.has_children())
            .map(|(index, _)| index)
            .collect();

        if !parents.is_empty() {
            let subtrees = try_join_all(
                parents
                    .iter()
                    .map(|&index| fetch_block_tree(gateway, blocks[index].id())),
            )
            .await?;

            for (&index, children) in parents.iter().zip(subtrees) {
                blocks[index].set_children(children);
            }
        }

        Ok(blocks)
    }
    .boxed()
}

/// Flattens an already-fetched block sequence into text fragments, in
/// document order. After its own fragment(s), every block appends its
/// children's fragments — nested-content blocks carry both inline text
/// and descendants.
pub fn flatten_blocks(blocks: &[Block]) -> Vec<String> {
    let mut fragments = Vec::new();
    for block in blocks {
        flatten_one(block, &mut fragments);
        fragments.extend(flatten_blocks(block.children()));
    }
    fragments
}

fn flatten_one(block: &Block, fragments: &mut Vec<String>) {
    match block {
        Block::Paragraph(b) => push_styled(&b.content.rich_text, fragments),
        Block::Heading1(b) => push_styled(&b.content.rich_text, fragments),
        Block::Heading2(b) => push_styled(&b.content.rich_text, fragments),
        Block::Heading3(b) => push_styled(&b.content.rich_text, fragments),
        Block::BulletedListItem(b) => push_styled(&b.content.rich_text, fragments),
        Block::NumberedListItem(b) => push_styled(&b.content.rich_text, fragments),
        Block::Toggle(b) => push_styled(&b.content.rich_text, fragments),
        Block::Quote(b) => push_styled(&b.content.rich_text, fragments),
        Block::Callout(b) => push_styled(&b.content.rich_text, fragments),
        Block::ToDo(b) => fragments.push(render_todo(b)),
        Block::Equation(b) => fragments.push(format!("[Equation: {}]", b.expression)),
        Block::Code(b) => fragments.push(format!(
            "[Code: {}]\n{}",
            b.language,
            plain_text(&b.content.rich_text)
        )),
        Block::Table(_) => fragments.push("Table:".to_string()),
        Block::TableRow(b) => fragments.push(render_table_row(b)),
        Block::Image(b) | Block::Video(b) | Block::File(b) | Block::Pdf(b) | Block::Audio(b) => {
            if let Some(source) = &b.source {
                fragments.push(format!("[{}] {}", kind_label(block.kind()), source.url()));
            }
        }
        Block::Bookmark(b) | Block::Embed(b) | Block::LinkPreview(b) => {
            fragments.push(format!("[{}] {}", kind_label(block.kind()), b.url));
        }
        Block::ChildPage(b) => fragments.push(format!("[Child Page] {}", b.title)),
        Block::Divider(_) => fragments.push("---".to_string()),
        // Synced blocks carry no content of their own; the generic child
        // pass flattens what they wrap.
        Block::Synced(_) => {}
        Block::Unsupported(b) => {
            if b.block_type == "unsupported" {
                fragments.push("[Unsupported block]".to_string());
            } else {
                fragments.push(format!("[Unhandled block type: {}]", b.block_type));
            }
        }
    }
}

/// Renders styled runs and appends the fragment unless it comes out empty.
fn push_styled(runs: &[RichTextItem], fragments: &mut Vec<String>) {
    let text: String = runs.iter().map(|run| render_run(run)).collect();
    if !text.trim().is_empty() {
        fragments.push(text);
    }
}

/// Applies markdown-style wrappers to one run. Wrappers compose: a bold
/// linked run nests both.
fn render_run(run: &RichTextItem) -> String {
    let mut text = run.plain_text.clone();
    if run.annotations.bold {
        text = format!("**{}**", text);
    }
    if run.annotations.italic {
        text = format!("*{}*", text);
    }
    if run.annotations.underline {
        text = format!("__{}__", text);
    }
    if run.annotations.strikethrough {
        text = format!("~~{}~~", text);
    }
    if let Some(href) = &run.href {
        text = format!("[{}]({})", text, href);
    }
    text
}

/// To-do fragments always appear whether checked or empty; an empty
/// unchecked checkbox is still content.
fn render_todo(todo: &ToDoBlock) -> String {
    let checkbox = if todo.checked { "[x]" } else { "[ ]" };
    format!("{} {}", checkbox, plain_text(&todo.content.rich_text))
}

fn render_table_row(row: &TableRowBlock) -> String {
    row.cells
        .iter()
        .map(|cell| plain_text(cell))
        .collect::<Vec<_>>()
        .join("; ")
}

/// First-letter capitalization of a wire tag: `image` → `Image`,
/// `link_preview` → `Link_preview`.
fn kind_label(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
