// src/api/mod.rs
//! Notion API interaction — the ability to retrieve content from a workspace.
//!
//! This module provides a data-oriented interface to the Notion API,
//! with clear separation between I/O operations, parsing, and business
//! logic. Every outbound call goes through the rate-limited executor.

pub mod client;
pub mod executor;
pub mod pagination;
pub mod parser;

use crate::error::AppError;
use crate::model::{Block, Comment, RawTask};
use crate::types::{BlockId, DatabaseId, PageId};

/// The ability to retrieve task content from a Notion workspace.
///
/// This is the fundamental seam for API interaction: the ingestion
/// pipeline depends on this trait, never on HTTP details, which is also
/// what makes the pipeline testable against in-memory doubles.
#[async_trait::async_trait]
pub trait NotionGateway: Send + Sync {
    /// Lists the task collection, following cursors until exhaustion or
    /// `limit` records.
    async fn query_records(
        &self,
        database: &DatabaseId,
        limit: Option<usize>,
    ) -> Result<Vec<RawTask>, AppError>;

    /// All direct children of a block (paginated internally). Children of
    /// children are not fetched — recursion is the extractor's job.
    async fn retrieve_children(&self, parent: &BlockId) -> Result<Vec<Block>, AppError>;

    /// Point lookup of a single record, used for relation resolution.
    async fn retrieve_record(&self, id: &PageId) -> Result<RawTask, AppError>;

    /// All comments attached to a record (paginated internally).
    async fn list_comments(&self, page: &PageId) -> Result<Vec<Comment>, AppError>;

    /// Downloads an attachment body from its resolved URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>, AppError>;
}

// Re-export the public interface
pub use client::NotionHttpClient;
