// src/lib.rs
//! notion2report library — mirrors a Notion task database into a local
//! CSV cache and composes reports from it.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling** — `AppError`, `ValidationError`
//! - **Configuration** — `SyncConfig`, `PropertyNames`, `CommandLineInput`
//! - **Domain model** — `TaskRecord`, `RawTask`, `Block`, `Comment`
//! - **Domain types** — `PageId`, `BlockId`, `DatabaseId`, `ApiKey`
//! - **API client** — `NotionGateway`, `NotionHttpClient`, parsers
//! - **Ingestion** — `run_sync`, extractor, resolver, attachments
//! - **Store** — `CacheStore`
//! - **Reporting** — digest and period report composition

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod ingest;
pub mod model;
pub mod report;
pub mod store;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, NotionErrorCode};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, PropertyNames, SyncConfig};

// --- Domain Model ---
pub use crate::model::{Block, BlockCommon, Comment, RawTask, TaskRecord};

// --- Domain Types ---
pub use crate::types::{
    Annotations, ApiKey, BlockId, DatabaseId, PageId, RichTextItem, Warning, WarningLevel,
};

// --- API Client ---
pub use crate::api::{NotionGateway, NotionHttpClient};

// --- Ingestion ---
pub use crate::ingest::{run_sync, SyncOutcome};

// --- Store ---
pub use crate::store::CacheStore;

// --- Reporting ---
pub use crate::report::ReportPeriod;
