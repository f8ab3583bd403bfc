// src/ingest/resolver.rs
//! Relation resolution — opaque references to domain identifiers.
//!
//! Relations arrive as internal page IDs, but reports and hierarchy links
//! speak the numeric NID. Resolving one costs a point lookup, so results
//! are memoized for the lifetime of a single ingestion run: the resolver
//! is owned by the run context and torn down with it, never shared across
//! runs where it could go stale.

use crate::api::NotionGateway;
use crate::model::properties;
use crate::types::PageId;
use dashmap::DashMap;

/// Run-scoped, concurrency-safe memo of reference → NID lookups.
///
/// The memo is the only mutable state shared between concurrently
/// assembling records. Concurrent lookups of the same reference may both
/// fetch; the first insert wins and later lookups read the memoized value.
pub struct RelationResolver {
    nid_property: String,
    memo: DashMap<PageId, Option<i64>>,
}

impl RelationResolver {
    /// Creates a resolver reading the given NID property name.
    pub fn new(nid_property: impl Into<String>) -> Self {
        Self {
            nid_property: nid_property.into(),
            memo: DashMap::new(),
        }
    }

    /// Resolves a reference to the referenced record's NID.
    ///
    /// Returns None when the referenced record has no NID or the lookup
    /// fails; failures are logged, never fatal — a broken relation costs
    /// one field, not the record.
    pub async fn resolve_nid(&self, gateway: &dyn NotionGateway, id: &PageId) -> Option<i64> {
        if let Some(memoized) = self.memo.get(id) {
            return *memoized;
        }

        match gateway.retrieve_record(id).await {
            Ok(record) => {
                let nid = properties::unique_id_number(&record.properties, &self.nid_property);
                self.memo.entry(id.clone()).or_insert(nid);
                nid
            }
            Err(err) => {
                log::warn!("Failed to resolve relation {}: {}", id, err);
                None
            }
        }
    }

    /// Number of memoized references, for run statistics.
    pub fn resolved_count(&self) -> usize {
        self.memo.len()
    }
}
