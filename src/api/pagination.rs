// src/api/pagination.rs
//! Cursor-based pagination over the Notion list endpoints.
//!
//! All three list-shaped endpoints (database query, block children,
//! comments) share the `{results, has_more, next_cursor}` contract, so a
//! single closure-driven loop serves them all.

use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::AppError;

/// One page of a paginated response.
#[derive(Debug, Clone)]
pub struct PaginatedResponse<T> {
    pub results: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Result of draining a paginated endpoint.
#[derive(Debug, Clone)]
pub struct PaginationResult<T> {
    pub items: Vec<T>,
    pub pages_fetched: usize,
}

/// Fetches pages until the continuation flag clears or `limit` items have
/// been accumulated.
///
/// The per-request page size is `min(remaining, 100)`: the final page's
/// request is truncated so the listing never overshoots the limit, and the
/// API's 100-item cap is enforced regardless of how much remains.
pub async fn fetch_all_pages<T, F, Fut>(
    mut fetch_fn: F,
    limit: Option<usize>,
) -> Result<PaginationResult<T>, AppError>
where
    F: FnMut(usize, Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<PaginatedResponse<T>, AppError>>,
{
    let mut items: Vec<T> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages_fetched = 0usize;

    loop {
        let page_size = match limit {
            Some(limit) => (limit - items.len()).min(NOTION_API_PAGE_SIZE),
            None => NOTION_API_PAGE_SIZE,
        };

        let response = fetch_fn(page_size, cursor).await?;
        let has_more = response.has_more;
        cursor = response.next_cursor;
        items.extend(response.results);
        pages_fetched += 1;

        if let Some(limit) = limit {
            if items.len() >= limit {
                // Guard against a server returning more than requested.
                items.truncate(limit);
                break;
            }
        }

        if !has_more || cursor.is_none() {
            break;
        }
    }

    Ok(PaginationResult {
        items,
        pages_fetched,
    })
}
