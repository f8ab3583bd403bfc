// src/api/client.rs
//! HTTP client for the Notion API.
//!
//! A thin wrapper around reqwest that handles authentication headers and
//! request/response plumbing. Parsing and business logic live elsewhere;
//! retry policy lives in [`super::executor`].

use super::executor::execute_with_retry;
use super::pagination::fetch_all_pages;
use super::parser;
use crate::error::AppError;
use crate::model::{Block, Comment, RawTask};
use crate::types::{ApiKey, BlockId, DatabaseId, PageId};
use reqwest::{header, Client, Response};
use serde::Serialize;

const NOTION_VERSION: &str = "2022-06-28";
const API_BASE_URL: &str = "https://api.notion.com/v1";

/// HTTP client carrying Notion authentication.
///
/// Holds two reqwest clients: an authenticated one for API endpoints and a
/// bare one for attachment downloads — hosted attachment URLs are
/// pre-signed and reject requests that carry an extra Authorization header.
#[derive(Clone)]
pub struct NotionHttpClient {
    client: Client,
    download_client: Client,
    base_url: String,
}

impl NotionHttpClient {
    /// Creates a new HTTP client with Notion API authentication.
    pub fn new(api_key: &ApiKey) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(api_key)?)
            .build()?;
        let download_client = Client::builder().build()?;
        Ok(Self {
            client,
            download_client,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Points the client at a different API root. Tests use this to talk
    /// to a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Creates the default headers for Notion API requests.
    fn create_headers(api_key: &ApiKey) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", api_key.as_str());
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth_header).map_err(|e| {
                AppError::MissingConfiguration(format!("Invalid API token format: {}", e))
            })?,
        );

        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_VERSION),
        );

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// Makes a GET request to the specified endpoint path.
    async fn get(&self, endpoint: &str) -> Result<Response, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("GET {}", url);
        Ok(self.client.get(url).send().await?)
    }

    /// Makes a POST request with JSON body to the specified endpoint path.
    async fn post<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<Response, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("POST {}", url);
        Ok(self.client.post(url).json(body).send().await?)
    }

    /// GET through the executor, returning the extracted body.
    async fn get_with_retry(&self, endpoint: &str) -> Result<ApiResponse<String>, AppError> {
        execute_with_retry(|| async move {
            let response = self.get(endpoint).await?;
            extract_response_text(response).await
        })
        .await
    }

    /// POST through the executor, returning the extracted body.
    async fn post_with_retry<T: Serialize>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<ApiResponse<String>, AppError> {
        execute_with_retry(|| async move {
            let response = self.post(endpoint, body).await?;
            extract_response_text(response).await
        })
        .await
    }
}

#[async_trait::async_trait]
impl super::NotionGateway for NotionHttpClient {
    async fn query_records(
        &self,
        database: &DatabaseId,
        limit: Option<usize>,
    ) -> Result<Vec<RawTask>, AppError> {
        let endpoint = format!("databases/{}/query", database.to_hyphenated());
        let result = fetch_all_pages(
            |page_size, cursor| {
                let endpoint = endpoint.clone();
                async move {
                    let mut query = serde_json::json!({ "page_size": page_size });
                    if let Some(cursor) = cursor {
                        query["start_cursor"] = serde_json::json!(cursor);
                    }
                    let response = self.post_with_retry(&endpoint, &query).await?;
                    parser::parse_tasks_page(response, database)
                }
            },
            limit,
        )
        .await?;
        Ok(result.items)
    }

    async fn retrieve_children(&self, parent: &BlockId) -> Result<Vec<Block>, AppError> {
        let base = format!("blocks/{}/children", parent.to_hyphenated());
        let result = fetch_all_pages(
            |page_size, cursor| {
                let base = base.clone();
                async move {
                    let endpoint = match cursor {
                        Some(cursor) => {
                            format!("{}?page_size={}&start_cursor={}", base, page_size, cursor)
                        }
                        None => format!("{}?page_size={}", base, page_size),
                    };
                    let response = self.get_with_retry(&endpoint).await?;
                    parser::parse_blocks_page(response)
                }
            },
            None,
        )
        .await?;
        Ok(result.items)
    }

    async fn retrieve_record(&self, id: &PageId) -> Result<RawTask, AppError> {
        let endpoint = format!("pages/{}", id.to_hyphenated());
        let response = self.get_with_retry(&endpoint).await?;
        parser::parse_record_response(response)
    }

    async fn list_comments(&self, page: &PageId) -> Result<Vec<Comment>, AppError> {
        let base = format!("comments?block_id={}", page.to_hyphenated());
        let result = fetch_all_pages(
            |page_size, cursor| {
                let base = base.clone();
                async move {
                    let endpoint = match cursor {
                        Some(cursor) => {
                            format!("{}&page_size={}&start_cursor={}", base, page_size, cursor)
                        }
                        None => format!("{}&page_size={}", base, page_size),
                    };
                    let response = self.get_with_retry(&endpoint).await?;
                    parser::parse_comments_page(response)
                }
            },
            None,
        )
        .await?;
        Ok(result.items)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AppError> {
        log::debug!("GET {}", url);
        let response = self.download_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::NotionService {
                code: crate::error::NotionErrorCode::from_http_status(status.as_u16()),
                message: format!("download failed for {}", url),
                status,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
    /// Server-suggested wait, seconds, from a throttling response.
    pub retry_after_secs: Option<u64>,
}

/// Extracts the response body as text with metadata.
///
/// The `Retry-After` header is captured before the body is consumed so
/// the executor can honor throttling responses.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let retry_after_secs = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
        retry_after_secs,
    })
}
