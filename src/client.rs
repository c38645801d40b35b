//! `GraphClient` for bearer-authenticated, paginated API calls
//!
//! The client attaches a bearer token (supplied once, at construction) and a
//! fixed `User-Agent` to every request. It does not refresh tokens: obtain a
//! valid one from [`CredentialManager`](crate::auth::CredentialManager)
//! first.
//!
//! # Pagination
//!
//! [`GraphClient::get_all_pages`] follows `@odata.nextLink` until the server
//! stops returning one or the optional record limit is reached. A fixed
//! courtesy delay precedes every follow-up page; none follows the last page.
//! Pages are never split, so a limit is honored at page granularity and the
//! result may hold more records than requested. If a page fails, the records
//! gathered so far come back inside the [`PageError`].
//!
//! # Example
//!
//! ```no_run
//! use graph_device_sdk::{GraphClient, GraphOptions};
//!
//! # async fn example(token: String) -> Result<(), Box<dyn std::error::Error>> {
//! let client = GraphClient::new(token, &GraphOptions::default())?;
//!
//! match client.get_all_pages("/groups?$top=100", Some(500)).await {
//!     Ok(groups) => println!("{} groups", groups.len()),
//!     Err(partial) => {
//!         eprintln!("stopped early: {}", partial.source);
//!         println!("{} groups before the failure", partial.records.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{GraphError, PageError, Phase, Result};
use crate::transport::{HttpRequest, HttpTransport, Method, ReqwestTransport};
use crate::types::{GraphOptions, PageCursor};
use crate::utils::truncate_body;

/// One page of a Graph collection
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    value: Vec<serde_json::Value>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

/// Client for the Microsoft Graph REST API
#[derive(Clone)]
pub struct GraphClient {
    transport: Arc<dyn HttpTransport>,
    access_token: String,
    base_url: String,
    user_agent: String,
    page_delay: Duration,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("page_delay", &self.page_delay)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    /// Create a client using the default transport
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(access_token: impl Into<String>, options: &GraphOptions) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(options.http_timeout)?);
        Ok(Self::with_transport(access_token, options, transport))
    }

    /// Create a client on top of an existing transport
    #[must_use]
    pub fn with_transport(
        access_token: impl Into<String>,
        options: &GraphOptions,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            access_token: access_token.into(),
            base_url: options.api_base_url.trim_end_matches('/').to_string(),
            user_agent: options.user_agent.clone(),
            page_delay: options.page_delay,
        }
    }

    /// Base URL prepended to relative paths
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform a GET request and return the raw body
    ///
    /// # Errors
    ///
    /// See [`GraphClient::request`].
    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.request(Method::GET, path, None).await
    }

    /// Perform a POST request with a JSON payload
    ///
    /// # Errors
    ///
    /// See [`GraphClient::request`].
    pub async fn post(&self, path: &str, payload: Vec<u8>) -> Result<Vec<u8>> {
        self.request(Method::POST, path, Some(payload)).await
    }

    /// GET a path and decode the body as JSON
    ///
    /// # Errors
    ///
    /// See [`GraphClient::request`]; also fails if the body does not decode.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get(path).await?;
        serde_json::from_slice(&body).map_err(|e| {
            GraphError::protocol(Phase::ApiCall, format!("cannot decode {path}: {e}"))
        })
    }

    /// Perform one bearer-authenticated request
    ///
    /// `path` is appended to the base URL unless it is already absolute.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Transport`] if no response arrived and
    /// [`GraphError::Api`] for any status of 400 or above.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let url = self.url_for(path);
        let mut request = self.authorized(method, &url);
        if let Some(body) = body {
            request = request.body(body);
        }

        tracing::debug!(url = %url, "Graph request");
        let response = self
            .transport
            .perform(request)
            .await
            .map_err(|e| GraphError::transport(Phase::ApiCall, e))?;

        if response.status >= 400 {
            return Err(GraphError::api(response.status, truncate_body(&response.body)));
        }
        Ok(response.body)
    }

    /// Fetch every page of a collection
    ///
    /// `max_results` stops the walk once at least that many records have
    /// been collected; `None` walks to the last page.
    ///
    /// # Errors
    ///
    /// Returns a [`PageError`] carrying the records from the pages that
    /// succeeded before the failing one.
    pub async fn get_all_pages(
        &self,
        path: &str,
        max_results: Option<usize>,
    ) -> std::result::Result<Vec<serde_json::Value>, PageError> {
        let mut records = Vec::new();
        let mut cursor = PageCursor::new(self.url_for(path));
        let mut pages: usize = 0;

        while let Some(next) = cursor.take() {
            if max_results.is_some_and(|max| records.len() >= max) {
                break;
            }
            if pages > 0 {
                tokio::time::sleep(self.page_delay).await;
            }

            match self.get_page(&next).await {
                Ok(page) => {
                    pages += 1;
                    records.extend(page.value);
                    cursor = page.next_link.and_then(PageCursor::new);
                }
                Err(source) => {
                    tracing::warn!(pages, records = records.len(), "Pagination stopped: {source}");
                    return Err(PageError { records, source });
                }
            }
        }

        tracing::debug!(pages, records = records.len(), "Pagination complete");
        Ok(records)
    }

    async fn get_page(&self, cursor: &PageCursor) -> Result<Page> {
        let body = self.get(cursor.as_str()).await?;
        serde_json::from_slice(&body).map_err(|e| {
            GraphError::protocol(
                Phase::ApiCall,
                format!("cannot parse page: {e} (body: {})", truncate_body(&body)),
            )
        })
    }

    fn authorized(&self, method: Method, url: &str) -> HttpRequest {
        HttpRequest::new(method, url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/json")
            .header("User-Agent", self.user_agent.as_str())
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}
