use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{TokenStore, UserProfile, ME_PATH};
use crate::error::{ApiError, Result};
use crate::page::PageOrigin;
use crate::resolver::ApiBase;

/// Per-call request options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::get()
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Extra header; `Content-Type` and `Authorization` are always set by
    /// the client and win over values given here
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Offset for a 1-based page number; pages below 1 count as page 1
pub fn page_offset(page: u32, limit: u32) -> u64 {
    u64::from(page.max(1) - 1) * u64::from(limit)
}

/// HTTP client that attaches the current bearer token to every call
///
/// Cookies are kept and replayed as a fallback credential transport.
pub struct ApiClient {
    /// Shared HTTP client with cookie store
    client: Client,

    /// Resolved API base
    base: ApiBase,

    /// Page origin, used for same-origin requests and `redirect_uri`
    origin: PageOrigin,

    /// Source of the bearer token
    tokens: Arc<TokenStore>,
}

impl ApiClient {
    pub fn new(
        base: ApiBase,
        origin: PageOrigin,
        tokens: Arc<TokenStore>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base,
            origin,
            tokens,
        })
    }

    pub fn base(&self) -> &ApiBase {
        &self.base
    }

    pub fn origin(&self) -> &PageOrigin {
        &self.origin
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Absolute URL for an API path
    pub fn url_for(&self, path: &str) -> Result<Url> {
        self.base.endpoint(path, &self.origin)
    }

    fn headers_for(&self, options: &RequestOptions) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidRequest(format!("header {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidRequest(format!("header {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = self.tokens.get() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidRequest(format!("bearer token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Issue a request and decode the JSON response
    ///
    /// Any non-2xx status fails with [`ApiError::Http`]; an empty 2xx body
    /// decodes as JSON `null`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let mut url = self.url_for(path)?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&options.query);
        }
        let headers = self.headers_for(&options)?;
        let authenticated = headers.contains_key(AUTHORIZATION);

        tracing::debug!(
            method = %options.method,
            url = %url,
            authenticated = authenticated,
            "Sending API request"
        );

        let mut builder = self
            .client
            .request(options.method.clone(), url.clone())
            .headers(headers);
        if let Some(ref body) = options.body {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await.map_err(|e| {
            let err = ApiError::from(e);
            tracing::warn!(url = %url, error = %err, "API request error");
            err
        })?;

        let status = response.status();
        let text = response.text().await.map_err(ApiError::from)?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                url = %url,
                "API request failed with error response"
            );
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        tracing::debug!(status = %status, url = %url, "Received API response");

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| ApiError::Decode(format!("{}: {}", url, e)))
    }

    /// GET one page of a listing, converting the 1-based page into an offset
    pub async fn list_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        limit: u32,
    ) -> Result<T> {
        let options = RequestOptions::get()
            .query("limit", limit)
            .query("offset", page_offset(page, limit));
        self.request(path, options).await
    }

    /// Profile of the current token owner
    pub async fn me(&self) -> Result<UserProfile> {
        self.request(ME_PATH, RequestOptions::get()).await
    }

    pub async fn list_pipelines(&self) -> Result<Value> {
        self.request("/api/v1/pipelines", RequestOptions::get())
            .await
    }

    /// Natural-language SQL query
    pub async fn ai_sql(&self, question: &str) -> Result<Value> {
        self.request("/api/v1/ai-sql", RequestOptions::post(json!({ "q": question })))
            .await
    }

    pub async fn metadata_tables(&self, limit: u32, page: u32) -> Result<Value> {
        self.list_page("/openmetadata/api/v1/tables", page, limit)
            .await
    }
}
