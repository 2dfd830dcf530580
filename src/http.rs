//! HTTP response model and scraping client
//!
//! [`HttpResponse`] is what the parser and assertions consume. [`HttpClient`]
//! is a thin reqwest wrapper that produces it; it never retries.

use crate::error::{AppError, AppResult};
use std::time::Duration;

/// A fully buffered HTTP response
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    status_code: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Case-insensitive header lookup (first value wins)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The declared `Content-Type`, if any
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, replacing invalid UTF-8 sequences
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    async fn from_reqwest(url: &str, response: reqwest::Response) -> AppResult<Self> {
        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(|source| AppError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok(Self {
            status_code,
            headers,
            body: body.to_vec(),
        })
    }
}

/// HTTP client used to talk to exporters
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// `GET url` with no negotiation headers
    pub async fn send_request(&self, url: &str) -> AppResult<HttpResponse> {
        self.send(url, self.client.get(url)).await
    }

    /// `GET url` asking for a specific representation via `Accept`
    pub async fn send_request_with_accept(
        &self,
        url: &str,
        accept: &str,
    ) -> AppResult<HttpResponse> {
        self.send(url, self.client.get(url).header("Accept", accept))
            .await
    }

    async fn send(&self, url: &str, request: reqwest::RequestBuilder) -> AppResult<HttpResponse> {
        let response = request.send().await.map_err(|source| AppError::Http {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!(
            url = %url,
            status = %response.status(),
            "HTTP request completed"
        );

        HttpResponse::from_reqwest(url, response).await
    }
}
