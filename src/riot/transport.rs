//! Outbound HTTP seam. Production uses [`HttpTransport`]; tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::Client;
use url::Url;

use crate::error::ServiceError;

/// Header carrying the Riot credential.
pub const RIOT_TOKEN_HEADER: &str = "X-Riot-Token";

/// An upstream answer, kept byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET to `url` with `api_key` attached. Only network failures are errors;
    /// any HTTP status is a successful [`UpstreamResponse`].
    async fn get(&self, url: Url, api_key: &str) -> Result<UpstreamResponse, ServiceError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: Url, api_key: &str) -> Result<UpstreamResponse, ServiceError> {
        let response = self
            .client
            .get(url)
            .header(RIOT_TOKEN_HEADER, api_key)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?
            .to_vec();

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
