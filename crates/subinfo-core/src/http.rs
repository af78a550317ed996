//! Outbound HTTP seam.
//!
//! The engine talks to subscription endpoints through [`SubscriptionTransport`];
//! production uses [`PooledTransport`], a single keep-alive `reqwest::Client`
//! shared by every batch in the process.

use std::time::Duration;

use async_trait::async_trait;

use crate::usage::USAGE_HEADER;
use crate::Result;

pub const DEFAULT_USER_AGENT: &str = "Clash-Verge/1.0.0 (Windows NT 10.0; Win64; x64) Meta/1.18.0";
pub const DEFAULT_MAX_BODY_BYTES: u64 = 8 * 1024 * 1024; // 8MB

/// Status and usage header of a subscription GET. The body is not read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageResponse {
    pub status: u16,
    pub usage_header: Option<String>,
}

impl UsageResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("body exceeds {0} bytes")]
    TooLarge(u64),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_decode() || e.is_body() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

#[async_trait]
pub trait SubscriptionTransport: Send + Sync {
    /// GET `url` and report status plus the usage header.
    async fn fetch_usage(&self, url: &str) -> std::result::Result<UsageResponse, TransportError>;

    /// GET `url` and return the body as text. Non-2xx is an error.
    async fn fetch_body(&self, url: &str) -> std::result::Result<String, TransportError>;
}

#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Independent timeout for the node-list body fetch.
    pub body_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    /// Largest response body read into memory.
    pub max_body_bytes: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
            body_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 50,
            pool_idle_timeout: Duration::from_secs(90),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PooledTransport {
    client: reqwest::Client,
    body_timeout: Duration,
    max_body_bytes: u64,
}

impl PooledTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .pool_idle_timeout(settings.pool_idle_timeout)
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            body_timeout: settings.body_timeout,
            max_body_bytes: settings.max_body_bytes,
        })
    }
}

/// Read the rest of `resp` and throw it away, so the connection can go back to
/// the pool. Gives up after `limit` bytes; the connection is then closed.
async fn drain(mut resp: reqwest::Response, limit: u64) -> std::result::Result<(), TransportError> {
    let mut seen = 0u64;
    while let Some(chunk) = resp.chunk().await? {
        seen += chunk.len() as u64;
        if seen > limit {
            break;
        }
    }
    Ok(())
}

async fn read_capped(
    mut resp: reqwest::Response,
    limit: u64,
) -> std::result::Result<Vec<u8>, TransportError> {
    if resp.content_length().is_some_and(|n| n > limit) {
        return Err(TransportError::TooLarge(limit));
    }
    let mut buf = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        if (buf.len() + chunk.len()) as u64 > limit {
            return Err(TransportError::TooLarge(limit));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

#[async_trait]
impl SubscriptionTransport for PooledTransport {
    async fn fetch_usage(&self, url: &str) -> std::result::Result<UsageResponse, TransportError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let usage_header = resp
            .headers()
            .get(USAGE_HEADER)
            .map(|v| {
                v.to_str()
                    .map(str::to_string)
                    .map_err(|e| TransportError::Decode(format!("{USAGE_HEADER}: {e}")))
            })
            .transpose()?;

        if let Err(e) = drain(resp, self.max_body_bytes).await {
            tracing::debug!(%url, error = %e, "usage response body not drained");
        }

        Ok(UsageResponse {
            status,
            usage_header,
        })
    }

    async fn fetch_body(&self, url: &str) -> std::result::Result<String, TransportError> {
        let resp = self
            .client
            .get(url)
            .timeout(self.body_timeout)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status().as_u16()));
        }
        let body = read_capped(resp, self.max_body_bytes).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
