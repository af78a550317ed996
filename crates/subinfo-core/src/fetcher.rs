//! Per-URL fetch, classify and summarize pipeline.

use std::{fmt, sync::Arc};

use crate::{
    content::{self, NodeSummary},
    http::SubscriptionTransport,
    providers::ProviderTable,
    usage::{UsageInfo, USAGE_HEADER},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchErrorKind {
    HttpStatus(u16),
    NoUsageHeader,
    MalformedHeader,
    TransportOrTimeout,
    /// The fetch task itself failed (panic). Not a provider problem.
    Internal,
}

impl FetchErrorKind {
    /// Short label shown to the user.
    pub fn label(&self) -> String {
        match self {
            FetchErrorKind::HttpStatus(code) => format!("HTTP {code}"),
            FetchErrorKind::NoUsageHeader => "No usage header".to_string(),
            FetchErrorKind::MalformedHeader => "Malformed usage header".to_string(),
            FetchErrorKind::TransportOrTimeout => "Connection failed or timed out".to_string(),
            FetchErrorKind::Internal => "Internal error".to_string(),
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FetchResult {
    Success {
        url: String,
        provider_name: String,
        usage: UsageInfo,
        remaining_bytes: u64,
        percent_used: f64,
        node: Option<NodeSummary>,
    },
    Failure {
        url: String,
        error_kind: FetchErrorKind,
        error_detail: String,
    },
}

impl FetchResult {
    pub fn url(&self) -> &str {
        match self {
            FetchResult::Success { url, .. } | FetchResult::Failure { url, .. } => url,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    pub fn failure(url: &str, error_kind: FetchErrorKind, error_detail: impl Into<String>) -> Self {
        FetchResult::Failure {
            url: url.to_string(),
            error_kind,
            error_detail: error_detail.into(),
        }
    }
}

/// Single-attempt fetcher for one subscription URL.
#[derive(Clone)]
pub struct SubscriptionFetcher {
    transport: Arc<dyn SubscriptionTransport>,
    providers: Arc<ProviderTable>,
}

impl SubscriptionFetcher {
    pub fn new(transport: Arc<dyn SubscriptionTransport>, providers: Arc<ProviderTable>) -> Self {
        Self {
            transport,
            providers,
        }
    }

    pub async fn fetch(&self, url: &str) -> FetchResult {
        let resp = match self.transport.fetch_usage(url).await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(%url, error = %e, "subscription request failed");
                return FetchResult::failure(url, FetchErrorKind::TransportOrTimeout, e.to_string());
            }
        };

        if !resp.is_success() {
            tracing::debug!(%url, status = resp.status, "subscription returned error status");
            return FetchResult::failure(
                url,
                FetchErrorKind::HttpStatus(resp.status),
                resp.status.to_string(),
            );
        }

        let Some(raw) = resp.usage_header else {
            return FetchResult::failure(
                url,
                FetchErrorKind::NoUsageHeader,
                format!("missing {USAGE_HEADER} header"),
            );
        };

        let usage = match UsageInfo::parse_header(&raw) {
            Ok(u) => u,
            Err(e) => {
                tracing::debug!(%url, error = %e, "malformed usage header");
                return FetchResult::failure(url, FetchErrorKind::MalformedHeader, e.to_string());
            }
        };

        let provider_name = self.providers.resolve(url).to_string();
        let node = self.node_summary(url).await;

        FetchResult::Success {
            url: url.to_string(),
            provider_name,
            usage,
            remaining_bytes: usage.remaining_bytes(),
            percent_used: usage.percent_used(),
            node,
        }
    }

    async fn node_summary(&self, url: &str) -> Option<NodeSummary> {
        match self.transport.fetch_body(url).await {
            Ok(body) => content::classify(&body).summary(),
            Err(e) => {
                tracing::debug!(%url, error = %e, "node list unavailable");
                None
            }
        }
    }
}
