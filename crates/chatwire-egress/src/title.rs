//! One-shot title fetching with diagnosable failure modes
//!
//! The transport is injected so every diagnostic branch is testable without
//! network I/O. Failures come back as data (`TitleFetchResult`), never as
//! errors across this boundary: title generation is a best-effort
//! enhancement and the caller substitutes a local fallback title.

use crate::Result;
use async_trait::async_trait;
use chatwire_core::{
    adapter::ProviderAdapter,
    extract::{Extraction, extract_title},
    request::ProviderRequest,
    title::{TitleFailureReason, TitleFetchResult},
};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

/// Longest raw-body excerpt attached to a failure result
const PREVIEW_CHARS: usize = 500;

/// Raw outcome of one request/response round-trip
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Injectable transport seam for the title fetcher.
///
/// Implementations perform exactly one round-trip and report non-2xx
/// statuses as an `Ok` response; only transport-level failures (DNS,
/// connect, abort) are errors.
#[async_trait]
pub trait TitleTransport: Send + Sync {
    async fn execute(&self, request: &ProviderRequest) -> Result<TransportResponse>;
}

/// Production transport backed by a shared reqwest client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TitleTransport for ReqwestTransport {
    async fn execute(&self, request: &ProviderRequest) -> Result<TransportResponse> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.body(request.body.clone()).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}

/// Fetch a title through the adapter's fast path with the generic extractor
/// as the fallback, diagnosing every failure mode.
#[instrument(skip_all, fields(url = %request.url))]
pub async fn fetch_title_with_diagnostics(
    request: &ProviderRequest,
    adapter: &dyn ProviderAdapter,
    transport: &dyn TitleTransport,
) -> TitleFetchResult {
    let response = match transport.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, "title transport failed");
            return TitleFetchResult::failure(TitleFailureReason::NetworkError, None, None);
        }
    };

    if !(200..300).contains(&response.status) {
        return TitleFetchResult::failure(
            TitleFailureReason::HttpNon200,
            Some(response.status),
            preview(&response.body),
        );
    }

    // Tolerate non-JSON bodies: the raw text is still fed to the extraction
    // attempts (some gateways answer title calls with a bare string).
    let body: Value = serde_json::from_str(&response.body)
        .unwrap_or_else(|_| Value::String(response.body.clone()));

    let mut shape_recognized = false;

    match adapter.parse_title_response(&body) {
        Extraction::Found(title) => return TitleFetchResult::success(title, response.status),
        Extraction::MatchedEmpty => shape_recognized = true,
        Extraction::Unmatched => {}
    }

    match extract_title(&body) {
        Extraction::Found(title) => return TitleFetchResult::success(title, response.status),
        Extraction::MatchedEmpty => shape_recognized = true,
        Extraction::Unmatched => {}
    }

    let reason = if shape_recognized {
        TitleFailureReason::EmptyContent
    } else {
        TitleFailureReason::ParseFailed
    };
    TitleFetchResult::failure(reason, Some(response.status), preview(&response.body))
}

fn preview(body: &str) -> Option<String> {
    Some(body.chars().take(PREVIEW_CHARS).collect())
}
