//! Provider Adapters: one implementation of `ProviderAdapter` per dialect.

mod anthropic;
mod gemini;
mod openai;
pub mod stall;
mod traits;
pub mod types;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;
pub use traits::ProviderAdapter;
pub use types::{synthesize_streaming_body, AdapterTimeouts, Classification, ProviderResponse};

use crate::error::{ErrorContext, Result};
use crate::provider::types::UpstreamByteStream;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;

/// Builds the shared `reqwest::Client` used by every adapter and health
/// probe. `connect_timeout` is fixed for the process's lifetime here since
/// `reqwest` only exposes it on `ClientBuilder`, not per-request.
#[must_use]
pub fn build_http_client(connect_timeout: std::time::Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .expect("failed to build the shared HTTP client")
}

/// Maps a `GroupConfig.provider_type` string to the dialect it implements.
#[must_use]
pub fn dialect_from_provider_type(provider_type: &str) -> Option<crate::error::Dialect> {
    match provider_type {
        "openai" => Some(crate::error::Dialect::OpenAi),
        "anthropic" => Some(crate::error::Dialect::Anthropic),
        "gemini" => Some(crate::error::Dialect::Gemini),
        _ => None,
    }
}

/// Shared unary/streaming send used by all three adapters: identical
/// timeout handling and streaming-vs-buffered response shape, differing
/// only in method/URL/headers/body supplied by the caller.
pub(super) async fn send_request(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    headers: HeaderMap,
    body: Option<&Value>,
    streaming: bool,
    timeouts: types::AdapterTimeouts,
) -> Result<ProviderResponse> {
    let mut builder = client
        .request(method, url)
        .headers(headers)
        .timeout(timeouts.response);
    if let Some(body) = body {
        builder = builder.json(body);
    }

    let response = builder
        .send()
        .await
        .with_network_context(|| format!("sending request to {url}"))?;
    let status = response.status().as_u16();
    let resp_headers = response.headers().clone();

    if streaming && (200..300).contains(&status) {
        let stream: UpstreamByteStream = response.bytes_stream().boxed();
        return Ok(ProviderResponse {
            status,
            headers: resp_headers,
            body: None,
            stream: Some(stream),
        });
    }

    let body = response
        .bytes()
        .await
        .with_network_context(|| format!("reading response body from {url}"))?;
    Ok(ProviderResponse {
        status,
        headers: resp_headers,
        body: Some(body),
        stream: None,
    })
}
