//! Gemini dialect: `x-goog-api-key` auth, model substituted into the URL
//! path rather than the JSON body, distinct streaming endpoint.

use super::openai::insert_configured_headers;
use super::stall::{spawn_stall_monitor, CancelOnDrop, StallConfig, StallWatcher};
use super::traits::ProviderAdapter;
use super::types::{apply_overrides, classify_status, AdapterTimeouts, Classification, ProviderResponse};
use super::send_request;
use crate::error::Result;
use async_trait::async_trait;
use entity::group_configs::Model as GroupConfigRow;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiAdapter {
    client: reqwest::Client,
}

impl GeminiAdapter {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn base_url(&self, cfg: &GroupConfigRow) -> String {
        cfg.base_url
            .clone()
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string())
    }

    fn chat_endpoint(&self, model: &str) -> String {
        format!("/v1beta/models/{model}:generateContent")
    }

    fn models_endpoint(&self) -> String {
        "/v1beta/models".to_string()
    }

    fn streaming_endpoint(&self, model: &str) -> String {
        format!("/v1beta/models/{model}:streamGenerateContent?alt=sse")
    }

    fn prepare_content(&self, request: &Value, _resolved_model: &str, overrides: &Value) -> Value {
        let mut body = request.clone();
        apply_overrides(&mut body, overrides);
        body
    }

    fn prepare_headers(&self, api_key: &str, cfg: &GroupConfigRow) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(name) = reqwest::header::HeaderName::from_bytes(API_KEY_HEADER.as_bytes()) {
            if let Ok(value) = HeaderValue::from_str(api_key) {
                headers.insert(name, value);
            }
        }
        insert_configured_headers(&mut headers, cfg);
        headers
    }

    async fn send(
        &self,
        body: Value,
        api_key: &str,
        cfg: &GroupConfigRow,
        model: &str,
        streaming: bool,
        timeouts: AdapterTimeouts,
    ) -> Result<ProviderResponse> {
        let endpoint = if streaming {
            self.streaming_endpoint(model)
        } else {
            self.chat_endpoint(model)
        };
        let url = format!("{}{endpoint}", self.base_url(cfg));
        let headers = self.prepare_headers(api_key, cfg);
        let mut response =
            send_request(&self.client, Method::POST, &url, headers, Some(&body), streaming, timeouts).await?;

        if let Some(stream) = response.stream.take() {
            let watcher = Arc::new(StallWatcher::new(StallConfig::default()));
            let watched = watcher.wrap(stream);
            let token = CancellationToken::new();
            spawn_stall_monitor(watcher, token.clone());
            response.stream = Some(CancelOnDrop::new(watched, token).boxed());
        }

        Ok(response)
    }

    fn classify(&self, status: u16, body: &str) -> Classification {
        classify_status(status, body)
    }
}
