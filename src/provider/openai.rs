//! OpenAI-compatible dialect: `Authorization: Bearer`, `messages` body shape.

use super::traits::ProviderAdapter;
use super::types::{apply_overrides, classify_status, AdapterTimeouts, Classification, ProviderResponse};
use super::send_request;
use crate::error::Result;
use async_trait::async_trait;
use entity::group_configs::Model as GroupConfigRow;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;

pub struct OpenAiAdapter {
    client: reqwest::Client,
}

impl OpenAiAdapter {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn base_url(&self, cfg: &GroupConfigRow) -> String {
        cfg.base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string())
    }

    fn chat_endpoint(&self, _model: &str) -> String {
        "/v1/chat/completions".to_string()
    }

    fn models_endpoint(&self) -> String {
        "/v1/models".to_string()
    }

    fn streaming_endpoint(&self, model: &str) -> String {
        self.chat_endpoint(model)
    }

    fn prepare_content(&self, request: &Value, resolved_model: &str, overrides: &Value) -> Value {
        let mut body = request.clone();
        apply_overrides(&mut body, overrides);
        if let Value::Object(map) = &mut body {
            map.insert("model".to_string(), Value::String(resolved_model.to_string()));
        }
        body
    }

    fn prepare_headers(&self, api_key: &str, cfg: &GroupConfigRow) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
            headers.insert(AUTHORIZATION, value);
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
        send_request(&self.client, Method::POST, &url, headers, Some(&body), streaming, timeouts).await
    }

    fn classify(&self, status: u16, body: &str) -> Classification {
        classify_status(status, body)
    }
}

pub(super) fn insert_configured_headers(headers: &mut HeaderMap, cfg: &GroupConfigRow) {
    let Ok(configured) = serde_json::from_value::<std::collections::HashMap<String, String>>(cfg.headers.clone())
    else {
        return;
    };
    for (key, value) in configured {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            headers.insert(name, value);
        }
    }
}
