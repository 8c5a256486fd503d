//! The uniform provider adapter contract, implemented once per dialect.

use super::types::{AdapterTimeouts, Classification, ProviderResponse};
use crate::error::Result;
use async_trait::async_trait;
use entity::group_configs::Model as GroupConfigRow;
use reqwest::header::HeaderMap;
use serde_json::Value;

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn base_url(&self, cfg: &GroupConfigRow) -> String;
    fn chat_endpoint(&self, model: &str) -> String;
    fn models_endpoint(&self) -> String;
    fn streaming_endpoint(&self, model: &str) -> String;

    /// Encodes the dialect's native JSON body, applying whitelisted
    /// parameter overrides and the resolved model name.
    fn prepare_content(&self, request: &Value, resolved_model: &str, overrides: &Value) -> Value;

    /// Builds the auth + content-type + configured static headers.
    fn prepare_headers(&self, api_key: &str, cfg: &GroupConfigRow) -> HeaderMap;

    async fn send(
        &self,
        body: Value,
        api_key: &str,
        cfg: &GroupConfigRow,
        model: &str,
        streaming: bool,
        timeouts: AdapterTimeouts,
    ) -> Result<ProviderResponse>;

    fn classify(&self, status: u16, body: &str) -> Classification;
}
