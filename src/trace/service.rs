//! `RequestLogger`: start/end lifecycle, truncation, masking, and the
//! sync/async persistence split.

use super::queue::{LogQueue, QueueItem};
use crate::config::RequestLoggingConfig;
use crate::error::Result;
use crate::persistence::{PersistenceStore, RequestLogEnd, RequestLogStart};
use crate::types::mask_key;
use std::sync::Arc;

const TRUNCATION_MARKER: &str = "...[truncated]";

pub struct RequestLogger {
    pub(crate) store: Arc<dyn PersistenceStore>,
    queue: Option<LogQueue>,
    config: RequestLoggingConfig,
}

/// Parameters accepted by `LogRequestStartAsync`.
#[derive(Default)]
pub struct StartParams {
    pub method: String,
    pub endpoint: String,
    pub body: Option<String>,
    pub headers: Option<String>,
    pub proxy_key_id: Option<i32>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Parameters accepted by `LogRequestEndAsync`.
#[derive(Default)]
pub struct EndParams {
    pub status: Option<i32>,
    pub body: Option<String>,
    pub headers: Option<String>,
    pub error: Option<String>,
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
    pub group_id: Option<String>,
    pub provider_type: Option<String>,
    pub model: Option<String>,
    pub has_tools: bool,
    pub is_streaming: bool,
    pub upstream_key: Option<String>,
}

impl RequestLogger {
    #[must_use]
    pub fn new(store: Arc<dyn PersistenceStore>, queue: Option<LogQueue>, config: RequestLoggingConfig) -> Self {
        Self { store, queue, config }
    }

    fn should_skip(&self, endpoint: &str) -> bool {
        !self.config.enabled || (self.config.exclude_health_checks && is_health_check_path(endpoint))
    }

    /// Returns the new request id, or `None` if logging is disabled/excluded
    /// for this endpoint.
    pub async fn log_request_start(&self, params: StartParams) -> Result<Option<String>> {
        if self.should_skip(&params.endpoint) {
            return Ok(None);
        }
        let request_id = uuid::Uuid::new_v4().to_string();

        let (body, body_truncated) = self.truncate(params.body);
        let (headers, headers_truncated) = self.truncate(params.headers);
        let content_truncated = body_truncated || headers_truncated;

        let entry = RequestLogStart {
            request_id: request_id.clone(),
            method: params.method,
            endpoint: params.endpoint,
            proxy_key_id: params.proxy_key_id,
            request_body: body,
            request_headers: headers,
            content_truncated,
            client_ip: params.client_ip,
            user_agent: params.user_agent,
        };

        match &self.queue {
            Some(queue) => queue.push(QueueItem::Start(entry)),
            None => self.store.insert_request_log_start(entry).await?,
        }
        Ok(Some(request_id))
    }

    pub async fn log_request_end(&self, request_id: String, params: EndParams) -> Result<()> {
        let (body, body_truncated) = self.truncate(params.body);
        let (headers, headers_truncated) = self.truncate(params.headers);
        let content_truncated = body_truncated || headers_truncated;

        let entry = RequestLogEnd {
            request_id,
            status: params.status,
            response_body: body,
            response_headers: headers,
            error: params.error,
            prompt_tokens: params.prompt_tokens,
            completion_tokens: params.completion_tokens,
            total_tokens: params.total_tokens,
            group_id: params.group_id,
            provider_type: params.provider_type,
            model: params.model,
            has_tools: params.has_tools,
            is_streaming: params.is_streaming,
            upstream_key_masked: params.upstream_key.as_deref().map(mask_key),
            content_truncated,
        };

        match &self.queue {
            Some(queue) => {
                queue.push(QueueItem::End(entry));
                Ok(())
            }
            None => self.store.update_request_log_end(entry).await,
        }
    }

    /// Truncates to `max_content_length` when `enable_detailed_content`,
    /// returning the (possibly marked) string and whether it was cut.
    fn truncate(&self, content: Option<String>) -> (Option<String>, bool) {
        let Some(content) = content else {
            return (None, false);
        };
        if !self.config.enable_detailed_content {
            return (None, false);
        }
        if content.chars().count() <= self.config.max_content_length {
            return (Some(content), false);
        }
        let truncated: String = content.chars().take(self.config.max_content_length).collect();
        (Some(format!("{truncated}{TRUNCATION_MARKER}")), true)
    }
}

fn is_health_check_path(endpoint: &str) -> bool {
    endpoint == "/healthz" || endpoint == "/readyz"
}
