//! Multi-Provider Dispatcher: the top-level entry point for each inbound
//! dialect, implementing the retry/failover algorithm shared by unary and
//! streaming calls alike.

use crate::config::GlobalConfig;
use crate::error::{Dialect, ProxyError, Result};
use crate::key_pool::KeyManager;
use crate::provider::{synthesize_streaming_body, AdapterTimeouts, ProviderAdapter};
use crate::router::Router;
use crate::trace::{EndParams, RequestLogger};
use entity::proxy_keys::Model as ProxyKeyRow;
use serde_json::Value;
use std::collections::HashMap as StdHashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct DispatchRequest {
    pub model: String,
    pub dialect: Dialect,
    pub proxy_key: Option<ProxyKeyRow>,
    pub body: Value,
    pub streaming: bool,
    pub request_id: Option<String>,
    pub cancellation: CancellationToken,
}

pub struct DispatchOutcome {
    pub status: u16,
    pub body: Option<bytes::Bytes>,
    pub stream: Option<crate::provider::types::UpstreamByteStream>,
}

pub struct Dispatcher {
    router: Arc<Router>,
    key_manager: Arc<KeyManager>,
    logger: Arc<RequestLogger>,
    adapters: StdHashMap<Dialect, Arc<dyn ProviderAdapter>>,
    global: GlobalConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        router: Arc<Router>,
        key_manager: Arc<KeyManager>,
        logger: Arc<RequestLogger>,
        adapters: StdHashMap<Dialect, Arc<dyn ProviderAdapter>>,
        global: GlobalConfig,
    ) -> Self {
        Self {
            router,
            key_manager,
            logger,
            adapters,
            global,
        }
    }

    pub async fn dispatch(&self, req: DispatchRequest) -> Result<DispatchOutcome> {
        let adapter = self
            .adapters
            .get(&req.dialect)
            .cloned()
            .ok_or_else(|| ProxyError::internal("no adapter registered for dialect"))?;

        let mut excluded: HashSet<String> = HashSet::new();
        let mut last_error: Option<ProxyError> = None;

        for _provider_attempt in 0..self.global.max_provider_retries.max(1) {
            let route = match self
                .router
                .route(&req.model, req.proxy_key.as_ref(), Some(req.dialect), &excluded)
                .await
            {
                Ok(route) => route,
                Err(ProxyError::NoAvailableKey { group_id: Some(id), .. }) => {
                    excluded.insert(id);
                    continue;
                }
                Err(err) => {
                    last_error = Some(err);
                    break;
                }
            };

            let mut key = route.api_key;
            let group = route.group;
            // `fake_streaming` groups always receive a unary upstream call,
            // even when the client asked to stream; the SSE shape is
            // synthesized afterwards from the completed body.
            let effective_streaming = req.streaming && !group.fake_streaming;
            let timeouts = if effective_streaming {
                AdapterTimeouts::streaming()
            } else {
                AdapterTimeouts::unary()
            };

            'in_group: for attempt in 0..=group.retry_count {
                if req.cancellation.is_cancelled() {
                    return Err(ProxyError::internal("request cancelled by client"));
                }

                let prepared = adapter.prepare_content(&req.body, &route.resolved_model, &route.parameter_overrides);
                let send_result = adapter
                    .send(prepared, &key, &group, &route.resolved_model, effective_streaming, timeouts)
                    .await;

                let response = match send_result {
                    Ok(response) => response,
                    Err(err) => {
                        self.key_manager
                            .report_error(&group.id, &key, err.to_string(), None)
                            .await?;
                        if attempt < group.retry_count {
                            tokio::time::sleep(backoff(attempt)).await;
                            continue 'in_group;
                        }
                        excluded.insert(group.id.clone());
                        break 'in_group;
                    }
                };

                if response.is_success() {
                    self.key_manager.reset_errors(&group.id, &key).await?;
                    self.key_manager.update_usage(&group.id, &key).await?;
                    if let Some(proxy_key) = &req.proxy_key {
                        self.key_manager.update_proxy_key_usage(proxy_key.id).await?;
                    }
                    self.finish_log(
                        &req,
                        response.status,
                        None,
                        Some(&group.id),
                        Some(&group.provider_type),
                        Some(&route.resolved_model),
                        Some(&key),
                    )
                    .await;
                    let (body, stream) = if req.streaming && group.fake_streaming {
                        let synthesized = synthesize_streaming_body(
                            response.body.as_deref().unwrap_or_default(),
                            req.dialect,
                        );
                        (None, Some(synthesized))
                    } else {
                        (response.body, response.stream)
                    };
                    return Ok(DispatchOutcome {
                        status: response.status,
                        body,
                        stream,
                    });
                }

                let body_text = response
                    .body
                    .as_deref()
                    .map(|b| String::from_utf8_lossy(b).to_string())
                    .unwrap_or_default();
                let classification = adapter.classify(response.status, &body_text);
                self.key_manager
                    .report_error(&group.id, &key, classification.message.clone(), Some(i32::from(response.status)))
                    .await?;

                if response.status == 401 || response.status == 403 || response.status == 429 {
                    if classification.should_try_next_key {
                        match self.key_manager.next_key(&group).await? {
                            Some(next) => {
                                key = next;
                                if classification.should_retry {
                                    tokio::time::sleep(backoff(attempt)).await;
                                }
                                continue 'in_group;
                            }
                            None => {
                                excluded.insert(group.id.clone());
                                break 'in_group;
                            }
                        }
                    }
                }

                if !classification.should_retry && !classification.should_try_next_key {
                    // 4xx permanent: try next group, not a terminal failure for the request.
                    excluded.insert(group.id.clone());
                    break 'in_group;
                }

                if !classification.should_retry {
                    self.finish_log(
                        &req,
                        response.status,
                        Some(&classification.message),
                        Some(&group.id),
                        Some(&group.provider_type),
                        Some(&route.resolved_model),
                        Some(&key),
                    )
                    .await;
                    return Ok(DispatchOutcome {
                        status: response.status,
                        body: response.body,
                        stream: response.stream,
                    });
                }

                if classification.should_try_next_key {
                    match self.key_manager.next_key(&group).await? {
                        Some(next) => key = next,
                        None => {
                            excluded.insert(group.id.clone());
                            break 'in_group;
                        }
                    }
                }
                tokio::time::sleep(backoff(attempt)).await;
            }
        }

        self.finish_log(
            &req,
            500,
            Some("no eligible provider"),
            None,
            None,
            None,
            None,
        )
        .await;
        last_error.map_or(
            Ok(DispatchOutcome {
                status: 500,
                body: None,
                stream: None,
            }),
            Err,
        )
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish_log(
        &self,
        req: &DispatchRequest,
        status: u16,
        error: Option<&str>,
        group_id: Option<&str>,
        provider_type: Option<&str>,
        model: Option<&str>,
        upstream_key: Option<&str>,
    ) {
        let Some(request_id) = req.request_id.clone() else {
            return;
        };
        let end = EndParams {
            status: Some(i32::from(status)),
            error: error.map(str::to_string),
            group_id: group_id.map(str::to_string),
            provider_type: provider_type.map(str::to_string),
            model: model.map(str::to_string),
            is_streaming: req.streaming,
            upstream_key: upstream_key.map(str::to_string),
            ..Default::default()
        };
        if let Err(err) = self.logger.log_request_end(request_id, end).await {
            tracing::warn!(error = %err, "failed to finalize request log");
        }
    }
}

/// `min(2^attempt s, 30 s)` retry back-off.
fn backoff(attempt: i32) -> Duration {
    let secs = 2u64.saturating_pow(attempt.max(0) as u32).min(30);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::backoff;
    use std::time::Duration;

    #[test]
    fn backoff_doubles_then_caps_at_thirty_seconds() {
        assert_eq!(backoff(0), Duration::from_secs(1));
        assert_eq!(backoff(1), Duration::from_secs(2));
        assert_eq!(backoff(4), Duration::from_secs(16));
        assert_eq!(backoff(5), Duration::from_secs(30));
        assert_eq!(backoff(10), Duration::from_secs(30));
    }

    #[test]
    fn backoff_clamps_negative_attempts_to_the_base_delay() {
        assert_eq!(backoff(-3), Duration::from_secs(1));
    }
}
