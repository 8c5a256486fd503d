//! Tiered health probe with early exit: provider → key → model.

use super::types::{analyze_consistency, error_message_for, CheckType, ProbeOutcome, TierHealth};
use crate::error::{Dialect, Result};
use crate::key_pool::hash_key;
use crate::persistence::PersistenceStore;
use crate::provider::{dialect_from_provider_type, AdapterTimeouts, ProviderAdapter};
use entity::group_configs::Model as GroupConfigRow;
use entity::health_check_results::Model as HealthCheckResultRow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const INTER_MODEL_DELAY: Duration = Duration::from_secs(30);

pub struct HealthChecker {
    store: Arc<dyn PersistenceStore>,
    adapters: HashMap<Dialect, Arc<dyn ProviderAdapter>>,
    client: reqwest::Client,
}

impl HealthChecker {
    #[must_use]
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        adapters: HashMap<Dialect, Arc<dyn ProviderAdapter>>,
        client: reqwest::Client,
    ) -> Self {
        Self { store, adapters, client }
    }

    pub async fn check_group(&self, group: &GroupConfigRow) -> Result<Option<&'static str>> {
        let Some(adapter) = dialect_from_provider_type(&group.provider_type).and_then(|d| self.adapters.get(&d))
        else {
            return Ok(None);
        };
        let raw_keys: Vec<String> = serde_json::from_value(group.api_keys.clone()).unwrap_or_default();
        let models: Vec<String> = serde_json::from_value(group.models.clone()).unwrap_or_default();

        let mut tiers = TierHealth::default();

        let Some(first_key) = raw_keys.first() else {
            return Ok(None);
        };
        let provider_probe = self
            .probe_models_endpoint(adapter.as_ref(), group, first_key, CheckType::Provider)
            .await;
        tiers.provider_ok = provider_probe.success;
        self.record(group, provider_probe).await?;
        if !tiers.provider_ok {
            return Ok(analyze_consistency(tiers));
        }

        let mut healthy_keys = Vec::new();
        for raw_key in &raw_keys {
            let probe = self
                .probe_models_endpoint(adapter.as_ref(), group, raw_key, CheckType::Key)
                .await;
            let ok = probe.success;
            self.record(group, probe).await?;
            if ok {
                healthy_keys.push(raw_key.clone());
            }
        }
        tiers.keys_ok = !healthy_keys.is_empty();
        if !tiers.keys_ok {
            return Ok(analyze_consistency(tiers));
        }

        let mut any_model_ok = false;
        for raw_key in &healthy_keys {
            for (idx, model) in models.iter().enumerate() {
                let probe = self.probe_model(adapter.as_ref(), group, raw_key, model).await;
                any_model_ok |= probe.success;
                self.record(group, probe).await?;
                if idx + 1 < models.len() {
                    tokio::time::sleep(INTER_MODEL_DELAY).await;
                }
            }
        }
        tiers.models_ok = any_model_ok;

        Ok(analyze_consistency(tiers))
    }

    async fn probe_models_endpoint(
        &self,
        adapter: &dyn ProviderAdapter,
        group: &GroupConfigRow,
        raw_key: &str,
        check_type: CheckType,
    ) -> ProbeOutcome {
        let url = format!("{}{}", adapter.base_url(group), adapter.models_endpoint());
        let headers = adapter.prepare_headers(raw_key, group);
        let timeouts = AdapterTimeouts::unary();
        let started = Instant::now();
        let result = self
            .client
            .get(&url)
            .headers(headers)
            .timeout(timeouts.response)
            .send()
            .await;
        let elapsed_ms = i32::try_from(started.elapsed().as_millis()).unwrap_or(i32::MAX);

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                ProbeOutcome {
                    check_type,
                    api_key_hash: Some(hash_key(raw_key)),
                    model: None,
                    success: response.status().is_success(),
                    status_code: Some(i32::from(status)),
                    error_message: if response.status().is_success() {
                        None
                    } else {
                        Some(error_message_for(status))
                    },
                    response_time_ms: elapsed_ms,
                }
            }
            Err(err) => ProbeOutcome {
                check_type,
                api_key_hash: Some(hash_key(raw_key)),
                model: None,
                success: false,
                status_code: None,
                error_message: Some(err.to_string()),
                response_time_ms: elapsed_ms,
            },
        }
    }

    async fn probe_model(
        &self,
        adapter: &dyn ProviderAdapter,
        group: &GroupConfigRow,
        raw_key: &str,
        model: &str,
    ) -> ProbeOutcome {
        let body = serde_json::json!({ "max_tokens": 1, "temperature": 0.0 });
        let prepared = adapter.prepare_content(&body, model, &serde_json::json!({}));
        let timeouts = AdapterTimeouts::unary();
        let started = Instant::now();
        let result = adapter
            .send(prepared, raw_key, group, model, false, timeouts)
            .await;
        let elapsed_ms = i32::try_from(started.elapsed().as_millis()).unwrap_or(i32::MAX);

        match result {
            Ok(response) => ProbeOutcome {
                check_type: CheckType::Model,
                api_key_hash: Some(hash_key(raw_key)),
                model: Some(model.to_string()),
                success: response.is_success(),
                status_code: Some(i32::from(response.status)),
                error_message: if response.is_success() {
                    None
                } else {
                    Some(error_message_for(response.status))
                },
                response_time_ms: elapsed_ms,
            },
            Err(err) => ProbeOutcome {
                check_type: CheckType::Model,
                api_key_hash: Some(hash_key(raw_key)),
                model: Some(model.to_string()),
                success: false,
                status_code: None,
                error_message: Some(err.to_string()),
                response_time_ms: elapsed_ms,
            },
        }
    }

    async fn record(&self, group: &GroupConfigRow, outcome: ProbeOutcome) -> Result<()> {
        let row = HealthCheckResultRow {
            id: 0,
            group_id: group.id.clone(),
            check_type: outcome.check_type.as_str().to_string(),
            api_key_hash: outcome.api_key_hash.clone(),
            model: outcome.model.clone(),
            success: outcome.success,
            status_code: outcome.status_code,
            error_message: outcome.error_message.clone(),
            response_time_ms: Some(outcome.response_time_ms),
            checked_at: chrono::Utc::now(),
        };
        self.store.insert_health_check_result(row).await?;
        self.store
            .upsert_health_check_stats(
                &group.id,
                outcome.check_type.as_str(),
                outcome.success,
                Some(outcome.response_time_ms),
            )
            .await
    }
}
