//! Router: resolves an inbound `(model, proxyKey?, forcedDialect?)` to a
//! concrete `(group, apiKey, resolvedModel)` tuple.

use crate::error::{Dialect, ProxyError, Result};
use crate::key_pool::{GroupBalancePolicy, KeyManager};
use crate::persistence::PersistenceStore;
use entity::group_configs::Model as GroupConfigRow;
use entity::proxy_keys::Model as ProxyKeyRow;
use moka::future::Cache;
use serde_json::Value as Json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a successful route.
pub struct RouteResult {
    pub group: GroupConfigRow,
    pub api_key: String,
    pub resolved_model: String,
    pub parameter_overrides: Json,
}

pub struct Router {
    store: Arc<dyn PersistenceStore>,
    key_manager: Arc<KeyManager>,
    /// Candidate-group lookup, keyed by `(model, forced_dialect)`, 5-minute TTL.
    candidate_cache: Cache<(String, Option<String>), Vec<GroupConfigRow>>,
}

impl Router {
    #[must_use]
    pub fn new(store: Arc<dyn PersistenceStore>, key_manager: Arc<KeyManager>) -> Self {
        Self {
            store,
            key_manager,
            candidate_cache: Cache::builder()
                .time_to_live(Duration::from_secs(300))
                .build(),
        }
    }

    pub async fn route(
        &self,
        model: &str,
        proxy_key: Option<&ProxyKeyRow>,
        forced_dialect: Option<Dialect>,
        excluded_groups: &HashSet<String>,
    ) -> Result<RouteResult> {
        if let Some(proxy_key) = proxy_key {
            let admitted = self
                .key_manager
                .check_rpm(proxy_key.id, proxy_key.rpm_limit, 0)
                .await?;
            if !admitted {
                return Err(ProxyError::RpmExceeded {
                    message: format!("proxy key {} exceeded its request rate limit", proxy_key.name),
                    retry_after: Some(60),
                });
            }
        }

        let dialect_str = forced_dialect.map(dialect_provider_type);
        let mut candidates = self.candidates_for(model, dialect_str).await?;

        if let Some(proxy_key) = proxy_key {
            let allowed: HashSet<String> =
                serde_json::from_value(proxy_key.allowed_groups.clone()).unwrap_or_default();
            if !allowed.is_empty() {
                candidates.retain(|g| allowed.contains(&g.id));
            }
        }
        candidates.retain(|g| !excluded_groups.contains(&g.id));

        if candidates.is_empty() {
            return Err(ProxyError::NoEligibleGroup {
                model: model.to_string(),
            });
        }

        let policy = proxy_key.map_or(GroupBalancePolicy::Failover, |pk| {
            GroupBalancePolicy::parse_or_default(&pk.group_balance_policy)
        });
        let group_weights: HashMap<String, f64> = proxy_key
            .and_then(|pk| serde_json::from_value(pk.group_weights.clone()).ok())
            .unwrap_or_default();
        let proxy_key_id = proxy_key.map_or(0, |pk| pk.id);

        let group = self
            .key_manager
            .select_group(proxy_key_id, policy, &candidates, &group_weights)
            .await
            .ok_or_else(|| ProxyError::NoEligibleGroup {
                model: model.to_string(),
            })?;

        let Some(api_key) = self.key_manager.next_key(&group).await? else {
            return Err(ProxyError::NoAvailableKey {
                message: format!("group {} has no available key", group.id),
                group_id: Some(group.id.clone()),
            });
        };

        let aliases: HashMap<String, String> =
            serde_json::from_value(group.model_aliases.clone()).unwrap_or_default();
        let resolved_model = aliases.get(model).cloned().unwrap_or_else(|| model.to_string());
        let parameter_overrides = group.parameter_overrides.clone();

        Ok(RouteResult {
            group,
            api_key,
            resolved_model,
            parameter_overrides,
        })
    }

    async fn candidates_for(
        &self,
        model: &str,
        forced_dialect: Option<&str>,
    ) -> Result<Vec<GroupConfigRow>> {
        let cache_key = (model.to_string(), forced_dialect.map(str::to_string));
        if let Some(cached) = self.candidate_cache.get(&cache_key).await {
            return Ok(cached);
        }

        let enabled = self.store.list_enabled_groups().await?;
        let matching: Vec<GroupConfigRow> = enabled
            .into_iter()
            .filter(|g| {
                if let Some(dialect) = forced_dialect {
                    if g.provider_type != dialect {
                        return false;
                    }
                }
                group_serves_model(g, model)
            })
            .collect();

        self.candidate_cache.insert(cache_key, matching.clone()).await;
        Ok(matching)
    }
}

fn group_serves_model(group: &GroupConfigRow, model: &str) -> bool {
    let models: HashSet<String> = serde_json::from_value(group.models.clone()).unwrap_or_default();
    if models.contains(model) {
        return true;
    }
    let aliases: HashMap<String, String> =
        serde_json::from_value(group.model_aliases.clone()).unwrap_or_default();
    aliases.contains_key(model)
}

const fn dialect_provider_type(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::OpenAi => "openai",
        Dialect::Anthropic => "anthropic",
        Dialect::Gemini => "gemini",
    }
}
