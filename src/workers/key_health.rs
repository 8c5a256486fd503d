//! Key health reconciliation: periodically re-tests invalid keys and
//! restores them to service when upstream accepts them again.

use crate::error::Dialect;
use crate::key_pool::{hash_key, KeyManager};
use crate::persistence::PersistenceStore;
use crate::provider::{dialect_from_provider_type, AdapterTimeouts, ProviderAdapter};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const INTER_KEY_DELAY: Duration = Duration::from_millis(500);

pub struct KeyHealthWorker {
    store: Arc<dyn PersistenceStore>,
    key_manager: Arc<KeyManager>,
    adapters: HashMap<Dialect, Arc<dyn ProviderAdapter>>,
}

impl KeyHealthWorker {
    #[must_use]
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        key_manager: Arc<KeyManager>,
        adapters: HashMap<Dialect, Arc<dyn ProviderAdapter>>,
    ) -> Self {
        Self {
            store,
            key_manager,
            adapters,
        }
    }

    /// One full reconciliation pass, one group at a time.
    pub async fn run_once(&self) -> crate::error::Result<()> {
        let groups = self.store.list_enabled_groups().await?;
        for group in groups {
            let invalid = self.store.list_invalid_key_validations(&group.id).await?;
            if invalid.is_empty() {
                continue;
            }

            let raw_keys: Vec<String> =
                serde_json::from_value(group.api_keys.clone()).unwrap_or_default();
            let by_hash: HashMap<String, &String> =
                raw_keys.iter().map(|k| (hash_key(k), k)).collect();

            let Some(adapter) = dialect_from_provider_type(&group.provider_type)
                .and_then(|d| self.adapters.get(&d))
            else {
                continue;
            };

            for row in invalid {
                let Some(raw_key) = by_hash.get(&row.api_key_hash) else {
                    self.store
                        .delete_key_validation(&group.id, &row.api_key_hash)
                        .await?;
                    continue;
                };

                let smoke_ok = self.smoke_test(adapter.as_ref(), raw_key, &group).await;
                if smoke_ok {
                    self.key_manager.reset_errors(&group.id, raw_key).await?;
                } else {
                    tracing::debug!(group = %group.id, "key still unhealthy after reconciliation probe");
                }
                tokio::time::sleep(INTER_KEY_DELAY).await;
            }
        }
        Ok(())
    }

    async fn smoke_test(
        &self,
        adapter: &dyn ProviderAdapter,
        raw_key: &str,
        group: &entity::group_configs::Model,
    ) -> bool {
        let url = format!("{}{}", adapter.base_url(group), adapter.models_endpoint());
        let headers = adapter.prepare_headers(raw_key, group);
        let client = crate::provider::build_http_client(AdapterTimeouts::unary().connect);
        let timeouts = AdapterTimeouts::unary();
        let Ok(response) = client
            .get(&url)
            .headers(headers)
            .timeout(timeouts.response)
            .send()
            .await
        else {
            return false;
        };
        response.status().is_success()
    }
}
