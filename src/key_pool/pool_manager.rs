//! `KeyManager`: per-group key pool, availability predicate, usage and
//! error bookkeeping, and proxy-key validation.

use super::balancer::{self, GroupCandidate, KeyCandidate};
use super::types::{BalancePolicy, GroupBalancePolicy};
use crate::error::Result;
use crate::persistence::PersistenceStore;
use chrono::{Duration as ChronoDuration, Utc};
use entity::group_configs::Model as GroupConfigRow;
use entity::proxy_keys::Model as ProxyKeyRow;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Hashes a raw upstream API key to the stable, process-independent form
/// stored in `KeyValidation`/`KeyUsageStats`.
#[must_use]
pub fn hash_key(raw_key: &str) -> String {
    let digest = Sha256::digest(raw_key.as_bytes());
    hex::encode_upper(digest)
}

pub struct KeyManager {
    store: Arc<dyn PersistenceStore>,
    /// Per-group round-robin cursor for key selection; keyed by group id.
    key_cursors: Mutex<HashMap<String, usize>>,
    /// Per-proxy-key round-robin cursor for group selection, 1h TTL.
    group_cursors: Cache<i32, usize>,
    /// `ValidateProxyKey` lookup cache, 5-minute TTL.
    proxy_key_cache: Cache<String, ProxyKeyRow>,
}

impl KeyManager {
    #[must_use]
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            store,
            key_cursors: Mutex::new(HashMap::new()),
            group_cursors: Cache::builder()
                .time_to_live(Duration::from_secs(3600))
                .build(),
            proxy_key_cache: Cache::builder()
                .time_to_live(Duration::from_secs(300))
                .build(),
        }
    }

    /// `IsAvailable(groupId, key)`: the 5-rule predicate, evaluated in order.
    pub async fn is_available(&self, group_id: &str, api_key_hash: &str) -> Result<bool> {
        let Some(row) = self.store.get_key_validation(group_id, api_key_hash).await? else {
            return Ok(true); // rule 1: untested keys are optimistically available
        };

        let now = Utc::now();
        let age = now - row.last_validated_at;

        if age > ChronoDuration::hours(24) {
            return Ok(row.is_valid || row.error_count < 3);
        }
        if row.error_count >= 5 {
            return Ok(age > ChronoDuration::hours(1));
        }
        if row.last_status_code == Some(401) && age < ChronoDuration::minutes(30) {
            return Ok(false);
        }
        Ok(row.is_valid)
    }

    /// `NextKey(groupId) -> apiKey?`.
    pub async fn next_key(&self, group: &GroupConfigRow) -> Result<Option<String>> {
        let raw_keys: Vec<String> = serde_json::from_value(group.api_keys.clone())
            .unwrap_or_default();
        if raw_keys.is_empty() {
            return Ok(None);
        }

        let mut candidates = Vec::with_capacity(raw_keys.len());
        for raw_key in &raw_keys {
            let hash = hash_key(raw_key);
            if !self.is_available(&group.id, &hash).await? {
                continue;
            }
            let usage_count = self
                .store
                .get_key_usage(&group.id, &hash)
                .await?
                .map_or(0, |row| row.usage_count);
            candidates.push(KeyCandidate {
                raw_key: raw_key.clone(),
                hash,
                usage_count,
            });
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        let policy = BalancePolicy::parse_or_default(&group.balance_policy);
        let picked = {
            let mut cursors = self.key_cursors.lock().expect("key cursor mutex poisoned");
            let cursor = cursors.entry(group.id.clone()).or_insert(0);
            balancer::pick_key(policy, &candidates, cursor).cloned()
        };

        // Usage is not incremented here: `UpdateUsage` at the call's success
        // point is the sole increment, so a single happy-path request leaves
        // `usage_count == 1` rather than double-counting select + success.
        Ok(picked.map(|candidate| candidate.raw_key))
    }

    /// Proxy-key-level group selection (invoked by the router).
    pub async fn select_group(
        &self,
        proxy_key_id: i32,
        policy: GroupBalancePolicy,
        candidates: &[GroupConfigRow],
        group_weights: &HashMap<String, f64>,
    ) -> Option<GroupConfigRow> {
        let as_candidates: Vec<GroupCandidate> = candidates
            .iter()
            .map(|g| GroupCandidate {
                id: g.id.clone(),
                priority: g.priority,
            })
            .collect();

        let mut cursor = self.group_cursors.get(&proxy_key_id).await.unwrap_or(0);
        let picked = balancer::pick_group(policy, &as_candidates, group_weights, &mut cursor)
            .map(|c| c.id.clone());
        self.group_cursors.insert(proxy_key_id, cursor).await;

        let picked_id = picked?;
        candidates.iter().find(|g| g.id == picked_id).cloned()
    }

    /// `ReportError(groupId, key, msg, statusCode?)`.
    pub async fn report_error(
        &self,
        group_id: &str,
        raw_key: &str,
        message: impl Into<String>,
        status_code: Option<i32>,
    ) -> Result<()> {
        let hash = hash_key(raw_key);
        let existing = self.store.get_key_validation(group_id, &hash).await?;
        let error_count = existing.map_or(1, |row| row.error_count + 1);
        self.store
            .upsert_key_validation(group_id, &hash, false, error_count, Some(message.into()), status_code)
            .await
    }

    /// `ResetErrors(groupId, key)`.
    pub async fn reset_errors(&self, group_id: &str, raw_key: &str) -> Result<()> {
        let hash = hash_key(raw_key);
        self.store
            .upsert_key_validation(group_id, &hash, true, 0, None, None)
            .await
    }

    /// `UpdateUsage(groupId, key)` — idempotent top-up, used after a
    /// selection that bypassed `next_key` (e.g. a retry on the same key).
    pub async fn update_usage(&self, group_id: &str, raw_key: &str) -> Result<()> {
        let hash = hash_key(raw_key);
        self.store.increment_key_usage(group_id, &hash).await
    }

    pub async fn update_proxy_key_usage(&self, proxy_key_id: i32) -> Result<()> {
        self.store.record_proxy_key_usage(proxy_key_id).await
    }

    /// `CheckRpm(proxyKeyId, groupId) -> bool`. Limits of `0` mean unlimited.
    pub async fn check_rpm(
        &self,
        proxy_key_id: i32,
        proxy_key_rpm_limit: i32,
        group_rpm_limit: i32,
    ) -> Result<bool> {
        let limit = match (proxy_key_rpm_limit, group_rpm_limit) {
            (0, 0) => return Ok(true),
            (0, g) => g,
            (p, 0) => p,
            (p, g) => p.min(g),
        };
        let since = Utc::now() - ChronoDuration::seconds(60);
        let count = self.store.count_recent_requests(proxy_key_id, since).await?;
        Ok(count < i64::from(limit))
    }

    /// `ValidateProxyKey(rawKey) -> ProxyKey?`, 5-minute cached.
    pub async fn validate_proxy_key(&self, raw_key: &str) -> Result<Option<ProxyKeyRow>> {
        if let Some(cached) = self.proxy_key_cache.get(raw_key).await {
            return Ok(Some(cached));
        }
        let Some(row) = self.store.get_proxy_key_by_value(raw_key).await? else {
            return Ok(None);
        };
        self.proxy_key_cache
            .insert(raw_key.to_string(), row.clone())
            .await;
        Ok(Some(row))
    }
}
