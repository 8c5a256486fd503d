//! In-memory `PersistenceStore` fake shared by the integration tests.
//!
//! Mirrors the shape of `SeaOrmStore` closely enough that Key Manager,
//! Router, and Dispatcher can be exercised without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity::group_configs::Model as GroupConfigRow;
use entity::health_check_results::Model as HealthCheckResultRow;
use entity::health_check_stats::Model as HealthCheckStatsRow;
use entity::key_usage_stats::Model as KeyUsageStatsRow;
use entity::key_validations::Model as KeyValidationRow;
use entity::proxy_keys::Model as ProxyKeyRow;
use entity::request_logs::Model as RequestLogRow;
use orchestration_api::error::Result;
use orchestration_api::persistence::{
    PagedRequestLogs, PageRequest, PersistenceStore, RequestLogEnd, RequestLogFilter, RequestLogStart,
    RequestLogStats,
};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeStore {
    groups: Mutex<HashMap<String, GroupConfigRow>>,
    proxy_keys: Mutex<HashMap<String, ProxyKeyRow>>,
    key_validations: Mutex<HashMap<(String, String), KeyValidationRow>>,
    key_usage: Mutex<HashMap<(String, String), KeyUsageStatsRow>>,
    request_logs: Mutex<HashMap<String, RequestLogRow>>,
    health_results: Mutex<Vec<HealthCheckResultRow>>,
    health_stats: Mutex<HashMap<(String, String), HealthCheckStatsRow>>,
}

impl FakeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_group(&self, group: GroupConfigRow) {
        self.groups.lock().unwrap().insert(group.id.clone(), group);
    }

    pub fn insert_proxy_key(&self, key: ProxyKeyRow) {
        self.proxy_keys.lock().unwrap().insert(key.key_value.clone(), key);
    }

    pub fn set_key_validation(&self, row: KeyValidationRow) {
        self.key_validations
            .lock()
            .unwrap()
            .insert((row.group_id.clone(), row.api_key_hash.clone()), row);
    }
}

#[async_trait]
impl PersistenceStore for FakeStore {
    async fn list_enabled_groups(&self) -> Result<Vec<GroupConfigRow>> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .values()
            .filter(|g| g.enabled && !g.is_deleted)
            .cloned()
            .collect())
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<GroupConfigRow>> {
        Ok(self.groups.lock().unwrap().get(group_id).cloned())
    }

    async fn get_proxy_key_by_value(&self, key_value: &str) -> Result<Option<ProxyKeyRow>> {
        Ok(self.proxy_keys.lock().unwrap().get(key_value).cloned())
    }

    async fn record_proxy_key_usage(&self, proxy_key_id: i32) -> Result<()> {
        for key in self.proxy_keys.lock().unwrap().values_mut() {
            if key.id == proxy_key_id {
                key.usage_count += 1;
            }
        }
        Ok(())
    }

    async fn get_key_validation(&self, group_id: &str, api_key_hash: &str) -> Result<Option<KeyValidationRow>> {
        Ok(self
            .key_validations
            .lock()
            .unwrap()
            .get(&(group_id.to_string(), api_key_hash.to_string()))
            .cloned())
    }

    async fn upsert_key_validation(
        &self,
        group_id: &str,
        api_key_hash: &str,
        is_valid: bool,
        error_count: i32,
        last_error: Option<String>,
        last_status_code: Option<i32>,
    ) -> Result<()> {
        self.key_validations.lock().unwrap().insert(
            (group_id.to_string(), api_key_hash.to_string()),
            KeyValidationRow {
                group_id: group_id.to_string(),
                api_key_hash: api_key_hash.to_string(),
                is_valid,
                error_count,
                last_error,
                last_status_code,
                last_validated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_key_validation(&self, group_id: &str, api_key_hash: &str) -> Result<()> {
        self.key_validations
            .lock()
            .unwrap()
            .remove(&(group_id.to_string(), api_key_hash.to_string()));
        Ok(())
    }

    async fn list_invalid_key_validations(&self, group_id: &str) -> Result<Vec<KeyValidationRow>> {
        Ok(self
            .key_validations
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.group_id == group_id && !row.is_valid)
            .cloned()
            .collect())
    }

    async fn get_key_usage(&self, group_id: &str, api_key_hash: &str) -> Result<Option<KeyUsageStatsRow>> {
        Ok(self
            .key_usage
            .lock()
            .unwrap()
            .get(&(group_id.to_string(), api_key_hash.to_string()))
            .cloned())
    }

    async fn increment_key_usage(&self, group_id: &str, api_key_hash: &str) -> Result<()> {
        let mut usage = self.key_usage.lock().unwrap();
        let entry = usage
            .entry((group_id.to_string(), api_key_hash.to_string()))
            .or_insert_with(|| KeyUsageStatsRow {
                group_id: group_id.to_string(),
                api_key_hash: api_key_hash.to_string(),
                usage_count: 0,
                last_used_at: None,
            });
        entry.usage_count += 1;
        entry.last_used_at = Some(Utc::now());
        Ok(())
    }

    async fn count_recent_requests(&self, _proxy_key_id: i32, _since: DateTime<Utc>) -> Result<i64> {
        Ok(0)
    }

    async fn insert_request_log_start(&self, entry: RequestLogStart) -> Result<()> {
        self.request_logs.lock().unwrap().insert(
            entry.request_id.clone(),
            RequestLogRow {
                request_id: entry.request_id,
                method: entry.method,
                endpoint: entry.endpoint,
                proxy_key_id: entry.proxy_key_id,
                group_id: None,
                provider_type: None,
                model: None,
                status: None,
                has_tools: false,
                is_streaming: false,
                upstream_key: None,
                prompt_tokens: None,
                completion_tokens: None,
                total_tokens: None,
                request_body: entry.request_body,
                request_headers: entry.request_headers,
                response_body: None,
                response_headers: None,
                error: None,
                content_truncated: entry.content_truncated,
                client_ip: entry.client_ip,
                user_agent: entry.user_agent,
                created_at: Utc::now(),
                ended_at: None,
            },
        );
        Ok(())
    }

    async fn update_request_log_end(&self, entry: RequestLogEnd) -> Result<()> {
        if let Some(row) = self.request_logs.lock().unwrap().get_mut(&entry.request_id) {
            row.status = entry.status;
            row.response_body = entry.response_body;
            row.response_headers = entry.response_headers;
            row.error = entry.error;
            row.prompt_tokens = entry.prompt_tokens;
            row.completion_tokens = entry.completion_tokens;
            row.total_tokens = entry.total_tokens;
            row.group_id = entry.group_id;
            row.provider_type = entry.provider_type;
            row.model = entry.model;
            row.has_tools = entry.has_tools;
            row.is_streaming = entry.is_streaming;
            row.upstream_key = entry.upstream_key_masked;
            row.content_truncated = entry.content_truncated;
            row.ended_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_request_log(&self, request_id: &str) -> Result<Option<RequestLogRow>> {
        Ok(self.request_logs.lock().unwrap().get(request_id).cloned())
    }

    async fn delete_request_logs_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut logs = self.request_logs.lock().unwrap();
        let before = logs.len();
        logs.retain(|_, row| row.created_at >= cutoff);
        Ok((before - logs.len()) as u64)
    }

    async fn list_request_logs(&self, _filter: &RequestLogFilter, _page: PageRequest) -> Result<PagedRequestLogs> {
        Ok(PagedRequestLogs { items: Vec::new(), total: 0 })
    }

    async fn aggregate_request_log_stats(&self, _filter: &RequestLogFilter) -> Result<RequestLogStats> {
        Ok(RequestLogStats::default())
    }

    async fn insert_health_check_result(&self, row: HealthCheckResultRow) -> Result<()> {
        self.health_results.lock().unwrap().push(row);
        Ok(())
    }

    async fn upsert_health_check_stats(
        &self,
        group_id: &str,
        check_type: &str,
        success: bool,
        response_time_ms: Option<i32>,
    ) -> Result<()> {
        let mut stats = self.health_stats.lock().unwrap();
        let entry = stats
            .entry((group_id.to_string(), check_type.to_string()))
            .or_insert_with(|| HealthCheckStatsRow {
                group_id: group_id.to_string(),
                check_type: check_type.to_string(),
                total_count: 0,
                success_count: 0,
                failure_count: 0,
                avg_response_time_ms: 0.0,
                consecutive_failures: 0,
                last_checked_at: None,
            });
        entry.total_count += 1;
        if success {
            entry.success_count += 1;
            entry.consecutive_failures = 0;
        } else {
            entry.failure_count += 1;
            entry.consecutive_failures += 1;
        }
        if let Some(ms) = response_time_ms {
            entry.avg_response_time_ms =
                (entry.avg_response_time_ms * (entry.total_count - 1) as f64 + f64::from(ms)) / entry.total_count as f64;
        }
        entry.last_checked_at = Some(Utc::now());
        Ok(())
    }

    async fn get_health_check_stats(&self, group_id: &str, check_type: &str) -> Result<Option<HealthCheckStatsRow>> {
        Ok(self
            .health_stats
            .lock()
            .unwrap()
            .get(&(group_id.to_string(), check_type.to_string()))
            .cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[must_use]
pub fn sample_group(id: &str, api_keys: &[&str], models: &[&str]) -> GroupConfigRow {
    let now = Utc::now();
    GroupConfigRow {
        id: id.to_string(),
        provider_type: "openai".to_string(),
        base_url: None,
        api_keys: serde_json::json!(api_keys),
        models: serde_json::json!(models),
        model_aliases: serde_json::json!({}),
        parameter_overrides: serde_json::json!({}),
        headers: serde_json::json!({}),
        balance_policy: "round_robin".to_string(),
        retry_count: 2,
        timeout: 30,
        rpm_limit: 0,
        test_model: None,
        priority: 0,
        enabled: true,
        fake_streaming: false,
        proxy_config: None,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    }
}

#[must_use]
pub fn sample_proxy_key(id: i32, key_value: &str, allowed_groups: &[&str]) -> ProxyKeyRow {
    let now = Utc::now();
    ProxyKeyRow {
        id,
        key_value: key_value.to_string(),
        name: format!("key-{id}"),
        description: None,
        enabled: true,
        rpm_limit: 0,
        allowed_groups: serde_json::json!(allowed_groups),
        group_balance_policy: "failover".to_string(),
        group_weights: serde_json::json!({}),
        usage_count: 0,
        last_used_at: None,
        created_at: now,
        updated_at: now,
    }
}
