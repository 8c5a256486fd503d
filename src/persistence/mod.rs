//! Persistence port: typed CRUD + indexed queries over the 8 entities.
//!
//! The core components (Key Manager, Router, Request Logger, workers) take
//! `Arc<dyn PersistenceStore>` as an explicit constructor parameter and never
//! reference `sea_orm` types directly, so they can be exercised against an
//! in-memory fake in tests without a database.

mod sea_orm_store;

pub use sea_orm_store::SeaOrmStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity::group_configs::Model as GroupConfigRow;
use entity::health_check_results::Model as HealthCheckResultRow;
use entity::health_check_stats::Model as HealthCheckStatsRow;
use entity::key_usage_stats::Model as KeyUsageStatsRow;
use entity::key_validations::Model as KeyValidationRow;
use entity::proxy_keys::Model as ProxyKeyRow;
use entity::request_logs::Model as RequestLogRow;

/// Status-class filter for `list_request_logs`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusClass {
    Success,
    NonSuccess,
}

/// Filter accepted by the request-log list/aggregate queries.
#[derive(Debug, Clone, Default)]
pub struct RequestLogFilter {
    pub proxy_key_id: Option<i32>,
    pub group_id: Option<String>,
    pub model: Option<String>,
    pub status_class: Option<StatusClass>,
    pub streaming: Option<bool>,
}

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone)]
pub struct PagedRequestLogs {
    pub items: Vec<RequestLogRow>,
    pub total: u64,
}

/// Aggregate rollups over a filtered set of `RequestLog` rows.
#[derive(Debug, Clone, Default)]
pub struct RequestLogStats {
    pub total: i64,
    pub success: i64,
    pub failure: i64,
    pub avg_duration_ms: f64,
    pub prompt_tokens_sum: i64,
    pub completion_tokens_sum: i64,
    pub total_tokens_sum: i64,
    pub per_model: std::collections::HashMap<String, i64>,
    pub per_key: std::collections::HashMap<String, i64>,
    pub per_day: std::collections::HashMap<String, i64>,
}

/// Fields accepted by `LogRequestStartAsync`.
#[derive(Debug, Clone)]
pub struct RequestLogStart {
    pub request_id: String,
    pub method: String,
    pub endpoint: String,
    pub proxy_key_id: Option<i32>,
    pub request_body: Option<String>,
    pub request_headers: Option<String>,
    pub content_truncated: bool,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Fields accepted by `LogRequestEndAsync`.
#[derive(Debug, Clone, Default)]
pub struct RequestLogEnd {
    pub request_id: String,
    pub status: Option<i32>,
    pub response_body: Option<String>,
    pub response_headers: Option<String>,
    pub error: Option<String>,
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
    pub group_id: Option<String>,
    pub provider_type: Option<String>,
    pub model: Option<String>,
    pub has_tools: bool,
    pub is_streaming: bool,
    pub upstream_key_masked: Option<String>,
    pub content_truncated: bool,
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn list_enabled_groups(&self) -> Result<Vec<GroupConfigRow>>;
    async fn get_group(&self, group_id: &str) -> Result<Option<GroupConfigRow>>;

    async fn get_proxy_key_by_value(&self, key_value: &str) -> Result<Option<ProxyKeyRow>>;
    async fn record_proxy_key_usage(&self, proxy_key_id: i32) -> Result<()>;

    async fn get_key_validation(
        &self,
        group_id: &str,
        api_key_hash: &str,
    ) -> Result<Option<KeyValidationRow>>;
    async fn upsert_key_validation(
        &self,
        group_id: &str,
        api_key_hash: &str,
        is_valid: bool,
        error_count: i32,
        last_error: Option<String>,
        last_status_code: Option<i32>,
    ) -> Result<()>;
    async fn delete_key_validation(&self, group_id: &str, api_key_hash: &str) -> Result<()>;
    async fn list_invalid_key_validations(&self, group_id: &str) -> Result<Vec<KeyValidationRow>>;

    async fn get_key_usage(
        &self,
        group_id: &str,
        api_key_hash: &str,
    ) -> Result<Option<KeyUsageStatsRow>>;
    async fn increment_key_usage(&self, group_id: &str, api_key_hash: &str) -> Result<()>;

    /// Count of `RequestLog` rows for `proxy_key_id` with `created_at >= since`.
    async fn count_recent_requests(&self, proxy_key_id: i32, since: DateTime<Utc>) -> Result<i64>;

    async fn insert_request_log_start(&self, entry: RequestLogStart) -> Result<()>;
    async fn update_request_log_end(&self, entry: RequestLogEnd) -> Result<()>;
    async fn get_request_log(&self, request_id: &str) -> Result<Option<RequestLogRow>>;
    async fn delete_request_logs_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
    async fn list_request_logs(
        &self,
        filter: &RequestLogFilter,
        page: PageRequest,
    ) -> Result<PagedRequestLogs>;
    async fn aggregate_request_log_stats(&self, filter: &RequestLogFilter) -> Result<RequestLogStats>;

    async fn insert_health_check_result(&self, row: HealthCheckResultRow) -> Result<()>;
    async fn upsert_health_check_stats(
        &self,
        group_id: &str,
        check_type: &str,
        success: bool,
        response_time_ms: Option<i32>,
    ) -> Result<()>;
    async fn get_health_check_stats(
        &self,
        group_id: &str,
        check_type: &str,
    ) -> Result<Option<HealthCheckStatsRow>>;

    /// Liveness/readiness probe: a trivial round-trip query.
    async fn ping(&self) -> Result<()>;
}
