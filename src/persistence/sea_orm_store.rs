//! `SeaOrmStore`: the only `PersistenceStore` implementation, backed by the
//! `entity` crate's models over a live `DatabaseConnection`.

use super::{PersistenceStore, RequestLogEnd, RequestLogStart};
use crate::error::{ErrorContext, ProxyError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity::{
    group_configs, health_check_results, health_check_stats, key_usage_stats, key_validations,
    proxy_keys, request_logs,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};

fn apply_log_filter(
    mut query: Select<request_logs::Entity>,
    filter: &super::RequestLogFilter,
) -> Select<request_logs::Entity> {
    if let Some(proxy_key_id) = filter.proxy_key_id {
        query = query.filter(request_logs::Column::ProxyKeyId.eq(proxy_key_id));
    }
    if let Some(group_id) = &filter.group_id {
        query = query.filter(request_logs::Column::GroupId.eq(group_id.clone()));
    }
    if let Some(model) = &filter.model {
        query = query.filter(request_logs::Column::Model.eq(model.clone()));
    }
    if let Some(streaming) = filter.streaming {
        query = query.filter(request_logs::Column::IsStreaming.eq(streaming));
    }
    match filter.status_class {
        Some(super::StatusClass::Success) => {
            query = query
                .filter(request_logs::Column::Status.gte(200))
                .filter(request_logs::Column::Status.lt(300));
        }
        Some(super::StatusClass::NonSuccess) => {
            query = query.filter(
                request_logs::Column::Status
                    .lt(200)
                    .or(request_logs::Column::Status.gte(300)),
            );
        }
        None => {}
    }
    query
}

pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PersistenceStore for SeaOrmStore {
    async fn list_enabled_groups(&self) -> Result<Vec<group_configs::Model>> {
        group_configs::Entity::find()
            .filter(group_configs::Column::Enabled.eq(true))
            .filter(group_configs::Column::IsDeleted.eq(false))
            .order_by_desc(group_configs::Column::Priority)
            .all(&self.db)
            .await
            .with_database_context(|| "listing enabled groups".to_string())
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<group_configs::Model>> {
        group_configs::Entity::find_by_id(group_id.to_owned())
            .one(&self.db)
            .await
            .with_database_context(|| "loading group config".to_string())
    }

    async fn get_proxy_key_by_value(&self, key_value: &str) -> Result<Option<proxy_keys::Model>> {
        proxy_keys::Entity::find()
            .filter(proxy_keys::Column::KeyValue.eq(key_value))
            .filter(proxy_keys::Column::Enabled.eq(true))
            .one(&self.db)
            .await
            .with_database_context(|| "loading proxy key".to_string())
    }

    async fn record_proxy_key_usage(&self, proxy_key_id: i32) -> Result<()> {
        let Some(row) = proxy_keys::Entity::find_by_id(proxy_key_id)
            .one(&self.db)
            .await
            .with_database_context(|| "loading proxy key for usage update".to_string())?
        else {
            return Ok(());
        };
        let mut active: proxy_keys::ActiveModel = row.into();
        active.usage_count = Set(active.usage_count.unwrap() + 1);
        active.last_used_at = Set(Some(Utc::now()));
        active
            .save(&self.db)
            .await
            .with_database_context(|| "updating proxy key usage".to_string())?;
        Ok(())
    }

    async fn get_key_validation(
        &self,
        group_id: &str,
        api_key_hash: &str,
    ) -> Result<Option<key_validations::Model>> {
        key_validations::Entity::find_by_id((group_id.to_owned(), api_key_hash.to_owned()))
            .one(&self.db)
            .await
            .with_database_context(|| "loading key validation".to_string())
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
        let existing = key_validations::Entity::find_by_id((
            group_id.to_owned(),
            api_key_hash.to_owned(),
        ))
        .one(&self.db)
        .await
        .with_database_context(|| "loading key validation for upsert".to_string())?;

        let mut active = existing.map_or_else(
            || key_validations::ActiveModel {
                group_id: Set(group_id.to_owned()),
                api_key_hash: Set(api_key_hash.to_owned()),
                ..Default::default()
            },
            Into::into,
        );
        active.is_valid = Set(is_valid);
        active.error_count = Set(error_count);
        active.last_error = Set(last_error);
        active.last_status_code = Set(last_status_code);
        active.last_validated_at = Set(Utc::now());

        key_validations::Entity::insert(active)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    key_validations::Column::GroupId,
                    key_validations::Column::ApiKeyHash,
                ])
                .update_columns([
                    key_validations::Column::IsValid,
                    key_validations::Column::ErrorCount,
                    key_validations::Column::LastError,
                    key_validations::Column::LastStatusCode,
                    key_validations::Column::LastValidatedAt,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await
            .with_database_context(|| "upserting key validation".to_string())?;
        Ok(())
    }

    async fn delete_key_validation(&self, group_id: &str, api_key_hash: &str) -> Result<()> {
        key_validations::Entity::delete_by_id((group_id.to_owned(), api_key_hash.to_owned()))
            .exec(&self.db)
            .await
            .with_database_context(|| "deleting key validation".to_string())?;
        Ok(())
    }

    async fn list_invalid_key_validations(
        &self,
        group_id: &str,
    ) -> Result<Vec<key_validations::Model>> {
        key_validations::Entity::find()
            .filter(key_validations::Column::GroupId.eq(group_id))
            .filter(key_validations::Column::IsValid.eq(false))
            .all(&self.db)
            .await
            .with_database_context(|| "listing invalid key validations".to_string())
    }

    async fn get_key_usage(
        &self,
        group_id: &str,
        api_key_hash: &str,
    ) -> Result<Option<key_usage_stats::Model>> {
        key_usage_stats::Entity::find_by_id((group_id.to_owned(), api_key_hash.to_owned()))
            .one(&self.db)
            .await
            .with_database_context(|| "loading key usage stats".to_string())
    }

    async fn increment_key_usage(&self, group_id: &str, api_key_hash: &str) -> Result<()> {
        let existing = key_usage_stats::Entity::find_by_id((
            group_id.to_owned(),
            api_key_hash.to_owned(),
        ))
        .one(&self.db)
        .await
        .with_database_context(|| "loading key usage stats for increment".to_string())?;

        let mut active = existing.map_or_else(
            || key_usage_stats::ActiveModel {
                group_id: Set(group_id.to_owned()),
                api_key_hash: Set(api_key_hash.to_owned()),
                usage_count: Set(0),
                ..Default::default()
            },
            Into::into,
        );
        active.usage_count = Set(active.usage_count.clone().unwrap() + 1);
        active.last_used_at = Set(Some(Utc::now()));

        key_usage_stats::Entity::insert(active)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    key_usage_stats::Column::GroupId,
                    key_usage_stats::Column::ApiKeyHash,
                ])
                .update_columns([
                    key_usage_stats::Column::UsageCount,
                    key_usage_stats::Column::LastUsedAt,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await
            .with_database_context(|| "upserting key usage stats".to_string())?;
        Ok(())
    }

    async fn count_recent_requests(&self, proxy_key_id: i32, since: DateTime<Utc>) -> Result<i64> {
        let count = request_logs::Entity::find()
            .filter(request_logs::Column::ProxyKeyId.eq(proxy_key_id))
            .filter(request_logs::Column::CreatedAt.gte(since))
            .count(&self.db)
            .await
            .with_database_context(|| "counting recent requests".to_string())?;
        Ok(count as i64)
    }

    async fn insert_request_log_start(&self, entry: RequestLogStart) -> Result<()> {
        let active = request_logs::ActiveModel {
            request_id: Set(entry.request_id),
            method: Set(entry.method),
            endpoint: Set(entry.endpoint),
            proxy_key_id: Set(entry.proxy_key_id),
            request_body: Set(entry.request_body),
            request_headers: Set(entry.request_headers),
            content_truncated: Set(entry.content_truncated),
            client_ip: Set(entry.client_ip),
            user_agent: Set(entry.user_agent),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        active
            .insert(&self.db)
            .await
            .with_database_context(|| "inserting request log start".to_string())?;
        Ok(())
    }

    async fn update_request_log_end(&self, entry: RequestLogEnd) -> Result<()> {
        let Some(row) = request_logs::Entity::find_by_id(entry.request_id.clone())
            .one(&self.db)
            .await
            .with_database_context(|| "loading request log for finalization".to_string())?
        else {
            tracing::warn!(request_id = %entry.request_id, "request log row missing at finalization");
            return Ok(());
        };
        let sticky_truncated = row.content_truncated || entry.content_truncated;
        let mut active: request_logs::ActiveModel = row.into();
        active.status = Set(entry.status);
        active.response_body = Set(entry.response_body);
        active.response_headers = Set(entry.response_headers);
        active.error = Set(entry.error);
        active.prompt_tokens = Set(entry.prompt_tokens);
        active.completion_tokens = Set(entry.completion_tokens);
        active.total_tokens = Set(entry.total_tokens);
        active.group_id = Set(entry.group_id);
        active.provider_type = Set(entry.provider_type);
        active.model = Set(entry.model);
        active.has_tools = Set(entry.has_tools);
        active.is_streaming = Set(entry.is_streaming);
        active.upstream_key = Set(entry.upstream_key_masked);
        active.content_truncated = Set(sticky_truncated);
        active.ended_at = Set(Some(Utc::now()));
        active
            .save(&self.db)
            .await
            .with_database_context(|| "finalizing request log".to_string())?;
        Ok(())
    }

    async fn get_request_log(&self, request_id: &str) -> Result<Option<request_logs::Model>> {
        request_logs::Entity::find_by_id(request_id.to_owned())
            .one(&self.db)
            .await
            .with_database_context(|| "loading request log".to_string())
    }

    async fn delete_request_logs_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let res = request_logs::Entity::delete_many()
            .filter(request_logs::Column::CreatedAt.lt(cutoff))
            .exec(&self.db)
            .await
            .with_database_context(|| "deleting expired request logs".to_string())?;
        Ok(res.rows_affected)
    }

    async fn list_request_logs(
        &self,
        filter: &super::RequestLogFilter,
        page: super::PageRequest,
    ) -> Result<super::PagedRequestLogs> {
        let query = apply_log_filter(request_logs::Entity::find(), filter)
            .order_by_desc(request_logs::Column::CreatedAt);
        let paginator = query.paginate(&self.db, page.page_size.max(1));
        let total = paginator
            .num_items()
            .await
            .with_database_context(|| "counting filtered request logs".to_string())?;
        let items = paginator
            .fetch_page(page.page)
            .await
            .with_database_context(|| "fetching filtered request logs page".to_string())?;
        Ok(super::PagedRequestLogs { items, total })
    }

    async fn aggregate_request_log_stats(
        &self,
        filter: &super::RequestLogFilter,
    ) -> Result<super::RequestLogStats> {
        let rows = apply_log_filter(request_logs::Entity::find(), filter)
            .all(&self.db)
            .await
            .with_database_context(|| "loading request logs for aggregation".to_string())?;

        let mut stats = super::RequestLogStats::default();
        let mut duration_sum_ms = 0i64;
        let mut duration_count = 0i64;

        for row in &rows {
            stats.total += 1;
            match row.status {
                Some(status) if (200..300).contains(&status) => stats.success += 1,
                _ => stats.failure += 1,
            }
            stats.prompt_tokens_sum += i64::from(row.prompt_tokens.unwrap_or(0));
            stats.completion_tokens_sum += i64::from(row.completion_tokens.unwrap_or(0));
            stats.total_tokens_sum += i64::from(row.total_tokens.unwrap_or(0));
            if let Some(ended_at) = row.ended_at {
                duration_sum_ms += (ended_at - row.created_at).num_milliseconds();
                duration_count += 1;
            }
            if let Some(model) = &row.model {
                *stats.per_model.entry(model.clone()).or_insert(0) += 1;
            }
            if let Some(key) = &row.upstream_key {
                *stats.per_key.entry(key.clone()).or_insert(0) += 1;
            }
            let day = row.created_at.format("%Y-%m-%d").to_string();
            *stats.per_day.entry(day).or_insert(0) += 1;
        }

        if duration_count > 0 {
            stats.avg_duration_ms = duration_sum_ms as f64 / duration_count as f64;
        }
        Ok(stats)
    }

    async fn insert_health_check_result(
        &self,
        row: health_check_results::Model,
    ) -> Result<()> {
        let active = health_check_results::ActiveModel {
            group_id: Set(row.group_id),
            check_type: Set(row.check_type),
            api_key_hash: Set(row.api_key_hash),
            model: Set(row.model),
            success: Set(row.success),
            status_code: Set(row.status_code),
            error_message: Set(row.error_message),
            response_time_ms: Set(row.response_time_ms),
            checked_at: Set(row.checked_at),
            ..Default::default()
        };
        active
            .insert(&self.db)
            .await
            .with_database_context(|| "inserting health check result".to_string())?;
        Ok(())
    }

    async fn upsert_health_check_stats(
        &self,
        group_id: &str,
        check_type: &str,
        success: bool,
        response_time_ms: Option<i32>,
    ) -> Result<()> {
        let existing = health_check_stats::Entity::find_by_id((
            group_id.to_owned(),
            check_type.to_owned(),
        ))
        .one(&self.db)
        .await
        .with_database_context(|| "loading health check stats for upsert".to_string())?;

        let mut active = existing.map_or_else(
            || health_check_stats::ActiveModel {
                group_id: Set(group_id.to_owned()),
                check_type: Set(check_type.to_owned()),
                total_count: Set(0),
                success_count: Set(0),
                failure_count: Set(0),
                avg_response_time_ms: Set(0.0),
                consecutive_failures: Set(0),
                last_checked_at: Set(None),
            },
            Into::into,
        );

        let total = active.total_count.clone().unwrap() + 1;
        let prev_avg = active.avg_response_time_ms.clone().unwrap();
        let new_sample = f64::from(response_time_ms.unwrap_or(0));
        active.avg_response_time_ms =
            Set(prev_avg + (new_sample - prev_avg) / total as f64);
        active.total_count = Set(total);
        if success {
            active.success_count = Set(active.success_count.clone().unwrap() + 1);
            active.consecutive_failures = Set(0);
        } else {
            active.failure_count = Set(active.failure_count.clone().unwrap() + 1);
            active.consecutive_failures = Set(active.consecutive_failures.clone().unwrap() + 1);
        }
        active.last_checked_at = Set(Some(Utc::now()));

        health_check_stats::Entity::insert(active)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    health_check_stats::Column::GroupId,
                    health_check_stats::Column::CheckType,
                ])
                .update_columns([
                    health_check_stats::Column::TotalCount,
                    health_check_stats::Column::SuccessCount,
                    health_check_stats::Column::FailureCount,
                    health_check_stats::Column::AvgResponseTimeMs,
                    health_check_stats::Column::ConsecutiveFailures,
                    health_check_stats::Column::LastCheckedAt,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await
            .with_database_context(|| "upserting health check stats".to_string())?;
        Ok(())
    }

    async fn get_health_check_stats(
        &self,
        group_id: &str,
        check_type: &str,
    ) -> Result<Option<health_check_stats::Model>> {
        health_check_stats::Entity::find_by_id((group_id.to_owned(), check_type.to_owned()))
            .one(&self.db)
            .await
            .with_database_context(|| "loading health check stats".to_string())
    }

    async fn ping(&self) -> Result<()> {
        group_configs::Entity::find()
            .limit(1)
            .all(&self.db)
            .await
            .map(|_| ())
            .map_err(ProxyError::from)
    }
}
