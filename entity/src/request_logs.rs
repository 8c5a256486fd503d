//! One row per request, created on start and finalized exactly once on end.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orch_request_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub request_id: String,
    pub method: String,
    pub endpoint: String,
    pub proxy_key_id: Option<i32>,
    pub group_id: Option<String>,
    pub provider_type: Option<String>,
    pub model: Option<String>,
    pub status: Option<i32>,
    pub has_tools: bool,
    pub is_streaming: bool,
    /// Masked upstream key (never the raw secret).
    pub upstream_key: Option<String>,
    pub prompt_tokens: Option<i32>,
    pub completion_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
    pub request_body: Option<String>,
    pub request_headers: Option<String>,
    pub response_body: Option<String>,
    pub response_headers: Option<String>,
    pub error: Option<String>,
    pub content_truncated: bool,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
