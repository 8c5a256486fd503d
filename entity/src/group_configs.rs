//! Provider group configuration: one row per routable upstream group.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orch_group_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub provider_type: String,
    pub base_url: Option<String>,
    /// Ordered sequence of opaque upstream API keys.
    pub api_keys: Json,
    /// Set of model ids this group serves.
    pub models: Json,
    /// alias -> canonical model id.
    pub model_aliases: Json,
    /// whitelisted parameter name -> scalar override.
    pub parameter_overrides: Json,
    pub headers: Json,
    pub balance_policy: String,
    pub retry_count: i32,
    pub timeout: i32,
    pub rpm_limit: i32,
    pub test_model: Option<String>,
    pub priority: i32,
    pub enabled: bool,
    pub fake_streaming: bool,
    pub proxy_config: Option<Json>,
    pub is_deleted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
