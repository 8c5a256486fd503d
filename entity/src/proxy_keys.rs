//! Gateway-issued proxy keys presented by clients.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orch_proxy_keys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub key_value: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub rpm_limit: i32,
    /// Set of GroupConfig.id; empty means "all enabled groups".
    pub allowed_groups: Json,
    pub group_balance_policy: String,
    /// group_id -> weight.
    pub group_weights: Json,
    pub usage_count: i64,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
