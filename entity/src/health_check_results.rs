//! One row per tiered health probe (provider / key / model).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orch_health_check_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub group_id: String,
    pub check_type: String,
    pub api_key_hash: Option<String>,
    pub model: Option<String>,
    pub success: bool,
    pub status_code: Option<i32>,
    pub error_message: Option<String>,
    pub response_time_ms: Option<i32>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
