pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_group_configs_table;
mod m20240101_000002_create_proxy_keys_table;
mod m20240101_000003_create_key_validations_table;
mod m20240101_000004_create_key_usage_stats_table;
mod m20240101_000005_create_request_logs_table;
mod m20240101_000006_create_health_check_results_table;
mod m20240101_000007_create_health_check_stats_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_group_configs_table::Migration),
            Box::new(m20240101_000002_create_proxy_keys_table::Migration),
            Box::new(m20240101_000003_create_key_validations_table::Migration),
            Box::new(m20240101_000004_create_key_usage_stats_table::Migration),
            Box::new(m20240101_000005_create_request_logs_table::Migration),
            Box::new(m20240101_000006_create_health_check_results_table::Migration),
            Box::new(m20240101_000007_create_health_check_stats_table::Migration),
        ]
    }
}
