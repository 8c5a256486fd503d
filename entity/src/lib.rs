//! Sea-ORM entity definitions for the gateway's persisted state.

pub mod group_configs;
pub mod health_check_results;
pub mod health_check_stats;
pub mod key_usage_stats;
pub mod key_validations;
pub mod proxy_keys;
pub mod request_logs;

pub use group_configs::Entity as GroupConfigs;
pub use health_check_results::Entity as HealthCheckResults;
pub use health_check_stats::Entity as HealthCheckStats;
pub use key_usage_stats::Entity as KeyUsageStats;
pub use key_validations::Entity as KeyValidations;
pub use proxy_keys::Entity as ProxyKeys;
pub use request_logs::Entity as RequestLogs;
