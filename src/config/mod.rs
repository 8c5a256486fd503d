//! Configuration loading, validation, and the `AppConfig` tree.

mod app_config;
mod database;

pub use app_config::{
    AuthConfig, FullStrategy, GeminiConfig, GlobalConfig, KeyHealthCheckConfig, LogQueueConfig,
    RequestLoggingConfig, ServerConfig,
};
pub use app_config::AppConfig;
pub use database::{DatabaseConfig, DatabaseKind};

use crate::error::{ProxyError, Result};

/// Loads `config/config.{RUST_ENV}.toml` (default `dev`) as the base layer,
/// then overlays `ORCH__`-prefixed environment variables (`__` nests, e.g.
/// `ORCH__SERVER__PORT`), matching the key namespace in spec's
/// `OrchestrationApi.*` config keys.
pub fn load_config() -> Result<AppConfig> {
    let env = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    let config_file = format!("config/config.{env}.toml");

    let mut builder = config::Config::builder();
    if std::path::Path::new(&config_file).exists() {
        builder = builder.add_source(config::File::with_name(&config_file));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("ORCH")
            .separator("__")
            .try_parsing(true),
    );

    let raw = builder.build()?;
    let app_config: AppConfig = raw.try_deserialize()?;
    validate_config(&app_config)?;
    Ok(app_config)
}

fn validate_config(config: &AppConfig) -> Result<()> {
    if config.server.port == 0 {
        return Err(ProxyError::config(format!(
            "invalid server port: {}",
            config.server.port
        )));
    }
    if config.server.host.is_empty() {
        return Err(ProxyError::config("server host must not be empty"));
    }
    if config.database.connection_string.is_empty() {
        return Err(ProxyError::config("database connection string must not be empty"));
    }
    if config.database.max_connections == 0 {
        return Err(ProxyError::config("database max_connections must be > 0"));
    }
    if config.global.max_provider_retries == 0 {
        return Err(ProxyError::config("global.max_provider_retries must be > 0"));
    }
    config.database.ensure_database_path()?;
    Ok(())
}
