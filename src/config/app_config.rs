//! Application configuration structure.

use serde::{Deserialize, Serialize};

/// Root configuration tree, loaded from `config/config.{RUST_ENV}.toml` and
/// overridable by `ORCH__`-prefixed environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: super::database::DatabaseConfig,
    pub auth: AuthConfig,
    pub global: GlobalConfig,
    pub gemini: GeminiConfig,
    pub request_logging: RequestLoggingConfig,
    pub key_health_check: KeyHealthCheckConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Out of core scope beyond `ValidateProxyKey`; kept only as config surface
/// for the external login/JWT session system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub username: String,
    pub password: String,
    pub session_timeout: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            username: String::new(),
            password: String::new(),
            session_timeout: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub connection_timeout: u64,
    pub response_timeout: u64,
    pub max_provider_retries: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            connection_timeout: 30,
            response_timeout: 180,
            max_provider_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub streaming_timeout: u64,
    pub non_streaming_timeout: u64,
    pub data_timeout_seconds: u64,
    pub max_data_interval_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            streaming_timeout: 300,
            non_streaming_timeout: 180,
            data_timeout_seconds: 30,
            max_data_interval_seconds: 120,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullStrategy {
    DropOldest,
    RejectNew,
    Block,
}

impl Default for FullStrategy {
    fn default() -> Self {
        Self::DropOldest
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogQueueConfig {
    pub enabled: bool,
    pub max_capacity: usize,
    pub batch_size: usize,
    pub processing_interval_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub full_strategy: FullStrategy,
    pub graceful_shutdown_timeout_ms: u64,
}

impl Default for LogQueueConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 10_000,
            batch_size: 100,
            processing_interval_ms: 1_000,
            max_retries: 3,
            retry_delay_ms: 500,
            full_strategy: FullStrategy::default(),
            graceful_shutdown_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLoggingConfig {
    pub enabled: bool,
    pub enable_detailed_content: bool,
    pub max_content_length: usize,
    pub exclude_health_checks: bool,
    pub retention_days: i64,
    pub queue: LogQueueConfig,
}

impl Default for RequestLoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_detailed_content: true,
            max_content_length: 10_000,
            exclude_health_checks: true,
            retention_days: 30,
            queue: LogQueueConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyHealthCheckConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
}

impl Default for KeyHealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 10,
        }
    }
}
