//! Error type definitions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Top-level gateway error.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Proxy key missing, unknown, or disabled.
    #[error("invalid proxy key: {message}")]
    InvalidProxyKey { message: String },

    /// Per-proxy-key RPM admission rejected the request.
    #[error("rate limit exceeded: {message}")]
    RpmExceeded {
        message: String,
        retry_after: Option<u64>,
    },

    /// No configured group serves the requested model/dialect combination.
    #[error("no available provider for model {model}")]
    NoEligibleGroup { model: String },

    /// A group was selected but has no available key.
    #[error("no available key: {message}")]
    NoAvailableKey {
        message: String,
        group_id: Option<String>,
    },

    /// Upstream rejected the key (401/403); triggers switch-key.
    #[error("upstream auth failed: {message}")]
    UpstreamAuthFailed {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Upstream returned 429; triggers switch-key with back-off.
    #[error("upstream rate limited: {message}")]
    UpstreamRateLimited {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Upstream 5xx/timeout; triggers retry-same-key then switch-key.
    #[error("upstream transient error: {message}")]
    UpstreamTransient {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Upstream 4xx (400/404/422); triggers switch-group.
    #[error("upstream permanent error: {message}")]
    UpstreamPermanent {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Streaming response ended early; reported in logs only.
    #[error("upstream stream truncated: {message}")]
    UpstreamTruncated { message: String },

    /// Configuration load/validation error.
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Persistence-layer error. Never propagated to the caller from the
    /// request logger — only from components that must fail the request.
    #[error("database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Outbound HTTP failure not yet classified into an upstream kind above.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// (De)serialization failure.
    #[error("serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// Filesystem/IO failure.
    #[error("io error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Catch-all for invariants that should never be reached.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Requested wire dialect, used to render the error in the caller's native
/// envelope shape.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Dialect {
    OpenAi,
    Anthropic,
    Gemini,
}

impl ProxyError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidProxyKey { .. } => StatusCode::UNAUTHORIZED,
            Self::RpmExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NoEligibleGroup { .. } | Self::NoAvailableKey { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::UpstreamAuthFailed { .. } => StatusCode::UNAUTHORIZED,
            Self::UpstreamRateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamTransient { .. } => StatusCode::BAD_GATEWAY,
            Self::UpstreamPermanent { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamTruncated { .. } => StatusCode::OK,
            Self::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Network { .. } => StatusCode::BAD_GATEWAY,
            Self::Serialization { .. } => StatusCode::BAD_REQUEST,
            Self::Io { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidProxyKey { .. } => "invalid_proxy_key",
            Self::RpmExceeded { .. } => "rate_limit_exceeded",
            Self::NoEligibleGroup { .. } => "no_available_provider",
            Self::NoAvailableKey { .. } => "no_available_key",
            Self::UpstreamAuthFailed { .. } => "upstream_auth_failed",
            Self::UpstreamRateLimited { .. } => "upstream_rate_limited",
            Self::UpstreamTransient { .. } => "upstream_transient",
            Self::UpstreamPermanent { .. } => "upstream_permanent",
            Self::UpstreamTruncated { .. } => "upstream_truncated",
            Self::Config { .. } => "config_error",
            Self::Database { .. } => "database_error",
            Self::Network { .. } => "network_error",
            Self::Serialization { .. } => "serialization_error",
            Self::Io { .. } => "io_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Render this error into the requested dialect's native error envelope.
    #[must_use]
    pub fn to_dialect_response(&self, dialect: Dialect) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        let code = self.code();
        let body = match dialect {
            Dialect::OpenAi => serde_json::json!({
                "error": { "message": message, "type": "provider_error", "code": code }
            }),
            Dialect::Anthropic => serde_json::json!({
                "type": "error",
                "error": { "type": code, "message": message }
            }),
            Dialect::Gemini => serde_json::json!({
                "error": { "code": status.as_u16(), "message": message, "status": code }
            }),
        };
        (status, axum::Json(body)).into_response()
    }

    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn database<T: Into<String>>(message: T) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    pub fn database_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn network<T: Into<String>>(message: T) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    pub fn network_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn auth<T: Into<String>>(message: T) -> Self {
        Self::InvalidProxyKey {
            message: message.into(),
        }
    }

    pub fn cache<T: Into<String>>(message: T) -> Self {
        // The gateway has no dedicated cache-error kind; moka caches fail
        // closed (treated as a miss), so a cache error is always a bug.
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "filesystem operation failed".to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for ProxyError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("failed to parse TOML", err)
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: "failed to process JSON".to_string(),
            source: err.into(),
        }
    }
}

impl From<sea_orm::error::DbErr> for ProxyError {
    fn from(err: sea_orm::error::DbErr) -> Self {
        Self::database_with_source("database operation failed", err)
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_with_source("HTTP request failed", err)
    }
}

impl From<config::ConfigError> for ProxyError {
    fn from(err: config::ConfigError) -> Self {
        Self::config_with_source("failed to load configuration", err)
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        // Default to the OpenAI envelope when no dialect context is available
        // (e.g. errors surfaced before the request's dialect is known).
        self.to_dialect_response(Dialect::OpenAi)
    }
}
