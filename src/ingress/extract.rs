//! Proxy-key extraction and validation shared by every dialect handler.

use crate::app::Services;
use crate::error::{ProxyError, Result};
use axum::http::HeaderMap;
use entity::proxy_keys::Model as ProxyKeyRow;

/// Pulls the caller's proxy key from `Authorization: Bearer …` or
/// `x-goog-api-key`, then resolves and validates it against the store.
pub async fn authenticate(services: &Services, headers: &HeaderMap) -> Result<ProxyKeyRow> {
    let raw_key = bearer_token(headers)
        .or_else(|| header_str(headers, "x-goog-api-key"))
        .ok_or_else(|| ProxyError::auth("missing proxy key"))?;

    let proxy_key = services
        .key_manager()
        .validate_proxy_key(raw_key)
        .await?
        .ok_or_else(|| ProxyError::auth("unknown proxy key"))?;

    if !proxy_key.enabled {
        return Err(ProxyError::auth("proxy key disabled"));
    }
    Ok(proxy_key)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, axum::http::header::AUTHORIZATION.as_str())?.strip_prefix("Bearer ")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok()
}

pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .map(str::to_string)
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    header_str(headers, axum::http::header::USER_AGENT.as_str()).map(str::to_string)
}

/// Renders request headers as JSON for the request log, redacting the
/// caller's proxy key.
#[must_use]
pub fn safe_headers_json(headers: &HeaderMap) -> String {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        let name = name.as_str();
        if name.eq_ignore_ascii_case("authorization") || name.eq_ignore_ascii_case("x-goog-api-key") {
            continue;
        }
        if let Ok(value) = value.to_str() {
            map.insert(name.to_string(), serde_json::Value::String(value.to_string()));
        }
    }
    serde_json::Value::Object(map).to_string()
}
