//! Dialect wire handlers: extract the proxy key, dispatch, render the
//! response in the caller's own envelope shape.

use super::extract::{authenticate, client_ip, safe_headers_json, user_agent};
use crate::app::Services;
use crate::dispatcher::{DispatchOutcome, DispatchRequest};
use crate::error::{Dialect, ProxyError, Result};
use crate::trace::StartParams;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn chat_completions(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    handle(services, headers, body, Dialect::OpenAi, "/v1/chat/completions", None).await
}

pub async fn messages(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    handle(services, headers, body, Dialect::Anthropic, "/v1/messages", None).await
}

pub async fn gemini_generate_content(
    State(services): State<Arc<Services>>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    handle(services, headers, body, Dialect::Gemini, "/v1beta/models/{model}:generateContent", Some(model)).await
}

pub async fn gemini_stream_generate_content(
    State(services): State<Arc<Services>>,
    Path(model): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    if let Value::Object(map) = &mut body {
        map.insert("stream".to_string(), Value::Bool(true));
    }
    handle(
        services,
        headers,
        body,
        Dialect::Gemini,
        "/v1beta/models/{model}:streamGenerateContent",
        Some(model),
    )
    .await
}

async fn handle(
    services: Arc<Services>,
    headers: HeaderMap,
    mut body: Value,
    dialect: Dialect,
    endpoint: &str,
    path_model: Option<String>,
) -> Response {
    let proxy_key = match authenticate(&services, &headers).await {
        Ok(key) => key,
        Err(err) => return err.to_dialect_response(dialect),
    };

    let model = path_model
        .or_else(|| body.get("model").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default();
    // Gemini carries the model in the URL, never in the body.
    if dialect != Dialect::Gemini {
        if let Value::Object(map) = &mut body {
            map.entry("model").or_insert_with(|| Value::String(model.clone()));
        }
    }
    let streaming = body.get("stream").and_then(Value::as_bool).unwrap_or(false);

    let request_id = match services
        .logger()
        .log_request_start(StartParams {
            method: "POST".to_string(),
            endpoint: endpoint.to_string(),
            body: Some(body.to_string()),
            headers: Some(safe_headers_json(&headers)),
            proxy_key_id: Some(proxy_key.id),
            client_ip: client_ip(&headers),
            user_agent: user_agent(&headers),
        })
        .await
    {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!(error = %err, "failed to record request log start");
            None
        }
    };

    let outcome = services
        .dispatcher()
        .dispatch(DispatchRequest {
            model,
            dialect,
            proxy_key: Some(proxy_key),
            body,
            streaming,
            request_id,
            cancellation: CancellationToken::new(),
        })
        .await;

    match outcome {
        Ok(outcome) => render(outcome),
        Err(err) => err.to_dialect_response(dialect),
    }
}

fn render(outcome: DispatchOutcome) -> Response {
    let status = axum::http::StatusCode::from_u16(outcome.status)
        .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    if let Some(stream) = outcome.stream {
        return (status, Body::from_stream(stream)).into_response();
    }
    let body = outcome.body.unwrap_or_default();
    (status, body).into_response()
}

#[derive(serde::Deserialize)]
pub struct ModelsQuery {
    #[serde(default)]
    dialect: Option<String>,
}

pub async fn list_models(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
    Query(query): Query<ModelsQuery>,
) -> Response {
    match list_models_inner(&services, &headers, query.dialect.as_deref()).await {
        Ok(body) => (axum::http::StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.to_dialect_response(Dialect::OpenAi),
    }
}

pub async fn list_models_gemini(
    State(services): State<Arc<Services>>,
    headers: HeaderMap,
) -> Response {
    match list_models_inner(&services, &headers, Some("gemini")).await {
        Ok(body) => (axum::http::StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.to_dialect_response(Dialect::Gemini),
    }
}

async fn list_models_inner(services: &Services, headers: &HeaderMap, dialect: Option<&str>) -> Result<Value> {
    let proxy_key = authenticate(services, headers).await?;
    let allowed: std::collections::HashSet<String> =
        serde_json::from_value(proxy_key.allowed_groups.clone()).unwrap_or_default();

    let mut ids = std::collections::BTreeSet::new();
    for group in services.store().list_enabled_groups().await? {
        if !allowed.is_empty() && !allowed.contains(&group.id) {
            continue;
        }
        if let Some(dialect) = dialect {
            if group.provider_type != dialect {
                continue;
            }
        }
        let models: Vec<String> = serde_json::from_value(group.models.clone()).unwrap_or_default();
        ids.extend(models);
        let aliases: HashMap<String, String> =
            serde_json::from_value(group.model_aliases.clone()).unwrap_or_default();
        ids.extend(aliases.into_keys());
    }

    Ok(serde_json::json!({
        "object": "list",
        "data": ids.into_iter().map(|id| serde_json::json!({"id": id, "object": "model"})).collect::<Vec<_>>(),
    }))
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn readyz(State(services): State<Arc<Services>>) -> Response {
    match services.store().ping().await {
        Ok(()) => (axum::http::StatusCode::OK, "ready").into_response(),
        Err(err) => ProxyError::database(err.to_string()).into_response(),
    }
}
