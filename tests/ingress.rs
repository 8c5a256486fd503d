//! Ingress: the axum router wired through a real `Services` instance
//! against an in-memory sqlite database and a fake upstream.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use orchestration_api::app::Services;
use orchestration_api::config::AppConfig;
use orchestration_api::database::{init_database, run_migrations};
use orchestration_api::ingress::build_router;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn test_db() -> DatabaseConnection {
    let db = init_database("sqlite::memory:", 5).await.unwrap();
    run_migrations(&db).await.unwrap();
    db
}

async fn seed_group(db: &DatabaseConnection, id: &str, base_url: &str, models: &[&str]) {
    let now = chrono::Utc::now();
    entity::group_configs::ActiveModel {
        id: Set(id.to_string()),
        provider_type: Set("openai".to_string()),
        base_url: Set(Some(base_url.to_string())),
        api_keys: Set(serde_json::json!(["sk-a"])),
        models: Set(serde_json::json!(models)),
        model_aliases: Set(serde_json::json!({})),
        parameter_overrides: Set(serde_json::json!({})),
        headers: Set(serde_json::json!({})),
        balance_policy: Set("round_robin".to_string()),
        retry_count: Set(1),
        timeout: Set(30),
        rpm_limit: Set(0),
        test_model: Set(None),
        priority: Set(0),
        enabled: Set(true),
        fake_streaming: Set(false),
        proxy_config: Set(None),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
}

async fn seed_proxy_key(db: &DatabaseConnection, id: i32, key_value: &str, allowed_groups: &[&str]) {
    let now = chrono::Utc::now();
    entity::proxy_keys::ActiveModel {
        id: Set(id),
        key_value: Set(key_value.to_string()),
        name: Set(format!("key-{id}")),
        description: Set(None),
        enabled: Set(true),
        rpm_limit: Set(0),
        allowed_groups: Set(serde_json::json!(allowed_groups)),
        group_balance_policy: Set("failover".to_string()),
        group_weights: Set(serde_json::json!({})),
        usage_count: Set(0),
        last_used_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
}

#[tokio::test]
async fn chat_completions_round_trips_through_a_fake_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "chatcmpl-1"})))
        .mount(&upstream)
        .await;

    let db = test_db().await;
    seed_group(&db, "g1", &upstream.uri(), &["gpt-4"]).await;
    seed_proxy_key(&db, 1, "proxy-secret", &[]).await;

    let services = Services::initialize(AppConfig::default(), db).unwrap();
    let router = build_router(services);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/chat/completions")
                .header("content-type", "application/json")
                .header("authorization", "Bearer proxy-secret")
                .body(Body::from(serde_json::json!({"model": "gpt-4", "messages": []}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_proxy_key_is_rejected_before_reaching_upstream() {
    let db = test_db().await;
    seed_group(&db, "g1", "http://127.0.0.1:1", &["gpt-4"]).await;

    let services = Services::initialize(AppConfig::default(), db).unwrap();
    let router = build_router(services);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/chat/completions")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::json!({"model": "gpt-4", "messages": []}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn healthz_reports_ok_without_authentication() {
    let db = test_db().await;
    let services = Services::initialize(AppConfig::default(), db).unwrap();
    let router = build_router(services);

    let response = router
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_model_yields_a_no_available_provider_error_with_no_upstream_call() {
    let db = test_db().await;
    seed_group(&db, "g1", "http://127.0.0.1:1", &["gpt-4"]).await;
    seed_proxy_key(&db, 1, "proxy-secret", &[]).await;

    let services = Services::initialize(AppConfig::default(), db).unwrap();
    let router = build_router(services);

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/chat/completions")
                .header("content-type", "application/json")
                .header("authorization", "Bearer proxy-secret")
                .body(Body::from(serde_json::json!({"model": "unknown-model", "messages": []}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["error"]["code"], "no_available_provider");
    assert!(json["error"]["message"].as_str().unwrap().contains("unknown-model"));
}

#[tokio::test]
async fn list_models_only_returns_models_from_allowed_groups() {
    let db = test_db().await;
    seed_group(&db, "g1", "http://127.0.0.1:1", &["gpt-4"]).await;
    seed_group(&db, "g2", "http://127.0.0.1:1", &["gpt-3.5"]).await;
    seed_proxy_key(&db, 1, "proxy-secret", &["g1"]).await;

    let services = Services::initialize(AppConfig::default(), db).unwrap();
    let router = build_router(services);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .header("authorization", "Bearer proxy-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let ids: Vec<&str> = json["data"].as_array().unwrap().iter().map(|m| m["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["gpt-4"]);
}
