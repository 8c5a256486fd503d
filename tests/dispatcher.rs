//! Dispatcher: retry/failover behavior against fake upstreams.

mod common;

use common::{sample_group, FakeStore};
use orchestration_api::config::{GlobalConfig, RequestLoggingConfig};
use orchestration_api::dispatcher::{DispatchRequest, Dispatcher};
use orchestration_api::error::Dialect;
use orchestration_api::key_pool::{hash_key, KeyManager};
use orchestration_api::persistence::PersistenceStore;
use orchestration_api::provider::{OpenAiAdapter, ProviderAdapter};
use orchestration_api::router::Router;
use orchestration_api::trace::RequestLogger;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build_dispatcher(store: Arc<FakeStore>, global: GlobalConfig) -> Dispatcher {
    let key_manager = Arc::new(KeyManager::new(store.clone()));
    let router = Arc::new(Router::new(store.clone(), key_manager.clone()));
    let logger = Arc::new(RequestLogger::new(store, None, RequestLoggingConfig::default()));
    let client = reqwest::Client::new();
    let mut adapters: HashMap<Dialect, Arc<dyn ProviderAdapter>> = HashMap::new();
    adapters.insert(Dialect::OpenAi, Arc::new(OpenAiAdapter::new(client)));
    Dispatcher::new(router, key_manager, logger, adapters, global)
}

fn request(model: &str, body: serde_json::Value) -> DispatchRequest {
    DispatchRequest {
        model: model.to_string(),
        dialect: Dialect::OpenAi,
        proxy_key: None,
        body,
        streaming: false,
        request_id: None,
        cancellation: CancellationToken::new(),
    }
}

fn streaming_request(model: &str, body: serde_json::Value) -> DispatchRequest {
    DispatchRequest { streaming: true, ..request(model, body) }
}

#[tokio::test]
async fn successful_upstream_call_returns_its_body_unchanged() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "chatcmpl-1"})))
        .mount(&upstream)
        .await;

    let store = Arc::new(FakeStore::new());
    let mut group = sample_group("g1", &["sk-a"], &["gpt-4"]);
    group.base_url = Some(upstream.uri());
    store.insert_group(group);

    let dispatcher = build_dispatcher(store.clone(), GlobalConfig::default());
    let outcome = dispatcher
        .dispatch(request("gpt-4", serde_json::json!({"messages": []})))
        .await
        .unwrap();

    assert_eq!(outcome.status, 200);
    let body = outcome.body.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("chatcmpl-1"));

    let usage = store
        .get_key_usage("g1", &hash_key("sk-a"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(usage.usage_count, 1);
}

#[tokio::test]
async fn invalid_key_rotates_to_the_next_key_in_the_group() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(wiremock::matchers::header("authorization", "Bearer sk-bad"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "invalid key"})))
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(wiremock::matchers::header("authorization", "Bearer sk-good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "chatcmpl-2"})))
        .mount(&upstream)
        .await;

    let store = Arc::new(FakeStore::new());
    let mut group = sample_group("g1", &["sk-bad", "sk-good"], &["gpt-4"]);
    group.base_url = Some(upstream.uri());
    group.balance_policy = "round_robin".to_string();
    store.insert_group(group);

    let dispatcher = build_dispatcher(store, GlobalConfig::default());
    let outcome = dispatcher
        .dispatch(request("gpt-4", serde_json::json!({"messages": []})))
        .await
        .unwrap();

    assert_eq!(outcome.status, 200);
}

#[tokio::test]
async fn permanent_upstream_error_fails_over_to_the_next_group() {
    let broken = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "bad request"})))
        .mount(&broken)
        .await;

    let healthy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "chatcmpl-3"})))
        .mount(&healthy)
        .await;

    let store = Arc::new(FakeStore::new());
    let mut broken_group = sample_group("g-broken", &["sk-a"], &["gpt-4"]);
    broken_group.base_url = Some(broken.uri());
    broken_group.priority = 10; // tried first: failover ranks by highest priority
    let mut healthy_group = sample_group("g-healthy", &["sk-b"], &["gpt-4"]);
    healthy_group.base_url = Some(healthy.uri());
    healthy_group.priority = 1;
    store.insert_group(broken_group);
    store.insert_group(healthy_group);

    let mut global = GlobalConfig::default();
    global.max_provider_retries = 3;
    let dispatcher = build_dispatcher(store, global);
    let outcome = dispatcher
        .dispatch(request("gpt-4", serde_json::json!({"messages": []})))
        .await
        .unwrap();

    assert_eq!(outcome.status, 200);
}

#[tokio::test]
async fn fake_streaming_group_makes_a_unary_call_and_synthesizes_one_sse_event() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "chatcmpl-4"})))
        .expect(1)
        .mount(&upstream)
        .await;

    let store = Arc::new(FakeStore::new());
    let mut group = sample_group("g1", &["sk-a"], &["gpt-4"]);
    group.base_url = Some(upstream.uri());
    group.fake_streaming = true;
    store.insert_group(group);

    let dispatcher = build_dispatcher(store, GlobalConfig::default());
    let outcome = dispatcher
        .dispatch(streaming_request("gpt-4", serde_json::json!({"messages": []})))
        .await
        .unwrap();

    assert_eq!(outcome.status, 200);
    assert!(outcome.body.is_none());
    let mut stream = outcome.stream.expect("fake_streaming must synthesize an SSE stream");
    let chunk = stream.next().await.expect("synthesized stream yields one chunk").unwrap();
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.starts_with("data: "));
    assert!(text.contains("chatcmpl-4"));
    assert!(text.ends_with("data: [DONE]\n\n"));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn exhausting_every_group_surfaces_a_no_eligible_group_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "bad request"})))
        .mount(&upstream)
        .await;

    let store = Arc::new(FakeStore::new());
    let mut group = sample_group("g1", &["sk-a"], &["gpt-4"]);
    group.base_url = Some(upstream.uri());
    store.insert_group(group);

    let dispatcher = build_dispatcher(store, GlobalConfig::default());
    let err = dispatcher
        .dispatch(request("gpt-4", serde_json::json!({"messages": []})))
        .await
        .unwrap_err();

    assert!(matches!(err, orchestration_api::error::ProxyError::NoEligibleGroup { .. }));
}
