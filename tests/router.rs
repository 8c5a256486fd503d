//! Router: candidate filtering, group exclusion, and alias resolution.

mod common;

use common::{sample_group, sample_proxy_key, FakeStore};
use orchestration_api::error::{Dialect, ProxyError};
use orchestration_api::key_pool::KeyManager;
use orchestration_api::router::Router;
use std::collections::HashSet;
use std::sync::Arc;

fn router_with(store: Arc<FakeStore>) -> Router {
    let key_manager = Arc::new(KeyManager::new(store.clone()));
    Router::new(store, key_manager)
}

#[tokio::test]
async fn routes_to_the_only_group_serving_the_model() {
    let store = Arc::new(FakeStore::new());
    store.insert_group(sample_group("g1", &["sk-a"], &["gpt-4"]));
    let router = router_with(store);

    let result = router.route("gpt-4", None, None, &HashSet::new()).await.unwrap();
    assert_eq!(result.group.id, "g1");
    assert_eq!(result.resolved_model, "gpt-4");
}

#[tokio::test]
async fn unknown_model_yields_no_eligible_group() {
    let store = Arc::new(FakeStore::new());
    store.insert_group(sample_group("g1", &["sk-a"], &["gpt-4"]));
    let router = router_with(store);

    let err = router.route("unknown-model", None, None, &HashSet::new()).await.unwrap_err();
    assert!(matches!(err, ProxyError::NoEligibleGroup { .. }));
}

#[tokio::test]
async fn excluded_groups_are_skipped_in_favor_of_the_next_candidate() {
    let store = Arc::new(FakeStore::new());
    let mut low_priority = sample_group("g1", &["sk-a"], &["gpt-4"]);
    low_priority.priority = 0;
    let mut high_priority = sample_group("g2", &["sk-b"], &["gpt-4"]);
    high_priority.priority = 10;
    store.insert_group(low_priority);
    store.insert_group(high_priority);

    let proxy_key = sample_proxy_key(1, "proxy-secret", &[]);
    let router = router_with(store);

    let mut excluded = HashSet::new();
    let first = router.route("gpt-4", Some(&proxy_key), None, &excluded).await.unwrap();
    assert_eq!(first.group.id, "g2"); // failover picks highest priority first

    excluded.insert("g2".to_string());
    let second = router.route("gpt-4", Some(&proxy_key), None, &excluded).await.unwrap();
    assert_eq!(second.group.id, "g1");
}

#[tokio::test]
async fn allowed_groups_restricts_candidates_to_the_proxy_keys_whitelist() {
    let store = Arc::new(FakeStore::new());
    store.insert_group(sample_group("g1", &["sk-a"], &["gpt-4"]));
    store.insert_group(sample_group("g2", &["sk-b"], &["gpt-4"]));
    let proxy_key = sample_proxy_key(1, "proxy-secret", &["g2"]);
    let router = router_with(store);

    let result = router.route("gpt-4", Some(&proxy_key), None, &HashSet::new()).await.unwrap();
    assert_eq!(result.group.id, "g2");
}

#[tokio::test]
async fn model_alias_resolves_to_the_canonical_upstream_model() {
    let store = Arc::new(FakeStore::new());
    let mut group = sample_group("g1", &["sk-a"], &["gpt-4-turbo"]);
    group.model_aliases = serde_json::json!({"gpt-4": "gpt-4-turbo"});
    store.insert_group(group);
    let router = router_with(store);

    let result = router.route("gpt-4", None, None, &HashSet::new()).await.unwrap();
    assert_eq!(result.resolved_model, "gpt-4-turbo");
}

#[tokio::test]
async fn forced_dialect_filters_out_groups_of_other_providers() {
    let store = Arc::new(FakeStore::new());
    let mut anthropic_group = sample_group("g1", &["sk-a"], &["shared-model"]);
    anthropic_group.provider_type = "anthropic".to_string();
    store.insert_group(anthropic_group);
    let router = router_with(store);

    let err = router
        .route("shared-model", None, Some(Dialect::OpenAi), &HashSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::NoEligibleGroup { .. }));

    let ok = router
        .route("shared-model", None, Some(Dialect::Anthropic), &HashSet::new())
        .await
        .unwrap();
    assert_eq!(ok.group.id, "g1");
}
