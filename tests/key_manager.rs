//! Key Manager: availability predicate and selection-policy behavior against
//! the in-memory fake store.

mod common;

use chrono::{Duration, Utc};
use common::{sample_group, sample_proxy_key, FakeStore};
use entity::key_validations::Model as KeyValidationRow;
use orchestration_api::key_pool::{hash_key, KeyManager};
use orchestration_api::persistence::PersistenceStore;
use std::sync::Arc;

fn manager() -> (Arc<FakeStore>, KeyManager) {
    let store = Arc::new(FakeStore::new());
    let manager = KeyManager::new(store.clone());
    (store, manager)
}

#[tokio::test]
async fn untested_key_is_optimistically_available() {
    let (_store, km) = manager();
    assert!(km.is_available("g1", &hash_key("sk-one")).await.unwrap());
}

#[tokio::test]
async fn recently_failed_401_is_unavailable() {
    let (store, km) = manager();
    let hash = hash_key("sk-one");
    store.set_key_validation(KeyValidationRow {
        group_id: "g1".to_string(),
        api_key_hash: hash.clone(),
        is_valid: false,
        error_count: 1,
        last_error: Some("unauthorized".to_string()),
        last_status_code: Some(401),
        last_validated_at: Utc::now(),
    });
    assert!(!km.is_available("g1", &hash).await.unwrap());
}

#[tokio::test]
async fn repeated_errors_cool_down_for_an_hour() {
    let (store, km) = manager();
    let hash = hash_key("sk-one");
    store.set_key_validation(KeyValidationRow {
        group_id: "g1".to_string(),
        api_key_hash: hash.clone(),
        is_valid: false,
        error_count: 5,
        last_error: Some("server error".to_string()),
        last_status_code: Some(500),
        last_validated_at: Utc::now(),
    });
    assert!(!km.is_available("g1", &hash).await.unwrap());

    store.set_key_validation(KeyValidationRow {
        group_id: "g1".to_string(),
        api_key_hash: hash.clone(),
        is_valid: false,
        error_count: 5,
        last_error: Some("server error".to_string()),
        last_status_code: Some(500),
        last_validated_at: Utc::now() - Duration::hours(2),
    });
    assert!(km.is_available("g1", &hash).await.unwrap());
}

#[tokio::test]
async fn stale_validation_falls_back_to_error_count() {
    let (store, km) = manager();
    let hash = hash_key("sk-one");
    store.set_key_validation(KeyValidationRow {
        group_id: "g1".to_string(),
        api_key_hash: hash.clone(),
        is_valid: false,
        error_count: 1,
        last_error: None,
        last_status_code: Some(500),
        last_validated_at: Utc::now() - Duration::hours(25),
    });
    assert!(km.is_available("g1", &hash).await.unwrap());
}

#[tokio::test]
async fn next_key_round_robins_across_available_keys() {
    let (_store, km) = manager();
    let group = sample_group("g1", &["sk-a", "sk-b"], &["gpt-4"]);
    let first = km.next_key(&group).await.unwrap().unwrap();
    let second = km.next_key(&group).await.unwrap().unwrap();
    assert_ne!(first, second);
    let third = km.next_key(&group).await.unwrap().unwrap();
    assert_eq!(first, third);
}

#[tokio::test]
async fn next_key_returns_none_when_all_keys_unavailable() {
    let (store, km) = manager();
    let group = sample_group("g1", &["sk-a"], &["gpt-4"]);
    store.set_key_validation(KeyValidationRow {
        group_id: "g1".to_string(),
        api_key_hash: hash_key("sk-a"),
        is_valid: false,
        error_count: 1,
        last_error: Some("unauthorized".to_string()),
        last_status_code: Some(401),
        last_validated_at: Utc::now(),
    });
    assert!(km.next_key(&group).await.unwrap().is_none());
}

#[tokio::test]
async fn validate_proxy_key_caches_the_lookup() {
    let (store, km) = manager();
    store.insert_proxy_key(sample_proxy_key(1, "proxy-secret", &[]));

    let first = km.validate_proxy_key("proxy-secret").await.unwrap().unwrap();
    assert_eq!(first.id, 1);

    // Even if the backing row is removed, the cached hit still resolves.
    let second = km.validate_proxy_key("proxy-secret").await.unwrap().unwrap();
    assert_eq!(second.id, 1);

    assert!(km.validate_proxy_key("unknown").await.unwrap().is_none());
}

#[tokio::test]
async fn next_key_does_not_increment_usage_on_its_own() {
    let (store, km) = manager();
    let group = sample_group("g1", &["sk-a"], &["gpt-4"]);
    let picked = km.next_key(&group).await.unwrap().unwrap();
    let hash = hash_key(&picked);
    assert!(store.get_key_usage("g1", &hash).await.unwrap().is_none());
}

#[tokio::test]
async fn least_used_picks_the_key_with_fewer_completed_calls() {
    let (store, km) = manager();
    let mut group = sample_group("g1", &["sk-a", "sk-b"], &["gpt-4"]);
    group.balance_policy = "least_used".to_string();

    // `update_usage` (the dispatcher's success-path call) is the sole
    // increment point; a single completed call leaves usage_count == 1.
    let first = km.next_key(&group).await.unwrap().unwrap();
    km.update_usage("g1", &first).await.unwrap();
    let first_hash = hash_key(&first);
    let first_usage = store.get_key_usage("g1", &first_hash).await.unwrap().unwrap();
    assert_eq!(first_usage.usage_count, 1);

    let second = km.next_key(&group).await.unwrap().unwrap();
    assert_ne!(second, first);
    km.update_usage("g1", &second).await.unwrap();
    let second_hash = hash_key(&second);
    let second_usage = store.get_key_usage("g1", &second_hash).await.unwrap().unwrap();
    assert_eq!(second_usage.usage_count, 1);
}

#[tokio::test]
async fn check_rpm_uses_the_tighter_of_proxy_and_group_limits() {
    let (_store, km) = manager();
    assert!(km.check_rpm(1, 0, 0).await.unwrap());
    assert!(km.check_rpm(1, 10, 0).await.unwrap());
}
