use std::{sync::Arc, time::Duration};

use notification_router::{
    mapping::{
        cache::{MappingCache, mapping_cache_key},
        resolver::{NotificationResolver, StockingRuleSource, VehicleConfigCache},
    },
    models::{event::ResponseCode, mapping::ConfigMap},
};
use serde_json::json;
use tokio::time::sleep;

use crate::common::{
    BrokenCache, DOORS, FakeRemoteConfig, RemoteReply, SERVICE_NAME, doors_event, fixture_store,
    fleet_config, stocking_rule_resolver, stocking_rules,
};

const UNLOCKED_SUCCESS: &str = "REMOTEOPERATIONDOORS_UNLOCKED_SUCCESS";

/// Test: Static mode reads the local table only
#[tokio::test]
async fn test_static_mode_uses_local_table() {
    let resolver = NotificationResolver::new_static(fixture_store());
    let event = doors_event("VIN1", "UNLOCKED", ResponseCode::Success);

    assert_eq!(
        resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await.as_deref(),
        Some("ro_doors_unlocked")
    );
    assert!(resolver.resolve(&event, DOORS, "UNKNOWN_ID").await.is_none());
}

/// Test: Cache miss fetches remotely, persists, then serves from cache
#[tokio::test]
async fn test_stocking_rule_fetches_once_then_hits_cache() {
    let harness = stocking_rule_resolver(
        FakeRemoteConfig::default().with_reply("VIN1", RemoteReply::Config(fleet_config())),
        Duration::from_secs(60),
    );
    let event = doors_event("VIN1", "UNLOCKED", ResponseCode::Success);

    let first = harness.resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await;
    let second = harness.resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await;

    assert_eq!(first.as_deref(), Some("fleet_doors_unlocked"));
    assert_eq!(second, first);
    assert_eq!(harness.remote.calls(), 1);
    assert_eq!(harness.cache.len(), 1);
}

/// Test: Empty remote results are not cached and are retried every time
#[tokio::test]
async fn test_empty_remote_result_is_not_cached() {
    let harness = stocking_rule_resolver(FakeRemoteConfig::default(), Duration::from_secs(60));
    let event = doors_event("VIN2", "UNLOCKED", ResponseCode::Success);

    for _ in 0..3 {
        let notification = harness.resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await;
        assert_eq!(notification.as_deref(), Some("ro_doors_unlocked"));
    }

    assert_eq!(harness.remote.calls(), 3);
    assert!(harness.cache.is_empty());
}

/// Test: Remote failures fall through to the static table
#[tokio::test]
async fn test_remote_failure_falls_back_to_static_table() {
    let harness = stocking_rule_resolver(
        FakeRemoteConfig::default().with_reply("VIN3", RemoteReply::Fail),
        Duration::from_secs(60),
    );
    let event = doors_event("VIN3", "UNLOCKED", ResponseCode::Success);

    let notification = harness.resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await;

    assert_eq!(notification.as_deref(), Some("ro_doors_unlocked"));
    assert!(harness.cache.is_empty());
}

/// Test: Events outside the eligible set never reach the config service
#[tokio::test]
async fn test_ineligible_event_skips_remote_lookup() {
    let harness = stocking_rule_resolver(
        FakeRemoteConfig::default().with_reply("VIN1", RemoteReply::Config(fleet_config())),
        Duration::from_secs(60),
    );
    let event = doors_event("VIN1", "INHIBITED", ResponseCode::Success);

    let notification = harness
        .resolver
        .resolve(&event, "RemoteInhibit", "REMOTEINHIBIT_INHIBITED_SUCCESS")
        .await;

    assert_eq!(notification.as_deref(), Some("ri_inhibited"));
    assert_eq!(harness.remote.calls(), 0);
}

/// Test: Mapping name without an entry for the identifier uses the static table
#[tokio::test]
async fn test_missing_extended_entry_falls_back_to_static_table() {
    let harness = stocking_rule_resolver(
        FakeRemoteConfig::default().with_reply("VIN1", RemoteReply::Config(fleet_config())),
        Duration::from_secs(60),
    );
    let event = doors_event("VIN1", "LOCKED", ResponseCode::Success);

    let notification = harness
        .resolver
        .resolve(&event, DOORS, "REMOTEOPERATIONDOORS_LOCKED_SUCCESS")
        .await;

    assert_eq!(notification.as_deref(), Some("ro_doors_locked"));
}

/// Test: Configuration without a mapping name uses the static table
#[tokio::test]
async fn test_config_without_mapping_name_falls_back() {
    let mut config = ConfigMap::new();
    config.insert("unrelated".to_string(), json!(true));
    let harness = stocking_rule_resolver(
        FakeRemoteConfig::default().with_reply("VIN1", RemoteReply::Config(config)),
        Duration::from_secs(60),
    );
    let event = doors_event("VIN1", "UNLOCKED", ResponseCode::Success);

    let notification = harness.resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await;

    assert_eq!(notification.as_deref(), Some("ro_doors_unlocked"));
    assert_eq!(harness.cache.len(), 1, "non-empty config is still cached");
}

/// Test: Expired cache entries trigger a fresh remote lookup
#[tokio::test]
async fn test_expired_cache_entry_refetches() {
    let harness = stocking_rule_resolver(
        FakeRemoteConfig::default().with_reply("VIN1", RemoteReply::Config(fleet_config())),
        Duration::from_millis(50),
    );
    let event = doors_event("VIN1", "UNLOCKED", ResponseCode::Success);

    harness.resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await;
    sleep(Duration::from_millis(120)).await;
    let notification = harness.resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await;

    assert_eq!(notification.as_deref(), Some("fleet_doors_unlocked"));
    assert_eq!(harness.remote.calls(), 2);
}

/// Test: An unavailable cache behaves like a miss
#[tokio::test]
async fn test_unavailable_cache_is_treated_as_miss() {
    let remote = Arc::new(
        FakeRemoteConfig::default().with_reply("VIN1", RemoteReply::Config(fleet_config())),
    );
    let source = StockingRuleSource::new(
        stocking_rules(),
        remote.clone(),
        VehicleConfigCache::new(SERVICE_NAME, Arc::new(BrokenCache), Duration::from_secs(60)),
    );
    let resolver = NotificationResolver::new_stocking_rule(fixture_store(), source);
    let event = doors_event("VIN1", "UNLOCKED", ResponseCode::Success);

    let first = resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await;
    let second = resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await;

    assert_eq!(first.as_deref(), Some("fleet_doors_unlocked"));
    assert_eq!(second, first);
    assert_eq!(remote.calls(), 2);
}

/// Test: Persisted configuration reads back intact until the TTL passes
#[tokio::test]
async fn test_persist_then_get_from_cache_round_trip() {
    let harness = stocking_rule_resolver(FakeRemoteConfig::default(), Duration::from_millis(50));
    let cache = harness
        .resolver
        .stocking_rule_source()
        .expect("stocking rule mode")
        .cache();

    cache.persist("VIN7", fleet_config()).await;
    assert_eq!(cache.get_from_cache("VIN7").await, Some(fleet_config()));

    sleep(Duration::from_millis(120)).await;
    assert_eq!(cache.get_from_cache("VIN7").await, None);
}

/// Test: Cache keys combine service, vehicle and the mapping suffix
#[tokio::test]
async fn test_cache_key_layout() {
    let harness = stocking_rule_resolver(
        FakeRemoteConfig::default().with_reply("VIN1", RemoteReply::Config(fleet_config())),
        Duration::from_secs(60),
    );
    let event = doors_event("VIN1", "UNLOCKED", ResponseCode::Success);

    harness.resolver.resolve(&event, DOORS, UNLOCKED_SUCCESS).await;

    let key = mapping_cache_key(SERVICE_NAME, "VIN1");
    assert_eq!(key, "RO_VIN1_NOTIFICATION_MAPPING");
    assert!(harness.cache.get(&key).await.unwrap().into_value().is_some());
}
