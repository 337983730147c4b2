use std::sync::Arc;

use notification_router::{
    mapping::{
        dispatch::DispatchResolver,
        resolver::NotificationResolver,
        strategy::{DefaultStrategy, IdentifierStrategy},
    },
    models::event::ResponseCode,
};
use serde_json::json;

use crate::common::{DOORS, doors_event, extension, fixture_store};

fn dispatch() -> (DispatchResolver, Arc<NotificationResolver>) {
    let resolver = Arc::new(NotificationResolver::new_static(fixture_store()));
    (DispatchResolver::from_resolver(resolver.clone()), resolver)
}

/// Test: Registered architecture/ECU pairs use their strategy
#[tokio::test]
async fn test_registered_pair_uses_failure_reason_strategy() {
    let (dispatch, _) = dispatch();
    let event = doors_event("VIN1", "UNLOCKED", ResponseCode::CustomExtension)
        .with_custom_extension(extension(Some("NOT_AUTHORIZED"), Some(json!(20))));

    let notification = dispatch
        .get_notification(&event, "UNLOCKED", DOORS, "ARCH1", "TCU")
        .await;

    assert_eq!(notification.as_deref(), Some("ro_doors_not_authorized_pin"));
}

/// Test: Unknown pairs behave exactly like the default strategy
#[tokio::test]
async fn test_unknown_pair_matches_default_strategy() {
    let (dispatch, resolver) = dispatch();
    let event = doors_event("VIN1", "UNLOCKED", ResponseCode::CustomExtension)
        .with_custom_extension(extension(Some("NOT_AUTHORIZED"), Some(json!(20))));

    let expected = DefaultStrategy
        .resolve_notification(&resolver, &event, "UNLOCKED", DOORS)
        .await;

    for (arch, ecu) in [("ARCH9", "TCU"), ("ARCH1", "BCM"), ("ARCH2", "TCU"), ("", "")] {
        let notification = dispatch
            .get_notification(&event, "UNLOCKED", DOORS, arch, ecu)
            .await;
        assert_eq!(notification, expected, "pair ({}, {})", arch, ecu);
    }

    assert_eq!(expected.as_deref(), Some("ro_doors_not_authorized"));
}

/// Test: A strategy miss falls back to the raw response label
#[tokio::test]
async fn test_strategy_miss_falls_back_to_response_label() {
    let (dispatch, _) = dispatch();
    let event = doors_event("VIN1", "LOCKED", ResponseCode::FailDeliveryRetrying);

    let notification = dispatch
        .get_notification(&event, "LOCKED", DOORS, "ARCH1", "TCU")
        .await;

    assert_eq!(notification.as_deref(), Some("generic_retrying"));
}

/// Test: Nothing mapped anywhere yields no notification
#[tokio::test]
async fn test_complete_miss_returns_none() {
    let (dispatch, _) = dispatch();
    let event = doors_event("VIN1", "LOCKED", ResponseCode::FailInvalidState);

    let notification = dispatch
        .get_notification(&event, "LOCKED", DOORS, "ARCH1", "TCU")
        .await;

    assert!(notification.is_none());
}

/// Test: Event-carried architecture fields drive dispatch
#[tokio::test]
async fn test_resolve_event_reads_architecture_from_event() {
    let (dispatch, _) = dispatch();
    let event = doors_event("VIN1", "UNLOCKED", ResponseCode::CustomExtension)
        .with_custom_extension(extension(Some("NOT_AUTHORIZED"), Some(json!(20))))
        .with_architecture("ARCH1", "TCU");

    let notification = dispatch.resolve_event(&event).await;

    assert_eq!(notification.as_deref(), Some("ro_doors_not_authorized_pin"));
}
