use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use notification_router::{
    clients::{authorization::AuthorizationLookup, config_service::RemoteConfig, rbmq::Forwarder},
    mapping::{
        cache::{MappingCache, TtlCache},
        local::LocalMappingStore,
        resolver::{NotificationResolver, StockingRuleSource, VehicleConfigCache},
    },
    models::{
        authorization::PartnerDetail,
        event::{CustomExtension, ResponseCode, VehicleEvent},
        mapping::{ConfigMap, StockingRuleConfig},
        routing::ForwardRecord,
    },
};
use serde_json::json;

pub const SERVICE_NAME: &str = "RO";
pub const SERVICE_ID: &str = "svc-ro";
pub const DOORS: &str = "RemoteOperationDoors";

pub fn fixture_store() -> Arc<LocalMappingStore> {
    let raw = include_str!("fixtures/notification_mapping.json");
    Arc::new(LocalMappingStore::from_json(raw).expect("fixture mapping must parse"))
}

pub fn doors_event(vehicle_id: &str, state: &str, response: ResponseCode) -> VehicleEvent {
    VehicleEvent::new(vehicle_id, "RemoteOperationResponse", DOORS, state, response)
}

pub fn extension(response: Option<&str>, failure_code: Option<serde_json::Value>) -> CustomExtension {
    let mut ext = CustomExtension::new();
    if let Some(response) = response {
        ext.insert("response".to_string(), json!(response));
    }
    if let Some(code) = failure_code {
        ext.insert("failureReasonCode".to_string(), code);
    }
    ext
}

pub fn fleet_config() -> ConfigMap {
    let mut config = ConfigMap::new();
    config.insert("notificationMappingName".to_string(), json!("FLEET"));
    config
}

pub fn stocking_rules() -> StockingRuleConfig {
    StockingRuleConfig {
        eligible_events: vec![DOORS.to_string()],
        rule_name: "notification-mapping".to_string(),
        schema_path: "/ro/notification".to_string(),
        mapping_key: "notificationMappingName".to_string(),
    }
}

pub enum RemoteReply {
    Config(ConfigMap),
    Fail,
}

/// Config service double that counts calls per vehicle.
#[derive(Default)]
pub struct FakeRemoteConfig {
    replies: Mutex<HashMap<String, RemoteReply>>,
    calls: AtomicUsize,
}

impl FakeRemoteConfig {
    pub fn with_reply(self, vehicle_id: &str, reply: RemoteReply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(vehicle_id.to_string(), reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteConfig for FakeRemoteConfig {
    async fn fetch(
        &self,
        service_tag: &str,
        vehicle_id: &str,
        _rule_name: &str,
        _schema_path: &str,
    ) -> Result<ConfigMap, Error> {
        assert_eq!(service_tag, SERVICE_NAME);
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.replies.lock().unwrap().get(vehicle_id) {
            Some(RemoteReply::Config(config)) => Ok(config.clone()),
            Some(RemoteReply::Fail) => Err(anyhow!("connection timed out")),
            None => Ok(ConfigMap::new()),
        }
    }
}

pub struct StockingRuleHarness {
    pub resolver: Arc<NotificationResolver>,
    pub remote: Arc<FakeRemoteConfig>,
    pub cache: Arc<TtlCache<ConfigMap>>,
}

pub fn stocking_rule_resolver(remote: FakeRemoteConfig, ttl: Duration) -> StockingRuleHarness {
    let remote = Arc::new(remote);
    let cache = Arc::new(TtlCache::<ConfigMap>::new());
    let shared: Arc<dyn MappingCache> = cache.clone();

    let source = StockingRuleSource::new(
        stocking_rules(),
        remote.clone(),
        VehicleConfigCache::new(SERVICE_NAME, shared, ttl),
    );

    StockingRuleHarness {
        resolver: Arc::new(NotificationResolver::new_stocking_rule(fixture_store(), source)),
        remote,
        cache,
    }
}

/// Cache that always fails, to exercise the cache-unavailable path.
pub struct BrokenCache;

#[async_trait]
impl MappingCache for BrokenCache {
    async fn get(
        &self,
        _key: &str,
    ) -> Result<notification_router::models::mapping::CacheLookup<ConfigMap>, Error> {
        Err(anyhow!("cache unavailable"))
    }

    async fn put(&self, _key: &str, _value: ConfigMap, _ttl: Duration) -> Result<(), Error> {
        Err(anyhow!("cache unavailable"))
    }
}

#[derive(Default)]
pub struct FakeAuthorization {
    partners: HashMap<(String, String), Vec<PartnerDetail>>,
    fail: bool,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeAuthorization {
    pub fn with_partners(mut self, vehicle_id: &str, event_type: &str, partners: Vec<PartnerDetail>) -> Self {
        self.partners
            .insert((vehicle_id.to_string(), event_type.to_string()), partners);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationLookup for FakeAuthorization {
    async fn lookup(
        &self,
        vehicle_id: &str,
        event_type_upper: &str,
        service_id: &str,
    ) -> Result<Vec<PartnerDetail>, Error> {
        self.calls.lock().unwrap().push((
            vehicle_id.to_string(),
            event_type_upper.to_string(),
            service_id.to_string(),
        ));

        if self.fail {
            return Err(anyhow!("authorization service unavailable"));
        }

        Ok(self
            .partners
            .get(&(vehicle_id.to_string(), event_type_upper.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingForwarder {
    records: Mutex<Vec<ForwardRecord>>,
}

impl RecordingForwarder {
    pub fn records(&self) -> Vec<ForwardRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forwarder for RecordingForwarder {
    async fn forward(&self, record: ForwardRecord) -> Result<(), Error> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}

pub struct FailingForwarder;

#[async_trait]
impl Forwarder for FailingForwarder {
    async fn forward(&self, _record: ForwardRecord) -> Result<(), Error> {
        Err(anyhow!("broker unavailable"))
    }
}
