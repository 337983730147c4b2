use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::{
    clients::config_service::RemoteConfig,
    mapping::{
        cache::{MappingCache, mapping_cache_key},
        local::LocalMappingStore,
    },
    models::{
        event::VehicleEvent,
        mapping::{CacheLookup, ConfigMap, StockingRuleConfig},
    },
};

/// Vehicle-scoped view over a [`MappingCache`]. Cache failures read as misses.
pub struct VehicleConfigCache {
    service_name: String,
    cache: Arc<dyn MappingCache>,
    ttl: Duration,
}

impl VehicleConfigCache {
    pub fn new(service_name: &str, cache: Arc<dyn MappingCache>, ttl: Duration) -> Self {
        Self {
            service_name: service_name.to_string(),
            cache,
            ttl,
        }
    }

    pub async fn get_from_cache(&self, vehicle_id: &str) -> Option<ConfigMap> {
        let key = mapping_cache_key(&self.service_name, vehicle_id);

        match self.cache.get(&key).await {
            Ok(CacheLookup::Hit(config)) => {
                debug!(vehicle_id, "Vehicle configuration cache hit");
                Some(config)
            }
            Ok(CacheLookup::Expired) => {
                debug!(vehicle_id, "Vehicle configuration cache entry expired");
                None
            }
            Ok(CacheLookup::Miss) => None,
            Err(e) => {
                warn!(vehicle_id, error = %e, "Mapping cache unavailable, treating as miss");
                None
            }
        }
    }

    pub async fn persist(&self, vehicle_id: &str, config: ConfigMap) {
        let key = mapping_cache_key(&self.service_name, vehicle_id);

        if let Err(e) = self.cache.put(&key, config, self.ttl).await {
            warn!(vehicle_id, error = %e, "Failed to persist vehicle configuration");
        }
    }
}

pub struct StockingRuleSource {
    rules: StockingRuleConfig,
    remote: Arc<dyn RemoteConfig>,
    cache: VehicleConfigCache,
}

impl StockingRuleSource {
    pub fn new(
        rules: StockingRuleConfig,
        remote: Arc<dyn RemoteConfig>,
        cache: VehicleConfigCache,
    ) -> Self {
        Self {
            rules,
            remote,
            cache,
        }
    }

    pub fn cache(&self) -> &VehicleConfigCache {
        &self.cache
    }

    async fn vehicle_config(&self, vehicle_id: &str) -> Option<ConfigMap> {
        if let Some(config) = self.cache.get_from_cache(vehicle_id).await {
            return Some(config);
        }

        let fetched = self
            .remote
            .fetch(
                &self.cache.service_name,
                vehicle_id,
                &self.rules.rule_name,
                &self.rules.schema_path,
            )
            .await;

        match fetched {
            Ok(config) if !config.is_empty() => {
                self.cache.persist(vehicle_id, config.clone()).await;
                Some(config)
            }
            Ok(_) => {
                debug!(vehicle_id, "No stocking rule configured for vehicle");
                None
            }
            Err(e) => {
                warn!(vehicle_id, error = %e, "Remote configuration lookup failed");
                None
            }
        }
    }

    fn mapping_name<'a>(&self, config: &'a ConfigMap) -> Option<&'a str> {
        config
            .get(&self.rules.mapping_key)
            .and_then(|value| value.as_str())
            .filter(|name| !name.is_empty())
    }
}

enum Mode {
    Static,
    StockingRule(StockingRuleSource),
}

/// Turns an identifier into a notification id. Never fails: every miss
/// degrades to the static table and then to `None`.
pub struct NotificationResolver {
    local: Arc<LocalMappingStore>,
    mode: Mode,
}

impl NotificationResolver {
    pub fn new_static(local: Arc<LocalMappingStore>) -> Self {
        Self {
            local,
            mode: Mode::Static,
        }
    }

    pub fn new_stocking_rule(local: Arc<LocalMappingStore>, source: StockingRuleSource) -> Self {
        Self {
            local,
            mode: Mode::StockingRule(source),
        }
    }

    pub fn local(&self) -> &LocalMappingStore {
        &self.local
    }

    pub fn stocking_rule_source(&self) -> Option<&StockingRuleSource> {
        match &self.mode {
            Mode::StockingRule(source) => Some(source),
            Mode::Static => None,
        }
    }

    pub async fn resolve(
        &self,
        event: &VehicleEvent,
        event_type: &str,
        identifier: &str,
    ) -> Option<String> {
        if let Mode::StockingRule(source) = &self.mode {
            if source.rules.is_eligible(event_type) {
                if let Some(notification_id) =
                    self.resolve_stocking_rule(source, &event.vehicle_id, identifier).await
                {
                    return Some(notification_id);
                }
            }
        }

        let notification_id = self.local.notification(identifier).map(str::to_string);

        if notification_id.is_none() {
            debug!(identifier, "No static notification mapping");
        }

        notification_id
    }

    async fn resolve_stocking_rule(
        &self,
        source: &StockingRuleSource,
        vehicle_id: &str,
        identifier: &str,
    ) -> Option<String> {
        let config = source.vehicle_config(vehicle_id).await?;

        let Some(mapping_name) = source.mapping_name(&config) else {
            debug!(vehicle_id, "Vehicle configuration has no notification mapping name");
            return None;
        };

        let notification_id = self
            .local
            .stocking_rule_notification(mapping_name, identifier)
            .map(str::to_string);

        debug!(
            vehicle_id,
            mapping_name,
            identifier,
            found = notification_id.is_some(),
            "Stocking rule mapping lookup"
        );

        notification_id
    }
}
