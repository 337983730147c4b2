use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Raw configuration document returned by the config service for one vehicle.
pub type ConfigMap = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverMode {
    Static,
    StockingRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<V> {
    Hit(V),
    Expired,
    Miss,
}

impl<V> CacheLookup<V> {
    pub fn into_value(self) -> Option<V> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Expired | CacheLookup::Miss => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StockingRuleConfig {
    pub eligible_events: Vec<String>,
    pub rule_name: String,
    pub schema_path: String,
    pub mapping_key: String,
}

impl StockingRuleConfig {
    pub fn is_eligible(&self, event_type: &str) -> bool {
        self.eligible_events
            .iter()
            .any(|event| event.eq_ignore_ascii_case(event_type))
    }
}
