use std::{collections::HashMap, path::Path};

use anyhow::{Error, Result, anyhow};
use serde::Deserialize;
use tracing::info;

/// Identifier → notification id.
pub type NotificationTable = HashMap<String, String>;

/// Architecture type → ECU type → strategy key.
pub type DispatchTable = HashMap<String, HashMap<String, String>>;

/// Static notification tables, loaded once at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalMappingStore {
    #[serde(default)]
    notifications: NotificationTable,

    #[serde(default)]
    stocking_rules: HashMap<String, NotificationTable>,

    #[serde(default)]
    dispatch: DispatchTable,
}

impl LocalMappingStore {
    pub fn new(notifications: NotificationTable) -> Self {
        Self {
            notifications,
            ..Default::default()
        }
    }

    pub fn with_stocking_rule(mut self, mapping_name: &str, table: NotificationTable) -> Self {
        self.stocking_rules.insert(mapping_name.to_string(), table);
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchTable) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, Error> {
        serde_json::from_str(raw).map_err(|e| anyhow!("Invalid notification mapping file: {}", e))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            anyhow!(
                "Failed to read notification mapping file {}: {}",
                path.display(),
                e
            )
        })?;

        let store = Self::from_json(&raw)?;

        info!(
            path = %path.display(),
            notifications = store.notifications.len(),
            stocking_rules = store.stocking_rules.len(),
            architectures = store.dispatch.len(),
            "Notification mapping loaded"
        );

        Ok(store)
    }

    pub fn notification(&self, identifier: &str) -> Option<&str> {
        self.notifications.get(identifier).map(String::as_str)
    }

    pub fn stocking_rule_notification(&self, mapping_name: &str, identifier: &str) -> Option<&str> {
        self.stocking_rules
            .get(mapping_name)?
            .get(identifier)
            .map(String::as_str)
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }
}
