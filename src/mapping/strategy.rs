use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::{mapping::resolver::NotificationResolver, models::event::VehicleEvent};

pub const DEFAULT_STRATEGY: &str = "default";
pub const FAILURE_REASON_STRATEGY: &str = "failure_reason";

/// Builds `EVENTTYPE_STATE_RESPONSE` with the response override applied.
pub fn default_identifier(event: &VehicleEvent, state: &str, event_type: &str) -> String {
    format!(
        "{}_{}_{}",
        event_type.to_uppercase(),
        state,
        event.response_label()
    )
}

/// Turns an event into a lookup identifier and resolves it. Implementations
/// must not mutate the event.
#[async_trait]
pub trait IdentifierStrategy: Send + Sync {
    fn build_identifier(&self, event: &VehicleEvent, state: &str, event_type: &str) -> String;

    async fn resolve_notification(
        &self,
        resolver: &NotificationResolver,
        event: &VehicleEvent,
        state: &str,
        event_type: &str,
    ) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStrategy;

#[async_trait]
impl IdentifierStrategy for DefaultStrategy {
    fn build_identifier(&self, event: &VehicleEvent, state: &str, event_type: &str) -> String {
        default_identifier(event, state, event_type)
    }

    async fn resolve_notification(
        &self,
        resolver: &NotificationResolver,
        event: &VehicleEvent,
        state: &str,
        event_type: &str,
    ) -> Option<String> {
        let identifier = self.build_identifier(event, state, event_type);
        resolver.resolve(event, event_type, &identifier).await
    }
}

/// Appends the custom extension's failure reason code to the default
/// identifier, falling back to the plain identifier when the enhanced one
/// has no mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureReasonStrategy;

#[async_trait]
impl IdentifierStrategy for FailureReasonStrategy {
    fn build_identifier(&self, event: &VehicleEvent, state: &str, event_type: &str) -> String {
        let identifier = default_identifier(event, state, event_type);

        match event.failure_reason_code() {
            Some(code) => format!("{}_{}", identifier, code),
            None => identifier,
        }
    }

    async fn resolve_notification(
        &self,
        resolver: &NotificationResolver,
        event: &VehicleEvent,
        state: &str,
        event_type: &str,
    ) -> Option<String> {
        let identifier = self.build_identifier(event, state, event_type);

        if let Some(notification_id) = resolver.resolve(event, event_type, &identifier).await {
            return Some(notification_id);
        }

        let plain = default_identifier(event, state, event_type);
        if plain == identifier {
            return None;
        }

        debug!(
            enhanced = %identifier,
            plain = %plain,
            "No mapping for failure reason identifier, retrying plain identifier"
        );

        resolver.resolve(event, event_type, &plain).await
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    Default(DefaultStrategy),
    FailureReason(FailureReasonStrategy),
}

impl Strategy {
    fn inner(&self) -> &dyn IdentifierStrategy {
        match self {
            Strategy::Default(strategy) => strategy,
            Strategy::FailureReason(strategy) => strategy,
        }
    }
}

#[async_trait]
impl IdentifierStrategy for Strategy {
    fn build_identifier(&self, event: &VehicleEvent, state: &str, event_type: &str) -> String {
        self.inner().build_identifier(event, state, event_type)
    }

    async fn resolve_notification(
        &self,
        resolver: &NotificationResolver,
        event: &VehicleEvent,
        state: &str,
        event_type: &str,
    ) -> Option<String> {
        self.inner()
            .resolve_notification(resolver, event, state, event_type)
            .await
    }
}

/// Strategy key → strategy, fixed at startup.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Strategy>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    pub fn with_builtin() -> Self {
        Self::new()
            .register(DEFAULT_STRATEGY, Strategy::Default(DefaultStrategy))
            .register(
                FAILURE_REASON_STRATEGY,
                Strategy::FailureReason(FailureReasonStrategy),
            )
    }

    pub fn register(mut self, key: &str, strategy: Strategy) -> Self {
        self.strategies.insert(key.to_string(), strategy);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Strategy> {
        self.strategies.get(key)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
