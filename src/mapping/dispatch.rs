use std::sync::Arc;

use tracing::debug;

use crate::{
    mapping::{
        local::DispatchTable,
        resolver::NotificationResolver,
        strategy::{DefaultStrategy, IdentifierStrategy, StrategyRegistry},
    },
    models::event::VehicleEvent,
};

/// Picks an identifier strategy per (architecture, ECU) pair.
pub struct DispatchResolver {
    resolver: Arc<NotificationResolver>,
    dispatch: DispatchTable,
    registry: StrategyRegistry,
    default_strategy: DefaultStrategy,
}

impl DispatchResolver {
    pub fn new(
        resolver: Arc<NotificationResolver>,
        dispatch: DispatchTable,
        registry: StrategyRegistry,
    ) -> Self {
        Self {
            resolver,
            dispatch,
            registry,
            default_strategy: DefaultStrategy,
        }
    }

    /// Uses the dispatch table shipped in the static mapping file.
    pub fn from_resolver(resolver: Arc<NotificationResolver>) -> Self {
        let dispatch = resolver.local().dispatch().clone();
        Self::new(resolver, dispatch, StrategyRegistry::with_builtin())
    }

    fn select(&self, arch_type: &str, ecu_type: &str) -> &dyn IdentifierStrategy {
        let strategy = self
            .dispatch
            .get(arch_type)
            .and_then(|ecus| ecus.get(ecu_type))
            .and_then(|key| self.registry.get(key));

        match strategy {
            Some(strategy) => strategy,
            None => &self.default_strategy,
        }
    }

    pub async fn get_notification(
        &self,
        event: &VehicleEvent,
        state: &str,
        event_type: &str,
        arch_type: &str,
        ecu_type: &str,
    ) -> Option<String> {
        let strategy = self.select(arch_type, ecu_type);

        if let Some(notification_id) = strategy
            .resolve_notification(&self.resolver, event, state, event_type)
            .await
        {
            return Some(notification_id);
        }

        let response = event.response_label();
        let notification_id = self
            .resolver
            .local()
            .notification(&response)
            .map(str::to_string);

        debug!(
            vehicle_id = %event.vehicle_id,
            arch_type,
            ecu_type,
            response = %response,
            found = notification_id.is_some(),
            "Strategy produced no notification, tried raw response mapping"
        );

        notification_id
    }

    /// Resolves using the architecture and ECU carried on the event.
    pub async fn resolve_event(&self, event: &VehicleEvent) -> Option<String> {
        self.get_notification(
            event,
            &event.state,
            &event.event_type,
            event.arch_type.as_deref().unwrap_or_default(),
            event.ecu_type.as_deref().unwrap_or_default(),
        )
        .await
    }
}
