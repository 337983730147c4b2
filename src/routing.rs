use std::sync::Arc;

use anyhow::{Error, Result};
use tracing::{debug, warn};

use crate::{
    clients::{authorization::AuthorizationLookup, rbmq::Forwarder},
    models::{
        event::VehicleEvent,
        routing::{Channel, ForwardRecord, RoutingDecision},
    },
};

/// Splits an outgoing event across authorized partner channels.
pub struct ForwardingRouter {
    authorization: Arc<dyn AuthorizationLookup>,
    forwarder: Arc<dyn Forwarder>,
    service_id: String,
}

impl ForwardingRouter {
    pub fn new(
        authorization: Arc<dyn AuthorizationLookup>,
        forwarder: Arc<dyn Forwarder>,
        service_id: &str,
    ) -> Self {
        Self {
            authorization,
            forwarder,
            service_id: service_id.to_string(),
        }
    }

    /// Forwards one copy per authorized partner, in list order, each
    /// carrying that partner's qualifier. The input event is never changed.
    pub async fn route(&self, event: &VehicleEvent) -> Result<RoutingDecision, Error> {
        let event_type = event.event_type.to_uppercase();

        let partners = match self
            .authorization
            .lookup(&event.vehicle_id, &event_type, &self.service_id)
            .await
        {
            Ok(partners) => partners,
            Err(e) => {
                warn!(
                    vehicle_id = %event.vehicle_id,
                    event_type = %event_type,
                    error = %e,
                    "Authorization lookup failed, using default channel"
                );
                Vec::new()
            }
        };

        if partners.is_empty() {
            return Ok(RoutingDecision::DefaultChannel);
        }

        for partner in &partners {
            let copy = event.with_dff_qualifier(&partner.dff_qualifier);
            self.forwarder
                .forward(ForwardRecord::new(Channel::Partner, copy))
                .await?;

            debug!(
                vehicle_id = %event.vehicle_id,
                partner_id = %partner.partner_id,
                dff_qualifier = %partner.dff_qualifier,
                "Forwarded to partner"
            );
        }

        Ok(RoutingDecision::Partners(partners.len()))
    }

    /// Default-channel path: only events that already carry a qualifier
    /// are sent. Returns whether a forward happened.
    pub async fn forward_default(&self, event: &VehicleEvent) -> Result<bool, Error> {
        if event.dff_qualifier.is_empty() {
            debug!(
                vehicle_id = %event.vehicle_id,
                event_type = %event.event_type,
                "Empty qualifier, event not forwarded"
            );
            return Ok(false);
        }

        self.forwarder
            .forward(ForwardRecord::new(Channel::CallCenter, event.clone()))
            .await?;

        Ok(true)
    }
}
