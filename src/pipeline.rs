use anyhow::{Error, Result, anyhow};
use tracing::{debug, info};

use crate::{
    mapping::dispatch::DispatchResolver,
    models::{
        event::VehicleEvent,
        routing::{ProcessingOutcome, RoutingDecision},
    },
    routing::ForwardingRouter,
};

pub struct NotificationPipeline {
    dispatch: DispatchResolver,
    router: ForwardingRouter,
}

impl NotificationPipeline {
    pub fn new(dispatch: DispatchResolver, router: ForwardingRouter) -> Self {
        Self { dispatch, router }
    }

    pub async fn process_message(&self, payload: &str) -> Result<ProcessingOutcome, Error> {
        let event = serde_json::from_str::<VehicleEvent>(payload)
            .map_err(|e| anyhow!("Invalid vehicle event payload: {}", e))?;

        self.process_event(&event).await
    }

    pub async fn process_event(&self, event: &VehicleEvent) -> Result<ProcessingOutcome, Error> {
        debug!(
            vehicle_id = %event.vehicle_id,
            event_id = %event.event_id,
            event_type = %event.event_type,
            state = %event.state,
            response = %event.response,
            "Processing vehicle event"
        );

        let Some(notification_id) = self.dispatch.resolve_event(event).await else {
            debug!(
                vehicle_id = %event.vehicle_id,
                event_type = %event.event_type,
                "No notification mapping, event dropped"
            );
            return Ok(ProcessingOutcome::NoNotification);
        };

        let outgoing = event.with_notification_id(&notification_id);

        let outcome = match self.router.route(&outgoing).await? {
            RoutingDecision::Partners(count) => ProcessingOutcome::ForwardedToPartners(count),
            RoutingDecision::DefaultChannel => {
                if self.router.forward_default(&outgoing).await? {
                    ProcessingOutcome::ForwardedToCallCenter
                } else {
                    ProcessingOutcome::Suppressed
                }
            }
        };

        info!(
            vehicle_id = %event.vehicle_id,
            notification_id = %notification_id,
            outcome = ?outcome,
            "Vehicle event processed"
        );

        Ok(outcome)
    }
}
