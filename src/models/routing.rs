use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

use crate::models::event::VehicleEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Partner,
    CallCenter,
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Channel::Partner => write!(f, "partner"),
            Channel::CallCenter => write!(f, "call_center"),
        }
    }
}

/// One outbound hand-off. Each record owns its own copy of the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardRecord {
    pub key: String,
    pub channel: Channel,
    pub event: VehicleEvent,
}

impl ForwardRecord {
    pub fn new(channel: Channel, event: VehicleEvent) -> Self {
        Self {
            key: event.vehicle_id.clone(),
            channel,
            event,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Sent to this many partners; the default channel must be skipped.
    Partners(usize),
    DefaultChannel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    NoNotification,
    ForwardedToPartners(usize),
    ForwardedToCallCenter,
    Suppressed,
}
