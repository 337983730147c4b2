use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::{
    clients::circuit_breaker::CircuitBreaker,
    models::authorization::{AuthorizationRecord, PartnerDetail},
};

/// Partners authorized to receive a vehicle's events of a given type.
#[async_trait]
pub trait AuthorizationLookup: Send + Sync {
    async fn lookup(
        &self,
        vehicle_id: &str,
        event_type_upper: &str,
        service_id: &str,
    ) -> Result<Vec<PartnerDetail>, Error>;
}

pub struct HttpAuthorizationClient {
    http_client: Client,
    base_url: String,
    circuit_breaker: Option<CircuitBreaker>,
}

impl HttpAuthorizationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        info!(base_url, "Authorization service client initialized");

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            circuit_breaker: None,
        })
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: CircuitBreaker) -> Self {
        self.circuit_breaker = Some(circuit_breaker);
        self
    }

    async fn lookup_once(
        http_client: Client,
        url: String,
        service_id: String,
    ) -> Result<Vec<PartnerDetail>, Error> {
        let response = http_client
            .get(&url)
            .query(&[("serviceId", service_id)])
            .send()
            .await
            .map_err(|e| anyhow!("Authorization request failed: {}", e))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        if !status.is_success() {
            return Err(anyhow!("Authorization service returned status {}", status));
        }

        let record: AuthorizationRecord = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse authorization JSON: {}", e))?;

        Ok(record.partners)
    }
}

#[async_trait]
impl AuthorizationLookup for HttpAuthorizationClient {
    async fn lookup(
        &self,
        vehicle_id: &str,
        event_type_upper: &str,
        service_id: &str,
    ) -> Result<Vec<PartnerDetail>, Error> {
        let url = format!(
            "{}/v1/authorizations/{}/{}",
            self.base_url, vehicle_id, event_type_upper
        );

        debug!(vehicle_id, event_type = event_type_upper, "Looking up partner authorization");

        let http_client = self.http_client.clone();
        let service_id = service_id.to_string();

        match &self.circuit_breaker {
            Some(circuit_breaker) => {
                circuit_breaker
                    .call(|| Self::lookup_once(http_client, url, service_id))
                    .await
            }
            None => Self::lookup_once(http_client, url, service_id).await,
        }
    }
}
