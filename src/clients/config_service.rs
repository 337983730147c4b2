use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::{clients::circuit_breaker::CircuitBreaker, models::mapping::ConfigMap};

/// Per-vehicle configuration source. An empty map means the vehicle has no
/// configuration for the requested rule.
#[async_trait]
pub trait RemoteConfig: Send + Sync {
    async fn fetch(
        &self,
        service_tag: &str,
        vehicle_id: &str,
        rule_name: &str,
        schema_path: &str,
    ) -> Result<ConfigMap, Error>;
}

pub struct HttpRemoteConfig {
    http_client: Client,
    base_url: String,
    circuit_breaker: Option<CircuitBreaker>,
}

impl HttpRemoteConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        info!(base_url, timeout_ms = timeout.as_millis() as u64, "Config service client initialized");

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

    async fn fetch_once(
        http_client: Client,
        url: String,
        query: [(&'static str, String); 3],
    ) -> Result<ConfigMap, Error> {
        let response = http_client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| anyhow!("Config service request failed: {}", e))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(ConfigMap::new());
        }

        if !status.is_success() {
            return Err(anyhow!("Config service returned status {}", status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| anyhow!("Failed to read config service response: {}", e))?;

        if body.is_empty() {
            return Ok(ConfigMap::new());
        }

        serde_json::from_slice::<Option<ConfigMap>>(&body)
            .map(Option::unwrap_or_default)
            .map_err(|e| anyhow!("Failed to parse config service JSON: {}", e))
    }
}

#[async_trait]
impl RemoteConfig for HttpRemoteConfig {
    async fn fetch(
        &self,
        service_tag: &str,
        vehicle_id: &str,
        rule_name: &str,
        schema_path: &str,
    ) -> Result<ConfigMap, Error> {
        let url = format!("{}/v1/vehicles/{}/config", self.base_url, vehicle_id);
        let query = [
            ("service", service_tag.to_string()),
            ("rule", rule_name.to_string()),
            ("schema", schema_path.to_string()),
        ];

        debug!(vehicle_id, rule_name, "Fetching vehicle configuration");

        let http_client = self.http_client.clone();

        match &self.circuit_breaker {
            Some(circuit_breaker) => {
                circuit_breaker
                    .call(|| Self::fetch_once(http_client, url, query))
                    .await
            }
            None => Self::fetch_once(http_client, url, query).await,
        }
    }
}
