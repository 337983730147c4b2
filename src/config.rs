use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::{
    circuit_breaker::CircuitBreakerConfig,
    mapping::{CacheBackend, ResolverMode, StockingRuleConfig},
    retry::RetryConfig,
};

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub rabbitmq_url: String,
    pub inbound_queue_name: String,
    pub partner_queue_name: String,
    pub call_center_queue_name: String,
    pub failed_queue_name: String,
    pub prefetch_count: u16,

    pub redis_url: String,
    pub mapping_cache_backend: CacheBackend,
    pub mapping_cache_ttl_seconds: u64,

    pub notification_mapping_path: String,
    pub resolver_mode: ResolverMode,
    #[serde(default)]
    pub stocking_rule_events: Vec<String>,
    #[serde(default)]
    pub stocking_rule_name: String,
    #[serde(default)]
    pub stocking_rule_schema_path: String,
    #[serde(default = "default_mapping_key")]
    pub stocking_rule_mapping_key: String,

    pub service_name: String,
    pub service_id: String,

    pub config_service_url: String,
    pub config_service_timeout_ms: u64,
    pub authorization_service_url: String,
    #[serde(default = "default_authorization_timeout_ms")]
    pub authorization_timeout_ms: u64,

    pub circuit_breaker_failure_threshold: u32,
    pub circuit_breaker_timeout_seconds: u64,
    pub circuit_breaker_success_threshold: u32,

    pub max_retry_attempts: u32,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub retry_backoff_multiplier: u64,

    pub worker_concurrency: usize,

    pub server_port: u16,
}

fn default_mapping_key() -> String {
    "notificationMappingName".to_string()
}

fn default_authorization_timeout_ms() -> u64 {
    2000
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;

        if config.resolver_mode == ResolverMode::StockingRule
            && config.stocking_rule_name.is_empty()
        {
            return Err(anyhow!(
                "STOCKING_RULE_NAME is required when RESOLVER_MODE is stocking_rule"
            ));
        }

        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retry_attempts,
            initial_delay_ms: self.initial_retry_delay_ms,
            max_delay_ms: self.max_retry_delay_ms,
            backoff_multiplier: self.retry_backoff_multiplier,
        }
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker_failure_threshold,
            timeout_seconds: self.circuit_breaker_timeout_seconds,
            success_threshold: self.circuit_breaker_success_threshold,
        }
    }

    pub fn stocking_rule_config(&self) -> StockingRuleConfig {
        StockingRuleConfig {
            eligible_events: self.stocking_rule_events.clone(),
            rule_name: self.stocking_rule_name.clone(),
            schema_path: self.stocking_rule_schema_path.clone(),
            mapping_key: self.stocking_rule_mapping_key.clone(),
        }
    }

    pub fn mapping_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.mapping_cache_ttl_seconds)
    }

    pub fn config_service_timeout(&self) -> Duration {
        Duration::from_millis(self.config_service_timeout_ms)
    }

    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_millis(self.authorization_timeout_ms)
    }
}
