use std::{collections::HashMap, time::Instant};

use chrono::Utc;
use lapin::{Connection, ConnectionProperties};
use redis::aio::MultiplexedConnection;
use tracing::{debug, warn};

use crate::{
    clients::circuit_breaker::CircuitBreaker,
    config::Config,
    models::{
        circuit_breaker::CircuitState,
        health::{HealthCheckResponse, HealthStatus, ServiceHealth},
        mapping::CacheBackend,
    },
};

const CRITICAL_CHECKS: [&str; 2] = ["cache_service", "message_broker"];

pub struct HealthChecker {
    config: Config,
    redis: MultiplexedConnection,
    circuit_breakers: Vec<CircuitBreaker>,
}

impl HealthChecker {
    pub fn new(
        config: Config,
        redis: MultiplexedConnection,
        circuit_breakers: Vec<CircuitBreaker>,
    ) -> Self {
        Self {
            config,
            redis,
            circuit_breakers,
        }
    }

    pub async fn check_all(&self) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        checks.insert("cache_service".to_string(), self.check_cache().await);
        checks.insert("message_broker".to_string(), self.check_rabbitmq().await);

        for circuit_breaker in &self.circuit_breakers {
            checks.insert(
                circuit_breaker.service_name().to_string(),
                Self::check_circuit_breaker(circuit_breaker).await,
            );
        }

        HealthCheckResponse {
            status: determine_overall_status(&checks),
            timestamp: Utc::now(),
            checks,
        }
    }

    async fn check_cache(&self) -> ServiceHealth {
        if self.config.mapping_cache_backend == CacheBackend::Memory {
            return ServiceHealth::in_process();
        }

        let start = Instant::now();

        match redis::cmd("PING")
            .query_async::<String>(&mut self.redis.clone())
            .await
        {
            Ok(_) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "Redis health check passed");
                ServiceHealth::healthy(elapsed)
            }
            Err(e) => {
                warn!(error = %e, "Redis ping failed");
                ServiceHealth::unhealthy(format!("Ping failed: {}", e))
            }
        }
    }

    async fn check_rabbitmq(&self) -> ServiceHealth {
        let start = Instant::now();

        match Connection::connect(&self.config.rabbitmq_url, ConnectionProperties::default()).await
        {
            Ok(_) => {
                let elapsed = start.elapsed().as_millis() as u64;
                debug!(response_time_ms = elapsed, "RabbitMQ health check passed");
                ServiceHealth::healthy(elapsed)
            }
            Err(e) => {
                warn!(error = %e, "RabbitMQ connection failed");
                ServiceHealth::unhealthy(format!("Connection failed: {}", e))
            }
        }
    }

    async fn check_circuit_breaker(circuit_breaker: &CircuitBreaker) -> ServiceHealth {
        let service_name = circuit_breaker.service_name();

        match circuit_breaker.get_state().await {
            Ok(state) => {
                let state_str = state.as_str().to_string();
                debug!(
                    service = service_name,
                    circuit_state = %state_str,
                    "Circuit breaker state checked"
                );

                match state {
                    CircuitState::Closed => {
                        ServiceHealth::healthy(0).with_circuit_breaker(state_str)
                    }
                    CircuitState::HalfOpen => ServiceHealth::degraded(
                        state_str,
                        Some("Circuit breaker in recovery mode".to_string()),
                    ),
                    CircuitState::Open => ServiceHealth::degraded(state_str, None),
                }
            }
            Err(e) => {
                warn!(
                    service = service_name,
                    error = %e,
                    "Failed to check circuit breaker state"
                );
                ServiceHealth::unhealthy(format!("Cannot check circuit breaker: {}", e))
            }
        }
    }
}

/// Only the cache and the broker can make the worker unhealthy; anything
/// else degrades it.
pub fn determine_overall_status(checks: &HashMap<String, ServiceHealth>) -> HealthStatus {
    let critical_unhealthy = checks
        .iter()
        .filter(|(name, _)| CRITICAL_CHECKS.contains(&name.as_str()))
        .any(|(_, health)| health.status == HealthStatus::Unhealthy);

    let any_degraded = checks
        .values()
        .any(|health| health.status != HealthStatus::Healthy);

    if critical_unhealthy {
        HealthStatus::Unhealthy
    } else if any_degraded {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}
