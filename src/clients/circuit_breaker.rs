use anyhow::{Error, Result, anyhow};
use chrono::Utc;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tracing::{debug, info, warn};

use crate::models::circuit_breaker::{CircuitBreakerConfig, CircuitState, state_key};

/// Breaker state shared through Redis, so every worker replica sees the
/// same open/closed view of a downstream service.
#[derive(Clone)]
pub struct CircuitBreaker {
    service_name: String,
    connection: MultiplexedConnection,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(
        service_name: &str,
        connection: MultiplexedConnection,
        config: CircuitBreakerConfig,
    ) -> Self {
        info!(service = %service_name, "Circuit breaker initialized");

        Self {
            service_name: service_name.to_string(),
            connection,
            config,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, Error>>,
    {
        match self.get_state().await? {
            CircuitState::Open => {
                if self.should_attempt_reset().await? {
                    info!(service = %self.service_name, "Circuit breaker attempting reset");
                    self.set_state(CircuitState::HalfOpen).await?;
                    return self.try_operation(operation).await;
                }
                debug!(service = %self.service_name, "Circuit breaker is open, rejecting request");
                Err(anyhow!("Circuit breaker is open for {}", self.service_name))
            }
            CircuitState::HalfOpen | CircuitState::Closed => self.try_operation(operation).await,
        }
    }

    async fn try_operation<F, Fut, T>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, Error>>,
    {
        match operation().await {
            Ok(result) => {
                self.record_success().await?;
                Ok(result)
            }
            Err(e) => {
                self.record_failure().await?;
                Err(e)
            }
        }
    }

    async fn record_success(&self) -> Result<(), Error> {
        match self.get_state().await? {
            CircuitState::HalfOpen => {
                let successes = self.increment(&self.key("successes"), None).await?;
                debug!(
                    service = %self.service_name,
                    successes,
                    threshold = self.config.success_threshold,
                    "Circuit breaker success recorded"
                );

                if successes >= self.config.success_threshold {
                    self.set_state(CircuitState::Closed).await?;
                    self.reset_counters().await?;
                    info!(service = %self.service_name, "Circuit breaker closed after successful recovery");
                }
            }
            CircuitState::Closed => {
                self.connection
                    .clone()
                    .del::<_, ()>(self.key("failures"))
                    .await?;
            }
            CircuitState::Open => {}
        }

        Ok(())
    }

    async fn record_failure(&self) -> Result<(), Error> {
        if self.get_state().await? == CircuitState::HalfOpen {
            self.open().await?;
            warn!(service = %self.service_name, "Circuit breaker reopened after failed recovery attempt");
            return Ok(());
        }

        let failures = self
            .increment(&self.key("failures"), Some(self.config.timeout_seconds))
            .await?;
        debug!(
            service = %self.service_name,
            failures,
            threshold = self.config.failure_threshold,
            "Circuit breaker failure recorded"
        );

        if failures >= self.config.failure_threshold {
            self.open().await?;
            warn!(
                service = %self.service_name,
                failures,
                "Circuit breaker opened due to consecutive failures"
            );
        }

        Ok(())
    }

    fn key(&self, suffix: &str) -> String {
        format!("circuit:{}:{}", self.service_name, suffix)
    }

    pub async fn get_state(&self) -> Result<CircuitState, Error> {
        let value: Option<String> = self
            .connection
            .clone()
            .get(state_key(&self.service_name))
            .await?;

        Ok(value
            .map(|s| CircuitState::from_string(&s))
            .unwrap_or(CircuitState::Closed))
    }

    async fn set_state(&self, state: CircuitState) -> Result<(), Error> {
        self.connection
            .clone()
            .set::<_, _, ()>(state_key(&self.service_name), state.as_str())
            .await?;
        Ok(())
    }

    async fn open(&self) -> Result<(), Error> {
        self.set_state(CircuitState::Open).await?;
        self.connection
            .clone()
            .set::<_, _, ()>(self.key("opened_at"), Utc::now().timestamp())
            .await?;
        Ok(())
    }

    async fn increment(&self, key: &str, expire_seconds: Option<u64>) -> Result<u32, Error> {
        let mut conn = self.connection.clone();
        let count: u32 = conn.incr(key, 1).await?;
        if let Some(seconds) = expire_seconds {
            conn.expire::<_, ()>(key, seconds as i64).await?;
        }
        Ok(count)
    }

    async fn reset_counters(&self) -> Result<(), Error> {
        let keys = [
            self.key("failures"),
            self.key("successes"),
            self.key("opened_at"),
        ];
        self.connection.clone().del::<_, ()>(keys.to_vec()).await?;
        Ok(())
    }

    async fn should_attempt_reset(&self) -> Result<bool, Error> {
        let opened_at: Option<i64> = self.connection.clone().get(self.key("opened_at")).await?;

        Ok(opened_at
            .map(|opened_at| {
                let elapsed = Utc::now().timestamp().saturating_sub(opened_at);
                elapsed >= self.config.timeout_seconds as i64
            })
            .unwrap_or(false))
    }
}
