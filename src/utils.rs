use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

use crate::models::retry::RetryConfig;

/// Runs `operation` until it succeeds or `config.max_attempts` calls have
/// failed, returning the last error in that case.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay_ms = config.initial_delay_ms;
    let mut attempt: u32 = 1;

    loop {
        let error = match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => e,
        };

        if attempt >= config.max_attempts {
            warn!(attempts = attempt, error = %error, "Giving up after final attempt");
            return Err(error);
        }

        let wait_ms = with_jitter(delay_ms);
        debug!(attempt, wait_ms, error = %error, "Attempt failed, retrying");
        sleep(Duration::from_millis(wait_ms)).await;

        delay_ms = config.next_delay_ms(delay_ms);
        attempt += 1;
    }
}

// ±10%
fn with_jitter(delay_ms: u64) -> u64 {
    let factor = 1.0 + rand::random_range(-0.1..=0.1);
    (delay_ms as f64 * factor) as u64
}
