#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: u64,
}

impl RetryConfig {
    /// Delay before the attempt following one that waited `delay_ms`.
    pub fn next_delay_ms(&self, delay_ms: u64) -> u64 {
        delay_ms
            .saturating_mul(self.backoff_multiplier)
            .min(self.max_delay_ms)
    }
}
