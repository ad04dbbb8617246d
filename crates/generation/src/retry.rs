//! Bounded retry for collaborator calls. Retries share the request deadline:
//! a retry whose backoff would end past the deadline is not attempted.

use campaign_core::config::RetryConfig;
use campaign_core::CampaignResult;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.base_delay_ms)),
            jitter: Duration::from_millis(config.jitter_ms),
        }
    }

    /// Same delay between every attempt, no jitter.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: delay,
            max_delay: delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Exponential backoff after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay);
        if self.jitter.is_zero() {
            return backoff;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        backoff + Duration::from_millis(jitter_ms)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, runs out
    /// of attempts, or the next backoff would cross `deadline`.
    pub async fn run<T, F, Fut>(&self, stage: &'static str, deadline: Instant, mut op: F) -> CampaignResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = CampaignResult<T>>,
    {
        let mut attempt = 1;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= self.max_attempts {
                return Err(err);
            }
            let delay = self.delay_for(attempt);
            if Instant::now() + delay >= deadline {
                warn!(stage, attempt, error = %err, "Backoff would pass the deadline, giving up");
                return Err(err);
            }
            warn!(
                stage,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient failure, retrying"
            );
            metrics::counter!("generation.retries", "stage" => stage).increment(1);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
