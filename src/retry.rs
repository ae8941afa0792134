//! Bounded exponential backoff around transient RPC failures

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::clock::Clock;
use crate::error::{AirdropError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt budget runs out.
    ///
    /// Only errors reporting [`AirdropError::is_transient`] are retried. Exhausting
    /// the budget yields [`AirdropError::TransientRpc`] carrying the last error.
    pub async fn run<T, F, Fut>(&self, clock: &dyn Clock, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    if attempt >= max_attempts {
                        error!("{} failed after {} attempts: {}", operation, attempt, e);
                        return Err(AirdropError::TransientRpc {
                            operation: operation.to_string(),
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed: {}, retrying in {:?}... (attempt {}/{})",
                        operation, e, delay, attempt, max_attempts
                    );
                    clock.sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
