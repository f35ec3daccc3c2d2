use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{error, warn};

use crate::models::errors::ExplorerError;
use crate::utils::strip_html;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential: f64,
}

impl RetryConfig {
    /// Same pause between every attempt.
    pub fn fixed(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            exponential: 1.0,
        }
    }

    /// Doubling pauses: base, 2*base, 4*base, ... capped at one minute.
    pub fn doubling(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms: 60_000,
            exponential: 2.0,
        }
    }

    /// Pause after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay_ms as f64 * self.exponential.powi(attempt as i32 - 1);
        Duration::from_millis(scaled.min(self.max_delay_ms as f64) as u64)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// exhausts `config.max_attempts`. `on_retry` is invoked before every pause.
pub async fn retry<F, Fut, T, R>(
    operation: F,
    config: &RetryConfig,
    context: &str,
    mut on_retry: R,
) -> Result<T, ExplorerError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ExplorerError>>,
    R: FnMut(&ExplorerError),
{
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => {
                warn!("Operation '{}' rejected, not retrying: {}", context, e);
                return Err(e);
            }
            Err(e) => {
                if attempt >= config.max_attempts {
                    error!(
                        "Operation '{}' failed after {} attempts. Final error: {}",
                        context,
                        attempt,
                        strip_html(&e.to_string())
                    );
                    return Err(e);
                }

                let delay = config.delay_for(attempt);
                warn!(
                    "Attempt {}/{} for '{}' failed: {}. Retrying in {}ms...",
                    attempt,
                    config.max_attempts,
                    context,
                    strip_html(&e.to_string()),
                    delay.as_millis()
                );
                on_retry(&e);

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
