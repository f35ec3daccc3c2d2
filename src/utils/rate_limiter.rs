use opentelemetry::KeyValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, sleep};
use tracing::{debug, info};

use crate::metrics::Metrics;
use crate::models::common::ThrottleConfig;

/// Throttle spaces explorer calls at `1 / max_calls_per_second` and adds two
/// periodic cooldowns on top: a short pause every `short_pause_every` calls and
/// a long recovery pause every `long_pause_every` calls. Both cooldowns are
/// checked independently, so a call count that is a multiple of both pays both.
///
/// Grants are serialized behind a single lock, which keeps the rate and the
/// cooldown schedule global even when several tasks share one throttle.
pub struct Throttle {
    // Minimum spacing between two granted calls
    min_interval: Duration,

    short_pause_every: u64,
    short_pause: Duration,
    long_pause_every: u64,
    long_pause: Duration,

    state: Mutex<ThrottleState>,

    // Mirrors `state.calls` for lock-free reporting
    call_count: AtomicU64,

    metrics: Option<Arc<Metrics>>,
}

struct ThrottleState {
    last_call: Option<Instant>,
    calls: u64,
}

/// Returned by [`Throttle::acquire`] once the caller may issue its request.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleGrant {
    pub call_number: u64,
    pub granted_at: Instant,
}

impl Throttle {
    pub fn new(config: &ThrottleConfig, metrics: Option<Arc<Metrics>>) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(1.0 / config.max_calls_per_second),
            short_pause_every: config.short_pause_every,
            short_pause: Duration::from_secs_f64(config.short_pause_secs),
            long_pause_every: config.long_pause_every,
            long_pause: Duration::from_secs_f64(config.long_pause_secs),
            state: Mutex::new(ThrottleState {
                last_call: None,
                calls: 0,
            }),
            call_count: AtomicU64::new(0),
            metrics,
        }
    }

    /// Wait until the next call is permitted, then record it.
    pub async fn acquire(&self) -> ThrottleGrant {
        let mut state = self.state.lock().await;

        // The very first call passes immediately
        if let Some(last_call) = state.last_call {
            let since_last = last_call.elapsed();
            if since_last < self.min_interval {
                let wait = self.min_interval - since_last;
                debug!("Rate limiting: sleeping {:.2}s...", wait.as_secs_f64());
                sleep(wait).await;
            }
        }

        let granted_at = Instant::now();
        state.last_call = Some(granted_at);
        state.calls += 1;
        let call_number = state.calls;
        self.call_count.store(call_number, Ordering::Relaxed);

        if self.short_pause_every > 0 && call_number % self.short_pause_every == 0 {
            info!(
                "Extended safety pause of {}s after {} API calls",
                self.short_pause.as_secs_f64(),
                call_number
            );
            self.record_pause("short");
            sleep(self.short_pause).await;
        }

        if self.long_pause_every > 0 && call_number % self.long_pause_every == 0 {
            info!(
                "Server recovery pause of {}s after {} API calls",
                self.long_pause.as_secs_f64(),
                call_number
            );
            self.record_pause("long");
            sleep(self.long_pause).await;
        }

        ThrottleGrant {
            call_number,
            granted_at,
        }
    }

    /// Number of calls granted so far.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn max_calls_per_second(&self) -> f64 {
        1.0 / self.min_interval.as_secs_f64()
    }

    fn record_pause(&self, kind: &'static str) {
        if let Some(metrics) = &self.metrics {
            metrics.throttle_pauses.add(
                1,
                &[
                    KeyValue::new("chain", metrics.chain_name.clone()),
                    KeyValue::new("kind", kind),
                ],
            );
        }
    }
}
