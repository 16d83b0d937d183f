use crate::error::NetworkError;
use anyhow::{Context, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Backoff for short-lived API retries: `base * 2^attempt`, capped at
/// 30x the base, scaled by a random 0.5..1.5 factor unless jitter is off.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub jitter: bool,
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            jitter: true,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let cap = self.base_delay_ms.saturating_mul(30);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(cap) as f64;

        let delay_ms = if self.jitter {
            delay_ms * rand::thread_rng().gen_range(0.5..=1.5)
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }
}

/// Retries `operation` while the error looks transient (see [`is_transient_error`]).
/// Anything else is returned straight away.
pub async fn with_retry<T, F, Fut>(
    config: RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt + 1);
                }
                return Ok(result);
            }
            Err(e) if attempt < config.max_retries && is_transient_error(&e) => {
                let delay = config.calculate_delay(attempt);
                debug!(
                    "{} failed (attempt {}/{}). Retrying in {:?}: {}",
                    operation_name,
                    attempt + 1,
                    config.max_retries + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                let error_msg = format!("{}", e);
                return Err(e).context(format!(
                    "{} failed after {} attempts. Last error: {}",
                    operation_name,
                    attempt + 1,
                    error_msg
                ));
            }
        }
    }
}

/// Typed `NetworkError`s decide by kind (server-side 5xx counts as
/// transient); anything else is matched on its message.
pub fn is_transient_error(error: &anyhow::Error) -> bool {
    if let Some(network) = error.downcast_ref::<NetworkError>() {
        return match network {
            NetworkError::Timeout { .. }
            | NetworkError::RateLimited { .. }
            | NetworkError::ConnectionRefused { .. } => true,
            NetworkError::HttpError { status_code, .. } => *status_code >= 500,
            NetworkError::InvalidResponse { .. } => false,
        };
    }

    let message = format!("{:?}", error).to_lowercase();
    [
        "timeout",
        "timed out",
        "connection refused",
        "connection reset",
        "connection closed",
        "error sending request",
        "service unavailable",
        "bad gateway",
        "too many requests",
    ]
    .iter()
    .any(|pattern| message.contains(pattern))
}

/// Bound for status polling against remote APIs.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    TimedOut { attempts: u32 },
}

/// Calls `check` until it yields `Some`, at most `max_attempts` times, sleeping
/// `interval` between calls. `check` receives the 1-based attempt number.
/// `Ok(None)` (not ready yet, a 404, ...) uses up an attempt; `Err` aborts the poll.
pub async fn poll_until<T, F, Fut>(
    config: PollConfig,
    operation_name: &str,
    mut check: F,
) -> Result<PollOutcome<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for attempt in 1..=config.max_attempts {
        if let Some(value) = check(attempt).await? {
            debug!("{} ready after {} checks", operation_name, attempt);
            return Ok(PollOutcome::Ready(value));
        }

        debug!(
            "{} not ready ({}/{})",
            operation_name, attempt, config.max_attempts
        );
        if attempt < config.max_attempts {
            tokio::time::sleep(config.interval).await;
        }
    }

    Ok(PollOutcome::TimedOut {
        attempts: config.max_attempts,
    })
}
