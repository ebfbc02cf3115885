//! Retry with exponential backoff.
//!
//! After failed attempt `i` (0-based) the caller waits `base_delay * 2^i`
//! before trying again. No jitter is applied. The error of the last attempt
//! is returned once every attempt has failed.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Number of attempts and base delay for [`request_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&lsconfig::RetrySettings> for RetryPolicy {
    fn from(settings: &lsconfig::RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: settings.base_delay(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay to observe after the failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `operation` under this policy.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        request_with_retry(operation, self.max_attempts, self.base_delay).await
    }
}

/// Runs `operation` up to `max_attempts` times (at least once).
///
/// # Example
///
/// ```no_run
/// # use lsclient::{request_with_retry, LiveStreamClient};
/// # use std::time::Duration;
/// # async fn example(client: LiveStreamClient) -> lsclient::Result<()> {
/// let info = request_with_retry(|| client.get_server_info(), 3, Duration::from_secs(1)).await?;
/// println!("{} {}", info.name, info.version);
/// # Ok(())
/// # }
/// ```
pub async fn request_with_retry<T, E, F, Fut>(
    mut operation: F,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let policy = RetryPolicy::new(max_attempts.max(1), base_delay);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 >= policy.max_attempts => {
                debug!(attempts = policy.max_attempts, "Giving up: {}", err);
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                info!(
                    "⏳ Retry {}/{} in {:?} ({})",
                    attempt + 1,
                    policy.max_attempts,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
