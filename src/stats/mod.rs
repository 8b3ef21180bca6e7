//! Stats provider access.
//!
//! The gateway is the only network-bound collaborator. Callers above this
//! layer (trending cache, view updater) treat every [`StatsError`] as a
//! signal to degrade, never as something to surface.

mod backend;
mod memory;
mod wpcom;

use std::future::Future;
use std::time::Duration;

use tracing::debug;

pub use backend::{BoxedStatsGateway, StatsError, StatsGateway, StatsResult};
pub use memory::{StaticStatsGateway, StatsFixture};
pub use wpcom::WpcomStatsGateway;

/// Bounded retry settings for gateway calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,
    /// Base delay, doubled per attempt.
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            base_delay_ms: 0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            base_delay_ms: 250,
        }
    }
}

/// Calculate exponential backoff delay for a given attempt.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(10_000))
}

/// Run `op`, retrying retryable failures per `policy`.
pub async fn with_retries<T, F, Fut>(policy: RetryPolicy, mut op: F) -> StatsResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StatsResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.retries => {
                let delay = backoff_delay(attempt, policy.base_delay_ms);
                debug!("Stats call failed ({}), retrying in {:?}", e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
