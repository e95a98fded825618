//! Request budget for the airportdb API.

use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = GovLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Single-bucket limiter shared by every clone of the client.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limiter: Arc<DirectLimiter>,
}

impl RateLimiter {
    /// A zero budget is treated as one request per second.
    pub fn per_second(requests: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: Arc::new(GovLimiter::direct(quota)),
        }
    }

    /// Wait until a request slot is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    const PROMPT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_burst_is_capped_at_quota() {
        let limiter = RateLimiter::per_second(2);
        assert!(timeout(PROMPT, limiter.wait()).await.is_ok());
        assert!(timeout(PROMPT, limiter.clone().wait()).await.is_ok());
        assert!(timeout(PROMPT, limiter.wait()).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_budget_still_allows_one() {
        let limiter = RateLimiter::per_second(0);
        assert!(timeout(PROMPT, limiter.wait()).await.is_ok());
        assert!(timeout(PROMPT, limiter.wait()).await.is_err());
    }
}
