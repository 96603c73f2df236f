//! Rate limiter trait used by the decision service.

use async_trait::async_trait;

use super::limiter::{Decision, RateLimiter};

/// Trait for rate limiter implementations.
///
/// The gRPC service is generic over this so that a limiter backed by a
/// shared store can stand in for the in-memory one. Implementations read
/// the current time from their own clock.
#[async_trait]
pub trait RateLimiterBackend: Send + Sync {
    /// Decide on a request without recording it.
    async fn evaluate(&self, client_key: &str, path: &str) -> Decision;

    /// Record a request.
    async fn record(&self, client_key: &str, path: &str);

    /// Decide on a request and record it if admitted.
    async fn check(&self, client_key: &str, path: &str) -> Decision;
}

#[async_trait]
impl RateLimiterBackend for RateLimiter {
    async fn evaluate(&self, client_key: &str, path: &str) -> Decision {
        RateLimiter::evaluate(self, client_key, path, self.now())
    }

    async fn record(&self, client_key: &str, path: &str) {
        RateLimiter::record(self, client_key, path, self.now())
    }

    async fn check(&self, client_key: &str, path: &str) -> Decision {
        RateLimiter::check(self, client_key, path, self.now())
    }
}
