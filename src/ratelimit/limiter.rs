//! Core sliding-window rate limiter.

use std::sync::Arc;
use tracing::{debug, info, trace};

use super::clock::Clock;
use super::key::{ClientKey, EndpointCategory};
use super::ledger::{RequestLedger, Retention, SweepStats};
use super::rules::PolicyTable;

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub allowed: bool,
    /// Requests allowed inside the window
    pub limit: u32,
    /// Slots left after this request
    pub remaining: u32,
    /// When the least recent counted request leaves the window
    pub reset_at: f64,
    pub window_seconds: u32,
    /// Category the request was counted under
    pub category: EndpointCategory,
}

impl Decision {
    /// Reset time in whole seconds.
    pub fn reset(&self) -> u64 {
        self.reset_at.max(0.0) as u64
    }

    /// Seconds a denied client is told to wait.
    pub fn retry_after(&self) -> u32 {
        self.window_seconds
    }

    /// Quota headers to attach to the client response. `Retry-After` is
    /// only present on denial.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset().to_string()),
            ("X-RateLimit-Window", self.window_seconds.to_string()),
        ];
        if !self.allowed {
            headers.push(("Retry-After", self.retry_after().to_string()));
        }
        headers
    }
}

/// Tunables that are not part of the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LimiterSettings {
    pub retention: Retention,
    /// Whether `check` records requests it denies. Recording them keeps a
    /// client that retries under overload locked out; not recording lets it
    /// in as soon as a slot frees up.
    pub record_rejected: bool,
}

/// The in-memory sliding-window rate limiter.
///
/// Built once at startup and shared across request handlers.
#[derive(Debug)]
pub struct RateLimiter {
    policies: PolicyTable,
    ledger: RequestLedger,
    clock: Arc<dyn Clock>,
    record_rejected: bool,
}

impl RateLimiter {
    pub fn new(policies: PolicyTable, settings: LimiterSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            policies,
            ledger: RequestLedger::new(settings.retention),
            clock,
            record_rejected: settings.record_rejected,
        }
    }

    /// Decide whether a request from `client_key` to `path` at `now` is
    /// within its policy. Does not record the request.
    pub fn evaluate(&self, client_key: &str, path: &str, now: f64) -> Decision {
        let key = ClientKey::new(client_key);
        let (category, policy) = self.policies.policy_for(path);
        let max = policy.max_requests;
        let window = policy.window_seconds;

        let window_start = now - f64::from(window);
        let stats = self.ledger.window_stats(&key, &category, window_start);
        let count = u32::try_from(stats.count).unwrap_or(u32::MAX);

        let allowed = count < max;
        // The request being evaluated takes a slot whether or not it is allowed
        let remaining = max.saturating_sub(count).saturating_sub(1);
        let reset_at = stats.oldest.unwrap_or(now) + f64::from(window);

        trace!(
            client = %key,
            category = %category,
            count = count,
            limit = max,
            "Evaluated request"
        );

        if !allowed {
            info!(
                client = %key,
                category = %category,
                count = count,
                limit = max,
                window_seconds = window,
                "Rate limit exceeded"
            );
        }

        Decision {
            allowed,
            limit: max,
            remaining,
            reset_at,
            window_seconds: window,
            category,
        }
    }

    /// Record a request from `client_key` to `path` at `now`.
    pub fn record(&self, client_key: &str, path: &str, now: f64) {
        let key = ClientKey::new(client_key);
        let category = self.policies.resolve(path);
        self.ledger.record(&key, &category, now);
    }

    /// Evaluate and, when the request is admitted, record it.
    ///
    /// Denied requests are only recorded when `record_rejected` is set.
    pub fn check(&self, client_key: &str, path: &str, now: f64) -> Decision {
        let decision = self.evaluate(client_key, path, now);

        if decision.allowed || self.record_rejected {
            self.ledger
                .record(&ClientKey::new(client_key), &decision.category, now);
        }

        debug!(
            client = client_key,
            path = path,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Rate limit decision made"
        );

        decision
    }

    /// Current time according to the limiter's clock.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Prune the ledger immediately.
    pub fn sweep(&self, now: f64) -> SweepStats {
        self.ledger.sweep(now)
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    pub fn record_rejected(&self) -> bool {
        self.record_rejected
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.ledger.tracked_clients()
    }

    /// Whether the ledger holds anything for `client_key`.
    pub fn is_tracking(&self, client_key: &str) -> bool {
        self.ledger.contains(&ClientKey::new(client_key))
    }

    /// Clear all recorded requests.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.ledger.clear();
    }
}
