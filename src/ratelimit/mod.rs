//! Rate limiting logic and state management.

mod backend;
mod clock;
mod key;
mod ledger;
mod limiter;
mod rules;

pub use backend::RateLimiterBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{ClientKey, EndpointCategory, DEFAULT_CATEGORY, UNKNOWN_CLIENT};
pub use ledger::{
    RequestLedger, RequestRecord, Retention, SweepStats, WindowStats, DEFAULT_RETENTION_SECS,
    DEFAULT_SWEEP_INTERVAL_SECS,
};
pub use limiter::{Decision, LimiterSettings, RateLimiter};
pub use rules::{
    reference_exclusions, reference_policies, ExclusionList, PolicyEntry, PolicyFile, PolicyTable,
};
