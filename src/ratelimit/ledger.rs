//! Request ledger and retention sweeping.
//!
//! The ledger remembers when each client made requests and under which
//! endpoint category. Stale records are pruned as a side effect of writes,
//! which keeps housekeeping deterministic under an injected clock.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use super::key::{ClientKey, EndpointCategory};

/// Default retention horizon in seconds.
pub const DEFAULT_RETENTION_SECS: u64 = 3600;
/// Default minimum spacing between sweeps in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// A single observed request. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub timestamp: f64,
    pub category: EndpointCategory,
}

/// How long records are kept and how often they are pruned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retention {
    /// Records older than `now - horizon` are dropped by a sweep.
    pub horizon: f64,
    /// A write sweeps first when more than this many seconds passed since
    /// the previous sweep.
    pub sweep_interval: f64,
}

impl Retention {
    pub fn from_secs(horizon: u64, sweep_interval: u64) -> Self {
        Self {
            horizon: horizon as f64,
            sweep_interval: sweep_interval as f64,
        }
    }
}

impl Default for Retention {
    fn default() -> Self {
        Self::from_secs(DEFAULT_RETENTION_SECS, DEFAULT_SWEEP_INTERVAL_SECS)
    }
}

/// Count of in-window records plus the oldest of them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowStats {
    pub count: usize,
    pub oldest: Option<f64>,
}

/// Outcome of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepStats {
    pub pruned_records: usize,
    pub removed_clients: usize,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: HashMap<ClientKey, Vec<RequestRecord>>,
    last_sweep: Option<f64>,
}

impl LedgerState {
    fn sweep(&mut self, now: f64, horizon: f64) -> SweepStats {
        let cutoff = now - horizon;
        let mut stats = SweepStats::default();

        self.entries.retain(|_, records| {
            let before = records.len();
            records.retain(|r| r.timestamp > cutoff);
            stats.pruned_records += before - records.len();

            if records.is_empty() {
                stats.removed_clients += 1;
                false
            } else {
                true
            }
        });

        self.last_sweep = Some(now);
        stats
    }
}

/// Per-client record of past requests.
///
/// A single mutex serializes appends, sweeps and reads. Traffic at this
/// layer does not warrant anything finer grained.
#[derive(Debug, Default)]
pub struct RequestLedger {
    state: Mutex<LedgerState>,
    retention: Retention,
}

impl RequestLedger {
    pub fn new(retention: Retention) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            retention,
        }
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// Append a request for `key`, sweeping first when one is due.
    pub fn record(&self, key: &ClientKey, category: &EndpointCategory, now: f64) {
        let mut state = self.state.lock();

        let sweep_due = match state.last_sweep {
            Some(last) => now - last > self.retention.sweep_interval,
            None => true,
        };
        if sweep_due {
            let stats = state.sweep(now, self.retention.horizon);
            if stats.pruned_records > 0 {
                debug!(
                    pruned_records = stats.pruned_records,
                    removed_clients = stats.removed_clients,
                    remaining_clients = state.entries.len(),
                    "Swept request ledger"
                );
            }
        }

        state
            .entries
            .entry(key.clone())
            .or_default()
            .push(RequestRecord {
                timestamp: now,
                category: category.clone(),
            });
    }

    /// Number of records for `key` under `category` newer than `window_start`.
    pub fn count_in_window(
        &self,
        key: &ClientKey,
        category: &EndpointCategory,
        window_start: f64,
    ) -> usize {
        self.window_stats(key, category, window_start).count
    }

    /// Count and oldest timestamp of the records inside the window, read
    /// under one lock acquisition.
    pub fn window_stats(
        &self,
        key: &ClientKey,
        category: &EndpointCategory,
        window_start: f64,
    ) -> WindowStats {
        let state = self.state.lock();
        let Some(records) = state.entries.get(key) else {
            return WindowStats::default();
        };

        records
            .iter()
            .filter(|r| r.timestamp > window_start && &r.category == category)
            .fold(WindowStats::default(), |stats, r| WindowStats {
                count: stats.count + 1,
                oldest: Some(stats.oldest.map_or(r.timestamp, |o| o.min(r.timestamp))),
            })
    }

    /// Drop every record older than the retention horizon and forget clients
    /// left with none.
    pub fn sweep(&self, now: f64) -> SweepStats {
        let stats = self.state.lock().sweep(now, self.retention.horizon);
        debug!(
            pruned_records = stats.pruned_records,
            removed_clients = stats.removed_clients,
            "Swept request ledger"
        );
        stats
    }

    /// Whether any records are held for `key`.
    pub fn contains(&self, key: &ClientKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Number of clients with at least one record.
    pub fn tracked_clients(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Total records held across all clients.
    pub fn record_count(&self) -> usize {
        self.state.lock().entries.values().map(Vec::len).sum()
    }

    /// Forget everything, including when the last sweep ran.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.last_sweep = None;
    }
}
