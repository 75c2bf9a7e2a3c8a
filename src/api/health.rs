//! Shared health state for the /health endpoint.
//! Updated by the bootstrap fetch and the quote refresher, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared health metrics.
#[derive(Default)]
pub struct HealthState {
    /// Nanosecond timestamp of the last completed refresh attempt (0 = none).
    pub last_refresh_at_ns: AtomicU64,
    /// Count of refresh runs that failed outright or fetched incomplete data.
    pub refresh_failures: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_refresh(&self, ns: u64) {
        self.last_refresh_at_ns.store(ns, Ordering::Relaxed);
    }

    pub fn inc_refresh_failures(&self) {
        self.refresh_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_refresh_at_ns(&self) -> u64 {
        self.last_refresh_at_ns.load(Ordering::Relaxed)
    }

    pub fn refresh_failures(&self) -> u64 {
        self.refresh_failures.load(Ordering::Relaxed)
    }
}
