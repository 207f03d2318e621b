//! Engine metrics
//!
//! - **Counters**: entries, upkeeps and fulfillments, split by outcome
//! - **Gauges**: current participant count and pool balance
//!
//! # Usage
//!
//! ```rust,ignore
//! let snapshot = raffle.metrics().snapshot();
//! println!("{}", serde_json::to_string_pretty(&snapshot)?);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Metric Types
// =============================================================================

/// A simple counter that can only increase.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A gauge holding the last observed value.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    pub fn set(&self, v: u64) {
        self.value.store(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Raffle Metrics
// =============================================================================

#[derive(Debug, Default)]
pub struct RaffleMetrics {
    pub entries_accepted: Counter,
    pub entries_rejected: Counter,
    pub upkeeps_performed: Counter,
    pub upkeeps_rejected: Counter,
    pub fulfillments_accepted: Counter,
    pub fulfillments_rejected: Counter,
    pub payout_failures: Counter,
    pub participants: Gauge,
    pub pool_balance: Gauge,
}

impl RaffleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            entries_accepted: self.entries_accepted.get(),
            entries_rejected: self.entries_rejected.get(),
            upkeeps_performed: self.upkeeps_performed.get(),
            upkeeps_rejected: self.upkeeps_rejected.get(),
            fulfillments_accepted: self.fulfillments_accepted.get(),
            fulfillments_rejected: self.fulfillments_rejected.get(),
            payout_failures: self.payout_failures.get(),
            participants: self.participants.get(),
            pool_balance: self.pool_balance.get(),
        }
    }
}

/// Point-in-time copy of [`RaffleMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub entries_accepted: u64,
    pub entries_rejected: u64,
    pub upkeeps_performed: u64,
    pub upkeeps_rejected: u64,
    pub fulfillments_accepted: u64,
    pub fulfillments_rejected: u64,
    pub payout_failures: u64,
    pub participants: u64,
    pub pool_balance: u64,
}
