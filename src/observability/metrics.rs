//! Batch metrics
//!
//! Monotonic counters only. Shared across requests behind an `Arc`; all
//! increments are relaxed atomics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for atomic operations batches
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    batches_committed: AtomicU64,
    batches_rolled_back: AtomicU64,
    batches_canceled: AtomicU64,
    operations_processed: AtomicU64,
    local_id_rejections: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_batches_committed(&self) {
        self.batches_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches_rolled_back(&self) {
        self.batches_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches_canceled(&self) {
        self.batches_canceled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_operations_processed(&self) {
        self.operations_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_local_id_rejections(&self) {
        self.local_id_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_committed: self.batches_committed.load(Ordering::Relaxed),
            batches_rolled_back: self.batches_rolled_back.load(Ordering::Relaxed),
            batches_canceled: self.batches_canceled.load(Ordering::Relaxed),
            operations_processed: self.operations_processed.load(Ordering::Relaxed),
            local_id_rejections: self.local_id_rejections.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub batches_committed: u64,
    pub batches_rolled_back: u64,
    pub batches_canceled: u64,
    pub operations_processed: u64,
    pub local_id_rejections: u64,
}
