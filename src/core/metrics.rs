//! Lock-free cast metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Point-in-time copy of dispatcher metrics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Casts that ran to a result (successful or not).
    pub total_casts: u64,
    /// Casts that failed, including aborted ones.
    pub failed_casts: u64,
    /// Mean submission-to-completion latency in milliseconds.
    pub average_latency_ms: f64,
    /// Workers currently executing a cast.
    pub active_workers: usize,
    /// Casts waiting in the queue.
    pub queue_depth: usize,
    /// Live worker threads.
    pub worker_count: usize,
}

/// Process-wide cast counters.
///
/// Increments are single atomic adds; reads never block writers. Values are
/// read independently, so a snapshot taken mid-update may be off by one cast.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    total_casts: AtomicU64,
    total_latency_nanos: AtomicU64,
    failed_casts: AtomicU64,
}

impl MetricsCollector {
    /// Fresh collector with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cast that ran to a result. The latency total saturates
    /// instead of wrapping.
    pub fn record_cast(&self, elapsed: Duration, success: bool) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_casts.fetch_add(1, Ordering::Relaxed);
        // The closure always returns Some, so this never fails.
        let _ = self
            .total_latency_nanos
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| Some(total.saturating_add(nanos)));
        if !success {
            self.failed_casts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a cast whose ability aborted with an error or panic.
    pub fn record_failure(&self) {
        self.failed_casts.fetch_add(1, Ordering::Relaxed);
    }

    /// Casts recorded via [`record_cast`](Self::record_cast).
    #[must_use]
    pub fn total_casts(&self) -> u64 {
        self.total_casts.load(Ordering::Relaxed)
    }

    /// Failed casts from either record method.
    #[must_use]
    pub fn failed_casts(&self) -> u64 {
        self.failed_casts.load(Ordering::Relaxed)
    }

    /// Mean latency in milliseconds, 0 when nothing was recorded.
    #[must_use]
    pub fn average_latency_ms(&self) -> f64 {
        let count = self.total_casts();
        if count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let avg_nanos = self.total_latency_nanos.load(Ordering::Relaxed) as f64 / count as f64;
        avg_nanos / 1_000_000.0
    }

    /// Get a snapshot of the counters combined with live pool gauges.
    #[must_use]
    pub fn snapshot(&self, active_workers: usize, queue_depth: usize, worker_count: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            total_casts: self.total_casts(),
            failed_casts: self.failed_casts(),
            average_latency_ms: self.average_latency_ms(),
            active_workers,
            queue_depth,
            worker_count,
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.total_casts.store(0, Ordering::Relaxed);
        self.total_latency_nanos.store(0, Ordering::Relaxed);
        self.failed_casts.store(0, Ordering::Relaxed);
    }
}
