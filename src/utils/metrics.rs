//! Observability and Metrics
//!
//! Thread-safe counters for the protocol core, collected with atomics and
//! exposed through a process-wide instance plus point-in-time snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counters for protocol operations.
#[derive(Debug)]
pub struct Metrics {
    /// Sessions accepted over the process lifetime
    pub sessions_total: AtomicU64,
    /// Sessions currently between accept and close
    pub sessions_active: AtomicU64,
    /// Frames read off the wire
    pub frames_received: AtomicU64,
    /// Frames enqueued for delivery
    pub frames_sent: AtomicU64,
    /// Bytes read off the wire
    pub bytes_received: AtomicU64,
    /// Bytes enqueued for delivery
    pub bytes_sent: AtomicU64,
    /// Broadcast operations performed
    pub broadcasts: AtomicU64,
    /// Frames dropped because no variant is registered for their opcode
    pub unknown_opcodes: AtomicU64,
    /// Payload decodes that failed (connection-fatal events)
    pub decode_failures: AtomicU64,
    /// Per-recipient delivery failures during broadcast or targeted send
    pub delivery_failures: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sessions_total: AtomicU64::new(0),
            sessions_active: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            unknown_opcodes: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn session_opened(&self) {
        self.sessions_total.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn frame_received(&self, byte_count: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn frame_sent(&self, byte_count: u64) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn broadcast_sent(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unknown_opcode(&self) {
        self.unknown_opcodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_total: self.sessions_total.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            unknown_opcodes: self.unknown_opcodes.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            sessions_total = snapshot.sessions_total,
            sessions_active = snapshot.sessions_active,
            frames_received = snapshot.frames_received,
            frames_sent = snapshot.frames_sent,
            bytes_received = snapshot.bytes_received,
            bytes_sent = snapshot.bytes_sent,
            broadcasts = snapshot.broadcasts,
            unknown_opcodes = snapshot.unknown_opcodes,
            decode_failures = snapshot.decode_failures,
            delivery_failures = snapshot.delivery_failures,
            uptime_seconds = snapshot.uptime_seconds,
            "Channel metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub sessions_total: u64,
    pub sessions_active: u64,
    pub frames_received: u64,
    pub frames_sent: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub broadcasts: u64,
    pub unknown_opcodes: u64,
    pub decode_failures: u64,
    pub delivery_failures: u64,
    pub uptime_seconds: u64,
}

/// Global metrics instance (lazy static for simplicity)
static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new();
        metrics.session_opened();
        metrics.session_opened();
        metrics.session_closed();
        metrics.frame_received(10);
        metrics.frame_sent(6);
        metrics.unknown_opcode();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sessions_total, 2);
        assert_eq!(snapshot.sessions_active, 1);
        assert_eq!(snapshot.frames_received, 1);
        assert_eq!(snapshot.bytes_received, 10);
        assert_eq!(snapshot.bytes_sent, 6);
        assert_eq!(snapshot.unknown_opcodes, 1);
    }

    #[test]
    fn global_instance_is_stable() {
        let a = global_metrics() as *const Metrics;
        let b = global_metrics() as *const Metrics;
        assert_eq!(a, b);
    }
}
