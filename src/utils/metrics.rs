//! Observability and Metrics
//!
//! Thread-safe counters for monitoring codec health: how many packets were
//! sealed and opened, and how many inbound packets were discarded and why.
//!
//! Discard counters matter operationally: a rising `auth_failures` against a
//! flat `packets_opened` usually means a key mismatch or an active
//! tamperer, while rising `malformed_discards` points at framing or
//! obfuscation misconfiguration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing::info;

/// Global metrics collector for codec operations
#[derive(Debug, Default)]
pub struct Metrics {
    /// Control packets serialized
    pub control_packets_sealed: AtomicU64,
    /// Control packets parsed successfully
    pub control_packets_opened: AtomicU64,
    /// Data packets encrypted
    pub data_packets_sealed: AtomicU64,
    /// Data packets decrypted successfully
    pub data_packets_opened: AtomicU64,
    /// Inbound packets rejected for tag/HMAC/replay failures
    pub auth_failures: AtomicU64,
    /// Inbound packets rejected as structurally malformed
    pub malformed_discards: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn control_sealed(&self) {
        self.control_packets_sealed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn control_opened(&self) {
        self.control_packets_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn data_sealed(&self) {
        self.data_packets_sealed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn data_opened(&self) {
        self.data_packets_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_discard(&self) {
        self.malformed_discards.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            control_packets_sealed: self.control_packets_sealed.load(Ordering::Relaxed),
            control_packets_opened: self.control_packets_opened.load(Ordering::Relaxed),
            data_packets_sealed: self.data_packets_sealed.load(Ordering::Relaxed),
            data_packets_opened: self.data_packets_opened.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            malformed_discards: self.malformed_discards.load(Ordering::Relaxed),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            control_packets_sealed = snapshot.control_packets_sealed,
            control_packets_opened = snapshot.control_packets_opened,
            data_packets_sealed = snapshot.data_packets_sealed,
            data_packets_opened = snapshot.data_packets_opened,
            auth_failures = snapshot.auth_failures,
            malformed_discards = snapshot.malformed_discards,
            "Codec metrics snapshot"
        );
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub control_packets_sealed: u64,
    pub control_packets_opened: u64,
    pub data_packets_sealed: u64,
    pub data_packets_opened: u64,
    pub auth_failures: u64,
    pub malformed_discards: u64,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}
