//! Bridge telemetry
//!
//! Counters for the notification bridge. Fetch failures never reach the
//! coordinator's caller, so these counters (alongside tracing output) are
//! how they get observed.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

// ----------------------------------------------------------------------------
// Bridge Statistics
// ----------------------------------------------------------------------------

/// Live counters updated by the event bridge
#[derive(Debug, Default)]
pub struct BridgeStats {
    peers_accepted: AtomicU64,
    notifications_received: AtomicU64,
    messages_delivered: AtomicU64,
    fetch_failures: AtomicU64,
    dropped_while_disconnected: AtomicU64,
}

/// Point-in-time copy of [`BridgeStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatsSnapshot {
    pub peers_accepted: u64,
    pub notifications_received: u64,
    pub messages_delivered: u64,
    pub fetch_failures: u64,
    pub dropped_while_disconnected: u64,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_peer_accepted(&self) {
        self.peers_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped_while_disconnected
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            peers_accepted: self.peers_accepted.load(Ordering::Relaxed),
            notifications_received: self.notifications_received.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            dropped_while_disconnected: self.dropped_while_disconnected.load(Ordering::Relaxed),
        }
    }
}

impl BridgeStatsSnapshot {
    /// Notifications that have not yet reached a terminal outcome
    pub fn in_flight(&self) -> u64 {
        self.notifications_received
            .saturating_sub(self.messages_delivered)
            .saturating_sub(self.fetch_failures)
            .saturating_sub(self.dropped_while_disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = BridgeStats::new();
        stats.record_peer_accepted();
        stats.record_notification();
        stats.record_notification();
        stats.record_notification();
        stats.record_delivered();
        stats.record_fetch_failure();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.peers_accepted, 1);
        assert_eq!(snapshot.notifications_received, 3);
        assert_eq!(snapshot.messages_delivered, 1);
        assert_eq!(snapshot.fetch_failures, 1);
        assert_eq!(snapshot.in_flight(), 1);
    }

    #[test]
    fn test_in_flight_never_underflows() {
        let snapshot = BridgeStatsSnapshot {
            messages_delivered: 2,
            ..Default::default()
        };
        assert_eq!(snapshot.in_flight(), 0);
    }
}
