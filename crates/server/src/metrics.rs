//! Lock-free connection counters.
//!
//! Connection tasks bump these with relaxed atomics; the heartbeat reads a
//! snapshot once per tick and logs it.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::Instant;

pub struct Metrics {
    connections_accepted: AtomicU64,
    sessions_closed: AtomicU64,
    frames_received: AtomicU64,
    packets_dropped: AtomicU64,
    frames_sent: AtomicU64,
    keepalives_sent: AtomicU64,
    keepalives_skipped: AtomicU64,

    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_accepted: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            packets_dropped: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            keepalives_sent: AtomicU64::new(0),
            keepalives_skipped: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Relaxed);
    }

    pub fn session_closed(&self) {
        self.sessions_closed.fetch_add(1, Relaxed);
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Relaxed);
    }

    /// A frame that was read but not acted on (malformed or unknown).
    pub fn packet_dropped(&self) {
        self.packets_dropped.fetch_add(1, Relaxed);
    }

    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Relaxed);
    }

    pub fn keepalives(&self, sent: u64, skipped: u64) {
        self.keepalives_sent.fetch_add(sent, Relaxed);
        self.keepalives_skipped.fetch_add(skipped, Relaxed);
    }

    pub fn snapshot(&self, sessions_open: u64, players: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            connections_accepted: self.connections_accepted.load(Relaxed),
            sessions_closed: self.sessions_closed.load(Relaxed),
            sessions_open,
            players,
            frames_received: self.frames_received.load(Relaxed),
            packets_dropped: self.packets_dropped.load(Relaxed),
            frames_sent: self.frames_sent.load(Relaxed),
            keepalives_sent: self.keepalives_sent.load(Relaxed),
            keepalives_skipped: self.keepalives_skipped.load(Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of the counters at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub connections_accepted: u64,
    pub sessions_closed: u64,
    pub sessions_open: u64,
    pub players: u64,
    pub frames_received: u64,
    pub packets_dropped: u64,
    pub frames_sent: u64,
    pub keepalives_sent: u64,
    pub keepalives_skipped: u64,
}
