//! Shared registry of live connections.
//!
//! Every accepted connection is registered with its [`Transport`] so that
//! process-wide tasks (the heartbeat) can reach it, and so the status
//! response can report who is online.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};

use bytes::Bytes;
use uuid::Uuid;

use crate::transport::{Offer, Transport};

/// A player that has completed login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerInfo {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub name: String,
}

#[derive(Debug)]
pub struct SessionEntry {
    pub peer: SocketAddr,
    pub transport: Transport,
    /// Set once the session reaches Play.
    pub player: Option<PlayerInfo>,
}

/// Outcome of sending one frame to every Play session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: u64,
    /// Sessions whose queue was full (or whose writer was gone).
    pub skipped: u64,
}

/// Thread-safe registry of all connections.
///
/// Uses `std::sync::RwLock` because every operation is brief (no awaits while
/// the lock is held) and the access pattern is read-heavy.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<u64, SessionEntry>>,
    next_session_id: AtomicU64,
    next_entity_id: AtomicI32,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
            next_entity_id: AtomicI32::new(1),
        }
    }

    pub fn next_session_id(&self) -> u64 {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn allocate_entity_id(&self) -> i32 {
        self.next_entity_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register(&self, id: u64, peer: SocketAddr, transport: Transport) {
        self.sessions
            .write()
            .expect("session registry poisoned")
            .insert(
                id,
                SessionEntry {
                    peer,
                    transport,
                    player: None,
                },
            );
    }

    /// Attach a player to session `id` unless `max_players` sessions are
    /// already playing. Returns whether the player was admitted.
    pub fn admit(&self, id: u64, player: PlayerInfo, max_players: usize) -> bool {
        let mut sessions = self.sessions.write().expect("session registry poisoned");
        let playing = sessions.values().filter(|s| s.player.is_some()).count();
        if playing >= max_players {
            return false;
        }
        match sessions.get_mut(&id) {
            Some(entry) => {
                entry.player = Some(player);
                true
            }
            None => false,
        }
    }

    /// Remove session `id`. Returns `false` if it was already gone, so
    /// callers can tell the one removal that counted.
    pub fn deregister(&self, id: u64) -> bool {
        self.sessions
            .write()
            .expect("session registry poisoned")
            .remove(&id)
            .is_some()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .contains_key(&id)
    }

    /// Number of registered connections, in any state.
    pub fn len(&self) -> usize {
        self.sessions.read().expect("session registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn playing_count(&self) -> usize {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .values()
            .filter(|s| s.player.is_some())
            .count()
    }

    /// Up to `limit` playing players, ordered by entity id.
    pub fn sample(&self, limit: usize) -> Vec<PlayerInfo> {
        let mut players: Vec<PlayerInfo> = self
            .sessions
            .read()
            .expect("session registry poisoned")
            .values()
            .filter_map(|s| s.player.clone())
            .collect();
        players.sort_by_key(|p| p.entity_id);
        players.truncate(limit);
        players
    }

    /// Offer `frame` to every Play session without waiting on any of them.
    pub fn broadcast_play(&self, frame: &Bytes) -> BroadcastReport {
        let sessions = self.sessions.read().expect("session registry poisoned");
        let mut report = BroadcastReport::default();
        for (id, entry) in sessions.iter().filter(|(_, s)| s.player.is_some()) {
            match entry.transport.offer(frame.clone()) {
                Offer::Queued => report.sent += 1,
                Offer::Full => {
                    tracing::debug!(sid = id, "Outbound queue full, skipping");
                    report.skipped += 1;
                }
                Offer::Closed => report.skipped += 1,
            }
        }
        report
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
