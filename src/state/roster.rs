//! Live-session registry and broadcast fan-out.
//!
//! One mutex guards the member map. The lock is only held for
//! insert/remove/snapshot bookkeeping, never across delivery: each
//! session owns a bounded outbound queue drained by its own event loop,
//! so a slow peer cannot stall anyone else. A member whose queue is gone
//! is handed to the reaper task, which removes it and announces the
//! departure to everyone left.

use crate::state::ConnId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outbound queue capacity per session. A session this far behind is
/// treated as dead.
const SESSION_QUEUE_SIZE: usize = 64;

/// Reaper queue capacity. Removal requests beyond this are dropped; the
/// session's own teardown still deregisters it.
const REAPER_QUEUE_SIZE: usize = 1024;

/// One registered session.
struct Member {
    username: String,
    tx: mpsc::Sender<Arc<str>>,
}

/// Shared registry of authenticated sessions.
pub struct Roster {
    members: Mutex<HashMap<ConnId, Member>>,
    reaper_tx: mpsc::Sender<ConnId>,
}

impl Roster {
    /// Create the roster and spawn its reaper task.
    ///
    /// Dead members discovered during a broadcast are removed by the
    /// reaper rather than inline, so delivery never re-enters the
    /// registry it is iterating.
    pub fn new() -> Arc<Self> {
        let (reaper_tx, mut reaper_rx) = mpsc::channel::<ConnId>(REAPER_QUEUE_SIZE);
        let roster = Arc::new(Self {
            members: Mutex::new(HashMap::new()),
            reaper_tx,
        });

        let reaper = Arc::clone(&roster);
        tokio::spawn(async move {
            while let Some(id) = reaper_rx.recv().await {
                reaper.remove_and_announce(id);
            }
        });

        roster
    }

    /// Register an authenticated session and hand back its message queue.
    pub fn insert(&self, id: ConnId, username: &str) -> mpsc::Receiver<Arc<str>> {
        let (tx, rx) = mpsc::channel(SESSION_QUEUE_SIZE);
        let mut members = self.members.lock();
        members.insert(
            id,
            Member {
                username: username.to_string(),
                tx,
            },
        );
        rx
    }

    /// Remove a session. Idempotent; returns the username on first removal.
    pub fn remove(&self, id: ConnId) -> Option<String> {
        self.members.lock().remove(&id).map(|m| m.username)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Deliver a line to every registered session except `exclude`.
    ///
    /// The member map is snapshotted under the lock, then the lock is
    /// released before any delivery. A failed delivery marks the member
    /// dead and schedules it for the reaper; the line itself is dropped
    /// for that member only.
    pub fn broadcast(&self, line: &str, exclude: Option<ConnId>) {
        let line: Arc<str> = Arc::from(line);

        let targets: Vec<(ConnId, mpsc::Sender<Arc<str>>)> = {
            let members = self.members.lock();
            members
                .iter()
                .filter(|(id, _)| Some(**id) != exclude)
                .map(|(id, member)| (*id, member.tx.clone()))
                .collect()
        };

        for (id, tx) in targets {
            if let Err(e) = tx.try_send(Arc::clone(&line)) {
                debug!(conn = id, error = %e, "Dropping dead session from broadcast");
                self.schedule_removal(id);
            }
        }
    }

    /// Tell everyone else a session joined.
    pub fn announce_join(&self, id: ConnId, username: &str) {
        let line = format!(
            "[{}] * {} joined the chat",
            crate::util::clock_time(),
            username
        );
        self.broadcast(&line, Some(id));
    }

    /// Remove a member and tell everyone who is left.
    ///
    /// Used by both the reaper and session teardown; removal is
    /// idempotent, so each session produces at most one leave notice.
    pub fn remove_and_announce(&self, id: ConnId) {
        if let Some(username) = self.remove(id) {
            info!(conn = id, %username, online = self.len(), "Session deregistered");
            let line = format!(
                "[{}] * {} left the chat",
                crate::util::clock_time(),
                username
            );
            self.broadcast(&line, None);
        }
    }

    fn schedule_removal(&self, id: ConnId) {
        if self.reaper_tx.try_send(id).is_err() {
            warn!(conn = id, "Reaper queue full; removal waits for session teardown");
        }
    }
}
