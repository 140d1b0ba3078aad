use crate::domain::state::{PlayerId, SessionId, SessionSnapshot, Side};
use crate::domain::tuning::Tuning;
use crate::use_cases::game::{SessionOutputs, session_task};
use crate::use_cases::session::GameSession;
use crate::use_cases::types::{SessionEvent, SessionStatus, SessionUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// Shared configuration applied to newly created sessions.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Capacity for inbound session intents.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast session updates.
    pub update_broadcast_capacity: usize,
    /// Fixed tick interval for the simulation loop.
    pub tick_interval: Duration,
    /// Delay between both players connecting and the rally going live.
    pub start_grace: Duration,
    /// Gameplay tuning handed to every session.
    pub tuning: Tuning,
}

/// Per-session channels and identity, handed to both connections.
#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: SessionId,
    pub left_id: PlayerId,
    pub right_id: PlayerId,
    /// Sender for intents into the session task.
    pub input_tx: mpsc::Sender<SessionEvent>,
    /// Broadcast sender for session updates.
    pub update_tx: broadcast::Sender<SessionUpdate>,
    /// Watch holding the latest snapshot for lag recovery.
    pub latest_tx: watch::Sender<SessionSnapshot>,
    /// Watch for high-level lifecycle changes.
    pub status_tx: watch::Sender<SessionStatus>,
    shutdown: Arc<Notify>,
}

impl SessionHandle {
    /// Returns the seat the provided player occupies in this session.
    pub fn side_of(&self, player_id: PlayerId) -> Option<Side> {
        if player_id == self.left_id {
            Some(Side::Left)
        } else if player_id == self.right_id {
            Some(Side::Right)
        } else {
            None
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(*self.status_tx.borrow(), SessionStatus::Ended { .. })
    }
}

#[derive(Default)]
struct RegistryInner {
    sessions: HashMap<SessionId, SessionHandle>,
    /// Back-reference index; purged whenever a player leaves or a session is
    /// destroyed.
    players: HashMap<PlayerId, SessionId>,
}

/// Owns all live sessions and the player index pointing into them.
pub struct SessionRegistry {
    settings: RegistrySettings,
    next_session_id: AtomicU64,
    inner: RwLock<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(settings: RegistrySettings) -> Self {
        Self {
            settings,
            next_session_id: AtomicU64::new(1),
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Creates a session for a pairing and spawns its task.
    ///
    /// Argument order is pairing order: the previously-waiting player takes
    /// the left side. The caller pairs this with `spawn_end_watcher` so the
    /// session is torn down once it ends.
    pub async fn create_session(&self, left_id: PlayerId, right_id: PlayerId) -> SessionHandle {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let session = GameSession::new(session_id, left_id, right_id, self.settings.tuning);

        let (input_tx, input_rx) = mpsc::channel(self.settings.input_channel_capacity);
        let (update_tx, _update_rx) =
            broadcast::channel(self.settings.update_broadcast_capacity);
        let (latest_tx, _latest_rx) = watch::channel(session.snapshot());
        let (status_tx, _status_rx) = watch::channel(SessionStatus::Waiting);
        let shutdown = Arc::new(Notify::new());

        // Spawn the authoritative loop for this session.
        tokio::spawn(session_task(
            session,
            input_rx,
            SessionOutputs {
                update_tx: update_tx.clone(),
                latest_tx: latest_tx.clone(),
                status_tx: status_tx.clone(),
            },
            self.settings.tick_interval,
            self.settings.start_grace,
            shutdown.clone(),
        ));

        let handle = SessionHandle {
            session_id,
            left_id,
            right_id,
            input_tx,
            update_tx,
            latest_tx,
            status_tx,
            shutdown,
        };

        {
            let mut inner = self.inner.write().await;
            inner.sessions.insert(session_id, handle.clone());
            inner.players.insert(left_id, session_id);
            inner.players.insert(right_id, session_id);
        }

        info!(session_id, left_id, right_id, "session created");
        handle
    }

    /// Destroys a session once its terminal status is observable.
    pub fn spawn_end_watcher(
        self: Arc<Self>,
        session_id: SessionId,
        mut status_rx: watch::Receiver<SessionStatus>,
    ) {
        tokio::spawn(async move {
            loop {
                if matches!(*status_rx.borrow_and_update(), SessionStatus::Ended { .. }) {
                    break;
                }
                if status_rx.changed().await.is_err() {
                    break;
                }
            }
            self.destroy(session_id).await;
        });
    }

    /// Returns the session a player belongs to, purging a stale index entry
    /// when the session itself is already gone.
    pub async fn session_for_player(&self, player_id: PlayerId) -> Option<SessionHandle> {
        {
            let inner = self.inner.read().await;
            let session_id = inner.players.get(&player_id)?;
            if let Some(handle) = inner.sessions.get(session_id) {
                return Some(handle.clone());
            }
        }

        // The index pointed at a missing session: degrade to "not in any
        // session" and drop the dangling entry.
        let mut inner = self.inner.write().await;
        if let Some(session_id) = inner.players.remove(&player_id) {
            warn!(player_id, session_id, "purged stale player mapping");
        }
        None
    }

    pub async fn session(&self, session_id: SessionId) -> Option<SessionHandle> {
        let inner = self.inner.read().await;
        inner.sessions.get(&session_id).cloned()
    }

    /// Stops the session task and removes the session and its player index
    /// entries. Returns false when the session was already destroyed.
    pub async fn destroy(&self, session_id: SessionId) -> bool {
        let mut inner = self.inner.write().await;
        let Some(handle) = inner.sessions.remove(&session_id) else {
            debug!(session_id, "destroy skipped; session already gone");
            return false;
        };
        // Revoke the task before the session disappears from the registry so
        // no tick can fire against a half-destroyed session.
        handle.shutdown.notify_one();
        inner.players.retain(|_, mapped| *mapped != session_id);
        info!(session_id, "session destroyed");
        true
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RegistrySettings {
        RegistrySettings {
            input_channel_capacity: 64,
            update_broadcast_capacity: 128,
            tick_interval: Duration::from_millis(5),
            start_grace: Duration::from_millis(10),
            tuning: Tuning::default(),
        }
    }

    #[tokio::test]
    async fn create_indexes_both_players() {
        let registry = Arc::new(SessionRegistry::new(settings()));
        let handle = registry.create_session(1, 2).await;
        assert_eq!(handle.side_of(1), Some(Side::Left));
        assert_eq!(handle.side_of(2), Some(Side::Right));
        assert_eq!(handle.side_of(3), None);

        let by_player = registry.session_for_player(1).await.expect("indexed");
        assert_eq!(by_player.session_id, handle.session_id);
        assert_eq!(registry.session_count().await, 1);
    }

    #[tokio::test]
    async fn destroy_is_exactly_once() {
        let registry = Arc::new(SessionRegistry::new(settings()));
        let handle = registry.create_session(1, 2).await;
        assert!(registry.destroy(handle.session_id).await);
        assert!(!registry.destroy(handle.session_id).await);
        assert!(registry.session_for_player(1).await.is_none());
        assert!(registry.session_for_player(2).await.is_none());
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn forfeit_tears_the_session_down() {
        let registry = Arc::new(SessionRegistry::new(settings()));
        let handle = registry.create_session(1, 2).await;
        registry
            .clone()
            .spawn_end_watcher(handle.session_id, handle.status_tx.subscribe());
        handle
            .input_tx
            .send(SessionEvent::Connect { player_id: 1 })
            .await
            .unwrap();
        handle
            .input_tx
            .send(SessionEvent::Connect { player_id: 2 })
            .await
            .unwrap();
        handle
            .input_tx
            .send(SessionEvent::Leave { player_id: 1 })
            .await
            .unwrap();

        // The end watcher destroys the session after the terminal status.
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if registry.session(handle.session_id).await.is_none() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session was not destroyed after forfeit");
        assert!(registry.session_for_player(2).await.is_none());
    }
}
