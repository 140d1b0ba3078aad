use crate::domain::PlayerId;
use crate::use_cases::matchmaker::{EnqueueOutcome, Matchmaker, WaitingPlayer};
use crate::use_cases::registry::{SessionHandle, SessionRegistry};
use crate::use_cases::types::SessionEvent;
use std::sync::Arc;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, info};

/// Result of a join intent.
pub enum JoinOutcome {
    /// No opponent yet; the receiver resolves once a pairing lands.
    Queued {
        paired_rx: oneshot::Receiver<SessionHandle>,
    },
    /// Paired right away; the caller took the right side.
    Paired { handle: SessionHandle },
    /// The id already has a live session; re-affirm, never re-pair.
    AlreadyInSession { handle: SessionHandle },
}

/// Entry point for player intents, tying the matchmaker and the registry
/// together.
pub struct SessionEngine {
    matchmaker: Mutex<Matchmaker>,
    registry: Arc<SessionRegistry>,
}

impl SessionEngine {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            matchmaker: Mutex::new(Matchmaker::new()),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Starts or resumes matchmaking for a player.
    pub async fn join(&self, player_id: PlayerId) -> JoinOutcome {
        if let Some(handle) = self.registry.session_for_player(player_id).await {
            // An ended session is only waiting for teardown; it never blocks
            // a fresh pairing.
            if !handle.is_ended() {
                debug!(player_id, session_id = handle.session_id, "join re-affirmed");
                return JoinOutcome::AlreadyInSession { handle };
            }
        }

        let (notify_tx, paired_rx) = oneshot::channel();
        let outcome = {
            let mut matchmaker = self.matchmaker.lock().await;
            matchmaker.enqueue(WaitingPlayer::new(player_id, notify_tx))
        };

        match outcome {
            EnqueueOutcome::Queued => {
                info!(player_id, "player waiting for an opponent");
                JoinOutcome::Queued { paired_rx }
            }
            EnqueueOutcome::Paired { opponent } => {
                let waited = opponent.enqueued_at.elapsed();
                let handle = self
                    .registry
                    .create_session(opponent.player_id, player_id)
                    .await;
                self.registry
                    .clone()
                    .spawn_end_watcher(handle.session_id, handle.status_tx.subscribe());
                info!(
                    session_id = handle.session_id,
                    left_id = opponent.player_id,
                    right_id = player_id,
                    waited_ms = waited.as_millis() as u64,
                    "players paired"
                );
                if opponent.notify.send(handle.clone()).is_err() {
                    // The opponent's connection died between queueing and
                    // pairing; fold it into the normal forfeit path.
                    debug!(
                        opponent_id = opponent.player_id,
                        "paired opponent unreachable; recording leave"
                    );
                    let _ = handle
                        .input_tx
                        .send(SessionEvent::Leave {
                            player_id: opponent.player_id,
                        })
                        .await;
                }
                JoinOutcome::Paired { handle }
            }
        }
    }

    /// Withdraws a player: dequeues a waiting id, or records a leave with the
    /// player's session.
    pub async fn leave(&self, player_id: PlayerId) {
        {
            let mut matchmaker = self.matchmaker.lock().await;
            if matchmaker.remove(player_id) {
                info!(player_id, "player left the queue");
                return;
            }
        }
        if let Some(handle) = self.registry.session_for_player(player_id).await {
            let _ = handle
                .input_tx
                .send(SessionEvent::Leave { player_id })
                .await;
        }
    }

    pub async fn queued_players(&self) -> usize {
        self.matchmaker.lock().await.len()
    }
}
