use crate::use_cases::session::{ConnectOutcome, GameSession, LeaveOutcome, StepOutcome};
use crate::use_cases::types::{EndReason, SessionEvent, SessionStatus, SessionUpdate};
use crate::domain::SessionSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Notify};
use tracing::{debug, info};

/// Channel bundle a session task publishes into.
pub struct SessionOutputs {
    pub update_tx: broadcast::Sender<SessionUpdate>,
    /// Latest snapshot for subscribers that lagged behind the broadcast.
    pub latest_tx: watch::Sender<SessionSnapshot>,
    pub status_tx: watch::Sender<SessionStatus>,
}

impl SessionOutputs {
    fn snapshot(&self, session: &GameSession) {
        let snapshot = session.snapshot();
        let _ = self.latest_tx.send(snapshot.clone());
        let _ = self.update_tx.send(SessionUpdate::Snapshot(snapshot));
    }

    fn status(&self, status: SessionStatus) {
        let _ = self.status_tx.send(status);
    }
}

enum Applied {
    Continue,
    BothConnected,
    Terminal,
}

/// Authoritative loop for one session.
///
/// The task is the single writer of the session state: connect, move and
/// leave intents are applied here, between physics steps, so an intent that
/// lands between tick N and N+1 is visible from tick N+1 on. The task exits
/// as soon as a terminal state is published and never steps past it.
pub async fn session_task(
    mut session: GameSession,
    mut input_rx: mpsc::Receiver<SessionEvent>,
    outputs: SessionOutputs,
    tick_interval: Duration,
    start_grace: Duration,
    shutdown: Arc<Notify>,
) {
    let session_id = session.id();

    // Waiting: both transports must attach before anything starts.
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!(session_id, "session revoked while waiting");
                return;
            }
            event = input_rx.recv() => {
                let Some(event) = event else { return };
                match apply_event(&mut session, event, &outputs) {
                    Applied::Terminal => return,
                    Applied::BothConnected => break,
                    Applied::Continue => {}
                }
            }
        }
    }

    // Starting: a one-shot grace delay before the rally begins.
    info!(session_id, "both players connected; match starting");
    outputs.status(SessionStatus::Starting);
    outputs.snapshot(&session);
    tokio::select! {
        _ = shutdown.notified() => {
            debug!(session_id, "session revoked during start grace");
            return;
        }
        _ = tokio::time::sleep(start_grace) => {}
    }

    // A disconnect during the grace window cancels the transition, so drain
    // pending intents and re-check before going live.
    while let Ok(event) = input_rx.try_recv() {
        if let Applied::Terminal = apply_event(&mut session, event, &outputs) {
            return;
        }
    }
    if !session.activate() {
        debug!(session_id, "activation re-check failed");
        return;
    }
    outputs.status(SessionStatus::Active);
    outputs.snapshot(&session);

    // Active: fixed-step simulation at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!(session_id, "session revoked mid-match");
                return;
            }
            _ = interval.tick() => {}
        }

        // Apply everything that arrived since the previous tick.
        while let Ok(event) = input_rx.try_recv() {
            if let Applied::Terminal = apply_event(&mut session, event, &outputs) {
                return;
            }
        }

        match session.step() {
            StepOutcome::Won { winner } => {
                info!(session_id, winner, "match ended at the win threshold");
                outputs.snapshot(&session);
                outputs.status(SessionStatus::Ended {
                    winner: Some(winner),
                    reason: EndReason::Score,
                });
                return;
            }
            StepOutcome::Scored { side } => {
                debug!(session_id, side = ?side, "point scored");
                outputs.snapshot(&session);
            }
            StepOutcome::Continue => {
                outputs.snapshot(&session);
            }
        }
    }
}

fn apply_event(session: &mut GameSession, event: SessionEvent, outputs: &SessionOutputs) -> Applied {
    match event {
        SessionEvent::Connect { player_id } => match session.connect(player_id) {
            ConnectOutcome::Ready => Applied::BothConnected,
            ConnectOutcome::Noop => {
                // Join accepted (or re-affirmed): reflect it right away.
                outputs.snapshot(session);
                Applied::Continue
            }
        },
        SessionEvent::Move {
            player_id,
            direction,
        } => {
            session.apply_move(player_id, direction);
            Applied::Continue
        }
        SessionEvent::Leave { player_id } => match session.leave(player_id) {
            LeaveOutcome::NotInSession => Applied::Continue,
            LeaveOutcome::Forfeit { winner, left_side } => {
                info!(session_id = session.id(), winner, "opponent left; forfeit");
                let _ = outputs
                    .update_tx
                    .send(SessionUpdate::OpponentLeft { side: left_side });
                outputs.snapshot(session);
                outputs.status(SessionStatus::Ended {
                    winner: Some(winner),
                    reason: EndReason::Forfeit,
                });
                Applied::Terminal
            }
            LeaveOutcome::Abandoned => {
                info!(session_id = session.id(), "both players gone; abandoning");
                outputs.snapshot(session);
                outputs.status(SessionStatus::Ended {
                    winner: None,
                    reason: EndReason::Abandoned,
                });
                Applied::Terminal
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::Tuning;
    use tokio::time::{Duration, timeout};

    struct Harness {
        input_tx: mpsc::Sender<SessionEvent>,
        update_rx: broadcast::Receiver<SessionUpdate>,
        status_rx: watch::Receiver<SessionStatus>,
        shutdown: Arc<Notify>,
    }

    fn spawn_session() -> Harness {
        let session = GameSession::new(1, 10, 20, Tuning::default());
        let (input_tx, input_rx) = mpsc::channel(64);
        let (update_tx, update_rx) = broadcast::channel(256);
        let (latest_tx, _) = watch::channel(session.snapshot());
        let (status_tx, status_rx) = watch::channel(SessionStatus::Waiting);
        let shutdown = Arc::new(Notify::new());
        tokio::spawn(session_task(
            session,
            input_rx,
            SessionOutputs {
                update_tx,
                latest_tx,
                status_tx,
            },
            Duration::from_millis(5),
            Duration::from_millis(20),
            shutdown.clone(),
        ));
        Harness {
            input_tx,
            update_rx,
            status_rx,
            shutdown,
        }
    }

    async fn wait_for_status(
        status_rx: &mut watch::Receiver<SessionStatus>,
        wanted: impl Fn(&SessionStatus) -> bool,
    ) {
        timeout(Duration::from_secs(2), async {
            loop {
                if wanted(&status_rx.borrow_and_update()) {
                    return;
                }
                status_rx.changed().await.expect("status channel closed");
            }
        })
        .await
        .expect("status transition timed out");
    }

    #[tokio::test]
    async fn runs_waiting_starting_active() {
        let mut harness = spawn_session();
        harness
            .input_tx
            .send(SessionEvent::Connect { player_id: 10 })
            .await
            .unwrap();
        harness
            .input_tx
            .send(SessionEvent::Connect { player_id: 20 })
            .await
            .unwrap();

        // The watch only keeps the latest value, so Starting may already have
        // been overwritten by Active when this observer gets scheduled.
        wait_for_status(&mut harness.status_rx, |status| {
            matches!(*status, SessionStatus::Starting | SessionStatus::Active)
        })
        .await;
        wait_for_status(&mut harness.status_rx, |status| {
            *status == SessionStatus::Active
        })
        .await;

        // Snapshots keep flowing while active.
        let update = timeout(Duration::from_secs(2), harness.update_rx.recv())
            .await
            .expect("no update while active")
            .expect("update channel closed");
        assert!(matches!(
            update,
            SessionUpdate::Snapshot(_) | SessionUpdate::OpponentLeft { .. }
        ));
    }

    #[tokio::test]
    async fn disconnect_mid_match_forfeits_to_survivor() {
        let mut harness = spawn_session();
        harness
            .input_tx
            .send(SessionEvent::Connect { player_id: 10 })
            .await
            .unwrap();
        harness
            .input_tx
            .send(SessionEvent::Connect { player_id: 20 })
            .await
            .unwrap();
        wait_for_status(&mut harness.status_rx, |status| {
            *status == SessionStatus::Active
        })
        .await;

        harness
            .input_tx
            .send(SessionEvent::Leave { player_id: 20 })
            .await
            .unwrap();
        wait_for_status(&mut harness.status_rx, |status| {
            matches!(
                *status,
                SessionStatus::Ended {
                    winner: Some(10),
                    reason: EndReason::Forfeit
                }
            )
        })
        .await;

        // The forfeit notice and a final snapshot were broadcast.
        let mut saw_opponent_left = false;
        let mut last_snapshot = None;
        while let Ok(update) = harness.update_rx.try_recv() {
            match update {
                SessionUpdate::OpponentLeft { side } => {
                    assert_eq!(side, crate::domain::Side::Right);
                    saw_opponent_left = true;
                }
                SessionUpdate::Snapshot(snapshot) => last_snapshot = Some(snapshot),
            }
        }
        assert!(saw_opponent_left);
        let last_snapshot = last_snapshot.expect("final snapshot broadcast");
        assert!(!last_snapshot.active);
        assert_eq!(last_snapshot.winner, Some(10));
    }

    #[tokio::test]
    async fn shutdown_stops_a_waiting_session() {
        let harness = spawn_session();
        harness.shutdown.notify_one();
        // The task drops its receiver when it exits.
        timeout(Duration::from_secs(2), harness.input_tx.closed())
            .await
            .expect("session task did not stop");
    }
}
