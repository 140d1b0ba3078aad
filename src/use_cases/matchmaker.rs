use crate::domain::PlayerId;
use crate::use_cases::registry::SessionHandle;
use std::collections::VecDeque;
use std::time::Instant;
use tokio::sync::oneshot;

// A player waiting to be matched. The notify sender hands the created
// session to this player's connection once an opponent arrives.
#[derive(Debug)]
pub struct WaitingPlayer {
    pub player_id: PlayerId,
    pub enqueued_at: Instant,
    pub notify: oneshot::Sender<SessionHandle>,
}

impl WaitingPlayer {
    pub fn new(player_id: PlayerId, notify: oneshot::Sender<SessionHandle>) -> Self {
        Self {
            player_id,
            enqueued_at: Instant::now(),
            notify,
        }
    }
}

// Outcome of enqueueing a player into matchmaking.
#[derive(Debug)]
pub enum EnqueueOutcome {
    Queued,
    Paired { opponent: WaitingPlayer },
}

// In-memory FIFO matchmaker: the longest-waiting player is matched first.
#[derive(Debug, Default)]
pub struct Matchmaker {
    queue: VecDeque<WaitingPlayer>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    // Enqueue a player and attempt to pair immediately.
    //
    // A player that is already waiting never gets a second entry; the
    // existing entry just takes over the fresh notify channel.
    pub fn enqueue(&mut self, player: WaitingPlayer) -> EnqueueOutcome {
        if let Some(existing) = self
            .queue
            .iter_mut()
            .find(|waiting| waiting.player_id == player.player_id)
        {
            existing.notify = player.notify;
            existing.enqueued_at = player.enqueued_at;
            return EnqueueOutcome::Queued;
        }

        match self.queue.pop_front() {
            // Self-pairing is forbidden: a stale entry for the requesting id
            // goes back to the head of the queue and the request counts as
            // queued.
            Some(opponent) if opponent.player_id == player.player_id => {
                self.queue.push_front(player);
                EnqueueOutcome::Queued
            }
            Some(opponent) => EnqueueOutcome::Paired { opponent },
            None => {
                self.queue.push_back(player);
                EnqueueOutcome::Queued
            }
        }
    }

    // Remove a waiting player; a no-op when the id is not queued.
    pub fn remove(&mut self, player_id: PlayerId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|waiting| waiting.player_id != player_id);
        self.queue.len() != before
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
