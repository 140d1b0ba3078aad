// Use-case level inputs/outputs for the session loop.

use crate::domain::{MoveDirection, PlayerId, SessionSnapshot, Side};

/// Intents flowing from connections into a session task.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connect { player_id: PlayerId },
    Move {
        player_id: PlayerId,
        direction: MoveDirection,
    },
    Leave { player_id: PlayerId },
}

/// Updates broadcast from a session task to its subscribers.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Snapshot(SessionSnapshot),
    OpponentLeft { side: Side },
}

/// High-level session lifecycle published on a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Waiting,
    Starting,
    Active,
    Ended {
        winner: Option<PlayerId>,
        reason: EndReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// A slot reached the win threshold.
    Score,
    /// The opponent disconnected mid-match.
    Forfeit,
    /// Both slots disconnected; nobody wins.
    Abandoned,
}
