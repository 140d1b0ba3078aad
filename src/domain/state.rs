// Domain-level match entities and snapshot projections.

use crate::domain::tuning::{FieldTuning, PaddleTuning};

/// Opaque player identity assigned at connection time.
pub type PlayerId = u64;
/// Opaque session identity allocated by the registry.
pub type SessionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Slot array index for this side.
    pub fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// One player's seat within a session.
///
/// Created when the player is paired and never recreated within the session;
/// move intents and disconnects mutate it in place.
#[derive(Debug, Clone)]
pub struct PlayerSlot {
    pub id: PlayerId,
    pub side: Side,
    /// Fixed horizontal anchor for this side.
    pub paddle_x: f32,
    pub paddle_y: f32,
    pub score: u32,
    pub connected: bool,
    /// Set once the player has left for good; a departed slot is never
    /// reattached.
    pub departed: bool,
}

impl PlayerSlot {
    pub fn new(id: PlayerId, side: Side, field: &FieldTuning, paddle: &PaddleTuning) -> Self {
        let paddle_x = match side {
            Side::Left => paddle.margin,
            Side::Right => field.width - paddle.margin - paddle.width,
        };
        Self {
            id,
            side,
            paddle_x,
            paddle_y: (field.height - paddle.height) / 2.0,
            score: 0,
            connected: false,
            departed: false,
        }
    }
}

/// Ball state, mutated only by the tick step.
#[derive(Debug, Clone, Copy)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Immutable projection of one slot for clients.
#[derive(Debug, Clone)]
pub struct SlotSnapshot {
    pub id: PlayerId,
    pub side: Side,
    pub paddle_x: f32,
    pub paddle_y: f32,
    pub score: u32,
    pub connected: bool,
}

impl From<&PlayerSlot> for SlotSnapshot {
    fn from(slot: &PlayerSlot) -> Self {
        Self {
            id: slot.id,
            side: slot.side,
            paddle_x: slot.paddle_x,
            paddle_y: slot.paddle_y,
            score: slot.score,
            connected: slot.connected,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BallSnapshot {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl From<&Ball> for BallSnapshot {
    fn from(ball: &Ball) -> Self {
        Self {
            x: ball.x,
            y: ball.y,
            vx: ball.vx,
            vy: ball.vy,
        }
    }
}

/// Full, self-describing projection of a session.
///
/// Clients find their own seat by matching the id embedded in a slot, so the
/// snapshot tolerates duplicate or out-of-order delivery.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub ball: BallSnapshot,
    pub left: Option<SlotSnapshot>,
    pub right: Option<SlotSnapshot>,
    pub active: bool,
    pub winner: Option<PlayerId>,
}
