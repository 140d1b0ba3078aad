// Wire protocol DTOs and conversions for public server messages.

use crate::domain::{
    BallSnapshot, MoveDirection, PlayerId, SessionSnapshot, Side, SlotSnapshot,
};
use crate::use_cases::EndReason;
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Greeting with the identity assigned to this connection.
    Welcome { message: String, player_id: PlayerId },
    // Seat assignment once a pairing lands.
    PlayerAssigned { side: SideDto, player_id: PlayerId },
    // Full state projection, once per tick and on lifecycle transitions.
    StateSnapshot(SnapshotDto),
    // The start grace delay is running; the rally begins shortly.
    MatchStarting,
    // Terminal result for the match.
    MatchEnded {
        winner: Option<PlayerId>,
        reason: EndReasonDto,
    },
    // The other seat disconnected mid-match.
    OpponentLeft { side: SideDto },
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Start or resume matchmaking for the calling connection.
    Join,
    // Paddle movement; dropped while the connection has no live seat.
    Move(MovePayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovePayload {
    pub direction: DirectionDto,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionDto {
    Up,
    Down,
}

impl From<DirectionDto> for MoveDirection {
    fn from(direction: DirectionDto) -> Self {
        match direction {
            DirectionDto::Up => MoveDirection::Up,
            DirectionDto::Down => MoveDirection::Down,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideDto {
    Left,
    Right,
}

impl From<Side> for SideDto {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => SideDto::Left,
            Side::Right => SideDto::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReasonDto {
    Score,
    Forfeit,
    Abandoned,
}

impl From<EndReason> for EndReasonDto {
    fn from(reason: EndReason) -> Self {
        match reason {
            EndReason::Score => EndReasonDto::Score,
            EndReason::Forfeit => EndReasonDto::Forfeit,
            EndReason::Abandoned => EndReasonDto::Abandoned,
        }
    }
}

/// Snapshot of one session sent to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDto {
    pub ball: BallDto,
    pub players: PlayersDto,
    pub active: bool,
    pub winner: Option<PlayerId>,
}

impl From<SessionSnapshot> for SnapshotDto {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            ball: BallDto::from(&snapshot.ball),
            players: PlayersDto {
                left: snapshot.left.as_ref().map(SlotDto::from),
                right: snapshot.right.as_ref().map(SlotDto::from),
            },
            active: snapshot.active,
            winner: snapshot.winner,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BallDto {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl From<&BallSnapshot> for BallDto {
    fn from(ball: &BallSnapshot) -> Self {
        Self {
            x: ball.x,
            y: ball.y,
            vx: ball.vx,
            vy: ball.vy,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayersDto {
    pub left: Option<SlotDto>,
    pub right: Option<SlotDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotDto {
    pub id: PlayerId,
    pub side: SideDto,
    pub paddle: PaddleDto,
    pub score: u32,
    pub connected: bool,
}

impl From<&SlotSnapshot> for SlotDto {
    fn from(slot: &SlotSnapshot) -> Self {
        Self {
            id: slot.id,
            side: slot.side.into(),
            paddle: PaddleDto {
                x: slot.paddle_x,
                y: slot.paddle_y,
            },
            score: slot.score,
            connected: slot.connected,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaddleDto {
    pub x: f32,
    pub y: f32,
}

/// Operational counters exposed on the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub active_sessions: usize,
    pub queued_players: usize,
}
