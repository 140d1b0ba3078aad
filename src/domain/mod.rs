// Domain layer: core match state, physics systems and gameplay tuning.

pub mod state;
pub mod systems;
pub mod tuning;

pub use state::{
    Ball, BallSnapshot, MoveDirection, PlayerId, PlayerSlot, SessionId, SessionSnapshot, Side,
    SlotSnapshot,
};
