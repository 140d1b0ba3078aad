use crate::domain::state::{Ball, MoveDirection, PlayerId, PlayerSlot, SessionId, SessionSnapshot, Side};
use crate::domain::systems::physics::{self, Paddle, PhysicsConfig};
use crate::domain::tuning::Tuning;
use crate::use_cases::types::EndReason;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Lifecycle phase of one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Waiting,
    Starting,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Both slots are now connected for the first time.
    Ready,
    /// Re-entrant or unknown join; nothing changed.
    Noop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Scored { side: Side },
    Won { winner: PlayerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The id has no live seat here; nothing changed.
    NotInSession,
    /// One connected slot remains and wins by forfeit.
    Forfeit {
        winner: PlayerId,
        left_side: Side,
    },
    /// No connected slots remain; the session must be torn down, no winner.
    Abandoned,
}

/// Authoritative state machine for one match.
///
/// All mutation goes through the owning session task, so the methods here are
/// plain synchronous transitions.
pub struct GameSession {
    id: SessionId,
    slots: [Option<PlayerSlot>; 2],
    ball: Ball,
    phase: Phase,
    winner: Option<PlayerId>,
    end_reason: Option<EndReason>,
    tuning: Tuning,
    physics: PhysicsConfig,
    rng: StdRng,
}

impl GameSession {
    /// Creates a session for a freshly paired couple; the first id takes the
    /// left side.
    pub fn new(id: SessionId, left_id: PlayerId, right_id: PlayerId, tuning: Tuning) -> Self {
        let physics = PhysicsConfig::new(&tuning.field, &tuning.paddle, &tuning.ball);
        let mut rng = StdRng::from_entropy();
        let ball = physics::serve(&physics, &mut rng);
        Self {
            id,
            slots: [
                Some(PlayerSlot::new(
                    left_id,
                    Side::Left,
                    &tuning.field,
                    &tuning.paddle,
                )),
                Some(PlayerSlot::new(
                    right_id,
                    Side::Right,
                    &tuning.field,
                    &tuning.paddle,
                )),
            ],
            ball,
            phase: Phase::Waiting,
            winner: None,
            end_reason: None,
            tuning,
            physics,
            rng,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn both_connected(&self) -> bool {
        self.connected_count() == 2
    }

    fn connected_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.connected)
            .count()
    }

    fn slot_of(&mut self, player_id: PlayerId) -> Option<&mut PlayerSlot> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|slot| slot.id == player_id)
    }

    /// Marks a slot's transport as attached.
    pub fn connect(&mut self, player_id: PlayerId) -> ConnectOutcome {
        if self.phase != Phase::Waiting {
            return ConnectOutcome::Noop;
        }
        let Some(slot) = self.slot_of(player_id) else {
            return ConnectOutcome::Noop;
        };
        if slot.connected || slot.departed {
            return ConnectOutcome::Noop;
        }
        slot.connected = true;
        if self.both_connected() {
            self.phase = Phase::Starting;
            ConnectOutcome::Ready
        } else {
            ConnectOutcome::Noop
        }
    }

    /// Promotes Starting to Active; a no-op unless both slots survived the
    /// grace window.
    pub fn activate(&mut self) -> bool {
        if self.phase == Phase::Starting && self.both_connected() {
            self.phase = Phase::Active;
            true
        } else {
            false
        }
    }

    /// Displaces the paddle one step; dropped while the slot is detached or
    /// the match is over.
    pub fn apply_move(&mut self, player_id: PlayerId, direction: MoveDirection) {
        if self.phase == Phase::Ended {
            return;
        }
        let max_y = self.tuning.field.height - self.tuning.paddle.height;
        let speed = self.tuning.paddle.speed;
        let Some(slot) = self.slot_of(player_id) else {
            return;
        };
        if !slot.connected {
            return;
        }
        let delta = match direction {
            MoveDirection::Up => -speed,
            MoveDirection::Down => speed,
        };
        slot.paddle_y = (slot.paddle_y + delta).clamp(0.0, max_y);
    }

    /// Marks a slot as gone for good and resolves the forfeit rules.
    pub fn leave(&mut self, player_id: PlayerId) -> LeaveOutcome {
        if self.phase == Phase::Ended {
            // The remaining player abandoning an already-forfeited match
            // erases the winner: both parties left.
            if self.end_reason == Some(EndReason::Forfeit) && self.winner == Some(player_id) {
                if let Some(slot) = self.slot_of(player_id) {
                    slot.connected = false;
                    slot.departed = true;
                }
                self.winner = None;
                self.end_reason = Some(EndReason::Abandoned);
                return LeaveOutcome::Abandoned;
            }
            return LeaveOutcome::NotInSession;
        }

        let Some(slot) = self.slot_of(player_id) else {
            return LeaveOutcome::NotInSession;
        };
        if slot.departed {
            return LeaveOutcome::NotInSession;
        }
        let left_side = slot.side;
        slot.connected = false;
        slot.departed = true;

        let survivor = self
            .slots
            .iter()
            .flatten()
            .find(|slot| slot.connected)
            .map(|slot| slot.id);
        self.phase = Phase::Ended;
        match survivor {
            Some(winner) => {
                self.winner = Some(winner);
                self.end_reason = Some(EndReason::Forfeit);
                LeaveOutcome::Forfeit { winner, left_side }
            }
            None => {
                self.winner = None;
                self.end_reason = Some(EndReason::Abandoned);
                LeaveOutcome::Abandoned
            }
        }
    }

    /// Advances physics one tick and applies scoring and the win threshold.
    pub fn step(&mut self) -> StepOutcome {
        if self.phase != Phase::Active {
            return StepOutcome::Continue;
        }

        let paddle_for = |slot: &Option<PlayerSlot>| {
            slot.as_ref().filter(|slot| slot.connected).map(|slot| Paddle {
                x: slot.paddle_x,
                y: slot.paddle_y,
            })
        };
        let left = paddle_for(&self.slots[Side::Left.index()]);
        let right = paddle_for(&self.slots[Side::Right.index()]);

        let Some(side) = physics::step_ball(&mut self.ball, left, right, &self.physics, &mut self.rng)
        else {
            return StepOutcome::Continue;
        };

        let threshold = self.tuning.rules.win_threshold;
        let Some(scorer) = self.slots[side.index()].as_mut() else {
            return StepOutcome::Continue;
        };
        scorer.score += 1;
        if scorer.score >= threshold {
            let winner = scorer.id;
            self.phase = Phase::Ended;
            self.winner = Some(winner);
            self.end_reason = Some(EndReason::Score);
            StepOutcome::Won { winner }
        } else {
            StepOutcome::Scored { side }
        }
    }

    /// Immutable projection of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            ball: (&self.ball).into(),
            left: self.slots[Side::Left.index()].as_ref().map(Into::into),
            right: self.slots[Side::Right.index()].as_ref().map(Into::into),
            active: self.phase == Phase::Active,
            winner: self.winner,
        }
    }
}
