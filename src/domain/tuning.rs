/// Gameplay tuning for a match.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer
/// sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct FieldTuning {
    /// Playfield width in world units.
    pub width: f32,
    /// Playfield height in world units.
    pub height: f32,
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PaddleTuning {
    /// Paddle width in world units.
    pub width: f32,
    /// Paddle height in world units.
    pub height: f32,
    /// Vertical displacement per move intent, in world units.
    pub speed: f32,
    /// Gutter between the goal line and the paddle face.
    pub margin: f32,
}

impl Default for PaddleTuning {
    fn default() -> Self {
        Self {
            width: 20.0,
            height: 80.0,
            speed: 8.0,
            margin: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BallTuning {
    /// Edge length of the square hitbox in world units.
    pub size: f32,
    /// Horizontal speed in world units per tick.
    pub base_speed: f32,
}

impl Default for BallTuning {
    fn default() -> Self {
        Self {
            size: 20.0,
            base_speed: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RulesTuning {
    /// Score at which a match ends.
    pub win_threshold: u32,
}

impl Default for RulesTuning {
    fn default() -> Self {
        Self { win_threshold: 5 }
    }
}

/// Aggregate tuning handed to a session at creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tuning {
    pub field: FieldTuning,
    pub paddle: PaddleTuning,
    pub ball: BallTuning,
    pub rules: RulesTuning,
}
