//! Gift of Thought - a 200 second growth-and-battle arcade RPG
//!
//! Core modules:
//! - `sim`: Deterministic simulation (skills, minigames, battle, phase control)
//! - `session`: Host-facing wrapper owning state, RNG, observer and score sink
//! - `settings`: Host configuration
//! - `highscores`: Score sinks and the local leaderboard

pub mod highscores;
pub mod session;
pub mod settings;
pub mod sim;

pub use highscores::{HighScores, ResultSlot, ScoreSink};
pub use session::Session;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Host tick rate the physics constants are tuned for
    pub const TICKS_PER_SECOND: u32 = 30;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / TICKS_PER_SECOND as f32;

    /// Phase durations (seconds)
    pub const PHASE_TITLE: f32 = 12.0;
    pub const PHASE_GROW: f32 = 120.0;
    pub const PHASE_BATTLE: f32 = 60.0;
    pub const PHASE_RESULT: f32 = 8.0;
    pub const TOTAL_TIME: f32 = PHASE_TITLE + PHASE_GROW + PHASE_BATTLE + PHASE_RESULT;

    /// Highest level any skill or drop piece can reach
    pub const MAX_SKILL_LEVEL: u32 = 10;

    /// Base stats before skill bonuses
    pub const BASE_MAX_HP: f32 = 100.0;
    pub const BASE_MAX_MP: f32 = 40.0;
    pub const BASE_ATK: f32 = 10.0;
    pub const BASE_DEF: f32 = 6.0;
    pub const BASE_MATK: f32 = 10.0;
    pub const BASE_MDEF: f32 = 6.0;
    pub const BASE_EVD: f32 = 5.0;
    pub const BASE_SPD: f32 = 10.0;

    /// Memory deck layout (4x4, 8 pairs)
    pub const MEMORY_PAIRS: usize = 8;
    /// Ticks a mismatched pair stays face up
    pub const FLIP_BACK_DELAY_TICKS: u64 = 18;

    /// Drop play area (pixels)
    pub const DROP_AREA_X: f32 = 40.0;
    pub const DROP_AREA_Y: f32 = 160.0;
    pub const DROP_AREA_W: f32 = 600.0;
    pub const DROP_AREA_H: f32 = 480.0;
    pub const DROP_SPAWN_X: f32 = 340.0;
    pub const DROP_SPAWN_Y: f32 = 190.0;
    /// Inset between a piece and the area walls
    pub const DROP_WALL_INSET: f32 = 4.0;
    /// Settled pieces above this line drain hp
    pub const DROP_DANGER_LINE: f32 = DROP_AREA_Y + 60.0;
    pub const DROP_DANGER_DRAIN: f32 = 1.5;
    pub const DROP_MAX_PIECES: usize = 40;
    pub const DROP_COOLDOWN_TICKS: u32 = 10;

    /// Piece physics (pixels/s, pixels/s²)
    pub const GRAVITY: f32 = 495.0;
    pub const BOUNCE: f32 = -0.15;
    pub const REST_SNAP_SPEED: f32 = 6.0;
    pub const NEAR_REST_SPEED: f32 = 24.0;

    /// Piece radii
    pub const PIECE_BASE_RADIUS: f32 = 16.0;
    pub const PIECE_RADIUS_PER_LEVEL: f32 = 6.0;
    pub const SHARD_RADIUS: f32 = 12.0;
    /// Mana restored when a shard settles
    pub const SHARD_MANA: f32 = 6.0;
}

/// Clamp `v` into `[min, max]` (`max` wins if the range is inverted)
#[inline]
pub fn clamp(v: f32, min: f32, max: f32) -> f32 {
    v.max(min).min(max)
}

/// Linear interpolation from `a` to `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
