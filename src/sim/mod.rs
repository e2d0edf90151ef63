//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only, drawn through [`RandomSource`]
//! - Stable iteration order (skills by id, pieces by id)
//! - No rendering or platform dependencies; views listen via [`SessionObserver`]

pub mod battle;
pub mod collision;
pub mod deferred;
pub mod drop;
pub mod events;
pub mod memory;
pub mod rng;
pub mod skills;
pub mod state;
pub mod stats;
pub mod tick;

pub use battle::{Battle, BattleReport, battle_tick, calc_score, decide_title};
pub use collision::{CollisionResult, circle_overlap};
pub use deferred::{DeferredAction, DeferredQueue};
pub use drop::{DropEvent, DropGame, Piece, PieceKind};
pub use events::{NullObserver, RecordingObserver, SessionObserver, SessionResult};
pub use memory::{Card, FlipOutcome, MemoryGame};
pub use rng::{RandomSource, SequenceRng, SessionRng};
pub use skills::{OwnedSkill, SkillBook, SkillDef, SkillKind, StatKind, UnlockState};
pub use state::{GamePhase, GameState, Tab, TitleTimer};
pub use stats::{Ailment, Ailments, Stats};
pub use tick::{TickInput, tick};
