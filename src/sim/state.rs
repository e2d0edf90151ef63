//! Session state and the skill-side state transitions
//!
//! Everything a session owns lives in [`GameState`]: stats, skills, unlock
//! counters, both minigames, the battle and the deferred-action queue.

use serde::{Deserialize, Serialize};

use super::battle::Battle;
use super::deferred::{DeferredAction, DeferredQueue};
use super::drop::{DropEvent, DropGame};
use super::events::{SessionObserver, SessionResult};
use super::memory::{FlipOutcome, MemoryGame};
use super::rng::RandomSource;
use super::skills::{SkillBook, SkillDef, SkillKind, UnlockState, find_def};
use super::stats::{Ailments, Stats};
use crate::consts::*;

/// Session phases, in order; a session only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    /// Rules overlay, auto-advances after 12s or on skip
    Title,
    /// Memory and drop minigames
    Grow,
    /// Automated battle
    Battle,
    /// Score shown; terminal
    Result,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Title => "TITLE",
            GamePhase::Grow => "GROW",
            GamePhase::Battle => "BATTLE",
            GamePhase::Result => "RESULT",
        }
    }

    /// Following phase (`Result` is terminal)
    pub fn next(self) -> Self {
        match self {
            GamePhase::Title => GamePhase::Grow,
            GamePhase::Grow => GamePhase::Battle,
            GamePhase::Battle | GamePhase::Result => GamePhase::Result,
        }
    }

    /// Phase scheduled for a given elapsed session time
    pub fn scheduled_at(elapsed: f32) -> Self {
        if elapsed < PHASE_TITLE {
            GamePhase::Title
        } else if elapsed < PHASE_TITLE + PHASE_GROW {
            GamePhase::Grow
        } else if elapsed < PHASE_TITLE + PHASE_GROW + PHASE_BATTLE {
            GamePhase::Battle
        } else {
            GamePhase::Result
        }
    }
}

/// Growth-phase tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tab {
    #[default]
    Memory,
    Drop,
}

/// Cancelable auto-advance timer for the title screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleTimer {
    pub active: bool,
    pub elapsed: f32,
    pub canceled: bool,
}

impl TitleTimer {
    pub fn start(&mut self) {
        *self = Self {
            active: true,
            elapsed: 0.0,
            canceled: false,
        };
    }

    pub fn cancel(&mut self) {
        if self.active {
            self.active = false;
            self.canceled = true;
        }
    }

    /// Advance by `dt`; returns `true` exactly once, when the timer fires
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.active || self.canceled {
            return false;
        }
        self.elapsed += dt;
        if self.elapsed >= PHASE_TITLE {
            self.active = false;
            return true;
        }
        false
    }
}

/// Complete session state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Session seconds elapsed
    pub elapsed: f32,
    /// Current phase
    pub phase: GamePhase,
    pub title_timer: TitleTimer,
    /// Active growth tab
    pub tab: Tab,
    pub stats: Stats,
    pub ailments: Ailments,
    pub skills: SkillBook,
    pub unlock: UnlockState,
    pub memory: MemoryGame,
    pub drop: DropGame,
    pub battle: Battle,
    pub deferred: DeferredQueue,
    /// Set once on entering `Result`
    pub result: Option<SessionResult>,
    /// Fixed session window has fully elapsed
    pub finished: bool,
    /// Maxima seen last grow tick, for the refill-on-growth rule
    last_max_hp: f32,
    last_max_mp: f32,
}

impl GameState {
    /// Fresh session on the title screen with an initial memory deck
    pub fn new(rng: &mut dyn RandomSource) -> Self {
        let stats = Stats::default();
        let mut title_timer = TitleTimer::default();
        title_timer.start();
        Self {
            time_ticks: 0,
            elapsed: 0.0,
            phase: GamePhase::Title,
            title_timer,
            tab: Tab::Memory,
            last_max_hp: stats.max_hp,
            last_max_mp: stats.max_mp,
            stats,
            ailments: Ailments::default(),
            skills: SkillBook::new(),
            unlock: UnlockState::default(),
            memory: MemoryGame::new(rng, 0.0),
            drop: DropGame::new(),
            battle: Battle::new(),
            deferred: DeferredQueue::new(),
            result: None,
            finished: false,
        }
    }

    /// Growth progress in `[0, 1]`
    pub fn grow_progress(&self) -> f32 {
        ((self.elapsed - PHASE_TITLE) / PHASE_GROW).clamp(0.0, 1.0)
    }

    pub fn recompute_stats(&mut self) {
        self.stats.recompute(&self.skills);
    }

    /// Grant a skill (new at level 1, or a level up) and recompute stats
    pub fn add_or_level_skill(&mut self, def: &SkillDef, placeholder: bool) {
        let level = self.skills.add_or_level(def, placeholder);
        log::debug!("Skill {} -> Lv{} (placeholder: {})", def.id, level, placeholder);
        self.recompute_stats();
    }

    /// Promote satisfied placeholders and recompute stats
    pub fn try_promote_placeholders(&mut self) -> Vec<String> {
        let promoted = self.skills.promote_placeholders(&self.unlock);
        self.recompute_stats();
        promoted
    }

    /// Whether a newly granted skill must start as a placeholder
    pub fn grants_placeholder(&self, def: &SkillDef) -> bool {
        def.kind == SkillKind::High && !self.unlock.high_skill_unlocked(def.id)
    }

    /// Flip a memory card and apply any match reward
    pub fn flip_card(&mut self, index: usize, observer: &mut dyn SessionObserver) -> FlipOutcome {
        let outcome = self.memory.flip(index, self.time_ticks, &mut self.deferred);
        if outcome != FlipOutcome::Rejected {
            observer.on_memory_changed(&self.memory);
        }
        if let FlipOutcome::Matched { skill_id } = &outcome {
            self.unlock.pairs += 1;
            if let Some(def) = find_def(skill_id) {
                let placeholder = self.grants_placeholder(def);
                self.add_or_level_skill(def, placeholder);
            }
            self.try_promote_placeholders();
            observer.on_pairs_changed(self.memory.pairs());
            observer.on_stats_changed(&self.stats);
        }
        outcome
    }

    /// Switch growth tab; moving to the drop tab reshuffles the memory deck
    pub fn switch_tab(&mut self, tab: Tab, rng: &mut dyn RandomSource) {
        if self.tab == tab {
            return;
        }
        self.tab = tab;
        if tab == Tab::Drop {
            self.reshuffle_memory(rng, true);
        }
    }

    /// Rebuild the memory deck, optionally crediting a shuffle
    pub fn reshuffle_memory(&mut self, rng: &mut dyn RandomSource, credit: bool) {
        if credit {
            self.unlock.shuffles += 1;
        }
        let stale = self.memory.generation;
        self.deferred
            .cancel_where(|a| matches!(a, DeferredAction::FlipBack { deck, .. } if *deck == stale));
        let t = self.grow_progress();
        self.memory.reset_deck(rng, t);
        if credit {
            self.try_promote_placeholders();
        }
    }

    /// Fire deferred actions due this tick
    pub fn run_deferred(&mut self, observer: &mut dyn SessionObserver) {
        for action in self.deferred.drain_due(self.time_ticks) {
            match action {
                DeferredAction::FlipBack {
                    deck,
                    first,
                    second,
                } => {
                    if self.memory.flip_back(deck, first, second) {
                        observer.on_memory_changed(&self.memory);
                    }
                }
            }
        }
    }

    /// Apply side effects of a drop-box tick
    pub fn apply_drop_events(&mut self, events: &[DropEvent]) -> bool {
        let mut changed = false;
        for event in events {
            match event {
                DropEvent::Merged { skill_id, .. } => {
                    self.unlock.merges += 1;
                    self.skills.level_up(skill_id);
                    self.recompute_stats();
                    self.try_promote_placeholders();
                }
                DropEvent::Annihilated { skill_id } => {
                    log::debug!("Placeholder pieces annihilated: {}", skill_id);
                }
                DropEvent::ShardSettled => {
                    self.unlock.thought_shards += 1;
                    self.stats.add_mp(SHARD_MANA);
                    self.try_promote_placeholders();
                }
            }
            changed = true;
        }
        changed
    }

    /// Refill hp/mp when their maxima grew during the grow phase
    ///
    /// Returns `true` if anything was refilled.
    pub fn refill_on_growth(&mut self) -> bool {
        let mut refilled = false;
        if self.stats.max_hp > self.last_max_hp {
            self.stats.hp = self.stats.max_hp;
            refilled = true;
        }
        if self.stats.max_mp > self.last_max_mp {
            self.stats.mp = self.stats.max_mp;
            refilled = true;
        }
        self.track_maxima();
        refilled
    }

    pub fn track_maxima(&mut self) {
        self.last_max_hp = self.stats.max_hp;
        self.last_max_mp = self.stats.max_mp;
    }
}
