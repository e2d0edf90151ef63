//! Presentation hooks and the exported session result
//!
//! The simulation never touches a view layer. It reports through an injected
//! [`SessionObserver`] after each mutating step; every method defaults to a
//! no-op so hosts only implement what they draw.

use serde::{Deserialize, Serialize};

use super::memory::MemoryGame;
use super::state::GamePhase;
use super::stats::Stats;

/// Final record handed to the score sink when a session reaches `Result`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub score: u64,
    pub title: String,
    pub kills: u32,
    pub enemy_level: u32,
    pub hp: f32,
    pub pairs: u32,
    pub merges: u32,
    pub escaped: bool,
    /// Ended by hp depletion (score forced to 0)
    pub defeated: bool,
}

/// View-layer callbacks
#[allow(unused_variables)]
pub trait SessionObserver {
    /// Memory pair count changed
    fn on_pairs_changed(&mut self, pairs: u32) {}
    /// Stats, skills or ailments changed
    fn on_stats_changed(&mut self, stats: &Stats) {}
    /// Memory board changed (flip, flip-back, rebuild)
    fn on_memory_changed(&mut self, memory: &MemoryGame) {}
    fn on_phase_changed(&mut self, phase: GamePhase) {}
    fn on_result(&mut self, result: &SessionResult) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SessionObserver for NullObserver {}

/// Observer that records every notification, for tests and replays
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub pairs: Vec<u32>,
    pub stats_changes: usize,
    pub memory_changes: usize,
    pub phases: Vec<GamePhase>,
    pub results: Vec<SessionResult>,
}

impl SessionObserver for RecordingObserver {
    fn on_pairs_changed(&mut self, pairs: u32) {
        self.pairs.push(pairs);
    }

    fn on_stats_changed(&mut self, _stats: &Stats) {
        self.stats_changes += 1;
    }

    fn on_memory_changed(&mut self, _memory: &MemoryGame) {
        self.memory_changes += 1;
    }

    fn on_phase_changed(&mut self, phase: GamePhase) {
        self.phases.push(phase);
    }

    fn on_result(&mut self, result: &SessionResult) {
        self.results.push(result.clone());
    }
}
