//! Score sinks and the high score leaderboard
//!
//! A finished session hands its [`SessionResult`] to a [`ScoreSink`]. The
//! crate ships two: a single [`ResultSlot`] and a top-10 [`HighScores`] table
//! persisted as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sim::SessionResult;

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// Receiver for the final result of a session
pub trait ScoreSink {
    fn submit(&mut self, result: &SessionResult);
}

/// Holds the most recent result for a hosting ranking system to pick up
#[derive(Debug, Clone, Default)]
pub struct ResultSlot {
    result: Option<SessionResult>,
}

impl ResultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    /// Take the result, leaving the slot empty
    pub fn take(&mut self) -> Option<SessionResult> {
        self.result.take()
    }
}

impl ScoreSink for ResultSlot {
    fn submit(&mut self, result: &SessionResult) {
        self.result = Some(result.clone());
    }
}

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    pub title: String,
    /// Enemy level reached
    pub enemy_level: u32,
    pub kills: u32,
    pub escaped: bool,
    /// Seed the session ran with
    pub seed: u64,
}

/// High score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
    /// Seed stamped onto entries submitted through [`ScoreSink`]
    #[serde(skip)]
    pub current_seed: u64,
}

impl HighScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Add a session result; returns the rank achieved (1-indexed)
    pub fn add_result(&mut self, result: &SessionResult, seed: u64) -> Option<usize> {
        if !self.qualifies(result.score) {
            return None;
        }

        let entry = HighScoreEntry {
            score: result.score,
            title: result.title.clone(),
            enemy_level: result.enemy_level,
            kills: result.kills,
            escaped: result.escaped,
            seed,
        };

        // Sorted descending; ties keep the earlier entry first
        let pos = self.entries.iter().position(|e| entry.score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };
        self.entries.truncate(MAX_HIGH_SCORES);
        log::info!("High score {} at rank {}", result.score, rank);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load the leaderboard from `path`, or start fresh
    pub fn load(path: &Path) -> Self {
        if let Ok(json) = std::fs::read_to_string(path) {
            match serde_json::from_str::<HighScores>(&json) {
                Ok(scores) => {
                    log::info!("Loaded {} high scores", scores.entries.len());
                    return scores;
                }
                Err(e) => log::warn!("Ignoring corrupt leaderboard {}: {}", path.display(), e),
            }
        }

        log::info!("No high scores found, starting fresh");
        Self::new()
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

impl ScoreSink for HighScores {
    fn submit(&mut self, result: &SessionResult) {
        let seed = self.current_seed;
        self.add_result(result, seed);
    }
}
