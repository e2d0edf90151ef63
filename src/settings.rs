//! Host settings
//!
//! Stored as JSON next to the leaderboard. Missing or malformed files fall
//! back to defaults.

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::consts::TICKS_PER_SECOND;
use crate::sim::battle::{MAX_SPEED, MIN_SPEED};

/// Battle speed presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
pub enum SpeedPreset {
    #[default]
    #[value(alias = "1")]
    Normal,
    #[value(alias = "3")]
    Fast,
    #[value(alias = "5")]
    Turbo,
}

impl SpeedPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedPreset::Normal => "Normal",
            SpeedPreset::Fast => "Fast",
            SpeedPreset::Turbo => "Turbo",
        }
    }

    /// Battle speed multiplier for this preset
    pub fn multiplier(&self) -> u8 {
        match self {
            SpeedPreset::Normal => 1,
            SpeedPreset::Fast => 3,
            SpeedPreset::Turbo => MAX_SPEED,
        }
    }
}

/// Host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// RNG seed; `None` picks one from the clock
    pub seed: Option<u64>,
    /// Initial battle speed
    pub speed: SpeedPreset,
    /// Host ticks per second
    pub tick_rate: u32,
    /// Let the built-in driver play the minigames
    pub autoplay: bool,
    /// Record finished sessions in the leaderboard
    pub record_scores: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,
            speed: SpeedPreset::Normal,
            tick_rate: TICKS_PER_SECOND,
            autoplay: true,
            record_scores: true,
        }
    }
}

impl Settings {
    /// Fixed timestep in seconds
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Speed multiplier clamped into the battle's range
    pub fn battle_speed(&self) -> u8 {
        self.speed.multiplier().clamp(MIN_SPEED, MAX_SPEED)
    }

    /// Parse settings JSON
    pub fn from_json(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(settings) => Some(settings),
            Err(e) => {
                log::warn!("Invalid settings: {}", e);
                None
            }
        }
    }

    /// Load settings from `path`, or defaults
    pub fn load(path: &Path) -> Self {
        if let Ok(json) = std::fs::read_to_string(path) {
            if let Some(settings) = Self::from_json(&json) {
                log::info!("Loaded settings from {}", path.display());
                return settings;
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to `path`
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved");
        Ok(())
    }
}
