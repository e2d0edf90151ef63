//! Player stats and status ailments

use serde::{Deserialize, Serialize};

use super::skills::{SkillBook, StatKind};
use crate::clamp;
use crate::consts::*;

/// Player combat stats
///
/// `hp` and `mp` always sit inside `[0, max]` after any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub max_hp: f32,
    pub hp: f32,
    pub max_mp: f32,
    pub mp: f32,
    pub atk: f32,
    pub def: f32,
    pub matk: f32,
    pub mdef: f32,
    pub evd: f32,
    pub spd: f32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            max_hp: BASE_MAX_HP,
            hp: BASE_MAX_HP,
            max_mp: BASE_MAX_MP,
            mp: BASE_MAX_MP,
            atk: BASE_ATK,
            def: BASE_DEF,
            matk: BASE_MATK,
            mdef: BASE_MDEF,
            evd: BASE_EVD,
            spd: BASE_SPD,
        }
    }
}

impl Stats {
    /// Derive stats from base values plus active skills
    ///
    /// Pure in `(skills, hp, mp)`: current hp/mp carry over, clamped into the
    /// new maxima, and are never raised here.
    pub fn from_skills(skills: &SkillBook, hp: f32, mp: f32) -> Self {
        let mut stats = Self::default();
        for skill in skills.iter() {
            let Some(stat) = skill.stat else { continue };
            let gain = stat.per_level() * skill.effective_level() as f32;
            match stat {
                StatKind::MaxHp => stats.max_hp += gain,
                StatKind::MaxMp => stats.max_mp += gain,
                StatKind::Atk => stats.atk += gain,
                StatKind::Def => stats.def += gain,
                StatKind::Matk => stats.matk += gain,
                StatKind::Mdef => stats.mdef += gain,
                StatKind::Evd => stats.evd += gain,
                StatKind::Spd => stats.spd += gain,
            }
        }
        stats.hp = hp;
        stats.mp = mp;
        stats.clamp_resources();
        stats
    }

    /// Recompute in place from the owned skills
    pub fn recompute(&mut self, skills: &SkillBook) {
        *self = Self::from_skills(skills, self.hp, self.mp);
    }

    pub fn clamp_resources(&mut self) {
        self.hp = clamp(self.hp, 0.0, self.max_hp);
        self.mp = clamp(self.mp, 0.0, self.max_mp);
    }

    /// Change hp by `delta`, clamped
    pub fn add_hp(&mut self, delta: f32) {
        self.hp = clamp(self.hp + delta, 0.0, self.max_hp);
    }

    /// Change mp by `delta`, clamped
    pub fn add_mp(&mut self, delta: f32) {
        self.mp = clamp(self.mp + delta, 0.0, self.max_mp);
    }

    /// Fraction of max hp remaining
    pub fn hp_rate(&self) -> f32 {
        self.hp / self.max_hp.max(1.0)
    }

    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }
}

/// Status ailment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ailment {
    /// hp drain over time
    Poison,
    /// Slower actions
    Paralysis,
    /// Weaker defense
    Injury,
    /// No regeneration at all
    BigInjury,
    /// Higher mana cost
    Mental,
    /// Weaker healing
    Sick,
}

impl Ailment {
    pub const ALL: [Ailment; 6] = [
        Ailment::Poison,
        Ailment::Paralysis,
        Ailment::Injury,
        Ailment::BigInjury,
        Ailment::Mental,
        Ailment::Sick,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ailment::Poison => "poison",
            Ailment::Paralysis => "paralysis",
            Ailment::Injury => "injury",
            Ailment::BigInjury => "big injury",
            Ailment::Mental => "mental",
            Ailment::Sick => "sick",
        }
    }
}

/// Remaining seconds per ailment (0 = inactive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ailments {
    pub poison: f32,
    pub paralysis: f32,
    pub injury: f32,
    pub big_injury: f32,
    pub mental: f32,
    pub sick: f32,
}

impl Ailments {
    fn slot_mut(&mut self, ailment: Ailment) -> &mut f32 {
        match ailment {
            Ailment::Poison => &mut self.poison,
            Ailment::Paralysis => &mut self.paralysis,
            Ailment::Injury => &mut self.injury,
            Ailment::BigInjury => &mut self.big_injury,
            Ailment::Mental => &mut self.mental,
            Ailment::Sick => &mut self.sick,
        }
    }

    pub fn remaining(&self, ailment: Ailment) -> f32 {
        match ailment {
            Ailment::Poison => self.poison,
            Ailment::Paralysis => self.paralysis,
            Ailment::Injury => self.injury,
            Ailment::BigInjury => self.big_injury,
            Ailment::Mental => self.mental,
            Ailment::Sick => self.sick,
        }
    }

    pub fn is_active(&self, ailment: Ailment) -> bool {
        self.remaining(ailment) > 0.0
    }

    /// Raise the timer to `max(current, duration)`; durations never stack
    pub fn inflict(&mut self, ailment: Ailment, duration: f32) {
        let slot = self.slot_mut(ailment);
        *slot = slot.max(duration);
    }

    /// Count every timer down by `dt`, floored at 0
    pub fn decay(&mut self, dt: f32) {
        for ailment in Ailment::ALL {
            let slot = self.slot_mut(ailment);
            if *slot > 0.0 {
                *slot = (*slot - dt).max(0.0);
            }
        }
    }

    pub fn active(&self) -> impl Iterator<Item = Ailment> + '_ {
        Ailment::ALL.into_iter().filter(|a| self.is_active(*a))
    }

    /// Action rate multiplier
    pub fn action_multiplier(&self) -> f32 {
        if self.is_active(Ailment::Paralysis) { 0.7 } else { 1.0 }
    }

    /// Defense effectiveness multiplier
    pub fn defense_multiplier(&self) -> f32 {
        if self.is_active(Ailment::Injury) { 0.8 } else { 1.0 }
    }

    /// Mana cost multiplier
    pub fn mana_cost_multiplier(&self) -> f32 {
        if self.is_active(Ailment::Mental) { 1.35 } else { 1.0 }
    }

    /// Healing amount multiplier
    pub fn heal_multiplier(&self) -> f32 {
        if self.is_active(Ailment::Sick) { 0.6 } else { 1.0 }
    }

    pub fn can_regenerate(&self) -> bool {
        !self.is_active(Ailment::BigInjury)
    }
}
