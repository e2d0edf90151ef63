//! Skill catalog, owned-skill registry and promotion rules

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::MAX_SKILL_LEVEL;

/// Skill families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillKind {
    /// Raises one stat per level
    Base,
    /// Raises battle damage (judgment)
    Think,
    /// Raises battle action rate
    Repeat,
    /// Unique battle effects, gated by an unlock condition
    High,
}

/// Stat a base skill improves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    MaxHp,
    MaxMp,
    Atk,
    Def,
    Matk,
    Mdef,
    Evd,
    Spd,
}

impl StatKind {
    /// Stat gained per skill level
    pub fn per_level(self) -> f32 {
        match self {
            StatKind::MaxHp => 12.0,
            StatKind::MaxMp => 6.0,
            StatKind::Atk | StatKind::Matk => 3.0,
            StatKind::Def | StatKind::Mdef | StatKind::Evd | StatKind::Spd => 2.0,
        }
    }
}

/// Static skill definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillDef {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: SkillKind,
    pub stat: Option<StatKind>,
}

const fn base(id: &'static str, name: &'static str, stat: StatKind) -> SkillDef {
    SkillDef {
        id,
        name,
        kind: SkillKind::Base,
        stat: Some(stat),
    }
}

const fn special(id: &'static str, name: &'static str, kind: SkillKind) -> SkillDef {
    SkillDef {
        id,
        name,
        kind,
        stat: None,
    }
}

pub const BASE_SKILLS: [SkillDef; 8] = [
    base("hp", "Stamina Drill", StatKind::MaxHp),
    base("mp", "Mana Expansion", StatKind::MaxMp),
    base("atk", "Sword Basics", StatKind::Atk),
    base("def", "Guard Basics", StatKind::Def),
    base("matk", "Sorcery Basics", StatKind::Matk),
    base("mdef", "Warding Basics", StatKind::Mdef),
    base("evd", "Evasion Training", StatKind::Evd),
    base("spd", "Agility Training", StatKind::Spd),
];

pub const THINK_SKILLS: [SkillDef; 4] = [
    special("judge", "Situational Judgment", SkillKind::Think),
    special("analyze", "Analytic Eye", SkillKind::Think),
    special("opt", "Optimization", SkillKind::Think),
    special("rebuild", "Reconstruction", SkillKind::Think),
];

pub const REPEAT_SKILLS: [SkillDef; 4] = [
    special("mastery", "Mastery", SkillKind::Repeat),
    special("chant", "Repeated Chant", SkillKind::Repeat),
    special("muscle", "Muscle Memory", SkillKind::Repeat),
    special("auto", "Unconscious Action", SkillKind::Repeat),
];

pub const HIGH_SKILLS: [SkillDef; 4] = [
    special("multi", "Chain Action", SkillKind::High),
    special("crit", "Lethal Analysis", SkillKind::High),
    special("regen", "Auto Regeneration", SkillKind::High),
    special("over", "Mana Overdrive", SkillKind::High),
];

/// Catalog pool for a skill family
pub fn pool(kind: SkillKind) -> &'static [SkillDef] {
    match kind {
        SkillKind::Base => &BASE_SKILLS,
        SkillKind::Think => &THINK_SKILLS,
        SkillKind::Repeat => &REPEAT_SKILLS,
        SkillKind::High => &HIGH_SKILLS,
    }
}

/// Look up a catalog entry by id
pub fn find_def(id: &str) -> Option<&'static SkillDef> {
    BASE_SKILLS
        .iter()
        .chain(THINK_SKILLS.iter())
        .chain(REPEAT_SKILLS.iter())
        .chain(HIGH_SKILLS.iter())
        .find(|s| s.id == id)
}

/// Monotonic counters fed by minigame events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockState {
    pub pairs: u32,
    pub merges: u32,
    pub shuffles: u32,
    pub thought_shards: u32,
}

impl UnlockState {
    /// Fixed unlock predicate for a high-tier skill
    pub fn high_skill_unlocked(&self, id: &str) -> bool {
        match id {
            "multi" => self.merges >= 6,
            "crit" => self.pairs >= 5,
            "regen" => self.thought_shards >= 3,
            "over" => self.shuffles >= 4,
            _ => false,
        }
    }
}

/// An owned skill entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedSkill {
    pub id: String,
    pub name: String,
    pub kind: SkillKind,
    pub stat: Option<StatKind>,
    pub level: u32,
    /// Occupies the slot but grants nothing until promoted
    pub placeholder: bool,
}

impl OwnedSkill {
    /// Level contributing to stats and battle formulas (0 for placeholders)
    pub fn effective_level(&self) -> u32 {
        if self.placeholder { 0 } else { self.level }
    }
}

/// Registry of owned skills, keyed by id
///
/// Ordered map so iteration (stat sums, spawn lotteries) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillBook {
    owned: BTreeMap<String, OwnedSkill>,
}

impl SkillBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&OwnedSkill> {
        self.owned.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OwnedSkill> {
        self.owned.values()
    }

    pub fn len(&self) -> usize {
        self.owned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned.is_empty()
    }

    /// Owned and active (not a placeholder)
    pub fn has(&self, id: &str) -> bool {
        self.get(id).is_some_and(|s| !s.placeholder)
    }

    /// Active level of a skill, 0 if missing or placeholder
    pub fn level_of(&self, id: &str) -> u32 {
        self.get(id).map_or(0, OwnedSkill::effective_level)
    }

    /// Sum of active levels over a skill family
    pub fn kind_level_sum(&self, kind: SkillKind) -> u32 {
        self.iter()
            .filter(|s| s.kind == kind)
            .map(OwnedSkill::effective_level)
            .sum()
    }

    /// Number of active skills in a family
    pub fn active_count(&self, kind: SkillKind) -> usize {
        self.iter()
            .filter(|s| s.kind == kind && !s.placeholder)
            .count()
    }

    /// Insert at level 1, or level up an existing active entry
    ///
    /// Placeholders keep their level; they only change through promotion.
    /// Returns the resulting level.
    pub fn add_or_level(&mut self, def: &SkillDef, placeholder: bool) -> u32 {
        match self.owned.get_mut(def.id) {
            Some(existing) => {
                if !existing.placeholder {
                    existing.level = (existing.level + 1).clamp(1, MAX_SKILL_LEVEL);
                }
                existing.level
            }
            None => {
                self.owned.insert(
                    def.id.to_string(),
                    OwnedSkill {
                        id: def.id.to_string(),
                        name: def.name.to_string(),
                        kind: def.kind,
                        stat: def.stat,
                        level: 1,
                        placeholder,
                    },
                );
                1
            }
        }
    }

    /// Level up an existing active entry only (drop merges)
    ///
    /// Returns `true` if a level was gained.
    pub fn level_up(&mut self, id: &str) -> bool {
        match self.owned.get_mut(id) {
            Some(s) if !s.placeholder && s.level < MAX_SKILL_LEVEL => {
                s.level += 1;
                true
            }
            _ => false,
        }
    }

    /// Promote every high-tier placeholder whose unlock predicate holds
    ///
    /// Returns the ids promoted by this call.
    pub fn promote_placeholders(&mut self, unlock: &UnlockState) -> Vec<String> {
        let mut promoted = Vec::new();
        for skill in self.owned.values_mut() {
            if skill.placeholder
                && skill.kind == SkillKind::High
                && unlock.high_skill_unlocked(&skill.id)
            {
                skill.placeholder = false;
                skill.level = 1;
                log::info!("Skill promoted: {}", skill.id);
                promoted.push(skill.id.clone());
            }
        }
        promoted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn def(id: &str) -> &'static SkillDef {
        find_def(id).unwrap()
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let mut ids: Vec<_> = [SkillKind::Base, SkillKind::Think, SkillKind::Repeat, SkillKind::High]
            .iter()
            .flat_map(|k| pool(*k).iter().map(|s| s.id))
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 20);
    }

    #[test]
    fn test_add_then_level() {
        let mut book = SkillBook::new();
        assert_eq!(book.add_or_level(def("atk"), false), 1);
        assert_eq!(book.add_or_level(def("atk"), false), 2);
        assert_eq!(book.len(), 1);
        assert_eq!(book.level_of("atk"), 2);
    }

    #[test]
    fn test_placeholder_does_not_level() {
        let mut book = SkillBook::new();
        book.add_or_level(def("multi"), true);
        book.add_or_level(def("multi"), true);
        book.add_or_level(def("multi"), false);
        let s = book.get("multi").unwrap();
        assert!(s.placeholder);
        assert_eq!(s.level, 1);
        assert_eq!(book.level_of("multi"), 0);
        assert!(!book.has("multi"));
    }

    #[test]
    fn test_promotion_resets_level() {
        let mut book = SkillBook::new();
        book.add_or_level(def("crit"), true);
        let mut unlock = UnlockState::default();
        assert!(book.promote_placeholders(&unlock).is_empty());

        unlock.pairs = 5;
        let promoted = book.promote_placeholders(&unlock);
        assert_eq!(promoted, vec!["crit".to_string()]);
        assert!(book.has("crit"));
        assert_eq!(book.level_of("crit"), 1);
    }

    #[test]
    fn test_unlock_predicates() {
        let unlock = UnlockState {
            pairs: 5,
            merges: 6,
            shuffles: 3,
            thought_shards: 3,
        };
        assert!(unlock.high_skill_unlocked("multi"));
        assert!(unlock.high_skill_unlocked("crit"));
        assert!(unlock.high_skill_unlocked("regen"));
        assert!(!unlock.high_skill_unlocked("over"));
        assert!(!unlock.high_skill_unlocked("atk"));
    }

    #[test]
    fn test_level_up_respects_cap_and_placeholder() {
        let mut book = SkillBook::new();
        assert!(!book.level_up("atk"));
        book.add_or_level(def("atk"), false);
        for _ in 0..20 {
            book.level_up("atk");
        }
        assert_eq!(book.level_of("atk"), MAX_SKILL_LEVEL);
        book.add_or_level(def("over"), true);
        assert!(!book.level_up("over"));
    }

    proptest! {
        #[test]
        fn prop_level_stays_in_range(acquisitions in 1usize..40, merges in 0usize..40) {
            let mut book = SkillBook::new();
            for _ in 0..acquisitions {
                book.add_or_level(def("spd"), false);
            }
            for _ in 0..merges {
                book.level_up("spd");
            }
            let level = book.get("spd").unwrap().level;
            prop_assert!((1..=MAX_SKILL_LEVEL).contains(&level));
        }
    }
}
