//! Automated battle simulation and scoring
//!
//! Each call to [`battle_tick`] advances `dt` seconds of combat: action rate
//! from speed and repeat skills, ailment effects, regeneration, mana-fuelled
//! damage against an endlessly respawning enemy, incoming damage, one ailment
//! roll and the one-time talent wall check.

use serde::{Deserialize, Serialize};

use super::rng::RandomSource;
use super::skills::{SkillBook, SkillKind};
use super::stats::{Ailment, Ailments, Stats};
use crate::clamp;

/// Seconds of battle per enemy level
pub const SECONDS_PER_ENEMY_LEVEL: f32 = 6.0;
/// Earliest battle time the talent wall can break
pub const WALL_MIN_TIME: f32 = 20.0;
/// Per-second chance of a talent wall check
pub const WALL_CHANCE_PER_SEC: f32 = 0.0025;
pub const WALL_BONUS_KILLS: u32 = 8;
pub const WALL_SCORE_BONUS: u64 = 500;
pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 5;

/// Enemy level after `time` seconds of battle
pub fn enemy_level_at(time: f32) -> u32 {
    1 + (time.max(0.0) / SECONDS_PER_ENEMY_LEVEL).floor() as u32
}

/// Enemy hp pool for a level
pub fn enemy_max_hp_for(level: u32) -> f32 {
    18.0 + level as f32 * 7.0
}

/// Score multiplier for a kill streak (capped at x3)
pub fn streak_multiplier(streak: u32) -> f64 {
    1.0 + (streak as f64 / 25.0).min(2.0)
}

/// Battle progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    /// Simulated battle seconds
    pub time: f32,
    /// Speed multiplier selected by the player (1-5)
    pub speed: u8,
    pub enemy_level: u32,
    pub kills: u32,
    pub streak: u32,
    pub streak_multiplier: f64,
    pub escaped: bool,
    pub wall_broken: bool,
    pub enemy_max_hp: f32,
    pub enemy_hp: f32,
}

impl Default for Battle {
    fn default() -> Self {
        let enemy_max_hp = enemy_max_hp_for(1);
        Self {
            time: 0.0,
            speed: MIN_SPEED,
            enemy_level: 1,
            kills: 0,
            streak: 0,
            streak_multiplier: 1.0,
            escaped: false,
            wall_broken: false,
            enemy_max_hp,
            enemy_hp: enemy_max_hp,
        }
    }
}

impl Battle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refill the enemy for the current level
    pub fn reset_enemy(&mut self) {
        self.enemy_max_hp = enemy_max_hp_for(self.enemy_level);
        self.enemy_hp = self.enemy_max_hp;
    }

    pub fn set_speed(&mut self, speed: u8) {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    }

    fn add_kills(&mut self, n: u32) {
        self.kills += n;
        self.streak += n;
        self.streak_multiplier = streak_multiplier(self.streak);
    }
}

/// What happened during one battle tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BattleReport {
    /// Enemies defeated this tick (wall bonus excluded)
    pub kills: u32,
    /// Ailment freshly inflicted by this tick's roll
    pub inflicted: Option<Ailment>,
    pub wall_broken: bool,
    /// Whether the tick did anything
    pub ran: bool,
}

/// Ailment roll table: `(ailment, base rate, level divisor, duration)`
///
/// Thresholds are cumulative in this order and strictly compared, so at most
/// one ailment lands per roll.
const AILMENT_TABLE: [(Ailment, f32, f32, f32); 6] = [
    (Ailment::Poison, 0.010, 20.0, 6.0),
    (Ailment::Paralysis, 0.018, 25.0, 4.0),
    (Ailment::Injury, 0.026, 30.0, 6.0),
    (Ailment::Mental, 0.030, 40.0, 6.0),
    (Ailment::Sick, 0.034, 45.0, 6.0),
    (Ailment::BigInjury, 0.036, 60.0, 5.0),
];

/// Map a uniform draw onto at most one ailment
pub fn roll_ailment(p: f32, dt: f32, enemy_level: u32) -> Option<(Ailment, f32)> {
    let level = enemy_level as f32;
    AILMENT_TABLE
        .iter()
        .find(|(_, rate, divisor, _)| p < rate * dt * (1.0 + level / divisor))
        .map(|&(ailment, _, _, duration)| (ailment, duration))
}

/// Talent wall requirement: two active high skills or 16 base levels
pub fn wall_requirement_met(skills: &SkillBook) -> bool {
    skills.active_count(SkillKind::High) >= 2 || skills.kind_level_sum(SkillKind::Base) >= 16
}

/// Advance the battle by `dt` simulated seconds
///
/// Inert once the player escaped or hp hit zero.
pub fn battle_tick(
    battle: &mut Battle,
    stats: &mut Stats,
    ailments: &mut Ailments,
    skills: &SkillBook,
    rng: &mut dyn RandomSource,
    dt: f32,
) -> BattleReport {
    let mut report = BattleReport::default();
    if battle.escaped || stats.is_dead() {
        return report;
    }
    report.ran = true;

    // Clock and enemy level
    battle.time += dt;
    let prev_level = battle.enemy_level;
    battle.enemy_level = enemy_level_at(battle.time);
    if battle.enemy_level > prev_level {
        // Levelling up alongside the enemy restores the player
        stats.hp = stats.max_hp;
        log::debug!("Enemy level {}", battle.enemy_level);
    }
    if battle.enemy_hp <= 0.0 || battle.enemy_max_hp != enemy_max_hp_for(battle.enemy_level) {
        battle.reset_enemy();
    }

    // Action rate
    let spd_bonus = 1.0 + stats.spd / 50.0;
    let repeat_bonus = 1.0 + 0.08 * skills.kind_level_sum(SkillKind::Repeat) as f32;
    let multi_bonus = if skills.has("multi") { 1.25 } else { 1.0 };
    let mut actions = spd_bonus * repeat_bonus * multi_bonus * dt;

    let crit_level = skills.level_of("crit") as f32;
    let crit_rate = 0.05 + 0.03 * crit_level;
    let crit_mul = 1.6 + 0.1 * crit_level;
    let over_mul = if skills.has("over") { 1.25 } else { 1.0 };
    let judge_mul = 1.0 + 0.03 * skills.kind_level_sum(SkillKind::Think) as f32;

    // Ailment effects, sampled before the timers count down
    let mana_cost_mul = ailments.mana_cost_multiplier();
    let heal_mul = ailments.heal_multiplier();
    let def_mul = ailments.defense_multiplier();
    let can_heal = ailments.can_regenerate();
    if ailments.is_active(Ailment::Poison) {
        stats.hp -= 2.2 * dt;
    }
    actions *= ailments.action_multiplier();
    ailments.decay(dt);

    // Regeneration
    if skills.has("regen") && can_heal {
        let regen = (0.8 + 0.4 * skills.level_of("regen") as f32) * heal_mul;
        stats.hp = clamp(stats.hp + regen * dt, 0.0, stats.max_hp);
    }

    // Outgoing damage
    let mut per_action = (stats.atk * 0.9 + stats.matk * 0.9) * judge_mul * over_mul;
    let mana_spent = stats.mp.min(actions * 0.8 * mana_cost_mul);
    stats.add_mp(-mana_spent);
    per_action *= 1.0 + 0.15 * (mana_spent / actions.max(0.001));
    per_action *= (1.0 - crit_rate) + crit_rate * crit_mul;

    let mut damage = per_action * actions;
    while damage > 0.0 && battle.enemy_hp > 0.0 {
        let take = damage.min(battle.enemy_hp);
        battle.enemy_hp -= take;
        damage -= take;
        if battle.enemy_hp <= 0.0 {
            battle.add_kills(1);
            report.kills += 1;
            battle.reset_enemy();
        }
    }

    // Incoming damage
    let level = battle.enemy_level as f32;
    let enemy_dps = 2.2 + level * 0.55;
    let evd_rate = clamp(0.02 + stats.evd / 200.0, 0.02, 0.35);
    let def_factor = 1.0 - clamp(stats.def * def_mul / (60.0 + level * 6.0), 0.0, 0.55);
    stats.hp -= enemy_dps * dt * (1.0 - evd_rate) * def_factor;

    // At most one ailment per tick
    let p = rng.generate();
    if let Some((ailment, duration)) = roll_ailment(p, dt, battle.enemy_level) {
        ailments.inflict(ailment, duration);
        report.inflicted = Some(ailment);
        log::debug!("Ailment inflicted: {}", ailment.as_str());
    }

    // Talent wall
    if !battle.wall_broken
        && battle.time > WALL_MIN_TIME
        && rng.generate() < WALL_CHANCE_PER_SEC * dt
        && wall_requirement_met(skills)
    {
        battle.wall_broken = true;
        battle.add_kills(WALL_BONUS_KILLS);
        report.wall_broken = true;
        log::info!("Talent wall broken at {:.1}s", battle.time);
    }

    stats.clamp_resources();
    report
}

/// Final score for the current battle state
///
/// Zero whenever hp is depleted.
pub fn calc_score(battle: &Battle, stats: &Stats) -> u64 {
    if stats.is_dead() {
        return 0;
    }
    let wall_bonus = if battle.wall_broken {
        WALL_SCORE_BONUS as f64
    } else {
        0.0
    };
    let base = battle.kills as f64 * (10 + battle.enemy_level) as f64 + wall_bonus;
    let hp_bonus = (300.0 * stats.hp_rate() as f64).floor();
    (base * battle.streak_multiplier + hp_bonus).floor().max(0.0) as u64
}

/// Result title awarded with the score
pub fn decide_title(
    score: u64,
    pairs: u32,
    merges: u32,
    hp_rate: f32,
    escaped: bool,
) -> &'static str {
    if score <= 200 {
        "Dropout"
    } else if pairs >= 7 {
        "Thinker"
    } else if merges >= 10 {
        "Smith"
    } else if hp_rate >= 0.7 && escaped {
        "Hero"
    } else {
        "Upstart"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::{SequenceRng, SessionRng};
    use crate::sim::skills::find_def;
    use proptest::prelude::*;

    fn setup() -> (Battle, Stats, Ailments, SkillBook) {
        (
            Battle::new(),
            Stats::default(),
            Ailments::default(),
            SkillBook::new(),
        )
    }

    #[test]
    fn test_zero_dt_is_noop() {
        let (mut battle, mut stats, mut ailments, skills) = setup();
        let (b0, s0, a0) = (battle.clone(), stats, ailments);
        let mut rng = SequenceRng::new(vec![0.0]);
        battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 0.0);
        assert_eq!(battle, b0);
        assert_eq!(stats, s0);
        assert_eq!(ailments, a0);
    }

    #[test]
    fn test_dead_player_is_inert() {
        let (mut battle, mut stats, mut ailments, skills) = setup();
        battle.kills = 12;
        stats.hp = 0.0;
        let before = battle.clone();
        let mut rng = SessionRng::new(1);
        let report = battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 0.5);
        assert!(!report.ran);
        assert_eq!(battle, before);
        assert_eq!(calc_score(&battle, &stats), 0);
    }

    #[test]
    fn test_escaped_is_inert() {
        let (mut battle, mut stats, mut ailments, skills) = setup();
        battle.escaped = true;
        let mut rng = SessionRng::new(1);
        let report = battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 0.5);
        assert!(!report.ran);
        assert_eq!(battle.time, 0.0);
    }

    #[test]
    fn test_enemy_level_and_streak_formulas() {
        assert_eq!(enemy_level_at(0.0), 1);
        assert_eq!(enemy_level_at(5.99), 1);
        assert_eq!(enemy_level_at(6.0), 2);
        assert_eq!(enemy_level_at(59.0), 10);
        assert_eq!(enemy_max_hp_for(1), 25.0);
        assert_eq!(streak_multiplier(0), 1.0);
        assert_eq!(streak_multiplier(25), 2.0);
        assert_eq!(streak_multiplier(500), 3.0);
    }

    #[test]
    fn test_damage_kills_and_carries_over() {
        let (mut battle, mut stats, mut ailments, skills) = setup();
        stats.atk = 500.0;
        let mut rng = SequenceRng::new(vec![0.99]);
        let report = battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 1.0);
        assert!(report.kills > 1);
        assert_eq!(battle.kills, report.kills);
        assert_eq!(battle.streak, report.kills);
        assert_eq!(battle.streak_multiplier, streak_multiplier(report.kills));
        assert!(battle.enemy_hp > 0.0);
    }

    #[test]
    fn test_incoming_damage_reduces_hp() {
        let (mut battle, mut stats, mut ailments, skills) = setup();
        let mut rng = SequenceRng::new(vec![0.99]);
        battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 1.0);
        // dps 2.75, evd 0.045, def factor 1 - 6/66
        let expected = 100.0 - 2.75 * (1.0 - 0.045) * (1.0 - 6.0 / 66.0);
        assert!((stats.hp - expected).abs() < 1e-3);
    }

    #[test]
    fn test_mana_is_spent() {
        let (mut battle, mut stats, mut ailments, skills) = setup();
        let mut rng = SequenceRng::new(vec![0.99]);
        battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 1.0);
        // actions = 1.2, spend 0.96
        assert!((stats.mp - (40.0 - 0.96)).abs() < 1e-4);
    }

    #[test]
    fn test_ailment_roll_exclusive() {
        // Poison interval
        assert_eq!(roll_ailment(0.0, 1.0, 1).map(|a| a.0), Some(Ailment::Poison));
        // Between poison and paralysis thresholds
        assert_eq!(roll_ailment(0.015, 1.0, 1).map(|a| a.0), Some(Ailment::Paralysis));
        assert_eq!(roll_ailment(0.0355, 1.0, 1).map(|a| a.0), Some(Ailment::BigInjury));
        assert_eq!(roll_ailment(0.5, 1.0, 1), None);
        // Nothing lands with a zero timestep
        assert_eq!(roll_ailment(0.0, 0.0, 10), None);
    }

    #[test]
    fn test_poison_drains_and_regen_blocked_by_big_injury() {
        let (mut battle, mut stats, mut ailments, mut skills) = setup();
        skills.add_or_level(find_def("regen").unwrap(), false);
        ailments.inflict(Ailment::BigInjury, 5.0);
        ailments.inflict(Ailment::Poison, 5.0);
        stats.hp = 50.0;
        let mut rng = SequenceRng::new(vec![0.99]);
        battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 1.0);
        assert!(stats.hp < 50.0 - 2.2);
        assert_eq!(ailments.poison, 4.0);
    }

    #[test]
    fn test_regen_heals() {
        let (mut battle, mut stats, mut ailments, mut skills) = setup();
        skills.add_or_level(find_def("regen").unwrap(), false);
        stats.hp = 50.0;
        let mut rng = SequenceRng::new(vec![0.99]);
        battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 1.0);
        let taken = 2.75 * (1.0 - 0.045) * (1.0 - 6.0 / 66.0);
        assert!((stats.hp - (50.0 + 1.2 - taken)).abs() < 1e-3);
    }

    #[test]
    fn test_level_up_restores_hp() {
        let (mut battle, mut stats, mut ailments, skills) = setup();
        battle.time = 5.9;
        stats.hp = 30.0;
        let mut rng = SequenceRng::new(vec![0.99]);
        battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 0.2);
        assert_eq!(battle.enemy_level, 2);
        assert!(stats.hp > 90.0);
        assert_eq!(battle.enemy_max_hp, enemy_max_hp_for(2));
    }

    #[test]
    fn test_talent_wall() {
        let (mut battle, mut stats, mut ailments, mut skills) = setup();
        skills.add_or_level(find_def("multi").unwrap(), false);
        skills.add_or_level(find_def("crit").unwrap(), false);
        battle.time = 21.0;
        battle.enemy_level = enemy_level_at(21.0);
        battle.reset_enemy();
        // Ailment roll misses, wall roll hits
        let mut rng = SequenceRng::new(vec![0.99, 0.0]);
        let report = battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 0.1);
        assert!(report.wall_broken);
        assert!(battle.wall_broken);
        assert!(battle.kills >= WALL_BONUS_KILLS);
    }

    #[test]
    fn test_wall_needs_requirement() {
        let (mut battle, mut stats, mut ailments, skills) = setup();
        battle.time = 30.0;
        battle.enemy_level = enemy_level_at(30.0);
        battle.reset_enemy();
        let mut rng = SequenceRng::new(vec![0.99, 0.0]);
        let report = battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, 0.1);
        assert!(!report.wall_broken);
        assert!(!wall_requirement_met(&skills));
    }

    #[test]
    fn test_score_formula() {
        let mut battle = Battle::new();
        let stats = Stats::default();
        battle.kills = 10;
        battle.enemy_level = 5;
        battle.streak = 10;
        battle.streak_multiplier = streak_multiplier(10);
        // (10 * 15) * 1.4 + 300
        assert_eq!(calc_score(&battle, &stats), 510);
        battle.wall_broken = true;
        assert_eq!(calc_score(&battle, &stats), 510 + 700);
    }

    #[test]
    fn test_titles() {
        assert_eq!(decide_title(100, 9, 20, 1.0, true), "Dropout");
        assert_eq!(decide_title(500, 7, 0, 0.0, false), "Thinker");
        assert_eq!(decide_title(500, 0, 10, 0.0, false), "Smith");
        assert_eq!(decide_title(500, 0, 0, 0.8, true), "Hero");
        assert_eq!(decide_title(500, 0, 0, 0.8, false), "Upstart");
    }

    #[test]
    fn test_speed_clamped() {
        let mut battle = Battle::new();
        battle.set_speed(9);
        assert_eq!(battle.speed, MAX_SPEED);
        battle.set_speed(0);
        assert_eq!(battle.speed, MIN_SPEED);
    }

    proptest! {
        #[test]
        fn prop_score_monotonic_in_kills(kills in 0u32..500, extra in 0u32..50, streak in 0u32..100, hp in 1.0f32..100.0) {
            let mut battle = Battle::new();
            let mut stats = Stats::default();
            stats.hp = hp;
            battle.enemy_level = 4;
            battle.kills = kills;
            battle.streak_multiplier = streak_multiplier(streak);
            let low = calc_score(&battle, &stats);
            battle.kills = kills + extra;
            prop_assert!(calc_score(&battle, &stats) >= low);
            battle.streak_multiplier = streak_multiplier(streak + extra);
            prop_assert!(calc_score(&battle, &stats) >= low);
        }

        #[test]
        fn prop_dead_scores_zero(kills in 0u32..1000, streak in 0u32..200, wall: bool) {
            let mut battle = Battle::new();
            let mut stats = Stats::default();
            stats.hp = 0.0;
            battle.kills = kills;
            battle.streak_multiplier = streak_multiplier(streak);
            battle.wall_broken = wall;
            prop_assert_eq!(calc_score(&battle, &stats), 0);
        }

        #[test]
        fn prop_at_most_one_ailment(p in 0.0f32..1.0, dt in 0.0f32..5.0, level in 1u32..20) {
            let mut ailments = Ailments::default();
            let mut battle = Battle::new();
            battle.enemy_level = level;
            let mut stats = Stats::default();
            let skills = SkillBook::new();
            let mut rng = SequenceRng::new(vec![p, 0.99]);
            battle_tick(&mut battle, &mut stats, &mut ailments, &skills, &mut rng, dt);
            prop_assert!(ailments.active().count() <= 1);
        }
    }
}
