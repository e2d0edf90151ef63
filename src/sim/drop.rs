//! Merge-drop minigame
//!
//! Skill pieces fall into a box under gravity. Two resting pieces of the same
//! skill and level fuse into one piece a level higher, which also levels the
//! owned skill. Shards restore mana when they settle; placeholder pieces never
//! merge and annihilate against a twin.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{circle_overlap, separation};
use super::rng::{RandomSource, weighted_index};
use super::skills::{SkillBook, SkillKind};
use crate::consts::*;
use crate::{clamp, lerp};

/// Piece types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceKind {
    Skill,
    Shard,
}

/// A piece in the holding slot or the play area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: u32,
    pub kind: PieceKind,
    /// Skill id (skill pieces only)
    pub skill_id: Option<String>,
    pub level: u32,
    pub placeholder: bool,
    pub pos: Vec2,
    /// Vertical velocity, pixels/s (positive is down)
    pub vy: f32,
    pub radius: f32,
    /// Has touched the floor or another piece at least once
    #[serde(default)]
    pub landed: bool,
}

/// Radius of a skill piece at `level`
pub fn piece_radius(level: u32) -> f32 {
    PIECE_BASE_RADIUS + (level.max(1) - 1) as f32 * PIECE_RADIUS_PER_LEVEL
}

impl Piece {
    pub fn skill(id: u32, skill_id: &str, level: u32, placeholder: bool) -> Self {
        let level = level.clamp(1, MAX_SKILL_LEVEL);
        Self {
            id,
            kind: PieceKind::Skill,
            skill_id: Some(skill_id.to_string()),
            level,
            placeholder,
            pos: Vec2::new(DROP_SPAWN_X, DROP_SPAWN_Y),
            vy: 0.0,
            radius: piece_radius(level),
            landed: false,
        }
    }

    pub fn shard(id: u32) -> Self {
        Self {
            id,
            kind: PieceKind::Shard,
            skill_id: None,
            level: 1,
            placeholder: false,
            pos: Vec2::new(DROP_SPAWN_X, DROP_SPAWN_Y),
            vy: 0.0,
            radius: SHARD_RADIUS,
            landed: false,
        }
    }

    pub fn is_near_rest(&self) -> bool {
        self.vy.abs() < NEAR_REST_SPEED
    }

    /// Allowed x range for this piece's center
    fn x_bounds(&self) -> (f32, f32) {
        (
            DROP_AREA_X + self.radius + DROP_WALL_INSET,
            DROP_AREA_X + DROP_AREA_W - self.radius - DROP_WALL_INSET,
        )
    }

    fn clamp_x(&mut self) {
        let (min, max) = self.x_bounds();
        self.pos.x = clamp(self.pos.x, min, max);
    }

    fn floor_y(&self) -> f32 {
        DROP_AREA_Y + DROP_AREA_H - self.radius - DROP_WALL_INSET
    }

    /// Highest allowed center; stacks never poke out of the top of the area
    fn ceiling_y(&self) -> f32 {
        DROP_AREA_Y + self.radius + DROP_WALL_INSET
    }

    /// Keep the piece fully inside the play area
    fn clamp_to_area(&mut self) {
        self.clamp_x();
        self.pos.y = clamp(self.pos.y, self.ceiling_y(), self.floor_y());
    }

    /// Inelastic bounce: invert with heavy damping, snap to rest when slow
    fn land(&mut self) {
        self.vy *= BOUNCE;
        if self.vy.abs() < REST_SNAP_SPEED {
            self.vy = 0.0;
        }
        self.landed = true;
    }
}

/// Merge predicate: same skill, same level, below cap, neither a placeholder
pub fn can_merge(a: &Piece, b: &Piece) -> bool {
    a.kind == PieceKind::Skill
        && b.kind == PieceKind::Skill
        && !a.placeholder
        && !b.placeholder
        && a.skill_id.is_some()
        && a.skill_id == b.skill_id
        && a.level == b.level
        && a.level < MAX_SKILL_LEVEL
}

/// Two placeholder pieces of the same skill cancel each other out
pub fn can_annihilate(a: &Piece, b: &Piece) -> bool {
    a.kind == PieceKind::Skill
        && b.kind == PieceKind::Skill
        && a.placeholder
        && b.placeholder
        && a.skill_id.is_some()
        && a.skill_id == b.skill_id
}

/// Chance that a spawn is a shard at growth progress `t`
pub fn shard_chance(t: f32) -> f32 {
    lerp(0.12, 0.22, t.clamp(0.0, 1.0))
}

/// Spawn lottery weight for an owned skill
fn spawn_weight(kind: SkillKind, level: u32, placeholder: bool, t: f32) -> f32 {
    let kind_bonus = if kind == SkillKind::High {
        1.0 + 3.0 * t
    } else {
        1.0 + 0.6 * t
    };
    if placeholder {
        return 0.5 * kind_bonus;
    }
    let level_bonus = 1.0 + (level.max(1) - 1) as f32 * (0.25 + 0.55 * t);
    kind_bonus * level_bonus
}

/// Draw the next candidate piece
///
/// One draw decides shard vs skill, a second runs the weighted lottery over
/// a snapshot of the owned skills. Returns `None` when nothing is owned and
/// the shard roll fails.
pub fn spawn_candidate(
    skills: &SkillBook,
    rng: &mut dyn RandomSource,
    t: f32,
    id: u32,
) -> Option<Piece> {
    let t = t.clamp(0.0, 1.0);
    if rng.generate() < shard_chance(t) {
        return Some(Piece::shard(id));
    }

    let candidates: Vec<_> = skills.iter().collect();
    let weights: Vec<f32> = candidates
        .iter()
        .map(|s| spawn_weight(s.kind, s.level, s.placeholder, t))
        .collect();
    let picked = candidates[weighted_index(rng, &weights)?];
    Some(Piece::skill(id, &picked.id, picked.level, picked.placeholder))
}

/// Something the drop box did this tick that the session must react to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropEvent {
    /// Two pieces fused; `level` is the surviving piece's new level
    Merged { skill_id: String, level: u32 },
    /// Two placeholder pieces cancelled out
    Annihilated { skill_id: String },
    /// A shard came to rest and was consumed
    ShardSettled,
}

/// Merge-drop minigame state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropGame {
    /// Candidate waiting in the holding slot
    pub held: Option<Piece>,
    /// Pieces in the play area (sorted by id)
    pub pieces: Vec<Piece>,
    /// Ticks until the next candidate may appear
    pub cooldown: u32,
    next_id: u32,
}

impl Default for DropGame {
    fn default() -> Self {
        Self {
            held: None,
            pieces: Vec::new(),
            cooldown: 0,
            next_id: 1,
        }
    }
}

impl DropGame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count down the cooldown and fill the holding slot if it is empty
    pub fn ensure_held(&mut self, skills: &SkillBook, rng: &mut dyn RandomSource, t: f32) {
        if self.cooldown > 0 {
            self.cooldown -= 1;
        }
        if self.held.is_some() || self.cooldown > 0 || self.pieces.len() >= DROP_MAX_PIECES {
            return;
        }
        if let Some(piece) = spawn_candidate(skills, rng, t, self.next_id) {
            self.next_id += 1;
            self.held = Some(piece);
        }
    }

    /// Reposition the held piece horizontally without committing it
    pub fn move_held(&mut self, x: f32) {
        if let Some(piece) = self.held.as_mut() {
            piece.pos.x = x;
            piece.clamp_x();
        }
    }

    /// Release the held piece into the play area
    pub fn commit(&mut self) -> bool {
        match self.held.take() {
            Some(piece) => {
                self.pieces.push(piece);
                self.cooldown = DROP_COOLDOWN_TICKS;
                true
            }
            None => false,
        }
    }

    /// Gravity, wall clamp and floor bounce for every piece in play
    pub fn step(&mut self, dt: f32) {
        for piece in &mut self.pieces {
            piece.vy += GRAVITY * dt;
            piece.pos.y += piece.vy * dt;
            piece.clamp_x();
            piece.pos.y = piece.pos.y.max(piece.ceiling_y());
            let floor = piece.floor_y();
            if piece.pos.y > floor {
                piece.pos.y = floor;
                piece.land();
            }
        }
    }

    /// Pairwise merge, annihilation and positional correction
    pub fn resolve_collisions(&mut self) -> Vec<DropEvent> {
        let mut events = Vec::new();
        let mut i = 0;
        while i < self.pieces.len() {
            let mut j = i + 1;
            let mut removed_i = false;
            while j < self.pieces.len() {
                let (a, b) = (&self.pieces[i], &self.pieces[j]);
                let hit = circle_overlap(a.pos, a.radius, b.pos, b.radius);
                if !hit.hit {
                    j += 1;
                    continue;
                }
                let at_rest = a.is_near_rest() && b.is_near_rest();

                if at_rest && can_merge(a, b) {
                    self.pieces.remove(j);
                    let a = &mut self.pieces[i];
                    a.level += 1;
                    a.radius = piece_radius(a.level);
                    let skill_id = a.skill_id.clone().unwrap_or_default();
                    log::debug!("Merged {} -> Lv{}", skill_id, a.level);
                    events.push(DropEvent::Merged {
                        skill_id,
                        level: a.level,
                    });
                    continue;
                }

                if at_rest && can_annihilate(a, b) {
                    let skill_id = a.skill_id.clone().unwrap_or_default();
                    self.pieces.remove(j);
                    self.pieces.remove(i);
                    events.push(DropEvent::Annihilated { skill_id });
                    removed_i = true;
                    break;
                }

                let (da, db) = separation(&hit);
                for (idx, offset) in [(i, da), (j, db)] {
                    let piece = &mut self.pieces[idx];
                    piece.pos += offset;
                    piece.clamp_to_area();
                    // Pushed up while falling: it landed on the other piece
                    if offset.y < 0.0 && piece.vy > 0.0 {
                        piece.land();
                    }
                }
                j += 1;
            }
            if !removed_i {
                i += 1;
            }
        }
        events
    }

    /// Remove shards that have come to rest
    fn consume_settled_shards(&mut self) -> Vec<DropEvent> {
        let before = self.pieces.len();
        self.pieces
            .retain(|p| !(p.kind == PieceKind::Shard && p.landed));
        (0..before - self.pieces.len())
            .map(|_| DropEvent::ShardSettled)
            .collect()
    }

    /// One full physics tick: integrate, resolve, consume shards
    pub fn update(&mut self, dt: f32) -> Vec<DropEvent> {
        self.step(dt);
        let mut events = self.resolve_collisions();
        events.extend(self.consume_settled_shards());
        events
    }

    /// A settled piece pokes above the danger line
    pub fn above_danger_line(&self) -> bool {
        self.pieces
            .iter()
            .any(|p| p.landed && p.vy == 0.0 && p.pos.y - p.radius < DROP_DANGER_LINE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::SequenceRng;
    use crate::sim::skills::find_def;
    use proptest::prelude::*;

    fn resting(id: u32, skill: &str, level: u32, x: f32) -> Piece {
        let mut p = Piece::skill(id, skill, level, false);
        p.pos = Vec2::new(x, 500.0);
        p.landed = true;
        p
    }

    #[test]
    fn test_radius_formula() {
        assert_eq!(piece_radius(1), 16.0);
        assert_eq!(piece_radius(3), 28.0);
    }

    #[test]
    fn test_merge_two_resting_pieces() {
        let mut game = DropGame::new();
        game.pieces.push(resting(1, "atk", 2, 300.0));
        game.pieces.push(resting(2, "atk", 2, 310.0));

        let events = game.resolve_collisions();
        assert_eq!(game.pieces.len(), 1);
        assert_eq!(game.pieces[0].level, 3);
        assert_eq!(game.pieces[0].radius, piece_radius(3));
        assert_eq!(
            events,
            vec![DropEvent::Merged {
                skill_id: "atk".into(),
                level: 3
            }]
        );
    }

    #[test]
    fn test_moving_pieces_do_not_merge() {
        let mut game = DropGame::new();
        game.pieces.push(resting(1, "atk", 2, 300.0));
        let mut falling = resting(2, "atk", 2, 310.0);
        falling.vy = 200.0;
        game.pieces.push(falling);

        let events = game.resolve_collisions();
        assert!(events.is_empty());
        assert_eq!(game.pieces.len(), 2);
    }

    #[test]
    fn test_different_pieces_are_pushed_apart() {
        let mut game = DropGame::new();
        game.pieces.push(resting(1, "atk", 1, 300.0));
        game.pieces.push(resting(2, "def", 1, 310.0));
        game.resolve_collisions();
        let d = (game.pieces[1].pos - game.pieces[0].pos).length();
        assert!((d - 32.0).abs() < 1e-3);
    }

    #[test]
    fn test_placeholders_annihilate() {
        let mut game = DropGame::new();
        let mut a = resting(1, "over", 1, 300.0);
        let mut b = resting(2, "over", 1, 305.0);
        a.placeholder = true;
        b.placeholder = true;
        assert!(!can_merge(&a, &b));
        game.pieces.push(a);
        game.pieces.push(b);
        let events = game.resolve_collisions();
        assert!(game.pieces.is_empty());
        assert_eq!(
            events,
            vec![DropEvent::Annihilated {
                skill_id: "over".into()
            }]
        );
    }

    #[test]
    fn test_piece_falls_and_rests_on_floor() {
        let mut game = DropGame::new();
        let mut p = Piece::skill(1, "hp", 1, false);
        p.pos.x = 300.0;
        game.pieces.push(p);
        for _ in 0..300 {
            game.update(SIM_DT);
        }
        let p = &game.pieces[0];
        assert_eq!(p.vy, 0.0);
        assert!((p.pos.y - p.floor_y()).abs() < 1e-3);
        assert!(!game.above_danger_line());
    }

    #[test]
    fn test_overfull_column_stays_inside_area() {
        const IDS: [&str; 8] = ["hp", "mp", "atk", "def", "matk", "mdef", "evd", "spd"];
        let mut game = DropGame::new();
        for i in 0..DROP_MAX_PIECES {
            let mut p = Piece::skill(i as u32 + 1, IDS[i % IDS.len()], 1, false);
            p.pos.x = 320.0;
            game.pieces.push(p);
            for _ in 0..DROP_COOLDOWN_TICKS {
                game.update(SIM_DT);
            }
        }
        for _ in 0..600 {
            game.update(SIM_DT);
        }

        let top = DROP_AREA_Y + DROP_WALL_INSET - 1e-3;
        let bottom = DROP_AREA_Y + DROP_AREA_H - DROP_WALL_INSET + 1e-3;
        for p in &game.pieces {
            assert!(p.pos.y - p.radius >= top, "piece {} above area: {}", p.id, p.pos.y);
            assert!(p.pos.y + p.radius <= bottom, "piece {} below area: {}", p.id, p.pos.y);
        }
        assert!(game.above_danger_line());
    }

    #[test]
    fn test_shard_settles_into_event() {
        let mut game = DropGame::new();
        game.pieces.push(Piece::shard(1));
        let mut settled = 0;
        for _ in 0..300 {
            settled += game
                .update(SIM_DT)
                .iter()
                .filter(|e| **e == DropEvent::ShardSettled)
                .count();
        }
        assert_eq!(settled, 1);
        assert!(game.pieces.is_empty());
    }

    #[test]
    fn test_held_piece_clamped_and_committed() {
        let mut game = DropGame::new();
        let mut book = SkillBook::new();
        book.add_or_level(find_def("atk").unwrap(), false);
        // 0.9 fails the shard roll, 0.0 picks the only candidate
        let mut rng = SequenceRng::new(vec![0.9, 0.0]);
        game.ensure_held(&book, &mut rng, 0.0);
        assert!(game.held.is_some());

        game.move_held(-1000.0);
        let held = game.held.as_ref().unwrap();
        assert_eq!(held.pos.x, DROP_AREA_X + held.radius + DROP_WALL_INSET);
        // Held pieces ignore physics
        game.update(SIM_DT);
        assert_eq!(game.held.as_ref().unwrap().vy, 0.0);

        assert!(game.commit());
        assert!(game.held.is_none());
        assert_eq!(game.pieces.len(), 1);
        assert!(!game.commit());

        // Cooldown blocks an immediate respawn
        game.ensure_held(&book, &mut rng, 0.0);
        assert!(game.held.is_none());
    }

    #[test]
    fn test_no_candidates_without_skills() {
        let book = SkillBook::new();
        let mut rng = SequenceRng::new(vec![0.99]);
        assert!(spawn_candidate(&book, &mut rng, 0.0, 1).is_none());
        let mut rng = SequenceRng::new(vec![0.0]);
        let piece = spawn_candidate(&book, &mut rng, 0.0, 1).unwrap();
        assert_eq!(piece.kind, PieceKind::Shard);
    }

    #[test]
    fn test_high_skills_favoured_late() {
        let early = spawn_weight(SkillKind::High, 1, false, 0.0)
            / spawn_weight(SkillKind::Base, 1, false, 0.0);
        let late = spawn_weight(SkillKind::High, 1, false, 1.0)
            / spawn_weight(SkillKind::Base, 1, false, 1.0);
        assert!(late > early);
    }

    proptest! {
        #[test]
        fn prop_merge_predicate_symmetric(
            la in 1u32..=MAX_SKILL_LEVEL,
            lb in 1u32..=MAX_SKILL_LEVEL,
            pa: bool,
            pb: bool,
            same_id: bool,
        ) {
            let mut a = resting(1, "atk", la, 300.0);
            let mut b = resting(2, if same_id { "atk" } else { "def" }, lb, 300.0);
            a.placeholder = pa;
            b.placeholder = pb;
            prop_assert_eq!(can_merge(&a, &b), can_merge(&b, &a));
            if can_merge(&a, &b) {
                prop_assert!(!pa && !pb && same_id && la == lb && la < MAX_SKILL_LEVEL);
            }
        }
    }
}
