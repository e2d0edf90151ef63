//! Memory-match minigame
//!
//! A 4x4 deck of eight duplicated skill cards. Each card moves
//! `hidden -> face up -> matched | hidden`; a matched pair grants its skill,
//! a mismatch locks the board until a deferred flip-back releases it.

use serde::{Deserialize, Serialize};

use super::deferred::{DeferredAction, DeferredQueue};
use super::rng::{RandomSource, rand_int};
use super::skills::{SkillDef, SkillKind, StatKind, pool};
use crate::consts::{FLIP_BACK_DELAY_TICKS, MEMORY_PAIRS};
use crate::lerp;

/// A single memory card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub skill_id: String,
    pub name: String,
    pub kind: SkillKind,
    pub stat: Option<StatKind>,
    pub face_up: bool,
    pub matched: bool,
}

impl Card {
    fn from_def(def: &SkillDef) -> Self {
        Self {
            skill_id: def.id.to_string(),
            name: def.name.to_string(),
            kind: def.kind,
            stat: def.stat,
            face_up: false,
            matched: false,
        }
    }
}

/// Result of a flip attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlipOutcome {
    /// Locked board, out-of-range index, or card already up/matched
    Rejected,
    /// First card of a pair is now face up
    Pending,
    /// Both cards matched; the skill should be granted
    Matched { skill_id: String },
    /// Cards differ; both flip back after a delay
    Mismatched,
}

/// Category weights for a deck drawn at growth progress `t`
///
/// Order: base, think, repeat, high. Bias shifts away from base as `t` rises.
pub fn category_weights(t: f32) -> [(SkillKind, f32); 4] {
    let t = t.clamp(0.0, 1.0);
    let w_base = lerp(0.55, 0.25, t);
    let w_think = lerp(0.20, 0.30, t);
    let w_repeat = lerp(0.20, 0.25, t);
    let w_high = 1.0 - w_base - w_think - w_repeat;
    [
        (SkillKind::Base, w_base),
        (SkillKind::Think, w_think),
        (SkillKind::Repeat, w_repeat),
        (SkillKind::High, w_high),
    ]
}

fn pick_category(rng: &mut dyn RandomSource, t: f32) -> SkillKind {
    let r = rng.generate();
    let mut acc = 0.0;
    for (kind, weight) in category_weights(t) {
        acc += weight;
        if r < acc {
            return kind;
        }
    }
    SkillKind::High
}

/// Draw eight skills, duplicate each and shuffle the sixteen cards
pub fn build_deck(rng: &mut dyn RandomSource, t: f32) -> Vec<Card> {
    let mut cards = Vec::with_capacity(MEMORY_PAIRS * 2);
    for _ in 0..MEMORY_PAIRS {
        let skills = pool(pick_category(rng, t));
        let def = &skills[rand_int(rng, 0, skills.len() - 1)];
        cards.push(Card::from_def(def));
        cards.push(Card::from_def(def));
    }
    // Fisher-Yates
    for i in (1..cards.len()).rev() {
        let j = rand_int(rng, 0, i);
        cards.swap(i, j);
    }
    cards
}

/// Memory minigame state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryGame {
    pub cards: Vec<Card>,
    /// Index of the pending first card
    pub first: Option<usize>,
    /// Set while a mismatched pair waits to flip back
    pub locked: bool,
    /// Bumped on every rebuild so stale flip-backs can be ignored
    pub generation: u32,
    /// Pairs matched this session (survives rebuilds)
    pairs: u32,
}

impl MemoryGame {
    pub fn new(rng: &mut dyn RandomSource, t: f32) -> Self {
        let mut game = Self::default();
        game.reset_deck(rng, t);
        game
    }

    /// Rebuild the deck and clear the pending/lock state
    pub fn reset_deck(&mut self, rng: &mut dyn RandomSource, t: f32) {
        self.cards = build_deck(rng, t);
        self.first = None;
        self.locked = false;
        self.generation = self.generation.wrapping_add(1);
        log::debug!("Memory deck rebuilt (generation {})", self.generation);
    }

    pub fn pairs(&self) -> u32 {
        self.pairs
    }

    /// Every card on the board is matched
    pub fn is_cleared(&self) -> bool {
        !self.cards.is_empty() && self.cards.iter().all(|c| c.matched)
    }

    /// Flip card `index` at tick `now`
    pub fn flip(&mut self, index: usize, now: u64, queue: &mut DeferredQueue) -> FlipOutcome {
        if self.locked {
            return FlipOutcome::Rejected;
        }
        match self.cards.get(index) {
            Some(card) if !card.face_up && !card.matched => {}
            _ => return FlipOutcome::Rejected,
        }
        self.cards[index].face_up = true;

        let Some(first) = self.first.take() else {
            self.first = Some(index);
            return FlipOutcome::Pending;
        };

        if self.cards[first].skill_id == self.cards[index].skill_id {
            self.cards[first].matched = true;
            self.cards[index].matched = true;
            self.pairs += 1;
            FlipOutcome::Matched {
                skill_id: self.cards[index].skill_id.clone(),
            }
        } else {
            self.locked = true;
            queue.schedule(
                now,
                FLIP_BACK_DELAY_TICKS,
                DeferredAction::FlipBack {
                    deck: self.generation,
                    first,
                    second: index,
                },
            );
            FlipOutcome::Mismatched
        }
    }

    /// Apply a scheduled flip-back; no-op if the deck has since been rebuilt
    ///
    /// Returns `true` if the board changed.
    pub fn flip_back(&mut self, deck: u32, first: usize, second: usize) -> bool {
        if deck != self.generation {
            return false;
        }
        for i in [first, second] {
            if let Some(card) = self.cards.get_mut(i) {
                if !card.matched {
                    card.face_up = false;
                }
            }
        }
        self.locked = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::{SequenceRng, SessionRng};

    fn pair_indices(game: &MemoryGame) -> (usize, usize) {
        let first = 0;
        let second = (1..game.cards.len())
            .find(|&i| game.cards[i].skill_id == game.cards[0].skill_id)
            .unwrap();
        (first, second)
    }

    fn mismatch_indices(game: &MemoryGame) -> (usize, usize) {
        let other = (1..game.cards.len())
            .find(|&i| game.cards[i].skill_id != game.cards[0].skill_id)
            .unwrap();
        (0, other)
    }

    #[test]
    fn test_deck_has_eight_pairs() {
        let mut rng = SessionRng::new(7);
        let deck = build_deck(&mut rng, 0.5);
        assert_eq!(deck.len(), 16);
        for card in &deck {
            let count = deck.iter().filter(|c| c.skill_id == card.skill_id).count();
            assert!(count % 2 == 0);
            assert!(!card.face_up && !card.matched);
        }
    }

    #[test]
    fn test_category_weights_sum_to_one() {
        for t in [0.0, 0.25, 0.5, 1.0] {
            let sum: f32 = category_weights(t).iter().map(|(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
        let early = category_weights(0.0);
        let late = category_weights(1.0);
        assert!(late[0].1 < early[0].1);
        assert!(late[3].1 > early[3].1);
    }

    #[test]
    fn test_low_draws_pick_base_skills() {
        let mut rng = SequenceRng::new(vec![0.0]);
        let deck = build_deck(&mut rng, 0.0);
        assert!(deck.iter().all(|c| c.kind == SkillKind::Base));
    }

    #[test]
    fn test_match_pair() {
        let mut rng = SessionRng::new(3);
        let mut game = MemoryGame::new(&mut rng, 0.0);
        let mut queue = DeferredQueue::new();
        let (a, b) = pair_indices(&game);
        let id = game.cards[a].skill_id.clone();

        assert_eq!(game.flip(a, 0, &mut queue), FlipOutcome::Pending);
        assert_eq!(game.flip(b, 1, &mut queue), FlipOutcome::Matched { skill_id: id });
        assert_eq!(game.pairs(), 1);
        assert!(game.cards[a].matched && game.cards[b].matched);
        assert!(queue.is_empty());
        // Matched cards cannot be flipped again
        assert_eq!(game.flip(a, 2, &mut queue), FlipOutcome::Rejected);
    }

    #[test]
    fn test_mismatch_locks_then_flips_back() {
        let mut rng = SessionRng::new(11);
        let mut game = MemoryGame::new(&mut rng, 0.0);
        let mut queue = DeferredQueue::new();
        let (a, b) = mismatch_indices(&game);

        game.flip(a, 0, &mut queue);
        assert_eq!(game.flip(b, 0, &mut queue), FlipOutcome::Mismatched);
        assert!(game.locked);
        let c = (0..16).find(|&i| i != a && i != b).unwrap();
        assert_eq!(game.flip(c, 1, &mut queue), FlipOutcome::Rejected);

        let due = queue.drain_due(FLIP_BACK_DELAY_TICKS);
        assert_eq!(due.len(), 1);
        let DeferredAction::FlipBack { deck, first, second } = due[0];
        game.flip_back(deck, first, second);
        assert!(!game.locked);
        assert!(!game.cards[a].face_up && !game.cards[b].face_up);
    }

    #[test]
    fn test_stale_flip_back_is_ignored() {
        let mut rng = SessionRng::new(5);
        let mut game = MemoryGame::new(&mut rng, 0.0);
        let stale = game.generation;
        game.reset_deck(&mut rng, 0.0);
        game.cards[0].face_up = true;
        game.flip_back(stale, 0, 1);
        assert!(game.cards[0].face_up);
    }

    #[test]
    fn test_pairs_survive_rebuild() {
        let mut rng = SessionRng::new(9);
        let mut game = MemoryGame::new(&mut rng, 0.0);
        let mut queue = DeferredQueue::new();
        let (a, b) = pair_indices(&game);
        game.flip(a, 0, &mut queue);
        game.flip(b, 0, &mut queue);
        game.reset_deck(&mut rng, 1.0);
        assert_eq!(game.pairs(), 1);
        assert!(game.first.is_none());
    }

    #[test]
    fn test_out_of_range_flip_rejected() {
        let mut rng = SessionRng::new(1);
        let mut game = MemoryGame::new(&mut rng, 0.0);
        let mut queue = DeferredQueue::new();
        assert_eq!(game.flip(99, 0, &mut queue), FlipOutcome::Rejected);
    }
}
