//! Fixed timestep simulation tick
//!
//! The phase controller: advances the session clock, fires deferred actions,
//! applies host input and runs whichever minigame or battle is active.

use super::battle::{battle_tick, calc_score, decide_title};
use super::events::{SessionObserver, SessionResult};
use super::memory::MemoryGame;
use super::rng::RandomSource;
use super::state::{GamePhase, GameState, Tab};
use crate::consts::*;

/// Seconds spent on each growth tab by the autoplay driver before switching
const AUTOPLAY_TAB_SECONDS: f32 = 20.0;
/// Ticks between autoplay actions
const AUTOPLAY_ACTION_TICKS: u64 = 6;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Skip the title screen
    pub skip: bool,
    /// Leave the battle early and take the current score
    pub escape: bool,
    /// Memory card to flip
    pub flip: Option<usize>,
    /// Growth tab to show
    pub select_tab: Option<Tab>,
    /// Horizontal position for the held drop piece
    pub move_held: Option<f32>,
    /// Release the held drop piece
    pub commit_drop: bool,
    /// Battle speed multiplier (1-5)
    pub speed: Option<u8>,
    /// Demo mode - a simple driver plays the minigames
    pub autoplay: bool,
}

/// Advance the session by one fixed timestep
///
/// Returns the final result on the tick the session enters `Result`.
pub fn tick(
    state: &mut GameState,
    input: &TickInput,
    dt: f32,
    rng: &mut dyn RandomSource,
    observer: &mut dyn SessionObserver,
) -> Option<SessionResult> {
    if state.finished {
        return None;
    }

    let mut input = input.clone();
    if input.autoplay {
        autoplay(state, &mut input);
    }

    state.time_ticks += 1;
    state.run_deferred(observer);
    state.elapsed += dt;

    let mut result = None;

    // Title timer or skip
    if state.phase == GamePhase::Title {
        let fired = state.title_timer.advance(dt);
        if input.skip {
            state.title_timer.cancel();
            state.elapsed = state.elapsed.max(PHASE_TITLE);
            log::info!("Title skipped");
        }
        if fired || input.skip {
            enter_phase(state, GamePhase::Grow, observer);
        }
    }

    // Scheduled transitions, forward only
    let scheduled = GamePhase::scheduled_at(state.elapsed);
    while state.phase < scheduled {
        let next = state.phase.next();
        if let Some(r) = enter_phase(state, next, observer) {
            result = Some(r);
        }
    }

    if let Some(speed) = input.speed {
        state.battle.set_speed(speed);
    }

    match state.phase {
        GamePhase::Title => {}
        GamePhase::Grow => grow_tick(state, &input, dt, rng, observer),
        GamePhase::Battle => {
            if input.escape {
                state.battle.escaped = true;
                log::info!("Escaped from battle at {:.1}s", state.battle.time);
                result = enter_phase(state, GamePhase::Result, observer);
            } else {
                let battle_dt = dt * state.battle.speed as f32;
                let report = battle_tick(
                    &mut state.battle,
                    &mut state.stats,
                    &mut state.ailments,
                    &state.skills,
                    rng,
                    battle_dt,
                );
                if report.ran {
                    observer.on_stats_changed(&state.stats);
                }
                if state.stats.is_dead() {
                    log::info!("Defeated at enemy level {}", state.battle.enemy_level);
                    result = enter_phase(state, GamePhase::Result, observer);
                }
            }
        }
        GamePhase::Result => {
            if state.elapsed >= TOTAL_TIME {
                state.finished = true;
                log::info!("Session finished");
            }
        }
    }

    result
}

/// Growth phase work: input, memory housekeeping, drop physics, penalties
fn grow_tick(
    state: &mut GameState,
    input: &TickInput,
    dt: f32,
    rng: &mut dyn RandomSource,
    observer: &mut dyn SessionObserver,
) {
    if let Some(tab) = input.select_tab {
        let generation = state.memory.generation;
        state.switch_tab(tab, rng);
        if state.memory.generation != generation {
            observer.on_memory_changed(&state.memory);
        }
    }

    match state.tab {
        Tab::Memory => {
            if let Some(index) = input.flip {
                state.flip_card(index, observer);
            }
        }
        Tab::Drop => {
            if let Some(x) = input.move_held {
                state.drop.move_held(x);
            }
            if input.commit_drop {
                state.drop.commit();
            }
        }
    }

    if state.memory.is_cleared() {
        state.reshuffle_memory(rng, false);
        observer.on_memory_changed(&state.memory);
    }

    let t = state.grow_progress();
    state.drop.ensure_held(&state.skills, rng, t);
    let events = state.drop.update(dt);
    if state.apply_drop_events(&events) {
        observer.on_stats_changed(&state.stats);
    }

    let drained = state.drop.above_danger_line();
    if drained {
        state.stats.add_hp(-DROP_DANGER_DRAIN * dt);
    }
    if state.refill_on_growth() || drained {
        observer.on_stats_changed(&state.stats);
    }
}

/// Perform the entry actions of `phase`
fn enter_phase(
    state: &mut GameState,
    phase: GamePhase,
    observer: &mut dyn SessionObserver,
) -> Option<SessionResult> {
    if phase <= state.phase {
        return None;
    }
    state.phase = phase;
    log::info!("Phase -> {} at {:.1}s", phase.as_str(), state.elapsed);
    observer.on_phase_changed(phase);

    match phase {
        GamePhase::Title => None,
        GamePhase::Grow => {
            state.title_timer.cancel();
            state.track_maxima();
            None
        }
        GamePhase::Battle => {
            state.stats.hp = state.stats.hp.max(1.0);
            state.stats.clamp_resources();
            state.battle.reset_enemy();
            observer.on_stats_changed(&state.stats);
            None
        }
        GamePhase::Result => {
            let result = finalize(state);
            observer.on_result(&result);
            state.result = Some(result.clone());
            Some(result)
        }
    }
}

/// Score and title at this instant
fn finalize(state: &GameState) -> SessionResult {
    let score = calc_score(&state.battle, &state.stats);
    let title = decide_title(
        score,
        state.unlock.pairs,
        state.unlock.merges,
        state.stats.hp_rate(),
        state.battle.escaped,
    );
    log::info!("Final score {} ({})", score, title);
    SessionResult {
        score,
        title: title.to_string(),
        kills: state.battle.kills,
        enemy_level: state.battle.enemy_level,
        hp: state.stats.hp,
        pairs: state.unlock.pairs,
        merges: state.unlock.merges,
        escaped: state.battle.escaped,
        defeated: state.stats.is_dead(),
    }
}

/// Fill in input for demo play
fn autoplay(state: &GameState, input: &mut TickInput) {
    match state.phase {
        GamePhase::Title => input.skip = true,
        GamePhase::Grow => {
            let slot = ((state.elapsed - PHASE_TITLE).max(0.0) / AUTOPLAY_TAB_SECONDS) as u32;
            let want = if slot % 2 == 0 { Tab::Memory } else { Tab::Drop };
            if state.tab != want {
                input.select_tab = Some(want);
                return;
            }
            if state.time_ticks % AUTOPLAY_ACTION_TICKS != 0 {
                return;
            }
            match state.tab {
                Tab::Memory => input.flip = pick_card(&state.memory),
                Tab::Drop => {
                    input.move_held = Some(aim_drop(state));
                    input.commit_drop = true;
                }
            }
        }
        GamePhase::Battle | GamePhase::Result => {}
    }
}

/// Flip with perfect recall: the twin of a pending card, else the next hidden one
fn pick_card(memory: &MemoryGame) -> Option<usize> {
    if memory.locked {
        return None;
    }
    let hidden = |i: &usize| !memory.cards[*i].face_up && !memory.cards[*i].matched;
    match memory.first {
        Some(first) => (0..memory.cards.len())
            .filter(hidden)
            .find(|&i| memory.cards[i].skill_id == memory.cards[first].skill_id),
        None => (0..memory.cards.len()).find(hidden),
    }
}

/// Drop onto a matching piece if one exists, else spread across the area
fn aim_drop(state: &GameState) -> f32 {
    let drop = &state.drop;
    let target = drop.held.as_ref().and_then(|held| {
        drop.pieces
            .iter()
            .find(|p| {
                !p.placeholder
                    && !held.placeholder
                    && p.skill_id.is_some()
                    && p.skill_id == held.skill_id
                    && p.level == held.level
            })
            .map(|p| p.pos.x)
    });
    target.unwrap_or_else(|| {
        let column = (drop.pieces.len() * 7 % 10) as f32;
        DROP_AREA_X + DROP_AREA_W * (column + 0.5) / 10.0
    })
}
