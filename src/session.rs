//! Host-facing session wrapper
//!
//! Owns everything one run needs: the state, its random source, the view
//! observer and the score sink. Hosts call [`Session::tick`] at a fixed rate.

use crate::consts::SIM_DT;
use crate::highscores::{ResultSlot, ScoreSink};
use crate::sim::{
    Ailments, Battle, GamePhase, GameState, NullObserver, RandomSource, SessionObserver,
    SessionResult, SessionRng, Stats, TickInput, UnlockState, tick,
};

/// Safety cap for [`Session::run_to_end`] (ticks)
const MAX_RUN_TICKS: u64 = 1_000_000;

/// One play session
pub struct Session<S: ScoreSink = ResultSlot, R: RandomSource = SessionRng> {
    state: GameState,
    rng: R,
    observer: Box<dyn SessionObserver>,
    sink: S,
    dt: f32,
}

impl Session {
    /// Seeded session reporting to a [`ResultSlot`]
    pub fn new(seed: u64) -> Self {
        log::info!("New session (seed {})", seed);
        Self::with_rng(SessionRng::new(seed))
    }
}

impl<R: RandomSource> Session<ResultSlot, R> {
    /// Session driven by an arbitrary random source
    pub fn with_rng(mut rng: R) -> Self {
        let state = GameState::new(&mut rng);
        Self {
            state,
            rng,
            observer: Box::new(NullObserver),
            sink: ResultSlot::new(),
            dt: SIM_DT,
        }
    }
}

impl<S: ScoreSink, R: RandomSource> Session<S, R> {
    pub fn with_observer(mut self, observer: impl SessionObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Replace the score sink
    pub fn with_sink<T: ScoreSink>(self, sink: T) -> Session<T, R> {
        Session {
            state: self.state,
            rng: self.rng,
            observer: self.observer,
            sink,
            dt: self.dt,
        }
    }

    /// Fixed timestep for hosts not running at 30 ticks/s
    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.state.stats
    }

    pub fn ailments(&self) -> &Ailments {
        &self.state.ailments
    }

    pub fn battle(&self) -> &Battle {
        &self.state.battle
    }

    pub fn unlock(&self) -> &UnlockState {
        &self.state.unlock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.state.result.as_ref()
    }

    /// Advance one step; the final result also goes to the sink
    pub fn tick(&mut self, input: &TickInput) -> Option<SessionResult> {
        let result = tick(
            &mut self.state,
            input,
            self.dt,
            &mut self.rng,
            self.observer.as_mut(),
        );
        if let Some(result) = &result {
            self.sink.submit(result);
        }
        result
    }

    /// Tick with the same input until the session window closes
    pub fn run_to_end(&mut self, input: &TickInput) -> Option<SessionResult> {
        let mut ticks = 0;
        while !self.is_finished() && ticks < MAX_RUN_TICKS {
            self.tick(input);
            ticks += 1;
        }
        self.state.result.clone()
    }
}
