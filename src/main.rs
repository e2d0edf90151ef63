//! Gift of Thought entry point
//!
//! Runs one headless session with the demo driver and prints the result.

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

#[cfg(not(target_arch = "wasm32"))]
use gift_of_thought::settings::SpeedPreset;

/// Headless Gift of Thought session
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
#[command(name = "gift-of-thought")]
#[command(about = "Run one 200 second session and print the result as JSON", long_about = None)]
#[command(version)]
struct Args {
    /// RNG seed (overrides the settings file; default is clock based)
    #[arg(long)]
    seed: Option<u64>,

    /// Battle speed preset
    #[arg(long, value_enum)]
    speed: Option<SpeedPreset>,

    /// Settings file
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    /// Leaderboard file
    #[arg(long, default_value = "highscores.json")]
    scores: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use gift_of_thought::sim::TickInput;
    use gift_of_thought::{HighScores, Session, Settings};

    env_logger::init();
    let args = Args::parse();
    log::info!("Gift of Thought (headless) starting...");

    let mut settings = Settings::load(&args.settings);
    if let Some(speed) = args.speed {
        settings.speed = speed;
    }
    let seed = args.seed.or(settings.seed).unwrap_or_else(clock_seed);
    log::info!("Seed {}, battle speed {}", seed, settings.speed.as_str());

    let mut scores = HighScores::load(&args.scores);
    scores.current_seed = seed;

    let mut session = Session::new(seed)
        .with_dt(settings.dt())
        .with_sink(scores);

    let input = TickInput {
        autoplay: settings.autoplay,
        speed: Some(settings.battle_speed()),
        ..Default::default()
    };
    let result = session.run_to_end(&input);

    if settings.record_scores {
        if let Err(e) = session.sink().save(&args.scores) {
            log::warn!("Could not save high scores: {}", e);
        }
    }

    match result.map(|r| serde_json::to_string_pretty(&r)) {
        Some(Ok(json)) => println!("{}", json),
        Some(Err(e)) => log::warn!("Could not encode result: {}", e),
        None => log::warn!("Session ended without a result"),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No headless runner on the web; embed the library instead
}
