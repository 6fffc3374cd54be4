//! Play command - one all-AI game driven through the engine
//!
//! The engine runs on a hand-driven clock: the loop jumps straight to the
//! next fire time and polls, so a full game finishes instantly while the
//! configured delays still order the transitions.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use ludo_core::{Clock, Engine, EngineConfig, ManualClock, Seat, Snapshot, TURN_ORDER};

#[derive(Args)]
pub struct PlayArgs {
    /// Number of AI seats (2-4)
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u8).range(2..=4))]
    pub players: u8,

    /// Engine config JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Give up after this many timer firings
    #[arg(long, default_value = "50000")]
    pub max_steps: usize,
}

pub fn run(args: PlayArgs, seed: Option<u64>) -> Result<()> {
    let config = load_config(&args, seed)?;
    let seats = ai_seats(args.players);

    tracing::info!("Starting game: {} AI players, seed={:?}", seats.len(), config.seed);

    let clock = ManualClock::new(0);
    let mut engine = Engine::new(seats, config, Box::new(clock.clone())).context("Failed to set up game")?;
    engine.on_state_change(log_snapshot);

    let steps = drive(&mut engine, &clock, args.max_steps);
    let snapshot = engine.get_state();

    match snapshot.winner {
        Some(winner) => {
            println!("Winner: {} after {} timer firings ({} ms of game time)", winner, steps, clock.now_ms());
            Ok(())
        }
        None => bail!("No winner after {} timer firings", steps),
    }
}

fn load_config(args: &PlayArgs, seed: Option<u64>) -> Result<EngineConfig> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    Ok(match seed {
        Some(s) => config.with_seed(s),
        None => config,
    })
}

/// First `players` colors in turn order, all AI
pub fn ai_seats(players: u8) -> Vec<Seat> {
    TURN_ORDER
        .iter()
        .take(players as usize)
        .map(|&color| Seat::ai(color))
        .collect()
}

/// Jump the clock to each fire time until the match ends
pub fn drive(engine: &mut Engine, clock: &ManualClock, max_steps: usize) -> usize {
    let mut steps = 0;
    while !engine.is_over() && steps < max_steps {
        let Some(at) = engine.next_fire_at() else {
            break;
        };
        clock.set(at);
        steps += engine.poll();
    }
    steps
}

fn log_snapshot(snapshot: &Snapshot) {
    let finished: usize = snapshot
        .tokens_by_color
        .values()
        .map(|tokens| tokens.iter().filter(|t| t.is_home).count())
        .sum();

    tracing::info!(
        current = ?snapshot.current_color,
        dice = ?snapshot.dice_value,
        state = ?snapshot.turn_state,
        movable = snapshot.movable_tokens.len(),
        finished,
        "Snapshot"
    );

    if let Ok(json) = serde_json::to_string(snapshot) {
        tracing::debug!("{}", json);
    }
}
