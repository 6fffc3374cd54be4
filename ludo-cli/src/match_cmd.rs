//! Match command - headless self-play between heuristic AIs
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: play_match(), report_results()
//! - Level 3: play_single_game(), compute_match_statistics()
//! - Level 4: formatting utilities

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use ludo_core::{Color, Dice, GameState, HeuristicAI, TURN_ORDER};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct MatchArgs {
    /// Number of games to play
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Players per game (2-4)
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u8).range(2..=4))]
    pub players: u8,

    /// Maximum die rolls per game
    #[arg(long, default_value = "5000")]
    pub max_rolls: u32,

    /// Play games on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of a single game
#[derive(Clone, Debug)]
struct GameRecord {
    game_number: usize,
    winner: Option<Color>,
    moves: usize,
    captures: usize,
}

/// Aggregated match results
#[derive(Clone, Debug)]
struct MatchResults {
    games: Vec<GameRecord>,
    wins: BTreeMap<Color, usize>,
    unfinished: usize,
    avg_moves: f32,
    avg_captures: f32,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run match command
pub fn run(args: MatchArgs, seed: Option<u64>) -> Result<()> {
    tracing::info!(
        "Starting match: {} games, {} players, parallel={}",
        args.games,
        args.players,
        args.parallel
    );

    let results = play_match(&args, seed);

    report_results(&results, &args);

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Play all games; each game gets its own die seed drawn up front
fn play_match(args: &MatchArgs, seed: Option<u64>) -> MatchResults {
    let mut rng = create_rng(seed);
    let seeds: Vec<u64> = (0..args.games).map(|_| rng.gen()).collect();
    let colors: Vec<Color> = TURN_ORDER.iter().take(args.players as usize).copied().collect();

    let play = |(i, &game_seed): (usize, &u64)| {
        let record = play_single_game(&colors, i + 1, game_seed, args.max_rolls);
        tracing::info!(
            "Game {}: {:?} ({} moves)",
            record.game_number,
            record.winner,
            record.moves
        );
        record
    };

    let games: Vec<GameRecord> = if args.parallel {
        seeds.par_iter().enumerate().map(play).collect()
    } else {
        seeds.iter().enumerate().map(play).collect()
    };

    compute_match_statistics(games)
}

/// Report match results
fn report_results(results: &MatchResults, args: &MatchArgs) {
    if args.json {
        print_json_results(results);
    } else {
        print_text_results(results);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

fn play_single_game(colors: &[Color], game_number: usize, seed: u64, max_rolls: u32) -> GameRecord {
    let ai = HeuristicAI::default();
    let mut dice = Dice::seeded(seed);
    let (final_state, history) = ai.play_game(GameState::new(colors), &mut dice, max_rolls);

    GameRecord {
        game_number,
        winner: final_state.winner(),
        moves: history.len(),
        captures: history.iter().filter(|m| m.capture_occurred()).count(),
    }
}

/// Compute aggregate statistics from game records
fn compute_match_statistics(games: Vec<GameRecord>) -> MatchResults {
    let mut wins = BTreeMap::new();
    for winner in games.iter().filter_map(|g| g.winner) {
        *wins.entry(winner).or_insert(0) += 1;
    }
    let unfinished = games.iter().filter(|g| g.winner.is_none()).count();

    let total_moves: usize = games.iter().map(|g| g.moves).sum();
    let total_captures: usize = games.iter().map(|g| g.captures).sum();
    let (avg_moves, avg_captures) = if games.is_empty() {
        (0.0, 0.0)
    } else {
        let n = games.len() as f32;
        (total_moves as f32 / n, total_captures as f32 / n)
    };

    MatchResults {
        games,
        wins,
        unfinished,
        avg_moves,
        avg_captures,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn percent(count: usize, total: usize) -> f32 {
    if total > 0 {
        count as f32 / total as f32 * 100.0
    } else {
        0.0
    }
}

/// Print results as JSON
fn print_json_results(results: &MatchResults) {
    #[derive(serde::Serialize)]
    struct JsonGame {
        game_number: usize,
        winner: Option<Color>,
        moves: usize,
        captures: usize,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        total_games: usize,
        wins: BTreeMap<Color, usize>,
        unfinished: usize,
        avg_moves: f32,
        avg_captures: f32,
        games: Vec<JsonGame>,
    }

    let output = JsonOutput {
        total_games: results.games.len(),
        wins: results.wins.clone(),
        unfinished: results.unfinished,
        avg_moves: results.avg_moves,
        avg_captures: results.avg_captures,
        games: results
            .games
            .iter()
            .map(|g| JsonGame {
                game_number: g.game_number,
                winner: g.winner,
                moves: g.moves,
                captures: g.captures,
            })
            .collect(),
    };

    if let Ok(json) = serde_json::to_string_pretty(&output) {
        println!("{}", json);
    }
}

/// Print results as text
fn print_text_results(results: &MatchResults) {
    let total = results.games.len();

    println!("\n=== Match Results ===");
    println!("Total games: {}", total);
    for (color, &count) in &results.wins {
        println!("{:<7} wins: {} ({:.1}%)", color, count, percent(count, total));
    }
    println!(
        "Unfinished:   {} ({:.1}%)",
        results.unfinished,
        percent(results.unfinished, total)
    );
    println!("Avg moves:    {:.1}", results.avg_moves);
    println!("Avg captures: {:.1}", results.avg_captures);

    println!("\nGame details:");
    for game in &results.games {
        let winner = game.winner.map_or("nobody".to_string(), |c| c.to_string());
        println!(
            "  Game {}: {} won in {} moves ({} captures)",
            game.game_number, winner, game.moves, game.captures
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
