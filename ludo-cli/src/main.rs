//! Ludo CLI - Command-line interface
//!
//! Commands:
//! - play: Run one all-AI game through the engine
//! - match: Headless self-play statistics
//! - probe: Evaluate the position model for one move

mod match_cmd;
mod play_cmd;
mod probe_cmd;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ludo")]
#[command(about = "Ludo rules engine and self-play driver")]
struct Cli {
    /// Random seed for reproducible dice
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one game between AI seats
    Play(play_cmd::PlayArgs),
    /// Play many AI games and report statistics
    Match(match_cmd::MatchArgs),
    /// Where does a token land?
    Probe(probe_cmd::ProbeArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => play_cmd::run(args, cli.seed),
        Commands::Match(args) => match_cmd::run(args, cli.seed),
        Commands::Probe(args) => probe_cmd::run(args),
    }
}
