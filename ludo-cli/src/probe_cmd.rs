//! Probe command - evaluate the position model for a single move

use anyhow::{Context, Result};
use clap::Args;

use ludo_core::{calculate_new_position, Color, Position};

#[derive(Args)]
pub struct ProbeArgs {
    /// Token color (red, green, yellow, blue)
    #[arg(long)]
    pub color: Color,

    /// Position code: -1 base, 1-52 loop, prefix+index for a lane
    #[arg(long, allow_negative_numbers = true)]
    pub position: i16,

    /// Die value
    #[arg(long)]
    pub steps: u8,
}

pub fn run(args: ProbeArgs) -> Result<()> {
    let from = Position::from_code(args.position)
        .with_context(|| format!("Invalid position code: {}", args.position))?;

    println!("{}", describe(args.color, from, args.steps));
    Ok(())
}

fn describe(color: Color, from: Position, steps: u8) -> String {
    match calculate_new_position(color, from, steps) {
        Some(to) => format!("{} {} +{} -> {} (code {})", color, from, steps, to, to.code()),
        None => format!("{} {} +{} -> no legal move", color, from, steps),
    }
}
