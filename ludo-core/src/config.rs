//! Engine configuration and seat assignment

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::board::Color;
use crate::eval::Heuristics;

/// Who controls a seat
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Ai,
}

/// A participant in a round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Requester id used by roll and move commands
    pub id: String,
    pub color: Color,
    pub kind: PlayerKind,
}

impl Seat {
    pub fn human(id: impl Into<String>, color: Color) -> Self {
        Self {
            id: id.into(),
            color,
            kind: PlayerKind::Human,
        }
    }

    pub fn ai(color: Color) -> Self {
        Self {
            id: format!("ai-{}", color),
            color,
            kind: PlayerKind::Ai,
        }
    }

    pub fn is_ai(&self) -> bool {
        self.kind == PlayerKind::Ai
    }
}

/// Engine timings and AI settings (all durations in milliseconds)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Time a player has to finish a turn before forfeiting it
    pub turn_duration_ms: u64,
    /// Pause before passing the turn when nothing is movable
    pub no_move_delay_ms: u64,
    /// Pause before playing a human's only legal move
    pub auto_move_delay_ms: u64,
    /// Set to false to make humans always choose
    pub auto_move_single: bool,
    /// Think time before an AI moves
    pub ai_move_delay_ms: u64,
    /// Pause before an AI rolls again on a bonus turn
    pub ai_reroll_delay_ms: u64,
    /// Pause before an AI rolls at the start of its turn
    pub ai_first_roll_delay_ms: u64,
    /// Fixed die seed for reproducible matches
    pub seed: Option<u64>,
    pub heuristics: Heuristics,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            turn_duration_ms: 30_000,
            no_move_delay_ms: 1_500,
            auto_move_delay_ms: 1_000,
            auto_move_single: true,
            ai_move_delay_ms: 2_000,
            ai_reroll_delay_ms: 1_500,
            ai_first_roll_delay_ms: 1_000,
            seed: None,
            heuristics: Heuristics::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
