//! Position evaluation for automated players

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::board::{
    circular_distance, is_safe_spot, steps_from_start, Color, Position, HOME_LANE_CELLS,
    MAIN_PATH_LENGTH, TOKENS_PER_COLOR,
};
use crate::game::{GameState, Token};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Score of a color whose four tokens have all finished
pub const WIN_VALUE: f32 = 100000.0;

/// Full route length: shared steps to the entrance plus the lane
const ROUTE_LENGTH: f32 = (MAIN_PATH_LENGTH + HOME_LANE_CELLS) as f32;

/// Blockade points on a cell where it can obstruct opponents
const BLOCKADE_OPEN_CELL: f32 = 10.0;
/// Blockade points on a safe spot
const BLOCKADE_SAFE_CELL: f32 = 5.0;

// ============================================================================
// WEIGHTS
// ============================================================================

/// Term weights for one game phase
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub progress: f32,
    pub home_completion: f32,
    pub safety: f32,
    pub vulnerability: f32,
    pub capture: f32,
    pub blockade: f32,
    pub threat: f32,
    pub token_out_of_yard: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            progress: 200.0,
            home_completion: 500.0,
            safety: 100.0,
            vulnerability: -150.0,
            capture: 300.0,
            blockade: 50.0,
            threat: -200.0,
            token_out_of_yard: 150.0,
        }
    }
}

/// Heuristic weights for every phase
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Heuristics {
    pub early: Weights,
    pub mid: Weights,
    pub end: Weights,
    /// Fraction of opponents' progress subtracted from the score
    pub opponent_damping: f32,
}

impl Default for Heuristics {
    fn default() -> Self {
        let mid = Weights::default();
        Self {
            // Get tokens out and keep them safe
            early: Weights {
                token_out_of_yard: 250.0,
                safety: 150.0,
                capture: 200.0,
                ..mid
            },
            mid,
            // Race home; blockades must be broken up eventually
            end: Weights {
                progress: 250.0,
                home_completion: 600.0,
                blockade: -100.0,
                threat: -300.0,
                ..mid
            },
            opponent_damping: 0.3,
        }
    }
}

impl Heuristics {
    pub fn weights(&self, phase: Phase) -> &Weights {
        match phase {
            Phase::Early => &self.early,
            Phase::Mid => &self.mid,
            Phase::End => &self.end,
        }
    }
}

/// Game phase from one color's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Early,
    Mid,
    End,
}

/// What the move leading to an evaluated state did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveDetails {
    pub capture_occurred: bool,
    pub token_left_yard: bool,
}

// ============================================================================
// TERMS
// ============================================================================

fn color_tokens(state: &GameState, color: Color) -> &[Token] {
    state.tokens(color).map(|t| t.as_slice()).unwrap_or(&[])
}

/// Progress of one token along its route, 0 in base to 1 once finished
pub fn token_progress(token: &Token, color: Color) -> f32 {
    let travelled = match token.position {
        Position::Base => return 0.0,
        Position::Finished => return 1.0,
        Position::Main(cell) => steps_from_start(color, cell) as f32 + 1.0,
        Position::Lane(_, index) => MAIN_PATH_LENGTH as f32 + index as f32,
    };
    travelled / ROUTE_LENGTH
}

fn total_progress(state: &GameState, color: Color) -> f32 {
    color_tokens(state, color)
        .iter()
        .map(|t| token_progress(t, color))
        .sum()
}

fn count_finished(state: &GameState, color: Color) -> usize {
    color_tokens(state, color).iter().filter(|t| t.is_home).count()
}

/// Tokens resting on safe spots
pub fn count_safe_tokens(state: &GameState, color: Color) -> usize {
    color_tokens(state, color)
        .iter()
        .filter(|t| t.position.main_cell().is_some_and(is_safe_spot))
        .count()
}

/// Tokens on capturable shared-loop cells
pub fn count_vulnerable_tokens(state: &GameState, color: Color) -> usize {
    color_tokens(state, color)
        .iter()
        .filter(|t| t.position.main_cell().is_some_and(|c| !is_safe_spot(c)))
        .count()
}

/// Points for cells holding two or more of this color's tokens
pub fn blockade_score(state: &GameState, color: Color) -> f32 {
    let mut per_cell: FxHashMap<u8, usize> = FxHashMap::default();
    for token in color_tokens(state, color) {
        if let Some(cell) = token.position.main_cell() {
            *per_cell.entry(cell).or_default() += 1;
        }
    }

    per_cell
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(cell, _)| {
            if is_safe_spot(cell) {
                BLOCKADE_SAFE_CELL
            } else {
                BLOCKADE_OPEN_CELL
            }
        })
        .sum()
}

/// Tokens on open cells with an opponent up to six cells behind
pub fn count_threats(state: &GameState, color: Color) -> usize {
    let hunters: Vec<u8> = state
        .all_tokens()
        .filter(|&(c, t)| c != color && !t.is_home)
        .filter_map(|(_, t)| t.position.main_cell())
        .collect();

    color_tokens(state, color)
        .iter()
        .filter_map(|t| t.position.main_cell())
        .filter(|&cell| !is_safe_spot(cell))
        .filter(|&cell| {
            hunters
                .iter()
                .any(|&h| (1..=6).contains(&circular_distance(h, cell)))
        })
        .count()
}

/// Phase from `color`'s own tokens
pub fn game_phase(state: &GameState, color: Color) -> Phase {
    let tokens = color_tokens(state, color);
    let out_of_base = tokens.iter().filter(|t| !t.position.is_base()).count();
    let in_lane = tokens.iter().filter(|t| t.position.is_in_lane()).count();
    let finished = tokens.iter().filter(|t| t.is_home).count();

    if finished >= 2 || (in_lane > 0 && out_of_base == TOKENS_PER_COLOR) {
        Phase::End
    } else if out_of_base >= 2 {
        Phase::Mid
    } else {
        Phase::Early
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Score `state` for `color`; higher is better.
///
/// Returns exactly `WIN_VALUE` when all four tokens have finished, and
/// something strictly below it otherwise.
pub fn evaluate_state(
    state: &GameState,
    color: Color,
    details: MoveDetails,
    heuristics: &Heuristics,
) -> f32 {
    let finished = count_finished(state, color);
    if finished == TOKENS_PER_COLOR {
        return WIN_VALUE;
    }

    let w = heuristics.weights(game_phase(state, color));
    let mut score = 0.0f32;

    score += w.progress * total_progress(state, color);
    score += w.home_completion * finished as f32;

    score += w.safety * count_safe_tokens(state, color) as f32;
    score += w.vulnerability * count_vulnerable_tokens(state, color) as f32;

    if details.capture_occurred {
        score += w.capture;
    }

    score += w.blockade * blockade_score(state, color);
    score += w.threat * count_threats(state, color) as f32;

    if details.token_left_yard {
        score += w.token_out_of_yard;
    }

    let opponents: f32 = state
        .active_colors()
        .iter()
        .filter(|&&c| c != color)
        .map(|&c| {
            w.progress * total_progress(state, c) + w.home_completion * count_finished(state, c) as f32
        })
        .sum();
    score -= heuristics.opponent_damping * opponents;

    score.min(WIN_VALUE - 1.0)
}
