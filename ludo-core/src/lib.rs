//! Ludo Core - Rules engine and AI
//!
//! This crate provides the authoritative rules for four-player Ludo:
//! - Board layout and the position model (shared loop, home lanes)
//! - Match state, move legality, captures and win detection
//! - The turn state machine with bonus turns and the three-sixes rule
//! - Heuristic evaluation and a greedy automated player
//! - An engine facade with explicit timers and state-change snapshots

pub mod board;
pub mod game;
pub mod dice;
pub mod eval;
pub mod ai;
pub mod scheduler;
pub mod config;
pub mod engine;

// Re-exports for convenient access
pub use board::{calculate_new_position, is_safe_spot, Color, Position, SAFE_SPOTS, TURN_ORDER};
pub use game::{GameState, MovableToken, MoveOutcome, Rejection, RollOutcome, Token, TurnState};
pub use dice::Dice;
pub use eval::{evaluate_state, game_phase, Heuristics, MoveDetails, Phase, Weights, WIN_VALUE};
pub use ai::HeuristicAI;
pub use scheduler::{Clock, ManualClock, Scheduler, SystemClock, TimerKind};
pub use config::{EngineConfig, PlayerKind, Seat};
pub use engine::{Engine, SetupError, Snapshot};
