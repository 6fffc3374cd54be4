//! Engine facade: one exclusively-owned instance per match
//!
//! Commands are applied one at a time by the caller. Every accepted
//! command (or fired timer) commits one transition and sends one
//! snapshot to each listener; refused commands change nothing and
//! notify no one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::HeuristicAI;
use crate::board::Color;
use crate::config::{EngineConfig, Seat};
use crate::dice::Dice;
use crate::game::{GameState, MovableToken, MoveOutcome, Rejection, Token, TurnState};
use crate::scheduler::{Clock, Scheduler, SystemClock, Timer, TimerKind};

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Immutable view of a match handed to transport and rendering
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tokens_by_color: BTreeMap<Color, Vec<Token>>,
    pub current_color: Option<Color>,
    pub dice_value: Option<u8>,
    pub turn_state: TurnState,
    pub movable_tokens: Vec<MovableToken>,
    pub winner: Option<Color>,
    /// Clock time at which the current turn is forfeited
    pub turn_deadline: Option<u64>,
}

/// State-change listener
pub type Listener = Box<dyn FnMut(&Snapshot) + Send>;

/// Invalid seat list for a new round
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("a match needs at least two players, got {0}")]
    NotEnoughPlayers(usize),
    #[error("color {0} is taken twice")]
    DuplicateColor(Color),
    #[error("player id {0:?} is used twice")]
    DuplicateId(String),
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct Engine {
    state: GameState,
    seats: Vec<Seat>,
    config: EngineConfig,
    dice: Dice,
    ai: HeuristicAI,
    scheduler: Scheduler,
    clock: Box<dyn Clock>,
    listeners: Vec<Listener>,
    /// Set by `end`; the engine refuses everything afterwards
    ended: bool,
}

impl Engine {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Start a new round for `seats`
    pub fn new(seats: Vec<Seat>, config: EngineConfig, clock: Box<dyn Clock>) -> Result<Self, SetupError> {
        validate_seats(&seats)?;

        let colors: Vec<Color> = seats.iter().map(|s| s.color).collect();
        let mut engine = Self {
            state: GameState::new(&colors),
            dice: Dice::from_seed(config.seed),
            ai: HeuristicAI::new(config.heuristics.clone()),
            seats,
            config,
            scheduler: Scheduler::new(),
            clock,
            listeners: Vec::new(),
            ended: false,
        };

        tracing::info!(
            players = engine.seats.len(),
            first = ?engine.state.current_color(),
            "New round started"
        );

        let first_roll_delay = engine.config.ai_first_roll_delay_ms;
        engine.start_turn(first_roll_delay);
        Ok(engine)
    }

    pub fn with_system_clock(seats: Vec<Seat>, config: EngineConfig) -> Result<Self, SetupError> {
        Self::new(seats, config, Box::new(SystemClock::new()))
    }

    /// Replace the die source
    pub fn with_dice(mut self, dice: Dice) -> Self {
        self.dice = dice;
        self
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get_state(&self) -> Snapshot {
        Snapshot {
            tokens_by_color: self
                .state
                .tokens_by_color()
                .iter()
                .map(|(&color, tokens)| (color, tokens.to_vec()))
                .collect(),
            current_color: self.state.current_color(),
            dice_value: self.state.dice_value(),
            turn_state: self.state.turn_state(),
            movable_tokens: self.state.movable_tokens().to_vec(),
            winner: self.state.winner(),
            turn_deadline: self.scheduler.deadline(),
        }
    }

    /// Read-only rules state, e.g. for cloning into a simulation
    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pending automatic action, if any
    pub fn pending_timer(&self) -> Option<Timer> {
        self.scheduler.pending()
    }

    /// When the driver should call `poll` next
    pub fn next_fire_at(&self) -> Option<u64> {
        self.scheduler.next_fire_at()
    }

    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    pub fn on_state_change(&mut self, listener: impl FnMut(&Snapshot) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    /// Roll for the requester, if it is their turn to roll
    pub fn roll_dice(&mut self, requester_id: &str) {
        if self.refuse_after_end("roll") {
            return;
        }
        let Some(color) = self.seat_color(requester_id) else {
            tracing::debug!(requester_id, "roll from unknown requester ignored");
            return;
        };
        if let Err(reason) = self.try_roll(color) {
            tracing::debug!(requester_id, %reason, "roll rejected");
        }
    }

    /// Move the requester's token, if it is in the movable set
    pub fn move_token(&mut self, requester_id: &str, color: Color, token_id: u8) {
        if self.refuse_after_end("move") {
            return;
        }
        let result = match self.seat_color(requester_id) {
            Some(seat_color) if seat_color == color => self.try_move(color, token_id),
            _ => Err(Rejection::WrongTurn(color)),
        };
        if let Err(reason) = result {
            tracing::debug!(requester_id, %color, token_id, %reason, "move rejected");
        }
    }

    /// Take a color out of the match (player left or was kicked)
    pub fn remove_player(&mut self, color: Color) {
        if self.refuse_after_end("remove") {
            return;
        }
        let was_current = self.state.current_color() == Some(color);
        if let Err(reason) = self.state.remove_color(color) {
            tracing::debug!(%color, %reason, "remove rejected");
            return;
        }
        self.seats.retain(|s| s.color != color);
        tracing::info!(%color, remaining = self.seats.len(), "Player removed");

        if self.state.is_over() {
            self.finish();
        } else if was_current {
            let delay = self.config.ai_first_roll_delay_ms;
            self.start_turn(delay);
        }
        self.notify();
    }

    /// Remove the seat with the given requester id
    pub fn remove_player_by_id(&mut self, requester_id: &str) {
        match self.seat_color(requester_id) {
            Some(color) => self.remove_player(color),
            None => tracing::debug!(requester_id, "remove for unknown requester ignored"),
        }
    }

    /// Fire every timer that was armed before this call and is due.
    /// Returns how many fired.
    pub fn poll(&mut self) -> usize {
        if self.ended {
            return 0;
        }
        let now = self.clock.now_ms();
        let armed_by = self.scheduler.generation();
        let mut fired = 0;
        while let Some(timer) = self.scheduler.pop_due(now, armed_by) {
            fired += 1;
            self.fire(timer);
        }
        fired
    }

    /// Discard the match: timers are cancelled and every later command
    /// is refused
    pub fn end(&mut self) {
        if !self.ended {
            tracing::info!("Match ended by host");
        }
        self.ended = true;
        self.scheduler.cancel_all();
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    fn try_roll(&mut self, color: Color) -> Result<(), Rejection> {
        self.state.ensure_can_roll(color)?;
        let value = self.dice.roll(self.state.consecutive_sixes());
        let outcome = self.state.apply_roll(color, value)?;

        tracing::debug!(%color, value, movable = outcome.movable.len(), "Dice rolled");

        let now = self.clock.now_ms();
        self.scheduler.cancel_action();
        self.scheduler.set_deadline(now + self.config.turn_duration_ms);

        if outcome.movable.is_empty() {
            self.scheduler
                .schedule(TimerKind::AutoAdvance, now + self.config.no_move_delay_ms);
        } else if self.current_seat_is_ai() {
            self.scheduler
                .schedule(TimerKind::AiMove, now + self.config.ai_move_delay_ms);
        } else if let [only] = outcome.movable.as_slice() {
            if self.config.auto_move_single {
                self.scheduler
                    .schedule(TimerKind::AutoMove(only.id), now + self.config.auto_move_delay_ms);
            }
        }

        self.notify();
        Ok(())
    }

    fn try_move(&mut self, color: Color, token_id: u8) -> Result<(), Rejection> {
        let outcome = self.state.apply_move(color, token_id)?;
        self.log_move(&outcome);

        if outcome.winner.is_some() {
            self.finish();
        } else if outcome.bonus_turn {
            let delay = self.config.ai_reroll_delay_ms;
            self.start_turn(delay);
        } else {
            let delay = self.config.ai_first_roll_delay_ms;
            self.start_turn(delay);
        }

        self.notify();
        Ok(())
    }

    fn fire(&mut self, timer: Timer) {
        let Some(color) = self.state.current_color() else {
            return;
        };

        let result = match timer.kind {
            TimerKind::AutoAdvance => {
                if self.state.turn_state() == TurnState::Moving && self.state.movable_tokens().is_empty() {
                    self.pass_turn();
                }
                Ok(())
            }
            TimerKind::AutoMove(token_id) => self.try_move(color, token_id),
            TimerKind::AiMove => match self.ai.choose_move(&self.state) {
                Some(token_id) => self.try_move(color, token_id),
                None => {
                    self.pass_turn();
                    Ok(())
                }
            },
            TimerKind::AiRoll => self.try_roll(color),
            TimerKind::TurnTimeout => {
                tracing::warn!(%color, "Turn timed out");
                self.pass_turn();
                Ok(())
            }
        };

        if let Err(reason) = result {
            tracing::debug!(kind = ?timer.kind, %reason, "timer had nothing to do");
        }
    }

    /// Forfeit the rest of the current turn
    fn pass_turn(&mut self) {
        if self.state.is_over() {
            return;
        }
        self.state.advance_turn();
        let delay = self.config.ai_first_roll_delay_ms;
        self.start_turn(delay);
        self.notify();
    }

    /// Arm the deadline for the player now to roll, and their AI roll
    fn start_turn(&mut self, ai_roll_delay: u64) {
        let now = self.clock.now_ms();
        self.scheduler.cancel_action();
        self.scheduler.set_deadline(now + self.config.turn_duration_ms);
        if self.current_seat_is_ai() {
            self.scheduler.schedule(TimerKind::AiRoll, now + ai_roll_delay);
        }
    }

    fn finish(&mut self) {
        self.scheduler.cancel_all();
        match self.state.winner() {
            Some(winner) => tracing::info!(%winner, "Match won"),
            None => tracing::info!("Match ended without a winner"),
        }
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.get_state();
        for listener in &mut self.listeners {
            listener(&snapshot);
        }
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn refuse_after_end(&self, command: &str) -> bool {
        if self.ended {
            tracing::debug!(command, "command after end ignored");
        }
        self.ended
    }

    fn seat_color(&self, requester_id: &str) -> Option<Color> {
        self.seats.iter().find(|s| s.id == requester_id).map(|s| s.color)
    }

    fn current_seat_is_ai(&self) -> bool {
        let Some(color) = self.state.current_color() else {
            return false;
        };
        self.seats.iter().any(|s| s.color == color && s.is_ai())
    }

    fn log_move(&self, outcome: &MoveOutcome) {
        tracing::debug!(
            color = %outcome.color,
            token = outcome.token_id,
            from = %outcome.from,
            to = %outcome.to,
            captured = outcome.captured.len(),
            bonus = outcome.bonus_turn,
            "Token moved"
        );
    }
}

fn validate_seats(seats: &[Seat]) -> Result<(), SetupError> {
    if seats.len() < 2 {
        return Err(SetupError::NotEnoughPlayers(seats.len()));
    }
    for (i, seat) in seats.iter().enumerate() {
        let earlier = &seats[..i];
        if earlier.iter().any(|s| s.color == seat.color) {
            return Err(SetupError::DuplicateColor(seat.color));
        }
        if earlier.iter().any(|s| s.id == seat.id) {
            return Err(SetupError::DuplicateId(seat.id.clone()));
        }
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
