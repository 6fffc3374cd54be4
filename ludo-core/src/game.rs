//! Match state, move legality, captures, win detection and the turn state machine

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{
    calculate_new_position, is_safe_spot, Color, Position, SIX, TOKENS_PER_COLOR, TURN_ORDER,
};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Sixes in a row after which the die only shows 1..=5
pub const MAX_CONSECUTIVE_SIXES: u8 = 2;

// ============================================================================
// CORE TYPES
// ============================================================================

/// A single token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: u8,
    pub position: Position,
    /// True only once the token has finished
    pub is_home: bool,
}

impl Token {
    fn new(id: u8) -> Self {
        Self {
            id,
            position: Position::Base,
            is_home: false,
        }
    }
}

/// Phase of the current player's turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnState {
    Rolling,
    Moving,
}

/// A token the current player may move with the current die value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovableToken {
    pub color: Color,
    pub id: u8,
}

/// Why a command was refused. Refused commands leave the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("it is not {0}'s turn")]
    WrongTurn(Color),
    #[error("command not accepted while {0:?}")]
    WrongPhase(TurnState),
    #[error("{0} token {1} cannot move")]
    IllegalMove(Color, u8),
    #[error("die value {0} cannot be rolled now")]
    IllegalDie(u8),
    #[error("the match is over")]
    GameOver,
    #[error("{0} is not playing")]
    UnknownColor(Color),
}

/// Result of an accepted roll
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollOutcome {
    pub color: Color,
    pub value: u8,
    pub movable: Vec<MovableToken>,
}

/// Result of an accepted move
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    pub color: Color,
    pub token_id: u8,
    pub die: u8,
    pub from: Position,
    pub to: Position,
    /// Opposing tokens sent back to base
    pub captured: Vec<(Color, u8)>,
    pub finished: bool,
    pub bonus_turn: bool,
    pub winner: Option<Color>,
}

impl MoveOutcome {
    pub fn capture_occurred(&self) -> bool {
        !self.captured.is_empty()
    }

    pub fn left_base(&self) -> bool {
        self.from.is_base()
    }
}

// ============================================================================
// GAME STATE
// ============================================================================

/// Authoritative match state (clone to simulate)
#[derive(Clone, Debug)]
pub struct GameState {
    /// Participants in fixed turn order
    active_colors: Vec<Color>,
    current_index: usize,
    dice_value: Option<u8>,
    turn_state: TurnState,
    /// Sixes rolled in a row by the current player
    consecutive_sixes: u8,
    winner: Option<Color>,
    /// Set when a winner emerged or everyone left
    over: bool,
    movable: Vec<MovableToken>,
    tokens: BTreeMap<Color, [Token; TOKENS_PER_COLOR]>,
}

impl GameState {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Create a fresh round: every token in base, first color to roll
    pub fn new(participants: &[Color]) -> Self {
        let active_colors: Vec<Color> = TURN_ORDER
            .into_iter()
            .filter(|c| participants.contains(c))
            .collect();

        let tokens = active_colors
            .iter()
            .map(|&color| (color, std::array::from_fn(|i| Token::new(i as u8))))
            .collect();

        Self {
            over: active_colors.is_empty(),
            active_colors,
            current_index: 0,
            dice_value: None,
            turn_state: TurnState::Rolling,
            consecutive_sixes: 0,
            winner: None,
            movable: Vec::new(),
            tokens,
        }
    }

    /// Put a token on a given position, bypassing the rules (scenario setup)
    pub fn place_token(&mut self, color: Color, token_id: u8, position: Position) {
        if let Some(token) = self.token_mut(color, token_id) {
            token.position = position;
            token.is_home = position.is_finished();
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn active_colors(&self) -> &[Color] {
        &self.active_colors
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Color whose turn it is
    pub fn current_color(&self) -> Option<Color> {
        self.active_colors.get(self.current_index).copied()
    }

    pub fn dice_value(&self) -> Option<u8> {
        self.dice_value
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn_state
    }

    pub fn consecutive_sixes(&self) -> u8 {
        self.consecutive_sixes
    }

    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    /// No further rolls or moves are accepted
    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn movable_tokens(&self) -> &[MovableToken] {
        &self.movable
    }

    pub fn tokens(&self, color: Color) -> Option<&[Token; TOKENS_PER_COLOR]> {
        self.tokens.get(&color)
    }

    pub fn token(&self, color: Color, token_id: u8) -> Option<&Token> {
        self.tokens.get(&color)?.get(token_id as usize)
    }

    fn token_mut(&mut self, color: Color, token_id: u8) -> Option<&mut Token> {
        self.tokens.get_mut(&color)?.get_mut(token_id as usize)
    }

    /// Iterate every token of every active color
    pub fn all_tokens(&self) -> impl Iterator<Item = (Color, &Token)> + '_ {
        self.tokens
            .iter()
            .flat_map(|(&color, tokens)| tokens.iter().map(move |t| (color, t)))
    }

    pub fn tokens_by_color(&self) -> &BTreeMap<Color, [Token; TOKENS_PER_COLOR]> {
        &self.tokens
    }

    // ========================================================================
    // MOVE VALIDATION
    // ========================================================================

    /// Whether `color`'s token has a legal destination for the current die
    pub fn can_move_token(&self, color: Color, token_id: u8) -> bool {
        let (Some(token), Some(die)) = (self.token(color, token_id), self.dice_value) else {
            return false;
        };

        if token.is_home {
            return false;
        }
        if token.position.is_base() {
            return die == SIX;
        }
        calculate_new_position(color, token.position, die).is_some()
    }

    /// Recompute the candidate set for the current color
    pub fn update_movable_tokens(&mut self) {
        self.movable = match self.current_color() {
            Some(color) => (0..TOKENS_PER_COLOR as u8)
                .filter(|&id| self.can_move_token(color, id))
                .map(|id| MovableToken { color, id })
                .collect(),
            None => Vec::new(),
        };
    }

    fn is_movable(&self, color: Color, token_id: u8) -> bool {
        self.movable
            .iter()
            .any(|m| m.color == color && m.id == token_id)
    }

    // ========================================================================
    // CAPTURE AND WIN
    // ========================================================================

    /// Send opposing tokens on `new_position` back to base.
    ///
    /// Returns whether anything was captured. Lane cells and safe spots
    /// never capture; same-color tokens are left where they are.
    pub fn handle_capture(&mut self, new_position: Position, moving_color: Color) -> bool {
        !self.evict_opponents(new_position, moving_color).is_empty()
    }

    fn evict_opponents(&mut self, new_position: Position, moving_color: Color) -> Vec<(Color, u8)> {
        let Some(cell) = new_position.main_cell() else {
            return Vec::new();
        };
        if is_safe_spot(cell) {
            return Vec::new();
        }

        let mut captured = Vec::new();
        for (&color, tokens) in self.tokens.iter_mut() {
            if color == moving_color {
                continue;
            }
            for token in tokens.iter_mut().filter(|t| t.position == new_position) {
                token.position = Position::Base;
                captured.push((color, token.id));
            }
        }
        captured
    }

    /// First color in turn order with every token finished
    pub fn check_winner(&self) -> Option<Color> {
        self.active_colors.iter().copied().find(|color| {
            self.tokens
                .get(color)
                .is_some_and(|tokens| tokens.iter().all(|t| t.is_home))
        })
    }

    // ========================================================================
    // TURN STATE MACHINE
    // ========================================================================

    /// Check that `color` may roll right now
    pub fn ensure_can_roll(&self, color: Color) -> Result<(), Rejection> {
        if self.over {
            return Err(Rejection::GameOver);
        }
        if self.current_color() != Some(color) {
            return Err(Rejection::WrongTurn(color));
        }
        if self.turn_state != TurnState::Rolling {
            return Err(Rejection::WrongPhase(self.turn_state));
        }
        Ok(())
    }

    /// Record a die value rolled by `color` and compute its legal moves
    pub fn apply_roll(&mut self, color: Color, value: u8) -> Result<RollOutcome, Rejection> {
        self.ensure_can_roll(color)?;

        let max_face = if self.consecutive_sixes >= MAX_CONSECUTIVE_SIXES {
            SIX - 1
        } else {
            SIX
        };
        if !(1..=max_face).contains(&value) {
            return Err(Rejection::IllegalDie(value));
        }

        if value == SIX {
            self.consecutive_sixes += 1;
        } else {
            self.consecutive_sixes = 0;
        }

        self.dice_value = Some(value);
        self.turn_state = TurnState::Moving;
        self.update_movable_tokens();

        Ok(RollOutcome {
            color,
            value,
            movable: self.movable.clone(),
        })
    }

    /// Move one of `color`'s tokens by the rolled value
    pub fn apply_move(&mut self, color: Color, token_id: u8) -> Result<MoveOutcome, Rejection> {
        if self.over {
            return Err(Rejection::GameOver);
        }
        if self.current_color() != Some(color) {
            return Err(Rejection::WrongTurn(color));
        }
        if self.turn_state != TurnState::Moving {
            return Err(Rejection::WrongPhase(self.turn_state));
        }
        if !self.is_movable(color, token_id) {
            return Err(Rejection::IllegalMove(color, token_id));
        }

        let die = self.dice_value.ok_or(Rejection::IllegalMove(color, token_id))?;
        let from = self
            .token(color, token_id)
            .map(|t| t.position)
            .ok_or(Rejection::IllegalMove(color, token_id))?;
        let to = calculate_new_position(color, from, die).ok_or(Rejection::IllegalMove(color, token_id))?;

        let captured = self.evict_opponents(to, color);
        self.place_token(color, token_id, to);
        let finished = to.is_finished();

        let mut outcome = MoveOutcome {
            color,
            token_id,
            die,
            from,
            to,
            captured,
            finished,
            bonus_turn: false,
            winner: None,
        };

        if let Some(winner) = self.check_winner() {
            self.winner = Some(winner);
            self.over = true;
            self.movable.clear();
            outcome.winner = Some(winner);
            return Ok(outcome);
        }

        outcome.bonus_turn = die == SIX || outcome.capture_occurred() || finished;
        if outcome.bonus_turn {
            self.restart_turn();
        } else {
            self.advance_turn();
        }

        Ok(outcome)
    }

    /// Same player rolls again; the six streak is kept
    fn restart_turn(&mut self) {
        self.dice_value = None;
        self.movable.clear();
        self.turn_state = TurnState::Rolling;
    }

    /// Hand the turn to the next active color
    pub fn advance_turn(&mut self) {
        if self.over || self.active_colors.is_empty() {
            return;
        }
        self.consecutive_sixes = 0;
        self.current_index = (self.current_index + 1) % self.active_colors.len();
        self.restart_turn();
    }

    /// Drop a color from the match.
    ///
    /// When it was that color's turn, the color now in its slot starts a
    /// fresh turn. A single remaining color wins; none remaining ends the
    /// match without a winner.
    pub fn remove_color(&mut self, color: Color) -> Result<(), Rejection> {
        if self.over {
            return Err(Rejection::GameOver);
        }
        let index = self
            .active_colors
            .iter()
            .position(|&c| c == color)
            .ok_or(Rejection::UnknownColor(color))?;

        self.active_colors.remove(index);
        self.tokens.remove(&color);

        if index < self.current_index {
            self.current_index -= 1;
        } else if index == self.current_index {
            if self.current_index >= self.active_colors.len() {
                self.current_index = 0;
            }
            self.consecutive_sixes = 0;
            self.restart_turn();
        }

        match self.active_colors.as_slice() {
            [] => {
                self.over = true;
                self.movable.clear();
            }
            [last] => {
                self.winner = Some(*last);
                self.over = true;
                self.movable.clear();
            }
            _ => {}
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn four_player() -> GameState {
        GameState::new(&TURN_ORDER)
    }

    fn rolled(mut state: GameState, value: u8) -> GameState {
        let color = state.current_color().unwrap();
        state.apply_roll(color, value).unwrap();
        state
    }

    #[test]
    fn test_game_creation() {
        let game = GameState::new(&[Color::Blue, Color::Red]);
        assert_eq!(game.active_colors(), &[Color::Red, Color::Blue]);
        assert_eq!(game.current_color(), Some(Color::Red));
        assert_eq!(game.turn_state(), TurnState::Rolling);
        assert_eq!(game.dice_value(), None);
        assert!(game.all_tokens().all(|(_, t)| t.position == Position::Base && !t.is_home));
    }

    #[test]
    fn test_leave_base_grants_bonus() {
        let mut game = rolled(four_player(), 6);
        assert_eq!(game.movable_tokens().len(), 4);

        let outcome = game.apply_move(Color::Red, 0).unwrap();
        assert_eq!(outcome.to, Position::Main(1));
        assert!(outcome.bonus_turn);
        assert_eq!(game.current_color(), Some(Color::Red));
        assert_eq!(game.turn_state(), TurnState::Rolling);
        assert_eq!(game.consecutive_sixes(), 1);
    }

    #[test]
    fn test_no_moves_without_six() {
        let game = rolled(four_player(), 4);
        assert!(game.movable_tokens().is_empty());
        assert_eq!(game.turn_state(), TurnState::Moving);
    }

    #[test]
    fn test_plain_move_advances_turn() {
        let mut game = four_player();
        game.place_token(Color::Red, 0, Position::Main(10));
        let mut game = rolled(game, 3);

        let outcome = game.apply_move(Color::Red, 0).unwrap();
        assert_eq!(outcome.to, Position::Main(13));
        assert!(!outcome.bonus_turn);
        assert_eq!(game.current_color(), Some(Color::Green));
        assert_eq!(game.dice_value(), None);
    }

    #[test]
    fn test_green_crossing_entrance_enters_lane() {
        let mut game = four_player();
        game.advance_turn();
        game.place_token(Color::Green, 0, Position::Main(10));
        let mut game = rolled(game, 3);

        let outcome = game.apply_move(Color::Green, 0).unwrap();
        assert_eq!(outcome.to, Position::Lane(Color::Green, 1));
        assert_eq!(game.current_color(), Some(Color::Yellow));
    }

    #[test]
    fn test_capture_sends_opponent_home() {
        let mut game = four_player();
        game.place_token(Color::Red, 0, Position::Main(27));
        game.place_token(Color::Yellow, 2, Position::Main(30));
        let mut game = rolled(game, 3);

        let outcome = game.apply_move(Color::Red, 0).unwrap();
        assert_eq!(outcome.captured, vec![(Color::Yellow, 2)]);
        assert_eq!(game.token(Color::Yellow, 2).unwrap().position, Position::Base);
        assert!(outcome.bonus_turn);
        assert_eq!(game.current_color(), Some(Color::Red));
        assert_eq!(game.consecutive_sixes(), 0);
    }

    #[test]
    fn test_capture_evicts_every_opponent_on_cell() {
        let mut game = four_player();
        game.place_token(Color::Green, 0, Position::Main(30));
        game.place_token(Color::Green, 1, Position::Main(30));
        game.place_token(Color::Blue, 3, Position::Main(30));
        game.place_token(Color::Red, 1, Position::Main(30));

        assert!(game.handle_capture(Position::Main(30), Color::Red));
        assert_eq!(game.token(Color::Green, 0).unwrap().position, Position::Base);
        assert_eq!(game.token(Color::Green, 1).unwrap().position, Position::Base);
        assert_eq!(game.token(Color::Blue, 3).unwrap().position, Position::Base);
        assert_eq!(game.token(Color::Red, 1).unwrap().position, Position::Main(30));
    }

    #[test]
    fn test_safe_spot_never_captures() {
        let mut game = four_player();
        game.place_token(Color::Green, 0, Position::Main(14));
        game.place_token(Color::Blue, 0, Position::Main(14));
        assert!(!game.handle_capture(Position::Main(14), Color::Red));
        assert_eq!(game.token(Color::Green, 0).unwrap().position, Position::Main(14));
        assert!(!game.handle_capture(Position::Lane(Color::Red, 2), Color::Red));
    }

    #[test]
    fn test_finish_from_last_lane_cell() {
        let mut game = four_player();
        game.place_token(Color::Red, 3, Position::Lane(Color::Red, 5));
        let mut game = rolled(game, 1);

        let outcome = game.apply_move(Color::Red, 3).unwrap();
        assert!(outcome.finished);
        let token = game.token(Color::Red, 3).unwrap();
        assert!(token.is_home);
        assert_eq!(token.position, Position::Finished);
        assert!(outcome.bonus_turn);
    }

    #[test]
    fn test_lane_overshoot_not_movable() {
        let mut game = four_player();
        for id in 0..4 {
            game.place_token(Color::Red, id, Position::Lane(Color::Red, 5));
        }
        let mut game = rolled(game, 2);
        assert!(game.movable_tokens().is_empty());
        assert_eq!(game.apply_move(Color::Red, 0), Err(Rejection::IllegalMove(Color::Red, 0)));
    }

    #[test]
    fn test_winner_freezes_match() {
        let mut game = GameState::new(&[Color::Red, Color::Green]);
        for id in 0..3 {
            game.place_token(Color::Red, id, Position::Finished);
        }
        game.place_token(Color::Red, 3, Position::Lane(Color::Red, 4));
        let mut game = rolled(game, 2);

        let outcome = game.apply_move(Color::Red, 3).unwrap();
        assert_eq!(outcome.winner, Some(Color::Red));
        assert_eq!(game.winner(), Some(Color::Red));
        assert!(game.is_over());
        assert_eq!(game.ensure_can_roll(Color::Red), Err(Rejection::GameOver));
        assert_eq!(game.apply_roll(Color::Green, 3).unwrap_err(), Rejection::GameOver);
    }

    #[test]
    fn test_three_sixes_restriction() {
        let mut game = four_player();
        game.place_token(Color::Red, 0, Position::Main(2));
        for _ in 0..2 {
            game.apply_roll(Color::Red, 6).unwrap();
            game.apply_move(Color::Red, 0).unwrap();
        }
        assert_eq!(game.consecutive_sixes(), 2);
        assert_eq!(game.apply_roll(Color::Red, 6), Err(Rejection::IllegalDie(6)));
        game.apply_roll(Color::Red, 5).unwrap();
        assert_eq!(game.consecutive_sixes(), 0);
    }

    #[test]
    fn test_wrong_turn_and_phase() {
        let mut game = four_player();
        assert_eq!(game.apply_roll(Color::Green, 3), Err(Rejection::WrongTurn(Color::Green)));
        assert_eq!(game.apply_move(Color::Red, 0), Err(Rejection::WrongPhase(TurnState::Rolling)));
        game.apply_roll(Color::Red, 3).unwrap();
        assert_eq!(game.apply_roll(Color::Red, 3), Err(Rejection::WrongPhase(TurnState::Moving)));
        assert_eq!(game.apply_roll(Color::Red, 0).unwrap_err(), Rejection::WrongPhase(TurnState::Moving));
    }

    #[test]
    fn test_blockade_is_allowed() {
        let mut game = four_player();
        game.place_token(Color::Red, 0, Position::Main(20));
        game.place_token(Color::Red, 1, Position::Main(17));
        let mut game = rolled(game, 3);
        let outcome = game.apply_move(Color::Red, 1).unwrap();
        assert!(!outcome.capture_occurred());
        assert_eq!(game.token(Color::Red, 0).unwrap().position, Position::Main(20));
        assert_eq!(game.token(Color::Red, 1).unwrap().position, Position::Main(20));
    }

    #[test]
    fn test_turn_order_wraps() {
        let mut game = GameState::new(&[Color::Green, Color::Blue]);
        assert_eq!(game.current_color(), Some(Color::Green));
        game.advance_turn();
        assert_eq!(game.current_color(), Some(Color::Blue));
        game.advance_turn();
        assert_eq!(game.current_color(), Some(Color::Green));
    }

    #[test]
    fn test_remove_current_player() {
        let mut game = four_player();
        game.advance_turn();
        game.apply_roll(Color::Green, 4).unwrap();

        game.remove_color(Color::Green).unwrap();
        assert_eq!(game.current_color(), Some(Color::Yellow));
        assert_eq!(game.turn_state(), TurnState::Rolling);
        assert!(game.tokens(Color::Green).is_none());
    }

    #[test]
    fn test_remove_last_in_order_wraps() {
        let mut game = four_player();
        for _ in 0..3 {
            game.advance_turn();
        }
        game.remove_color(Color::Blue).unwrap();
        assert_eq!(game.current_color(), Some(Color::Red));
    }

    #[test]
    fn test_remove_earlier_player_keeps_current() {
        let mut game = four_player();
        game.advance_turn();
        game.advance_turn();
        game.remove_color(Color::Red).unwrap();
        assert_eq!(game.current_color(), Some(Color::Yellow));
    }

    #[test]
    fn test_last_player_standing_wins() {
        let mut game = GameState::new(&[Color::Red, Color::Yellow]);
        game.remove_color(Color::Red).unwrap();
        assert_eq!(game.winner(), Some(Color::Yellow));
        assert!(game.is_over());
        assert_eq!(game.remove_color(Color::Yellow), Err(Rejection::GameOver));
    }

    #[test]
    fn test_remove_unknown_color() {
        let mut game = GameState::new(&[Color::Red, Color::Yellow]);
        assert_eq!(game.remove_color(Color::Blue), Err(Rejection::UnknownColor(Color::Blue)));
    }
}
