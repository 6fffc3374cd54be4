//! Greedy heuristic AI: simulate each legal move, keep the best-scoring one

use crate::dice::Dice;
use crate::eval::{evaluate_state, Heuristics, MoveDetails};
use crate::game::{GameState, MoveOutcome, TurnState};

// ============================================================================
// HEURISTIC AI
// ============================================================================

/// One-ply heuristic player
#[derive(Clone, Debug, Default)]
pub struct HeuristicAI {
    pub heuristics: Heuristics,
}

impl HeuristicAI {
    pub fn new(heuristics: Heuristics) -> Self {
        Self { heuristics }
    }

    /// Score every movable token of the current player, in movable order
    pub fn scored_moves(&self, state: &GameState) -> Vec<(u8, f32)> {
        let Some(color) = state.current_color() else {
            return Vec::new();
        };
        if state.turn_state() != TurnState::Moving {
            return Vec::new();
        }

        state
            .movable_tokens()
            .iter()
            .filter_map(|mv| {
                let mut child = state.clone();
                let outcome = child.apply_move(mv.color, mv.id).ok()?;
                let details = MoveDetails {
                    capture_occurred: outcome.capture_occurred(),
                    token_left_yard: outcome.left_base(),
                };
                Some((mv.id, evaluate_state(&child, color, details, &self.heuristics)))
            })
            .collect()
    }

    /// Best token to move; ties keep the first candidate
    pub fn choose_move(&self, state: &GameState) -> Option<u8> {
        let mut best: Option<(u8, f32)> = None;

        for (id, score) in self.scored_moves(state) {
            tracing::debug!(token = id, score, "considering move");
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((id, score));
            }
        }

        best.map(|(id, _)| id)
    }

    /// Play every seat until someone wins or `max_rolls` is reached
    pub fn play_game(
        &self,
        initial: GameState,
        dice: &mut Dice,
        max_rolls: u32,
    ) -> (GameState, Vec<MoveOutcome>) {
        let mut state = initial;
        let mut history = Vec::new();
        let mut rolls = 0;

        while !state.is_over() && rolls < max_rolls {
            let Some(color) = state.current_color() else {
                break;
            };

            let value = dice.roll(state.consecutive_sixes());
            if let Err(reason) = state.apply_roll(color, value) {
                tracing::warn!(%color, value, %reason, "self-play roll refused");
                break;
            }
            rolls += 1;

            match self.choose_move(&state) {
                Some(id) => match state.apply_move(color, id) {
                    Ok(outcome) => history.push(outcome),
                    Err(reason) => {
                        tracing::warn!(%color, id, %reason, "self-play move refused");
                        break;
                    }
                },
                None => state.advance_turn(),
            }
        }

        (state, history)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Color, Position, TURN_ORDER};

    #[test]
    fn test_no_move_when_rolling() {
        let state = GameState::new(&TURN_ORDER);
        let ai = HeuristicAI::default();
        assert_eq!(ai.choose_move(&state), None);
    }

    #[test]
    fn test_ai_prefers_capture() {
        let mut state = GameState::new(&[Color::Red, Color::Green]);
        state.place_token(Color::Red, 0, Position::Main(28));
        state.place_token(Color::Red, 1, Position::Main(3));
        state.place_token(Color::Green, 0, Position::Main(31));
        state.apply_roll(Color::Red, 3).unwrap();

        let ai = HeuristicAI::default();
        assert_eq!(ai.choose_move(&state), Some(0));
    }

    #[test]
    fn test_ai_finishes_when_it_wins() {
        let mut state = GameState::new(&[Color::Red, Color::Green]);
        for id in 0..3 {
            state.place_token(Color::Red, id, Position::Finished);
        }
        state.place_token(Color::Red, 3, Position::Lane(Color::Red, 2));
        state.apply_roll(Color::Red, 4).unwrap();

        let ai = HeuristicAI::default();
        assert_eq!(ai.choose_move(&state), Some(3));
    }

    #[test]
    fn test_ties_keep_first() {
        let mut state = GameState::new(&[Color::Red, Color::Green]);
        state.apply_roll(Color::Red, 6).unwrap();

        let ai = HeuristicAI::default();
        let scores = ai.scored_moves(&state);
        assert_eq!(scores.len(), 4);
        assert!(scores.windows(2).all(|w| w[0].1 == w[1].1));
        assert_eq!(ai.choose_move(&state), Some(0));
    }

    #[test]
    fn test_scoring_does_not_touch_live_state() {
        let mut state = GameState::new(&[Color::Red, Color::Green]);
        state.place_token(Color::Red, 0, Position::Main(10));
        state.apply_roll(Color::Red, 6).unwrap();
        let before = state.clone();

        HeuristicAI::default().scored_moves(&state);
        assert_eq!(state.tokens_by_color(), before.tokens_by_color());
        assert_eq!(state.turn_state(), TurnState::Moving);
    }

    #[test]
    fn test_play_game() {
        let ai = HeuristicAI::default();
        let mut dice = Dice::seeded(3);
        let (final_state, history) = ai.play_game(GameState::new(&TURN_ORDER), &mut dice, 5000);

        assert!(!history.is_empty());
        assert!(final_state.is_over());
        assert!(final_state.winner().is_some());
    }
}
