//! Match-level scenarios driven through the engine facade

use std::sync::{Arc, Mutex};

use ludo_core::{
    Color, Dice, Engine, EngineConfig, GameState, ManualClock, Position, Seat, Snapshot, TimerKind,
    TurnState, TURN_ORDER,
};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn four_humans() -> Vec<Seat> {
    TURN_ORDER
        .iter()
        .map(|&c| Seat::human(format!("player-{}", c), c))
        .collect()
}

fn scripted_engine(dice: Vec<u8>) -> (Engine, ManualClock) {
    let clock = ManualClock::new(0);
    let engine = Engine::new(four_humans(), EngineConfig::default(), Box::new(clock.clone()))
        .expect("valid seats")
        .with_dice(Dice::scripted(dice));
    (engine, clock)
}

fn red_position(snap: &Snapshot, id: usize) -> Position {
    snap.tokens_by_color[&Color::Red][id].position
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn six_from_base_enters_at_start_and_keeps_turn() {
    let (mut engine, _) = scripted_engine(vec![6]);
    engine.roll_dice("player-red");
    engine.move_token("player-red", Color::Red, 0);

    let snap = engine.get_state();
    assert_eq!(red_position(&snap, 0), Position::Main(Color::Red.start_position()));
    assert_eq!(snap.current_color, Some(Color::Red));
    assert_eq!(snap.turn_state, TurnState::Rolling);
}

#[test]
fn plain_move_passes_turn() {
    // A non-six without capture or finish ends the turn
    let (mut engine, _) = scripted_engine(vec![6, 6, 3]);
    engine.roll_dice("player-red");
    engine.move_token("player-red", Color::Red, 0);
    engine.roll_dice("player-red");
    engine.move_token("player-red", Color::Red, 0);
    engine.roll_dice("player-red");
    let snap = engine.get_state();
    assert_eq!(red_position(&snap, 0), Position::Main(7));
    assert_eq!(snap.movable_tokens.len(), 1);

    engine.move_token("player-red", Color::Red, 0);
    let snap = engine.get_state();
    assert_eq!(red_position(&snap, 0), Position::Main(10));
    assert_eq!(snap.current_color, Some(Color::Green));
}

#[test]
fn capture_on_open_cell_grants_bonus() {
    let mut state = GameState::new(&TURN_ORDER);
    state.place_token(Color::Red, 0, Position::Main(26));
    state.place_token(Color::Blue, 1, Position::Main(30));
    state.apply_roll(Color::Red, 4).unwrap();

    let outcome = state.apply_move(Color::Red, 0).unwrap();
    assert_eq!(outcome.captured, vec![(Color::Blue, 1)]);
    assert_eq!(state.token(Color::Blue, 1).unwrap().position, Position::Base);
    assert_eq!(state.current_color(), Some(Color::Red));
    assert_eq!(state.turn_state(), TurnState::Rolling);
}

#[test]
fn finishing_last_lane_cell_sets_is_home() {
    let mut state = GameState::new(&TURN_ORDER);
    state.place_token(Color::Blue, 0, Position::Lane(Color::Blue, 5));
    for _ in 0..3 {
        state.advance_turn();
    }
    state.apply_roll(Color::Blue, 1).unwrap();
    state.apply_move(Color::Blue, 0).unwrap();

    let token = state.token(Color::Blue, 0).unwrap();
    assert!(token.is_home);
    assert_eq!(token.position, Position::Finished);
}

#[test]
fn third_roll_after_two_sixes_is_capped() {
    let (mut engine, _) = scripted_engine(vec![6, 6]);
    for _ in 0..2 {
        engine.roll_dice("player-red");
        engine.move_token("player-red", Color::Red, 0);
    }
    assert_eq!(engine.state().consecutive_sixes(), 2);
    assert_eq!(engine.get_state().current_color, Some(Color::Red));

    let mut engine = engine.with_dice(Dice::seeded(99));
    engine.roll_dice("player-red");
    let value = engine.get_state().dice_value.expect("roll accepted");
    assert!(value <= 5);
    assert_eq!(engine.state().consecutive_sixes(), 0);

    for seed in 0..50 {
        assert!(Dice::seeded(seed).roll(2) <= 5);
    }
}

#[test]
fn scripted_third_six_is_rolled_as_five() {
    let (mut engine, _) = scripted_engine(vec![6, 6, 6]);
    for _ in 0..2 {
        engine.roll_dice("player-red");
        engine.move_token("player-red", Color::Red, 0);
    }
    engine.roll_dice("player-red");

    let snap = engine.get_state();
    assert_eq!(snap.dice_value, Some(5));
    assert_eq!(snap.turn_state, TurnState::Moving);
}

#[test]
fn stale_auto_move_cannot_fire_after_turn_changed() {
    let (mut engine, clock) = scripted_engine(vec![6, 1]);
    engine.roll_dice("player-red");
    engine.move_token("player-red", Color::Red, 3);
    engine.roll_dice("player-red");
    let armed = engine.pending_timer().expect("auto move armed");
    assert_eq!(armed.kind, TimerKind::AutoMove(3));

    engine.move_token("player-red", Color::Red, 3);
    assert_eq!(engine.get_state().current_color, Some(Color::Green));

    clock.advance(5_000);
    assert_eq!(engine.poll(), 0);
    let snap = engine.get_state();
    assert_eq!(red_position(&snap, 3), Position::Main(2));
    assert_eq!(snap.current_color, Some(Color::Green));
    assert_eq!(snap.turn_state, TurnState::Rolling);
}

#[test]
fn one_snapshot_per_committed_transition() {
    let (mut engine, clock) = scripted_engine(vec![2]);
    let seen: Arc<Mutex<Vec<Snapshot>>> = Arc::default();
    let sink = Arc::clone(&seen);
    engine.on_state_change(move |s| sink.lock().unwrap().push(s.clone()));

    engine.roll_dice("player-red");
    engine.roll_dice("player-red");
    clock.advance(1_500);
    engine.poll();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].turn_state, TurnState::Moving);
    assert_eq!(seen[0].dice_value, Some(2));
    assert_eq!(seen[1].current_color, Some(Color::Green));
    assert_eq!(seen[1].dice_value, None);
}

#[test]
fn all_ai_match_runs_to_a_winner() {
    let seats: Vec<Seat> = TURN_ORDER.iter().map(|&c| Seat::ai(c)).collect();
    let clock = ManualClock::new(0);
    let config = EngineConfig::default().with_seed(2024);
    let mut engine = Engine::new(seats, config, Box::new(clock.clone())).unwrap();

    let mut steps = 0;
    while !engine.is_over() && steps < 20_000 {
        let Some(at) = engine.next_fire_at() else { break };
        clock.set(at);
        engine.poll();
        steps += 1;
    }

    assert!(engine.is_over());
    let snap = engine.get_state();
    let winner = snap.winner.expect("someone wins");
    assert!(snap.tokens_by_color[&winner].iter().all(|t| t.is_home));
    assert_eq!(engine.next_fire_at(), None);
}

#[test]
fn removing_players_down_to_one_ends_match() {
    let (mut engine, _) = scripted_engine(vec![]);
    engine.remove_player(Color::Green);
    engine.remove_player(Color::Red);
    assert_eq!(engine.get_state().current_color, Some(Color::Yellow));
    assert!(!engine.is_over());

    engine.remove_player_by_id("player-blue");
    assert!(engine.is_over());
    assert_eq!(engine.get_state().winner, Some(Color::Yellow));

    engine.roll_dice("player-yellow");
    assert_eq!(engine.get_state().dice_value, None);
}
