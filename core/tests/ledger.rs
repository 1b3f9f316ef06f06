//! Bet placement: validation, atomic debit and stake aggregation.

use chrono::{TimeZone, Utc};
use spin_core::{
    engine::GameEngine,
    error::GameError,
    types::{Choice, Role},
};

fn build_engine() -> GameEngine {
    let mut engine = GameEngine::build_test().expect("test engine");
    // 12:00 IST: round 481 of 960.
    engine.freeze_time(Utc.with_ymd_and_hms(2026, 3, 10, 6, 30, 0).unwrap());
    engine
}

fn fund(engine: &GameEngine, user_id: &str, balance: i64) {
    engine
        .register_user(user_id, &format!("{user_id}@example.com"), Role::User, balance)
        .expect("register user");
}

fn balance(engine: &GameEngine, user_id: &str) -> i64 {
    engine.user(user_id).expect("read user").expect("user exists").balance
}

#[test]
fn bet_debits_balance_and_records_wager() {
    let engine = build_engine();
    fund(&engine, "alice", 500);

    let bet = engine.place_bet("alice", 5, Choice::Sun, 120).expect("bet placed");

    assert_eq!(bet.round, 5);
    assert_eq!(bet.choice, Choice::Sun);
    assert_eq!(bet.amount, 120);
    assert!(!bet.win);
    assert_eq!(bet.payout, 0);
    assert_eq!(bet.session_id, "2026-03-10");
    assert_eq!(balance(&engine, "alice"), 380);

    let stored = engine.bets_for_round(5).expect("bets");
    assert_eq!(stored, vec![bet]);
}

#[test]
fn round_outside_day_is_rejected_without_debit() {
    let engine = build_engine();
    fund(&engine, "alice", 500);

    for round in [0, 961] {
        let err = engine.place_bet("alice", round, Choice::Kite, 10).unwrap_err();
        assert!(
            matches!(err, GameError::InvalidRound { max: 960, .. }),
            "round {round} should be rejected, got {err:?}"
        );
        assert!(err.is_validation());
    }
    assert_eq!(balance(&engine, "alice"), 500);
}

#[test]
fn non_positive_amount_is_rejected_without_debit() {
    let engine = build_engine();
    fund(&engine, "alice", 500);

    for amount in [0, -50] {
        let err = engine.place_bet("alice", 5, Choice::Kite, amount).unwrap_err();
        assert!(matches!(err, GameError::InvalidAmount { .. }), "got {err:?}");
    }
    assert_eq!(balance(&engine, "alice"), 500);
    assert!(engine.bets_for_round(5).expect("bets").is_empty());
}

#[test]
fn unknown_choice_string_is_a_validation_error() {
    let err = "dragon".parse::<Choice>().unwrap_err();
    assert!(matches!(err, GameError::InvalidChoice { .. }));
    assert!(err.is_validation());
}

#[test]
fn insufficient_funds_leaves_balance_and_ledger_untouched() {
    let engine = build_engine();
    fund(&engine, "bob", 50);

    let err = engine.place_bet("bob", 5, Choice::Rose, 51).unwrap_err();
    assert!(matches!(err, GameError::InsufficientFunds { requested: 51, .. }), "got {err:?}");
    assert!(err.is_resource());

    assert_eq!(balance(&engine, "bob"), 50);
    assert!(engine.bets_for_round(5).expect("bets").is_empty());
}

#[test]
fn exact_balance_can_be_staked() {
    let engine = build_engine();
    fund(&engine, "bob", 50);

    engine.place_bet("bob", 5, Choice::Rose, 50).expect("whole balance staked");
    assert_eq!(balance(&engine, "bob"), 0);

    let err = engine.place_bet("bob", 5, Choice::Rose, 1).unwrap_err();
    assert!(matches!(err, GameError::InsufficientFunds { .. }));
}

#[test]
fn unknown_user_cannot_bet() {
    let engine = build_engine();
    let err = engine.place_bet("ghost", 5, Choice::Cow, 10).unwrap_err();
    assert!(matches!(err, GameError::UserNotFound { .. }), "got {err:?}");
    assert!(engine.bets_for_round(5).expect("bets").is_empty());
}

#[test]
fn totals_sum_per_choice_and_per_user() {
    let engine = build_engine();
    fund(&engine, "alice", 1_000);
    fund(&engine, "bob", 1_000);

    engine.place_bet("alice", 12, Choice::Umbrella, 100).unwrap();
    engine.place_bet("alice", 12, Choice::Umbrella, 25).unwrap();
    engine.place_bet("bob", 12, Choice::Umbrella, 40).unwrap();
    engine.place_bet("bob", 12, Choice::Pigeon, 60).unwrap();
    engine.place_bet("bob", 13, Choice::Pigeon, 999).unwrap();

    let state = engine.round_state(Some(12), Some("alice")).expect("round state");
    assert_eq!(state.round, 12);
    assert_eq!(state.totals.len(), 2, "unbacked choices are absent");
    assert_eq!(state.totals[&Choice::Umbrella], 165);
    assert_eq!(state.totals[&Choice::Pigeon], 60);

    let alice = state.user_totals.expect("user totals requested");
    assert_eq!(alice.len(), 1);
    assert_eq!(alice[&Choice::Umbrella], 125);
    assert_eq!(state.winner_choice, None);
}

#[test]
fn round_with_no_bets_has_empty_totals() {
    let engine = build_engine();
    let state = engine.round_state(Some(77), None).expect("round state");
    assert!(state.totals.is_empty());
    assert!(state.user_totals.is_none());
}

#[test]
fn round_state_defaults_to_current_round() {
    let engine = build_engine();
    let state = engine.round_state(None, None).expect("round state");
    assert_eq!(state.round, 481);
}

#[test]
fn admin_adjustment_never_goes_negative() {
    let engine = build_engine();
    fund(&engine, "carol", 100);

    assert_eq!(engine.adjust_balance("carol", 250).expect("top up"), 350);
    assert_eq!(engine.adjust_balance("carol", -350).expect("drain"), 0);

    let err = engine.adjust_balance("carol", -1).unwrap_err();
    assert!(matches!(err, GameError::InsufficientFunds { requested: 1, .. }));
    assert_eq!(balance(&engine, "carol"), 0);

    let err = engine.adjust_balance("nobody", 10).unwrap_err();
    assert!(matches!(err, GameError::UserNotFound { .. }));
}

#[test]
fn bets_on_a_paid_round_are_refused() {
    let mut engine = build_engine();
    fund(&engine, "alice", 1_000);
    engine.set_manual_winner(5, Choice::Sun).unwrap();
    engine.distribute_payouts(5).expect("settle");

    let err = engine.place_bet("alice", 5, Choice::Sun, 100).unwrap_err();
    assert!(matches!(err, GameError::RoundClosed { round: 5 }), "got {err:?}");
    assert!(err.is_validation());
    assert_eq!(balance(&engine, "alice"), 1_000, "no debit for a closed round");
    assert!(engine.bets_for_round(5).unwrap().is_empty());

    // A locked but unpaid round still takes bets.
    engine.set_manual_winner(6, Choice::Sun).unwrap();
    engine.place_bet("alice", 6, Choice::Sun, 100).expect("unpaid round is open");
}

#[test]
fn most_negative_adjustment_is_refused_without_panicking() {
    let engine = build_engine();
    fund(&engine, "dave", 0);

    let err = engine.adjust_balance("dave", i64::MIN).unwrap_err();
    assert!(
        matches!(err, GameError::InsufficientFunds { requested: i64::MAX, .. }),
        "got {err:?}"
    );
    assert_eq!(balance(&engine, "dave"), 0);
}

#[test]
fn top_up_past_i64_max_is_refused() {
    let engine = build_engine();
    fund(&engine, "erin", 100);

    assert!(engine.adjust_balance("erin", i64::MAX).is_err());
    assert_eq!(balance(&engine, "erin"), 100);

    assert_eq!(engine.adjust_balance("erin", i64::MAX - 100).unwrap(), i64::MAX);
    assert_eq!(balance(&engine, "erin"), i64::MAX);
}
