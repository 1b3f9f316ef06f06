//! Recent-wins list: bounded, newest first, no consecutive duplicates.

use chrono::{TimeZone, Utc};
use spin_core::{
    engine::GameEngine,
    history::HistoryTracker,
    settlement::SettleOutcome,
    store::GameStore,
    types::Choice,
};

fn store() -> GameStore {
    let store = GameStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

#[test]
fn list_is_capped_and_newest_first() {
    let store = store();
    let tracker = HistoryTracker::new(&store, 10);
    let now = Utc::now();

    for round in 1..=15u32 {
        let choice = Choice::ALL[round as usize % Choice::ALL.len()];
        assert!(tracker.record(round, choice, now).unwrap());
    }

    let wins = tracker.read().unwrap();
    assert_eq!(wins.len(), 10);
    let rounds: Vec<u32> = wins.iter().map(|w| w.round).collect();
    assert_eq!(rounds, (6..=15).rev().collect::<Vec<_>>());
}

#[test]
fn repeating_the_head_is_a_no_op() {
    let store = store();
    let tracker = HistoryTracker::new(&store, 10);
    let now = Utc::now();

    assert!(tracker.record(3, Choice::Sun, now).unwrap());
    assert!(!tracker.record(3, Choice::Sun, now).unwrap());
    assert!(!tracker.record(3, Choice::Sun, now).unwrap());

    assert_eq!(tracker.read().unwrap().len(), 1);
}

#[test]
fn same_choice_in_different_rounds_is_kept() {
    let store = store();
    let tracker = HistoryTracker::new(&store, 10);
    let now = Utc::now();

    tracker.record(3, Choice::Sun, now).unwrap();
    tracker.record(4, Choice::Sun, now).unwrap();

    let wins = tracker.read().unwrap();
    assert_eq!(wins.len(), 2);
    assert_eq!((wins[0].round, wins[0].choice), (4, Choice::Sun));
}

#[test]
fn many_settlements_never_exceed_the_limit() {
    let mut engine = GameEngine::build_test().expect("test engine");
    engine.freeze_time(Utc.with_ymd_and_hms(2026, 3, 10, 6, 30, 0).unwrap());

    for round in 100..125 {
        assert!(matches!(engine.distribute_payouts(round).unwrap(), SettleOutcome::Settled(_)));
        // A retry must not duplicate the head.
        assert_eq!(engine.distribute_payouts(round).unwrap(), SettleOutcome::AlreadySettled);
    }

    let wins = engine.last_wins().unwrap();
    assert_eq!(wins.len(), 10);
    assert_eq!(wins[0].round, 124);
    for pair in wins.windows(2) {
        assert_ne!(
            (pair[0].round, pair[0].choice),
            (pair[1].round, pair[1].choice),
            "adjacent duplicate in history"
        );
    }
}

#[test]
fn empty_history_reads_empty() {
    let engine = GameEngine::build_test().expect("test engine");
    assert!(engine.last_wins().unwrap().is_empty());
}
