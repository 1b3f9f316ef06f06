//! Several engines on one database file, racing each other.
//! Each thread opens its own connection, as separate server workers would.

use chrono::{TimeZone, Utc};
use spin_core::{
    config::GameConfig,
    engine::GameEngine,
    error::GameError,
    settlement::SettleOutcome,
    types::{Choice, Role},
};
use std::sync::{Arc, Barrier};
use std::thread;

const WORKERS: usize = 8;

fn setup(dir: &tempfile::TempDir) -> String {
    let _ = env_logger::builder().is_test(true).try_init();
    let path = dir.path().join("game.db").to_string_lossy().into_owned();
    let engine = GameEngine::open(&path, GameConfig::default_test()).expect("open db");
    engine
        .register_user("alice", "alice@example.com", Role::User, 100)
        .expect("register");
    engine
        .register_user("bob", "bob@example.com", Role::User, 1_000)
        .expect("register");
    path
}

fn worker(path: &str, seed: u64) -> GameEngine {
    let config = GameConfig { rng_seed: Some(seed), ..GameConfig::default_test() };
    let mut engine = GameEngine::open(path, config).expect("open db");
    engine.freeze_time(Utc.with_ymd_and_hms(2026, 3, 10, 6, 30, 0).unwrap());
    engine
}

/// Run `f` on WORKERS threads released together; collect results in spawn order.
fn race<T, F>(path: &str, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(&mut GameEngine) -> T + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(WORKERS));
    let f = Arc::new(f);
    let handles: Vec<_> = (0..WORKERS)
        .map(|i| {
            let path = path.to_string();
            let barrier = Arc::clone(&barrier);
            let f = Arc::clone(&f);
            thread::spawn(move || {
                let mut engine = worker(&path, i as u64 + 1);
                barrier.wait();
                f(&mut engine)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().expect("worker panicked")).collect()
}

#[test]
fn concurrent_bets_never_overdraw() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup(&dir);

    let results = race(&path, |engine| engine.place_bet("alice", 5, Choice::Sun, 100));

    let placed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(placed, 1, "exactly one full-balance bet may succeed");
    for r in results.iter().filter(|r| r.is_err()) {
        assert!(
            matches!(r, Err(GameError::InsufficientFunds { .. })),
            "losers must see insufficient funds, got {r:?}"
        );
    }

    let engine = worker(&path, 0);
    assert_eq!(engine.user("alice").unwrap().unwrap().balance, 0);
    assert_eq!(engine.bets_for_round(5).unwrap().len(), 1);
    assert_eq!(engine.store().total_balance().unwrap(), 1_000, "only bob's funds remain");
}

#[test]
fn concurrent_resolution_converges_on_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup(&dir);
    {
        let engine = worker(&path, 0);
        engine.place_bet("bob", 6, Choice::Sun, 10).unwrap();
        engine.place_bet("bob", 6, Choice::Kite, 10).unwrap();
        engine.place_bet("bob", 6, Choice::Cow, 10).unwrap();
    }

    let choices = race(&path, |engine| engine.lock_winner(6).expect("lock").choice());

    let persisted = worker(&path, 0).winner(6).unwrap().expect("winner row").choice;
    assert!(
        choices.iter().all(|c| *c == persisted),
        "every caller must see the persisted winner {persisted}, got {choices:?}"
    );
}

#[test]
fn concurrent_settlement_pays_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup(&dir);
    {
        let engine = worker(&path, 0);
        engine.place_bet("bob", 7, Choice::Rose, 50).unwrap();
        engine.set_manual_winner(7, Choice::Rose).unwrap();
    }

    let outcomes = race(&path, |engine| engine.distribute_payouts(7).expect("settle"));

    let settled = outcomes
        .iter()
        .filter(|o| matches!(o, SettleOutcome::Settled(_)))
        .count();
    assert_eq!(settled, 1, "one caller settles, the rest see AlreadySettled");

    let engine = worker(&path, 0);
    assert_eq!(engine.user("bob").unwrap().unwrap().balance, 1_000 - 50 + 500);
    assert_eq!(engine.last_wins().unwrap().len(), 1);
}

#[test]
fn settlement_events_land_in_the_event_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup(&dir);
    let mut engine = worker(&path, 0);
    engine.place_bet("bob", 8, Choice::Pigeon, 10).unwrap();
    engine.set_manual_winner(8, Choice::Pigeon).unwrap();
    engine.distribute_payouts(8).unwrap();

    let kinds: Vec<String> = engine
        .store()
        .events_for_round(8)
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(kinds, vec!["bet-placed", "winner-announced", "payouts-distributed"]);
}
