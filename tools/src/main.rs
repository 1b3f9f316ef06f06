//! game-runner: headless host for the Spin Rounds game core.
//!
//! Usage:
//!   game-runner --db game.db --data-dir ./data            # print a status summary
//!   game-runner --db game.db --ipc-mode --seed 42         # JSON-lines IPC on stdin/stdout
//!
//! IPC: one JSON command per input line, e.g.
//!   {"type":"place_bet","user_id":"u1","round":5,"choice":"sun","amount":100}
//! Each command produces one `{"ok":..}` or `{"error":..}` line, followed by
//! one `{"event":..}` line per event the command emitted.

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Value};
use spin_core::{
    config::GameConfig,
    engine::GameEngine,
    error::{GameError, GameResult},
    event::GameEvent,
    reports::BetScope,
    resolver::{LockOutcome, OverrideOutcome},
    settlement::SettleOutcome,
    store::GameStore,
    types::{Amount, Choice, Role, Round},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    RegisterUser {
        user_id: String,
        email:   String,
        #[serde(default)]
        admin:   bool,
        #[serde(default)]
        balance: Amount,
    },
    PlaceBet {
        user_id: String,
        round:   Value,
        choice:  String,
        amount:  Amount,
    },
    RoundState {
        #[serde(default)]
        round:   Option<Value>,
        #[serde(default)]
        user_id: Option<String>,
    },
    LiveState {
        #[serde(default)]
        user_id: Option<String>,
    },
    SetManualWinner {
        round:  Value,
        choice: String,
    },
    LockWinner {
        round: Value,
    },
    AnnounceWinner {
        round: Value,
    },
    DistributePayouts {
        round: Value,
    },
    LastWins,
    BetHistory {
        user_id: String,
        #[serde(default)]
        scope:   Option<BetScope>,
    },
    DaySummary {
        #[serde(default)]
        session: Option<String>,
    },
    RoundsSummary {
        #[serde(default)]
        session: Option<String>,
    },
    AdjustBalance {
        user_id: String,
        delta:   Amount,
    },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    let mut config = match GameConfig::load(data_dir) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("{e}; using built-in defaults");
            GameConfig::default()
        }
    };
    if let Some(seed) = args
        .windows(2)
        .find(|w| w[0] == "--seed")
        .and_then(|w| w[1].parse().ok())
    {
        config.rng_seed = Some(seed);
    }

    // For :memory: use SQLite shared-memory URI so the engine and its
    // event-log connection share the same in-memory database.
    let db_effective: String = if db == ":memory:" {
        format!("file:spinrun_{}?mode=memory&cache=shared", Utc::now().timestamp())
    } else {
        db.to_string()
    };

    if ipc_mode {
        let store = GameStore::open(&db_effective, config.busy_timeout_ms)?;
        store.migrate()?;
        let (tx, rx) = mpsc::channel();
        let mut engine = GameEngine::new(config, store, Box::new(tx))?;
        run_ipc_loop(&mut engine, &rx)?;
    } else {
        println!("Spin Rounds game-runner");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
        let engine = GameEngine::open(&db_effective, config)?;
        print_summary(&engine)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut GameEngine, events: &Receiver<GameEvent>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = json!({ "error": { "kind": "parse", "message": e.to_string() } });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };
        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let response = match handle_command(engine, cmd) {
            Ok(payload) => json!({ "ok": payload }),
            Err(e) => json!({ "error": { "kind": error_kind(&e), "message": e.to_string() } }),
        };
        writeln!(stdout, "{}", response)?;
        for event in events.try_iter() {
            writeln!(stdout, "{}", json!({ "event": event }))?;
        }
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(engine: &mut GameEngine, cmd: IpcCommand) -> GameResult<Value> {
    let value = match cmd {
        IpcCommand::RegisterUser { user_id, email, admin, balance } => {
            let role = if admin { Role::Admin } else { Role::User };
            engine.register_user(&user_id, &email, role, balance)?;
            json!({ "userId": user_id, "balance": balance })
        }
        IpcCommand::PlaceBet { user_id, round, choice, amount } => {
            let round = parse_round(engine, &round)?;
            let choice: Choice = choice.parse()?;
            let bet = engine.place_bet(&user_id, round, choice, amount)?;
            json!({ "message": "Bet placed", "bet": bet })
        }
        IpcCommand::RoundState { round, user_id } => {
            let round = round.map(|r| parse_round(engine, &r)).transpose()?;
            serde_json::to_value(engine.round_state(round, user_id.as_deref())?)?
        }
        IpcCommand::LiveState { user_id } => {
            serde_json::to_value(engine.live_state(user_id.as_deref())?)?
        }
        IpcCommand::SetManualWinner { round, choice } => {
            let round = parse_round(engine, &round)?;
            let choice: Choice = choice.parse()?;
            match engine.set_manual_winner(round, choice)? {
                OverrideOutcome::Recorded => {
                    json!({ "message": "Winner recorded (awaiting payout)", "choice": choice })
                }
                OverrideOutcome::RoundClosed => {
                    json!({ "roundClosed": true, "message": "Round already paid; winner unchanged" })
                }
            }
        }
        IpcCommand::LockWinner { round } => {
            let round = parse_round(engine, &round)?;
            match engine.lock_winner(round)? {
                LockOutcome::Locked(choice) => json!({ "locked": true, "choice": choice }),
                LockOutcome::AlreadyLocked(choice) => json!({ "alreadyLocked": true, "choice": choice }),
            }
        }
        IpcCommand::AnnounceWinner { round } => {
            let round = parse_round(engine, &round)?;
            let choice = engine.announce_winner(round)?;
            json!({ "message": "Winner announced", "round": round, "choice": choice })
        }
        IpcCommand::DistributePayouts { round } => {
            let round = parse_round(engine, &round)?;
            match engine.distribute_payouts(round)? {
                SettleOutcome::Settled(s) => json!({
                    "message": "Payouts distributed",
                    "round": s.round,
                    "choice": s.choice,
                    "settlement": s,
                }),
                SettleOutcome::AlreadySettled => json!({
                    "alreadySettled": true,
                    "message": "Payout already done for this round",
                }),
            }
        }
        IpcCommand::LastWins => json!({ "wins": engine.last_wins()? }),
        IpcCommand::BetHistory { user_id, scope } => {
            let history = match scope {
                Some(scope) => engine.bet_history(&user_id, &scope)?,
                None => engine.bet_history_today(&user_id)?,
            };
            json!({ "history": history })
        }
        IpcCommand::DaySummary { session } => {
            serde_json::to_value(engine.day_summary(session.as_deref())?)?
        }
        IpcCommand::RoundsSummary { session } => {
            json!({ "rounds": engine.rounds_summary(session.as_deref())? })
        }
        IpcCommand::AdjustBalance { user_id, delta } => {
            let balance = engine.adjust_balance(&user_id, delta)?;
            json!({ "message": "Balance updated", "balance": balance })
        }
        IpcCommand::Quit => Value::Null,
    };
    Ok(value)
}

/// Rounds arrive as arbitrary JSON; only integers in range are accepted.
fn parse_round(engine: &GameEngine, raw: &Value) -> GameResult<Round> {
    match raw.as_i64() {
        Some(r) => engine.clock.validate(r),
        None => Err(GameError::InvalidRound {
            round: raw.as_f64().map(|f| f as i64).unwrap_or(0),
            max: engine.clock.rounds_per_day(),
        }),
    }
}

fn error_kind(e: &GameError) -> &'static str {
    if e.is_validation() {
        "validation"
    } else if e.is_resource() {
        "resource"
    } else {
        "system"
    }
}

fn print_summary(engine: &GameEngine) -> Result<()> {
    let live = engine.live_state(None)?;
    let today = engine.day_summary(None)?;
    let rounds = engine.rounds_summary(None)?;
    let wins = engine.last_wins()?;
    let held = engine.store().total_balance()?;

    println!("=== CURRENT ROUND ===");
    println!("  round:          {} / {}", live.round, engine.clock.rounds_per_day());
    println!("  closes in:      {}s", live.timer);
    println!("  winner locked:  {}", live.winner_choice.map(|c| c.to_string()).unwrap_or_else(|| "-".into()));
    for (choice, staked) in &live.totals {
        println!("    {choice:<12} {staked}");
    }

    println!();
    println!("=== TODAY ({}) ===", today.session_id);
    println!("  staked:         {}", today.total_bets_amount);
    println!("  paid out:       {}", today.total_payout);
    println!("  house profit:   {}", today.profit);
    println!("  rounds played:  {}", rounds.len());
    println!("  player funds:   {held}");

    println!();
    println!("=== LAST WINS ===");
    if wins.is_empty() {
        println!("  (No rounds settled yet)");
    } else {
        for w in &wins {
            println!("  round {:>3} | {}", w.round, w.choice);
        }
    }
    Ok(())
}
