//! The game engine: the one surface the outer (HTTP/auth/IPC) layer calls.
//!
//! An engine owns one store connection and is not shared between threads.
//! Concurrent callers each open their own engine on the same database
//! file; correctness between them comes from the store's conditional
//! updates, never from in-process locks.
//!
//! RULES:
//!   - Every operation reads "now" once, from the engine's TimeSource.
//!   - Events are published only after the state they describe is committed.
//!   - State/idempotency outcomes (already locked, already settled, round
//!     closed) come back as enum variants, not errors.

use crate::{
    broadcast::{publish_best_effort, EventLogSink, EventSink, NullSink},
    clock::{RoundClock, TimeSource},
    config::GameConfig,
    error::{GameError, GameResult},
    event::GameEvent,
    history::{HistoryTracker, WinEntry},
    ledger::{Bet, BetLedger, StakeTotals},
    reports::{self, BetScope, DaySummary, RoundBets, RoundSummary},
    resolver::{LockOutcome, OverrideOutcome, Winner, WinnerResolver},
    rng::GameRng,
    settlement::{SettleOutcome, SettlementEngine},
    store::{GameStore, UserRecord},
    types::{Amount, Choice, Role, Round},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    pub round:         Round,
    pub totals:        StakeTotals,
    pub user_totals:   Option<StakeTotals>,
    pub winner_choice: Option<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveState {
    pub round:         Round,
    /// Seconds left in the current round.
    pub timer:         u32,
    pub totals:        StakeTotals,
    pub user_totals:   StakeTotals,
    pub winner_choice: Option<Choice>,
    pub balance:       Option<Amount>,
}

pub struct GameEngine {
    pub config: GameConfig,
    pub clock:  RoundClock,
    pub time:   TimeSource,
    rng:        GameRng,
    store:      GameStore,
    sink:       Box<dyn EventSink>,
}

impl GameEngine {
    pub fn new(config: GameConfig, store: GameStore, sink: Box<dyn EventSink>) -> GameResult<Self> {
        config.validate()?;
        let clock = RoundClock::from_config(&config)?;
        let rng = GameRng::from_seed_option(config.rng_seed);
        log::debug!(
            "engine ready: {} rounds/day of {}s, rng seed {:#x}",
            clock.rounds_per_day(),
            clock.slot_seconds(),
            rng.seed()
        );
        Ok(Self {
            config,
            clock,
            time: TimeSource::System,
            rng,
            store,
            sink,
        })
    }

    /// Open (or create) the database at `path`, migrate it, and log events
    /// to its event_log table on a second connection.
    pub fn open(path: &str, config: GameConfig) -> GameResult<Self> {
        let store = GameStore::open(path, config.busy_timeout_ms)?;
        store.migrate()?;
        let sink = EventLogSink::new(store.reopen()?);
        Self::new(config, store, Box::new(sink))
    }

    /// In-memory store, test config, events discarded.
    pub fn build_test() -> GameResult<Self> {
        let store = GameStore::in_memory()?;
        store.migrate()?;
        Self::new(GameConfig::default_test(), store, Box::new(NullSink))
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn freeze_time(&mut self, at: DateTime<Utc>) {
        self.time = TimeSource::Frozen(at);
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    pub fn current_round(&self) -> Round {
        self.clock.round_for(self.now())
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    fn ledger(&self) -> BetLedger<'_> {
        BetLedger::new(&self.store, &self.clock)
    }

    fn resolver(&self) -> WinnerResolver<'_> {
        WinnerResolver::new(&self.store, &self.clock)
    }

    fn history(&self) -> HistoryTracker<'_> {
        HistoryTracker::new(&self.store, self.config.history_limit)
    }

    // ── Users ──────────────────────────────────────────────────

    /// Minimal provisioning hook for the external auth layer.
    pub fn register_user(&self, user_id: &str, email: &str, role: Role, balance: Amount) -> GameResult<()> {
        if balance < 0 {
            return Err(GameError::InvalidAmount { amount: balance });
        }
        self.store.insert_user(user_id, email, role, balance, self.now())
    }

    pub fn user(&self, user_id: &str) -> GameResult<Option<UserRecord>> {
        self.store.user(user_id)
    }

    /// Admin top-up or deduction. Never takes a balance below zero or past i64::MAX.
    pub fn adjust_balance(&self, user_id: &str, delta: Amount) -> GameResult<Amount> {
        self.store.in_transaction(|store| match store.adjust_balance(user_id, delta)? {
            Some(balance) => Ok(balance),
            None if !store.user_exists(user_id)? => {
                Err(GameError::UserNotFound { user_id: user_id.to_string() })
            }
            None if delta >= 0 => {
                Err(anyhow::anyhow!("balance of {user_id} cannot absorb a top-up of {delta}").into())
            }
            None => Err(GameError::InsufficientFunds {
                user_id: user_id.to_string(),
                requested: delta.saturating_neg(),
            }),
        })
    }

    // ── Betting ────────────────────────────────────────────────

    pub fn place_bet(&self, user_id: &str, round: Round, choice: Choice, amount: Amount) -> GameResult<Bet> {
        let bet = self.ledger().place_bet(user_id, round, choice, amount, self.now())?;
        publish_best_effort(
            self.sink.as_ref(),
            GameEvent::BetPlaced { choice, amount, round: bet.round },
        );
        Ok(bet)
    }

    /// Totals (and optionally one user's totals) plus the locked winner, if any.
    /// Defaults to the round in progress.
    pub fn round_state(&self, round: Option<Round>, user_id: Option<&str>) -> GameResult<RoundState> {
        let round = match round {
            Some(r) => self.clock.validate(i64::from(r))?,
            None => self.current_round(),
        };
        let ledger = self.ledger();
        Ok(RoundState {
            round,
            totals: ledger.totals(round)?,
            user_totals: user_id.map(|u| ledger.user_totals(round, u)).transpose()?,
            winner_choice: self.store.winner(round)?.map(|w| w.choice),
        })
    }

    /// Everything a client polls for while a round is open.
    pub fn live_state(&self, user_id: Option<&str>) -> GameResult<LiveState> {
        let now = self.now();
        let round = self.clock.round_for(now);
        let ledger = self.ledger();
        let (user_totals, balance) = match user_id {
            Some(u) => (ledger.user_totals(round, u)?, self.store.user_balance(u)?),
            None => (StakeTotals::new(), None),
        };
        Ok(LiveState {
            round,
            timer: self.clock.seconds_remaining(now),
            totals: ledger.totals(round)?,
            user_totals,
            winner_choice: self.store.winner(round)?.map(|w| w.choice),
            balance,
        })
    }

    pub fn bets_for_round(&self, round: Round) -> GameResult<Vec<Bet>> {
        let round = self.clock.validate(i64::from(round))?;
        self.ledger().bets_for_round(round)
    }

    // ── Winner ─────────────────────────────────────────────────

    pub fn set_manual_winner(&self, round: Round, choice: Choice) -> GameResult<OverrideOutcome> {
        self.resolver().manual_override(round, choice, self.now())
    }

    pub fn lock_winner(&mut self, round: Round) -> GameResult<LockOutcome> {
        let now = self.now();
        WinnerResolver::new(&self.store, &self.clock).lock(round, &mut self.rng, now)
    }

    /// Resolve the winner and tell clients, without paying out.
    pub fn announce_winner(&mut self, round: Round) -> GameResult<Choice> {
        let choice = self.lock_winner(round)?.choice();
        publish_best_effort(self.sink.as_ref(), GameEvent::WinnerAnnounced { round, choice });
        Ok(choice)
    }

    pub fn winner(&self, round: Round) -> GameResult<Option<Winner>> {
        self.resolver().winner_for(round)
    }

    // ── Settlement ─────────────────────────────────────────────

    pub fn distribute_payouts(&mut self, round: Round) -> GameResult<SettleOutcome> {
        let now = self.now();
        SettlementEngine::new(
            &self.store,
            &self.clock,
            self.config.payout_multiplier,
            self.config.history_limit,
        )
        .settle(round, &mut self.rng, self.sink.as_ref(), now)
    }

    pub fn last_wins(&self) -> GameResult<Vec<WinEntry>> {
        self.history().read()
    }

    // ── Reports ────────────────────────────────────────────────

    pub fn bet_history(&self, user_id: &str, scope: &BetScope) -> GameResult<Vec<RoundBets>> {
        reports::bet_history(&self.store, user_id, scope)
    }

    /// Bet history for the current game day.
    pub fn bet_history_today(&self, user_id: &str) -> GameResult<Vec<RoundBets>> {
        let today = BetScope::Session(self.clock.session_for(self.now()));
        self.bet_history(user_id, &today)
    }

    /// `session` defaults to the current game day.
    pub fn day_summary(&self, session: Option<&str>) -> GameResult<DaySummary> {
        let today = self.clock.session_for(self.now());
        reports::day_summary(&self.store, session.unwrap_or(today.as_str()))
    }

    /// `session` defaults to the current game day.
    pub fn rounds_summary(&self, session: Option<&str>) -> GameResult<Vec<RoundSummary>> {
        let today = self.clock.session_for(self.now());
        reports::rounds_summary(&self.store, session.unwrap_or(today.as_str()))
    }
}
