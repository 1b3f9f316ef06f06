//! Winner resolver: fixes a round's winning choice exactly once.
//!
//! Per-round state machine:
//!   UNSET ──resolve/override──▶ LOCKED(choice, paid = false) ──settle──▶ PAID
//!
//! The winner table's primary key on `round` is the only arbiter between
//! concurrent resolvers: the first insert commits, everyone else reads it
//! back. A manual override may replace the choice until settlement claims
//! the round.

use crate::{
    clock::RoundClock,
    error::GameResult,
    ledger::StakeTotals,
    rng::GameRng,
    store::GameStore,
    types::{Amount, Choice, Round},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub round:        Round,
    pub choice:       Choice,
    pub paid:         bool,
    pub total_payout: Amount,
    pub created_at:   DateTime<Utc>,
    pub paid_at:      Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// This call persisted the winner.
    Locked(Choice),
    /// A winner was already persisted (manually or by an earlier caller).
    AlreadyLocked(Choice),
}

impl LockOutcome {
    pub fn choice(&self) -> Choice {
        match self {
            Self::Locked(c) | Self::AlreadyLocked(c) => *c,
        }
    }

    pub fn already_locked(&self) -> bool {
        matches!(self, Self::AlreadyLocked(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    Recorded,
    /// Settlement already claimed the round; the stored choice is unchanged.
    RoundClosed,
}

/// The house-favouring rule: the least-backed choice wins, ties broken
/// uniformly at random. With no stakes at all, any choice may win.
pub fn pick_least_backed(totals: &StakeTotals, rng: &mut GameRng) -> Option<Choice> {
    match totals.values().min() {
        None => rng.pick(&Choice::ALL),
        Some(min) => {
            let candidates: Vec<Choice> = totals
                .iter()
                .filter(|(_, staked)| *staked == min)
                .map(|(choice, _)| *choice)
                .collect();
            rng.pick(&candidates)
        }
    }
}

pub struct WinnerResolver<'a> {
    store: &'a GameStore,
    clock: &'a RoundClock,
}

impl<'a> WinnerResolver<'a> {
    pub fn new(store: &'a GameStore, clock: &'a RoundClock) -> Self {
        Self { store, clock }
    }

    /// The round's winning choice, computing and persisting it if unset.
    pub fn resolve(&self, round: Round, rng: &mut GameRng, now: DateTime<Utc>) -> GameResult<Choice> {
        self.lock(round, rng, now).map(|outcome| outcome.choice())
    }

    /// Like `resolve`, but reports whether this call did the locking.
    pub fn lock(&self, round: Round, rng: &mut GameRng, now: DateTime<Utc>) -> GameResult<LockOutcome> {
        let round = self.clock.validate(i64::from(round))?;

        if let Some(existing) = self.store.winner(round)? {
            return Ok(LockOutcome::AlreadyLocked(existing.choice));
        }

        let totals: StakeTotals = self.store.stake_totals(round, None)?.into_iter().collect();
        let choice = pick_least_backed(&totals, rng)
            .ok_or_else(|| anyhow::anyhow!("round {round}: no candidate choice"))?;

        if self.store.insert_winner_if_absent(round, choice, now)? {
            log::debug!("round={round} winner locked: {choice} (stakes {totals:?})");
            return Ok(LockOutcome::Locked(choice));
        }

        // Lost the race: whatever committed first is authoritative.
        let persisted = self
            .store
            .winner(round)?
            .ok_or_else(|| anyhow::anyhow!("round {round}: winner vanished after conflict"))?;
        if persisted.choice != choice {
            log::debug!("round={round} concurrent lock won with {}, discarding {choice}", persisted.choice);
        }
        Ok(LockOutcome::AlreadyLocked(persisted.choice))
    }

    /// Admin-chosen winner. Allowed with or without bets, before or after
    /// automatic locking, but never after settlement has claimed the round.
    pub fn manual_override(
        &self,
        round: Round,
        choice: Choice,
        now: DateTime<Utc>,
    ) -> GameResult<OverrideOutcome> {
        let round = self.clock.validate(i64::from(round))?;
        if self.store.upsert_unpaid_winner(round, choice, now)? {
            log::info!("round={round} manual winner set: {choice}");
            Ok(OverrideOutcome::Recorded)
        } else {
            log::warn!("round={round} manual winner {choice} ignored: round already paid");
            Ok(OverrideOutcome::RoundClosed)
        }
    }

    pub fn winner_for(&self, round: Round) -> GameResult<Option<Winner>> {
        let round = self.clock.validate(i64::from(round))?;
        self.store.winner(round)
    }
}
