//! Bet ledger: records wagers and aggregates stakes.
//!
//! The balance debit is a single compare-and-decrement at the storage
//! layer. A balance read earlier in the request is never trusted; the
//! debit and the bet insert commit together or not at all, and only while
//! the round is still unpaid.

use crate::{
    clock::RoundClock,
    error::{GameError, GameResult},
    store::GameStore,
    types::{Amount, BetId, Choice, Round, SessionId, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stake per choice. Choices nobody backed are absent.
pub type StakeTotals = BTreeMap<Choice, Amount>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id:         BetId,
    pub user_id:    UserId,
    pub round:      Round,
    pub choice:     Choice,
    pub amount:     Amount,
    pub win:        bool,
    pub payout:     Amount,
    pub created_at: DateTime<Utc>,
    pub session_id: SessionId,
}

pub struct BetLedger<'a> {
    store: &'a GameStore,
    clock: &'a RoundClock,
}

impl<'a> BetLedger<'a> {
    pub fn new(store: &'a GameStore, clock: &'a RoundClock) -> Self {
        Self { store, clock }
    }

    /// Debit `amount` from the user and record the wager.
    pub fn place_bet(
        &self,
        user_id: &str,
        round: Round,
        choice: Choice,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> GameResult<Bet> {
        let round = self.clock.validate(i64::from(round))?;
        if amount <= 0 {
            return Err(GameError::InvalidAmount { amount });
        }

        let bet = Bet {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            round,
            choice,
            amount,
            win: false,
            payout: 0,
            created_at: now,
            session_id: self.clock.session_for(now),
        };

        self.store.in_transaction(|store| {
            // Settlement finalizes every bet it sees; anything later would never be paid.
            if store.winner(round)?.is_some_and(|w| w.paid) {
                return Err(GameError::RoundClosed { round });
            }
            if !store.debit_balance(user_id, amount, now)? {
                // Inside the write lock, so this tells us which guard failed.
                return Err(if store.user_exists(user_id)? {
                    GameError::InsufficientFunds { user_id: user_id.to_string(), requested: amount }
                } else {
                    GameError::UserNotFound { user_id: user_id.to_string() }
                });
            }
            store.insert_bet(&bet)
        })?;

        log::debug!(
            "round={round} bet {} placed: user={user_id} choice={choice} amount={amount}",
            bet.id
        );
        Ok(bet)
    }

    /// Stake per choice across every bettor in the round.
    pub fn totals(&self, round: Round) -> GameResult<StakeTotals> {
        Ok(self.store.stake_totals(round, None)?.into_iter().collect())
    }

    /// Stake per choice for one bettor in the round.
    pub fn user_totals(&self, round: Round, user_id: &str) -> GameResult<StakeTotals> {
        Ok(self.store.stake_totals(round, Some(user_id))?.into_iter().collect())
    }

    pub fn bets_for_round(&self, round: Round) -> GameResult<Vec<Bet>> {
        self.store.bets_for_round(round)
    }
}
