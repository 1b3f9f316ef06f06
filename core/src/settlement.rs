//! Settlement engine: pays a round out exactly once.
//!
//! Any number of callers may call settle() for the same round, in any
//! order, concurrently or as retries. The claim (paid 0 → 1) is a single
//! conditional update, so exactly one caller proceeds to pay.
//!
//! ORDER (inside one IMMEDIATE transaction):
//!   1. Claim the round; if no winner row exists, resolve one and retry once.
//!   2. Take the choice returned by the claiming update.
//!   3. Load and partition the round's bets.
//!   4. Credit each winning user once: Σ stake × multiplier.
//!   5. Finalize bets: winners get payout = amount × multiplier, losers 0.
//!   6. Record the win in the recent-wins history.
//! After commit:
//!   7. Publish winner-announced and payouts-distributed (best-effort).
//!
//! Because 1–6 share a transaction, a failure anywhere rolls the claim
//! back and the round stays LOCKED for the next caller.

use crate::{
    broadcast::{publish_best_effort, EventSink},
    clock::RoundClock,
    error::GameResult,
    event::GameEvent,
    history::HistoryTracker,
    resolver::WinnerResolver,
    rng::GameRng,
    store::GameStore,
    types::{Amount, Choice, Round, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCredit {
    pub user_id: UserId,
    pub stake:   Amount,
    pub credit:  Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub round:          Round,
    pub choice:         Choice,
    pub credited_users: Vec<UserCredit>,
    pub total_payout:   Amount,
    pub winning_bets:   usize,
    pub losing_bets:    usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    Settled(Settlement),
    /// Another (or an earlier) caller already claimed this round.
    AlreadySettled,
}

pub struct SettlementEngine<'a> {
    store:         &'a GameStore,
    clock:         &'a RoundClock,
    multiplier:    Amount,
    history_limit: usize,
}

impl<'a> SettlementEngine<'a> {
    pub fn new(
        store: &'a GameStore,
        clock: &'a RoundClock,
        multiplier: Amount,
        history_limit: usize,
    ) -> Self {
        Self { store, clock, multiplier, history_limit }
    }

    pub fn settle(
        &self,
        round: Round,
        rng: &mut GameRng,
        sink: &dyn EventSink,
        now: DateTime<Utc>,
    ) -> GameResult<SettleOutcome> {
        let round = self.clock.validate(i64::from(round))?;

        let settled = self.store.in_transaction(|store| {
            let Some(choice) = self.claim(store, round, rng, now)? else {
                return Ok(None);
            };
            self.pay_out(store, round, choice, now).map(Some)
        })?;

        let Some(settlement) = settled else {
            log::debug!("round={round} already settled, nothing to do");
            return Ok(SettleOutcome::AlreadySettled);
        };

        log::info!(
            "round={round} settled: winner={} users_credited={} total_payout={}",
            settlement.choice,
            settlement.credited_users.len(),
            settlement.total_payout
        );

        let choice = settlement.choice;
        publish_best_effort(sink, GameEvent::WinnerAnnounced { round, choice });
        publish_best_effort(sink, GameEvent::PayoutsDistributed { round, choice });

        Ok(SettleOutcome::Settled(settlement))
    }

    /// Steps 1–2. None means the round was already paid.
    fn claim(
        &self,
        store: &GameStore,
        round: Round,
        rng: &mut GameRng,
        now: DateTime<Utc>,
    ) -> GameResult<Option<Choice>> {
        if let Some(choice) = store.claim_winner(round, now)? {
            return Ok(Some(choice));
        }
        if store.winner(round)?.is_some() {
            return Ok(None);
        }
        WinnerResolver::new(store, self.clock).resolve(round, rng, now)?;
        store.claim_winner(round, now)
    }

    /// Steps 3–6.
    fn pay_out(
        &self,
        store: &GameStore,
        round: Round,
        choice: Choice,
        now: DateTime<Utc>,
    ) -> GameResult<Settlement> {
        let bets = store.bets_for_round(round)?;
        let (winning, losing): (Vec<_>, Vec<_>) = bets.iter().partition(|b| b.choice == choice);

        let mut stake_by_user: BTreeMap<&str, Amount> = BTreeMap::new();
        for bet in &winning {
            let stake = stake_by_user.entry(bet.user_id.as_str()).or_default();
            // Saturates so the checked multiply below reports the overflow.
            *stake = stake.saturating_add(bet.amount);
        }

        let mut credited_users = Vec::with_capacity(stake_by_user.len());
        let mut total_payout: Amount = 0;
        for (user_id, stake) in stake_by_user {
            let credit = stake
                .checked_mul(self.multiplier)
                .ok_or_else(|| anyhow::anyhow!("round {round}: payout overflow for {user_id}"))?;
            if !store.credit_balance(user_id, credit)? {
                let reason = if store.user_exists(user_id)? { "balance would overflow" } else { "no user record" };
                return Err(anyhow::anyhow!("round {round}: cannot credit {user_id}: {reason}").into());
            }
            total_payout = total_payout
                .checked_add(credit)
                .ok_or_else(|| anyhow::anyhow!("round {round}: total payout overflow"))?;
            credited_users.push(UserCredit { user_id: user_id.to_string(), stake, credit });
        }

        store.finalize_round_bets(round, choice, self.multiplier)?;
        store.set_winner_total_payout(round, total_payout)?;
        HistoryTracker::new(store, self.history_limit).record(round, choice, now)?;

        Ok(Settlement {
            round,
            choice,
            credited_users,
            total_payout,
            winning_bets: winning.len(),
            losing_bets: losing.len(),
        })
    }
}
