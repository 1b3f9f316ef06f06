//! Read-only aggregates over bets and winners: a player's bet history and
//! the operator's daily summaries. Nothing here writes.

use crate::{
    error::GameResult,
    ledger::Bet,
    store::GameStore,
    types::{Amount, Choice, Round, SessionId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "session", rename_all = "snake_case")]
pub enum BetScope {
    All,
    Session(SessionId),
}

/// One round of a player's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundBets {
    pub session_id: SessionId,
    pub round:      Round,
    pub bets:       Vec<Bet>,
    pub winner:     Option<Choice>,
    pub win_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub session_id:        SessionId,
    pub total_bets_amount: Amount,
    pub total_payout:      Amount,
    pub profit:            Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub round:        Round,
    pub total_bet:    Amount,
    pub winner:       Option<Choice>,
    pub total_payout: Amount,
}

/// A player's bets grouped per (day, round), newest first.
pub fn bet_history(store: &GameStore, user_id: &str, scope: &BetScope) -> GameResult<Vec<RoundBets>> {
    let session = match scope {
        BetScope::All => None,
        BetScope::Session(s) => Some(s.as_str()),
    };

    let mut grouped: Vec<RoundBets> = Vec::new();
    for bet in store.bets_for_user(user_id, session)? {
        if let Some(g) = grouped.last_mut() {
            if g.round == bet.round && g.session_id == bet.session_id {
                g.bets.push(bet);
                continue;
            }
        }
        grouped.push(RoundBets {
            session_id: bet.session_id.clone(),
            round:      bet.round,
            bets:       vec![bet],
            winner:     None,
            win_amount: 0,
        });
    }

    for group in &mut grouped {
        group.winner = store.winner(group.round)?.map(|w| w.choice);
        group.win_amount = group.bets.iter().filter(|b| b.win).map(|b| b.payout).sum();
    }
    Ok(grouped)
}

/// Stake, payout and house profit for one game day.
pub fn day_summary(store: &GameStore, session: &str) -> GameResult<DaySummary> {
    let (staked, paid) = store.session_totals(session)?;
    Ok(DaySummary {
        session_id:        session.to_string(),
        total_bets_amount: staked,
        total_payout:      paid,
        profit:            staked - paid,
    })
}

/// Every round that took bets during the day, latest first.
pub fn rounds_summary(store: &GameStore, session: &str) -> GameResult<Vec<RoundSummary>> {
    store
        .round_stakes_for_session(session)?
        .into_iter()
        .map(|row| {
            Ok(RoundSummary {
                round:        row.round,
                total_bet:    row.total_bet,
                winner:       store.winner(row.round)?.map(|w| w.choice),
                total_payout: row.total_payout,
            })
        })
        .collect()
}
