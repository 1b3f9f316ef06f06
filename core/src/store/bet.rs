use super::{from_millis, to_millis, GameStore};
use crate::{
    error::GameResult,
    ledger::Bet,
    types::{Amount, Choice, Round},
};
use rusqlite::{params, Row};

const BET_COLUMNS: &str =
    "bet_id, user_id, round, choice, amount, win, payout, session_id, created_at";

fn bet_from_row(row: &Row<'_>) -> rusqlite::Result<Bet> {
    Ok(Bet {
        id: row.get(0)?,
        user_id: row.get(1)?,
        round: row.get(2)?,
        choice: row.get(3)?,
        amount: row.get(4)?,
        win: row.get::<_, i32>(5)? != 0,
        payout: row.get(6)?,
        session_id: row.get(7)?,
        created_at: from_millis(row.get(8)?),
    })
}

/// Per-round stake aggregate for the daily round summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundStakeRow {
    pub round:        Round,
    pub total_bet:    Amount,
    pub total_payout: Amount,
}

impl GameStore {
    // ── Bet ────────────────────────────────────────────────────

    pub fn insert_bet(&self, bet: &Bet) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO bet (bet_id, user_id, round, choice, amount, win, payout, session_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                bet.id,
                bet.user_id,
                bet.round,
                bet.choice,
                bet.amount,
                bet.win as i32,
                bet.payout,
                bet.session_id,
                to_millis(bet.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn bets_for_round(&self, round: Round) -> GameResult<Vec<Bet>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BET_COLUMNS} FROM bet WHERE round = ?1 ORDER BY created_at ASC, bet_id ASC"
        ))?;
        let bets = stmt
            .query_map(params![round], bet_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bets)
    }

    /// A user's bets, newest day and round first. `session` narrows to one game day.
    pub fn bets_for_user(&self, user_id: &str, session: Option<&str>) -> GameResult<Vec<Bet>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BET_COLUMNS} FROM bet
             WHERE user_id = ?1 AND (?2 IS NULL OR session_id = ?2)
             ORDER BY session_id DESC, round DESC, created_at ASC, bet_id ASC"
        ))?;
        let bets = stmt
            .query_map(params![user_id, session], bet_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bets)
    }

    /// Stake per choice for a round, optionally restricted to one user.
    /// Choices without bets are absent.
    pub fn stake_totals(&self, round: Round, user_id: Option<&str>) -> GameResult<Vec<(Choice, Amount)>> {
        let mut stmt = self.conn.prepare(
            "SELECT choice, SUM(amount) FROM bet
             WHERE round = ?1 AND (?2 IS NULL OR user_id = ?2)
             GROUP BY choice ORDER BY choice ASC",
        )?;
        let totals = stmt
            .query_map(params![round, user_id], |row| {
                Ok((row.get::<_, Choice>(0)?, row.get::<_, Amount>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(totals)
    }

    /// Mark every bet of the round won or lost in two statements.
    /// Winning bets carry payout = amount × multiplier. Returns (won, lost) counts.
    pub fn finalize_round_bets(
        &self,
        round: Round,
        winning: Choice,
        multiplier: Amount,
    ) -> GameResult<(usize, usize)> {
        let won = self.conn.execute(
            "UPDATE bet SET win = 1, payout = amount * ?3 WHERE round = ?1 AND choice = ?2",
            params![round, winning, multiplier],
        )?;
        let lost = self.conn.execute(
            "UPDATE bet SET win = 0, payout = 0 WHERE round = ?1 AND choice <> ?2",
            params![round, winning],
        )?;
        Ok((won, lost))
    }

    /// (total staked, total paid out) across one game day.
    pub fn session_totals(&self, session: &str) -> GameResult<(Amount, Amount)> {
        let totals = self.conn.query_row(
            "SELECT COALESCE(SUM(amount), 0), COALESCE(SUM(payout), 0)
             FROM bet WHERE session_id = ?1",
            params![session],
            |row| Ok((row.get::<_, Amount>(0)?, row.get::<_, Amount>(1)?)),
        )?;
        Ok(totals)
    }

    /// Per-round stake and payout for one game day, latest round first.
    pub fn round_stakes_for_session(&self, session: &str) -> GameResult<Vec<RoundStakeRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT round, SUM(amount), SUM(payout) FROM bet
             WHERE session_id = ?1
             GROUP BY round ORDER BY round DESC",
        )?;
        let rows = stmt
            .query_map(params![session], |row| {
                Ok(RoundStakeRow {
                    round: row.get(0)?,
                    total_bet: row.get(1)?,
                    total_payout: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
