use super::{from_millis, to_millis, GameStore};
use crate::{
    error::GameResult,
    resolver::Winner,
    types::{Amount, Choice, Round},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl GameStore {
    // ── Winner ─────────────────────────────────────────────────

    pub fn winner(&self, round: Round) -> GameResult<Option<Winner>> {
        let winner = self
            .conn
            .query_row(
                "SELECT round, choice, paid, total_payout, created_at, paid_at
                 FROM winner WHERE round = ?1",
                params![round],
                |row| {
                    Ok(Winner {
                        round: row.get(0)?,
                        choice: row.get(1)?,
                        paid: row.get::<_, i32>(2)? != 0,
                        total_payout: row.get(3)?,
                        created_at: from_millis(row.get(4)?),
                        paid_at: row.get::<_, Option<i64>>(5)?.map(from_millis),
                    })
                },
            )
            .optional()?;
        Ok(winner)
    }

    /// First writer wins. Returns true if this call created the row.
    pub fn insert_winner_if_absent(
        &self,
        round: Round,
        choice: Choice,
        now: DateTime<Utc>,
    ) -> GameResult<bool> {
        let changed = self.conn.execute(
            "INSERT INTO winner (round, choice, paid, created_at) VALUES (?1, ?2, 0, ?3)
             ON CONFLICT (round) DO NOTHING",
            params![round, choice, to_millis(now)],
        )?;
        Ok(changed == 1)
    }

    /// Insert or replace the choice, but only while the round is unpaid.
    /// Returns false when the round has already been claimed.
    pub fn upsert_unpaid_winner(
        &self,
        round: Round,
        choice: Choice,
        now: DateTime<Utc>,
    ) -> GameResult<bool> {
        let changed = self.conn.execute(
            "INSERT INTO winner (round, choice, paid, created_at) VALUES (?1, ?2, 0, ?3)
             ON CONFLICT (round) DO UPDATE
                SET choice = excluded.choice, created_at = excluded.created_at
                WHERE winner.paid = 0",
            params![round, choice, to_millis(now)],
        )?;
        Ok(changed == 1)
    }

    /// Flip paid 0 → 1. Exactly one caller per round gets Some(choice).
    pub fn claim_winner(&self, round: Round, now: DateTime<Utc>) -> GameResult<Option<Choice>> {
        let choice = self
            .conn
            .query_row(
                "UPDATE winner SET paid = 1, paid_at = ?2
                 WHERE round = ?1 AND paid = 0
                 RETURNING choice",
                params![round, to_millis(now)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(choice)
    }

    pub fn set_winner_total_payout(&self, round: Round, total: Amount) -> GameResult<()> {
        self.conn.execute(
            "UPDATE winner SET total_payout = ?2 WHERE round = ?1",
            params![round, total],
        )?;
        Ok(())
    }
}
