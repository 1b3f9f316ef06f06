use super::{from_millis, to_millis, GameStore};
use crate::{
    error::GameResult,
    types::{Amount, Role, UserId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id:     UserId,
    pub email:       String,
    pub balance:     Amount,
    pub role:        Role,
    pub created_at:  DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl GameStore {
    // ── User ───────────────────────────────────────────────────

    pub fn insert_user(
        &self,
        user_id: &str,
        email: &str,
        role: Role,
        balance: Amount,
        now: DateTime<Utc>,
    ) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO app_user (user_id, email, balance, role, created_at, last_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![user_id, email.trim().to_lowercase(), balance, role, to_millis(now)],
        )?;
        Ok(())
    }

    pub fn user(&self, user_id: &str) -> GameResult<Option<UserRecord>> {
        let user = self
            .conn
            .query_row(
                "SELECT user_id, email, balance, role, created_at, last_active
                 FROM app_user WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UserRecord {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                        balance: row.get(2)?,
                        role: row.get(3)?,
                        created_at: from_millis(row.get(4)?),
                        last_active: from_millis(row.get(5)?),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    pub fn user_exists(&self, user_id: &str) -> GameResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM app_user WHERE user_id = ?1", params![user_id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn user_balance(&self, user_id: &str) -> GameResult<Option<Amount>> {
        let balance = self
            .conn
            .query_row(
                "SELECT balance FROM app_user WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(balance)
    }

    /// Compare-and-decrement. Returns false when the row is missing or the
    /// balance no longer covers `amount` at the moment of the update.
    pub fn debit_balance(&self, user_id: &str, amount: Amount, now: DateTime<Utc>) -> GameResult<bool> {
        let changed = self.conn.execute(
            "UPDATE app_user SET balance = balance - ?1, last_active = ?3
             WHERE user_id = ?2 AND balance >= ?1",
            params![amount, user_id, to_millis(now)],
        )?;
        Ok(changed == 1)
    }

    /// Add a non-negative `amount`. Returns false when the row is missing or
    /// the result would not fit in an i64 (SQLite would store it as REAL).
    pub fn credit_balance(&self, user_id: &str, amount: Amount) -> GameResult<bool> {
        let changed = self.conn.execute(
            "UPDATE app_user SET balance = balance + ?1
             WHERE user_id = ?2 AND balance <= 9223372036854775807 - ?1",
            params![amount, user_id],
        )?;
        Ok(changed == 1)
    }

    /// Signed adjustment that keeps the balance within [0, i64::MAX].
    /// Returns the new balance, or None if the row is missing or a guard failed.
    pub fn adjust_balance(&self, user_id: &str, delta: Amount) -> GameResult<Option<Amount>> {
        let balance = self
            .conn
            .query_row(
                "UPDATE app_user SET balance = balance + ?1
                 WHERE user_id = ?2
                   AND CASE WHEN ?1 >= 0
                            THEN balance <= 9223372036854775807 - ?1
                            ELSE balance >= -?1 END
                 RETURNING balance",
                params![delta, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(balance)
    }

    /// Sum of all balances, the house's outstanding liability.
    pub fn total_balance(&self) -> GameResult<Amount> {
        let total: Amount = self.conn.query_row(
            "SELECT COALESCE(SUM(balance), 0) FROM app_user",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}
