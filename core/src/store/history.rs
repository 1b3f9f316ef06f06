use super::{from_millis, to_millis, GameStore};
use crate::{
    error::GameResult,
    history::WinEntry,
    types::{Choice, Round},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

impl GameStore {
    // ── Recent wins ────────────────────────────────────────────

    /// Most recent first.
    pub fn last_wins(&self, limit: usize) -> GameResult<Vec<WinEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT round, choice, created_at FROM last_win
             ORDER BY id DESC LIMIT ?1",
        )?;
        let wins = stmt
            .query_map(params![limit as i64], |row| {
                Ok(WinEntry {
                    round: row.get(0)?,
                    choice: row.get(1)?,
                    recorded_at: from_millis(row.get(2)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(wins)
    }

    pub fn last_win_head(&self) -> GameResult<Option<(Round, Choice)>> {
        let head = self
            .conn
            .query_row(
                "SELECT round, choice FROM last_win ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get::<_, Round>(0)?, row.get::<_, Choice>(1)?)),
            )
            .optional()?;
        Ok(head)
    }

    pub fn push_last_win(&self, round: Round, choice: Choice, now: DateTime<Utc>) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO last_win (round, choice, created_at) VALUES (?1, ?2, ?3)",
            params![round, choice, to_millis(now)],
        )?;
        Ok(())
    }

    /// Drop everything but the `keep` newest entries.
    pub fn trim_last_wins(&self, keep: usize) -> GameResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM last_win WHERE id NOT IN (
                SELECT id FROM last_win ORDER BY id DESC LIMIT ?1
             )",
            params![keep as i64],
        )?;
        Ok(removed)
    }
}
