//! Recent-wins tracker: a short, most-recent-first list of settled rounds.

use crate::{
    error::GameResult,
    store::GameStore,
    types::{Choice, Round},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinEntry {
    pub round:       Round,
    pub choice:      Choice,
    pub recorded_at: DateTime<Utc>,
}

pub struct HistoryTracker<'a> {
    store: &'a GameStore,
    limit: usize,
}

impl<'a> HistoryTracker<'a> {
    pub fn new(store: &'a GameStore, limit: usize) -> Self {
        Self { store, limit }
    }

    /// Prepend (round, choice) unless it is already the head, then trim.
    /// Returns true if an entry was added.
    pub fn record(&self, round: Round, choice: Choice, now: DateTime<Utc>) -> GameResult<bool> {
        self.store.in_transaction(|store| {
            if store.last_win_head()? == Some((round, choice)) {
                return Ok(false);
            }
            store.push_last_win(round, choice, now)?;
            store.trim_last_wins(self.limit)?;
            Ok(true)
        })
    }

    /// Most recent first, at most `limit` entries.
    pub fn read(&self) -> GameResult<Vec<WinEntry>> {
        self.store.last_wins(self.limit)
    }
}
