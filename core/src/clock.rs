//! Round clock: maps wall-clock time to a round index.
//!
//! A game day starts at midnight in a fixed UTC offset (not a named
//! timezone, so there are no DST jumps). The day is cut into equal slots;
//! slot k (0-based) is round k + 1. The last slot absorbs any remainder
//! when the slot width does not divide the day evenly.

use crate::{
    config::GameConfig,
    error::{GameError, GameResult},
    types::{Round, SessionId},
};
use chrono::{DateTime, FixedOffset, Timelike, Utc};

pub const SECONDS_PER_DAY: u32 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundClock {
    slot_seconds:   u32,
    rounds_per_day: Round,
    offset:         FixedOffset,
}

impl RoundClock {
    pub fn new(slot_seconds: u32, utc_offset_minutes: i32) -> GameResult<Self> {
        if slot_seconds == 0 || slot_seconds > SECONDS_PER_DAY {
            return Err(anyhow::anyhow!("slot width {slot_seconds}s is outside 1..=86400").into());
        }
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
            .ok_or_else(|| anyhow::anyhow!("UTC offset {utc_offset_minutes}min is out of range"))?;
        Ok(Self {
            slot_seconds,
            rounds_per_day: SECONDS_PER_DAY / slot_seconds,
            offset,
        })
    }

    pub fn from_config(config: &GameConfig) -> GameResult<Self> {
        Self::new(config.slot_seconds, config.utc_offset_minutes)
    }

    pub fn slot_seconds(&self) -> u32 {
        self.slot_seconds
    }

    /// The highest valid round number.
    pub fn rounds_per_day(&self) -> Round {
        self.rounds_per_day
    }

    /// Round in progress at `now`, clamped to [1, N].
    pub fn round_for(&self, now: DateTime<Utc>) -> Round {
        let elapsed = self.seconds_since_midnight(now);
        (elapsed / self.slot_seconds + 1).min(self.rounds_per_day)
    }

    /// Whole seconds left before the current round's slot closes.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> u32 {
        let round = self.round_for(now);
        let slot_end_ms = if round == self.rounds_per_day {
            i64::from(SECONDS_PER_DAY) * 1000
        } else {
            i64::from(round * self.slot_seconds) * 1000
        };
        let local = now.with_timezone(&self.offset);
        let elapsed_ms = i64::from(local.num_seconds_from_midnight()) * 1000
            + i64::from(local.nanosecond() / 1_000_000);
        ((slot_end_ms - elapsed_ms).max(0) / 1000) as u32
    }

    /// Game-day label for `now`.
    pub fn session_for(&self, now: DateTime<Utc>) -> SessionId {
        now.with_timezone(&self.offset)
            .date_naive()
            .format("%Y-%m-%d")
            .to_string()
    }

    fn seconds_since_midnight(&self, now: DateTime<Utc>) -> u32 {
        now.with_timezone(&self.offset).num_seconds_from_midnight()
    }

    /// Reject anything outside [1, N].
    pub fn validate(&self, round: i64) -> GameResult<Round> {
        if round < 1 || round > i64::from(self.rounds_per_day) {
            return Err(GameError::InvalidRound { round, max: self.rounds_per_day });
        }
        Ok(round as Round)
    }
}

/// Where the engine reads "now" from. Tests and replays freeze it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    System,
    Frozen(DateTime<Utc>),
}

impl TimeSource {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System      => Utc::now(),
            Self::Frozen(at)  => *at,
        }
    }
}
