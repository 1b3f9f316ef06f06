//! Notifications handed to the external broadcaster.
//!
//! RULE: Events describe state that is already committed.
//! Nothing in the core reads events back to make decisions.

use crate::types::{Amount, Choice, Round};
use serde::{Deserialize, Serialize};

/// Every event the core emits. Wire names are what clients subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GameEvent {
    BetPlaced {
        choice: Choice,
        amount: Amount,
        round:  Round,
    },
    WinnerAnnounced {
        round:  Round,
        choice: Choice,
    },
    PayoutsDistributed {
        round:  Round,
        choice: Choice,
    },
}

impl GameEvent {
    /// Stable name, used for the event_type column and channel routing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BetPlaced { .. }          => "bet-placed",
            Self::WinnerAnnounced { .. }    => "winner-announced",
            Self::PayoutsDistributed { .. } => "payouts-distributed",
        }
    }

    pub fn round(&self) -> Round {
        match self {
            Self::BetPlaced { round, .. }
            | Self::WinnerAnnounced { round, .. }
            | Self::PayoutsDistributed { round, .. } => *round,
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub round:      Round,
    pub event_type: String,
    pub payload:    String, // JSON-serialized GameEvent
    pub created_at: i64,    // unix millis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_is_tagged_kebab_case() {
        let event = GameEvent::WinnerAnnounced { round: 5, choice: Choice::Sun };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "winner-announced");
        assert_eq!(json["round"], 5);
        assert_eq!(json["choice"], "sun");
        assert_eq!(event.name(), "winner-announced");
    }
}
