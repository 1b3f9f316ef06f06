//! Shared primitive types used across the entire game core.

use crate::error::GameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A round index within one game day. Always in [1, rounds_per_day].
pub type Round = u32;

/// Whole currency units. Stakes, balances and payouts all use this.
pub type Amount = i64;

/// A stable, unique identifier for a user record.
pub type UserId = String;

/// A stable, unique identifier for a bet record.
pub type BetId = String;

/// Game-day label (`YYYY-MM-DD` in the anchor timezone).
pub type SessionId = String;

/// The fixed set of outcomes a player can back.
/// Variants are stored by name; never rename a serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Choice {
    Umbrella,
    Football,
    Sun,
    Diya,
    Cow,
    Bucket,
    Kite,
    SpinningTop,
    Rose,
    Butterfly,
    Pigeon,
    Rabbit,
}

impl Choice {
    pub const ALL: [Choice; 12] = [
        Choice::Umbrella,
        Choice::Football,
        Choice::Sun,
        Choice::Diya,
        Choice::Cow,
        Choice::Bucket,
        Choice::Kite,
        Choice::SpinningTop,
        Choice::Rose,
        Choice::Butterfly,
        Choice::Pigeon,
        Choice::Rabbit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Umbrella    => "umbrella",
            Self::Football    => "football",
            Self::Sun         => "sun",
            Self::Diya        => "diya",
            Self::Cow         => "cow",
            Self::Bucket      => "bucket",
            Self::Kite        => "kite",
            Self::SpinningTop => "spinningTop",
            Self::Rose        => "rose",
            Self::Butterfly   => "butterfly",
            Self::Pigeon      => "pigeon",
            Self::Rabbit      => "rabbit",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Choice::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| GameError::InvalidChoice { value: s.to_string() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User  => "user",
            Self::Admin => "admin",
        }
    }

}

impl FromStr for Role {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user"  => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other   => Err(anyhow::anyhow!("unknown role '{other}'").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_names_parse_back() {
        for c in Choice::ALL {
            assert_eq!(c.as_str().parse::<Choice>().unwrap(), c);
        }
    }

    #[test]
    fn unknown_choice_is_rejected() {
        let err = "dragon".parse::<Choice>().unwrap_err();
        assert!(matches!(err, GameError::InvalidChoice { .. }));
    }

    #[test]
    fn roles_parse_strictly() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::User.as_str().parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn serde_form_matches_stored_name() {
        let json = serde_json::to_string(&Choice::SpinningTop).unwrap();
        assert_eq!(json, "\"spinningTop\"");
    }
}
