use crate::types::{Amount, Round, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid round {round}: must be within 1..={max}")]
    InvalidRound { round: i64, max: Round },

    #[error("Invalid amount {amount}: stake must be positive")]
    InvalidAmount { amount: Amount },

    #[error("Invalid choice '{value}'")]
    InvalidChoice { value: String },

    #[error("Round {round} is closed: payouts already distributed")]
    RoundClosed { round: Round },

    #[error("User '{user_id}' not found")]
    UserNotFound { user_id: UserId },

    #[error("Insufficient funds: user '{user_id}' cannot cover {requested}")]
    InsufficientFunds { user_id: UserId, requested: Amount },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GameError {
    /// Malformed input; rejected before any state is touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidRound { .. }
                | Self::InvalidAmount { .. }
                | Self::InvalidChoice { .. }
                | Self::RoundClosed { .. }
        )
    }

    /// Well-formed input that the referenced user cannot satisfy.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::UserNotFound { .. } | Self::InsufficientFunds { .. })
    }
}

pub type GameResult<T> = Result<T, GameError>;
