//! Spin Rounds game core: round clock, bet ledger, winner resolution,
//! exactly-once settlement and recent-win history over SQLite.

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod history;
pub mod ledger;
pub mod reports;
pub mod resolver;
pub mod rng;
pub mod settlement;
pub mod store;
pub mod types;
