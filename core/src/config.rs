use crate::{clock::SECONDS_PER_DAY, types::{Amount, Round}};
use serde::{Deserialize, Serialize};

fn default_slot_seconds() -> u32 { 90 }
fn default_utc_offset_minutes() -> i32 { 330 }
fn default_payout_multiplier() -> Amount { 10 }
fn default_history_limit() -> usize { 10 }
fn default_busy_timeout_ms() -> u64 { 5_000 }

/// Game tuning. Every field has a default so a partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    /// Width of one betting round, in seconds.
    #[serde(default = "default_slot_seconds")]
    pub slot_seconds: u32,
    /// Offset of the day anchor from UTC. 330 = IST (UTC+05:30).
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// A winning stake is credited back this many times over.
    #[serde(default = "default_payout_multiplier")]
    pub payout_multiplier: Amount,
    /// Number of recent wins kept by the history tracker.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// How long a writer waits on a locked database before giving up.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Fixed RNG seed. None draws one from OS entropy at startup.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            slot_seconds: default_slot_seconds(),
            utc_offset_minutes: default_utc_offset_minutes(),
            payout_multiplier: default_payout_multiplier(),
            history_limit: default_history_limit(),
            busy_timeout_ms: default_busy_timeout_ms(),
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Load from the data/ directory.
    /// In tests, use GameConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/game/game_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GameConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Production defaults with a fixed seed, so draws are reproducible.
    pub fn default_test() -> Self {
        Self {
            rng_seed: Some(0x5EED_5EED),
            ..Self::default()
        }
    }

    pub fn rounds_per_day(&self) -> Round {
        SECONDS_PER_DAY / self.slot_seconds.max(1)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.slot_seconds == 0 || self.slot_seconds > SECONDS_PER_DAY {
            anyhow::bail!("slot_seconds must be within 1..=86400, got {}", self.slot_seconds);
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            anyhow::bail!("utc_offset_minutes out of range: {}", self.utc_offset_minutes);
        }
        if self.payout_multiplier < 1 {
            anyhow::bail!("payout_multiplier must be at least 1, got {}", self.payout_multiplier);
        }
        if self.history_limit == 0 {
            anyhow::bail!("history_limit must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{ "slot_seconds": 60 }"#).unwrap();
        assert_eq!(config.slot_seconds, 60);
        assert_eq!(config.payout_multiplier, 10);
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.rounds_per_day(), 1440);
    }

    #[test]
    fn zero_multiplier_is_rejected() {
        let config = GameConfig { payout_multiplier: 0, ..GameConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_game_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("game")).unwrap();
        std::fs::write(
            dir.path().join("game/game_config.json"),
            r#"{ "slot_seconds": 120, "rng_seed": 7 }"#,
        )
        .unwrap();
        let config = GameConfig::load(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.slot_seconds, 120);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.utc_offset_minutes, 330);
    }
}
