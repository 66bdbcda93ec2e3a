//! Optional TOML configuration for headless battles.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use tactics_core::{CharacterStats, DEFAULT_STEP_DURATION};

/// Root of the configuration file. Missing sections fall back to defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    pub(crate) battle: BattleConfig,
    pub(crate) character: CharacterConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct BattleConfig {
    /// Modeled time a unit needs to cross one tile.
    pub(crate) step_duration_ms: u64,
    /// Simulated time advanced per tick while a move or enemy turn resolves.
    pub(crate) tick_ms: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            step_duration_ms: u64::try_from(DEFAULT_STEP_DURATION.as_millis()).unwrap_or(200),
            tick_ms: 50,
        }
    }
}

/// Stat block handed to every character of the level.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CharacterConfig {
    pub(crate) max_health: u32,
    pub(crate) attack_damage: u32,
    pub(crate) attack_range: u32,
    pub(crate) move_distance: u32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        let stats = CharacterStats::default();
        Self {
            max_health: stats.max_health,
            attack_damage: stats.attack_damage,
            attack_range: stats.attack_range,
            move_distance: stats.move_distance,
        }
    }
}

impl Config {
    /// Reads the configuration file, or returns defaults when none is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to parse config {}", path.display()))
    }

    fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub(crate) fn stats(&self) -> CharacterStats {
        CharacterStats {
            max_health: self.character.max_health,
            attack_damage: self.character.attack_damage,
            attack_range: self.character.attack_range,
            move_distance: self.character.move_distance,
        }
    }

    pub(crate) fn step_duration(&self) -> Duration {
        Duration::from_millis(self.battle.step_duration_ms)
    }

    /// Tick length, never zero so pending moves always make progress.
    pub(crate) fn tick(&self) -> Duration {
        Duration::from_millis(self.battle.tick_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse("").expect("empty config");
        assert_eq!(config, Config::default());
        assert_eq!(config.stats(), CharacterStats::default());
        assert_eq!(config.step_duration(), DEFAULT_STEP_DURATION);
        assert_eq!(config.tick(), Duration::from_millis(50));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::parse("[character]\nattack_range = 2\n\n[battle]\ntick_ms = 0\n")
            .expect("valid config");
        assert_eq!(config.stats().attack_range, 2);
        assert_eq!(config.stats().max_health, 10);
        assert_eq!(config.tick(), Duration::from_millis(1));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("[character]\nspeed = 3\n").is_err());
        assert!(Config::parse("[camera]\nzoom = 2\n").is_err());
    }
}
