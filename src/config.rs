//! Configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file
//! (`rulecore.toml` in the working directory, or an explicit path), then
//! `RULECORE_`-prefixed environment variables.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combat::{DiceRng, FileSeedStore, RollEngine, DEFAULT_DEFENSE};

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "rulecore.toml";

/// Prefix for environment overrides, e.g. `RULECORE_SEED=42`
pub const ENV_PREFIX: &str = "RULECORE_";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Invalid(Box::new(e))
    }
}

/// Rules engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Initial seed when no stored seed exists; random when unset
    pub seed: Option<u64>,
    /// JSON file the dice seed is persisted to
    pub seed_file: Option<PathBuf>,
    /// Defense for attacks with no explicit or resolved defense
    pub default_defense: i32,
    /// tracing filter directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            seed: None,
            seed_file: None,
            default_defense: DEFAULT_DEFENSE,
            log_filter: "rulecore=info".to_string(),
        }
    }
}

impl RulesConfig {
    /// The layered provider stack
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let toml = match path {
            Some(path) if !path.exists() => return Err(ConfigError::Missing(path.to_path_buf())),
            Some(path) => Toml::file(path),
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };

        Ok(Figment::from(Serialized::defaults(RulesConfig::default()))
            .merge(toml)
            .merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load from defaults, file and environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment(path)?)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        Ok(figment.extract()?)
    }

    /// Build a roll engine from this configuration
    ///
    /// With `seed_file` set the engine restores from (or initializes) that
    /// file; a stored seed takes precedence over `seed`.
    pub fn roll_engine(&self) -> RollEngine {
        let seed = self.seed.unwrap_or_else(DiceRng::entropy_seed);
        let engine = RollEngine::new(seed).with_default_defense(self.default_defense);
        match &self.seed_file {
            Some(path) => engine.with_seed_store(Box::new(FileSeedStore::new(path))),
            None => engine,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::SeedStatus;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = RulesConfig::default();
        assert_eq!(config.seed, None);
        assert_eq!(config.default_defense, 10);
        assert_eq!(config.log_filter, "rulecore=info");
    }

    #[test]
    fn test_defaults_survive_figment() {
        let figment = Figment::from(Serialized::defaults(RulesConfig::default()));
        assert_eq!(
            RulesConfig::from_figment(&figment).unwrap(),
            RulesConfig::default()
        );
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(
            &path,
            "seed = 12345\ndefault_defense = 14\nseed_file = \"dice.json\"\n",
        )
        .unwrap();

        let config = RulesConfig::load(Some(&path)).unwrap();
        assert_eq!(config.seed, Some(12345));
        assert_eq!(config.default_defense, 14);
        assert_eq!(config.seed_file, Some(PathBuf::from("dice.json")));
        assert_eq!(config.log_filter, "rulecore=info");
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            RulesConfig::load(Some(&path)),
            Err(ConfigError::Missing(p)) if p == path
        ));
    }

    #[test]
    fn test_invalid_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(&path, "default_defense = \"high\"\n").unwrap();

        let err = RulesConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_later_layers_override() {
        let figment = Figment::from(Serialized::defaults(RulesConfig::default()))
            .merge(Serialized::default("seed", 9u64));
        let config = RulesConfig::from_figment(&figment).unwrap();
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_roll_engine_from_config() {
        let config = RulesConfig {
            seed: Some(42),
            default_defense: 12,
            ..Default::default()
        };
        let engine = config.roll_engine();
        assert_eq!(engine.seed(), 42);
        assert_eq!(engine.seed_status(), &SeedStatus::Ephemeral);
    }

    #[test]
    fn test_roll_engine_with_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let seed_file = dir.path().join("seed.json");
        fs::write(&seed_file, r#"{"seed":777}"#).unwrap();

        let config = RulesConfig {
            seed: Some(1),
            seed_file: Some(seed_file),
            ..Default::default()
        };
        let engine = config.roll_engine();
        assert_eq!(engine.seed_status(), &SeedStatus::Restored);
        assert_eq!(engine.seed(), 777);
    }
}
