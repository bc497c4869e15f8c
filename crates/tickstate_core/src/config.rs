//! # Registry Configuration
//!
//! Loaded once at startup, typically from a TOML file:
//!
//! ```toml
//! name = "simulation"
//! initial_capacity = 4096
//! slow_cycle_warn_micros = 500
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TickstateError, TickstateResult};

/// Largest `initial_capacity` a configuration may reserve.
pub const MAX_INITIAL_CAPACITY: usize = 1 << 24;

/// Configuration for a [`CommitRegistry`](crate::CommitRegistry).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Label attached to every log event from this registry.
    pub name: String,
    /// Registration slots reserved up front.
    pub initial_capacity: usize,
    /// Cycles slower than this log a warning. `0` disables the warning.
    pub slow_cycle_warn_micros: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            initial_capacity: 64,
            // 1ms is 6% of a 60Hz tick
            slow_cycle_warn_micros: 1_000,
        }
    }
}

impl RegistryConfig {
    /// Creates the default configuration under another name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a configuration from TOML source.
    ///
    /// # Errors
    ///
    /// Returns [`TickstateError::ConfigParse`] for malformed TOML and
    /// [`TickstateError::InvalidConfig`] if validation fails.
    pub fn from_toml_str(source: &str) -> TickstateResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`TickstateError::ConfigRead`] if the file cannot be read,
    /// otherwise the same errors as [`from_toml_str`](Self::from_toml_str).
    pub fn from_path(path: impl AsRef<Path>) -> TickstateResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| TickstateError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks the configuration for unusable values.
    ///
    /// # Errors
    ///
    /// Returns [`TickstateError::InvalidConfig`] if `name` is blank or
    /// `initial_capacity` exceeds [`MAX_INITIAL_CAPACITY`].
    pub fn validate(&self) -> TickstateResult<()> {
        if self.name.trim().is_empty() {
            return Err(TickstateError::InvalidConfig(String::from(
                "registry name must not be empty",
            )));
        }
        if self.initial_capacity > MAX_INITIAL_CAPACITY {
            return Err(TickstateError::InvalidConfig(format!(
                "initial_capacity {} exceeds maximum {MAX_INITIAL_CAPACITY}",
                self.initial_capacity
            )));
        }
        Ok(())
    }

    /// The slow-cycle warning threshold, if enabled.
    #[must_use]
    pub fn slow_cycle_threshold(&self) -> Option<Duration> {
        (self.slow_cycle_warn_micros > 0).then(|| Duration::from_micros(self.slow_cycle_warn_micros))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.name, "default");
        assert_eq!(config.initial_capacity, 64);
        assert_eq!(config.slow_cycle_threshold(), Some(Duration::from_millis(1)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config = RegistryConfig::from_toml_str(
            r#"
            name = "simulation"
            initial_capacity = 4096
            slow_cycle_warn_micros = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "simulation");
        assert_eq!(config.initial_capacity, 4096);
        assert_eq!(config.slow_cycle_threshold(), None);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = RegistryConfig::from_toml_str(r#"name = "world""#).unwrap();
        assert_eq!(config, RegistryConfig::named("world"));
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = RegistryConfig::from_toml_str(r#"name = "  ""#).unwrap_err();
        assert!(matches!(err, TickstateError::InvalidConfig(_)));
    }

    #[test]
    fn test_huge_capacity_rejected() {
        let err = RegistryConfig::from_toml_str("initial_capacity = 9000000000000000000").unwrap_err();
        assert!(matches!(err, TickstateError::InvalidConfig(_)));
        assert!(err.to_string().contains("initial_capacity"));

        let config = RegistryConfig::from_toml_str(&format!("initial_capacity = {MAX_INITIAL_CAPACITY}"))
            .unwrap();
        assert_eq!(config.initial_capacity, MAX_INITIAL_CAPACITY);
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = RegistryConfig::from_toml_str("initial_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, TickstateError::ConfigParse(_)));
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("tickstate_missing_config_does_not_exist.toml");
        let err = RegistryConfig::from_path(&path).unwrap_err();

        assert!(matches!(err, TickstateError::ConfigRead { .. }));
        assert!(err.to_string().contains("tickstate_missing_config"));
    }

    #[test]
    fn test_load_from_file() {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("tickstate_config_{id}.toml"));
        std::fs::write(&path, "name = \"session\"\ninitial_capacity = 8\n").unwrap();

        let config = RegistryConfig::from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.name, "session");
        assert_eq!(config.initial_capacity, 8);
    }
}
