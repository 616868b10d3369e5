//! Locker configuration and its JSON representation.

#[cfg(feature = "json")]
use std::fs::File;
#[cfg(feature = "json")]
use std::path::Path;

#[cfg(feature = "json")]
use anyhow::Context;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

/// Seconds in one lock day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Tunables shared by every locker front-end.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockerConfig {
    /// Length of one lock day, in seconds.
    pub seconds_per_day: u64,

    /// Oldest acceptable price reading, in seconds. `None` accepts any age.
    pub max_price_age: Option<u64>,
}

impl Default for LockerConfig {
    fn default() -> Self {
        Self {
            seconds_per_day: SECONDS_PER_DAY,
            max_price_age: None,
        }
    }
}

impl LockerConfig {
    /// Lock duration in seconds, or `None` on overflow.
    pub fn lock_seconds(&self, lock_days: u64) -> Option<u64> {
        lock_days.checked_mul(self.seconds_per_day)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seconds_per_day == 0 {
            return Err(ConfigError::ZeroDayLength);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("seconds_per_day must be positive")]
    ZeroDayLength,
}

/// Reads a [`LockerConfig`] from a JSON file and validates it.
///
/// Missing fields take their default values.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be read or parsed, or the
/// values are invalid.
#[cfg(feature = "json")]
pub fn load_config<P>(path: P) -> anyhow::Result<LockerConfig>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("loading locker config: {:?}", path))?;
    let config: LockerConfig = serde_json::from_str(&content)
        .with_context(|| format!("parsing JSON from {:?}", path))?;
    config
        .validate()
        .with_context(|| format!("invalid locker config in {:?}", path))?;
    Ok(config)
}

/// Writes `config` as pretty-printed JSON to `path`.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be created or written.
#[cfg(feature = "json")]
pub fn save_config<P>(path: P, config: &LockerConfig) -> anyhow::Result<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating file {:?}", path))?;
    serde_json::to_writer_pretty(file, config)
        .with_context(|| format!("serializing to JSON to {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LockerConfig::default();
        assert_eq!(config.seconds_per_day, 86_400);
        assert_eq!(config.max_price_age, None);
        assert_eq!(config.lock_seconds(0), Some(0));
        assert_eq!(config.lock_seconds(1), Some(86_400));
        assert_eq!(config.lock_seconds(u64::MAX), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_day_length() {
        let config = LockerConfig {
            seconds_per_day: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroDayLength));
    }

    #[cfg(feature = "json")]
    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locker.json");

        let config = LockerConfig {
            seconds_per_day: 60,
            max_price_age: Some(3_600),
        };
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[cfg(feature = "json")]
    #[test]
    fn partial_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();

        let partial = dir.path().join("partial.json");
        std::fs::write(&partial, r#"{ "max_price_age": 600 }"#).unwrap();
        let config = load_config(&partial).unwrap();
        assert_eq!(config.seconds_per_day, SECONDS_PER_DAY);
        assert_eq!(config.max_price_age, Some(600));

        let zero = dir.path().join("zero.json");
        std::fs::write(&zero, r#"{ "seconds_per_day": 0 }"#).unwrap();
        assert!(load_config(&zero).is_err());

        assert!(load_config(dir.path().join("missing.json")).is_err());
    }
}
