//! Application configuration management.
//!
//! Handles loading, saving, and validating cohort configuration including:
//! - Location of the SQLite store
//! - Room identifier, capacity and busy threshold
//! - Card reader device
//! - Display timezone

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RoomId;

/// Default store file name, resolved against the working directory.
pub const DEFAULT_STORE_PATH: &str = "db.sqlite3";

/// Default room capacity.
pub const DEFAULT_CAPACITY: u32 = 19;

/// Default percentage of capacity at which the room is shown as busy.
pub const DEFAULT_BUSY_THRESHOLD_PERCENT: u8 = 75;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {0}")]
    NotFound(String),

    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// File that failed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("failed to write {path}: {source}")]
    WriteError {
        /// File that failed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field holds an invalid value.
    #[error("invalid {field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields are invalid.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Specialized result for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Timezone used when showing timestamps to the operator.
    #[serde(with = "timezone_serde")]
    pub timezone: Tz,

    /// Durable store settings.
    pub store: StoreConfig,

    /// The tracked room.
    pub room: RoomConfig,

    /// Card reader settings.
    pub reader: ReaderConfig,
}

/// Durable store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file. Relative paths resolve against the working directory.
    pub path: PathBuf,
}

/// The tracked room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Identifier written into member and action records.
    pub id: u32,

    /// Maximum simultaneous occupancy.
    pub capacity: u32,

    /// Occupancy, as a percentage of capacity, from which the room shows as busy.
    pub busy_threshold_percent: u8,
}

/// Card reader settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Line-oriented reader device (serial port or HID node).
    /// Scans are read from stdin when unset.
    pub device: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            store: StoreConfig::default(),
            room: RoomConfig::default(),
            reader: ReaderConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            id: 1,
            capacity: DEFAULT_CAPACITY,
            busy_threshold_percent: DEFAULT_BUSY_THRESHOLD_PERCENT,
        }
    }
}

impl RoomConfig {
    /// The configured room as a [`RoomId`].
    #[inline]
    #[must_use]
    pub const fn room_id(&self) -> RoomId {
        RoomId(self.id)
    }
}

impl StoreConfig {
    /// Absolute path of the store file.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be determined.
    pub fn resolved_path(&self) -> std::io::Result<PathBuf> {
        if self.path.is_absolute() {
            Ok(self.path.clone())
        } else {
            Ok(std::env::current_dir()?.join(&self.path))
        }
    }
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, malformed, or
    /// fails validation.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read, parsed, or
    /// validated.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        match Self::load(path) {
            Err(ConfigError::NotFound(path)) => {
                tracing::debug!(%path, "no configuration file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be serialized or written.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::WriteError {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)?;
        Ok(())
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a single problem and
    /// [`ConfigError::MultipleValidationErrors`] for several.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.store.path.as_os_str().is_empty() {
            errors.push(invalid("store.path", "must not be empty"));
        }
        if self.room.id == 0 {
            errors.push(invalid("room.id", "must be at least 1"));
        }
        if self.room.capacity == 0 {
            errors.push(invalid("room.capacity", "must be at least 1"));
        }
        if !(1..=100).contains(&self.room.busy_threshold_percent) {
            errors.push(invalid(
                "room.busy_threshold_percent",
                "must be between 1 and 100",
            ));
        }
        if let Some(device) = &self.reader.device {
            if device.as_os_str().is_empty() {
                errors.push(invalid("reader.device", "must not be empty when set"));
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Default location of the configuration file.
///
/// On Linux: `~/.config/cohort/config.toml`. Falls back to `./cohort.toml`
/// when no home directory is available.
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "cohort").map_or_else(
        || PathBuf::from("cohort.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

mod timezone_serde {
    use chrono_tz::Tz;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Tz, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
