//! Application state built from the command line and configuration file.

use std::path::PathBuf;

use cohort_core::{default_config_path, CohortError, Config, LineReader, Store};
use tracing::info;

use crate::cli::Cli;

/// Everything a command needs: resolved configuration and an open store.
#[derive(Debug)]
pub struct AppState {
    /// Configuration file that was consulted.
    pub config_path: PathBuf,
    /// Effective configuration, command line overrides applied.
    pub config: Config,
    /// Open member and action store.
    pub store: Store,
}

impl AppState {
    /// Resolve configuration and open the store.
    ///
    /// An explicit `--config` must exist; the default location may be absent.
    ///
    /// # Errors
    ///
    /// Returns a [`CohortError`] if the configuration is missing, malformed or
    /// invalid, or if the store cannot be opened.
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config = load_config(cli)?;
        let config_path = cli.config.clone().unwrap_or_else(default_config_path);

        let db_path = config.store.resolved_path().map_err(CohortError::from)?;
        let store = Store::open(&db_path).map_err(CohortError::from)?;
        info!(config = %config_path.display(), store = %db_path.display(), "state ready");

        Ok(Self {
            config_path,
            config,
            store,
        })
    }

    /// Open the configured card reader, stdin when no device is set.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::HardwareFailure`] if the device cannot be opened.
    pub fn open_reader(&self) -> anyhow::Result<LineReader> {
        Ok(LineReader::from_config(&self.config.reader).map_err(CohortError::from)?)
    }
}

/// Read the configuration file and apply command line overrides.
///
/// # Errors
///
/// Returns a [`CohortError`] if the file cannot be loaded or the result is
/// invalid.
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::load_or_default(default_config_path()),
    }
    .map_err(CohortError::from)?;

    if let Some(path) = &cli.db_path {
        config.store.path.clone_from(path);
    }
    if let Some(device) = &cli.device {
        config.reader.device = Some(device.clone());
    }
    config.validate().map_err(CohortError::from)?;

    Ok(config)
}
