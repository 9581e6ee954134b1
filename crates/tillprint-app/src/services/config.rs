// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loading and persisting the service configuration.

use std::path::{Path, PathBuf};

use tillprint_core::config::ServiceConfig;
use tillprint_core::error::{Result, TillprintError};
use tracing::{info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

/// Path of the config file, overriding `<data_dir>/config.json`.
pub const CONFIG_ENV: &str = "TILLPRINT_CONFIG";

/// Overrides `listen_addr`.
pub const LISTEN_ENV: &str = "TILLPRINT_LISTEN";

/// Configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ServiceConfig,
    pub path: PathBuf,
    /// Effective data directory after environment overrides.
    pub data_dir: PathBuf,
}

/// Load the configuration for this process.
pub fn load() -> Result<LoadedConfig> {
    let path = match std::env::var(CONFIG_ENV) {
        Ok(path) => PathBuf::from(path),
        Err(_) => data_dir::default_data_dir().join(CONFIG_FILE),
    };
    let mut config = load_from(&path)?;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    let data_dir = data_dir::resolve(config.data_dir.as_deref());

    Ok(LoadedConfig {
        config,
        path,
        data_dir,
    })
}

/// Read `path`, or write the defaults there if it does not exist yet.
///
/// A file that exists but does not parse is an error; a failed write-back of
/// the defaults is only logged.
pub fn load_from(path: &Path) -> Result<ServiceConfig> {
    match std::fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data)
            .map_err(|e| TillprintError::Config(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = ServiceConfig::default();
            match persist(path, &config) {
                Ok(()) => info!(path = %path.display(), "wrote default configuration"),
                Err(e) => warn!(path = %path.display(), error = %e, "could not write default configuration"),
            }
            Ok(config)
        }
        Err(e) => Err(TillprintError::Config(format!("{}: {e}", path.display()))),
    }
}

pub fn persist(path: &Path, config: &ServiceConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Apply single-field environment overrides.
pub fn apply_overrides(config: &mut ServiceConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(listen) = lookup(LISTEN_ENV) {
        config.listen_addr = listen;
    }
    if let Some(dir) = lookup(data_dir::DATA_DIR_ENV) {
        config.data_dir = Some(PathBuf::from(dir));
    }
}
