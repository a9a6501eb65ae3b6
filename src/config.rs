// Storage path configuration
//
// The database location is an explicit value handed to the store at
// construction time. Resolution order: --db flag, CLINANCIAL_DB, then
// <config dir>/clinancial/clinancial.db.

use crate::error::{LedgerError, Result};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the default database path
pub const DB_PATH_ENV: &str = "CLINANCIAL_DB";

pub const APP_DIR: &str = "clinancial";
pub const DB_FILE: &str = "clinancial.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Use an explicit database path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Config {
            db_path: path.into(),
        }
    }

    /// Resolve the path from the environment, falling back to the default
    /// location under the user's config directory.
    pub fn from_env() -> Result<Self> {
        Self::resolve(std::env::var_os(DB_PATH_ENV).map(PathBuf::from))
    }

    /// Resolve with an optional override (CLI flag or environment value)
    pub fn resolve(override_path: Option<PathBuf>) -> Result<Self> {
        match override_path {
            Some(path) if !path.as_os_str().is_empty() => Ok(Self::with_path(path)),
            _ => Ok(Self::with_path(default_db_path()?)),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// `{config_dir}/clinancial/clinancial.db`, with `$HOME/.config` as fallback
pub fn default_db_path() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".config");
                h
            })
        })
        .ok_or_else(|| {
            LedgerError::Config(
                "failed to resolve a config directory - tried config_dir() and home_dir()/.config"
                    .to_string(),
            )
        })?;

    let mut path = base;
    path.push(APP_DIR);
    path.push(DB_FILE);
    Ok(path)
}
