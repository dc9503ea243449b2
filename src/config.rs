use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use ucikit::backend::uci::{FALLBACK_DIRS, UciOptions};

use crate::cli::ToolArgs;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(dir.join("ucistate"))
}

/// Get the default config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Settings for locating and invoking uci
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the uci binary; searched for when unset
    pub binary: Option<String>,
    /// Alternative configuration directory (`uci -c`)
    pub confdir: Option<String>,
    /// Directories searched after PATH (default: /sbin, /bin)
    pub search_paths: Vec<String>,
}

impl Config {
    /// Load the config file.
    ///
    /// An explicitly given file must exist; a missing default file means
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let path = match config_path() {
            Ok(path) => path,
            Err(e) => {
                log::debug!("no config directory: {e}");
                return Ok(Self::default());
            }
        };

        if path.exists() {
            Self::from_file(&path)
        } else {
            log::debug!("{} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Merge with command-line overrides into backend options
    pub fn uci_options(&self, overrides: &ToolArgs) -> UciOptions {
        let search_paths = if self.search_paths.is_empty() {
            FALLBACK_DIRS.iter().map(PathBuf::from).collect()
        } else {
            self.search_paths.iter().map(|p| expand(p)).collect()
        };

        UciOptions {
            binary: overrides
                .binary
                .clone()
                .or_else(|| self.binary.as_deref().map(expand)),
            confdir: overrides
                .confdir
                .clone()
                .or_else(|| self.confdir.as_deref().map(expand)),
            search_paths,
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
