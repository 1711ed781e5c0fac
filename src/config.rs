use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Core configuration. Loaded from a TOML file or built with `Default`
/// by embedding applications.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the database file.
    pub data_dir: PathBuf,
    /// Default checkout window in days, used when a caller does not
    /// supply one.
    pub default_due_in_days: u32,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("quartermaster.db")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            default_due_in_days: 14,
        }
    }
}
