//! CLI configuration.
//!
//! Read from `./qail-hstore.toml` if present, otherwise from
//! `<config_dir>/qail-hstore/config.toml`. Command-line flags win over both.
//!
//! ```toml
//! database_url = "postgres://localhost/mydb"
//! type_name = "hstore"
//! format = "json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::driver::HSTORE_TYPE_NAME;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "qail-hstore.toml";

/// How the CLI prints decoded maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_url: Option<String>,
    pub type_name: Option<String>,
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Load the first config file found, or defaults if there is none.
    pub fn load() -> Result<Self> {
        match Self::locate() {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn locate() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        let global = dirs::config_dir()?.join("qail-hstore").join("config.toml");
        global.exists().then_some(global)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn type_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or(HSTORE_TYPE_NAME)
    }
}
