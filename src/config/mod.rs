// Yatube - A blog with groups, comments and author subscriptions
// Copyright (C) 2025 Yatube Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Runtime configuration
//!
//! Values come from a JSON file (`$YATUBE_CONFIG`, or `config.json` in the
//! Yatube data directory), overridden by `YATUBE_<FIELD>` environment
//! variables such as `YATUBE_PAGE_SIZE`. Missing keys fall back to defaults.

use ::config::{Environment, File, FileFormat, Source};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Environment variable naming an explicit config file
const CONFIG_ENV: &str = "YATUBE_CONFIG";

/// Prefix of the override variables
const ENV_PREFIX: &str = "YATUBE";

/// Unix socket path
#[cfg(not(windows))]
const DEFAULT_SOCKET: &str = "/tmp/yatube_ipc.sock";

#[cfg(windows)]
const DEFAULT_SOCKET: &str = r"\\.\pipe\yatube_ipc";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Posts per page, shared by every listing view
    pub page_size: usize,

    /// How long the home timeline stays cached, in seconds
    pub index_cache_ttl_secs: u64,

    /// Entries the home timeline cache holds before evicting
    pub index_cache_max_entries: usize,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Maximum pooled database connections
    pub db_max_connections: u32,

    /// Socket the IPC server listens on
    pub socket_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: 10,
            index_cache_ttl_secs: 20,
            index_cache_max_entries: 300,
            database_path: data_dir().join("yatube.db"),
            db_max_connections: 5,
            socket_path: DEFAULT_SOCKET.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default locations and the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("config.json"));

        let file = File::from(path.as_path())
            .format(FileFormat::Json)
            .required(false);
        let config = Self::from_sources(file, Environment::with_prefix(ENV_PREFIX))
            .with_context(|| format!("Failed to load configuration ({})", path.display()))?;

        info!(
            page_size = config.page_size,
            cache_ttl_secs = config.index_cache_ttl_secs,
            database = %config.database_path.display(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Layer the environment over a file source, then validate
    pub fn from_sources<S>(file: S, env: Environment) -> Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let config: Self = ::config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Invalid configuration value")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the system cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        if self.index_cache_max_entries == 0 {
            bail!("index_cache_max_entries must be at least 1");
        }
        if self.db_max_connections == 0 {
            bail!("db_max_connections must be at least 1");
        }
        Ok(())
    }

    /// Home timeline cache window
    pub fn index_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.index_cache_ttl_secs)
    }

    /// SQLite connection URL for the configured database file
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database_path.display())
    }
}

/// Get the Yatube data directory
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Yatube")
}
