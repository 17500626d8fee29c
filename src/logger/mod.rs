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

//! Logging setup
//!
//! Console output on stderr plus a rolling JSON log file. `RUST_LOG`
//! overrides the default filter.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config;

/// Logger configuration
pub struct LoggerConfig {
    /// Log directory path
    pub log_dir: PathBuf,
    /// Log file prefix
    pub file_prefix: String,
    /// Maximum log level
    pub level: Level,
    /// Whether to log to console
    pub console_output: bool,
    /// Whether to log to file
    pub file_output: bool,
    /// Log rotation strategy
    pub rotation: Rotation,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: config::data_dir().join("logs"),
            file_prefix: "yatube".to_string(),
            level: Level::INFO,
            console_output: true,
            file_output: true,
            rotation: Rotation::DAILY,
        }
    }
}

impl LoggerConfig {
    fn filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }

        let directives = format!(
            "yatube_core={level},ipc={level},query={level},cache={level}",
            level = self.level
        );
        let sqlx: Directive = "sqlx=warn".parse().context("Invalid sqlx log directive")?;

        Ok(EnvFilter::new(directives).add_directive(sqlx))
    }
}

/// Main logger struct
pub struct Logger;

impl Logger {
    /// Initialize the logging system with default configuration
    pub fn init() -> Result<()> {
        Self::init_with_config(LoggerConfig::default())
    }

    /// Initialize the logging system with custom configuration
    pub fn init_with_config(config: LoggerConfig) -> Result<()> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

        if config.file_output {
            std::fs::create_dir_all(&config.log_dir).with_context(|| {
                format!("Failed to create log directory {}", config.log_dir.display())
            })?;

            let file_appender = RollingFileAppender::new(
                config.rotation.clone(),
                &config.log_dir,
                &config.file_prefix,
            );

            layers.push(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .json()
                    .boxed(),
            );
        }

        if config.console_output {
            layers.push(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .boxed(),
            );
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(config.filter()?)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        Ok(())
    }
}

/// Macro for logging IPC messages
#[macro_export]
macro_rules! log_ipc {
    (request, $method:expr, $id:expr) => {
        tracing::debug!(
            target: "ipc",
            direction = "request",
            method = $method,
            id = $id,
            "IPC request received"
        )
    };
    (response, $method:expr, $id:expr, $success:expr) => {
        tracing::debug!(
            target: "ipc",
            direction = "response",
            method = $method,
            id = $id,
            success = $success,
            "IPC response sent"
        )
    };
}

/// Macro for logging listing queries with their result size
#[macro_export]
macro_rules! log_query {
    ($view:expr, $rows:expr, $duration:expr) => {
        tracing::debug!(
            target: "query",
            view = %$view,
            rows = $rows,
            duration_ms = $duration,
            "Listing query completed"
        )
    };
}

/// Macro for logging home timeline cache activity
#[macro_export]
macro_rules! log_cache {
    (hit, $key:expr) => {
        tracing::trace!(target: "cache", event = "hit", key = $key, "Cache hit")
    };
    (miss, $key:expr) => {
        tracing::trace!(target: "cache", event = "miss", key = $key, "Cache miss")
    };
    (cleared) => {
        tracing::info!(target: "cache", event = "cleared", "Cache cleared")
    };
}
