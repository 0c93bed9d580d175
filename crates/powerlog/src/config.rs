// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::lock::AdvisoryLock;
use crate::paths::DataDir;
use crate::recovery::DEFAULT_THRESHOLD_SECS;

/// Output format for the tracing subscriber.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Text => f.write_str("text"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => anyhow::bail!("invalid log format: {other}"),
        }
    }
}

/// Telemetry writer daemon: records battery, screen-lock and key events.
#[derive(Debug, Parser)]
#[command(name = "powerlogd", version, about)]
pub struct Config {
    /// Data directory holding the logs and markers.
    #[arg(long, env = "POWERLOG_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Named pipe the collaborators write events to.
    #[arg(long, env = "POWERLOG_EVENTS")]
    pub events: Option<PathBuf>,

    /// Outage length after which an unlocked interval is closed on restart.
    #[arg(long, env = "POWERLOG_RECOVERY_THRESHOLD_SECS", default_value_t = DEFAULT_THRESHOLD_SECS)]
    pub recovery_threshold_secs: u32,

    /// Seconds between flushes of buffered battery and key data.
    #[arg(long, env = "POWERLOG_FLUSH_INTERVAL_SECS", default_value = "60")]
    pub flush_interval_secs: u64,

    /// Time allowed for the final flush on SIGTERM/SIGINT.
    #[arg(long, env = "POWERLOG_SHUTDOWN_GRACE_MS", default_value = "3000")]
    pub shutdown_grace_ms: u64,

    /// Advisory lock retries at startup.
    #[arg(long, env = "POWERLOG_LOCK_RETRIES", default_value = "5")]
    pub lock_retries: u32,

    /// Initial backoff between advisory lock attempts.
    #[arg(long, env = "POWERLOG_LOCK_BACKOFF_MS", default_value = "50")]
    pub lock_backoff_ms: u64,

    /// Log format (json or text).
    #[arg(long, env = "POWERLOG_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "POWERLOG_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Delay before recreating the event pipe after a read failure.
    #[arg(long, env = "POWERLOG_REOPEN_DELAY_MS", default_value = "1000")]
    pub reopen_delay_ms: u64,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.recovery_threshold_secs == 0 {
            anyhow::bail!("--recovery-threshold-secs must be greater than zero");
        }
        if self.flush_interval_secs == 0 {
            anyhow::bail!("--flush-interval-secs must be greater than zero");
        }
        if self.shutdown_grace_ms == 0 {
            anyhow::bail!("--shutdown-grace-ms must be greater than zero");
        }
        if self.lock_retries == 0 {
            anyhow::bail!("--lock-retries must be greater than zero");
        }
        if self.lock_backoff_ms == 0 {
            anyhow::bail!("--lock-backoff-ms must be greater than zero");
        }
        self.log_format()?;
        Ok(())
    }

    pub fn data_dir(&self) -> DataDir {
        DataDir::new(self.data_dir.clone().unwrap_or_else(DataDir::default_root))
    }

    /// The `--events` path, or `events.fifo` inside the data directory.
    pub fn events_path(&self) -> PathBuf {
        self.events.clone().unwrap_or_else(|| self.data_dir().events_fifo())
    }

    pub fn log_format(&self) -> anyhow::Result<LogFormat> {
        self.log_format.parse()
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Advisory lock handle configured with the retry policy.
    pub fn lock(&self) -> AdvisoryLock {
        self.data_dir()
            .lock()
            .with_retries(self.lock_retries, Duration::from_millis(self.lock_backoff_ms))
    }

    pub fn reopen_delay(&self) -> Duration {
        Duration::from_millis(self.reopen_delay_ms)
    }

    /// Build a `Config` for tests rooted at `root`.
    #[doc(hidden)]
    pub fn test(root: &Path) -> Self {
        Self {
            data_dir: Some(root.to_path_buf()),
            events: Some(root.join("events.fifo")),
            recovery_threshold_secs: DEFAULT_THRESHOLD_SECS,
            flush_interval_secs: 1,
            shutdown_grace_ms: 500,
            lock_retries: 2,
            lock_backoff_ms: 10,
            log_format: "text".into(),
            log_level: "debug".into(),
            reopen_delay_ms: 10,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
