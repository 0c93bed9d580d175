// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::time::Duration;

use powerlog::compact::DEFAULT_PAIR_THRESHOLD_SECS;
use powerlog::lock::AdvisoryLock;
use powerlog::paths::DataDir;

/// Daily compaction and archival of the powerlog data directory.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "powerlog-maint", version, about)]
pub struct MaintConfig {
    /// Data directory shared with the writer daemon.
    #[arg(long, env = "POWERLOG_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Where dated archive copies are written.
    #[arg(long, env = "POWERLOG_BACKUP_DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Lock/unlock pairs closer than this are dropped as noise.
    #[arg(long, default_value_t = DEFAULT_PAIR_THRESHOLD_SECS, env = "POWERLOG_PAIR_THRESHOLD_SECS")]
    pub pair_threshold_secs: u32,

    /// Advisory lock retries before giving up for this cycle.
    #[arg(long, default_value_t = 10, env = "POWERLOG_MAINT_LOCK_RETRIES")]
    pub lock_retries: u32,

    /// Initial backoff between advisory lock attempts in milliseconds.
    #[arg(long, default_value_t = 100, env = "POWERLOG_MAINT_LOCK_BACKOFF_MS")]
    pub lock_backoff_ms: u64,

    /// Run even if a backup was already taken today.
    #[arg(long)]
    pub force: bool,
}

impl MaintConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.lock_retries == 0 {
            anyhow::bail!("--lock-retries must be greater than zero");
        }
        if self.lock_backoff_ms == 0 {
            anyhow::bail!("--lock-backoff-ms must be greater than zero");
        }
        Ok(())
    }

    pub fn data_dir(&self) -> DataDir {
        DataDir::new(self.data_dir.clone().unwrap_or_else(DataDir::default_root))
    }

    /// `--backup-dir`, or `backup` inside the data directory.
    pub fn backup_dir(&self) -> PathBuf {
        self.backup_dir.clone().unwrap_or_else(|| self.data_dir().root().join("backup"))
    }

    pub fn lock_backoff(&self) -> Duration {
        Duration::from_millis(self.lock_backoff_ms)
    }

    pub fn lock(&self) -> AdvisoryLock {
        self.data_dir().lock().with_retries(self.lock_retries, self.lock_backoff())
    }

    /// Build a `MaintConfig` for tests rooted at `root`.
    #[doc(hidden)]
    pub fn test(root: &Path) -> Self {
        Self {
            data_dir: Some(root.join("data")),
            backup_dir: Some(root.join("backup")),
            pair_threshold_secs: DEFAULT_PAIR_THRESHOLD_SECS,
            lock_retries: 1,
            lock_backoff_ms: 5,
            force: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
