// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout of the data directory shared by the writer daemon and the
//! maintenance process.

use std::path::{Path, PathBuf};

use crate::error::LogError;
use crate::lock::AdvisoryLock;
use crate::marker::Marker;
use crate::record::{LogKind, Record};
use crate::store::AppendStore;

pub const LAST_LOG_TIME: &str = "LastLogTime";
pub const LAST_BACKUP_TIME: &str = "LastBackupTime";
pub const KEY_FREQUENCY: &str = "KeyFrequency.json";
pub const LOCK_FILE: &str = "powerlog.lock";
pub const EVENTS_FIFO: &str = "events.fifo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$HOME/.powerlog`, or `./.powerlog` when `HOME` is unset.
    pub fn default_root() -> PathBuf {
        std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default().join(".powerlog")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure(&self) -> Result<(), LogError> {
        std::fs::create_dir_all(&self.root).map_err(|e| LogError::io(&self.root, e))
    }

    pub fn store<R: Record>(&self) -> AppendStore<R> {
        AppendStore::in_dir(&self.root)
    }

    pub fn log_path(&self, kind: LogKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn last_log_time(&self) -> Marker {
        Marker::new(self.root.join(LAST_LOG_TIME))
    }

    pub fn last_backup_time(&self) -> Marker {
        Marker::new(self.root.join(LAST_BACKUP_TIME))
    }

    pub fn key_frequency(&self) -> PathBuf {
        self.root.join(KEY_FREQUENCY)
    }

    pub fn lock(&self) -> AdvisoryLock {
        AdvisoryLock::new(self.root.join(LOCK_FILE))
    }

    pub fn events_fifo(&self) -> PathBuf {
        self.root.join(EVENTS_FIFO)
    }
}
