// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dated backup copies of the logs and the key counter.
//!
//! Layout inside the backup directory:
//! - `<Kind>Log_<YYYY-MM-DD>`: one per day, first write wins.
//! - `KeyFrequency_<YYYY-MM-DD>.json`: refreshed on the same day, kept forever.
//!
//! Binary archives of other dates are pruned once today's copy exists.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::clock::date_stamp;
use crate::error::LogError;
use crate::record::LogKind;

const JSON_SNAPSHOT_STEM: &str = "KeyFrequency";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    Created,
    /// Today's copy already existed and was left alone.
    AlreadyPresent,
    /// Nothing to archive.
    SourceMissing,
}

#[derive(Debug, Clone)]
pub struct Archiver {
    backup_dir: PathBuf,
    date: NaiveDate,
}

impl Archiver {
    pub fn new(backup_dir: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self { backup_dir: backup_dir.into(), date }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn ensure(&self) -> Result<(), LogError> {
        std::fs::create_dir_all(&self.backup_dir).map_err(|e| LogError::io(&self.backup_dir, e))
    }

    pub fn log_archive_path(&self, kind: LogKind) -> PathBuf {
        self.backup_dir.join(format!("{}_{}", kind.file_name(), date_stamp(self.date)))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.backup_dir.join(format!("{JSON_SNAPSHOT_STEM}_{}.json", date_stamp(self.date)))
    }

    /// Copy a log to today's archive name unless it is already there.
    pub fn archive_log(&self, kind: LogKind, source: &Path) -> Result<ArchiveOutcome, LogError> {
        if !source.exists() {
            return Ok(ArchiveOutcome::SourceMissing);
        }
        let dest = self.log_archive_path(kind);
        if dest.exists() {
            debug!(kind = %kind, dest = %dest.display(), "archive already present");
            return Ok(ArchiveOutcome::AlreadyPresent);
        }
        copy_then_rename(source, &dest)?;
        info!(kind = %kind, dest = %dest.display(), "archived log");
        Ok(ArchiveOutcome::Created)
    }

    /// Copy the key counter verbatim to today's snapshot, replacing an
    /// earlier snapshot from the same day.
    pub fn snapshot_json(&self, source: &Path) -> Result<ArchiveOutcome, LogError> {
        if !source.exists() {
            return Ok(ArchiveOutcome::SourceMissing);
        }
        let dest = self.snapshot_path();
        copy_then_rename(source, &dest)?;
        debug!(dest = %dest.display(), "key counter snapshot written");
        Ok(ArchiveOutcome::Created)
    }

    /// Remove binary archives of `kind` from other dates.
    ///
    /// Does nothing unless today's archive exists. Returns the removed paths.
    pub fn prune(&self, kind: LogKind) -> Result<Vec<PathBuf>, LogError> {
        if !self.log_archive_path(kind).exists() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}_", kind.file_name());
        let today = date_stamp(self.date);
        let entries =
            std::fs::read_dir(&self.backup_dir).map_err(|e| LogError::io(&self.backup_dir, e))?;

        let mut removed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LogError::io(&self.backup_dir, e))?;
            let name = entry.file_name();
            let Some(stamp) = name.to_str().and_then(|n| n.strip_prefix(&prefix)) else {
                continue;
            };
            if stamp == today || NaiveDate::parse_from_str(stamp, "%Y-%m-%d").is_err() {
                continue;
            }
            let path = entry.path();
            std::fs::remove_file(&path).map_err(|e| LogError::io(&path, e))?;
            info!(path = %path.display(), "pruned old archive");
            removed.push(path);
        }
        Ok(removed)
    }
}

/// `fs::copy` into a hidden temp name next to `dest`, then rename, so a
/// reader never sees a half-copied archive.
fn copy_then_rename(source: &Path, dest: &Path) -> Result<(), LogError> {
    let file_name = dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp = dest.with_file_name(format!(".{file_name}.partial"));
    if let Err(e) = std::fs::copy(source, &tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(LogError::io(source, e));
    }
    std::fs::rename(&tmp, dest).map_err(|e| LogError::io(dest, e))
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
