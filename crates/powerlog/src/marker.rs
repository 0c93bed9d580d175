// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-index markers (`LastLogTime`, `LastBackupTime`).
//!
//! A marker is a little-endian u32 timestamp held in the trailing 4 bytes
//! of a small file. Writes replace the whole file via temp-file + rename so
//! readers never see a torn value.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LogError;

#[derive(Debug, Clone)]
pub struct Marker {
    path: PathBuf,
}

impl Marker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored timestamp, or `None` when the file is missing, shorter
    /// than 4 bytes, or unreadable.
    pub fn read_opt(&self) -> Option<u32> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %self.path.display(), "marker unreadable: {e}");
                }
                return None;
            }
        };
        let tail = bytes.len().checked_sub(4).and_then(|start| bytes.get(start..))?;
        tail.try_into().ok().map(u32::from_le_bytes)
    }

    /// The stored timestamp, defaulting to 0.
    pub fn read(&self) -> u32 {
        self.read_opt().unwrap_or(0)
    }

    /// Atomically replace the marker with `value`.
    pub fn write(&self, value: u32) -> Result<(), LogError> {
        write_atomic(&self.path, &value.to_le_bytes())
    }
}

/// Replace `path` with `bytes` via a synced temp file in the same directory
/// and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), LogError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| LogError::io(path, e))?;
    tmp.write_all(bytes).map_err(|e| LogError::io(tmp.path(), e))?;
    tmp.as_file().sync_data().map_err(|e| LogError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| LogError::io(path, e.error))?;
    Ok(())
}

/// Marker that never moves backward within one process lifetime.
#[derive(Debug)]
pub struct MarkerWriter {
    marker: Marker,
    last: u32,
}

impl MarkerWriter {
    /// Start from whatever value is on disk.
    pub fn open(marker: Marker) -> Self {
        let last = marker.read();
        Self { marker, last }
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    /// Write `max(value, last)`. Returns the value now on disk.
    pub fn advance(&mut self, value: u32) -> Result<u32, LogError> {
        let next = value.max(self.last);
        self.marker.write(next)?;
        self.last = next;
        Ok(next)
    }
}

#[cfg(test)]
#[path = "marker_tests.rs"]
mod tests;
