// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed append-only store, one file per record kind.
//!
//! Records are appended as raw fixed-width bytes. Reads are positional:
//! record `i` lives at `i * R::SIZE`, the last record at `len - R::SIZE`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::LogError;
use crate::record::{encode_all, Record};

/// Append-only log of `R` records.
///
/// Only the writer daemon appends. The compactor replaces the whole file by
/// rename while holding the advisory lock; it never truncates in place.
#[derive(Debug, Clone)]
pub struct AppendStore<R> {
    path: PathBuf,
    _kind: PhantomData<R>,
}

impl<R: Record> AppendStore<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), _kind: PhantomData }
    }

    /// Store at the kind's conventional file name inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(R::KIND.file_name()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty log if none exists. Safe to call on every start.
    pub fn create_if_missing(&self) -> Result<(), LogError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LogError::io(&self.path, e))?;
        Ok(())
    }

    /// Append `records` in one write and force them to stable storage.
    pub fn append(&self, records: &[R]) -> Result<(), LogError> {
        if records.is_empty() {
            return Ok(());
        }
        self.append_encoded(&encode_all(records))
    }

    /// Append pre-encoded bytes (a whole number of records).
    ///
    /// On failure the file is cut back to its previous length so a partial
    /// write never survives as a torn record; the caller must not advance
    /// any marker.
    pub fn append_encoded(&self, bytes: &[u8]) -> Result<(), LogError> {
        if bytes.len() % R::SIZE != 0 {
            return Err(LogError::CorruptFile {
                path: self.path.clone(),
                len: bytes.len() as u64,
                record_size: R::SIZE,
            });
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LogError::io(&self.path, e))?;
        let before = file.metadata().map_err(|e| LogError::io(&self.path, e))?.len();

        let result = file.write_all(bytes).and_then(|()| file.sync_data());
        if let Err(e) = result {
            if let Err(trunc) = file.set_len(before).and_then(|()| file.sync_data()) {
                warn!(path = %self.path.display(), "rollback after failed append failed: {trunc}");
            }
            return Err(LogError::io(&self.path, e));
        }
        debug!(kind = %R::KIND, bytes = bytes.len(), "appended");
        Ok(())
    }

    /// Current file length in bytes; a missing file counts as empty.
    pub fn len_bytes(&self) -> Result<u64, LogError> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(LogError::io(&self.path, e)),
        }
    }

    /// Number of whole records in the file.
    pub fn record_count(&self) -> Result<u64, LogError> {
        Ok(self.len_bytes()? / R::SIZE as u64)
    }

    /// Read the last record.
    ///
    /// `Ok(None)` if the file holds less than one record. A length that is
    /// not a whole number of records, or an undecodable tail, is reported as
    /// [`LogError::CorruptFile`] rather than guessed at.
    pub fn read_last(&self) -> Result<Option<R>, LogError> {
        let len = self.len_bytes()?;
        let size = R::SIZE as u64;
        if len < size {
            return Ok(None);
        }
        if len % size != 0 {
            return Err(self.corrupt(len));
        }
        let buf = self.read_exact_at(len - size)?;
        R::decode(&buf, 0).map(Some).ok_or_else(|| self.corrupt(len))
    }

    /// Random-access read of record `index`.
    pub fn read_record_at(&self, index: u64) -> Result<R, LogError> {
        let count = self.record_count()?;
        if index >= count {
            return Err(LogError::IndexOutOfBounds { index, count });
        }
        let buf = self.read_exact_at(index * R::SIZE as u64)?;
        R::decode(&buf, 0).ok_or_else(|| self.corrupt(index * R::SIZE as u64))
    }

    /// Read and decode every record.
    pub fn read_all(&self) -> Result<Vec<R>, LogError> {
        let bytes = self.read_bytes()?;
        if bytes.len() % R::SIZE != 0 {
            return Err(self.corrupt(bytes.len() as u64));
        }
        (0..bytes.len() / R::SIZE)
            .map(|i| R::decode(&bytes, i * R::SIZE).ok_or_else(|| self.corrupt(bytes.len() as u64)))
            .collect()
    }

    /// Raw file contents; a missing file reads as empty.
    pub fn read_bytes(&self) -> Result<Vec<u8>, LogError> {
        match std::fs::read(&self.path) {
            Ok(b) => Ok(b),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(LogError::io(&self.path, e)),
        }
    }

    fn read_exact_at(&self, offset: u64) -> Result<Vec<u8>, LogError> {
        let mut file = File::open(&self.path).map_err(|e| LogError::io(&self.path, e))?;
        file.seek(SeekFrom::Start(offset)).map_err(|e| LogError::io(&self.path, e))?;
        let mut buf = vec![0u8; R::SIZE];
        file.read_exact(&mut buf).map_err(|e| LogError::io(&self.path, e))?;
        Ok(buf)
    }

    fn corrupt(&self, len: u64) -> LogError {
        LogError::CorruptFile { path: self.path.clone(), len, record_size: R::SIZE }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
