// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Stable error codes reported in logs and by the maintenance process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    IoFailure,
    CorruptFile,
    LockTimeout,
    IndexOutOfBounds,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IoFailure => "IO_FAILURE",
            Self::CorruptFile => "CORRUPT_FILE",
            Self::LockTimeout => "LOCK_TIMEOUT",
            Self::IndexOutOfBounds => "INDEX_OUT_OF_BOUNDS",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the log engine.
///
/// None of these are fatal to the daemon: I/O failures are retried on the
/// next cycle, corruption is repaired by the compactor, and a lock timeout
/// aborts only the current maintenance run.
#[derive(Debug)]
pub enum LogError {
    /// Disk full, permission denied, missing directory, ...
    Io { path: PathBuf, source: io::Error },
    /// File length is not a multiple of the record size, or a record failed
    /// to decode.
    CorruptFile { path: PathBuf, len: u64, record_size: usize },
    /// The advisory lock stayed busy for every attempt.
    LockTimeout { path: PathBuf, attempts: u32 },
    /// Random-access read past the last record.
    IndexOutOfBounds { index: u64, count: u64 },
}

impl LogError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::IoFailure,
            Self::CorruptFile { .. } => ErrorCode::CorruptFile,
            Self::LockTimeout { .. } => ErrorCode::LockTimeout,
            Self::IndexOutOfBounds { .. } => ErrorCode::IndexOutOfBounds,
        }
    }

    /// Whether retrying on the next scheduled cycle can succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io { .. } | Self::LockTimeout { .. } => true,
            Self::CorruptFile { .. } | Self::IndexOutOfBounds { .. } => false,
        }
    }
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "{}: {}: {source}", self.code(), path.display())
            }
            Self::CorruptFile { path, len, record_size } => write!(
                f,
                "{}: {}: length {len} is not a whole number of {record_size}-byte records",
                self.code(),
                path.display()
            ),
            Self::LockTimeout { path, attempts } => write!(
                f,
                "{}: {}: still held after {attempts} attempts",
                self.code(),
                path.display()
            ),
            Self::IndexOutOfBounds { index, count } => {
                write!(f, "{}: record {index} requested, {count} available", self.code())
            }
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
