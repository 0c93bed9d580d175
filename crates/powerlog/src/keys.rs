// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key press frequency counter, persisted as a sorted JSON object.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LogError;
use crate::marker::write_atomic;

/// Key identifier as delivered by the keyboard tap: a name or a raw code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyId {
    Name(String),
    Code(i64),
}

impl KeyId {
    pub fn as_key(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Code(code) => code.to_string(),
        }
    }
}

/// In-memory counts plus the file they are flushed to.
///
/// Counts only ever grow. The file is rewritten wholesale, never appended.
#[derive(Debug)]
pub struct KeyCounter {
    path: PathBuf,
    counts: BTreeMap<String, u64>,
    dirty: bool,
}

impl KeyCounter {
    /// Load counts from `path`. A missing file starts empty; an unreadable
    /// or malformed one is logged and also starts empty.
    pub fn load(path: &Path) -> Self {
        let counts = match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), "ignoring malformed key counts: {e}");
                BTreeMap::new()
            }),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), "ignoring unreadable key counts: {e}");
                }
                BTreeMap::new()
            }
        };
        Self { path: path.to_path_buf(), counts, dirty: false }
    }

    pub fn record(&mut self, key: &KeyId) {
        let count = self.counts.entry(key.as_key()).or_insert(0);
        *count = count.saturating_add(1);
        self.dirty = true;
    }

    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().fold(0u64, |acc, &n| acc.saturating_add(n))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rewrite the file if anything changed since the last flush.
    pub fn flush(&mut self) -> Result<bool, LogError> {
        if !self.dirty {
            return Ok(false);
        }
        let json = serde_json::to_string_pretty(&self.counts)
            .map_err(|e| LogError::io(&self.path, e.into()))?;
        write_atomic(&self.path, json.as_bytes())?;
        self.dirty = false;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
