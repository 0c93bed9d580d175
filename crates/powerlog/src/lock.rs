// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process advisory lock backed by `flock(2)` on a dedicated file.
//!
//! The lock is cooperative: it only excludes processes that also take it.
//! The compactor holds it for its whole read-repair-replace sequence; the
//! writer holds it while appending so a rename cannot discard its bytes.
//! The kernel drops the lock when the holder dies, so a killed process
//! never leaves it stuck.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use tracing::{debug, warn};

use crate::error::LogError;

const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Handle describing how to take the lock. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AdvisoryLock {
    path: PathBuf,
    retries: u32,
    backoff: Duration,
}

/// Proof that the advisory lock is held. Released on drop.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    inner: Option<Flock<File>>,
}

impl AdvisoryLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), retries: 5, backoff: Duration::from_millis(50) }
    }

    /// Number of retries after the first attempt, and the initial sleep
    /// between attempts (doubled each time, capped at 2s).
    pub fn with_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries;
        self.backoff = backoff;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the lock if it is free right now.
    pub fn try_acquire(&self) -> Result<Option<LockGuard>, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .map_err(|e| LogError::io(&self.path, e))?;
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => {
                debug!(path = %self.path.display(), "advisory lock acquired");
                Ok(Some(LockGuard { path: self.path.clone(), inner: Some(flock) }))
            }
            Err((_file, Errno::EWOULDBLOCK)) => Ok(None),
            Err((_file, errno)) => Err(LogError::io(&self.path, errno.into())),
        }
    }

    /// Take the lock, sleeping with exponential backoff between attempts.
    ///
    /// Fails with [`LogError::LockTimeout`] once every retry is spent.
    pub fn acquire(&self) -> Result<LockGuard, LogError> {
        let attempts = self.retries.saturating_add(1);
        let mut delay = self.backoff;
        for attempt in 1..=attempts {
            if let Some(guard) = self.try_acquire()? {
                return Ok(guard);
            }
            if attempt < attempts {
                debug!(path = %self.path.display(), attempt, "advisory lock busy, retrying");
                std::thread::sleep(delay);
                delay = (delay * 2).min(MAX_BACKOFF);
            }
        }
        Err(LogError::LockTimeout { path: self.path.clone(), attempts })
    }

    /// Like [`acquire`](Self::acquire), but gives up once `budget` has
    /// elapsed instead of after a fixed number of retries.
    pub fn acquire_within(&self, budget: Duration) -> Result<LockGuard, LogError> {
        let deadline = Instant::now() + budget;
        let mut delay = self.backoff;
        let mut attempts = 0;
        loop {
            attempts += 1;
            if let Some(guard) = self.try_acquire()? {
                return Ok(guard);
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(LogError::LockTimeout { path: self.path.clone(), attempts });
            }
            std::thread::sleep(delay.min(left));
            delay = (delay * 2).min(MAX_BACKOFF);
        }
    }
}

impl LockGuard {
    pub fn is_held(&self) -> bool {
        self.inner.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock. Calling it again is a no-op.
    pub fn release(&mut self) -> Result<(), LogError> {
        let Some(flock) = self.inner.take() else {
            return Ok(());
        };
        match flock.unlock() {
            Ok(_file) => {
                debug!(path = %self.path.display(), "advisory lock released");
                Ok(())
            }
            // Dropping the returned guard closes the fd, which releases the
            // lock anyway.
            Err((_flock, errno)) => Err(LogError::io(&self.path, errno.into())),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{e}");
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
