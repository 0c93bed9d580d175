// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fs::File;
use std::io::Read;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use tokio::io::unix::AsyncFd;
use tracing::debug;

use crate::clock::now_secs;
use crate::event::{parse_event_line, TimedEvent};

/// Longest partial line kept while waiting for its newline.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Receives collaborator events from a named pipe (FIFO).
///
/// The battery poller, lock-state observer and keyboard tap write JSON
/// lines to the pipe. Reads go through [`AsyncFd`] so they are cancellable
/// by `tokio::select!` and never park a thread on shutdown.
pub struct EventReceiver {
    pipe_path: PathBuf,
    async_fd: Option<AsyncFd<File>>,
    line_buf: Vec<u8>,
}

impl EventReceiver {
    /// Create the named pipe at `pipe_path` if it is not already one.
    pub fn new(pipe_path: &Path) -> anyhow::Result<Self> {
        let is_fifo =
            std::fs::metadata(pipe_path).map(|m| m.file_type().is_fifo()).unwrap_or(false);
        if !is_fifo {
            nix::unistd::mkfifo(pipe_path, Mode::from_bits_truncate(0o600))?;
        }
        Ok(Self {
            pipe_path: pipe_path.to_path_buf(),
            async_fd: None,
            line_buf: Vec::with_capacity(4096),
        })
    }

    pub fn pipe_path(&self) -> &Path {
        &self.pipe_path
    }

    /// Read the next event from the pipe.
    ///
    /// Returns `None` on EOF or unrecoverable error. Skips malformed lines.
    pub async fn next_event(&mut self) -> Option<TimedEvent> {
        self.ensure_fd().ok()?;

        loop {
            if let Some(event) = self.try_parse_line() {
                return Some(event);
            }

            let afd = self.async_fd.as_ref()?;
            let mut guard = afd.readable().await.ok()?;
            let mut buf = [0u8; 4096];
            match guard.try_io(|inner| inner.get_ref().read(&mut buf)) {
                Ok(Ok(0)) => return None,
                Ok(Ok(n)) => self.buffer(&buf[..n]),
                Ok(Err(_)) => return None,
                Err(_would_block) => continue,
            }
        }
    }

    /// Append bytes read from the pipe, discarding an unterminated line
    /// that has grown past [`MAX_LINE_BYTES`].
    fn buffer(&mut self, bytes: &[u8]) {
        self.line_buf.extend_from_slice(bytes);
        if self.line_buf.len() > MAX_LINE_BYTES && !self.line_buf.contains(&b'\n') {
            debug!(len = self.line_buf.len(), "discarding oversized event line");
            self.line_buf.clear();
        }
    }

    /// First well-formed event among the complete lines in the buffer.
    fn try_parse_line(&mut self) -> Option<TimedEvent> {
        loop {
            let pos = self.line_buf.iter().position(|&b| b == b'\n')?;
            let line = String::from_utf8_lossy(&self.line_buf[..pos]).to_string();
            self.line_buf.drain(..=pos);
            match parse_event_line(line.trim(), now_secs()) {
                Some(event) => return Some(event),
                None => debug!(line = line.trim(), "skipping malformed event line"),
            }
        }
    }

    /// Open the pipe `O_RDWR | O_NONBLOCK` and register it with tokio.
    ///
    /// `O_RDWR` keeps a writer end open so the read side never sees EOF
    /// between collaborator connections.
    fn ensure_fd(&mut self) -> anyhow::Result<()> {
        if self.async_fd.is_none() {
            let file = std::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(OFlag::O_NONBLOCK.bits())
                .open(&self.pipe_path)?;
            self.async_fd = Some(AsyncFd::new(file)?);
        }
        Ok(())
    }
}

impl Drop for EventReceiver {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.pipe_path);
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
