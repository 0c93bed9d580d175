// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery for the screen-state log.
//!
//! If the daemon was down for longer than the threshold and the last
//! recorded state is `Unlocked`, the unlocked interval must not silently
//! stretch across the outage. A `Locked` record at the last known-good time
//! and an `Unlocked` record at `now` are appended in one write.

use tracing::{info, warn};

use crate::error::LogError;
use crate::marker::MarkerWriter;
use crate::record::{ScreenState, ScreenStateRecord};
use crate::store::AppendStore;

/// Default gap after which an outage is assumed unclean.
pub const DEFAULT_THRESHOLD_SECS: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    /// No `LastLogTime` marker: first run.
    Cold,
    /// Restarted within the threshold.
    WarmShortGap { elapsed: u32 },
    /// Restarted after the threshold.
    WarmLongGap { elapsed: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    None,
    /// A `Locked@locked_at` + `Unlocked@resumed_at` pair was appended.
    InsertedLockPair { locked_at: u32, resumed_at: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryOutcome {
    pub state: RecoveryState,
    pub action: RecoveryAction,
}

/// Classify the restart from the marker value and the current time.
pub fn classify(last_log_time: Option<u32>, now: u32, threshold: u32) -> RecoveryState {
    match last_log_time {
        None => RecoveryState::Cold,
        Some(last) => {
            let elapsed = now.saturating_sub(last);
            if elapsed <= threshold {
                RecoveryState::WarmShortGap { elapsed }
            } else {
                RecoveryState::WarmLongGap { elapsed }
            }
        }
    }
}

/// Run recovery once at daemon startup.
///
/// `last_log_time` is the marker as read before the daemon wrote anything.
/// A corrupt screen log is treated as having no last record.
pub fn recover(
    screen: &AppendStore<ScreenStateRecord>,
    marker: &mut MarkerWriter,
    last_log_time: Option<u32>,
    now: u32,
    threshold: u32,
) -> Result<RecoveryOutcome, LogError> {
    let state = classify(last_log_time, now, threshold);
    let (RecoveryState::WarmLongGap { elapsed }, Some(last_log_time)) = (state, last_log_time)
    else {
        return Ok(RecoveryOutcome { state, action: RecoveryAction::None });
    };

    let last = match screen.read_last() {
        Ok(last) => last,
        Err(e) => {
            warn!("recovery: ignoring unreadable screen log: {e}");
            None
        }
    };
    let Some(last) = last.filter(|r| r.state == ScreenState::Unlocked) else {
        return Ok(RecoveryOutcome { state, action: RecoveryAction::None });
    };

    // Never stamp the synthetic lock before the record it closes.
    let locked_at = last_log_time.max(last.entry_time);
    screen.append(&[ScreenStateRecord::locked(locked_at), ScreenStateRecord::unlocked(now)])?;
    marker.advance(now)?;
    info!(elapsed, locked_at, resumed_at = now, "recovery: closed unlocked interval left by outage");

    Ok(RecoveryOutcome {
        state,
        action: RecoveryAction::InsertedLockPair { locked_at, resumed_at: now },
    })
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
