// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Deserialize;

use crate::battery::RawBatteryDict;
use crate::keys::KeyId;
use crate::record::{plausible_time, ScreenState};

/// Typed event delivered by one of the OS collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    BatteryPoll(RawBatteryDict),
    LockStateChanged(ScreenState),
    KeyPressed(KeyId),
}

/// An event stamped with the time it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEvent {
    pub at: u32,
    pub event: InboundEvent,
}

/// Wire shape of one JSON line: `{"event": ..., "at"?: ..., "data": {...}}`.
#[derive(Deserialize)]
struct RawLine {
    event: String,
    at: Option<u32>,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct LockData {
    state: ScreenState,
}

#[derive(Deserialize)]
struct KeyData {
    code: KeyId,
}

/// Parse one line into an event. Lines without `at` are stamped `now`.
///
/// Returns `None` for malformed JSON, unknown event names, a payload that
/// does not match the event, or an `at` before 2001 or more than a day
/// ahead of `now`.
pub fn parse_event_line(line: &str, now: u32) -> Option<TimedEvent> {
    let raw: RawLine = serde_json::from_str(line).ok()?;
    let at = raw.at.unwrap_or(now);
    if !plausible_time(at, now) {
        return None;
    }
    let event = match raw.event.as_str() {
        "battery_poll" => InboundEvent::BatteryPoll(serde_json::from_value(raw.data).ok()?),
        "lock_state" => {
            let data: LockData = serde_json::from_value(raw.data).ok()?;
            InboundEvent::LockStateChanged(data.state)
        }
        "key_pressed" => {
            let data: KeyData = serde_json::from_value(raw.data).ok()?;
            InboundEvent::KeyPressed(data.code)
        }
        _ => return None,
    };
    Some(TimedEvent { at, event })
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
