// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::keys::KeyId;
use crate::record::ScreenState;

use super::{parse_event_line, InboundEvent, TimedEvent};

const NOW: u32 = 1_760_000_000;

#[test]
fn parses_lock_state() {
    let event = parse_event_line(r#"{"event":"lock_state","data":{"state":"unlocked"}}"#, NOW);
    assert_eq!(
        event,
        Some(TimedEvent { at: NOW, event: InboundEvent::LockStateChanged(ScreenState::Unlocked) })
    );
}

#[test]
fn explicit_timestamp_wins() {
    let line = format!(r#"{{"event":"lock_state","at":{},"data":{{"state":"locked"}}}}"#, NOW - 42);
    assert_eq!(parse_event_line(&line, NOW).map(|e| e.at), Some(NOW - 42));
}

#[yare::parameterized(
    zero         = { 0 },
    before_2001  = { 978_307_199 },
    next_week    = { NOW + 7 * 86_400 },
)]
fn rejects_implausible_timestamp(at: u32) {
    let line = format!(r#"{{"event":"lock_state","at":{at},"data":{{"state":"locked"}}}}"#);
    assert_eq!(parse_event_line(&line, NOW), None);
}

#[yare::parameterized(
    name = { r#"{"event":"key_pressed","data":{"code":"a"}}"#, KeyId::Name("a".into()) },
    code = { r#"{"event":"key_pressed","data":{"code":36}}"#, KeyId::Code(36) },
)]
fn parses_key_pressed(line: &str, expected: KeyId) {
    let event = parse_event_line(line, NOW).map(|e| e.event);
    assert_eq!(event, Some(InboundEvent::KeyPressed(expected)));
}

#[test]
fn parses_battery_poll() {
    let line = r#"{"event":"battery_poll","data":{"CurrentCapacity":77,"CycleCount":12}}"#;
    let Some(TimedEvent { event: InboundEvent::BatteryPoll(raw), .. }) = parse_event_line(line, NOW)
    else {
        panic!("expected battery poll");
    };
    assert_eq!(raw.current_capacity, 77);
    assert_eq!(raw.cycle_count, 12);
}

#[test]
fn ignores_malformed_lines() {
    assert_eq!(parse_event_line("not json", NOW), None);
    assert_eq!(parse_event_line("{}", NOW), None);
    assert_eq!(parse_event_line(r#"{"event":"unknown"}"#, NOW), None);
    assert_eq!(parse_event_line(r#"{"event":"lock_state","data":{"state":"asleep"}}"#, NOW), None);
    assert_eq!(parse_event_line(r#"{"event":"key_pressed"}"#, NOW), None);
    assert_eq!(parse_event_line("", NOW), None);
}
