// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-width binary record layouts, one per log kind.
//!
//! A log file is a flat concatenation of same-kind records with no header
//! and no delimiters. Fields are packed little-endian in declaration order
//! with no padding, so record `i` always starts at `i * SIZE`.

use std::fmt;

/// Earliest timestamp accepted as genuine (2001-01-01T00:00:00Z).
pub const MIN_PLAUSIBLE_TIME: u32 = 978_307_200;

/// Timestamps more than this far ahead of `now` are treated as garbage.
pub const FUTURE_SLACK_SECS: u32 = 86_400;

/// Whether `t` could be a genuine entry time when the clock reads `now`.
pub fn plausible_time(t: u32, now: u32) -> bool {
    (MIN_PLAUSIBLE_TIME..=now.saturating_add(FUTURE_SLACK_SECS)).contains(&t)
}

/// The three log kinds the engine persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    BatteryCharge,
    BatteryHealth,
    ScreenState,
}

impl LogKind {
    pub const ALL: [LogKind; 3] = [Self::BatteryCharge, Self::BatteryHealth, Self::ScreenState];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BatteryCharge => "BatteryCharge",
            Self::BatteryHealth => "BatteryHealth",
            Self::ScreenState => "ScreenState",
        }
    }

    /// File name of the live log inside the data directory.
    pub fn file_name(&self) -> String {
        format!("{}Log", self.as_str())
    }

    pub fn record_size(&self) -> usize {
        match self {
            Self::BatteryCharge => BatteryChargeRecord::SIZE,
            Self::BatteryHealth => BatteryHealthRecord::SIZE,
            Self::ScreenState => ScreenStateRecord::SIZE,
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed-width telemetry record.
pub trait Record: Copy + PartialEq + fmt::Debug {
    const KIND: LogKind;
    /// Encoded length in bytes.
    const SIZE: usize;

    fn entry_time(&self) -> u32;

    /// Append exactly `SIZE` bytes to `out`.
    fn encode_into(&self, out: &mut Vec<u8>);

    /// Decode the record starting at `offset`. `None` if fewer than `SIZE`
    /// bytes remain or a field holds a value the type cannot represent.
    fn decode(bytes: &[u8], offset: usize) -> Option<Self>;

    /// Field-wise equality over everything except `entry_time`.
    fn same_content(&self, other: &Self) -> bool;

    /// Range checks on fields whose documented domain is narrower than
    /// their storage width.
    fn is_valid(&self) -> bool {
        true
    }

    /// Drop transient noise after deduplication. Identity by default.
    fn prune_transients(records: Vec<Self>, _pair_threshold: u32) -> Vec<Self> {
        records
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.encode_into(&mut out);
        out
    }
}

/// Encode a batch of records back to back.
pub fn encode_all<R: Record>(records: &[R]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * R::SIZE);
    for r in records {
        r.encode_into(&mut out);
    }
    out
}

/// Positional little-endian field reader.
struct Fields<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    fn at(bytes: &'a [u8], offset: usize, size: usize) -> Option<Self> {
        let end = offset.checked_add(size)?;
        let bytes = bytes.get(offset..end)?;
        Some(Self { bytes, pos: 0 })
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let slice = self.bytes.get(self.pos..self.pos + N)?;
        self.pos += N;
        slice.try_into().ok()
    }

    fn u32(&mut self) -> Option<u32> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    fn u16(&mut self) -> Option<u16> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    fn i16(&mut self) -> Option<i16> {
        self.take::<2>().map(i16::from_le_bytes)
    }

    fn i16x3(&mut self) -> Option<[i16; 3]> {
        Some([self.i16()?, self.i16()?, self.i16()?])
    }

    fn i8(&mut self) -> Option<i8> {
        self.take::<1>().map(i8::from_le_bytes)
    }

    fn i8x3(&mut self) -> Option<[i8; 3]> {
        Some([self.i8()?, self.i8()?, self.i8()?])
    }

    fn u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }
}

fn put_i16x3(out: &mut Vec<u8>, values: &[i16; 3]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn put_i8x3(out: &mut Vec<u8>, values: &[i8; 3]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

fn is_percent(v: i8) -> bool {
    (0..=100).contains(&v)
}

/// Periodic battery charge sample.
///
/// Layout (20 bytes): entry_time u32, amperage i16, raw_current_capacity i16,
/// voltage i16, cell_voltage 3×i16, current_capacity i8, present_dod 3×i8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryChargeRecord {
    pub entry_time: u32,
    /// mA, negative while discharging.
    pub amperage: i16,
    /// mAh.
    pub raw_current_capacity: i16,
    /// mV.
    pub voltage: i16,
    pub cell_voltage: [i16; 3],
    /// Percent, 0..=100.
    pub current_capacity: i8,
    /// Present depth of discharge per cell, percent.
    pub present_dod: [i8; 3],
}

impl Record for BatteryChargeRecord {
    const KIND: LogKind = LogKind::BatteryCharge;
    const SIZE: usize = 20;

    fn entry_time(&self) -> u32 {
        self.entry_time
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.entry_time.to_le_bytes());
        out.extend_from_slice(&self.amperage.to_le_bytes());
        out.extend_from_slice(&self.raw_current_capacity.to_le_bytes());
        out.extend_from_slice(&self.voltage.to_le_bytes());
        put_i16x3(out, &self.cell_voltage);
        out.extend_from_slice(&self.current_capacity.to_le_bytes());
        put_i8x3(out, &self.present_dod);
    }

    fn decode(bytes: &[u8], offset: usize) -> Option<Self> {
        let mut f = Fields::at(bytes, offset, Self::SIZE)?;
        Some(Self {
            entry_time: f.u32()?,
            amperage: f.i16()?,
            raw_current_capacity: f.i16()?,
            voltage: f.i16()?,
            cell_voltage: f.i16x3()?,
            current_capacity: f.i8()?,
            present_dod: f.i8x3()?,
        })
    }

    fn same_content(&self, other: &Self) -> bool {
        Self { entry_time: 0, ..*self } == Self { entry_time: 0, ..*other }
    }

    fn is_valid(&self) -> bool {
        is_percent(self.current_capacity) && self.present_dod.iter().all(|&d| is_percent(d))
    }
}

/// Slow-moving battery health sample.
///
/// Layout (18 bytes): entry_time u32, cycle_count u16, raw_max_capacity i16,
/// qmax 3×i16, weighted_ra 3×i8, external_connected i8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryHealthRecord {
    pub entry_time: u32,
    pub cycle_count: u16,
    /// mAh.
    pub raw_max_capacity: i16,
    pub qmax: [i16; 3],
    pub weighted_ra: [i8; 3],
    /// 0 or 1.
    pub external_connected: i8,
}

impl Record for BatteryHealthRecord {
    const KIND: LogKind = LogKind::BatteryHealth;
    const SIZE: usize = 18;

    fn entry_time(&self) -> u32 {
        self.entry_time
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.entry_time.to_le_bytes());
        out.extend_from_slice(&self.cycle_count.to_le_bytes());
        out.extend_from_slice(&self.raw_max_capacity.to_le_bytes());
        put_i16x3(out, &self.qmax);
        put_i8x3(out, &self.weighted_ra);
        out.extend_from_slice(&self.external_connected.to_le_bytes());
    }

    fn decode(bytes: &[u8], offset: usize) -> Option<Self> {
        let mut f = Fields::at(bytes, offset, Self::SIZE)?;
        Some(Self {
            entry_time: f.u32()?,
            cycle_count: f.u16()?,
            raw_max_capacity: f.i16()?,
            qmax: f.i16x3()?,
            weighted_ra: f.i8x3()?,
            external_connected: f.i8()?,
        })
    }

    fn same_content(&self, other: &Self) -> bool {
        Self { entry_time: 0, ..*self } == Self { entry_time: 0, ..*other }
    }

    fn is_valid(&self) -> bool {
        matches!(self.external_connected, 0 | 1) && self.raw_max_capacity >= 0
    }
}

/// Screen lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenState {
    Locked,
    Unlocked,
}

impl ScreenState {
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Locked => 0,
            Self::Unlocked => 1,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Locked),
            1 => Some(Self::Unlocked),
            _ => None,
        }
    }
}

/// A lock/unlock transition.
///
/// Layout (5 bytes): entry_time u32, screen_state u8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenStateRecord {
    pub entry_time: u32,
    pub state: ScreenState,
}

impl ScreenStateRecord {
    pub fn locked(entry_time: u32) -> Self {
        Self { entry_time, state: ScreenState::Locked }
    }

    pub fn unlocked(entry_time: u32) -> Self {
        Self { entry_time, state: ScreenState::Unlocked }
    }
}

impl Record for ScreenStateRecord {
    const KIND: LogKind = LogKind::ScreenState;
    const SIZE: usize = 5;

    fn entry_time(&self) -> u32 {
        self.entry_time
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.entry_time.to_le_bytes());
        out.push(self.state.as_byte());
    }

    fn decode(bytes: &[u8], offset: usize) -> Option<Self> {
        let mut f = Fields::at(bytes, offset, Self::SIZE)?;
        let entry_time = f.u32()?;
        let state = ScreenState::from_byte(f.u8()?)?;
        Some(Self { entry_time, state })
    }

    fn same_content(&self, other: &Self) -> bool {
        self.state == other.state
    }

    /// A `Locked` immediately followed by an `Unlocked` less than
    /// `pair_threshold` seconds later is a fast re-auth; both are dropped.
    fn prune_transients(records: Vec<Self>, pair_threshold: u32) -> Vec<Self> {
        let mut out = Vec::with_capacity(records.len());
        let mut iter = records.into_iter().peekable();
        while let Some(rec) = iter.next() {
            if rec.state == ScreenState::Locked {
                if let Some(next) = iter.peek() {
                    let gap = i64::from(next.entry_time) - i64::from(rec.entry_time);
                    if next.state == ScreenState::Unlocked
                        && (0..i64::from(pair_threshold)).contains(&gap)
                    {
                        iter.next();
                        continue;
                    }
                }
            }
            out.push(rec);
        }
        out
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
