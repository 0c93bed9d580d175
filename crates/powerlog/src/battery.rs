// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Battery poll conversion and at-source change detection.

use serde::{Deserialize, Serialize};

use crate::record::{BatteryChargeRecord, BatteryHealthRecord, Record};

/// One battery registry poll as delivered by the platform collaborator.
///
/// Keys follow the IOKit `AppleSmartBattery` names. Missing keys read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawBatteryDict {
    pub amperage: i64,
    pub apple_raw_current_capacity: i64,
    pub voltage: i64,
    pub cell_voltage: Vec<i64>,
    pub current_capacity: i64,
    #[serde(rename = "PresentDOD")]
    pub present_dod: Vec<i64>,
    pub cycle_count: i64,
    pub apple_raw_max_capacity: i64,
    pub qmax: Vec<i64>,
    pub weighted_ra: Vec<i64>,
    pub external_connected: bool,
}

fn sat_i16(v: i64) -> i16 {
    v.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}

fn sat_i8(v: i64) -> i8 {
    v.clamp(i64::from(i8::MIN), i64::from(i8::MAX)) as i8
}

fn sat_u16(v: i64) -> u16 {
    v.clamp(0, i64::from(u16::MAX)) as u16
}

fn percent(v: i64) -> i8 {
    v.clamp(0, 100) as i8
}

fn three<T: Copy + Default>(values: &[i64], f: impl Fn(i64) -> T) -> [T; 3] {
    let mut out = [T::default(); 3];
    for (slot, &v) in out.iter_mut().zip(values) {
        *slot = f(v);
    }
    out
}

impl RawBatteryDict {
    /// Narrow into the charge layout. Out-of-range values saturate.
    pub fn charge_record(&self, entry_time: u32) -> BatteryChargeRecord {
        BatteryChargeRecord {
            entry_time,
            amperage: sat_i16(self.amperage),
            raw_current_capacity: sat_i16(self.apple_raw_current_capacity),
            voltage: sat_i16(self.voltage),
            cell_voltage: three(&self.cell_voltage, sat_i16),
            current_capacity: percent(self.current_capacity),
            present_dod: three(&self.present_dod, percent),
        }
    }

    pub fn health_record(&self, entry_time: u32) -> BatteryHealthRecord {
        BatteryHealthRecord {
            entry_time,
            cycle_count: sat_u16(self.cycle_count),
            raw_max_capacity: sat_i16(self.apple_raw_max_capacity).max(0),
            qmax: three(&self.qmax, sat_i16),
            weighted_ra: three(&self.weighted_ra, sat_i8),
            external_connected: i8::from(self.external_connected),
        }
    }
}

/// Last written record per battery kind, so unchanged polls are skipped.
#[derive(Debug, Default)]
pub struct BatteryCache {
    charge: Option<BatteryChargeRecord>,
    health: Option<BatteryHealthRecord>,
}

fn changed<R: Record>(slot: &mut Option<R>, rec: R) -> Option<R> {
    if slot.is_some_and(|prev| prev.same_content(&rec)) {
        return None;
    }
    *slot = Some(rec);
    Some(rec)
}

impl BatteryCache {
    /// Seed from the last records already on disk.
    pub fn seeded(
        charge: Option<BatteryChargeRecord>,
        health: Option<BatteryHealthRecord>,
    ) -> Self {
        Self { charge, health }
    }

    /// The charge record to write for this poll, if its content changed.
    pub fn observe_charge(&mut self, rec: BatteryChargeRecord) -> Option<BatteryChargeRecord> {
        changed(&mut self.charge, rec)
    }

    pub fn observe_health(&mut self, rec: BatteryHealthRecord) -> Option<BatteryHealthRecord> {
        changed(&mut self.health, rec)
    }
}

#[cfg(test)]
#[path = "battery_tests.rs"]
mod tests;
