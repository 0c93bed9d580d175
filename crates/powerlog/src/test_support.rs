// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: record builders, data-dir fixtures, and
//! assertion helpers.

use std::path::Path;

use crate::paths::DataDir;
use crate::record::{BatteryChargeRecord, BatteryHealthRecord, ScreenStateRecord};

/// A plausible charge sample at `entry_time` with the given percentage.
pub fn charge(entry_time: u32, percent: i8) -> BatteryChargeRecord {
    BatteryChargeRecord {
        entry_time,
        amperage: -1200,
        raw_current_capacity: 4000,
        voltage: 12_400,
        cell_voltage: [4133, 4134, 4133],
        current_capacity: percent,
        present_dod: [20, 21, 20],
    }
}

/// A plausible health sample at `entry_time` with the given cycle count.
pub fn health(entry_time: u32, cycle_count: u16) -> BatteryHealthRecord {
    BatteryHealthRecord {
        entry_time,
        cycle_count,
        raw_max_capacity: 5100,
        qmax: [5200, 5210, 5190],
        weighted_ra: [40, 41, 39],
        external_connected: 0,
    }
}

/// Alternate locked/unlocked records, starting locked, `gap` seconds apart.
pub fn alternating_screen(start: u32, gap: u32, count: usize) -> Vec<ScreenStateRecord> {
    (0..count)
        .map(|i| {
            let t = start + gap * i as u32;
            if i % 2 == 0 {
                ScreenStateRecord::locked(t)
            } else {
                ScreenStateRecord::unlocked(t)
            }
        })
        .collect()
}

/// Data directory rooted at `root`, created on disk.
pub fn data_dir(root: &Path) -> anyhow::Result<DataDir> {
    let dir = DataDir::new(root.join("data"));
    dir.ensure()?;
    Ok(dir)
}

/// Assert that `$expr` is `Err` and its message contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
