// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Local, NaiveDate};

/// Current Unix time in seconds, saturated into the on-disk u32 width.
pub fn now_secs() -> u32 {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    u32::try_from(secs).unwrap_or(u32::MAX)
}

/// Local calendar date of a stored timestamp.
pub fn local_date(secs: u32) -> NaiveDate {
    DateTime::from_timestamp(i64::from(secs), 0)
        .unwrap_or_default()
        .with_timezone(&Local)
        .date_naive()
}

/// `YYYY-MM-DD`, as used in archive file names.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
