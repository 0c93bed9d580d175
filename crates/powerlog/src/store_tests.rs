// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use crate::error::LogError;
use crate::record::{BatteryChargeRecord, Record, ScreenStateRecord};
use crate::test_support::charge;

use super::AppendStore;

#[test]
fn create_if_missing_is_idempotent() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = AppendStore::<ScreenStateRecord>::in_dir(tmp.path());
    store.create_if_missing()?;
    store.append(&[ScreenStateRecord::locked(10)])?;
    store.create_if_missing()?;
    assert_eq!(store.record_count()?, 1);
    assert!(store.path().ends_with("ScreenStateLog"));
    Ok(())
}

#[test]
fn append_and_read_last() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = AppendStore::<BatteryChargeRecord>::in_dir(tmp.path());

    store.append(&[charge(100, 80)])?;
    store.append(&[charge(160, 79), charge(220, 78)])?;

    assert_eq!(store.len_bytes()?, 3 * BatteryChargeRecord::SIZE as u64);
    assert_eq!(store.read_last()?, Some(charge(220, 78)));
    assert_eq!(store.read_all()?, vec![charge(100, 80), charge(160, 79), charge(220, 78)]);
    Ok(())
}

#[test]
fn read_last_of_missing_or_empty_file() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = AppendStore::<ScreenStateRecord>::in_dir(tmp.path());
    assert_eq!(store.read_last()?, None);
    store.create_if_missing()?;
    assert_eq!(store.read_last()?, None);
    assert!(store.read_all()?.is_empty());
    Ok(())
}

#[test]
fn read_last_reports_misaligned_file() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = AppendStore::<ScreenStateRecord>::in_dir(tmp.path());
    store.append(&[ScreenStateRecord::unlocked(10)])?;
    let mut f = std::fs::OpenOptions::new().append(true).open(store.path())?;
    f.write_all(&[1, 2, 3])?;

    let err = store.read_last().err();
    assert!(matches!(err, Some(LogError::CorruptFile { len: 8, record_size: 5, .. })));
    crate::assert_err_contains!(store.read_all(), "length 8");
    Ok(())
}

#[test]
fn read_last_reports_undecodable_tail() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = AppendStore::<ScreenStateRecord>::in_dir(tmp.path());
    std::fs::write(store.path(), [0, 0, 0, 0, 9])?;
    assert!(store.read_last().is_err());
    Ok(())
}

#[test]
fn read_record_at_bounds() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = AppendStore::<ScreenStateRecord>::in_dir(tmp.path());
    store.append(&[ScreenStateRecord::locked(1), ScreenStateRecord::unlocked(2)])?;

    assert_eq!(store.read_record_at(1)?, ScreenStateRecord::unlocked(2));
    let err = store.read_record_at(2).err();
    assert!(matches!(err, Some(LogError::IndexOutOfBounds { index: 2, count: 2 })));
    Ok(())
}

#[test]
fn append_rejects_partial_record_bytes() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = AppendStore::<ScreenStateRecord>::in_dir(tmp.path());
    assert!(store.append_encoded(&[1, 2, 3]).is_err());
    assert_eq!(store.len_bytes()?, 0);
    Ok(())
}

#[test]
fn append_into_missing_directory_fails() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = AppendStore::<ScreenStateRecord>::in_dir(&tmp.path().join("nope"));
    let err = store.append(&[ScreenStateRecord::locked(1)]).err();
    assert!(matches!(err, Some(LogError::Io { .. })));
    Ok(())
}

#[test]
fn kinds_are_independent_files() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let screen = AppendStore::<ScreenStateRecord>::in_dir(tmp.path());
    let battery = AppendStore::<BatteryChargeRecord>::in_dir(tmp.path());
    screen.append(&[ScreenStateRecord::locked(1)])?;
    battery.append(&[charge(1, 50)])?;
    assert_ne!(screen.path(), battery.path());
    assert_eq!(screen.record_count()?, 1);
    assert_eq!(battery.record_count()?, 1);
    Ok(())
}
