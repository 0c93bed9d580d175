// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{Marker, MarkerWriter};

#[test]
fn missing_marker_reads_default() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let marker = Marker::new(tmp.path().join("LastLogTime"));
    assert_eq!(marker.read_opt(), None);
    assert_eq!(marker.read(), 0);
    Ok(())
}

#[test]
fn short_marker_reads_default() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let marker = Marker::new(tmp.path().join("LastLogTime"));
    std::fs::write(marker.path(), [1, 2, 3])?;
    assert_eq!(marker.read_opt(), None);
    Ok(())
}

#[test]
fn only_trailing_four_bytes_count() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let marker = Marker::new(tmp.path().join("LastLogTime"));
    let mut bytes = vec![0xAA; 7];
    bytes.extend_from_slice(&1_700_000_000u32.to_le_bytes());
    std::fs::write(marker.path(), bytes)?;
    assert_eq!(marker.read(), 1_700_000_000);
    Ok(())
}

#[test]
fn write_replaces_content_with_four_bytes() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let marker = Marker::new(tmp.path().join("LastLogTime"));
    std::fs::write(marker.path(), [9u8; 32])?;
    marker.write(42)?;
    assert_eq!(std::fs::read(marker.path())?, 42u32.to_le_bytes().to_vec());
    assert_eq!(marker.read(), 42);
    Ok(())
}

#[test]
fn write_leaves_no_temp_files() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let marker = Marker::new(tmp.path().join("LastBackupTime"));
    marker.write(1)?;
    marker.write(2)?;
    assert_eq!(std::fs::read_dir(tmp.path())?.count(), 1);
    Ok(())
}

#[test]
fn writer_never_moves_backward() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let marker = Marker::new(tmp.path().join("LastLogTime"));
    marker.write(500)?;

    let mut writer = MarkerWriter::open(marker.clone());
    assert_eq!(writer.last(), 500);
    assert_eq!(writer.advance(400)?, 500);
    assert_eq!(writer.advance(900)?, 900);
    assert_eq!(writer.advance(800)?, 900);
    assert_eq!(marker.read(), 900);
    Ok(())
}

#[test]
fn write_into_missing_directory_fails() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let marker = Marker::new(tmp.path().join("gone").join("LastLogTime"));
    crate::assert_err_contains!(marker.write(1), "IO_FAILURE");
    Ok(())
}
