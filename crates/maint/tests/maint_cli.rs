// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exit codes of the real `powerlog-maint` binary.

use std::path::Path;
use std::process::{Command, Output};

use powerlog::clock::now_secs;
use powerlog::paths::DataDir;
use powerlog::record::ScreenStateRecord;

fn maint(data_dir: &Path, extra: &[&str]) -> anyhow::Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_powerlog-maint"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(extra)
        .env_remove("POWERLOG_DIR")
        .env_remove("POWERLOG_BACKUP_DIR")
        .env("RUST_LOG", "debug")
        .output()?;
    Ok(output)
}

fn seeded_dir(root: &Path) -> anyhow::Result<DataDir> {
    let dir = DataDir::new(root.join("data"));
    dir.ensure()?;
    let now = now_secs();
    dir.store::<ScreenStateRecord>().append(&[
        ScreenStateRecord::unlocked(now - 900),
        ScreenStateRecord::locked(now - 600),
        ScreenStateRecord::unlocked(now - 595),
        ScreenStateRecord::locked(now - 300),
    ])?;
    Ok(dir)
}

#[test]
fn success_then_noop() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = seeded_dir(tmp.path())?;

    let first = maint(dir.root(), &[])?;
    assert_eq!(first.status.code(), Some(0), "{}", String::from_utf8_lossy(&first.stderr));
    // The 5-second lock/unlock pair is dropped as noise.
    assert_eq!(dir.store::<ScreenStateRecord>().record_count()?, 2);
    assert!(dir.last_backup_time().read_opt().is_some());

    let second = maint(dir.root(), &[])?;
    assert_eq!(second.status.code(), Some(0));
    Ok(())
}

#[test]
fn invalid_config_exits_2() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let output = maint(tmp.path(), &["--lock-retries", "0"])?;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("lock-retries"));
    Ok(())
}

#[test]
fn held_lock_exits_3() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = seeded_dir(tmp.path())?;
    let _held = dir.lock().acquire()?;

    let output = maint(dir.root(), &["--lock-retries", "1", "--lock-backoff-ms", "5"])?;
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(dir.store::<ScreenStateRecord>().record_count()?, 4);
    Ok(())
}
