// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maintenance pass: compact each log under the advisory lock, archive a
//! dated copy, and prune stale archives. Runs at most once per local day.

pub mod config;

use powerlog::archive::{ArchiveOutcome, Archiver};
use powerlog::clock::local_date;
use powerlog::compact::{compact_file, CompactOptions, CompactReport};
use powerlog::error::LogError;
use powerlog::lock::LockGuard;
use powerlog::paths::DataDir;
use powerlog::record::{
    BatteryChargeRecord, BatteryHealthRecord, LogKind, Record, ScreenStateRecord,
};
use tracing::{error, info};

use crate::config::MaintConfig;

/// Exit status for a run where the advisory lock could not be taken.
pub const EXIT_LOCK_TIMEOUT: i32 = 3;
/// Exit status when some files failed but the others were processed.
pub const EXIT_PARTIAL: i32 = 1;

/// A per-file step that failed. Other files were still processed.
#[derive(Debug)]
pub struct FileFailure {
    pub file: String,
    pub error: LogError,
}

#[derive(Debug, Default)]
pub struct MaintReport {
    pub compacted: Vec<CompactReport>,
    pub archived: Vec<(LogKind, ArchiveOutcome)>,
    pub pruned: usize,
    pub failures: Vec<FileFailure>,
}

impl MaintReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, file: impl Into<String>, error: LogError) {
        let file = file.into();
        error!(file = %file, "maintenance step failed: {error}");
        self.failures.push(FileFailure { file, error });
    }
}

#[derive(Debug)]
pub enum Outcome {
    /// A backup was already taken on this local date.
    AlreadyDone { last_backup: u32 },
    Completed(MaintReport),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AlreadyDone { .. } => 0,
            Self::Completed(report) if report.is_clean() => 0,
            Self::Completed(_) => EXIT_PARTIAL,
        }
    }
}

/// Exit status for a run that failed outright.
pub fn error_exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<LogError>() {
        Some(LogError::LockTimeout { .. }) => EXIT_LOCK_TIMEOUT,
        _ => 1,
    }
}

/// Run one maintenance pass at time `now`.
pub fn run(config: &MaintConfig, now: u32) -> anyhow::Result<Outcome> {
    let dir = config.data_dir();
    let today = local_date(now);

    if !config.force {
        if let Some(last_backup) = dir.last_backup_time().read_opt() {
            if local_date(last_backup) == today {
                info!(last_backup, "backup already taken today");
                return Ok(Outcome::AlreadyDone { last_backup });
            }
        }
    }

    dir.ensure()?;
    let lock = config.lock().acquire()?;
    let archiver = Archiver::new(config.backup_dir(), today);
    archiver.ensure()?;
    let opts = CompactOptions { now, pair_threshold_secs: config.pair_threshold_secs };

    let mut report = MaintReport::default();
    maintain::<BatteryChargeRecord>(&dir, &lock, &opts, &archiver, &mut report);
    maintain::<BatteryHealthRecord>(&dir, &lock, &opts, &archiver, &mut report);
    maintain::<ScreenStateRecord>(&dir, &lock, &opts, &archiver, &mut report);

    let counts = dir.key_frequency();
    if let Err(e) = archiver.snapshot_json(&counts) {
        report.fail(counts.display().to_string(), e);
    }

    if report.is_clean() {
        dir.last_backup_time().write(now)?;
    }
    info!(
        compacted = report.compacted.len(),
        pruned = report.pruned,
        failures = report.failures.len(),
        "maintenance finished"
    );
    Ok(Outcome::Completed(report))
}

/// Compact, archive, then prune one log. Archiving is skipped if compaction
/// failed, and pruning if archiving did.
fn maintain<R: Record>(
    dir: &DataDir,
    lock: &LockGuard,
    opts: &CompactOptions,
    archiver: &Archiver,
    report: &mut MaintReport,
) {
    let kind = R::KIND;
    let store = dir.store::<R>();

    match compact_file(&store, lock, opts) {
        Ok(compacted) => {
            info!(
                kind = %kind,
                before = compacted.records_before,
                after = compacted.records_after,
                bytes_dropped = compacted.bytes_dropped,
                rewritten = compacted.rewritten,
                "compaction report"
            );
            report.compacted.push(compacted);
        }
        Err(e) => return report.fail(kind.file_name(), e),
    }

    match archiver.archive_log(kind, store.path()) {
        Ok(outcome) => report.archived.push((kind, outcome)),
        Err(e) => return report.fail(kind.file_name(), e),
    }

    match archiver.prune(kind) {
        Ok(removed) => report.pruned += removed.len(),
        Err(e) => report.fail(kind.file_name(), e),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
