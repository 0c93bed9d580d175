// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log compaction: repair, deduplicate, prune, and atomically replace.
//!
//! Runs in the maintenance process under the advisory lock. The live file
//! is only ever replaced by renaming a verified scratch file over it.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::LogError;
use crate::lock::LockGuard;
use crate::record::{encode_all, plausible_time, LogKind, Record};
use crate::store::AppendStore;

/// Default window under which a lock/unlock pair counts as noise.
pub const DEFAULT_PAIR_THRESHOLD_SECS: u32 = 30;

#[derive(Debug, Clone, Copy)]
pub struct CompactOptions {
    pub now: u32,
    pub pair_threshold_secs: u32,
}

/// Records recovered from a possibly damaged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired<R> {
    pub records: Vec<R>,
    pub bytes_dropped: usize,
    pub resyncs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactReport {
    pub kind: LogKind,
    pub records_before: usize,
    pub records_after: usize,
    pub bytes_dropped: usize,
    pub resyncs: usize,
    pub rewritten: bool,
}

fn plausible<R: Record>(rec: &R, now: u32) -> bool {
    rec.is_valid() && plausible_time(rec.entry_time(), now)
}

fn decode_plausible<R: Record>(bytes: &[u8], offset: usize, now: u32) -> Option<R> {
    R::decode(bytes, offset).filter(|r| plausible(r, now))
}

/// A plausible record at `offset` that is followed by EOF or by another
/// plausible record.
fn confirmed<R: Record>(bytes: &[u8], offset: usize, now: u32) -> bool {
    let next = offset + R::SIZE;
    decode_plausible::<R>(bytes, offset, now).is_some()
        && (next == bytes.len() || decode_plausible::<R>(bytes, next, now).is_some())
}

/// First confirmed record start at or after `from`.
fn resync_point<R: Record>(bytes: &[u8], from: usize, now: u32) -> Option<usize> {
    let last_start = bytes.len().checked_sub(R::SIZE)?;
    (from..=last_start).find(|&q| confirmed::<R>(bytes, q, now))
}

/// Recover records from `bytes`, dropping torn or interleaved fragments.
///
/// A well-formed file (whole number of records, all decodable) is returned
/// as-is. Otherwise the file is walked positionally; where alignment is
/// lost, the scan moves forward byte by byte to the next confirmed record
/// start and the skipped bytes are dropped. A record that overlaps the next
/// confirmed start is the torn one and is dropped; a record that ends
/// before it is kept. This is best-effort: a fragment that happens to
/// decode as a plausible record cannot be told apart from a real one.
pub fn repair<R: Record>(bytes: &[u8], now: u32) -> Repaired<R> {
    if bytes.len() % R::SIZE == 0 {
        let whole: Option<Vec<R>> = (0..bytes.len() / R::SIZE)
            .map(|i| R::decode(bytes, i * R::SIZE).filter(R::is_valid))
            .collect();
        if let Some(records) = whole {
            return Repaired { records, bytes_dropped: 0, resyncs: 0 };
        }
    }

    let mut records = Vec::with_capacity(bytes.len() / R::SIZE);
    let mut bytes_dropped = 0;
    let mut resyncs = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        let next = pos + R::SIZE;
        if let Some(rec) = decode_plausible::<R>(bytes, pos, now) {
            if next == bytes.len() || decode_plausible::<R>(bytes, next, now).is_some() {
                records.push(rec);
                pos = next;
                continue;
            }
            match resync_point::<R>(bytes, pos + 1, now) {
                Some(q) if q < next => {
                    debug!(kind = %R::KIND, offset = pos, "dropping torn record");
                    bytes_dropped += q - pos;
                    pos = q;
                }
                Some(q) => {
                    records.push(rec);
                    bytes_dropped += q - next;
                    pos = q;
                }
                None => {
                    records.push(rec);
                    bytes_dropped += bytes.len() - next;
                    pos = bytes.len();
                }
            }
            resyncs += 1;
        } else {
            match resync_point::<R>(bytes, pos + 1, now) {
                Some(q) => {
                    bytes_dropped += q - pos;
                    pos = q;
                }
                None => {
                    bytes_dropped += bytes.len() - pos;
                    pos = bytes.len();
                }
            }
            resyncs += 1;
        }
    }

    Repaired { records, bytes_dropped, resyncs }
}

/// Collapse each maximal run of same-content records to its first and last.
pub fn dedup_runs<R: Record>(records: Vec<R>) -> Vec<R> {
    let mut out = Vec::with_capacity(records.len());
    let mut iter = records.into_iter();
    let Some(mut first) = iter.next() else {
        return out;
    };
    let mut last: Option<R> = None;
    for rec in iter {
        if rec.same_content(&first) {
            last = Some(rec);
        } else {
            out.push(first);
            out.extend(last.take());
            first = rec;
        }
    }
    out.push(first);
    out.extend(last);
    out
}

/// Dedup and prune until nothing more is removed.
///
/// Pruning a short pair can make its neighbours a new duplicate run, so a
/// single pass is not a fixed point.
pub fn compact_records<R: Record>(mut records: Vec<R>, pair_threshold: u32) -> Vec<R> {
    loop {
        let before = records.len();
        records = R::prune_transients(dedup_runs(records), pair_threshold);
        if records.len() == before {
            return records;
        }
    }
}

/// Compact one log file in place (by rename).
///
/// The live file is untouched unless the compacted output differs and the
/// scratch copy reads back as well-formed.
pub fn compact_file<R: Record>(
    store: &AppendStore<R>,
    lock: &LockGuard,
    opts: &CompactOptions,
) -> Result<CompactReport, LogError> {
    debug!(kind = %R::KIND, lock = %lock.path().display(), "compacting");
    let original = store.read_bytes()?;
    let repaired = repair::<R>(&original, opts.now);
    if repaired.bytes_dropped > 0 {
        warn!(
            kind = %R::KIND,
            bytes_dropped = repaired.bytes_dropped,
            resyncs = repaired.resyncs,
            "repaired corrupt log"
        );
    }

    let records = compact_records(repaired.records, opts.pair_threshold_secs);
    let output = encode_all(&records);
    let mut report = CompactReport {
        kind: R::KIND,
        records_before: original.len() / R::SIZE,
        records_after: records.len(),
        bytes_dropped: repaired.bytes_dropped,
        resyncs: repaired.resyncs,
        rewritten: false,
    };
    if output == original {
        return Ok(report);
    }

    replace_verified::<R>(store.path(), &output)?;
    report.rewritten = true;
    info!(
        kind = %R::KIND,
        before = report.records_before,
        after = report.records_after,
        "compacted log"
    );
    Ok(report)
}

fn replace_verified<R: Record>(path: &Path, bytes: &[u8]) -> Result<(), LogError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut scratch = tempfile::NamedTempFile::new_in(dir).map_err(|e| LogError::io(path, e))?;
    scratch.write_all(bytes).map_err(|e| LogError::io(scratch.path(), e))?;
    scratch.as_file().sync_all().map_err(|e| LogError::io(scratch.path(), e))?;

    let written = std::fs::read(scratch.path()).map_err(|e| LogError::io(scratch.path(), e))?;
    let well_formed = written.len() % R::SIZE == 0
        && (0..written.len() / R::SIZE).all(|i| R::decode(&written, i * R::SIZE).is_some());
    if written != bytes || !well_formed {
        return Err(LogError::CorruptFile {
            path: scratch.path().to_path_buf(),
            len: written.len() as u64,
            record_size: R::SIZE,
        });
    }

    scratch.persist(path).map_err(|e| LogError::io(path, e.error))?;
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        debug!(dir = %dir.display(), "directory sync failed: {e}");
    }
    Ok(())
}

#[cfg(test)]
#[path = "compact_tests.rs"]
mod tests;
