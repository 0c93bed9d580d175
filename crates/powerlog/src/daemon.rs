// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The writer daemon: turns collaborator events into durable appends.
//!
//! All in-memory state lives in one [`Writer`] owned by the event loop, so
//! handlers run to completion one at a time without locking. Screen-state
//! changes are flushed as they arrive; battery records and key counts are
//! buffered and flushed on the timer. Every successful flush advances
//! `LastLogTime`, which doubles as the liveness heartbeat recovery relies on.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::battery::BatteryCache;
use crate::clock::now_secs;
use crate::config::Config;
use crate::error::LogError;
use crate::event::{InboundEvent, TimedEvent};
use crate::keys::KeyCounter;
use crate::lock::{AdvisoryLock, LockGuard};
use crate::marker::MarkerWriter;
use crate::paths::DataDir;
use crate::record::{
    BatteryChargeRecord, BatteryHealthRecord, Record, ScreenState, ScreenStateRecord,
};
use crate::recovery::{self, RecoveryOutcome};
use crate::source::EventReceiver;
use crate::store::AppendStore;

/// Result of one flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending; the marker was refreshed.
    Idle,
    /// `records` records were appended and the marker advanced.
    Flushed { records: usize },
    /// The advisory lock was busy; `pending` records stay buffered.
    Deferred { pending: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Try,
    Within(Duration),
}

/// Startup recovery that has not completed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRecovery {
    resumed_at: u32,
    threshold: u32,
}

/// One kind's log plus the records not yet appended to it.
#[derive(Debug)]
struct Lane<R: Record> {
    store: AppendStore<R>,
    pending: Vec<R>,
}

impl<R: Record> Lane<R> {
    fn open(dir: &DataDir) -> Result<Self, LogError> {
        let store = dir.store::<R>();
        store.create_if_missing()?;
        Ok(Self { store, pending: Vec::new() })
    }

    fn last_on_disk(&self) -> Option<R> {
        self.store.read_last().unwrap_or_else(|e| {
            warn!(kind = %R::KIND, "ignoring unreadable tail: {e}");
            None
        })
    }

    /// Append everything pending. Pending records survive a failed append.
    fn drain(&mut self, _lock: &LockGuard) -> Result<usize, LogError> {
        let n = self.pending.len();
        self.store.append(&self.pending)?;
        self.pending.clear();
        Ok(n)
    }
}

/// Owned state of the writer daemon.
#[derive(Debug)]
pub struct Writer {
    lock: AdvisoryLock,
    charge: Lane<BatteryChargeRecord>,
    health: Lane<BatteryHealthRecord>,
    screen: Lane<ScreenStateRecord>,
    battery: BatteryCache,
    keys: KeyCounter,
    last_screen: Option<ScreenState>,
    marker: MarkerWriter,
    startup_marker: Option<u32>,
    pending_recovery: Option<PendingRecovery>,
}

impl Writer {
    /// Create missing logs and load the last known state from disk.
    pub fn open(dir: &DataDir, lock: AdvisoryLock) -> Result<Self, LogError> {
        dir.ensure()?;
        let charge = Lane::<BatteryChargeRecord>::open(dir)?;
        let health = Lane::<BatteryHealthRecord>::open(dir)?;
        let screen = Lane::<ScreenStateRecord>::open(dir)?;

        let battery = BatteryCache::seeded(charge.last_on_disk(), health.last_on_disk());
        let last_screen = screen.last_on_disk().map(|r| r.state);
        let startup_marker = dir.last_log_time().read_opt();

        Ok(Self {
            lock,
            charge,
            health,
            screen,
            battery,
            keys: KeyCounter::load(&dir.key_frequency()),
            last_screen,
            marker: MarkerWriter::open(dir.last_log_time()),
            startup_marker,
            pending_recovery: None,
        })
    }

    pub fn last_screen(&self) -> Option<ScreenState> {
        self.last_screen
    }

    pub fn keys(&self) -> &KeyCounter {
        &self.keys
    }

    pub fn pending_records(&self) -> usize {
        self.charge.pending.len() + self.health.pending.len() + self.screen.pending.len()
    }

    /// Run startup recovery against the marker value seen at open time.
    ///
    /// Blocks while waiting for the advisory lock. On failure the recovery
    /// stays pending and is retried, with the same `now`, ahead of the next
    /// append.
    pub fn recover(&mut self, now: u32, threshold: u32) -> Result<RecoveryOutcome, LogError> {
        let pending = PendingRecovery { resumed_at: now, threshold };
        self.pending_recovery = Some(pending);
        let guard = self.lock.acquire()?;
        self.recover_locked(&guard, pending)
    }

    pub fn recovery_pending(&self) -> bool {
        self.pending_recovery.is_some()
    }

    fn recover_locked(
        &mut self,
        _lock: &LockGuard,
        pending: PendingRecovery,
    ) -> Result<RecoveryOutcome, LogError> {
        let outcome = recovery::recover(
            &self.screen.store,
            &mut self.marker,
            self.startup_marker,
            pending.resumed_at,
            pending.threshold,
        )?;
        self.pending_recovery = None;
        info!(state = ?outcome.state, action = ?outcome.action, "startup recovery done");
        Ok(outcome)
    }

    /// Apply one event. Returns true when it should be flushed right away.
    pub fn handle(&mut self, event: TimedEvent) -> bool {
        let at = event.at;
        match event.event {
            InboundEvent::BatteryPoll(raw) => {
                if let Some(rec) = self.battery.observe_charge(raw.charge_record(at)) {
                    self.charge.pending.push(rec);
                }
                if let Some(rec) = self.battery.observe_health(raw.health_record(at)) {
                    self.health.pending.push(rec);
                }
                false
            }
            InboundEvent::LockStateChanged(state) => {
                self.screen.pending.push(ScreenStateRecord { entry_time: at, state });
                self.last_screen = Some(state);
                true
            }
            InboundEvent::KeyPressed(key) => {
                self.keys.record(&key);
                false
            }
        }
    }

    /// Append pending records if the advisory lock is free right now.
    pub fn flush(&mut self, now: u32) -> Result<FlushOutcome, LogError> {
        self.flush_with(now, LockMode::Try)
    }

    /// Final flush: close an open unlocked interval with `Locked@now`, then
    /// wait up to `grace` for the lock and append everything.
    pub fn shutdown(&mut self, now: u32, grace: Duration) -> Result<FlushOutcome, LogError> {
        if self.last_screen == Some(ScreenState::Unlocked) {
            self.screen.pending.push(ScreenStateRecord::locked(now));
            self.last_screen = Some(ScreenState::Locked);
        }
        self.flush_with(now, LockMode::Within(grace))
    }

    fn flush_with(&mut self, now: u32, mode: LockMode) -> Result<FlushOutcome, LogError> {
        if let Err(e) = self.keys.flush() {
            warn!("key counts not saved: {e}");
        }

        let pending = self.pending_records();
        // Moving the marker before recovery has run would hide the outage.
        if pending == 0 && self.pending_recovery.is_none() {
            self.marker.advance(now)?;
            return Ok(FlushOutcome::Idle);
        }

        let guard = match mode {
            LockMode::Within(grace) => self.lock.acquire_within(grace)?,
            LockMode::Try => match self.lock.try_acquire()? {
                Some(guard) => guard,
                None => return Ok(FlushOutcome::Deferred { pending }),
            },
        };
        if let Some(retry) = self.pending_recovery {
            if let Err(e) = self.recover_locked(&guard, retry) {
                warn!("startup recovery still failing: {e}");
            }
        }
        // Each log is appended on its own; one failing file keeps its records
        // pending without holding back the others.
        let drained = [
            self.screen.drain(&guard),
            self.charge.drain(&guard),
            self.health.drain(&guard),
        ];
        drop(guard);

        let mut records = 0;
        let mut failure = None;
        for result in drained {
            match result {
                Ok(n) => records += n,
                Err(e) => {
                    warn!("append failed, records kept for retry: {e}");
                    failure.get_or_insert(e);
                }
            }
        }
        if records > 0 {
            self.marker.advance(now)?;
            debug!(records, marker = self.marker.last(), "flushed");
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(FlushOutcome::Flushed { records }),
        }
    }
}

fn flush_logged(writer: &mut Writer) {
    match writer.flush(now_secs()) {
        Ok(FlushOutcome::Deferred { pending }) => {
            debug!(pending, "advisory lock busy, flush deferred");
        }
        Ok(_) => {}
        Err(e) => warn!("flush failed, will retry: {e}"),
    }
}

/// Run the writer until `shutdown` is cancelled.
pub async fn run(config: &Config, shutdown: CancellationToken) -> anyhow::Result<()> {
    let dir = config.data_dir();
    let writer = Writer::open(&dir, config.lock())?;
    info!(dir = %dir.root().display(), "writer starting");

    let threshold = config.recovery_threshold_secs;
    let (mut writer, recovered) = tokio::task::spawn_blocking(move || {
        let mut writer = writer;
        let outcome = writer.recover(now_secs(), threshold);
        (writer, outcome)
    })
    .await?;
    if let Err(e) = recovered {
        warn!("startup recovery deferred: {e}");
    }

    let events = config.events_path();
    let mut receiver = EventReceiver::new(&events)?;
    let mut flush_tick = tokio::time::interval(config.flush_interval());

    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = flush_tick.tick() => {
                flush_logged(&mut writer);
                continue;
            }
            event = receiver.next_event() => event,
        };

        match event {
            Some(event) => {
                if writer.handle(event) {
                    flush_logged(&mut writer);
                }
            }
            None => {
                warn!(path = %events.display(), "event pipe failed, reopening");
                drop(receiver);
                tokio::time::sleep(config.reopen_delay()).await;
                receiver = EventReceiver::new(&events)?;
            }
        }
    }

    debug!("shutdown signal received");
    let grace = config.shutdown_grace();
    let final_flush = tokio::task::spawn_blocking(move || writer.shutdown(now_secs(), grace));
    // The lock wait inside `shutdown` is bounded by the same grace period, so
    // the blocking task finishes before the runtime is torn down.
    match tokio::time::timeout(grace + Duration::from_millis(500), final_flush).await {
        Ok(Ok(Ok(outcome))) => info!(?outcome, "writer stopped"),
        Ok(Ok(Err(e))) => error!("final flush failed: {e}"),
        Ok(Err(e)) => error!("final flush task failed: {e}"),
        Err(_) => warn!("final flush exceeded grace period"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
