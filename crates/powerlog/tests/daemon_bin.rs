// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests that spawn the real `powerlogd` binary.

use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use powerlog::paths::DataDir;
use powerlog::record::{ScreenState, ScreenStateRecord};

const TIMEOUT: Duration = Duration::from_secs(10);

/// A running `powerlogd` that is killed on drop.
struct Daemon {
    child: Child,
}

impl Daemon {
    fn start(data_dir: &Path) -> anyhow::Result<Self> {
        let child = Command::new(env!("CARGO_BIN_EXE_powerlogd"))
            .arg("--data-dir")
            .arg(data_dir)
            .args(["--log-format", "text", "--log-level", "debug"])
            .env_remove("POWERLOG_DIR")
            .env_remove("POWERLOG_EVENTS")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(Self { child })
    }

    fn terminate(&mut self) -> anyhow::Result<ExitStatus> {
        let pid = i32::try_from(self.child.id())?;
        kill(Pid::from_raw(pid), Signal::SIGTERM)?;
        let deadline = Instant::now() + TIMEOUT;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            anyhow::ensure!(Instant::now() < deadline, "daemon did not exit");
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn wait_until(mut cond: impl FnMut() -> anyhow::Result<bool>) -> anyhow::Result<()> {
    let deadline = Instant::now() + TIMEOUT;
    while !cond()? {
        anyhow::ensure!(Instant::now() < deadline, "timed out");
        std::thread::sleep(Duration::from_millis(20));
    }
    Ok(())
}

#[test]
fn sigterm_closes_unlocked_interval() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = DataDir::new(tmp.path().join("data"));
    let mut daemon = Daemon::start(dir.root())?;

    let fifo = dir.events_fifo();
    wait_until(|| Ok(fifo.exists()))?;
    let mut pipe = std::fs::OpenOptions::new().write(true).open(&fifo)?;
    pipe.write_all(b"{\"event\":\"key_pressed\",\"data\":{\"code\":\"q\"}}\n")?;
    pipe.write_all(b"{\"event\":\"lock_state\",\"data\":{\"state\":\"unlocked\"}}\n")?;

    let screen = dir.store::<ScreenStateRecord>();
    wait_until(|| Ok(screen.record_count()? >= 1))?;

    let status = daemon.terminate()?;
    assert!(status.success(), "{status:?}");

    let records = screen.read_all()?;
    let states: Vec<_> = records.iter().map(|r| r.state).collect();
    assert_eq!(states, vec![ScreenState::Unlocked, ScreenState::Locked]);
    assert!(dir.last_log_time().read_opt().is_some());
    assert!(std::fs::read_to_string(dir.key_frequency())?.contains("\"q\": 1"));
    assert!(!fifo.exists());
    Ok(())
}

#[test]
fn invalid_config_exits_2() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let status = Command::new(env!("CARGO_BIN_EXE_powerlogd"))
        .arg("--data-dir")
        .arg(tmp.path())
        .args(["--flush-interval-secs", "0"])
        .stderr(Stdio::null())
        .status()?;
    assert_eq!(status.code(), Some(2));
    Ok(())
}
