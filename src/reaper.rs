//! Child reaping for PID 1 duty.
//!
//! The reaper is the only place that collects exit statuses and so the only
//! place that clears zombie entries from the process table. It runs in one
//! of two modes:
//!
//! - [`ReapMode::Standing`]: blocks forever. "No children" is not an error
//!   because orphans can be reparented to PID 1 at any time, so the reaper
//!   pauses and asks again.
//! - [`ReapMode::Draining`]: one non-blocking pass that collects every
//!   child already dead and returns successfully as soon as no child is
//!   waitable. Children still running are left for the next reaper.

use crate::error::{Error, Result};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

/// Pause between retries when no child exists in standing mode.
pub const IDLE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapMode {
    /// One non-blocking pass, stop when no child is waitable
    Draining,
    /// Run forever
    Standing,
}

/// Source of child state changes.
pub trait ChildWaiter: Send + 'static {
    /// Wait for any child to change state.
    ///
    /// With `nohang` set this returns [`WaitStatus::StillAlive`] instead of
    /// blocking when children exist but none has changed state.
    fn wait_any(&mut self, nohang: bool) -> nix::Result<WaitStatus>;
}

/// Waits on the real process table with `waitpid(-1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWaiter;

impl ChildWaiter for SystemWaiter {
    fn wait_any(&mut self, nohang: bool) -> nix::Result<WaitStatus> {
        waitpid(Pid::from_raw(-1), nohang.then_some(WaitPidFlag::WNOHANG))
    }
}

/// Reaps children through a [`ChildWaiter`].
pub struct Reaper<W> {
    waiter: W,
    idle_interval: Duration,
}

impl<W: ChildWaiter> Reaper<W> {
    pub fn new(waiter: W) -> Self {
        Self {
            waiter,
            idle_interval: IDLE_INTERVAL,
        }
    }

    pub fn with_idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    /// Reap children until the mode's terminator or a wait failure.
    ///
    /// Standing mode only ever returns an error.
    pub fn reap(&mut self, mode: ReapMode) -> Result<()> {
        let nohang = mode == ReapMode::Draining;
        loop {
            match self.waiter.wait_any(nohang) {
                Ok(WaitStatus::StillAlive) if nohang => return Ok(()),
                Ok(status) => log_status(status),
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => match mode {
                    ReapMode::Draining => return Ok(()),
                    ReapMode::Standing => thread::sleep(self.idle_interval),
                },
                Err(e) => return Err(Error::Wait(e)),
            }
        }
    }

    /// Run in standing mode on a dedicated OS thread.
    ///
    /// The returned receiver resolves only if the reaper stops, which means
    /// the wait subsystem failed.
    pub fn spawn_standing(mut self) -> Result<oneshot::Receiver<Result<()>>> {
        let (tx, rx) = oneshot::channel();
        thread::Builder::new()
            .name("reaper".to_string())
            .spawn(move || {
                let result = self.reap(ReapMode::Standing);
                if let Err(ref e) = result {
                    error!(error = %e, "Child reaper failed");
                }
                let _ = tx.send(result);
            })?;
        Ok(rx)
    }
}

fn log_status(status: WaitStatus) {
    match status {
        WaitStatus::Exited(pid, code) => {
            info!(pid = pid.as_raw(), code = code, "Child exited");
        }
        WaitStatus::Signaled(pid, sig, core_dumped) => {
            info!(
                pid = pid.as_raw(),
                signal = %sig,
                core_dumped = core_dumped,
                "Child killed by signal"
            );
        }
        other => {
            debug!(status = ?other, "Child changed state");
        }
    }
}
