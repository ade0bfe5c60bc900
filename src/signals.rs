//! Signal mapping and routing.
//!
//! The [`SignalTable`] maps each handled signal to exactly one
//! [`SystemAction`]. It is built once at startup and handed to the
//! supervisor loop. The [`SignalRouter`] subscribes to every signal in the
//! table and forwards each arrival, in order and without deduplication, onto
//! a single channel.

use crate::action::SystemAction;
use crate::error::{Error, Result};
use nix::sys::signal::{self, SigHandler, Signal};
use std::collections::HashMap;
use tokio::signal::unix::{signal as subscribe, SignalKind};
use tokio::sync::mpsc;
use tracing::debug;

/// Immutable mapping from signal to system action.
#[derive(Debug, Clone)]
pub struct SignalTable {
    actions: HashMap<Signal, SystemAction>,
}

impl SignalTable {
    /// The mapping used by a running init.
    pub fn canonical() -> Self {
        Self::from_entries([
            (Signal::SIGHUP, SystemAction::Reboot),
            (Signal::SIGINT, SystemAction::Reboot),
            (Signal::SIGPWR, SystemAction::Halt),
            (Signal::SIGQUIT, SystemAction::Reinit),
            (Signal::SIGTERM, SystemAction::Reboot),
            (Signal::SIGUSR1, SystemAction::Halt),
            (Signal::SIGUSR2, SystemAction::Poweroff),
        ])
    }

    /// Build a table from explicit entries. A later entry for the same
    /// signal replaces an earlier one.
    pub fn from_entries(entries: impl IntoIterator<Item = (Signal, SystemAction)>) -> Self {
        Self {
            actions: entries.into_iter().collect(),
        }
    }

    /// Action mapped to `sig`, if any.
    pub fn lookup(&self, sig: Signal) -> Option<SystemAction> {
        self.actions.get(&sig).copied()
    }

    /// Signals present in the table.
    pub fn signals(&self) -> impl Iterator<Item = Signal> + '_ {
        self.actions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Forwards subscribed OS signals onto a channel.
pub struct SignalRouter;

impl SignalRouter {
    /// Subscribe to every signal in `table`.
    ///
    /// One forwarder task per signal pushes each delivery onto the returned
    /// channel. Must be called from within a tokio runtime.
    pub fn subscribe(table: &SignalTable) -> Result<mpsc::UnboundedReceiver<Signal>> {
        let (tx, rx) = mpsc::unbounded_channel();

        for sig in table.signals() {
            let mut stream = subscribe(SignalKind::from_raw(sig as libc::c_int))
                .map_err(|source| Error::SignalSubscribe { signal: sig, source })?;
            let tx = tx.clone();

            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if tx.send(sig).is_err() {
                        // Receiver dropped, exit
                        break;
                    }
                }
            });
            debug!(signal = %sig, "Subscribed to signal");
        }

        Ok(rx)
    }
}

/// Ignore terminal job-control signals so PID 1 can never be stopped by them.
///
/// Ignored dispositions survive exec, so spawned services must restore the
/// defaults with [`restore_job_control_signals`].
pub fn suppress_job_control_signals() -> Result<()> {
    for sig in [Signal::SIGTTIN, Signal::SIGTTOU] {
        // SAFETY: SigIgn installs no handler code.
        unsafe { signal::signal(sig, SigHandler::SigIgn) }?;
    }
    Ok(())
}

/// Restore default dispositions for the job-control signals ignored by
/// [`suppress_job_control_signals`]. Async-signal-safe; used between fork
/// and exec.
pub fn restore_job_control_signals() -> nix::Result<()> {
    for sig in [Signal::SIGTTIN, Signal::SIGTTOU] {
        // SAFETY: SigDfl installs no handler code.
        unsafe { signal::signal(sig, SigHandler::SigDfl) }?;
    }
    Ok(())
}
