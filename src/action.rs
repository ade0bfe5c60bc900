//! System actions triggered by signals.

use crate::error::{Error, Result};
use crate::quit::QuitBroadcast;
use crate::system::System;
use nix::sys::reboot::RebootMode;
use nix::sys::signal::Signal;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Fixed delay before a destructive transition.
pub const GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Action performed in response to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemAction {
    /// Restart the machine
    Reboot,
    /// Halt the machine
    Halt,
    /// Power off the machine
    Poweroff,
    /// Replace init with a fresh instance of itself
    Reinit,
}

/// Kernel-level power transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Restart,
    Halt,
    PowerOff,
}

impl Transition {
    pub fn reboot_mode(self) -> RebootMode {
        match self {
            Transition::Restart => RebootMode::RB_AUTOBOOT,
            Transition::Halt => RebootMode::RB_HALT_SYSTEM,
            Transition::PowerOff => RebootMode::RB_POWER_OFF,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Restart => write!(f, "reboot"),
            Transition::Halt => write!(f, "halt"),
            Transition::PowerOff => write!(f, "power off"),
        }
    }
}

impl fmt::Display for SystemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemAction::Reboot => write!(f, "reboot"),
            SystemAction::Halt => write!(f, "halt"),
            SystemAction::Poweroff => write!(f, "poweroff"),
            SystemAction::Reinit => write!(f, "reinit"),
        }
    }
}

/// Everything an action needs to run.
#[derive(Clone)]
pub struct ActionContext {
    pub system: Arc<dyn System>,
    pub quit: QuitBroadcast,
    pub grace_period: Duration,
}

impl ActionContext {
    pub fn new(system: Arc<dyn System>, quit: QuitBroadcast) -> Self {
        Self {
            system,
            quit,
            grace_period: GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

impl SystemAction {
    /// Run the action.
    ///
    /// On the real platform this only returns on failure.
    pub async fn perform(self, ctx: &ActionContext) -> Result<()> {
        match self {
            SystemAction::Reboot => power_transition(ctx, Transition::Restart).await,
            SystemAction::Halt => power_transition(ctx, Transition::Halt).await,
            SystemAction::Poweroff => power_transition(ctx, Transition::PowerOff).await,
            SystemAction::Reinit => reinit(ctx).await,
        }
    }
}

/// Quit, settle, sync, then hand the machine to the kernel.
async fn power_transition(ctx: &ActionContext, transition: Transition) -> Result<()> {
    info!(%transition, "Initiating power transition");
    ctx.quit.fire();
    tokio::time::sleep(ctx.grace_period).await;
    ctx.system.sync();
    ctx.system.power(transition)
}

/// Terminate everything, collect the dead and re-exec as PID 1.
async fn reinit(ctx: &ActionContext) -> Result<()> {
    info!("Restarting init, sending signals to all processes");
    ctx.quit.fire();
    ctx.system.kill_all(Signal::SIGTERM)?;

    tokio::time::sleep(ctx.grace_period).await;
    if let Err(e) = ctx.system.kill_all(Signal::SIGKILL) {
        warn!(error = %e, "Kill broadcast failed");
    }

    let system = Arc::clone(&ctx.system);
    tokio::task::spawn_blocking(move || system.drain_children())
        .await
        .map_err(|e| Error::Task(e.to_string()))??;

    ctx.system.reexec()
}
