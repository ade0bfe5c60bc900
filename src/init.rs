//! Init wiring - startup sequence and configuration.

use crate::action::{ActionContext, GRACE_PERIOD};
use crate::error::{Error, Result};
use crate::process;
use crate::quit::QuitBroadcast;
use crate::reaper::{Reaper, SystemWaiter, IDLE_INTERVAL};
use crate::relay::LogRelay;
use crate::signals::{suppress_job_control_signals, SignalRouter, SignalTable};
use crate::supervisor::Supervisor;
use crate::system::{ExecImage, LinuxSystem, System};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Init configuration.
#[derive(Debug, Clone)]
pub struct InitConfig {
    /// Syslog socket to relay to stdout; `None` disables the relay
    pub syslog_socket: Option<PathBuf>,
    /// Delay between quitting and a power transition or kill broadcast
    pub grace_period: Duration,
    /// Standing reaper pause when there are no children
    pub reap_idle_interval: Duration,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            syslog_socket: None,
            grace_period: GRACE_PERIOD,
            reap_idle_interval: IDLE_INTERVAL,
        }
    }
}

/// The init process: one initial service plus PID 1 duties.
pub struct Init {
    config: InitConfig,
    command: Vec<String>,
    system: Arc<dyn System>,
}

impl Init {
    /// Create an init that will launch `command` on the real platform.
    pub fn new(config: InitConfig, command: Vec<String>) -> Self {
        let system = LinuxSystem::new(ExecImage::capture());
        Self::with_system(config, command, Arc::new(system))
    }

    /// Create an init with explicit platform side effects.
    pub fn with_system(config: InitConfig, command: Vec<String>, system: Arc<dyn System>) -> Self {
        Self {
            config,
            command,
            system,
        }
    }

    /// Run the init.
    ///
    /// Startup failures return before any background component starts.
    /// Afterwards this returns only when a system action or the reaper
    /// fails; successful power transitions never come back.
    pub async fn run(self) -> Result<()> {
        if self.command.is_empty() {
            return Err(Error::EmptyCommand);
        }
        info!(pid = std::process::id(), "minit starting");

        suppress_job_control_signals()?;
        let table = SignalTable::canonical();
        let signals = SignalRouter::subscribe(&table)?;

        let quit = QuitBroadcast::new();
        if let Some(ref path) = self.config.syslog_socket {
            let relay = LogRelay::bind(path)?;
            relay.spawn(quit.clone(), tokio::io::stdout);
        }

        process::launch(&self.command)?;

        let reaper = Reaper::new(SystemWaiter)
            .with_idle_interval(self.config.reap_idle_interval)
            .spawn_standing()?;

        let context = ActionContext::new(self.system, quit)
            .with_grace_period(self.config.grace_period);
        Supervisor::new(table, context).run(signals, reaper).await
    }
}
