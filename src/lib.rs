//! minit - a minimal PID 1 supervisor.
//!
//! This crate runs as process 1 in a container or small VM. It starts one
//! initial service, reaps every descendant (including reparented orphans)
//! and turns a fixed set of signals into power state transitions:
//!
//! | Signal | Action |
//! |---|---|
//! | SIGHUP, SIGINT, SIGTERM | reboot |
//! | SIGPWR, SIGUSR1 | halt |
//! | SIGUSR2 | power off |
//! | SIGQUIT | re-exec init in place |
//!
//! Optionally it relays bytes written to the syslog socket (`/dev/log`) to
//! its standard output.
//!
//! # Architecture
//!
//! - **Init**: startup sequence and configuration
//! - **Supervisor**: the event loop over signals and reaper failure
//! - **SignalTable / SignalRouter**: signal to action mapping and delivery
//! - **Reaper**: `waitpid(-1)` loop, standing or draining
//! - **SystemAction**: reboot, halt, poweroff and reinit over a [`System`]
//! - **QuitBroadcast**: one-shot stop notice for the log relay
//! - **LogRelay**: syslog socket to stdout
//!
//! # Example
//!
//! ```no_run
//! use minit::{Init, InitConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let init = Init::new(InitConfig::default(), vec!["/bin/sh".to_string()]);
//!     init.run().await?;
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod error;
pub mod init;
pub mod process;
pub mod quit;
pub mod reaper;
pub mod relay;
pub mod signals;
pub mod supervisor;
pub mod system;

// Re-export main types
pub use action::{ActionContext, SystemAction, Transition, GRACE_PERIOD};
pub use error::{Error, Result};
pub use init::{Init, InitConfig};
pub use quit::QuitBroadcast;
pub use reaper::{ChildWaiter, ReapMode, Reaper, SystemWaiter};
pub use relay::{LogRelay, DEFAULT_SYSLOG_SOCKET};
pub use signals::{SignalRouter, SignalTable};
pub use supervisor::{Supervisor, SupervisorState};
pub use system::{ExecImage, LinuxSystem, System};
