//! Error types for the minit supervisor.

use nix::sys::signal::Signal;
use std::path::PathBuf;
use thiserror::Error;

use crate::action::Transition;

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the supervisor.
#[derive(Error, Debug)]
pub enum Error {
    /// No initial service command was given
    #[error("No initial service command given")]
    EmptyCommand,

    /// Initial service failed to start
    #[error("Failed to start initial service {program}: {source}")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Log relay socket could not be claimed
    #[error("Failed to create syslog socket {}: {source}", path.display())]
    RelayBind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Signal subscription failed
    #[error("Failed to subscribe to {signal}: {source}")]
    SignalSubscribe {
        signal: Signal,
        #[source]
        source: std::io::Error,
    },

    /// Signal broadcast to every process failed
    #[error("Failed to send {signal} to all processes: {source}")]
    SignalBroadcast {
        signal: Signal,
        #[source]
        source: nix::Error,
    },

    /// Waiting for child exit failed
    #[error("Error while waiting for child exit: {0}")]
    Wait(#[source] nix::Error),

    /// Power state transition failed
    #[error("Failed to {transition}: {source}")]
    Transition {
        transition: Transition,
        #[source]
        source: nix::Error,
    },

    /// Replacing the process image failed
    #[error("Failed to re-exec init: {0}")]
    Reexec(#[source] nix::Error),

    /// Arguments or environment cannot be passed to execve
    #[error("Invalid exec image: {0}")]
    InvalidExecImage(String),

    /// Standing reaper stopped without an error
    #[error("Child reaper stopped unexpectedly")]
    ReaperStopped,

    /// Background task failed
    #[error("Background task failed: {0}")]
    Task(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Nix error
    #[error("System error: {0}")]
    Nix(#[from] nix::Error),
}
