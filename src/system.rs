//! Platform side effects used by system actions.
//!
//! The [`System`] trait is the seam between the action logic and the
//! kernel. [`LinuxSystem`] performs the real syscalls; tests substitute a
//! recording implementation.

use crate::action::Transition;
use crate::error::{Error, Result};
use crate::reaper::{ReapMode, Reaper, SystemWaiter};
use nix::sys::reboot::reboot;
use nix::sys::signal::{kill, Signal};
use nix::unistd::{execve, Pid};
use std::ffi::{CString, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use tracing::info;

/// Side effects performed by system actions.
///
/// On the real platform `power` and `reexec` never return on success.
/// Implementations that do return `Ok` leave the supervisor running.
pub trait System: Send + Sync + 'static {
    /// Flush filesystem buffers to persistent storage.
    fn sync(&self);

    /// Perform a power state transition.
    fn power(&self, transition: Transition) -> Result<()>;

    /// Send `signal` to every process in the system.
    fn kill_all(&self, signal: Signal) -> Result<()>;

    /// Reap every child that is already dead or dying, then return.
    fn drain_children(&self) -> Result<()>;

    /// Replace the current process image with a fresh supervisor.
    fn reexec(&self) -> Result<()>;
}

/// Executable, arguments and environment of the running supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecImage {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
}

impl ExecImage {
    /// Capture the image of the current process.
    pub fn capture() -> Self {
        Self::from_args(std::env::args_os().collect(), std::env::vars_os().collect())
    }

    /// Build an image from argv and environment.
    ///
    /// The program is argv[0] whenever it names a path, so a re-exec runs
    /// whatever binary now sits where init was invoked from, even if the
    /// running one has been replaced on disk. A bare name falls back to the
    /// running executable, and to the bare name itself when that cannot be
    /// resolved (for example before /proc is mounted).
    pub fn from_args(args: Vec<OsString>, env: Vec<(OsString, OsString)>) -> Self {
        let program = match args.first() {
            Some(argv0) if argv0.as_bytes().contains(&b'/') => PathBuf::from(argv0),
            Some(argv0) => std::env::current_exe().unwrap_or_else(|_| PathBuf::from(argv0)),
            None => std::env::current_exe().unwrap_or_default(),
        };
        Self { program, args, env }
    }

    /// Convert to the argument triple expected by `execve`.
    pub fn to_exec_args(&self) -> Result<(CString, Vec<CString>, Vec<CString>)> {
        let program = to_cstring(self.program.as_os_str().as_bytes().to_vec())?;
        let args = self
            .args
            .iter()
            .map(|arg| to_cstring(arg.as_bytes().to_vec()))
            .collect::<Result<Vec<_>>>()?;
        let env = self
            .env
            .iter()
            .map(|(key, value)| {
                let mut pair = key.as_bytes().to_vec();
                pair.push(b'=');
                pair.extend_from_slice(value.as_bytes());
                to_cstring(pair)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((program, args, env))
    }
}

fn to_cstring(bytes: Vec<u8>) -> Result<CString> {
    CString::new(bytes).map_err(|e| Error::InvalidExecImage(e.to_string()))
}

/// The real Linux platform.
#[derive(Debug, Clone)]
pub struct LinuxSystem {
    image: ExecImage,
}

impl LinuxSystem {
    pub fn new(image: ExecImage) -> Self {
        Self { image }
    }
}

impl System for LinuxSystem {
    fn sync(&self) {
        nix::unistd::sync();
    }

    fn power(&self, transition: Transition) -> Result<()> {
        match reboot(transition.reboot_mode()) {
            Ok(never) => match never {},
            Err(source) => Err(Error::Transition { transition, source }),
        }
    }

    fn kill_all(&self, signal: Signal) -> Result<()> {
        kill(Pid::from_raw(-1), signal).map_err(|source| Error::SignalBroadcast { signal, source })
    }

    fn drain_children(&self) -> Result<()> {
        Reaper::new(SystemWaiter).reap(ReapMode::Draining)
    }

    fn reexec(&self) -> Result<()> {
        let (program, args, env) = self.image.to_exec_args()?;
        info!(program = %self.image.program.display(), "Replacing process image");
        match execve(&program, &args, &env) {
            Ok(never) => match never {},
            Err(e) => Err(Error::Reexec(e)),
        }
    }
}
