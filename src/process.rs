//! Initial service launcher.

use crate::error::{Error, Result};
use crate::signals::restore_job_control_signals;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use tracing::info;

/// Start the initial service and return its PID.
///
/// The service inherits stdin, stdout and stderr. This returns as soon as the
/// process has started; its exit is collected by the reaper, so the child
/// handle is dropped without waiting.
pub fn launch(argv: &[String]) -> Result<u32> {
    let (program, args) = argv.split_first().ok_or(Error::EmptyCommand)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    // SAFETY: only async-signal-safe calls between fork and exec.
    unsafe {
        cmd.pre_exec(|| restore_job_control_signals().map_err(std::io::Error::from));
    }

    let child = cmd.spawn().map_err(|source| Error::LaunchFailed {
        program: program.clone(),
        source,
    })?;

    let pid = child.id();
    info!(program = %program, pid = pid, "Started initial service");
    Ok(pid)
}
