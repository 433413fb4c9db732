//! Foreground processes.

use crate::launcher;
use crate::model::{ArgumentVector, Completed, Error, ExitStatus, Result};
use crate::signals::InterruptGuard;
use log::debug;
use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::unistd::Pid;

/// Runs a command and waits for it to terminate.
///
/// The shell ignores SIGINT until this function returns, while the child
/// gets the default disposition back before exec.
pub fn run_foreground(args: &ArgumentVector) -> Result<Completed> {
    let _guard = InterruptGuard::ignore()?;
    let child = launcher::launch(args)?;
    let status = wait_for(child.pid)?;
    let elapsed = child.started.elapsed();
    debug!("foreground {} finished: {}", child.pid, status);
    Ok(Completed {
        pid: child.pid,
        status,
        elapsed,
    })
}

/// Blocks until the given child terminates.
fn wait_for(pid: Pid) -> Result<ExitStatus> {
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            Err(err) => return Err(Error::Wait { pid, source: err }),
            Ok(ws) => match ExitStatus::from_wait_status(ws) {
                None => continue,
                Some((_, status)) => return Ok(status),
            },
        }
    }
}
