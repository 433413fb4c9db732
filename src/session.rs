//! Process group ownership.
//!
//! Shutdown broadcasts SIGTERM to the shell's process group, which is only
//! correct when the shell leads its own group. [`establish`] makes that
//! true at startup instead of relying on how the shell was started.

use crate::model::{Error, Result};
use crate::signals;
use log::debug;
use nix::errno::Errno;
use nix::sys::signal::{SigHandler, Signal};
use nix::unistd::{getpgrp, getpid, setpgid, Pid};
use once_cell::sync::OnceCell;
use std::io::IsTerminal;

/// The process group led by this shell, once established.
static GROUP: OnceCell<Pid> = OnceCell::new();

/// Makes the shell the leader of its own process group. When stdin is a
/// terminal, the new group also becomes the terminal foreground group.
pub fn establish() -> Result<Pid> {
    let pid = getpid();
    if getpgrp() != pid {
        setpgid(Pid::from_raw(0), Pid::from_raw(0)).map_err(Error::Session)?;
        debug!("created process group {}", pid);
    }
    if std::io::stdin().is_terminal() {
        claim_terminal(pid)?;
    }
    let _ = GROUP.set(pid);
    Ok(pid)
}

/// Returns the process group established by [`establish`].
pub fn group() -> Result<Pid> {
    GROUP.get().copied().ok_or(Error::NoSession)
}

/// Moves the terminal foreground to the given group. SIGTTOU is ignored
/// meanwhile, since we may be calling from a background group.
fn claim_terminal(group: Pid) -> Result<()> {
    let previous = signals::set_disposition(Signal::SIGTTOU, SigHandler::SigIgn)?;
    let rv = unsafe { libc::tcsetpgrp(libc::STDIN_FILENO, group.as_raw()) };
    let claimed = Errno::result(rv).map(|_| ()).map_err(Error::Session);
    signals::restore_disposition(Signal::SIGTTOU, &previous)?;
    claimed
}
