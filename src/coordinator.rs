//! Shutdown coordination.
//!
//! Both an interrupt and a termination request, as well as `exit`, end up
//! in [`terminate_all`]: every process in the shell's group is sent
//! SIGTERM and collected before the shell itself exits.

use crate::model::{Error, Reaped, Result};
use crate::reaper::{self, Mode};
use crate::session;
use crate::signals;
use log::{info, warn};
use nix::sys::signal::{killpg, SigHandler, Signal};
use nix::unistd::Pid;
use std::convert::Infallible;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static TERMINATING: AtomicBool = AtomicBool::new(false);

/// Returns whether shutdown has started.
pub fn is_terminating() -> bool {
    TERMINATING.load(Ordering::SeqCst)
}

/// Terminates and reaps every child, then exits the process with status
/// zero. Only returns on failure. When shutdown is already running on
/// another thread, waits for it to exit the process.
pub fn terminate_all() -> Result<Infallible> {
    if TERMINATING.swap(true, Ordering::SeqCst) {
        await_exit();
    }
    let group = session::group()?;
    info!("terminating process group {}", group);
    broadcast(group)?;
    reaper::reap_each(Mode::Blocking, report)?;
    if let Err(err) = std::io::stdout().flush() {
        warn!("cannot flush reports: {}", err);
    }
    info!("all children collected, exiting");
    std::process::exit(0)
}

/// Parks the calling thread until the shutdown in progress exits.
pub fn await_exit() -> ! {
    loop {
        std::thread::park();
    }
}

/// Sends SIGTERM to the whole group while ignoring it ourselves. SIGCONT
/// follows so that stopped children act on the pending SIGTERM.
fn broadcast(group: Pid) -> Result<()> {
    let previous = signals::set_disposition(Signal::SIGTERM, SigHandler::SigIgn)?;
    let sent = killpg(group, Signal::SIGTERM).and_then(|_| killpg(group, Signal::SIGCONT));
    signals::restore_disposition(Signal::SIGTERM, &previous)?;
    sent.map_err(|source| Error::Broadcast { group, source })
}

/// Prints a drained child. Write failures must not stop the drain.
fn report(reaped: Reaped) {
    if let Err(err) = writeln!(std::io::stdout(), "{}", reaped) {
        warn!("cannot report {}: {}", reaped.pid, err);
    }
}
