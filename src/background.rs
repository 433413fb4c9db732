//! Background processes management.

use crate::launcher;
use crate::model::{ArgumentVector, Result};
use log::debug;
use nix::unistd::Pid;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of background children launched and not yet reaped.
static LIVE: AtomicUsize = AtomicUsize::new(0);

/// Returns the number of background children not yet reaped.
pub fn live_count() -> usize {
    LIVE.load(Ordering::SeqCst)
}

/// Launches a command without waiting for it.
pub fn run_background(args: &ArgumentVector) -> Result<Pid> {
    let child = launcher::launch(args)?;
    let live = LIVE.fetch_add(1, Ordering::SeqCst) + 1;
    debug!("background {} started, {} live", child.pid, live);
    Ok(child.pid)
}

/// Accounts for a child collected by the reaper. Saturates at zero
/// because the shutdown drain also collects the foreground child.
pub(crate) fn retire() {
    let _ = LIVE.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
}
