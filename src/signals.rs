//! Signal routing.
//!
//! SIGINT and SIGTERM are delivered through signal-hook to a dedicated
//! thread that runs the termination coordinator. The raw handler thus
//! never touches shell state.

use crate::coordinator;
use crate::model::{Error, Result};
use log::{debug, warn};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::thread;

/// Registers the termination coordinator for SIGINT and SIGTERM.
pub fn install() -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(Error::SignalThread)?;
    thread::Builder::new()
        .name("signals".to_owned())
        .spawn(move || {
            for signo in signals.forever() {
                debug!("received signal {}", signo);
                match coordinator::terminate_all() {
                    Ok(never) => match never {},
                    Err(err) => {
                        eprintln!("{}", err);
                        std::process::exit(1);
                    }
                }
            }
        })
        .map_err(Error::SignalThread)?;
    Ok(())
}

/// Replaces the disposition of a signal, returning the previous one.
pub(crate) fn set_disposition(signal: Signal, handler: SigHandler) -> Result<SigAction> {
    let action = SigAction::new(handler, SaFlags::empty(), SigSet::empty());
    // SAFETY: only SigIgn and SigDfl are installed from here, or a
    // previously installed action is put back.
    unsafe { sigaction(signal, &action) }.map_err(Error::Disposition)
}

/// Reinstalls a disposition returned by [`set_disposition`].
pub(crate) fn restore_disposition(signal: Signal, previous: &SigAction) -> Result<()> {
    // SAFETY: see set_disposition.
    unsafe { sigaction(signal, previous) }
        .map(|_| ())
        .map_err(Error::Disposition)
}

/// Keeps the shell deaf to SIGINT while a foreground child runs, so that
/// an interrupt from the terminal only affects the child. Dropping the
/// guard puts back whatever disposition was installed before.
pub struct InterruptGuard {
    previous: SigAction,
}

impl InterruptGuard {
    /// Starts ignoring SIGINT.
    pub fn ignore() -> Result<InterruptGuard> {
        let previous = set_disposition(Signal::SIGINT, SigHandler::SigIgn)?;
        Ok(InterruptGuard { previous })
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if let Err(err) = restore_disposition(Signal::SIGINT, &self.previous) {
            warn!("cannot restore SIGINT handling: {}", err);
        }
    }
}
