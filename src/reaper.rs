//! Collects terminated children.

use crate::background;
use crate::model::{Error, ExitStatus, Reaped, Result};
use log::debug;
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

/// How the reaper waits for children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Collect only children that already exited.
    NonBlocking,
    /// Wait until every child has been collected.
    Blocking,
}

/// Collects terminated children according to the given mode.
///
/// A non-blocking pass makes at most as many attempts as there are live
/// background children, so an idle shell does not spin while a burst of
/// children finishing together is drained in one pass.
pub fn reap(mode: Mode) -> Result<Vec<Reaped>> {
    let mut reaped = Vec::new();
    reap_each(mode, |r| reaped.push(r))?;
    Ok(reaped)
}

/// Like [`reap`], but hands each child to `on_reaped` as soon as it is
/// collected instead of after the whole pass.
pub fn reap_each<F: FnMut(Reaped)>(mode: Mode, on_reaped: F) -> Result<()> {
    match mode {
        Mode::NonBlocking => poll(on_reaped),
        Mode::Blocking => drain(on_reaped),
    }
}

/// Outcome of a single collection attempt.
enum Collection {
    Reaped(Reaped),
    /// Children exist, none has terminated yet.
    Pending,
    /// There are no children at all.
    Empty,
}

fn poll<F: FnMut(Reaped)>(mut on_reaped: F) -> Result<()> {
    for _ in 0..background::live_count() {
        match collect(Some(WaitPidFlag::WNOHANG))? {
            Collection::Reaped(r) => {
                background::retire();
                on_reaped(r);
            }
            Collection::Pending | Collection::Empty => break,
        }
    }
    Ok(())
}

fn drain<F: FnMut(Reaped)>(mut on_reaped: F) -> Result<()> {
    loop {
        match collect(None)? {
            Collection::Reaped(r) => {
                background::retire();
                on_reaped(r);
            }
            Collection::Pending => continue,
            Collection::Empty => return Ok(()),
        }
    }
}

fn collect(flags: Option<WaitPidFlag>) -> Result<Collection> {
    loop {
        match waitpid(None::<Pid>, flags) {
            Ok(WaitStatus::StillAlive) => return Ok(Collection::Pending),
            Ok(ws) => {
                if let Some((pid, status)) = ExitStatus::from_wait_status(ws) {
                    debug!("reaped {}: {}", pid, status);
                    return Ok(Collection::Reaped(Reaped { pid, status }));
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return Ok(Collection::Empty),
            Err(err) => return Err(Error::Collect(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{live_count, run_background};
    use crate::model::ArgumentVector;
    use nix::sys::signal::{kill, Signal};
    use serial_test::serial;
    use std::collections::HashSet;
    use std::thread::sleep;
    use std::time::{Duration, Instant};

    fn args(words: &[&str]) -> ArgumentVector {
        words.iter().copied().collect()
    }

    #[test]
    #[serial]
    fn nothing_to_reap_returns_immediately() {
        assert_eq!(live_count(), 0);
        let started = Instant::now();
        assert!(reap(Mode::NonBlocking).unwrap().is_empty());
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    #[serial]
    fn collects_every_background_child_once() {
        let mut launched = HashSet::new();
        for _ in 0..3 {
            launched.insert(run_background(&args(&["true"])).unwrap());
        }
        assert_eq!(live_count(), 3);

        let mut seen = HashSet::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while live_count() > 0 && Instant::now() < deadline {
            for r in reap(Mode::NonBlocking).unwrap() {
                assert_eq!(r.status, ExitStatus::Exited(0));
                assert!(seen.insert(r.pid), "{} reported twice", r.pid);
            }
            sleep(Duration::from_millis(10));
        }
        assert_eq!(seen, launched);
        assert_eq!(live_count(), 0);
    }

    #[test]
    #[serial]
    fn poll_reports_only_finished_children() {
        let slow = run_background(&args(&["sleep", "5"])).unwrap();
        let fast = run_background(&args(&["sleep", "1"])).unwrap();
        sleep(Duration::from_millis(1500));

        let reaped = reap(Mode::NonBlocking).unwrap();
        assert_eq!(
            reaped,
            vec![Reaped {
                pid: fast,
                status: ExitStatus::Exited(0)
            }]
        );
        assert_eq!(live_count(), 1);

        kill(slow, Signal::SIGKILL).unwrap();
        let reaped = reap(Mode::Blocking).unwrap();
        assert_eq!(
            reaped,
            vec![Reaped {
                pid: slow,
                status: ExitStatus::Signaled(Signal::SIGKILL)
            }]
        );
        assert_eq!(live_count(), 0);
    }

    #[test]
    #[serial]
    fn drain_hands_over_each_child_when_collected() {
        let fast = run_background(&args(&["true"])).unwrap();
        let slow = run_background(&args(&["sleep", "0.5"])).unwrap();
        let started = Instant::now();
        let mut order = Vec::new();
        reap_each(Mode::Blocking, |r| order.push((r.pid, started.elapsed()))).unwrap();
        assert_eq!(order.len(), 2);
        assert_eq!(order[0].0, fast);
        assert_eq!(order[1].0, slow);
        assert!(order[0].1 < Duration::from_millis(400), "{:?}", order);
        assert_eq!(live_count(), 0);
    }

    #[test]
    #[serial]
    fn drain_waits_for_all_children() {
        let a = run_background(&args(&["sleep", "0.2"])).unwrap();
        let b = run_background(&args(&["sleep", "0.3"])).unwrap();
        let reaped: HashSet<_> = reap(Mode::Blocking).unwrap().into_iter().map(|r| r.pid).collect();
        assert_eq!(reaped, HashSet::from([a, b]));
        assert_eq!(live_count(), 0);
        assert!(reap(Mode::Blocking).unwrap().is_empty());
    }
}
