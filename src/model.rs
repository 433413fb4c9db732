//! Common data model.

use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::ffi::CString;
use std::time::{Duration, Instant};

/// Error emitted by the shell.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sh: cannot create child process: {0}")]
    Launch(#[source] nix::Error),

    #[error("sh: waiting for process {pid} failed: {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: nix::Error,
    },

    #[error("sh: collecting terminated children failed: {0}")]
    Collect(#[source] nix::Error),

    #[error("sh: cannot signal process group {group}: {source}")]
    Broadcast {
        group: Pid,
        #[source]
        source: nix::Error,
    },

    #[error("sh: cannot change signal disposition: {0}")]
    Disposition(#[source] nix::Error),

    #[error("sh: cannot establish process group: {0}")]
    Session(#[source] nix::Error),

    #[error("sh: process group has not been established")]
    NoSession,

    #[error("sh: cannot install signal handlers: {0}")]
    SignalThread(#[source] std::io::Error),

    #[error("sh: empty command")]
    EmptyCommand,

    #[error("sh: argument contains a NUL byte")]
    InvalidArgument(#[from] std::ffi::NulError),

    #[error("sh: parse error: {0}")]
    Parse(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("sh: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of an operation.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether the error leaves the shell unable to supervise
    /// its children, in which case the shell must not continue.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Launch(_)
            | Error::Wait { .. }
            | Error::Collect(_)
            | Error::Broadcast { .. }
            | Error::Disposition(_)
            | Error::Session(_)
            | Error::NoSession
            | Error::SignalThread(_) => true,
            Error::EmptyCommand
            | Error::InvalidArgument(_)
            | Error::Parse(_)
            | Error::Usage(_)
            | Error::Io(_) => false,
        }
    }
}

/// The arguments of a command, program name first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentVector {
    arguments: Vec<String>,
}

impl ArgumentVector {
    /// Creates a new argument vector.
    pub fn new(arguments: Vec<String>) -> ArgumentVector {
        ArgumentVector { arguments }
    }

    /// Returns the program name, if any.
    pub fn program(&self) -> Option<&str> {
        self.arguments.first().map(String::as_str)
    }

    /// Returns the arguments following the program name.
    pub fn operands(&self) -> &[String] {
        self.arguments.get(1..).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Converts to the C representation expected by execvp. This must
    /// happen before forking since the child may not allocate.
    pub(crate) fn to_c_strings(&self) -> Result<Vec<CString>> {
        let mut out = Vec::with_capacity(self.arguments.len());
        for arg in &self.arguments {
            out.push(CString::new(arg.as_bytes())?);
        }
        Ok(out)
    }
}

impl<S: Into<String>> FromIterator<S> for ArgumentVector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ArgumentVector::new(iter.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for ArgumentVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.arguments.join(" "))
    }
}

/// A child we have launched and not yet reaped.
#[derive(Debug, Clone, Copy)]
pub struct ChildHandle {
    pub pid: Pid,
    pub started: Instant,
}

/// How a child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(Signal),
}

impl ExitStatus {
    /// Extracts the pid and termination status from a wait status. Returns
    /// None for statuses that do not mean the child is gone.
    pub fn from_wait_status(ws: WaitStatus) -> Option<(Pid, ExitStatus)> {
        match ws {
            WaitStatus::Exited(pid, code) => Some((pid, ExitStatus::Exited(code))),
            WaitStatus::Signaled(pid, signal, _) => Some((pid, ExitStatus::Signaled(signal))),
            _ => None,
        }
    }

    pub fn success(&self) -> bool {
        *self == ExitStatus::Exited(0)
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit status {}", code),
            ExitStatus::Signaled(signal) => write!(f, "terminated by {}", signal.as_str()),
        }
    }
}

/// A background child collected by the reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    pub pid: Pid,
    pub status: ExitStatus,
}

impl std::fmt::Display for Reaped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] done: {}", self.pid, self.status)
    }
}

/// A foreground child that ran to completion.
#[derive(Debug, Clone, Copy)]
pub struct Completed {
    pub pid: Pid,
    pub status: ExitStatus,
    pub elapsed: Duration,
}

impl Completed {
    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

impl std::fmt::Display for Completed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({} ms)",
            self.pid,
            self.status,
            self.elapsed_millis()
        )
    }
}
