//! Creates child processes using fork and exec.

use crate::model::{ArgumentVector, ChildHandle, Error, Result};
use log::debug;
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{fork, ForkResult};
use std::ffi::CStr;
use std::ptr;
use std::time::Instant;

/// Exit status of a child whose program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit status of a child whose program could not be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Launches the program named by the first argument.
///
/// In the parent, returns the handle of the new child. The child never
/// returns from this function: it either becomes the requested program
/// or exits with [`EXIT_NOT_FOUND`] or [`EXIT_NOT_EXECUTABLE`] after
/// printing a diagnostic on its stderr.
pub fn launch(args: &ArgumentVector) -> Result<ChildHandle> {
    let argv = args.to_c_strings()?;
    let program = match argv.first() {
        None => return Err(Error::EmptyCommand),
        Some(program) => program.as_c_str(),
    };
    let mut argp: Vec<*const libc::c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
    argp.push(ptr::null());
    let started = Instant::now();
    // SAFETY: the child only performs async-signal-safe operations
    // (signal, execvp, write, _exit) on memory allocated before forking.
    match unsafe { fork() } {
        Err(err) => Err(Error::Launch(err)),
        Ok(ForkResult::Parent { child }) => {
            debug!("launched {} as {}", args, child);
            Ok(ChildHandle {
                pid: child,
                started,
            })
        }
        Ok(ForkResult::Child) => exec_child(program, &argp),
    }
}

/// Replaces the child image, never returns. The argument array must be
/// null terminated.
fn exec_child(program: &CStr, argp: &[*const libc::c_char]) -> ! {
    // The child must be interruptible regardless of what the shell
    // was ignoring at fork time.
    unsafe {
        let _ = signal::signal(Signal::SIGINT, SigHandler::SigDfl);
        let _ = signal::signal(Signal::SIGTERM, SigHandler::SigDfl);
    }
    unsafe { libc::execvp(program.as_ptr(), argp.as_ptr()) };
    let err = Errno::last();
    report_exec_failure(program, err);
    let status = match err {
        Errno::ENOENT => EXIT_NOT_FOUND,
        _ => EXIT_NOT_EXECUTABLE,
    };
    unsafe { libc::_exit(status) }
}

/// Writes `sh: <program>: <reason>` to stderr without allocating.
fn report_exec_failure(program: &CStr, err: Errno) {
    for chunk in [
        b"sh: ".as_slice(),
        program.to_bytes(),
        b": ".as_slice(),
        err.desc().as_bytes(),
        b"\n".as_slice(),
    ] {
        unsafe {
            libc::write(
                libc::STDERR_FILENO,
                chunk.as_ptr() as *const libc::c_void,
                chunk.len(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExitStatus;
    use nix::sys::wait::waitpid;
    use serial_test::serial;

    fn wait(handle: ChildHandle) -> ExitStatus {
        let ws = waitpid(handle.pid, None).unwrap();
        let (pid, status) = ExitStatus::from_wait_status(ws).unwrap();
        assert_eq!(pid, handle.pid);
        status
    }

    #[test]
    #[serial]
    fn launches_program_with_arguments() {
        let args: ArgumentVector = vec!["sh", "-c", "exit 7"].into_iter().collect();
        let handle = launch(&args).unwrap();
        assert_eq!(wait(handle), ExitStatus::Exited(7));
    }

    #[test]
    #[serial]
    fn passes_every_argument() {
        let args: ArgumentVector = vec!["sh", "-c", "exit $#", "sh", "a", "b", "c"]
            .into_iter()
            .collect();
        let handle = launch(&args).unwrap();
        assert_eq!(wait(handle), ExitStatus::Exited(3));
    }

    #[test]
    #[serial]
    fn missing_program_exits_with_not_found() {
        let args: ArgumentVector = vec!["reapsh-no-such-program"].into_iter().collect();
        let handle = launch(&args).unwrap();
        assert_eq!(wait(handle), ExitStatus::Exited(EXIT_NOT_FOUND));
    }

    #[test]
    #[serial]
    fn non_executable_file_exits_with_not_executable() {
        let path = std::env::temp_dir().join(format!("reapsh-noexec-{}", std::process::id()));
        std::fs::write(&path, "not a program\n").unwrap();
        let args: ArgumentVector = vec![path.to_string_lossy().into_owned()]
            .into_iter()
            .collect();
        let handle = launch(&args).unwrap();
        let status = wait(handle);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(status, ExitStatus::Exited(EXIT_NOT_EXECUTABLE));
    }

    #[test]
    fn empty_command_is_rejected_without_forking() {
        assert!(matches!(
            launch(&ArgumentVector::default()),
            Err(Error::EmptyCommand)
        ));
    }
}
