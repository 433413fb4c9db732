//! Interprets command lines scanned by the lexer (lexer.rs).

use crate::background;
use crate::foreground;
use crate::lexer::{self, CommandLine};
use crate::model::{ArgumentVector, Error, Result};
use crate::reaper::{self, Mode};
use log::debug;
use std::io::Write;

/// What the driver should do after a command line.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Interprets command lines, writing reports to the given output.
pub struct Interpreter<W: Write> {
    verbose: bool,
    out: W,
}

impl<W: Write> Interpreter<W> {
    /// Creates a new interpreter.
    pub fn new(verbose: bool, out: W) -> Interpreter<W> {
        Interpreter { verbose, out }
    }

    /// Runs a single command line.
    pub fn run(self: &mut Self, cmdline: &str) -> Result<Flow> {
        let cl = lexer::parse(cmdline)?;
        match cl.arguments.program() {
            // we arrive here when we hit [Enter] at the prompt
            None => Ok(Flow::Continue),
            Some("exit") => Ok(Flow::Exit),
            Some("cd") => {
                Self::builtin_cd(&cl.arguments)?;
                Ok(Flow::Continue)
            }
            Some(_) => {
                self.launch(cl)?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Reports the background children that have terminated.
    pub fn reap_finished(self: &mut Self) -> Result<()> {
        for r in reaper::reap(Mode::NonBlocking)? {
            writeln!(self.out, "{}", r)?;
        }
        Ok(())
    }

    /// Dispatches to the foreground or to the background.
    fn launch(self: &mut Self, cl: CommandLine) -> Result<()> {
        self.maybe_debug(&cl);
        if cl.background {
            let pid = background::run_background(&cl.arguments)?;
            writeln!(self.out, "[{}] started", pid)?;
        } else {
            let completed = foreground::run_foreground(&cl.arguments)?;
            writeln!(self.out, "{}", completed)?;
        }
        Ok(())
    }

    /// Implements the builtin `cd` command
    fn builtin_cd(args: &ArgumentVector) -> Result<()> {
        match args.operands() {
            [directory] => Ok(std::env::set_current_dir(directory)?),
            _ => Err(Error::Usage("cd <directory>")),
        }
    }

    /// Possibly log the commands we're about to execute.
    fn maybe_debug(self: &Self, cl: &CommandLine) {
        if self.verbose {
            debug!("+ {}{}", cl.arguments, if cl.background { " &" } else { "" });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::live_count;
    use serial_test::serial;
    use std::time::{Duration, Instant};

    fn output(interp: Interpreter<Vec<u8>>) -> String {
        String::from_utf8(interp.out).unwrap()
    }

    #[test]
    fn exit_and_blank_lines() {
        let mut interp = Interpreter::new(false, Vec::new());
        assert_eq!(interp.run("").unwrap(), Flow::Continue);
        assert_eq!(interp.run("  exit  ").unwrap(), Flow::Exit);
        assert!(output(interp).is_empty());
    }

    #[test]
    fn cd_requires_one_directory() {
        let mut interp = Interpreter::new(false, Vec::new());
        assert!(matches!(interp.run("cd"), Err(Error::Usage(_))));
        assert!(matches!(interp.run("cd a b"), Err(Error::Usage(_))));
        let err = interp.run("cd /reapsh/no/such/dir").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    #[serial]
    fn foreground_line_reports_status() {
        let mut interp = Interpreter::new(true, Vec::new());
        assert_eq!(interp.run("true").unwrap(), Flow::Continue);
        interp.run("false").unwrap();
        let out = output(interp);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("exit status 0"), "{}", lines[0]);
        assert!(lines[1].contains("exit status 1"), "{}", lines[1]);
    }

    #[test]
    #[serial]
    fn background_line_is_reaped_later() {
        let mut interp = Interpreter::new(false, Vec::new());
        interp.run("true &").unwrap();
        assert_eq!(live_count(), 1);
        let deadline = Instant::now() + Duration::from_secs(5);
        while live_count() > 0 && Instant::now() < deadline {
            interp.reap_finished().unwrap();
            std::thread::sleep(Duration::from_millis(10));
        }
        let out = output(interp);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let pid = lines[0]
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix("] started"))
            .unwrap();
        assert_eq!(lines[1], format!("[{}] done: exit status 0", pid));
    }
}
