//! Command line options.

use getopts::Options;

/// How the shell was asked to run.
#[derive(Debug, Default, PartialEq)]
pub struct Config {
    /// Log every command before launching it.
    pub verbose: bool,
    /// Single command line to run instead of reading stdin.
    pub command: Option<String>,
}

/// Outcome of parsing the command line.
#[derive(Debug, PartialEq)]
pub enum Parsed {
    Run(Config),
    Help(String),
}

fn options() -> Options {
    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    opts.optflag("v", "verbose", "log commands before running them");
    opts.optopt("c", "", "run COMMAND and exit", "COMMAND");
    opts
}

impl Config {
    /// Parses the arguments following the program name.
    pub fn parse(program: &str, args: &[String]) -> Result<Parsed, getopts::Fail> {
        let opts = options();
        let matches = opts.parse(args)?;
        if matches.opt_present("h") {
            let brief = format!("Usage: {} [options]", program);
            return Ok(Parsed::Help(opts.usage(&brief)));
        }
        if let Some(free) = matches.free.first() {
            return Err(getopts::Fail::UnrecognizedOption(free.clone()));
        }
        Ok(Parsed::Run(Config {
            verbose: matches.opt_present("v"),
            command: matches.opt_str("c"),
        }))
    }

    /// Default log filter, overridden by RUST_LOG.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}
