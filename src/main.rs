use reapsh::config::{Config, Parsed};
use reapsh::coordinator;
use reapsh::interp::{Flow, Interpreter};
use reapsh::model::Error;
use reapsh::{session, signals};
use std::io::{IsTerminal, Stdout, Write};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("reapsh");
    let config = match Config::parse(program, args.get(1..).unwrap_or(&[])) {
        Ok(Parsed::Run(config)) => config,
        Ok(Parsed::Help(usage)) => {
            print!("{}", usage);
            return;
        }
        Err(err) => {
            eprintln!("sh: {}", err);
            std::process::exit(2);
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter()))
        .init();

    if let Err(err) = session::establish().and_then(|_| signals::install()) {
        fatal(err);
    }
    let mut interp = Interpreter::new(config.verbose, std::io::stdout());
    match config.command {
        Some(cmdline) => {
            execute(&mut interp, &cmdline);
        }
        None => repl(&mut interp),
    }
    shutdown()
}

/// Reads and runs command lines until `exit` or end of input.
fn repl(interp: &mut Interpreter<Stdout>) {
    let interactive = std::io::stdin().is_terminal();
    loop {
        if coordinator::is_terminating() {
            coordinator::await_exit();
        }
        if let Err(err) = interp.reap_finished() {
            fatal(err);
        }
        if interactive {
            prompt();
        }
        let cmdline = match getcmd() {
            None => return,
            Some(cmdline) => cmdline,
        };
        if execute(interp, &cmdline) == Flow::Exit {
            return;
        }
    }
}

/// Runs a command line, aborting on fatal errors.
fn execute(interp: &mut Interpreter<Stdout>, cmdline: &str) -> Flow {
    match interp.run(cmdline) {
        Ok(flow) => flow,
        Err(err) if err.is_fatal() => fatal(err),
        Err(err) => {
            eprintln!("{}", err);
            Flow::Continue
        }
    }
}

/// Prints the prompt.
fn prompt() {
    let cwd = match std::env::current_dir() {
        Ok(path) => path.display().to_string(),
        Err(_) => String::from("?"),
    };
    print!("{} $ ", cwd);
    let _ = std::io::stdout().flush();
}

/// Reads a command from the standard input, None at end of input.
fn getcmd() -> Option<String> {
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            eprintln!("sh: {}", err);
            None
        }
    }
}

/// Terminates and collects all children, then exits.
fn shutdown() -> ! {
    match coordinator::terminate_all() {
        Ok(never) => match never {},
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1)
        }
    }
}

/// Aborts the shell. If shutdown already started on the signals thread,
/// the failure was caused by it collecting our child: let it finish.
fn fatal(err: Error) -> ! {
    if coordinator::is_terminating() {
        coordinator::await_exit();
    }
    eprintln!("{}", err);
    std::process::exit(1)
}
