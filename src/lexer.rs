//! Splits a command line into arguments.

use crate::model::{ArgumentVector, Error, Result};

/// A token inside the command line.
#[derive(Debug, PartialEq)]
pub enum Token {
    Ampersand,
    CmdOrArg(String),
}

/// A command line ready to be dispatched.
#[derive(Debug, PartialEq)]
pub struct CommandLine {
    pub arguments: ArgumentVector,
    pub background: bool,
}

/// Scans the command line.
pub fn scan(cmdline: &str) -> Vec<Token> {
    let mut lexer = Lexer::new();
    lexer.run(cmdline)
}

/// Scans the command line and strips the trailing `&`, if any.
pub fn parse(cmdline: &str) -> Result<CommandLine> {
    let mut tokens = scan(cmdline);
    let background = tokens.last() == Some(&Token::Ampersand);
    if background {
        tokens.pop();
    }
    let mut arguments = Vec::with_capacity(tokens.len());
    for tok in tokens {
        match tok {
            Token::CmdOrArg(arg) => arguments.push(arg),
            Token::Ampersand => {
                return Err(Error::Parse(String::from("`&` must end the command")))
            }
        }
    }
    if background && arguments.is_empty() {
        return Err(Error::Parse(String::from("`&` without a command")));
    }
    Ok(CommandLine {
        arguments: ArgumentVector::new(arguments),
        background,
    })
}

/// Lexer for the command line.
struct Lexer {
    buffer: String,
}

impl Lexer {
    /// creates a new lexer instance.
    fn new() -> Lexer {
        Lexer {
            buffer: String::new(),
        }
    }

    /// runs the scanner.
    fn run(self: &mut Self, input: &str) -> Vec<Token> {
        let mut r = Vec::<Token>::new();
        for c in input.chars() {
            if c.is_whitespace() {
                self.leave(&mut r);
                continue;
            }
            if c == '&' {
                self.leave(&mut r);
                r.push(Token::Ampersand);
                continue;
            }
            self.buffer.push(c);
        }
        self.leave(&mut r);
        r
    }

    /// called when we stop being inside a command or argument.
    fn leave(self: &mut Self, toks: &mut Vec<Token>) {
        if !self.buffer.is_empty() {
            toks.push(Token::CmdOrArg(self.buffer.clone()));
            self.buffer.clear();
        }
    }
}
