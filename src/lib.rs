//! A minimal command interpreter supervising foreground and background
//! children.

pub mod background;
pub mod config;
pub mod coordinator;
pub mod foreground;
pub mod interp;
pub mod launcher;
pub mod lexer;
pub mod model;
pub mod reaper;
pub mod session;
pub mod signals;
