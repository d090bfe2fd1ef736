//! Runkit - commands as plain functions, chained from one invocation
//!
//! A command is an implementation plus a list of parameter declarations.
//! Runkit derives the command-line interface from those declarations, so the
//! same command can be called directly with values or run from an argv:
//!
//! ```text
//! runkit [runner options] build --release test -k smoke
//! ```
//!
//! Configuration comes from a `runkit.yml` file whose `defaults.<command>`
//! section overrides parameter defaults.

// Public modules
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod runner;
pub mod ui;
pub mod util;

// Re-export commonly used types
pub use command::{
    ArgConfig, ArgType, Args, CallArgs, Command, CommandBuilder, Container, Context, DefaultValue,
    Param, RunResult,
};
pub use error::{abort, Result, RunAborted, RunkitError};
pub use runner::Runner;

/// Current version of Runkit
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
