//! Leveled console output

use colored::Colorize;
use std::time::Duration;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

/// Console printer used by commands and the runner.
///
/// Everything goes to stderr so command output on stdout stays clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Printer {
    pub verbosity: Verbosity,
}

impl Printer {
    pub fn new(verbosity: Verbosity) -> Self {
        Printer { verbosity }
    }

    /// Print debug message (only in verbose mode)
    pub fn debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", "[DEBUG]".dimmed(), message.dimmed());
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "[INFO]".blue(), message);
        }
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "[OK]".green(), message.green());
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "[WARN]".yellow(), message.yellow());
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "[ERROR]".red(), message.red());
        }
    }

    /// Echo a command line before it runs
    pub fn echo(&self, command: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "[RUN]".cyan(), command);
        }
    }

    /// Report how long a command took
    pub fn elapsed(&self, name: &str, elapsed: Duration) {
        self.info(&format_elapsed(name, elapsed));
    }
}

impl Default for Printer {
    fn default() -> Self {
        Printer::new(Verbosity::Normal)
    }
}

/// Horizontal rule used to frame timing output
pub fn hr() -> String {
    "-".repeat(72)
}

/// Format the elapsed time report for a command
pub fn format_elapsed(name: &str, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let minutes = (secs / 60.0).floor() as u64;
    let seconds = secs - (minutes as f64) * 60.0;
    let rule = hr();
    format!("{rule}\nElapsed time for {name} command: {minutes}m {seconds:.3}s\n{rule}")
}
