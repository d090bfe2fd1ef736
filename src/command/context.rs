//! Dispatch context
//!
//! The context carries state shared by every level of one dispatch: the
//! printer and debug mode.

use crate::ui::{Printer, Verbosity};

/// State shared across one dispatch, including nested subcommands
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Leveled console output
    pub printer: Printer,

    /// When set, errors reach the console boundary unmodified
    pub debug: bool,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn on debug mode; also raises verbosity so debug output shows
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        if debug {
            self.printer = Printer::new(Verbosity::Verbose);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_new() {
        let ctx = Context::new();
        assert_eq!(ctx.printer.verbosity, Verbosity::Normal);
        assert!(!ctx.debug);
    }

    #[test]
    fn test_debug_raises_verbosity() {
        let ctx = Context::new().with_debug(true);
        assert!(ctx.debug);
        assert_eq!(ctx.printer.verbosity, Verbosity::Verbose);
    }
}
