//! Argv dispatch through a command tree
//!
//! Each level scans its argv for a subcommand token, parses only the tokens up
//! to and including that token, runs itself, then hands the rest to the
//! selected subcommand. Values a level received are shared with same-named
//! args further down.

use crate::cli::expand::expand_short_flags;
use crate::cli::parser::collect_values;
use crate::command::{CallArgs, Command, Context, RunResult};
use crate::error::{Result, RunkitError, UsageError};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

impl Command {
    /// Parse `argv` and dispatch through the tree.
    ///
    /// Returns the result of the deepest command invoked.
    pub fn run<S: AsRef<str>>(&self, argv: &[S]) -> Result<RunResult> {
        let mut ctx = Context::new().with_debug(self.is_debug());
        self.run_in(argv, &mut ctx, &IndexMap::new())
    }

    /// Dispatch with an existing context and values passed down from above
    pub fn run_in<S: AsRef<str>>(
        &self,
        argv: &[S],
        ctx: &mut Context,
        inherited: &IndexMap<String, Value>,
    ) -> Result<RunResult> {
        let argv: Vec<String> = argv.iter().map(|a| a.as_ref().to_string()).collect();
        let (own_argv, selected) = self.split_argv(&argv);
        debug!(command = %self.qualified_name(), argv = ?own_argv, "parsing args");

        let parsed = self.parse_argv(&own_argv)?;

        let mut received = inherited.clone();
        received.extend(parsed);

        let own: IndexMap<String, Value> = received
            .iter()
            .filter(|(name, _)| self.args().get(*name).is_some_and(|a| !a.is_synthetic_help()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        let result = self.invoke(ctx, CallArgs::from_keywords(own))?;

        let deepest = match selected {
            Some((sub, sub_argv)) => {
                if let Some(selector) = self.selector() {
                    received.shift_remove(&selector.name);
                }
                debug!(
                    command = %self.qualified_name(),
                    subcommand = %sub.qualified_name(),
                    "dispatching"
                );
                Some(sub.run_in(&sub_argv, ctx, &received)?)
            }
            None => None,
        };

        self.fire_callbacks(Some(&result), false);
        Ok(deepest.unwrap_or(result))
    }

    /// Split argv at the first subcommand token.
    ///
    /// The current level keeps everything up to and including that token. A
    /// `:`-prefixed token is unescaped and never selects a subcommand.
    pub(crate) fn split_argv(
        &self,
        argv: &[String],
    ) -> (Vec<String>, Option<(&Command, Vec<String>)>) {
        let mut own = Vec::with_capacity(argv.len());

        for (i, token) in argv.iter().enumerate() {
            if token == "--" {
                own.extend_from_slice(&argv[i..]);
                break;
            }
            if let Some(escaped) = token.strip_prefix(':') {
                own.push(escaped.to_string());
                continue;
            }
            own.push(token.clone());
            if let Some(sub) = self.subcommand_for(token) {
                return (own, Some((sub, argv[i + 1..].to_vec())));
            }
        }

        (own, None)
    }

    fn subcommand_for(&self, token: &str) -> Option<&Command> {
        let qualified = format!("{}:{}", self.qualified_name(), token);
        self.subcommands().iter().find(|c| c.qualified_name() == qualified)
    }

    fn parse_argv(&self, argv: &[String]) -> Result<IndexMap<String, Value>> {
        let argv = expand_short_flags(argv);
        let matches = self
            .parser()
            .try_get_matches_from(argv)
            .map_err(UsageError::from)?;
        Ok(collect_values(self.args(), &matches))
    }

    /// Run as a process entry point and return the exit code
    pub fn console_script<S: AsRef<str>>(&self, argv: &[S]) -> i32 {
        let mut ctx = Context::new().with_debug(self.is_debug());
        self.console_script_in(argv, &mut ctx, &IndexMap::new())
    }

    /// Entry-point boundary: aborts and errors become exit codes here.
    ///
    /// In debug mode errors reach this boundary unmodified and are printed
    /// with their full chain.
    pub fn console_script_in<S: AsRef<str>>(
        &self,
        argv: &[S],
        ctx: &mut Context,
        inherited: &IndexMap<String, Value>,
    ) -> i32 {
        match self.try_console_script_in(argv, ctx, inherited) {
            Ok(code) => code,
            Err(err) => {
                ctx.printer.error(&format!("{err:?}"));
                err.exit_code()
            }
        }
    }

    /// Like [`Command::console_script`], but debug mode hands errors back
    pub fn try_console_script<S: AsRef<str>>(&self, argv: &[S]) -> Result<i32> {
        let mut ctx = Context::new().with_debug(self.is_debug());
        self.try_console_script_in(argv, &mut ctx, &IndexMap::new())
    }

    /// Run and convert the outcome to an exit code.
    ///
    /// A controlled abort fires this command's observers once with `aborted`
    /// set and no result. Outside debug mode every error is reported and
    /// converted; in debug mode only help and version requests are.
    pub fn try_console_script_in<S: AsRef<str>>(
        &self,
        argv: &[S],
        ctx: &mut Context,
        inherited: &IndexMap<String, Value>,
    ) -> Result<i32> {
        let err = match self.run_in(argv, ctx, inherited) {
            Ok(result) if result.failed() => {
                debug!(
                    command = %self.qualified_name(),
                    code = result.return_code,
                    "command failed"
                );
                return Ok(result.return_code);
            }
            Ok(_) => return Ok(0),
            Err(err) => err,
        };

        if matches!(err, RunkitError::Aborted(_)) {
            self.fire_callbacks(None, true);
        }
        let display_request = matches!(&err, RunkitError::Usage(e) if e.is_display_request());
        if ctx.debug && !display_request {
            return Err(err);
        }
        Ok(self.report(err, ctx))
    }

    fn report(&self, err: RunkitError, ctx: &Context) -> i32 {
        let code = err.exit_code();
        match err {
            RunkitError::Aborted(aborted) => {
                if let Some(message) = &aborted.message {
                    if aborted.return_code == 0 {
                        ctx.printer.warning(message);
                    } else {
                        ctx.printer.error(message);
                    }
                }
            }
            RunkitError::Usage(UsageError::Parse(e)) => {
                // clap renders usage and picks the stream itself
                let _ = e.print();
            }
            RunkitError::Usage(e) => {
                ctx.printer.error(&e.to_string());
                eprintln!("{}", self.usage());
            }
            err => ctx.printer.error(&err.to_string()),
        }
        code
    }
}
