//! Command definitions
//!
//! A [`Command`] pairs an implementation with the args derived from its
//! parameter declarations. Commands are assembled with [`CommandBuilder`];
//! every definition error surfaces from [`CommandBuilder::build`]. Once
//! built, a tree is immutable apart from its callback lists and a one-time
//! default-args override.

pub mod call;
pub mod context;
pub mod dispatch;
pub mod memo;
pub mod options;
pub mod result;
pub mod signature;

pub use call::{Args, CallArgs, Slot};
pub use context::Context;
pub use result::RunResult;
pub use signature::{
    ArgConfig, ArgDescriptor, ArgKind, ArgMap, ArgType, Container, DefaultValue, Param, ParamKind,
};

use crate::cli::parser::build_parser;
use crate::error::{ConfigError, ConfigResult, Result, RunkitError};
use crate::util::normalize_name;
use indexmap::IndexMap;
use serde_json::Value;
use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, info};

/// Command body. Errors raised through `?` are classified on the way out.
pub type Implementation = Rc<dyn Fn(&Args) -> anyhow::Result<RunResult>>;

/// Observer fired with `(command, result, aborted)` after a command runs
pub type Callback = Rc<dyn Fn(&Command, Option<&RunResult>, bool)>;

static NO_DEFAULTS: LazyLock<IndexMap<String, Value>> = LazyLock::new(IndexMap::new);

/// A runnable command and, optionally, its subcommands
pub struct Command {
    name: String,
    qualified_name: String,
    base_name: Option<String>,
    description: Option<String>,
    implementation: Implementation,
    accepts_keywords: bool,
    args: ArgMap,
    option_map: IndexMap<String, String>,
    subcommands: Vec<Command>,
    default_args: OnceCell<IndexMap<String, Value>>,
    callbacks: RefCell<Vec<Callback>>,
    creates: Option<PathBuf>,
    sources: Vec<String>,
    timed: bool,
    debug: bool,
}

impl Command {
    pub fn builder(name: impl AsRef<str>) -> CommandBuilder {
        CommandBuilder::new(name)
    }

    /// Normalized short name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Colon-joined path from the root command
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Qualified name of the owning base command
    pub fn base_name(&self) -> Option<&str> {
        self.base_name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn args(&self) -> &ArgMap {
        &self.args
    }

    pub fn arg(&self, name: &str) -> Option<&ArgDescriptor> {
        self.args.get(&normalize_name(name))
    }

    /// Option string -> arg name
    pub fn option_map(&self) -> &IndexMap<String, String> {
        &self.option_map
    }

    pub fn subcommands(&self) -> &[Command] {
        &self.subcommands
    }

    pub fn subcommand(&self, name: &str) -> Option<&Command> {
        self.subcommands.iter().find(|c| c.name == name)
    }

    /// Find a command in this tree by qualified name
    pub fn find(&self, qualified_name: &str) -> Option<&Command> {
        if self.qualified_name == qualified_name {
            return Some(self);
        }
        self.subcommands.iter().find_map(|c| c.find(qualified_name))
    }

    /// The positional whose value selects a subcommand
    pub fn selector(&self) -> Option<&ArgDescriptor> {
        if self.subcommands.is_empty() {
            return None;
        }
        self.args.values().find(|a| a.is_positional())
    }

    pub fn creates(&self) -> Option<&Path> {
        self.creates.as_deref()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn is_timed(&self) -> bool {
        self.timed
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Externally configured defaults, empty until set
    pub fn default_args(&self) -> &IndexMap<String, Value> {
        self.default_args.get().unwrap_or(&NO_DEFAULTS)
    }

    /// Set the configured default args. Allowed once, before first dispatch.
    pub fn set_default_args(&self, defaults: IndexMap<String, Value>) -> ConfigResult<()> {
        let defaults: IndexMap<String, Value> = defaults
            .into_iter()
            .map(|(name, value)| (normalize_name(&name), value))
            .collect();

        let nonexistent: Vec<&str> = defaults
            .keys()
            .filter(|name| self.args.get(*name).map_or(true, ArgDescriptor::is_synthetic_help))
            .map(String::as_str)
            .collect();
        if !nonexistent.is_empty() {
            return Err(ConfigError::NonexistentDefaults {
                command: self.qualified_name.clone(),
                names: nonexistent.join(", "),
            });
        }

        self.default_args
            .set(defaults)
            .map_err(|_| ConfigError::DefaultsAlreadySet(self.qualified_name.clone()))
    }

    /// Apply `defaults.<qualified-name>.<arg>` entries to this tree
    pub fn apply_config(&self, config: &IndexMap<String, Value>) -> ConfigResult<()> {
        let prefix = format!("defaults.{}.", self.qualified_name);
        let defaults: IndexMap<String, Value> = config
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .map(|name| (name.to_string(), value.clone()))
            })
            .collect();

        if !defaults.is_empty() {
            debug!(command = %self.qualified_name, ?defaults, "applying configured defaults");
            self.set_default_args(defaults)?;
        }

        for sub in &self.subcommands {
            sub.apply_config(config)?;
        }
        Ok(())
    }

    /// Register an observer fired after this command runs
    pub fn add_callback<F>(&self, callback: F)
    where
        F: Fn(&Command, Option<&RunResult>, bool) + 'static,
    {
        self.callbacks.borrow_mut().push(Rc::new(callback));
    }

    pub(crate) fn fire_callbacks(&self, result: Option<&RunResult>, aborted: bool) {
        // Clone the list so an observer may register further callbacks
        let callbacks: Vec<Callback> = self.callbacks.borrow().clone();
        for callback in callbacks {
            callback(self, result, aborted);
        }
    }

    fn parser(&self) -> clap::Command {
        build_parser(
            &self.qualified_name,
            self.description.as_deref(),
            &self.args,
            self.default_args(),
        )
    }

    /// One-line usage text
    pub fn usage(&self) -> String {
        self.parser().render_usage().to_string()
    }

    /// Full help text
    pub fn help(&self) -> String {
        self.parser().render_help().to_string()
    }

    /// Call the implementation directly with call-site values.
    ///
    /// Observers fire on success; errors propagate to the caller.
    pub fn call(&self, call: CallArgs) -> Result<RunResult> {
        let ctx = Context::new().with_debug(self.debug);
        let result = self.invoke(&ctx, call)?;
        self.fire_callbacks(Some(&result), false);
        Ok(result)
    }

    /// Resolve args and run the implementation, honoring memoization
    pub(crate) fn invoke(&self, ctx: &Context, call: CallArgs) -> Result<RunResult> {
        if let Some(creates) = &self.creates {
            if memo::is_fresh(creates, &self.sources)? {
                info!(
                    command = %self.qualified_name,
                    creates = %creates.display(),
                    "output is up to date; skipping"
                );
                return Ok(RunResult::skipped());
            }
        }

        let start = Instant::now();
        let debug = ctx.debug || self.debug;
        if debug {
            ctx.printer.debug(&format!("Command called: {}", self.qualified_name));
            ctx.printer.debug(&format!("    Received positional args: {:?}", call.positional));
            ctx.printer.debug(&format!("    Received keyword args: {:?}", call.keyword));
        }

        let args = call::resolve(
            &self.qualified_name,
            &self.args,
            self.default_args(),
            call,
            self.accepts_keywords,
        )?;

        if debug {
            ctx.printer.debug(&format!("    Final args: {}", args.to_value()));
        }
        debug!(command = %self.qualified_name, args = %args.to_value(), "running command");

        let result = (self.implementation)(&args).map_err(RunkitError::from_implementation)?;

        if self.timed && !hides_stdout(args.value("hide")) {
            ctx.printer.elapsed(&self.name, start.elapsed());
        }

        Ok(result)
    }
}

fn noop(_: &Args) -> anyhow::Result<RunResult> {
    Ok(RunResult::success())
}

/// Whether a `hide` value suppresses stdout
fn hides_stdout(hide: &Value) -> bool {
    match hide {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.as_str(), "stdout" | "all"),
        _ => false,
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("qualified_name", &self.qualified_name)
            .field("args", &self.args.keys().collect::<Vec<_>>())
            .field("subcommands", &self.subcommands.iter().map(|c| &c.name).collect::<Vec<_>>())
            .field("creates", &self.creates)
            .field("timed", &self.timed)
            .finish()
    }
}

/// Declarative command definition, validated by [`CommandBuilder::build`]
pub struct CommandBuilder {
    name: String,
    description: Option<String>,
    params: Vec<Param>,
    implementation: Option<Implementation>,
    subcommands: Vec<CommandBuilder>,
    creates: Option<PathBuf>,
    sources: Vec<String>,
    timed: bool,
    debug: bool,
}

impl CommandBuilder {
    pub fn new(name: impl AsRef<str>) -> Self {
        CommandBuilder {
            name: normalize_name(name.as_ref()),
            description: None,
            params: Vec::new(),
            implementation: None,
            subcommands: Vec::new(),
            creates: None,
            sources: Vec::new(),
            timed: false,
            debug: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params<I: IntoIterator<Item = Param>>(mut self, params: I) -> Self {
        self.params.extend(params);
        self
    }

    pub fn implementation<F>(mut self, implementation: F) -> Self
    where
        F: Fn(&Args) -> anyhow::Result<RunResult> + 'static,
    {
        self.implementation = Some(Rc::new(implementation));
        self
    }

    pub fn subcommand(mut self, subcommand: CommandBuilder) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    /// Output location; the command is skipped while it is up to date
    pub fn creates(mut self, path: impl Into<PathBuf>) -> Self {
        self.creates = Some(path.into());
        self
    }

    /// Glob patterns the output is checked against
    pub fn sources<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn timed(mut self, timed: bool) -> Self {
        self.timed = timed;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn build(self) -> ConfigResult<Command> {
        self.build_under(None)
    }

    fn build_under(self, base: Option<&str>) -> ConfigResult<Command> {
        let qualified_name = match base {
            Some(base) => format!("{base}:{}", self.name),
            None => self.name.clone(),
        };

        if !self.sources.is_empty() && self.creates.is_none() {
            return Err(ConfigError::SourcesWithoutCreates(qualified_name));
        }

        let mut args = signature::compile(&self.params)?;

        if !self.subcommands.is_empty() {
            let mut names: Vec<String> = Vec::with_capacity(self.subcommands.len());
            for sub in &self.subcommands {
                if names.contains(&sub.name) {
                    let qualified = format!("{qualified_name}:{}", sub.name);
                    return Err(ConfigError::DuplicateCommand(qualified));
                }
                names.push(sub.name.clone());
            }

            let selector = args.values_mut().find(|a| a.is_positional()).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "command {qualified_name} has subcommands but no positional arg to select them"
                ))
            })?;
            if selector.choices.is_none() {
                selector.choices = Some(names);
            }
        }

        options::allocate(&qualified_name, &mut args)?;
        let option_map = options::option_map(&qualified_name, &args)?;

        let subcommands = self
            .subcommands
            .into_iter()
            .map(|sub| sub.build_under(Some(&qualified_name)))
            .collect::<ConfigResult<Vec<_>>>()?;

        let accepts_keywords = self.params.iter().any(|p| p.kind == ParamKind::Keywords);
        let implementation: Implementation = match self.implementation {
            Some(implementation) => implementation,
            None => Rc::new(noop),
        };

        Ok(Command {
            name: self.name,
            qualified_name,
            base_name: base.map(str::to_string),
            description: self.description,
            implementation,
            accepts_keywords,
            args,
            option_map,
            subcommands,
            default_args: OnceCell::new(),
            callbacks: RefCell::new(Vec::new()),
            creates: self.creates,
            sources: self.sources,
            timed: self.timed,
            debug: self.debug,
        })
    }
}
