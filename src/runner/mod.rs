//! Multi-command runner
//!
//! The runner is itself a command, `runkit`, whose options configure the run
//! and whose trailing args are a chain of command invocations:
//!
//! ```text
//! runkit [runner options] cmd1 [cmd1 args] cmd2 [cmd2 args] ...
//! ```
//!
//! Each invocation is dispatched in order through its command's own entry
//! point; the chain stops at the first nonzero exit code.

pub mod process;

pub use process::{local_command, LocalRunner, OutputMode, ProcessRunner};

use crate::cli::expand::expand_short_flags;
use crate::cli::partition::partition_argv;
use crate::command::signature::compile;
use crate::command::{ArgConfig, ArgType, Args, Command, Context, DefaultValue, Param, RunResult};
use crate::config::{ConfigMap, ConfigSource, RunSettings, YamlConfig};
use crate::error::{ConfigError, ConfigResult, UsageError};
use crate::ui::hr;
use crate::util::normalize_name;
use indexmap::IndexMap;
use serde_json::Value;
use std::cell::Cell;
use std::rc::Rc;
use tracing::debug;

/// Name of the runner command
pub const RUNNER_NAME: &str = "runkit";

/// Values accepted by `--hide`
pub const HIDE_CHOICES: [&str; 4] = ["none", "stdout", "stderr", "all"];

/// Commands available to a runner, keyed by name
pub struct CommandSet {
    commands: IndexMap<String, Command>,
}

impl CommandSet {
    pub fn new(commands: Vec<Command>) -> ConfigResult<Self> {
        let mut map = IndexMap::new();
        for command in commands {
            if map.contains_key(command.name()) {
                return Err(ConfigError::DuplicateCommand(command.name().to_string()));
            }
            map.insert(command.name().to_string(), command);
        }
        Ok(CommandSet { commands: map })
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply configured default args to every command tree
    pub fn apply_config(&self, config: &ConfigMap) -> ConfigResult<()> {
        self.iter().try_for_each(|c| c.apply_config(config))
    }

    /// Usage of every command, separated by rules
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for command in self.iter() {
            out.push_str(&hr());
            out.push('\n');
            if let Some(description) = command.description() {
                out.push_str(&format!("{}: {}\n", command.name(), description));
            }
            out.push_str(&command.usage());
            out.push('\n');
        }
        out
    }

    /// Split command argv into one argv per invocation.
    ///
    /// A token naming a command starts a new invocation unless the previous
    /// token is an option of the current command still waiting for its value.
    pub fn segment<'a>(
        &'a self,
        argv: &[String],
    ) -> Result<Vec<(&'a Command, Vec<String>)>, UsageError> {
        let mut segments: Vec<(&Command, Vec<String>)> = Vec::new();
        let mut expects_value = false;

        for token in argv {
            if !expects_value {
                if let Some(command) = self.get(token) {
                    segments.push((command, Vec::new()));
                    continue;
                }
            }
            let Some((command, command_argv)) = segments.last_mut() else {
                return Err(UsageError::UnknownCommand(token.clone()));
            };
            expects_value = option_expects_value(command, token);
            command_argv.push(token.clone());
        }

        Ok(segments)
    }
}

fn option_expects_value(command: &Command, token: &str) -> bool {
    if token.contains('=') {
        return false;
    }
    command
        .option_map()
        .get(token)
        .and_then(|name| command.args().get(name))
        .is_some_and(|arg| arg.takes_value())
}

/// Top-level entry point that chains commands
pub struct Runner {
    command: Command,
    commands: Rc<CommandSet>,
}

impl Runner {
    /// Runner reading configuration from a discovered runkit.yml
    pub fn new(commands: Vec<Command>) -> ConfigResult<Self> {
        Self::with_config(commands, YamlConfig::discover())
    }

    /// Runner reading configuration from `source` unless `--config-file` is given
    pub fn with_config(
        commands: Vec<Command>,
        source: impl ConfigSource + 'static,
    ) -> ConfigResult<Self> {
        let commands = Rc::new(CommandSet::new(commands)?);
        let source: Rc<dyn ConfigSource> = Rc::new(source);
        let configured = Rc::new(Cell::new(false));

        // The runner's own option names may not be set through --option
        let reserved: Vec<String> = compile(&runner_params())?
            .into_values()
            .filter(|a| a.is_optional() && !a.is_synthetic_help())
            .map(|a| a.name)
            .collect();

        let set = commands.clone();
        let chain = ChainSettings { source, reserved, configured };
        let command = Command::builder(RUNNER_NAME)
            .description("Run one or more commands in sequence")
            .params(runner_params())
            .implementation(move |args| run_chain(args, &set, &chain))
            .build()?;

        Ok(Runner { command, commands })
    }

    /// The `runkit` command itself
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// Whether `argv` turns on debug mode for the runner
    pub fn debug_requested<S: AsRef<str>>(&self, argv: &[S]) -> bool {
        let partition = partition_argv(&self.command, argv);
        expand_short_flags(&partition.run_argv)
            .iter()
            .any(|t| t == "-d" || t == "--debug")
    }

    /// Run the chain described by `argv` and return the exit code
    pub fn console_script<S: AsRef<str>>(&self, argv: &[S]) -> i32 {
        let (argv, mut ctx) = self.prepare(argv);
        self.command.console_script_in(&argv, &mut ctx, &IndexMap::new())
    }

    /// Like [`Runner::console_script`], but with `--debug` errors are handed back
    pub fn try_console_script<S: AsRef<str>>(&self, argv: &[S]) -> crate::Result<i32> {
        let (argv, mut ctx) = self.prepare(argv);
        self.command.try_console_script_in(&argv, &mut ctx, &IndexMap::new())
    }

    fn prepare<S: AsRef<str>>(&self, argv: &[S]) -> (Vec<String>, Context) {
        let partition = partition_argv(&self.command, argv);
        debug!(
            run_argv = ?partition.run_argv,
            command_argv = ?partition.command_argv,
            "partitioned argv"
        );

        let mut argv = partition.run_argv;
        argv.push("--".to_string());
        argv.extend(partition.command_argv);

        let ctx = Context::new().with_debug(self.debug_requested(&argv));
        (argv, ctx)
    }
}

fn runner_params() -> Vec<Param> {
    let bool_flag = |name: &str| {
        Param::optional(name, DefaultValue::Null).with(ArgConfig::new().value_type(ArgType::Bool))
    };
    vec![
        Param::optional("config_file", DefaultValue::Null).help("Path to a runkit.yml file"),
        Param::optional("option", DefaultValue::dict())
            .help("Extra config entry as NAME=VALUE (repeatable)"),
        bool_flag("echo").help("Echo external commands before running them"),
        Param::optional("hide", DefaultValue::bool_or(Value::Null, ArgType::choice(HIDE_CHOICES)))
            .help("Hide command output"),
        Param::optional("debug", false).help("Show debug output and full errors"),
        Param::optional("info", false).help("Show runkit version and exit"),
        Param::optional("list_commands", false).help("List available commands and exit"),
        Param::variadic("commands").help("Commands to run, each followed by its args"),
    ]
}

/// What the runner's implementation needs besides its args
struct ChainSettings {
    source: Rc<dyn ConfigSource>,
    reserved: Vec<String>,
    configured: Rc<Cell<bool>>,
}

fn run_chain(
    args: &Args,
    commands: &CommandSet,
    chain: &ChainSettings,
) -> anyhow::Result<RunResult> {
    let mut ctx = Context::new().with_debug(args.bool("debug"));

    if args.bool("info") {
        println!("{} version {}", RUNNER_NAME, crate::VERSION);
        return Ok(RunResult::success());
    }

    let mut config = match args.str("config-file") {
        Some(path) => YamlConfig::from_path(path).load()?,
        None => chain.source.load()?,
    };
    if let Some(Value::Object(options)) = args.get("option") {
        for (name, value) in options {
            if chain.reserved.contains(&normalize_name(name)) {
                return Err(ConfigError::RunnerOption(name.clone()).into());
            }
            config.insert(name.clone(), value.clone());
        }
    }

    let settings = RunSettings::from_config(&config)?;
    if settings.debug == Some(true) {
        ctx = ctx.with_debug(true);
    }
    if !chain.configured.replace(true) {
        commands.apply_config(&config)?;
    }

    if args.bool("list-commands") {
        print!("{}", commands.listing());
        return Ok(RunResult::success());
    }

    let argv: Vec<String> = args
        .list("commands")
        .iter()
        .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
        .collect();
    if argv.is_empty() {
        ctx.printer.warning("No commands specified");
        eprint!("{}", commands.listing());
        return Ok(RunResult::success());
    }

    let run_values = run_values(args, &settings);
    for (command, command_argv) in commands.segment(&argv)? {
        let inherited: IndexMap<String, Value> = run_values
            .iter()
            .filter(|(name, _)| !command.default_args().contains_key(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        debug!(command = %command.name(), argv = ?command_argv, "running chained command");
        let code = if ctx.debug {
            command.try_console_script_in(&command_argv, &mut ctx, &inherited)?
        } else {
            command.console_script_in(&command_argv, &mut ctx, &inherited)
        };
        if code != 0 {
            return Ok(RunResult::with_code(code));
        }
    }

    Ok(RunResult::success())
}

/// Run-wide `echo` and `hide` values, from the command line or the `run` section
fn run_values(args: &Args, settings: &RunSettings) -> IndexMap<String, Value> {
    let mut values = IndexMap::new();
    let echo = match args.value("echo") {
        Value::Null => settings.echo.map(Value::Bool),
        value => Some(value.clone()),
    };
    let hide = match args.value("hide") {
        Value::Null => settings.hide.clone(),
        value => Some(value.clone()),
    };
    if let Some(echo) = echo {
        values.insert("echo".to_string(), echo);
    }
    if let Some(hide) = hide {
        values.insert("hide".to_string(), hide);
    }
    values
}
