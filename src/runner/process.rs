//! External process execution
//!
//! This module runs external programs for command implementations and turns
//! their exit status and output into a [`RunResult`].

use crate::command::{ArgType, Command, DefaultValue, Param, RunResult};
use crate::error::{ConfigResult, ExecutionError, ExecutionResult};
use crate::runner::HIDE_CHOICES;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use tracing::debug;

/// What to do with a child's stdout and stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Share the parent's streams
    #[default]
    Inherit,
    /// Capture both streams into the result
    Capture,
    /// Discard stdout, share stderr
    HideStdout,
    /// Discard stderr, share stdout
    HideStderr,
    /// Discard both streams
    Hide,
}

impl OutputMode {
    /// Mode for a `hide` value: `true` or `"all"` hides both streams
    pub fn from_hide(hide: &Value) -> Self {
        match hide {
            Value::Bool(true) => OutputMode::Hide,
            Value::String(s) => match s.as_str() {
                "stdout" => OutputMode::HideStdout,
                "stderr" => OutputMode::HideStderr,
                "all" => OutputMode::Hide,
                _ => OutputMode::Inherit,
            },
            _ => OutputMode::Inherit,
        }
    }

    fn stdout(self) -> Stdio {
        match self {
            OutputMode::HideStdout | OutputMode::Hide => Stdio::null(),
            _ => Stdio::inherit(),
        }
    }

    fn stderr(self) -> Stdio {
        match self {
            OutputMode::HideStderr | OutputMode::Hide => Stdio::null(),
            _ => Stdio::inherit(),
        }
    }
}

/// Runs an external program and reports how it went.
///
/// A nonzero exit is a failed result, not an error; errors are reserved for
/// programs that couldn't be started.
pub trait ProcessRunner {
    fn run(
        &self,
        command: &[String],
        cwd: Option<&Path>,
        env: &IndexMap<String, String>,
        output: OutputMode,
    ) -> ExecutionResult<RunResult>;
}

/// Runs programs on the local machine
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRunner {
    /// Print the command line before running it
    pub echo: bool,
}

impl LocalRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

impl ProcessRunner for LocalRunner {
    fn run(
        &self,
        command: &[String],
        cwd: Option<&Path>,
        env: &IndexMap<String, String>,
        output: OutputMode,
    ) -> ExecutionResult<RunResult> {
        let (program, args) = command.split_first().ok_or(ExecutionError::EmptyCommand)?;

        if self.echo {
            crate::ui::Printer::default().echo(&command.join(" "));
        }
        debug!(?command, ?cwd, ?output, "spawning process");

        let mut child = StdCommand::new(program);
        child.args(args);
        if let Some(dir) = cwd {
            child.current_dir(dir);
        }
        for (key, value) in env {
            child.env(key, value);
        }
        child.stdin(Stdio::inherit());

        let spawn_error = |source: std::io::Error| ExecutionError::Spawn {
            program: program.clone(),
            source,
        };

        let (code, stdout, stderr) = match output {
            OutputMode::Capture => {
                let out = child.output().map_err(spawn_error)?;
                (
                    out.status.code(),
                    Some(String::from_utf8_lossy(&out.stdout).into_owned()),
                    Some(String::from_utf8_lossy(&out.stderr).into_owned()),
                )
            }
            _ => {
                child.stdout(output.stdout());
                child.stderr(output.stderr());
                let status = child.status().map_err(spawn_error)?;
                (status.code(), None, None)
            }
        };

        // Killed by a signal: no code
        let return_code = code.unwrap_or(-1);
        Ok(RunResult::new(command.to_vec(), return_code, stdout, stderr))
    }
}

/// The `local` command: run an external program through [`LocalRunner`]
pub fn local_command() -> ConfigResult<Command> {
    Command::builder("local")
        .description("Run an external program")
        .param(Param::variadic("args").help("Program and its arguments"))
        .param(Param::optional("cwd", DefaultValue::Null).help("Working directory"))
        .param(
            Param::optional("environ", DefaultValue::dict())
                .help("Extra environment variable as NAME=VALUE"),
        )
        .param(Param::optional("echo", false).help("Echo the command line first"))
        .param(
            Param::optional(
                "hide",
                DefaultValue::bool_or(Value::Null, ArgType::choice(HIDE_CHOICES)),
            )
            .help("Hide the program's output"),
        )
        .implementation(|args| {
            let command: Vec<String> = args.list("args").iter().map(plain_string).collect();
            let env: IndexMap<String, String> = args
                .get("environ")
                .and_then(Value::as_object)
                .map(|vars| vars.iter().map(|(k, v)| (k.clone(), plain_string(v))).collect())
                .unwrap_or_default();

            let result = LocalRunner::new().with_echo(args.bool("echo")).run(
                &command,
                args.str("cwd").map(Path::new),
                &env,
                OutputMode::from_hide(args.value("hide")),
            )?;
            Ok(result)
        })
        .build()
}

/// Strings as-is, anything else as JSON
fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_capture_output() {
        let result = LocalRunner::new()
            .run(&argv(&["echo", "hello"]), None, &IndexMap::new(), OutputMode::Capture)
            .unwrap();
        assert!(result.succeeded());
        assert_eq!(result.stdout_lines(), vec!["hello"]);
    }

    #[test]
    fn test_failing_command_is_a_failed_result() {
        let result = LocalRunner::new()
            .run(&argv(&["false"]), None, &IndexMap::new(), OutputMode::Hide)
            .unwrap();
        assert!(result.failed());
        assert_eq!(result.return_code, 1);
    }

    #[test]
    fn test_env_and_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut env = IndexMap::new();
        env.insert("RUNKIT_TEST_VALUE".to_string(), "42".to_string());

        let result = LocalRunner::new()
            .run(
                &argv(&["sh", "-c", "echo $RUNKIT_TEST_VALUE; pwd"]),
                Some(dir.path()),
                &env,
                OutputMode::Capture,
            )
            .unwrap();
        let lines = result.stdout_lines();
        assert_eq!(lines[0], "42");
        assert!(lines[1].ends_with(dir.path().file_name().unwrap().to_str().unwrap()));
    }

    #[test]
    fn test_output_mode_from_hide() {
        assert_eq!(OutputMode::from_hide(&Value::Null), OutputMode::Inherit);
        assert_eq!(OutputMode::from_hide(&Value::Bool(true)), OutputMode::Hide);
        assert_eq!(OutputMode::from_hide(&Value::from("none")), OutputMode::Inherit);
        assert_eq!(OutputMode::from_hide(&Value::from("all")), OutputMode::Hide);
        assert_eq!(OutputMode::from_hide(&Value::from("stdout")), OutputMode::HideStdout);
        assert_eq!(OutputMode::from_hide(&Value::from("stderr")), OutputMode::HideStderr);
    }

    #[test]
    fn test_local_command_returns_process_result() {
        let local = local_command().unwrap();
        let result = local.run(&["--hide", "--", "sh", "-c", "exit 3"]).unwrap();
        assert_eq!(result.return_code, 3);
        assert_eq!(result.args, argv(&["sh", "-c", "exit 3"]));
    }

    #[test]
    fn test_local_command_environment() {
        let local = local_command().unwrap();
        let check = "test \"$RUNKIT_FLAVOUR\" = mint";
        let result = local
            .run(&["--environ", "RUNKIT_FLAVOUR=mint", "--", "sh", "-c", check])
            .unwrap();
        assert!(result.succeeded());
    }

    #[test]
    fn test_empty_command_fails() {
        let result = LocalRunner::new().run(&[], None, &IndexMap::new(), OutputMode::Inherit);
        assert!(matches!(result, Err(ExecutionError::EmptyCommand)));
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let result = LocalRunner::new().run(
            &argv(&["runkit-no-such-program"]),
            None,
            &IndexMap::new(),
            OutputMode::Hide,
        );
        assert!(matches!(result, Err(ExecutionError::Spawn { .. })));
    }
}
