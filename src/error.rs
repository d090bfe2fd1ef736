//! Error types for Runkit

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Runkit operations
pub type Result<T> = std::result::Result<T, RunkitError>;

/// Main error type for Runkit
#[derive(Error, Debug)]
pub enum RunkitError {
    /// Command or argument definition errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bad command line input
    #[error("{0}")]
    Usage(#[from] UsageError),

    /// External process errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Intentional early stop requested by a command
    #[error(transparent)]
    Aborted(#[from] RunAborted),

    /// Anything else raised by a command implementation
    #[error(transparent)]
    Implementation(anyhow::Error),
}

impl RunkitError {
    /// Classify an error returned by a command implementation.
    ///
    /// Implementations return `anyhow::Error`, so errors raised through `?`
    /// from this crate (including [`RunAborted`]) are recovered here.
    pub fn from_implementation(err: anyhow::Error) -> Self {
        let err = match err.downcast::<RunkitError>() {
            Ok(e) => return e,
            Err(err) => err,
        };
        let err = match err.downcast::<RunAborted>() {
            Ok(aborted) => return RunkitError::Aborted(aborted),
            Err(err) => err,
        };
        let err = match err.downcast::<ConfigError>() {
            Ok(e) => return RunkitError::Config(e),
            Err(err) => err,
        };
        let err = match err.downcast::<UsageError>() {
            Ok(e) => return RunkitError::Usage(e),
            Err(err) => err,
        };
        match err.downcast::<ExecutionError>() {
            Ok(e) => RunkitError::Execution(e),
            Err(err) => RunkitError::Implementation(err),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RunkitError::Aborted(aborted) => aborted.return_code,
            RunkitError::Usage(UsageError::Parse(e)) => e.exit_code(),
            RunkitError::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// Definition-time errors in a command or argument tree
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Expected short option with form -x, not \"{0}\"")]
    InvalidShortOption(String),

    #[error("Expected long option with form --name, not \"{0}\"")]
    InvalidLongOption(String),

    #[error("Expected a concrete value type, not {0}")]
    InvalidType(String),

    #[error("Option {option} of command {command} is used by both {first} and {second}")]
    DuplicateOption {
        command: String,
        option: String,
        first: String,
        second: String,
    },

    #[error("Arg '{0}' is declared more than once")]
    DuplicateArg(String),

    #[error("Command '{0}' is defined more than once")]
    DuplicateCommand(String),

    #[error("Command {0} declares sources but no output to create")]
    SourcesWithoutCreates(String),

    #[error("Missing required args for {command}: {names}")]
    MissingArgs { command: String, names: String },

    #[error("Nonexistent default options specified for {command}: {names}")]
    NonexistentDefaults { command: String, names: String },

    #[error("Default args for {0} were already set")]
    DefaultsAlreadySet(String),

    #[error("Cannot pass {0} via --option; use --{0} instead")]
    RunnerOption(String),

    #[error("Failed to read config file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },
}

/// User-input errors, reported with usage text
#[derive(Error, Debug)]
pub enum UsageError {
    /// Rendered by clap, usage included
    #[error("{0}")]
    Parse(#[from] clap::Error),

    #[error("{command}: unexpected argument '{name}'")]
    UnknownArgument { command: String, name: String },

    #[error("{command}: too many positional args (expected at most {expected})")]
    TooManyPositionals { command: String, expected: usize },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

impl UsageError {
    /// Whether this is a help/version request rather than a failure
    pub fn is_display_request(&self) -> bool {
        match self {
            UsageError::Parse(e) => e.exit_code() == 0,
            _ => false,
        }
    }
}

/// External process errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No program given to run")]
    EmptyCommand,

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid source pattern '{pattern}': {error}")]
    Pattern { pattern: String, error: String },

    #[error("Failed to check freshness of '{path}': {source}")]
    Freshness {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Controlled abort raised by a command implementation.
///
/// Caught at the nearest console boundary and turned into an exit status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .message.as_deref().unwrap_or("Aborted"))]
pub struct RunAborted {
    pub message: Option<String>,
    pub return_code: i32,
}

impl RunAborted {
    pub fn new() -> Self {
        RunAborted {
            message: None,
            return_code: 1,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        RunAborted {
            message: Some(message.into()),
            return_code: 1,
        }
    }

    pub fn with_return_code(mut self, return_code: i32) -> Self {
        self.return_code = return_code;
        self
    }
}

impl Default for RunAborted {
    fn default() -> Self {
        Self::new()
    }
}

/// Abort the current command with a message and return code
pub fn abort(return_code: i32, message: impl Into<String>) -> anyhow::Error {
    RunAborted::with_message(message)
        .with_return_code(return_code)
        .into()
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_is_recovered_from_anyhow() {
        let err = abort(3, "stop here");
        let err = RunkitError::from_implementation(err);
        match err {
            RunkitError::Aborted(a) => {
                assert_eq!(a.return_code, 3);
                assert_eq!(a.to_string(), "stop here");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_config_error_is_recovered_from_anyhow() {
        let err = anyhow::Error::from(ConfigError::Invalid("bad".to_string()));
        assert!(matches!(
            RunkitError::from_implementation(err),
            RunkitError::Config(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_other_errors_stay_opaque() {
        let err = anyhow::anyhow!("boom");
        let err = RunkitError::from_implementation(err);
        assert!(matches!(err, RunkitError::Implementation(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_default_abort_message() {
        assert_eq!(RunAborted::new().to_string(), "Aborted");
        assert_eq!(RunAborted::new().return_code, 1);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunkitError::from_implementation(abort(4, "stop")).exit_code(), 4);
        assert_eq!(RunkitError::from(UsageError::UnknownCommand("x".to_string())).exit_code(), 2);
        assert_eq!(RunkitError::from(ConfigError::Invalid("bad".to_string())).exit_code(), 1);
    }
}
