//! Per-invocation results

use serde_json::Value;
use std::fmt;

/// Outcome of one command invocation.
///
/// A result is truthy (see [`RunResult::succeeded`]) iff its return code is zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunResult {
    /// What was run, for display
    pub args: Vec<String>,
    pub return_code: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    /// Value produced by the implementation, if any
    pub value: Value,
    skipped: bool,
}

impl RunResult {
    pub fn new(
        args: Vec<String>,
        return_code: i32,
        stdout: Option<String>,
        stderr: Option<String>,
    ) -> Self {
        RunResult {
            args,
            return_code,
            stdout,
            stderr,
            value: Value::Null,
            skipped: false,
        }
    }

    pub fn success() -> Self {
        Self::default()
    }

    pub fn with_code(return_code: i32) -> Self {
        RunResult {
            return_code,
            ..Self::default()
        }
    }

    /// Successful result carrying a value
    pub fn from_value(value: impl Into<Value>) -> Self {
        RunResult {
            value: value.into(),
            ..Self::default()
        }
    }

    /// No-op result for a run that was skipped because its output is fresh
    pub fn skipped() -> Self {
        RunResult {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.return_code == 0
    }

    pub fn failed(&self) -> bool {
        !self.succeeded()
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn args_str(&self) -> String {
        self.args.join(" ")
    }

    pub fn stdout_lines(&self) -> Vec<&str> {
        self.stdout.as_deref().map(|s| s.lines().collect()).unwrap_or_default()
    }

    pub fn stderr_lines(&self) -> Vec<&str> {
        self.stderr.as_deref().map(|s| s.lines().collect()).unwrap_or_default()
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let output = if self.failed() { &self.stderr } else { &self.stdout };
        let output = output
            .as_deref()
            .filter(|o| !o.is_empty())
            .map(|o| o.strip_suffix('\n').unwrap_or(o))
            .unwrap_or("[NO OUTPUT]");
        let status = if self.succeeded() { "SUCCEEDED" } else { "FAILED" };
        write!(f, "{} ({}): {} -> {}", status, self.return_code, self.args_str(), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness_follows_return_code() {
        assert!(RunResult::success().succeeded());
        assert!(RunResult::with_code(2).failed());
        assert!(!RunResult::with_code(2).succeeded());
    }

    #[test]
    fn test_output_lines() {
        let result = RunResult::new(vec!["ls".into()], 0, Some("a\nb\n".into()), None);
        assert_eq!(result.stdout_lines(), vec!["a", "b"]);
        assert!(result.stderr_lines().is_empty());
    }

    #[test]
    fn test_display() {
        let ok = RunResult::new(vec!["echo".into(), "hi".into()], 0, Some("hi\n".into()), None);
        assert_eq!(ok.to_string(), "SUCCEEDED (0): echo hi -> hi");

        let failed = RunResult::new(vec!["false".into()], 1, None, None);
        assert_eq!(failed.to_string(), "FAILED (1): false -> [NO OUTPUT]");
    }

    #[test]
    fn test_skipped_is_a_successful_noop() {
        let result = RunResult::skipped();
        assert!(result.is_skipped());
        assert!(result.succeeded());
        assert_eq!(result.value, Value::Null);
        assert!(!RunResult::from_value(json!(1)).is_skipped());
    }
}
