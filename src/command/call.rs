//! Call-site arguments and their resolution against a command's args

use crate::command::signature::{ArgKind, ArgMap};
use crate::error::{ConfigError, RunkitError, UsageError};
use crate::util::normalize_name;
use indexmap::IndexMap;
use serde_json::Value;

/// One positional slot at a call site
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Value),
    /// Use the configured default, else the declared default
    Default,
}

/// Values passed to a command directly rather than parsed from argv
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Slot>,
    pub keyword: IndexMap<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyword-only call
    pub fn from_keywords(keyword: IndexMap<String, Value>) -> Self {
        CallArgs {
            positional: Vec::new(),
            keyword,
        }
    }

    /// Add a positional value
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(Slot::Value(value.into()));
        self
    }

    /// Add a positional placeholder that falls back to defaults
    pub fn default_arg(mut self) -> Self {
        self.positional.push(Slot::Default);
        self
    }

    /// Add a keyword value
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }
}

/// Resolved arguments handed to a command implementation.
///
/// Lookups accept either the declared parameter name or its CLI form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: IndexMap<String, Value>,
    extra: IndexMap<String, Value>,
}

impl Args {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(&normalize_name(name))
    }

    /// Value of `name`, `null` when unknown
    pub fn value(&self, name: &str) -> &Value {
        self.get(name).unwrap_or(&Value::Null)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Truthiness of `name`; null, false, zero and empty values are false
    pub fn bool(&self, name: &str) -> bool {
        match self.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
        }
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    /// Items of a container arg; empty when unset or not a sequence
    pub fn list(&self, name: &str) -> &[Value] {
        self.get(name)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Keyword values collected by a keywords catch-all
    pub fn extra(&self) -> &IndexMap<String, Value> {
        &self.extra
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All resolved values as a JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect())
    }
}

/// Resolve call-site values into final args.
///
/// Positionals resolve left to right; a placeholder or missing slot falls
/// back to a keyword value, then `overrides`, then the declared default.
/// Every missing positional is reported together. Optionals take the call
/// value, then `overrides`, then the declared default.
pub fn resolve(
    command: &str,
    args: &ArgMap,
    overrides: &IndexMap<String, Value>,
    call: CallArgs,
    accepts_keywords: bool,
) -> Result<Args, RunkitError> {
    let mut slots = call.positional.into_iter();
    let mut keyword: IndexMap<String, Value> = call
        .keyword
        .into_iter()
        .map(|(name, value)| (normalize_name(&name), value))
        .collect();

    let mut values = IndexMap::new();
    let mut missing = Vec::new();

    for arg in args.values().filter(|a| !a.is_synthetic_help()) {
        let name = arg.name.as_str();
        let from_keyword = keyword.shift_remove(name);
        let fallback = || {
            from_keyword
                .clone()
                .or_else(|| overrides.get(name).cloned())
                .or_else(|| arg.default.clone())
        };

        let value = match arg.kind {
            ArgKind::Positional => match slots.next() {
                Some(Slot::Value(value)) => Some(value),
                Some(Slot::Default) | None => fallback(),
            },
            ArgKind::Variadic => {
                let rest: Vec<Value> = slots
                    .by_ref()
                    .map(|slot| match slot {
                        Slot::Value(value) => value,
                        Slot::Default => Value::Null,
                    })
                    .collect();
                if rest.is_empty() {
                    Some(fallback().unwrap_or_else(|| Value::Array(Vec::new())))
                } else {
                    Some(Value::Array(rest))
                }
            }
            ArgKind::Optional => Some(fallback().unwrap_or(Value::Null)),
        };

        match value {
            Some(value) => {
                values.insert(arg.name.clone(), value);
            }
            None => missing.push(arg.name.clone()),
        }
    }

    let extra_positionals = slots.count();
    if extra_positionals > 0 {
        let expected = args.values().filter(|a| a.is_positional()).count();
        return Err(UsageError::TooManyPositionals {
            command: command.to_string(),
            expected,
        }
        .into());
    }

    if !missing.is_empty() {
        return Err(ConfigError::MissingArgs {
            command: command.to_string(),
            names: missing.join(", "),
        }
        .into());
    }

    if !accepts_keywords {
        if let Some(name) = keyword.keys().next() {
            return Err(UsageError::UnknownArgument {
                command: command.to_string(),
                name: name.clone(),
            }
            .into());
        }
    }

    Ok(Args {
        values,
        extra: keyword,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::signature::{compile, ArgConfig, DefaultValue, Param};
    use serde_json::json;

    fn args(params: &[Param]) -> ArgMap {
        compile(params).unwrap()
    }

    #[test]
    fn test_positionals_resolve_left_to_right() {
        let args = args(&[Param::positional("a"), Param::positional("b")]);
        let call = CallArgs::new().arg("x").arg("y");
        let resolved = resolve("cmd", &args, &IndexMap::new(), call, false).unwrap();
        assert_eq!(resolved.str("a"), Some("x"));
        assert_eq!(resolved.str("b"), Some("y"));
        assert!(!resolved.contains("help"));
    }

    #[test]
    fn test_all_missing_positionals_reported_together() {
        let args = args(&[Param::positional("a"), Param::positional("b"), Param::optional("c", 1)]);
        let err = resolve("cmd", &args, &IndexMap::new(), CallArgs::new(), false).unwrap_err();
        match err {
            RunkitError::Config(ConfigError::MissingArgs { command, names }) => {
                assert_eq!(command, "cmd");
                assert_eq!(names, "a, b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_placeholder_uses_override_then_default() {
        let args = args(&[
            Param::positional("a"),
            Param::positional("b").with(ArgConfig::new().default_value("declared")),
        ]);
        let mut overrides = IndexMap::new();
        overrides.insert("a".to_string(), json!("configured"));

        let resolved = resolve(
            "cmd",
            &args,
            &overrides,
            CallArgs::new().default_arg().default_arg(),
            false,
        )
        .unwrap();
        assert_eq!(resolved.str("a"), Some("configured"));
        assert_eq!(resolved.str("b"), Some("declared"));
    }

    #[test]
    fn test_optional_precedence() {
        let args = args(&[Param::optional("level", 1), Param::optional("name", "n")]);
        let mut overrides = IndexMap::new();
        overrides.insert("level".to_string(), json!(2));
        overrides.insert("name".to_string(), json!("configured"));

        let call = CallArgs::new().kwarg("name", "given");
        let resolved = resolve("cmd", &args, &overrides, call, false).unwrap();
        assert_eq!(resolved.i64("level"), Some(2));
        assert_eq!(resolved.str("name"), Some("given"));

        let resolved = resolve("cmd", &args, &IndexMap::new(), CallArgs::new(), false).unwrap();
        assert_eq!(resolved.i64("level"), Some(1));
    }

    #[test]
    fn test_variadic_collects_remaining() {
        let args = args(&[Param::positional("first"), Param::variadic("rest")]);
        let call = CallArgs::new().arg(1).arg(2).arg(3);
        let resolved = resolve("cmd", &args, &IndexMap::new(), call, false).unwrap();
        assert_eq!(resolved.i64("first"), Some(1));
        assert_eq!(resolved.list("rest"), &[json!(2), json!(3)]);

        let resolved =
            resolve("cmd", &args, &IndexMap::new(), CallArgs::new().arg(1), false).unwrap();
        assert!(resolved.list("rest").is_empty());
    }

    #[test]
    fn test_keyword_names_are_normalized() {
        let args = args(&[Param::optional("dry_run", false)]);
        let call = CallArgs::new().kwarg("dry_run", true);
        let resolved = resolve("cmd", &args, &IndexMap::new(), call, false).unwrap();
        assert!(resolved.bool("dry-run"));
        assert!(resolved.bool("dry_run"));
    }

    #[test]
    fn test_unknown_keyword_fails() {
        let args = args(&[Param::optional("level", 1)]);
        let call = CallArgs::new().kwarg("bogus", 1);
        let err = resolve("cmd", &args, &IndexMap::new(), call, false).unwrap_err();
        assert!(matches!(
            err,
            RunkitError::Usage(UsageError::UnknownArgument { name, .. }) if name == "bogus"
        ));
    }

    #[test]
    fn test_keywords_catch_all_collects_extra() {
        let args = args(&[Param::optional("level", 1), Param::keywords("rest")]);
        let call = CallArgs::new().kwarg("bogus", 1);
        let resolved = resolve("cmd", &args, &IndexMap::new(), call, true).unwrap();
        assert_eq!(resolved.extra()["bogus"], json!(1));
    }

    #[test]
    fn test_too_many_positionals_fails() {
        let args = args(&[Param::positional("a")]);
        let call = CallArgs::new().arg(1).arg(2);
        let err = resolve("cmd", &args, &IndexMap::new(), call, false).unwrap_err();
        assert!(matches!(
            err,
            RunkitError::Usage(UsageError::TooManyPositionals { expected: 1, .. })
        ));
    }

    #[test]
    fn test_typed_getters() {
        let args = args(&[
            Param::optional("ratio", 0.5),
            Param::optional("items", DefaultValue::list([json!("a")])),
            Param::optional("empty", ""),
        ]);
        let resolved = resolve("cmd", &args, &IndexMap::new(), CallArgs::new(), false).unwrap();
        assert_eq!(resolved.f64("ratio"), Some(0.5));
        assert_eq!(resolved.list("items"), &[json!("a")]);
        assert!(!resolved.bool("empty"));
        assert_eq!(resolved.value("missing"), &Value::Null);
    }
}
