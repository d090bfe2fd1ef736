//! Parameter declarations and the descriptors derived from them
//!
//! A command declares its implementation's parameters up front with [`Param`].
//! [`compile`] turns that table into ordered [`ArgDescriptor`]s: CLI names,
//! value types, containers, choices and defaults. Everything is validated here
//! so a bad declaration fails when the command is built, not when it runs.

use crate::error::{ConfigError, ConfigResult};
use crate::util::normalize_name;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::LazyLock;

static SHORT_OPTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-\w$").unwrap());
static LONG_OPTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^--\w[\w-]*$").unwrap());

/// Name of the synthetic help descriptor
pub const HELP: &str = "help";

/// Concrete value type of an arg
#[derive(Debug, Clone, PartialEq)]
pub enum ArgType {
    Str,
    Int,
    Float,
    Bool,
    /// One of a fixed set of members (an enumeration)
    Choice(Vec<String>),
    /// Usable as a bare flag, with a value of the inner type, or negated
    BoolOr(Box<ArgType>),
    Dict,
    List,
    Tuple,
    /// Tolerant JSON: decoded when possible, kept as a string otherwise
    Json,
}

impl ArgType {
    pub fn bool_or(inner: ArgType) -> Self {
        ArgType::BoolOr(Box::new(inner))
    }

    pub fn choice<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ArgType::Choice(members.into_iter().map(Into::into).collect())
    }

    fn is_scalar(&self) -> bool {
        matches!(
            self,
            ArgType::Str | ArgType::Int | ArgType::Float | ArgType::Choice(_) | ArgType::Json
        )
    }

    pub(crate) fn is_numeric(&self) -> bool {
        match self {
            ArgType::Int | ArgType::Float => true,
            ArgType::BoolOr(inner) => inner.is_numeric(),
            _ => false,
        }
    }

    fn container(&self) -> Option<Container> {
        match self {
            ArgType::Dict => Some(Container::Dict),
            ArgType::List => Some(Container::List),
            ArgType::Tuple => Some(Container::Tuple),
            _ => None,
        }
    }

    /// Parse one raw CLI token as this type
    pub fn parse(&self, raw: &str) -> Result<Value, String> {
        match self {
            ArgType::Str => Ok(Value::String(raw.to_string())),
            ArgType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("invalid int value: '{raw}'")),
            ArgType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("invalid float value: '{raw}'")),
            ArgType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
                "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
                _ => Err(format!("invalid bool value: '{raw}'")),
            },
            ArgType::Choice(members) => {
                if members.iter().any(|m| m == raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(invalid_choice(raw, members))
                }
            }
            ArgType::BoolOr(inner) => inner.parse(raw),
            ArgType::Dict | ArgType::List | ArgType::Tuple | ArgType::Json => {
                Ok(crate::util::decode_tolerant(raw))
            }
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::Str => write!(f, "str"),
            ArgType::Int => write!(f, "int"),
            ArgType::Float => write!(f, "float"),
            ArgType::Bool => write!(f, "bool"),
            ArgType::Choice(members) => write!(f, "choice({})", members.join(", ")),
            ArgType::BoolOr(inner) => write!(f, "bool_or({inner})"),
            ArgType::Dict => write!(f, "dict"),
            ArgType::List => write!(f, "list"),
            ArgType::Tuple => write!(f, "tuple"),
            ArgType::Json => write!(f, "json"),
        }
    }
}

pub(crate) fn invalid_choice(raw: &str, choices: &[String]) -> String {
    let choices = choices
        .iter()
        .map(|c| format!("'{c}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("invalid choice: '{raw}' (choose from {choices})")
}

/// Container kind of an arg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    List,
    Tuple,
    Dict,
}

/// Runtime shape of a declared default
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Dict(Map<String, Value>),
    /// A member of an enumeration; the members become the choices
    Choice { value: String, members: Vec<String> },
    /// Boolean-or-value marker
    BoolOr { value: Value, inner: ArgType },
}

impl DefaultValue {
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        DefaultValue::List(items.into_iter().collect())
    }

    pub fn tuple<I: IntoIterator<Item = Value>>(items: I) -> Self {
        DefaultValue::Tuple(items.into_iter().collect())
    }

    pub fn dict() -> Self {
        DefaultValue::Dict(Map::new())
    }

    pub fn choice<I, S>(value: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DefaultValue::Choice {
            value: value.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn bool_or(value: impl Into<Value>, inner: ArgType) -> Self {
        DefaultValue::BoolOr {
            value: value.into(),
            inner,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DefaultValue::Null => Value::Null,
            DefaultValue::Bool(b) => Value::Bool(*b),
            DefaultValue::Int(i) => Value::from(*i),
            DefaultValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            DefaultValue::Str(s) => Value::String(s.clone()),
            DefaultValue::List(items) | DefaultValue::Tuple(items) => Value::Array(items.clone()),
            DefaultValue::Dict(map) => Value::Object(map.clone()),
            DefaultValue::Choice { value, .. } => Value::String(value.clone()),
            DefaultValue::BoolOr { value, .. } => value.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            DefaultValue::Null => true,
            DefaultValue::Str(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<bool> for DefaultValue {
    fn from(value: bool) -> Self {
        DefaultValue::Bool(value)
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        DefaultValue::Int(value)
    }
}

impl From<i32> for DefaultValue {
    fn from(value: i32) -> Self {
        DefaultValue::Int(value.into())
    }
}

impl From<f64> for DefaultValue {
    fn from(value: f64) -> Self {
        DefaultValue::Float(value)
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        DefaultValue::Str(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        DefaultValue::Str(value)
    }
}

/// Declarative per-parameter overrides.
///
/// Anything set here wins over what would be inferred from the parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgConfig {
    pub short_option: Option<String>,
    pub long_option: Option<String>,
    pub inverse_option: Option<String>,
    pub value_type: Option<ArgType>,
    pub container: Option<Container>,
    pub choices: Option<Vec<String>>,
    pub help: Option<String>,
    pub default: Option<Value>,
    pub group: Option<String>,
}

impl ArgConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn short_option(mut self, option: impl Into<String>) -> Self {
        self.short_option = Some(option.into());
        self
    }

    pub fn long_option(mut self, option: impl Into<String>) -> Self {
        self.long_option = Some(option.into());
        self
    }

    pub fn inverse_option(mut self, option: impl Into<String>) -> Self {
        self.inverse_option = Some(option.into());
        self
    }

    pub fn value_type(mut self, value_type: ArgType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// How a parameter is bound
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Required unless a default is configured
    Positional,
    /// Has a declared default
    Optional(DefaultValue),
    /// Catch-all for remaining positional values
    Variadic,
    /// Catch-all for extra keyword values; never exposed on the command line
    Keywords,
}

/// One parameter of a command implementation
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub config: ArgConfig,
}

impl Param {
    pub fn positional(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Positional,
            config: ArgConfig::default(),
        }
    }

    pub fn optional(name: impl Into<String>, default: impl Into<DefaultValue>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Optional(default.into()),
            config: ArgConfig::default(),
        }
    }

    pub fn variadic(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Variadic,
            config: ArgConfig::default(),
        }
    }

    pub fn keywords(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Keywords,
            config: ArgConfig::default(),
        }
    }

    /// Attach an arg config
    pub fn with(mut self, config: ArgConfig) -> Self {
        self.config = config;
        self
    }

    /// Shorthand for a help-only config
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.config.help = Some(help.into());
        self
    }

    /// Internal parameters are never derived into args
    pub fn is_internal(&self) -> bool {
        self.name.starts_with('_')
    }
}

/// Kind of a derived arg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Positional,
    Optional,
    Variadic,
}

/// CLI-facing arg derived from one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ArgDescriptor {
    /// Normalized CLI name
    pub name: String,
    /// Parameter name as declared
    pub param_name: String,
    pub kind: ArgKind,
    /// Value type; the element type for containers
    pub value_type: ArgType,
    pub container: Option<Container>,
    pub default: Option<Value>,
    pub choices: Option<Vec<String>>,
    pub short_option: Option<String>,
    pub long_option: Option<String>,
    pub inverse_option: Option<String>,
    pub help: Option<String>,
    pub group: Option<String>,
    pub(crate) synthetic: bool,
}

impl ArgDescriptor {
    fn help_descriptor() -> Self {
        ArgDescriptor {
            name: HELP.to_string(),
            param_name: HELP.to_string(),
            kind: ArgKind::Optional,
            value_type: ArgType::Bool,
            container: None,
            default: Some(Value::Bool(false)),
            choices: None,
            short_option: Some("-h".to_string()),
            long_option: None,
            inverse_option: None,
            help: Some("Show this help message and exit".to_string()),
            group: None,
            synthetic: true,
        }
    }

    pub fn is_positional(&self) -> bool {
        self.kind == ArgKind::Positional
    }

    pub fn is_optional(&self) -> bool {
        self.kind == ArgKind::Optional
    }

    pub fn is_variadic(&self) -> bool {
        self.kind == ArgKind::Variadic
    }

    /// The auto-generated `-h/--help` arg
    pub fn is_synthetic_help(&self) -> bool {
        self.synthetic
    }

    pub fn is_bool(&self) -> bool {
        self.container.is_none() && self.value_type == ArgType::Bool
    }

    pub fn is_bool_or(&self) -> bool {
        self.container.is_none() && matches!(self.value_type, ArgType::BoolOr(_))
    }

    pub fn is_dict(&self) -> bool {
        self.container == Some(Container::Dict)
    }

    pub fn is_list(&self) -> bool {
        matches!(self.container, Some(Container::List | Container::Tuple))
    }

    /// Whether an option occurrence must be followed by a value
    pub fn takes_value(&self) -> bool {
        !self.is_positional() && !self.is_variadic() && !self.is_bool() && !self.is_bool_or()
    }

    /// All option strings registered for this arg
    pub fn option_strings(&self) -> Vec<&str> {
        [&self.short_option, &self.long_option, &self.inverse_option]
            .into_iter()
            .filter_map(|o| o.as_deref())
            .collect()
    }

    /// Placeholder shown for the arg's value in usage text
    pub fn metavar(&self) -> String {
        let mut metavar = self.name.to_uppercase().replace('-', "_");
        let plural = metavar.len() > 1 && metavar.ends_with('S');
        if !self.is_positional() && self.container.is_some() && plural {
            metavar.pop();
        }
        match &self.choices {
            Some(choices) if self.is_positional() => format!("{{{}}}", choices.join(",")),
            _ => metavar,
        }
    }

    /// Parse one raw token for this arg, validating choices
    pub fn parse_value(&self, raw: &str) -> Result<Value, String> {
        let value = self.value_type.parse(raw)?;
        match &self.choices {
            Some(choices) if !choices.iter().any(|c| c == raw) => Err(invalid_choice(raw, choices)),
            _ => Ok(value),
        }
    }
}

/// Derived args keyed by normalized name, in declaration order
pub type ArgMap = IndexMap<String, ArgDescriptor>;

/// Compile parameter declarations into arg descriptors.
///
/// The synthetic `help` descriptor comes first unless a parameter named
/// `help` replaces it. Options are not allocated here.
pub fn compile(params: &[Param]) -> ConfigResult<ArgMap> {
    let mut args = ArgMap::new();
    let declares_help = params
        .iter()
        .any(|p| !p.is_internal() && normalize_name(&p.name) == HELP);
    if !declares_help {
        args.insert(HELP.to_string(), ArgDescriptor::help_descriptor());
    }

    let mut seen_variadic = false;
    let mut seen_multi_positional = false;

    for param in params {
        if param.is_internal() || param.kind == ParamKind::Keywords {
            continue;
        }

        let descriptor = compile_param(param)?;

        match descriptor.kind {
            ArgKind::Positional | ArgKind::Variadic => {
                if seen_variadic || seen_multi_positional {
                    return Err(ConfigError::Invalid(format!(
                        "positional arg '{}' follows an arg that takes multiple values",
                        descriptor.name
                    )));
                }
                if descriptor.is_variadic() {
                    seen_variadic = true;
                } else if descriptor.container.is_some() {
                    seen_multi_positional = true;
                }
            }
            ArgKind::Optional => {}
        }

        if args.contains_key(&descriptor.name) {
            return Err(ConfigError::DuplicateArg(descriptor.name));
        }
        args.insert(descriptor.name.clone(), descriptor);
    }

    Ok(args)
}

fn compile_param(param: &Param) -> ConfigResult<ArgDescriptor> {
    let config = &param.config;
    let name = normalize_name(&param.name);

    if let Some(short) = &config.short_option {
        if !SHORT_OPTION.is_match(short) {
            return Err(ConfigError::InvalidShortOption(short.clone()));
        }
    }
    for long in [&config.long_option, &config.inverse_option].into_iter().flatten() {
        if !LONG_OPTION.is_match(long) {
            return Err(ConfigError::InvalidLongOption(long.clone()));
        }
    }
    if let Some(value_type) = &config.value_type {
        validate_type(value_type)?;
    }

    let kind = match param.kind {
        ParamKind::Positional => ArgKind::Positional,
        ParamKind::Optional(_) => ArgKind::Optional,
        ParamKind::Variadic => ArgKind::Variadic,
        ParamKind::Keywords => unreachable!("keyword catch-alls are skipped"),
    };
    let declared = match &param.kind {
        ParamKind::Optional(default) => Some(default),
        _ => None,
    };

    let (mut value_type, mut container) = match (&config.value_type, declared) {
        (Some(value_type), declared) => match value_type.container() {
            Some(container) => (ArgType::Json, Some(container)),
            None => (value_type.clone(), declared.and_then(default_container)),
        },
        (None, None) => (ArgType::Str, None),
        (None, Some(default)) => infer_type(default),
    };
    if config.container.is_some() {
        container = config.container;
    }
    if container.is_some() && value_type == ArgType::Bool {
        return Err(ConfigError::InvalidType(format!(
            "{} container of bool for '{}'",
            container_name(container),
            name
        )));
    }

    // Configured choices replace the members of an inferred enumeration
    if let (None, Some(choices)) = (&config.value_type, &config.choices) {
        value_type = match value_type {
            ArgType::Choice(_) => ArgType::Choice(choices.clone()),
            ArgType::BoolOr(inner) if matches!(*inner, ArgType::Choice(_)) => {
                ArgType::bool_or(ArgType::Choice(choices.clone()))
            }
            other => other,
        };
    }

    let choices = config.choices.clone().or_else(|| match &value_type {
        ArgType::Choice(members) => Some(members.clone()),
        ArgType::BoolOr(inner) => match inner.as_ref() {
            ArgType::Choice(members) => Some(members.clone()),
            _ => None,
        },
        _ => None,
    });

    let default = config
        .default
        .clone()
        .or_else(|| declared.map(DefaultValue::to_value));

    Ok(ArgDescriptor {
        name,
        param_name: param.name.clone(),
        kind,
        value_type,
        container,
        default,
        choices,
        short_option: config.short_option.clone(),
        long_option: config.long_option.clone(),
        inverse_option: config.inverse_option.clone(),
        help: config.help.clone(),
        group: config.group.clone(),
        synthetic: false,
    })
}

fn container_name(container: Option<Container>) -> &'static str {
    match container {
        Some(Container::List) => "list",
        Some(Container::Tuple) => "tuple",
        Some(Container::Dict) => "dict",
        None => "no",
    }
}

fn validate_type(value_type: &ArgType) -> ConfigResult<()> {
    match value_type {
        ArgType::BoolOr(inner) if !inner.is_scalar() || matches!(inner.as_ref(), ArgType::Json) => {
            Err(ConfigError::InvalidType(inner.to_string()))
        }
        ArgType::Choice(members) if members.is_empty() => {
            Err(ConfigError::InvalidType("choice with no members".to_string()))
        }
        _ => Ok(()),
    }
}

fn default_container(default: &DefaultValue) -> Option<Container> {
    match default {
        DefaultValue::List(_) => Some(Container::List),
        DefaultValue::Tuple(_) => Some(Container::Tuple),
        DefaultValue::Dict(_) => Some(Container::Dict),
        _ => None,
    }
}

fn infer_type(default: &DefaultValue) -> (ArgType, Option<Container>) {
    if default.is_empty() {
        return (ArgType::Str, None);
    }
    match default {
        DefaultValue::Bool(_) => (ArgType::Bool, None),
        DefaultValue::Int(_) => (ArgType::Int, None),
        DefaultValue::Float(_) => (ArgType::Float, None),
        DefaultValue::List(_) | DefaultValue::Tuple(_) | DefaultValue::Dict(_) => {
            (ArgType::Json, default_container(default))
        }
        DefaultValue::Choice { members, .. } => (ArgType::Choice(members.clone()), None),
        DefaultValue::BoolOr { inner, .. } => (ArgType::bool_or(inner.clone()), None),
        DefaultValue::Null | DefaultValue::Str(_) => (ArgType::Str, None),
    }
}
