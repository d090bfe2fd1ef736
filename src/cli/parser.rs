//! Derived argument parsers
//!
//! Builds a `clap::Command` from a command's arg descriptors and reads back
//! only the values that were given on the command line. Defaults are applied
//! later, during call resolution, so they never masquerade as user input.

use crate::command::signature::{ArgDescriptor, ArgMap};
use crate::util::load_json_item;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

/// Stand-in for a bare option occurrence (`--name` with no value)
const BARE: &str = "\u{0}bare";

/// Build a parser for one command.
///
/// `overrides` are externally configured defaults. A positional with either
/// kind of default becomes zero-or-one arity.
pub fn build_parser(
    name: &str,
    description: Option<&str>,
    args: &ArgMap,
    overrides: &IndexMap<String, Value>,
) -> Command {
    let mut cmd = Command::new(name.to_string())
        .no_binary_name(true)
        .disable_version_flag(true)
        .disable_help_flag(true)
        .args_override_self(true);

    if let Some(description) = description {
        cmd = cmd.about(description.to_string());
    }

    let mut seen_optional_positional = false;
    let mut groups: IndexMap<&str, Vec<String>> = IndexMap::new();

    for arg in args.values() {
        let defaulted = arg.default.is_some() || overrides.contains_key(&arg.name);

        if arg.is_positional() {
            if defaulted {
                seen_optional_positional = true;
            } else if seen_optional_positional {
                cmd = cmd.allow_missing_positional(true);
            }
        }

        if let Some(group) = &arg.group {
            groups.entry(group.as_str()).or_default().push(arg.name.clone());
        }

        for clap_arg in clap_args(arg, defaulted) {
            cmd = cmd.arg(clap_arg);
        }
    }

    for (group, members) in groups {
        cmd = cmd.group(
            ArgGroup::new(format!("exclusive:{group}"))
                .args(members)
                .multiple(false),
        );
    }

    cmd
}

/// Id of the synthesized `--no-name` flag
fn inverse_id(arg: &ArgDescriptor) -> String {
    format!("{}:inverse", arg.name)
}

fn clap_args(arg: &ArgDescriptor, defaulted: bool) -> Vec<Arg> {
    if arg.is_synthetic_help() {
        return vec![with_options(Arg::new(arg.name.clone()), arg)
            .action(ArgAction::Help)
            .help(arg.help.clone().unwrap_or_default())];
    }

    let mut main = Arg::new(arg.name.clone()).help(help_text(arg));

    if arg.is_positional() || arg.is_variadic() {
        main = main.value_name(arg.metavar());
        main = if arg.is_dict() {
            main.value_parser(load_json_item)
        } else {
            main.value_parser(value_parser(arg))
        };
        main = if arg.is_variadic() {
            main.action(ArgAction::Append).num_args(0..)
        } else if arg.container.is_some() {
            let min = if defaulted { 0 } else { 1 };
            main.action(ArgAction::Append).num_args(min..).required(!defaulted)
        } else {
            main.action(ArgAction::Set).required(!defaulted)
        };
        return vec![main];
    }

    main = with_options(main, arg);
    if arg.value_type.is_numeric() {
        main = main.allow_negative_numbers(true);
    }

    if arg.is_bool() {
        main = main.action(ArgAction::SetTrue);
    } else if arg.is_bool_or() {
        main = main
            .action(ArgAction::Set)
            .num_args(0..=1)
            .value_name(arg.metavar())
            .default_missing_value(BARE)
            .value_parser(bare_value_parser(arg, Value::Bool(true)));
    } else if arg.is_dict() {
        main = main
            .action(ArgAction::Append)
            .value_name("KEY=VALUE")
            .value_parser(load_json_item);
    } else if arg.is_list() {
        main = main
            .action(ArgAction::Append)
            .num_args(0..=1)
            .value_name(arg.metavar())
            .default_missing_value(BARE)
            .value_parser(bare_value_parser(arg, Value::Null));
    } else {
        main = main
            .action(ArgAction::Set)
            .value_name(arg.metavar())
            .value_parser(value_parser(arg));
    }

    let Some(inverse) = &arg.inverse_option else {
        return vec![main];
    };
    let id = inverse_id(arg);
    main = main.overrides_with(id.clone());
    let inverse = Arg::new(id)
        .long(inverse.trim_start_matches('-').to_string())
        .action(ArgAction::SetTrue)
        .overrides_with(arg.name.clone())
        .help(format!("Negate --{}", arg.name));
    vec![main, inverse]
}

fn with_options(mut clap_arg: Arg, arg: &ArgDescriptor) -> Arg {
    if let Some(short) = arg.short_option.as_deref().and_then(|s| s.chars().nth(1)) {
        clap_arg = clap_arg.short(short);
    }
    if let Some(long) = &arg.long_option {
        clap_arg = clap_arg.long(long.trim_start_matches('-').to_string());
    }
    clap_arg
}

fn help_text(arg: &ArgDescriptor) -> String {
    let mut help = arg.help.clone().unwrap_or_default();
    if let Some(choices) = &arg.choices {
        if !arg.is_positional() {
            if !help.is_empty() {
                help.push(' ');
            }
            help.push_str(&format!("[choices: {}]", choices.join(", ")));
        }
    }
    help
}

fn value_parser(
    arg: &ArgDescriptor,
) -> impl Fn(&str) -> Result<Value, String> + Clone + Send + Sync + 'static {
    let arg = arg.clone();
    move |raw: &str| arg.parse_value(raw)
}

fn bare_value_parser(
    arg: &ArgDescriptor,
    bare: Value,
) -> impl Fn(&str) -> Result<Value, String> + Clone + Send + Sync + 'static {
    let arg = arg.clone();
    move |raw: &str| {
        if raw == BARE {
            Ok(bare.clone())
        } else {
            arg.parse_value(raw)
        }
    }
}

fn given(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Read back the values given on the command line, keyed by arg name.
///
/// Args that weren't given are absent so later default sources can fill them.
pub fn collect_values(args: &ArgMap, matches: &ArgMatches) -> IndexMap<String, Value> {
    let mut values = IndexMap::new();

    for arg in args.values().filter(|a| !a.is_synthetic_help()) {
        let name = arg.name.as_str();

        if arg.is_bool() && arg.is_optional() {
            if arg.inverse_option.is_some() && given(matches, &inverse_id(arg)) {
                values.insert(arg.name.clone(), Value::Bool(false));
            } else if given(matches, name) {
                values.insert(arg.name.clone(), Value::Bool(matches.get_flag(name)));
            }
            continue;
        }

        if arg.is_bool_or() && arg.inverse_option.is_some() && given(matches, &inverse_id(arg)) {
            values.insert(arg.name.clone(), Value::Bool(false));
            continue;
        }

        if !given(matches, name) {
            continue;
        }

        let value = if arg.is_dict() {
            let items = matches
                .get_many::<(String, Value)>(name)
                .into_iter()
                .flatten()
                .cloned();
            Value::Object(items.collect::<Map<String, Value>>())
        } else if arg.container.is_some() || arg.is_variadic() {
            Value::Array(matches.get_many::<Value>(name).into_iter().flatten().cloned().collect())
        } else {
            match matches.get_one::<Value>(name) {
                Some(value) => value.clone(),
                None => continue,
            }
        };
        values.insert(arg.name.clone(), value);
    }

    debug!(?values, "collected command line values");
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::options::allocate;
    use crate::command::signature::{compile, ArgConfig, ArgType, Container, DefaultValue, Param};
    use serde_json::json;

    fn parse(params: &[Param], argv: &[&str]) -> Result<IndexMap<String, Value>, clap::Error> {
        let mut args = compile(params).unwrap();
        allocate("test", &mut args).unwrap();
        let matches =
            build_parser("test", None, &args, &IndexMap::new()).try_get_matches_from(argv)?;
        Ok(collect_values(&args, &matches))
    }

    #[test]
    fn test_only_given_values_are_collected() {
        let params = [Param::optional("name", "x"), Param::optional("flag", false)];
        let values = parse(&params, &[]).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_scalar_and_typed_options() {
        let values = parse(
            &[Param::optional("name", "x"), Param::optional("count", 1)],
            &["--name", "y", "-c", "3"],
        )
        .unwrap();
        assert_eq!(values["name"], json!("y"));
        assert_eq!(values["count"], json!(3));
    }

    #[test]
    fn test_negative_number_value() {
        let values = parse(&[Param::optional("offset", 0)], &["--offset", "-2"]).unwrap();
        assert_eq!(values["offset"], json!(-2));
    }

    #[test]
    fn test_bool_flag_and_inverse() {
        let params = [Param::optional("flag", true)];
        assert_eq!(parse(&params, &["--no-flag"]).unwrap()["flag"], json!(false));
        assert_eq!(parse(&params, &["--flag"]).unwrap()["flag"], json!(true));
        assert_eq!(parse(&params, &["--no-flag", "--flag"]).unwrap()["flag"], json!(true));
        assert_eq!(parse(&params, &["--flag", "--no-flag"]).unwrap()["flag"], json!(false));
    }

    #[test]
    fn test_bool_or_value() {
        let params = [Param::optional(
            "hide",
            DefaultValue::bool_or(Value::Null, ArgType::choice(["stdout", "all"])),
        )];
        assert_eq!(parse(&params, &["--hide"]).unwrap()["hide"], json!(true));
        assert_eq!(parse(&params, &["--hide", "all"]).unwrap()["hide"], json!("all"));
        assert_eq!(parse(&params, &["--no-hide"]).unwrap()["hide"], json!(false));
        assert!(parse(&params, &["--hide", "bogus"]).is_err());
    }

    #[test]
    fn test_dict_option_accumulates() {
        let values = parse(
            &[Param::optional("env", DefaultValue::dict())],
            &["--env", "a=1", "--env", "b=foo", "--env", "c="],
        )
        .unwrap();
        assert_eq!(values["env"], json!({"a": 1, "b": "foo", "c": null}));
    }

    #[test]
    fn test_list_option_appends() {
        let values = parse(
            &[Param::optional("item", DefaultValue::list([]))],
            &["--item", "1", "--item", "x", "--item"],
        )
        .unwrap();
        assert_eq!(values["item"], json!([1, "x", null]));
    }

    #[test]
    fn test_required_positional() {
        let params = [Param::positional("path")];
        assert_eq!(parse(&params, &["a"]).unwrap()["path"], json!("a"));
        assert!(parse(&params, &[]).is_err());
    }

    #[test]
    fn test_defaulted_positional_is_optional() {
        let params = [Param::positional("target").with(ArgConfig::new().default_value("all"))];
        assert!(parse(&params, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_override_makes_positional_optional() {
        let mut args = compile(&[Param::positional("target")]).unwrap();
        allocate("test", &mut args).unwrap();
        let mut overrides = IndexMap::new();
        overrides.insert("target".to_string(), json!("all"));
        let result = build_parser("test", None, &args, &overrides)
            .try_get_matches_from(Vec::<String>::new());
        assert!(result.is_ok());
    }

    #[test]
    fn test_container_positional_and_variadic() {
        let values = parse(
            &[
                Param::positional("numbers")
                    .with(ArgConfig::new().value_type(ArgType::Int).container(Container::List)),
            ],
            &["1", "2"],
        )
        .unwrap();
        assert_eq!(values["numbers"], json!([1, 2]));

        let params = [Param::positional("first"), Param::variadic("rest")];
        let values = parse(&params, &["a", "b", "c"]).unwrap();
        assert_eq!(values["first"], json!("a"));
        assert_eq!(values["rest"], json!(["b", "c"]));
    }

    #[test]
    fn test_dict_positional_collects_items() {
        let values = parse(
            &[Param::positional("env").with(ArgConfig::new().container(Container::Dict))],
            &["a=1", "b=two"],
        )
        .unwrap();
        assert_eq!(values["env"], json!({"a": 1, "b": "two"}));

        let bad = parse(
            &[Param::positional("env").with(ArgConfig::new().container(Container::Dict))],
            &["novalue"],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_mutually_exclusive_group() {
        let params = [
            Param::optional("fast", false).with(ArgConfig::new().group("speed")),
            Param::optional("slow", false).with(ArgConfig::new().group("speed")),
        ];
        assert!(parse(&params, &["--fast"]).is_ok());
        let err = parse(&params, &["--fast", "--slow"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_help_is_a_display_request() {
        let err = parse(&[Param::optional("name", "x")], &["--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn test_unknown_option_fails() {
        let err = parse(&[Param::optional("name", "x")], &["--nope"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
