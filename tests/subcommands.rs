//! Integration tests for subcommand routing

mod common;

use common::{new_log, recorder, selector};
use runkit::{abort, Command, DefaultValue, Param, RunkitError};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn routing_tree(log: &common::Log) -> Command {
    recorder("base", "base", log)
        .param(selector())
        .subcommand(
            recorder("sub", "base:sub", log).param(selector()).subcommand(
                recorder("subsub", "base:sub:subsub", log)
                    .param(Param::positional("positional"))
                    .param(Param::optional("optional", DefaultValue::Null)),
            ),
        )
        .build()
        .unwrap()
}

#[test]
fn test_each_level_parses_its_own_segment() {
    let log = new_log();
    let base = routing_tree(&log);

    let result = base.run(&["sub", "subsub", "a", "--optional", "b"]).unwrap();
    assert_eq!(result.value, json!({"positional": "a", "optional": "b"}));
    assert_eq!(
        *log.borrow(),
        vec![
            ("base".to_string(), json!({"subcommand": "sub"})),
            ("base:sub".to_string(), json!({"subcommand": "subsub"})),
            ("base:sub:subsub".to_string(), json!({"positional": "a", "optional": "b"})),
        ]
    );
}

#[test]
fn test_qualified_names() {
    let log = new_log();
    let base = routing_tree(&log);

    let subsub = base.find("base:sub:subsub").unwrap();
    assert_eq!(subsub.name(), "subsub");
    assert_eq!(subsub.base_name(), Some("base:sub"));
    assert_eq!(
        base.selector().unwrap().choices.as_deref(),
        Some(&["sub".to_string()][..])
    );
}

#[test]
fn test_escaped_token_is_not_routed() {
    let log = new_log();
    let base = routing_tree(&log);

    base.run(&[":sub"]).unwrap();
    assert_eq!(*log.borrow(), vec![("base".to_string(), json!({"subcommand": "sub"}))]);
}

#[test]
fn test_unknown_subcommand_is_a_usage_error() {
    let log = new_log();
    let base = routing_tree(&log);

    assert!(matches!(base.run(&["nope"]), Err(RunkitError::Usage(_))));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_values_are_shared_with_subcommands() {
    let log = new_log();
    let base = recorder("base1", "base1", &log)
        .param(selector())
        .param(Param::optional("arg", DefaultValue::Null))
        .subcommand(
            recorder("sub1", "base1:sub1", &log)
                .param(selector())
                .param(Param::optional("flag", true))
                .subcommand(
                    recorder("subsub1", "base1:sub1:subsub1", &log)
                        .param(Param::optional("arg", DefaultValue::Null))
                        .param(Param::optional("flag", true)),
                ),
        )
        .build()
        .unwrap();

    let result = base.run(&["-a", "A", "sub1", "--no-flag", "subsub1"]).unwrap();
    assert_eq!(result.value, json!({"arg": "A", "flag": false}));
}

#[test]
fn test_subcommand_value_wins_over_shared() {
    let log = new_log();
    let base = recorder("base", "base", &log)
        .param(selector())
        .param(Param::optional("level", 0))
        .subcommand(recorder("sub", "base:sub", &log).param(Param::optional("level", 0)))
        .build()
        .unwrap();

    let result = base.run(&["-l", "1", "sub", "-l", "2"]).unwrap();
    assert_eq!(result.value, json!({"level": 2}));
}

#[test]
fn test_abort_in_subcommand() {
    let fired = Rc::new(RefCell::new(Vec::new()));
    let base = Command::builder("base")
        .param(selector())
        .subcommand(Command::builder("sub").implementation(|_| Err(abort(5, "sub gave up"))))
        .build()
        .unwrap();

    for command in [&base, base.subcommand("sub").unwrap()] {
        let fired = fired.clone();
        command.add_callback(move |command, result, aborted| {
            fired
                .borrow_mut()
                .push((command.qualified_name().to_string(), result.is_some(), aborted));
        });
    }

    assert_eq!(base.console_script(&["sub"]), 5);
    assert_eq!(*fired.borrow(), vec![("base".to_string(), false, true)]);
}

#[test]
fn test_callbacks_fire_innermost_first() {
    let fired = Rc::new(RefCell::new(Vec::new()));
    let base = Command::builder("base")
        .param(selector())
        .subcommand(Command::builder("sub"))
        .build()
        .unwrap();

    for command in [&base, base.subcommand("sub").unwrap()] {
        let fired = fired.clone();
        command.add_callback(move |command, _, _| {
            fired.borrow_mut().push(command.qualified_name().to_string())
        });
    }

    assert_eq!(base.console_script(&["sub"]), 0);
    assert_eq!(*fired.borrow(), vec!["base:sub".to_string(), "base".to_string()]);
}

#[test]
fn test_duplicate_subcommands_fail() {
    let result = Command::builder("base")
        .param(selector())
        .subcommand(Command::builder("sub"))
        .subcommand(Command::builder("sub"))
        .build();
    assert!(result.is_err());
}

#[test]
fn test_subcommands_need_a_selector() {
    let result = Command::builder("base").subcommand(Command::builder("sub")).build();
    assert!(result.is_err());
}
