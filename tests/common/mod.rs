//! Common test utilities
#![allow(dead_code)]

use runkit::{Args, Command, CommandBuilder, Param, RunResult};
use serde_json::Value;
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::TempDir;

/// Shared record of `(qualified name, args)` for every invocation
pub type Log = Rc<RefCell<Vec<(String, Value)>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Builder whose implementation records its args into `log`
pub fn recorder(name: &str, qualified_name: &str, log: &Log) -> CommandBuilder {
    let log = log.clone();
    let qualified_name = qualified_name.to_string();
    Command::builder(name).implementation(move |args: &Args| {
        log.borrow_mut().push((qualified_name.clone(), args.to_value()));
        Ok(RunResult::from_value(args.to_value()))
    })
}

/// Selector positional for commands with subcommands
pub fn selector() -> Param {
    Param::positional("subcommand")
}

/// Create a temporary directory with a runkit.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("runkit.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}
