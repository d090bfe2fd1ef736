//! Splitting runner options from chained command invocations

use crate::command::signature::ArgDescriptor;
use crate::command::Command;

/// Runner argv and the command argv that follows it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub run_argv: Vec<String>,
    pub command_argv: Vec<String>,
}

/// Separate the runner's own options from the commands to run.
///
/// Leading tokens are consumed while they are options of `runner`. An option
/// that requires a value also takes the next token; an option with choices
/// takes it only when it is one of them. The first other token starts the
/// commands. A literal `--` always splits.
pub fn partition_argv<S: AsRef<str>>(runner: &Command, argv: &[S]) -> Partition {
    let argv: Vec<String> = argv.iter().map(|a| a.as_ref().to_string()).collect();

    if let Some(i) = argv.iter().position(|a| a == "--") {
        return Partition {
            run_argv: argv[..i].to_vec(),
            command_argv: argv[i + 1..].to_vec(),
        };
    }

    let mut i = 0;
    while i < argv.len() {
        let Some(pending) = runner_option(runner, &argv[i]) else {
            break;
        };
        i += 1;

        let Some(arg) = pending else {
            continue;
        };
        if let Some(next) = argv.get(i) {
            let takes_next = match &arg.choices {
                Some(choices) => choices.contains(next),
                None => arg.takes_value(),
            };
            if takes_next {
                i += 1;
            }
        }
    }

    Partition {
        run_argv: argv[..i].to_vec(),
        command_argv: argv[i..].to_vec(),
    }
}

/// Match `token` against the runner's options.
///
/// Returns `None` when the token isn't a runner option, and `Some(arg)` with
/// the arg whose value may follow in the next token.
fn runner_option<'a>(runner: &'a Command, token: &str) -> Option<Option<&'a ArgDescriptor>> {
    if !token.starts_with('-') || token == "-" {
        return None;
    }

    if let Some((option, _)) = token.split_once('=') {
        // Inline value
        return lookup(runner, option).map(|_| None);
    }

    if let Some(arg) = lookup(runner, token) {
        return Some(Some(arg).filter(|a| value_may_follow(a, token)));
    }

    // Grouped short flags; only the last may take a value
    if !token.starts_with("--") && token.len() > 2 {
        let flags: Vec<String> = token.chars().skip(1).map(|c| format!("-{c}")).collect();
        let args: Option<Vec<&ArgDescriptor>> = flags.iter().map(|f| lookup(runner, f)).collect();
        let args = args?;
        let (last, rest) = args.split_last()?;
        if rest.iter().any(|a| a.takes_value()) {
            return None;
        }
        let last_flag = flags.last().map_or("", String::as_str);
        return Some(Some(*last).filter(|a| value_may_follow(a, last_flag)));
    }

    None
}

fn lookup<'a>(runner: &'a Command, option: &str) -> Option<&'a ArgDescriptor> {
    runner.option_map().get(option).and_then(|name| runner.args().get(name))
}

fn value_may_follow(arg: &ArgDescriptor, option: &str) -> bool {
    arg.inverse_option.as_deref() != Some(option) && (arg.takes_value() || arg.is_bool_or())
}
