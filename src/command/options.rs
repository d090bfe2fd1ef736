//! Option string allocation
//!
//! Short options come from the first character of the arg name, falling back
//! to its uppercase form. `-h` is kept for help. Every option string must map
//! to exactly one arg; a collision is a definition error.

use crate::command::signature::{ArgMap, HELP};
use crate::error::{ConfigError, ConfigResult};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Assign short, long and inverse options to every optional arg.
///
/// Args with an explicit short option are placed first so automatic
/// allocation can't take their letter.
pub fn allocate(command: &str, args: &mut ArgMap) -> ConfigResult<()> {
    let mut used: HashMap<String, String> = HashMap::new();

    let explicit: Vec<String> = args
        .values()
        .filter(|a| a.is_optional() && a.short_option.is_some())
        .map(|a| a.name.clone())
        .collect();
    let automatic: Vec<String> = args
        .values()
        .filter(|a| a.is_optional() && a.short_option.is_none())
        .map(|a| a.name.clone())
        .collect();

    for name in explicit {
        let arg = &args[&name];
        if let Some(short) = &arg.short_option {
            if let Some(owner) = used.get(short) {
                return Err(ConfigError::DuplicateOption {
                    command: command.to_string(),
                    option: short.clone(),
                    first: owner.clone(),
                    second: name.clone(),
                });
            }
            used.insert(short.clone(), name.clone());
        }
    }

    for name in automatic {
        if let Some(short) = pick_short_option(&name, &used) {
            used.insert(short.clone(), name.clone());
            if let Some(arg) = args.get_mut(&name) {
                arg.short_option = Some(short);
            }
        }
    }

    for arg in args.values_mut().filter(|a| a.is_optional()) {
        if arg.long_option.is_none() {
            arg.long_option = Some(format!("--{}", arg.name));
        }
        let negatable = (arg.is_bool() || arg.is_bool_or()) && !arg.is_synthetic_help();
        if arg.inverse_option.is_none() && negatable {
            arg.inverse_option = Some(inverse_option(&arg.name));
        }
    }

    Ok(())
}

fn pick_short_option(name: &str, used: &HashMap<String, String>) -> Option<String> {
    let first = name.chars().next()?;
    let upper = first.to_uppercase().next().unwrap_or(first);

    let candidates: Vec<char> = if name == HELP {
        vec!['h']
    } else if first == 'h' {
        vec!['H']
    } else if upper == first {
        vec![first]
    } else {
        vec![first, upper]
    };

    candidates
        .into_iter()
        .map(|c| format!("-{c}"))
        .find(|option| used.get(option).map_or(true, |owner| owner == name))
}

fn inverse_option(name: &str) -> String {
    match name {
        "yes" => "--no".to_string(),
        "no" => "--yes".to_string(),
        _ => format!("--no-{name}"),
    }
}

/// Build the option string -> arg name map, rejecting collisions
pub fn option_map(command: &str, args: &ArgMap) -> ConfigResult<IndexMap<String, String>> {
    let mut map: IndexMap<String, String> = IndexMap::new();
    for arg in args.values() {
        for option in arg.option_strings() {
            if let Some(owner) = map.get(option) {
                if owner != &arg.name {
                    return Err(ConfigError::DuplicateOption {
                        command: command.to_string(),
                        option: option.to_string(),
                        first: owner.clone(),
                        second: arg.name.clone(),
                    });
                }
            }
            map.insert(option.to_string(), arg.name.clone());
        }
    }
    Ok(map)
}
