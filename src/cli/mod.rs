//! Command-line surface derived from arg descriptors
//!
//! This module builds per-command parsers, expands grouped short flags and
//! splits runner options from chained command invocations.

pub mod expand;
pub mod parser;
pub mod partition;

pub use expand::expand_short_flags;
pub use parser::{build_parser, collect_values};
pub use partition::{partition_argv, Partition};
