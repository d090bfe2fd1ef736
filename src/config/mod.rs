//! Configuration loading
//!
//! This module finds and parses runkit.yml files and exposes configuration
//! as dotted names, the form command default overrides are read from.

pub mod parse;
pub mod source;
pub mod types;

// Re-export main types
pub use parse::*;
pub use source::*;
pub use types::*;
