//! CLI module for the ocrbench binary
//!
//! Argument parsing and command routing. Individual command implementations
//! are in the `commands` submodule.

pub mod commands;
pub mod output;
pub mod parser;
pub mod utils;

pub use output::*;
pub use parser::*;
pub use utils::*;
