//! CLI interface module
//!
//! This module contains all command-line interface components including:
//! - Command definitions and handlers
//! - Terminal output formatting (tables, trees, progress bars)

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};
