//! CLI output formatting module
//!
//! Provides various output formatters for terminal display, plus the
//! human/JSON dispatch every command handler renders its result through.

pub mod progress;
pub mod table;
pub mod tree;

use serde::Serialize;

pub use table::TableFormatter;

/// Implemented by every command's output payload so `output()` can render
/// either a human-readable summary or the raw JSON value.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

/// Dispatch output based on the `--json` flag.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}
