//! Output formatting utilities for CLI commands

use is_terminal::IsTerminal;
use std::io::{self, Write};

use serde::Serialize;

use crate::eval::compare::is_lower_better;

/// Progress line on stderr, so stdout stays clean for reports.
pub fn log_info(msg: &str, quiet: bool) {
    if quiet {
        return;
    }
    eprintln!("{}", msg);
}

/// Emit a rendered report or comparison.
///
/// With `path` the text replaces that file; otherwise it goes to stdout.
pub fn write_output(rendered: &str, path: Option<&str>) -> Result<(), String> {
    match path {
        Some(target) => std::fs::write(target, rendered)
            .map_err(|e| format!("Cannot write {}: {}", target, e)),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| format!("Cannot write to stdout: {}", e))
        }
    }
}

/// Pretty JSON with a trailing newline
pub fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value)
        .map(|s| s + "\n")
        .map_err(|e| format!("Failed to serialize output: {}", e))
}

/// Colorize text with ANSI escape codes (only if stdout is a terminal)
pub fn color(code: &str, text: &str) -> String {
    if io::stdout().is_terminal() {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Format a [0, 1] metric with color by quality (direction-aware)
pub fn metric_colored(metric: &str, value: f64) -> String {
    let quality = if is_lower_better(metric) {
        1.0 - value
    } else {
        value
    };
    let code = if quality >= 0.9 {
        "1;32"
    } else if quality >= 0.7 {
        "1;33"
    } else if quality >= 0.5 {
        "33"
    } else {
        "1;31"
    };
    color(code, &format!("{:.4}", value))
}
