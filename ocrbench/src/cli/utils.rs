//! Utility functions for CLI commands

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::eval::ComparisonConfig;
use crate::{GroundTruthRecord, PredictionRecord, Report, Schema};

/// Format error message consistently
pub fn format_error(operation: &str, details: &str) -> String {
    format!("Failed to {}: {}", operation, details)
}

/// Read a file with consistent error handling
pub fn read_input_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format_error("read file", &format!("{}: {}", path, e)))
}

/// Parse a JSON file into `T`
pub fn load_json<T: DeserializeOwned>(path: &str) -> Result<T, String> {
    let content = read_input_file(path)?;
    serde_json::from_str(&content)
        .map_err(|e| format_error("parse JSON", &format!("{}: {}", path, e)))
}

/// Parse records from a JSON array, or one object per line for `.jsonl`
pub fn load_records<T: DeserializeOwned>(path: &str) -> Result<Vec<T>, String> {
    if !path.ends_with(".jsonl") {
        return load_json(path);
    }
    let content = read_input_file(path)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| format_error("parse JSONL", &format!("{}:{}: {}", path, i + 1, e)))
        })
        .collect()
}

/// Load ground-truth records
pub fn load_ground_truth(path: &str) -> Result<Vec<GroundTruthRecord>, String> {
    load_records(path)
}

/// Load prediction records
pub fn load_predictions(path: &str) -> Result<Vec<PredictionRecord>, String> {
    load_records(path)
}

/// Load a saved evaluation report
pub fn load_report(path: &str) -> Result<Report, String> {
    load_json(path)
}

/// Load and validate a schema (YAML, or JSON by extension)
pub fn load_schema(path: &str) -> Result<Schema, String> {
    Schema::from_path(path).map_err(|e| format_error("load schema", &format!("{}: {}", path, e)))
}

/// Load comparison settings from a TOML file, or the defaults
pub fn load_comparison_config(path: Option<&str>) -> Result<ComparisonConfig, String> {
    let Some(path) = path else {
        return Ok(ComparisonConfig::default());
    };
    let content = read_input_file(path)?;
    toml::from_str(&content).map_err(|e| format_error("parse config", &format!("{}: {}", path, e)))
}

/// Model id for a report file: its `model_id`, else the file stem without
/// any `report_<mode>_` prefix
pub fn model_id_for(path: &str, report: &Report) -> String {
    if let Some(id) = report.model_id.as_deref().filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path);
    let Some(rest) = stem.strip_prefix("report_") else {
        return stem.to_string();
    };
    match rest.split_once('_') {
        Some((_mode, id)) if !id.is_empty() => id.to_string(),
        _ => rest.to_string(),
    }
}

/// Log success message with color (respects quiet flag)
pub fn log_success(msg: &str, quiet: bool) {
    if !quiet {
        use super::output::color;
        eprintln!("{} {}", color("32", "✓"), msg);
    }
}
