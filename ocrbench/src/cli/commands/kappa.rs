//! Kappa command - Inter-annotator agreement

use clap::Parser;
use serde_json::Value;

use super::super::output::{to_json, write_output};
use super::super::parser::OutputFormat;
use super::super::utils::load_json;

use crate::eval::agreement::cohens_kappa;
use crate::eval::fields::value_text;

/// Cohen's kappa between two annotators
#[derive(Parser, Debug)]
pub struct KappaArgs {
    /// First annotator's labels (JSON array)
    #[arg(value_name = "ANNOTATOR1")]
    pub annotator1: String,

    /// Second annotator's labels (JSON array, same order)
    #[arg(value_name = "ANNOTATOR2")]
    pub annotator2: String,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

fn load_labels(path: &str) -> Result<Vec<String>, String> {
    let labels: Vec<Value> = load_json(path)?;
    Ok(labels.iter().map(value_text).collect())
}

/// Run the kappa command
pub fn run(args: KappaArgs) -> Result<(), String> {
    let a = load_labels(&args.annotator1)?;
    let b = load_labels(&args.annotator2)?;
    let result = cohens_kappa(&a, &b).map_err(|e| e.to_string())?;

    let content = match args.format {
        OutputFormat::Json => to_json(&result)?,
        OutputFormat::Human => format!("Cohen's {}\n", result),
    };
    write_output(&content, None)
}
