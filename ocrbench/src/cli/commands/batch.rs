//! Batch command - Compare every pair of reports

use clap::Parser;
use std::collections::BTreeMap;

use super::super::output::{color, to_json, write_output};
use super::super::parser::{ComparisonOptions, OutputFormat};
use super::super::utils::{load_report, model_id_for};
use super::compare::resolve_config;

use crate::eval::compare::{batch_compare, ComparisonOutcome, Winner};
use crate::Report;

/// Compare every pair of reports
#[derive(Parser, Debug)]
pub struct BatchArgs {
    /// Report files (JSON); at least two
    #[arg(value_name = "REPORTS", num_args = 2.., required = true)]
    pub reports: Vec<String>,

    #[command(flatten)]
    pub options: ComparisonOptions,
}

/// Run the batch command
pub fn run(args: BatchArgs) -> Result<(), String> {
    let config = resolve_config(&args.options)?;

    let mut reports: BTreeMap<String, Report> = BTreeMap::new();
    let mut sources: BTreeMap<String, &str> = BTreeMap::new();
    for path in &args.reports {
        let report = load_report(path)?;
        let id = model_id_for(path, &report);
        if let Some(previous) = sources.insert(id.clone(), path) {
            return Err(format!(
                "Duplicate model id '{}' ({} and {})",
                id, previous, path
            ));
        }
        reports.insert(id, report);
    }

    let results = batch_compare(&reports, &config).map_err(|e| e.to_string())?;

    let content = match args.options.format {
        OutputFormat::Json => to_json(&results)?,
        OutputFormat::Human => {
            let mut out = String::new();
            for pair in &results {
                out.push_str(&color(
                    "1",
                    &format!("=== {} vs {} ===", pair.model1, pair.model2),
                ));
                out.push('\n');
                out.push_str(&pair.outcome.to_string());
                out.push_str("\n\n");
            }
            out.push_str(&format!("Summary ({}):\n", config.metric));
            for pair in &results {
                let verdict = match &pair.outcome {
                    ComparisonOutcome::Compared(c) => match c.winner {
                        Winner::Model1 => color("32", &pair.model1),
                        Winner::Model2 => color("32", &pair.model2),
                        Winner::NoSignificantDifference => c.winner.to_string(),
                    },
                    ComparisonOutcome::NoCommonSamples { .. } => color("33", "no common samples"),
                };
                out.push_str(&format!("  {} vs {}: {}\n", pair.model1, pair.model2, verdict));
            }
            out
        }
    };
    write_output(&content, args.options.output.as_deref())
}
