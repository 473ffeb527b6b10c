//! Reports command - Evaluate every prediction file in a results directory
//!
//! Looks for `preds_<mode>_<model>.json` and writes
//! `report_<mode>_<model>.json` next to it.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use super::super::output::{color, log_info, metric_colored, to_json};
use super::super::parser::ReportMode;
use super::super::utils::{
    format_error, load_ground_truth, load_predictions, load_schema, log_success,
};

use crate::eval::{SchemaEvaluator, TextEvaluator, WEIGHTED_SCORE};
use crate::{Report, Schema};

/// Evaluate every prediction file in a results directory
#[derive(Parser, Debug)]
pub struct ReportsArgs {
    /// Ground-truth records (JSON array or JSONL)
    #[arg(long, value_name = "PATH")]
    pub gt: String,

    /// Directory holding preds_<mode>_<model>.json files
    #[arg(long, value_name = "DIR")]
    pub results_dir: String,

    /// Which prediction files to evaluate
    #[arg(long, value_enum)]
    pub mode: ReportMode,

    /// Schema for v2 files [default: built-in medical form]
    #[arg(long, value_name = "PATH")]
    pub schema: Option<String>,

    /// Re-evaluate even when a report already exists
    #[arg(long)]
    pub force: bool,

    /// Suppress progress messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Prediction files for `mode` in `dir`, sorted, with their model ids.
fn prediction_files(dir: &Path, mode: ReportMode) -> Result<Vec<(String, PathBuf)>, String> {
    let prefix = format!("preds_{}_", mode.tag());
    let entries = fs::read_dir(dir)
        .map_err(|e| format_error("read directory", &format!("{}: {}", dir.display(), e)))?;
    let mut files: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let id = name.strip_prefix(&prefix)?.strip_suffix(".json")?;
            (!id.is_empty()).then(|| (id.to_string(), entry.path()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Run the reports command
pub fn run(args: ReportsArgs) -> Result<(), String> {
    let dir = Path::new(&args.results_dir);
    let files = prediction_files(dir, args.mode)?;
    if files.is_empty() {
        return Err(format!(
            "No preds_{}_*.json files found in {}",
            args.mode.tag(),
            args.results_dir
        ));
    }

    let ground_truth = load_ground_truth(&args.gt)?;
    let schema: Option<Schema> = match (args.mode, &args.schema) {
        (ReportMode::V1, _) => None,
        (ReportMode::V2, Some(path)) => Some(load_schema(path)?),
        (ReportMode::V2, None) => Some(
            Schema::medical_form().map_err(|e| format_error("load built-in schema", &e.to_string()))?,
        ),
    };
    let headline = if schema.is_some() { WEIGHTED_SCORE } else { "cer" };

    let mut written = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    let mut summary: Vec<(String, Option<f64>)> = Vec::new();

    for (model_id, pred_path) in &files {
        let out_path = dir.join(format!("report_{}_{}.json", args.mode.tag(), model_id));
        if out_path.exists() && !args.force {
            log_info(
                &format!("Skipping {} (report exists, use --force)", model_id),
                args.quiet,
            );
            skipped += 1;
            continue;
        }

        let pred_str = pred_path.to_string_lossy();
        let predictions = match load_predictions(&pred_str) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("{} {}", color("33", "warning:"), e);
                failed += 1;
                continue;
            }
        };

        let mut report: Report = match &schema {
            Some(schema) => SchemaEvaluator::new(schema.clone()).evaluate(&ground_truth, &predictions),
            None => TextEvaluator::new().evaluate(&ground_truth, &predictions),
        };
        if report.model_id.is_none() {
            report.model_id = Some(model_id.clone());
        }

        fs::write(&out_path, to_json(&report)?)
            .map_err(|e| format!("Failed to write to {}: {}", out_path.display(), e))?;
        log_success(
            &format!(
                "Wrote {} ({} samples)",
                out_path.display(),
                report.sample_count
            ),
            args.quiet,
        );
        summary.push((model_id.clone(), report.average(headline)));
        written += 1;
    }

    if !summary.is_empty() {
        println!("{:<32} {}", "Model", headline);
        println!("{}", "-".repeat(44));
        for (model_id, value) in &summary {
            let shown = value
                .map(|v| metric_colored(headline, v))
                .unwrap_or_else(|| "-".to_string());
            println!("{:<32} {}", model_id, shown);
        }
    }
    log_info(
        &format!(
            "{} written, {} skipped, {} failed",
            written, skipped, failed
        ),
        args.quiet,
    );
    Ok(())
}
