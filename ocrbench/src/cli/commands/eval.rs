//! Eval command - Score one prediction file against ground truth

use clap::Parser;

use super::super::output::{log_info, to_json, write_output};
use super::super::parser::OutputFormat;
use super::super::utils::{format_error, load_ground_truth, load_predictions, load_schema};

use crate::eval::{SchemaEvaluator, TextEvaluator};
use crate::{DatasetSplits, Report};

/// Score one prediction file against ground truth
#[derive(Parser, Debug)]
pub struct EvalArgs {
    /// Ground-truth records (JSON array or JSONL)
    #[arg(long, value_name = "PATH")]
    pub gt: String,

    /// Prediction records (JSON array or JSONL)
    #[arg(long, value_name = "PATH")]
    pub pred: String,

    /// Schema for structured scoring (YAML or JSON); text mode without it
    #[arg(long, value_name = "PATH")]
    pub schema: Option<String>,

    /// Compare raw text without normalization (text mode only)
    #[arg(long)]
    pub no_normalize: bool,

    /// Dataset split file mapping split names to file names
    #[arg(long, value_name = "PATH", requires = "split_name")]
    pub split: Option<String>,

    /// Split to evaluate on
    #[arg(long, value_name = "NAME", requires = "split")]
    pub split_name: Option<String>,

    /// Model id recorded in the report
    #[arg(long, value_name = "ID")]
    pub model_id: Option<String>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress progress messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Run the eval command
pub fn run(args: EvalArgs) -> Result<(), String> {
    let mut ground_truth = load_ground_truth(&args.gt)?;
    let predictions = load_predictions(&args.pred)?;

    if let (Some(split_path), Some(split_name)) = (&args.split, &args.split_name) {
        let splits = DatasetSplits::from_path(split_path)
            .map_err(|e| format_error("load splits", &format!("{}: {}", split_path, e)))?;
        if splits.get(split_name).is_none() {
            let known: Vec<&str> = splits.names().collect();
            return Err(format!(
                "Split '{}' not found or empty in {} (available: {})",
                split_name,
                split_path,
                known.join(", ")
            ));
        }
        let before = ground_truth.len();
        ground_truth = splits.filter_ground_truth(ground_truth, split_name);
        log_info(
            &format!(
                "Split '{}': {} of {} ground-truth records",
                split_name,
                ground_truth.len(),
                before
            ),
            args.quiet,
        );
    }

    let mut report: Report = match &args.schema {
        Some(path) => {
            let schema = load_schema(path)?;
            SchemaEvaluator::new(schema).evaluate(&ground_truth, &predictions)
        }
        None => TextEvaluator::new()
            .with_normalization(!args.no_normalize)
            .evaluate(&ground_truth, &predictions),
    };
    if let Some(id) = args.model_id {
        report.model_id = Some(id);
    }

    log_info(
        &format!(
            "Scored {} of {} predictions",
            report.sample_count,
            predictions.len()
        ),
        args.quiet,
    );

    let content = match args.format {
        OutputFormat::Json => to_json(&report)?,
        OutputFormat::Human => format!("{}\n", report),
    };
    write_output(&content, args.output.as_deref())
}
