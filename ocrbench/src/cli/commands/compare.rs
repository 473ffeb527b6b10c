//! Compare command - Statistically compare two reports

use clap::Parser;

use super::super::output::{to_json, write_output};
use super::super::parser::{ComparisonOptions, OutputFormat};
use super::super::utils::{load_comparison_config, load_report, model_id_for};

use crate::eval::compare::compare_reports;
use crate::eval::ComparisonConfig;

/// Statistically compare two reports
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// First report (JSON)
    #[arg(value_name = "REPORT1")]
    pub report1: String,

    /// Second report (JSON)
    #[arg(value_name = "REPORT2")]
    pub report2: String,

    #[command(flatten)]
    pub options: ComparisonOptions,
}

/// Resolve the comparison settings from `--config` plus flag overrides.
pub(crate) fn resolve_config(options: &ComparisonOptions) -> Result<ComparisonConfig, String> {
    let base = load_comparison_config(options.config.as_deref())?;
    let config = options.apply(base);
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Run the compare command
pub fn run(args: CompareArgs) -> Result<(), String> {
    let config = resolve_config(&args.options)?;

    let mut report1 = load_report(&args.report1)?;
    let mut report2 = load_report(&args.report2)?;
    report1.model_id = Some(model_id_for(&args.report1, &report1));
    report2.model_id = Some(model_id_for(&args.report2, &report2));

    let outcome = compare_reports(&report1, &report2, &config).map_err(|e| e.to_string())?;

    let content = match args.options.format {
        OutputFormat::Json => to_json(&outcome)?,
        OutputFormat::Human => format!("{}\n", outcome),
    };
    write_output(&content, args.options.output.as_deref())
}
