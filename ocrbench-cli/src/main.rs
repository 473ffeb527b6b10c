//! ocrbench - OCR evaluation CLI
//!
//! Scores OCR and document-understanding predictions against ground truth and
//! compares models statistically.
//!
//! # Usage
//!
//! ```bash
//! # Text metrics (CER, WER, NED, ...)
//! ocrbench eval --gt gt.json --pred preds_v1_qwen.json
//!
//! # Schema-driven structured scoring
//! ocrbench eval --gt gt.json --pred preds_v2_qwen.json --schema medical_form.yaml
//!
//! # Evaluate a whole results directory
//! ocrbench reports --gt gt.json --results-dir results --mode v2
//!
//! # Compare two models
//! ocrbench compare results/report_v2_a.json results/report_v2_b.json --seed 42
//! ```

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    use ocrbench::cli::commands::*;
    use ocrbench::cli::output::color;
    use ocrbench::cli::parser::{Cli, Commands};

    let cli = Cli::parse();

    let result: Result<(), String> = match cli.command {
        Commands::Eval(args) => eval::run(args),
        Commands::Reports(args) => reports::run(args),
        Commands::Compare(args) => compare::run(args),
        Commands::Batch(args) => batch::run(args),
        Commands::Kappa(args) => kappa::run(args),
        Commands::Schema(args) => schema::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", color("31", "error:"), e);
            ExitCode::FAILURE
        }
    }
}
