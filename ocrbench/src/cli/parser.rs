//! CLI argument parsing and structure definitions

use clap::{Args, Parser, Subcommand, ValueEnum};

use super::commands;
use crate::eval::significance::TestKind;
use crate::eval::ComparisonConfig;

/// OCR evaluation CLI - metrics, schema scoring, model comparison
#[derive(Parser)]
#[command(name = "ocrbench")]
#[command(
    author,
    version,
    about = "OCR evaluation CLI - metrics, schema scoring, model comparison",
    long_about = r#"
ocrbench - evaluate and compare OCR / document-understanding outputs

MODES:
  text    - CER, WER, NED, char precision/recall, bag-of-words F1, exact match
  schema  - per-field accuracy / entity F1 / pairing / exact match, weighted

COMPARISON:
  bootstrap 95% intervals, paired t-test or Wilcoxon signed-rank, winner

EXAMPLES:
  ocrbench eval --gt gt.json --pred preds_v1_qwen.json
  ocrbench eval --gt gt.json --pred preds_v2_qwen.json --schema medical_form.yaml
  ocrbench reports --gt gt.json --results-dir results --mode v2
  ocrbench compare report_v2_a.json report_v2_b.json --test wilcoxon --seed 42
  ocrbench batch results/report_v1_*.json --metric cer
"#
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate one prediction file against ground truth
    #[command(visible_alias = "e")]
    Eval(commands::EvalArgs),

    /// Evaluate every prediction file in a results directory
    #[command(visible_alias = "r")]
    Reports(commands::ReportsArgs),

    /// Statistically compare two reports
    #[command(visible_alias = "c")]
    Compare(commands::CompareArgs),

    /// Compare every pair of reports
    #[command(visible_alias = "b")]
    Batch(commands::BatchArgs),

    /// Cohen's kappa between two annotators
    Kappa(commands::KappaArgs),

    /// Load and validate a schema, printing resolved weights
    Schema(commands::SchemaArgs),
}

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary (default)
    #[default]
    Human,
    /// Pretty-printed JSON
    Json,
}

/// Significance test selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatTest {
    /// Paired Student t-test
    #[value(name = "t-test", alias = "ttest")]
    TTest,
    /// Wilcoxon signed-rank test
    Wilcoxon,
}

impl From<StatTest> for TestKind {
    fn from(test: StatTest) -> Self {
        match test {
            StatTest::TTest => TestKind::PairedT,
            StatTest::Wilcoxon => TestKind::Wilcoxon,
        }
    }
}

/// Prediction file generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportMode {
    /// Free-text transcription (text metrics)
    V1,
    /// Structured extraction (schema metrics)
    V2,
}

impl ReportMode {
    /// File-name tag, e.g. `preds_v1_<model>.json`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

/// Comparison options shared by `compare` and `batch`
#[derive(Args, Debug, Clone, Default)]
pub struct ComparisonOptions {
    /// Per-document metric to compare [default: weighted_score]
    #[arg(short, long, value_name = "METRIC")]
    pub metric: Option<String>,

    /// Significance test [default: t-test]
    #[arg(short, long, value_enum)]
    pub test: Option<StatTest>,

    /// Bootstrap resamples [default: 10000]
    #[arg(long, value_name = "N")]
    pub bootstrap: Option<usize>,

    /// Seed for reproducible intervals
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Significance level [default: 0.05]
    #[arg(long, value_name = "ALPHA")]
    pub alpha: Option<f64>,

    /// TOML file with comparison settings (flags override it)
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Write output to file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<String>,
}

impl ComparisonOptions {
    /// Apply command-line overrides on top of `base`.
    pub fn apply(&self, mut base: ComparisonConfig) -> ComparisonConfig {
        if let Some(metric) = &self.metric {
            base.metric = metric.clone();
        }
        if let Some(test) = self.test {
            base.test = test.into();
        }
        if let Some(n) = self.bootstrap {
            base.bootstrap.n_resamples = n;
        }
        if let Some(seed) = self.seed {
            base.bootstrap.seed = Some(seed);
        }
        if let Some(alpha) = self.alpha {
            base.alpha = alpha;
        }
        base
    }
}
