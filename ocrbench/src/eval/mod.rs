//! Evaluation and comparison of OCR outputs.
//!
//! # Overview
//!
//! - **Text mode**: CER, WER, NED, character precision/recall, bag-of-words
//!   F1 and exact match per document ([`TextEvaluator`]).
//! - **Schema mode**: per-field scores dispatched by the schema's evaluation
//!   kind, combined into a weighted score ([`SchemaEvaluator`]).
//! - **Comparison**: bootstrap intervals, paired t / Wilcoxon tests and a
//!   winner per model pair ([`compare_reports`], [`batch_compare`]).
//! - **Agreement**: Cohen's kappa between two annotators ([`cohens_kappa`]).
//!
//! # Text evaluation
//!
//! ```
//! use ocrbench::eval::evaluate;
//! use ocrbench::{GroundTruthRecord, PredictionRecord};
//!
//! let gt = vec![GroundTruthRecord::text_only("a.png", "Hello World")];
//! let preds = vec![PredictionRecord::text("a.png", "hello world")];
//!
//! let report = evaluate(&gt, &preds, None);
//! assert_eq!(report.sample_count, 1);
//! assert_eq!(report.average("cer"), Some(0.0));
//! ```
//!
//! # Metrics
//!
//! | Metric | Direction | Range |
//! |--------|-----------|-------|
//! | `cer`, `wer` | lower is better | ≥ 0 (can exceed 1) |
//! | `ned` | lower is better | [0, 1] |
//! | `precision`, `recall`, `bow_f1` | higher is better | [0, 1] |
//! | `exact_match` | higher is better | {0, 1} |
//! | `weighted_score` | higher is better | [0, 1] |

pub mod accumulator;
pub mod agreement;
pub mod compare;
pub mod evaluator;
pub mod fields;
pub mod significance;
pub mod stats;

pub use accumulator::{FieldCounts, FieldErrors};
pub use agreement::{cohens_kappa, AgreementLevel, KappaResult};
pub use compare::{
    batch_compare, cohens_d_independent, compare_reports, determine_winner, interpret_effect_size,
    is_lower_better, Comparison, ComparisonConfig, ComparisonOutcome, ModelSummary,
    PairwiseComparison, Winner,
};
pub use evaluator::{evaluate, SchemaEvaluator, TextEvaluator, TEXT_METRICS, WEIGHTED_SCORE};
pub use fields::{FieldScorer, YesNo};
pub use significance::{
    interpret_p_value, paired_t_test, run_test, wilcoxon_signed_rank, SignificanceTest, TestKind,
};
pub use stats::{bootstrap_ci, bootstrap_ci_with, BootstrapConfig, ConfidenceInterval};
