//! # ocrbench
//!
//! Evaluation and statistical comparison of OCR and document-understanding
//! model outputs.
//!
//! - **Text mode**: CER, WER, NED, character precision/recall, bag-of-words F1
//! - **Schema mode**: per-field accuracy, entity F1, free-text pairing and
//!   exact match, combined with schema weights
//! - **Comparison**: bootstrap confidence intervals, paired t-test, Wilcoxon
//!   signed-rank, winner selection, Cohen's kappa
//!
//! ## Quick Start
//!
//! ```rust
//! use ocrbench::{evaluate, GroundTruthRecord, PredictionRecord, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::medical_form().unwrap();
//! let fields = json!({"disease_status": {"心脏病": "Y", "高血压": "N"}});
//! let gt = vec![GroundTruthRecord::structured(
//!     "form_001.png",
//!     fields.as_object().unwrap().clone(),
//! )];
//! let preds = vec![PredictionRecord::text(
//!     "form_001.png",
//!     "```json\n{\"disease_status\": {\"1. Heart Disease\": \"YES\", \"Hypertension\": \"no\"}}\n```",
//! )];
//!
//! let report = evaluate(&gt, &preds, Some(&schema));
//! assert_eq!(report.details[0].score("disease_status"), Some(1.0));
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`normalize`] | NFKC, noise phrases, checkbox glyphs, punctuation, whitespace |
//! | [`similarity`] | Edit distance, matching blocks, bag-of-words and entity F1 |
//! | [`matcher`] | Fuzzy label lookup (synonyms, enumeration, containment) |
//! | [`eval`] | Evaluators, significance tests, comparison, agreement |
//! | [`lang`] | CJK detection and tokenization |
//!
//! ## Feature Flags
//!
//! - `parallel` (default): batch comparisons on the rayon pool
//! - `cli`: the command-line front end used by `ocrbench-cli`

#![warn(missing_docs)]

pub mod eval;
pub mod lang;
pub mod matcher;
pub mod normalize;
pub mod similarity;

#[cfg(feature = "cli")]
pub mod cli;

pub use ocrbench_core::{
    parse_structured, strip_code_fence, DatasetSplits, Evaluation, FieldAnalysis, FieldKind,
    FieldSpec, GroundTruthRecord, Prediction, PredictionRecord, Report, SampleResult, Schema,
};
pub use ocrbench_core::{Error, Result};

pub use eval::{compare_reports, evaluate, ComparisonConfig, ComparisonOutcome};
