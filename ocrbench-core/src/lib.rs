//! # ocrbench-core
//!
//! Core types for the ocrbench toolbox: the data model shared by the
//! evaluation engine and the command-line front end.
//!
//! This crate provides:
//! - **Records**: `GroundTruthRecord`, `PredictionRecord`, `Prediction`
//! - **Schemas**: `Schema`, `FieldSpec`, `FieldKind`, `Evaluation`
//! - **Reports**: `Report`, `SampleResult`, `FieldAnalysis`
//! - **Splits**: `DatasetSplits` for restricting evaluation to a named subset
//!
//! Nothing here evaluates anything. Scoring lives in the `ocrbench` crate.

pub mod error;
pub mod record;
pub mod report;
pub mod schema;
pub mod split;

pub use error::{Error, Result};
pub use record::{parse_structured, strip_code_fence, GroundTruthRecord, Prediction, PredictionRecord};
pub use report::{FieldAnalysis, Report, SampleResult};
pub use schema::{Evaluation, FieldKind, FieldSpec, Schema};
pub use split::DatasetSplits;
