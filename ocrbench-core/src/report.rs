//! Evaluation reports.
//!
//! The serialized layout is flat, matching what downstream tooling reads:
//!
//! ```json
//! {
//!   "sample_count": 2,
//!   "avg_cer": 0.05,
//!   "avg_wer": 0.1,
//!   "details": [{"file_name": "a.png", "cer": 0.1, "wer": 0.2}]
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Prefix of every averaged metric key.
pub const AVG_PREFIX: &str = "avg_";

/// Older reports spelled averages `average_<metric>`.
const LEGACY_AVG_PREFIX: &str = "average_";

/// Older text reports stored the exact-match rate under this key.
const LEGACY_EXACT_MATCH_KEY: &str = "exact_match_accuracy";

/// Metric name behind an averages key, for current and legacy spellings.
fn metric_of_key(key: &str) -> Option<&str> {
    if key == LEGACY_EXACT_MATCH_KEY {
        return Some("exact_match");
    }
    key.strip_prefix(AVG_PREFIX)
        .or_else(|| key.strip_prefix(LEGACY_AVG_PREFIX))
}

/// Read a map of scalars, accepting booleans (as 1.0/0.0) and ignoring
/// anything that is not a number.
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(k, v)| {
            let score = match v {
                Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
                Value::Number(n) => n.as_f64(),
                _ => None,
            };
            score.map(|s| (k, s))
        })
        .collect())
}

/// Per-document scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleResult {
    /// Document identifier.
    pub file_name: String,
    /// One scalar per metric or field name.
    #[serde(flatten, deserialize_with = "scalar_map")]
    pub scores: BTreeMap<String, f64>,
    /// Schema-weighted combination of field scores (structured mode only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_score: Option<f64>,
}

impl SampleResult {
    /// Empty result for a document.
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            scores: BTreeMap::new(),
            weighted_score: None,
        }
    }

    /// Score for a metric; `weighted_score` is addressable by name.
    #[must_use]
    pub fn score(&self, metric: &str) -> Option<f64> {
        if metric == "weighted_score" {
            return self.weighted_score.or_else(|| self.scores.get(metric).copied());
        }
        self.scores.get(metric).copied()
    }
}

/// Run-level breakdown for one schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldAnalysis {
    /// Counts for entity-F1 fields.
    Entity {
        /// tp / (tp + fp)
        precision: f64,
        /// tp / (tp + fn)
        recall: f64,
        /// Harmonic mean of precision and recall.
        f1: f64,
        /// Matched ground-truth entities.
        #[serde(rename = "tp")]
        true_positives: usize,
        /// Predicted entities matching nothing.
        #[serde(rename = "fp")]
        false_positives: usize,
        /// Ground-truth entities left unmatched.
        #[serde(rename = "fn")]
        false_negatives: usize,
    },
    /// Counts for accuracy, pairing and exact-match fields.
    Accuracy {
        /// correct / total
        accuracy: f64,
        /// Matching labels.
        correct: usize,
        /// Ground-truth labels seen.
        total: usize,
    },
}

impl FieldAnalysis {
    /// The headline number: F1 or accuracy.
    #[must_use]
    pub fn headline(&self) -> f64 {
        match self {
            Self::Entity { f1, .. } => *f1,
            Self::Accuracy { accuracy, .. } => *accuracy,
        }
    }
}

impl fmt::Display for FieldAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity {
                precision,
                recall,
                f1,
                true_positives,
                false_positives,
                false_negatives,
            } => write!(
                f,
                "P={:.4} R={:.4} F1={:.4} (tp={}, fp={}, fn={})",
                precision, recall, f1, true_positives, false_positives, false_negatives
            ),
            Self::Accuracy {
                accuracy,
                correct,
                total,
            } => write!(f, "accuracy={:.4} ({}/{})", accuracy, correct, total),
        }
    }
}

/// Result of evaluating one prediction set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Model that produced the predictions, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// Schema used for structured evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    /// Number of scored documents.
    #[serde(default)]
    pub sample_count: usize,
    /// Averages keyed `avg_<metric>`.
    #[serde(flatten, deserialize_with = "scalar_map")]
    pub averages: BTreeMap<String, f64>,
    /// Per-document scores in scoring order.
    #[serde(default)]
    pub details: Vec<SampleResult>,
    /// Per-field run counts (structured mode).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_analysis: BTreeMap<String, FieldAnalysis>,
    /// Normalized schema weights (structured mode).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub weights: BTreeMap<String, f64>,
}

impl Report {
    /// Average of a metric, accepting `cer`, `avg_cer` or legacy `average_cer`.
    ///
    /// `exact_match` also resolves the legacy `exact_match_accuracy` key.
    #[must_use]
    pub fn average(&self, metric: &str) -> Option<f64> {
        let bare = metric.strip_prefix(AVG_PREFIX).unwrap_or(metric);
        self.averages
            .get(&format!("{}{}", AVG_PREFIX, bare))
            .or_else(|| {
                self.averages
                    .iter()
                    .find(|(key, _)| metric_of_key(key) == Some(bare))
                    .map(|(_, value)| value)
            })
            .copied()
    }

    /// Per-document values of one metric.
    #[must_use]
    pub fn metric_by_file(&self, metric: &str) -> BTreeMap<&str, Option<f64>> {
        self.details
            .iter()
            .map(|d| (d.file_name.as_str(), d.score(metric)))
            .collect()
    }

    /// Whether this report came from a schema-driven run.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        self.schema_name.is_some() || !self.weights.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        match (&self.model_id, &self.schema_name) {
            (Some(model), Some(schema)) => writeln!(f, "REPORT: {} (schema: {})", model, schema)?,
            (Some(model), None) => writeln!(f, "REPORT: {}", model)?,
            (None, Some(schema)) => writeln!(f, "REPORT (schema: {})", schema)?,
            (None, None) => writeln!(f, "REPORT")?,
        }
        writeln!(f, "{}", rule)?;
        writeln!(f, "Samples: {}", self.sample_count)?;
        if let Some(score) = self.average("weighted_score") {
            writeln!(f, "Overall Weighted Score: {:.4}", score)?;
        }
        writeln!(f, "{}", "-".repeat(60))?;
        for (key, value) in &self.averages {
            if key == "avg_weighted_score" {
                continue;
            }
            let name = metric_of_key(key).unwrap_or(key);
            writeln!(f, "{:>24}: {:.4}", name, value)?;
        }
        if !self.field_analysis.is_empty() {
            writeln!(f, "{}", "-".repeat(60))?;
            for (field, analysis) in &self.field_analysis {
                let weight = self.weights.get(field).copied().unwrap_or(0.0);
                writeln!(f, "{:>24}: {} [w={:.3}]", field, analysis, weight)?;
            }
        }
        write!(f, "{}", rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sample_result_flat_layout() {
        let mut s = SampleResult::new("a.png");
        s.scores.insert("cer".into(), 0.25);
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v, json!({"file_name": "a.png", "cer": 0.25}));
    }

    #[test]
    fn test_sample_result_reads_legacy_bools() {
        let s: SampleResult = serde_json::from_value(
            json!({"file_name": "a", "exact_match": true, "cer": 0.0, "note": "x", "weighted_score": 0.5}),
        )
        .unwrap();
        assert_eq!(s.score("exact_match"), Some(1.0));
        assert_eq!(s.score("cer"), Some(0.0));
        assert_eq!(s.score("note"), None);
        assert_eq!(s.score("weighted_score"), Some(0.5));
    }

    #[test]
    fn test_report_average_lookup() {
        let report: Report = serde_json::from_value(json!({
            "sample_count": 1,
            "average_cer": 0.2,
            "avg_wer": 0.3,
            "exact_match_accuracy": 1.0,
            "details": []
        }))
        .unwrap();
        assert_eq!(report.average("cer"), Some(0.2));
        assert_eq!(report.average("avg_wer"), Some(0.3));
        assert_eq!(report.average("ned"), None);
        assert_eq!(report.average("exact_match"), Some(1.0));
        assert_eq!(report.average("avg_exact_match"), Some(1.0));
        assert!(report.to_string().contains("exact_match: 1.0000"));
    }

    #[test]
    fn test_field_analysis_untagged() {
        let entity: FieldAnalysis = serde_json::from_value(
            json!({"precision": 1.0, "recall": 0.5, "f1": 0.667, "tp": 1, "fp": 0, "fn": 1}),
        )
        .unwrap();
        assert!(matches!(entity, FieldAnalysis::Entity { false_negatives: 1, .. }));

        let acc: FieldAnalysis =
            serde_json::from_value(json!({"accuracy": 0.5, "correct": 1, "total": 2})).unwrap();
        assert_eq!(acc.headline(), 0.5);
    }

    #[test]
    fn test_report_display_mentions_fields() {
        let mut report = Report {
            schema_name: Some("medical_form".into()),
            sample_count: 3,
            ..Report::default()
        };
        report.averages.insert("avg_weighted_score".into(), 0.75);
        report.averages.insert("avg_logical_values".into(), 0.5);
        let text = report.to_string();
        assert!(text.contains("Overall Weighted Score: 0.7500"));
        assert!(text.contains("logical_values: 0.5000"));
    }
}
