//! Report aggregation.
//!
//! [`TextEvaluator`] scores unstructured transcriptions with the text
//! metrics; [`SchemaEvaluator`] scores structured predictions field by field
//! under a [`Schema`]. Both are pure: the same inputs always produce the same
//! [`Report`].

use std::collections::{BTreeMap, HashMap, HashSet};

use ocrbench_core::report::AVG_PREFIX;
use ocrbench_core::{GroundTruthRecord, PredictionRecord, Report, SampleResult, Schema};

use crate::eval::accumulator::FieldErrors;
use crate::eval::fields::FieldScorer;
use crate::normalize::normalize_default;
use crate::similarity::{bow_f1, cer, char_precision_recall, exact_match, ned, wer};

/// Per-sample metrics produced in text mode, in report order.
pub const TEXT_METRICS: [&str; 7] = ["cer", "wer", "ned", "precision", "recall", "bow_f1", "exact_match"];

/// Name of the schema-weighted combined score.
pub const WEIGHTED_SCORE: &str = "weighted_score";

/// Running sums turned into `avg_*` entries.
#[derive(Debug, Default)]
struct Averages {
    sums: BTreeMap<String, f64>,
    count: usize,
}

impl Averages {
    fn add(&mut self, scores: &BTreeMap<String, f64>) {
        for (name, value) in scores {
            *self.sums.entry(name.clone()).or_insert(0.0) += value;
        }
        self.count += 1;
    }

    fn add_one(&mut self, name: &str, value: f64) {
        *self.sums.entry(name.to_string()).or_insert(0.0) += value;
    }

    fn finish<'a>(self, expected: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, f64> {
        let count = self.count;
        let mut averages: BTreeMap<String, f64> = expected
            .into_iter()
            .map(|name| (format!("{}{}", AVG_PREFIX, name), 0.0))
            .collect();
        if count == 0 {
            return averages;
        }
        for (name, sum) in self.sums {
            averages.insert(format!("{}{}", AVG_PREFIX, name), sum / count as f64);
        }
        averages
    }
}

/// Predictions that have ground truth, first occurrence per file name.
fn scorable<'p, 'g>(
    predictions: &'p [PredictionRecord],
    ground_truth: &HashMap<&str, &'g GroundTruthRecord>,
) -> Vec<(&'p PredictionRecord, &'g GroundTruthRecord)> {
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    for pred in predictions {
        let Some(gt) = ground_truth.get(pred.file_name.as_str()) else {
            continue;
        };
        if !seen.insert(pred.file_name.as_str()) {
            log::warn!("duplicate prediction for '{}', keeping the first", pred.file_name);
            continue;
        }
        pairs.push((pred, *gt));
    }
    pairs
}

fn model_id_of(predictions: &[PredictionRecord]) -> Option<String> {
    predictions.iter().find_map(|p| p.model_name.clone())
}

// =============================================================================
// Text mode
// =============================================================================

/// Scores plain-text transcriptions.
#[derive(Debug, Clone, Copy)]
pub struct TextEvaluator {
    normalize: bool,
}

impl Default for TextEvaluator {
    fn default() -> Self {
        Self { normalize: true }
    }
}

impl TextEvaluator {
    /// Evaluator with normalization enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable normalization of both sides before scoring.
    #[must_use]
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Score one prediction against one transcription.
    #[must_use]
    pub fn score(&self, file_name: &str, prediction: &str, ground_truth: &str) -> SampleResult {
        let (pred, gt) = if self.normalize {
            (normalize_default(prediction), normalize_default(ground_truth))
        } else {
            (prediction.to_string(), ground_truth.to_string())
        };

        let (precision, recall) = char_precision_recall(&pred, &gt);
        let mut result = SampleResult::new(file_name);
        result.scores = BTreeMap::from([
            ("cer".to_string(), cer(&pred, &gt)),
            ("wer".to_string(), wer(&pred, &gt)),
            ("ned".to_string(), ned(&pred, &gt)),
            ("precision".to_string(), precision),
            ("recall".to_string(), recall),
            ("bow_f1".to_string(), bow_f1(&pred, &gt)),
            (
                "exact_match".to_string(),
                if exact_match(&pred, &gt) { 1.0 } else { 0.0 },
            ),
        ]);
        result
    }

    /// Evaluate a prediction set. Ground-truth records without `text` are
    /// not part of the text ground truth.
    #[must_use]
    pub fn evaluate(&self, ground_truth: &[GroundTruthRecord], predictions: &[PredictionRecord]) -> Report {
        let gt_index: HashMap<&str, &GroundTruthRecord> = ground_truth
            .iter()
            .filter(|r| r.text().is_some())
            .map(|r| (r.file_name.as_str(), r))
            .collect();

        let mut averages = Averages::default();
        let mut details = Vec::new();
        for (pred, gt) in scorable(predictions, &gt_index) {
            let result = self.score(&pred.file_name, &pred.prediction.as_text(), gt.text().unwrap_or_default());
            averages.add(&result.scores);
            details.push(result);
        }

        log::debug!(
            "text evaluation: {} of {} predictions scored",
            details.len(),
            predictions.len()
        );

        Report {
            model_id: model_id_of(predictions),
            schema_name: None,
            sample_count: details.len(),
            averages: averages.finish(TEXT_METRICS),
            details,
            field_analysis: BTreeMap::new(),
            weights: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Schema mode
// =============================================================================

/// Scores structured predictions under a schema.
#[derive(Debug)]
pub struct SchemaEvaluator {
    schema: Schema,
    scorer: FieldScorer,
}

impl SchemaEvaluator {
    /// Evaluator for `schema` with the default key matcher.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            scorer: FieldScorer::new(),
        }
    }

    /// Replace the field scorer (e.g. to use a custom key matcher).
    #[must_use]
    pub fn with_scorer(mut self, scorer: FieldScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Schema in use.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Score every schema field of one sample.
    pub fn score(
        &self,
        ground_truth: &GroundTruthRecord,
        prediction: &PredictionRecord,
        errors: &mut FieldErrors,
    ) -> SampleResult {
        let parsed = prediction.prediction.parsed();
        if !parsed.is_empty() && !self.schema.validate_prediction(&parsed) {
            log::debug!(
                "{}: prediction lacks fields {:?}",
                prediction.file_name,
                self.schema.missing_fields(&parsed)
            );
        }

        let mut result = SampleResult::new(&ground_truth.file_name);
        let mut weighted = 0.0;
        for field in self.schema.fields() {
            let score = self.scorer.score(
                field,
                ground_truth.field(&field.name),
                parsed.get(&field.name),
                errors,
            );
            weighted += score * field.weight;
            result.scores.insert(field.name.clone(), score);
        }
        result.weighted_score = Some(weighted);
        result
    }

    /// Evaluate a prediction set.
    #[must_use]
    pub fn evaluate(&self, ground_truth: &[GroundTruthRecord], predictions: &[PredictionRecord]) -> Report {
        let gt_index: HashMap<&str, &GroundTruthRecord> = ground_truth
            .iter()
            .map(|r| (r.file_name.as_str(), r))
            .collect();

        let mut errors = FieldErrors::for_schema(&self.schema);
        let mut averages = Averages::default();
        let mut details = Vec::new();
        for (pred, gt) in scorable(predictions, &gt_index) {
            let result = self.score(gt, pred, &mut errors);
            averages.add(&result.scores);
            averages.add_one(WEIGHTED_SCORE, result.weighted_score.unwrap_or(0.0));
            details.push(result);
        }

        log::debug!(
            "schema '{}' evaluation: {} of {} predictions scored",
            self.schema.name(),
            details.len(),
            predictions.len()
        );

        let expected = self
            .schema
            .fields()
            .iter()
            .map(|f| f.name.as_str())
            .chain(std::iter::once(WEIGHTED_SCORE));

        Report {
            model_id: model_id_of(predictions),
            schema_name: Some(self.schema.name().to_string()),
            sample_count: details.len(),
            averages: averages.finish(expected),
            details,
            field_analysis: errors.analysis(),
            weights: self.schema.weights(),
        }
    }
}

/// Evaluate predictions in text mode, or in schema mode when a schema is given.
#[must_use]
pub fn evaluate(
    ground_truth: &[GroundTruthRecord],
    predictions: &[PredictionRecord],
    schema: Option<&Schema>,
) -> Report {
    match schema {
        Some(schema) => SchemaEvaluator::new(schema.clone()).evaluate(ground_truth, predictions),
        None => TextEvaluator::new().evaluate(ground_truth, predictions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_score_edge_cases() {
        let eval = TextEvaluator::new();
        let r = eval.score("f", "", "");
        assert_eq!(r.score("cer"), Some(0.0));
        assert_eq!(r.score("precision"), Some(1.0));
        assert_eq!(r.score("bow_f1"), Some(1.0));
        assert_eq!(r.score("exact_match"), Some(1.0));

        let r = eval.score("f", "something", "Note:");
        assert_eq!(r.score("cer"), Some(1.0));
        assert_eq!(r.score("recall"), Some(0.0));
        assert_eq!(r.score("exact_match"), Some(0.0));
    }

    #[test]
    fn test_text_normalization_toggle() {
        let r = TextEvaluator::new().score("f", "hello, world", "Hello World");
        assert_eq!(r.score("cer"), Some(0.0));
        let r = TextEvaluator::new()
            .with_normalization(false)
            .score("f", "hello, world", "Hello World");
        assert!(r.score("cer").unwrap() > 0.0);
    }

    #[test]
    fn test_ignores_unknown_and_duplicates() {
        let gt = vec![GroundTruthRecord::text_only("a", "abc")];
        let preds = vec![
            PredictionRecord::text("a", "abc"),
            PredictionRecord::text("a", "zzz"),
            PredictionRecord::text("b", "abc"),
        ];
        let report = TextEvaluator::new().evaluate(&gt, &preds);
        assert_eq!(report.sample_count, 1);
        assert_eq!(report.average("cer"), Some(0.0));
    }

    #[test]
    fn test_empty_run_reports_zero_averages() {
        let report = TextEvaluator::new().evaluate(&[], &[]);
        assert_eq!(report.sample_count, 0);
        assert_eq!(report.averages.len(), TEXT_METRICS.len());
        assert!(report.averages.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_schema_weighted_score() {
        let schema = Schema::medical_form().unwrap();
        let gt = vec![GroundTruthRecord::structured(
            "form1.png",
            json!({
                "logical_values": {"Current Medical Treatment": "Y", "Expectant Mother": "N"},
                "disease_status": {"糖尿病": "Y"},
                "medical_entities": ["metformin"],
                "field_pairings": {"DRUGS": "metformin 500mg"}
            })
            .as_object()
            .cloned()
            .unwrap(),
        )];
        let preds = vec![PredictionRecord::text(
            "form1.png",
            "```json\n{\"logical_values\": {\"Current Medical Treatment\": \"Yes\", \"Expectant Mother\": \"Y\"}, \
             \"disease_status\": {\"Diabetes\": \"Y\"}, \"medical_entities\": [\"Metformin\"], \
             \"field_pairings\": {\"药物\": \"Metformin 500 mg\"}}\n```",
        )];

        let report = SchemaEvaluator::new(schema).evaluate(&gt, &preds);
        let sample = &report.details[0];
        assert_eq!(sample.score("logical_values"), Some(0.5));
        assert_eq!(sample.score("disease_status"), Some(1.0));
        assert_eq!(sample.score("medical_entities"), Some(1.0));
        assert_eq!(sample.score("field_pairings"), Some(1.0));
        let weighted = sample.weighted_score.unwrap();
        assert!((weighted - 0.875).abs() < 1e-12);
        assert!((report.average("weighted_score").unwrap() - 0.875).abs() < 1e-12);
        assert_eq!(report.schema_name.as_deref(), Some("medical_form"));
        assert_eq!(report.weights.len(), 4);
    }

    #[test]
    fn test_schema_unparsable_prediction_scores_zero() {
        let schema = Schema::medical_form().unwrap();
        let gt = vec![GroundTruthRecord::structured(
            "x",
            json!({"logical_values": {"A": "Y"}}).as_object().cloned().unwrap(),
        )];
        let preds = vec![PredictionRecord::text("x", "I cannot read this form.")];
        let report = evaluate(&gt, &preds, Some(&schema));
        assert_eq!(report.sample_count, 1);
        assert_eq!(report.details[0].weighted_score, Some(0.0));
    }
}
