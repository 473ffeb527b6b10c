//! Per-field scoring for structured predictions.
//!
//! Each [`FieldSpec`] names an [`Evaluation`]; [`FieldScorer::score`]
//! dispatches on it and records counts into the run's [`FieldErrors`].
//!
//! | Evaluation | Ground truth | Score |
//! |------------|--------------|-------|
//! | `accuracy` | label → value map | matching labels / ground-truth labels |
//! | `f1` | entity list | entity-set F1 |
//! | `pairing` | label → text map | labels whose normalized values contain one another / labels |
//! | `exact_match` | label → value map | labels with identical raw values / labels |
//!
//! Ground truth that is missing, empty, or of the wrong shape scores 0.0 and
//! records nothing.

use serde_json::{Map, Value};

use ocrbench_core::{Evaluation, FieldSpec};

use crate::eval::accumulator::FieldErrors;
use crate::matcher::KeyMatcher;
use crate::normalize::normalize_label;
use crate::similarity::entity_f1;

/// A categorical answer after equivalence mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    /// Affirmative / marked.
    Yes,
    /// Negative / unmarked.
    No,
}

impl YesNo {
    /// Map a raw answer token onto Y/N. Unknown tokens yield `None`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_uppercase().as_str() {
            "Y" | "YES" | "T" | "TRUE" | "CHECKED" | "V" | "✓" | "✔" | "☑" | "1" | "是" | "有" => {
                Some(Self::Yes)
            }
            "N" | "NO" | "F" | "FALSE" | "UNCHECKED" | "X" | "✗" | "✘" | "☐" | "0" | "否" | "无"
            | "無" => Some(Self::No),
            _ => None,
        }
    }

    /// Map a JSON value onto Y/N.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(Self::Yes),
            Value::Bool(false) => Some(Self::No),
            other => Self::parse(&value_text(other)),
        }
    }
}

/// Text form of a JSON scalar; strings are used verbatim, `null` is empty.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Whether a predicted categorical answer agrees with the ground truth.
///
/// Agreement is raw equality (upper-cased, trimmed) or both sides mapping to
/// the same Y/N symbol. Tokens outside the equivalence table only ever match
/// themselves.
#[must_use]
pub fn answers_agree(ground_truth: &Value, predicted: &Value) -> bool {
    let gt = value_text(ground_truth).trim().to_uppercase();
    let pred = value_text(predicted).trim().to_uppercase();
    if gt == pred {
        return true;
    }
    match (YesNo::from_value(ground_truth), YesNo::from_value(predicted)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Whether two free-text values agree after strict normalization.
///
/// Both must be non-empty after normalization and one must contain the other.
#[must_use]
pub fn texts_pair(ground_truth: &Value, predicted: &Value) -> bool {
    let gt = normalize_label(&value_text(ground_truth));
    let pred = normalize_label(&value_text(predicted));
    !gt.is_empty() && !pred.is_empty() && (gt.contains(&pred) || pred.contains(&gt))
}

fn non_empty_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object).filter(|m| !m.is_empty())
}

fn entity_strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(value_text).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(Value::String(s)) if s.is_empty() => Vec::new(),
        Some(other) => vec![value_text(other)],
    }
}

/// Dispatches field scoring by evaluation kind.
#[derive(Debug, Default)]
pub struct FieldScorer {
    matcher: KeyMatcher,
}

impl FieldScorer {
    /// Scorer with the default key matcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scorer with a custom key matcher.
    #[must_use]
    pub fn with_matcher(matcher: KeyMatcher) -> Self {
        Self { matcher }
    }

    /// Key matcher in use.
    #[must_use]
    pub fn matcher(&self) -> &KeyMatcher {
        &self.matcher
    }

    /// Score one field of one sample, recording counts into `errors`.
    ///
    /// `ground_truth` and `predicted` are the values stored under the field's
    /// name in the respective records.
    pub fn score(
        &self,
        field: &FieldSpec,
        ground_truth: Option<&Value>,
        predicted: Option<&Value>,
        errors: &mut FieldErrors,
    ) -> f64 {
        match field.evaluation {
            Evaluation::Accuracy => {
                self.score_labels(&field.name, ground_truth, predicted, errors, |gt, pred| {
                    pred.is_some_and(|p| answers_agree(gt, p))
                })
            }
            Evaluation::Pairing => {
                self.score_labels(&field.name, ground_truth, predicted, errors, |gt, pred| {
                    texts_pair(gt, pred.unwrap_or(&Value::Null))
                })
            }
            Evaluation::ExactMatch => {
                self.score_labels(&field.name, ground_truth, predicted, errors, |gt, pred| {
                    pred == Some(gt)
                })
            }
            Evaluation::F1 => Self::score_entities(&field.name, ground_truth, predicted, errors),
        }
    }

    /// Shared driver for label → value fields.
    fn score_labels<F>(
        &self,
        field: &str,
        ground_truth: Option<&Value>,
        predicted: Option<&Value>,
        errors: &mut FieldErrors,
        agree: F,
    ) -> f64
    where
        F: Fn(&Value, Option<&Value>) -> bool,
    {
        let Some(gt) = non_empty_object(ground_truth) else {
            return 0.0;
        };
        let empty = Map::new();
        let pred = predicted.and_then(Value::as_object).unwrap_or(&empty);

        let correct = gt
            .iter()
            .filter(|(label, value)| agree(*value, self.matcher.find_value(label, pred)))
            .count();
        errors.record_labels(field, correct, gt.len());
        correct as f64 / gt.len() as f64
    }

    fn score_entities(
        field: &str,
        ground_truth: Option<&Value>,
        predicted: Option<&Value>,
        errors: &mut FieldErrors,
    ) -> f64 {
        let gt = match ground_truth {
            Some(Value::Array(items)) if !items.is_empty() => {
                items.iter().map(value_text).collect::<Vec<_>>()
            }
            _ => return 0.0,
        };
        let pred = entity_strings(predicted);
        let scores = entity_f1(&pred, &gt);
        errors.record_entities(field, &scores);
        scores.f1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::accumulator::FieldCounts;
    use ocrbench_core::FieldKind;
    use serde_json::json;

    fn spec(name: &str, evaluation: Evaluation) -> FieldSpec {
        let kind = match evaluation {
            Evaluation::F1 => FieldKind::EntityList,
            Evaluation::Pairing => FieldKind::TextDict,
            _ => FieldKind::CategoricalDict,
        };
        FieldSpec::new(name, kind, evaluation)
    }

    #[test]
    fn test_yes_no_table() {
        assert_eq!(YesNo::parse(" yes "), Some(YesNo::Yes));
        assert_eq!(YesNo::parse("✔"), Some(YesNo::Yes));
        assert_eq!(YesNo::parse("否"), Some(YesNo::No));
        assert_eq!(YesNo::parse("unchecked"), Some(YesNo::No));
        assert_eq!(YesNo::parse("maybe"), None);
        assert_eq!(YesNo::from_value(&json!(false)), Some(YesNo::No));
    }

    #[test]
    fn test_answers_agree() {
        assert!(answers_agree(&json!("Y"), &json!("checked")));
        assert!(answers_agree(&json!("N"), &json!("X")));
        assert!(answers_agree(&json!("N"), &json!(false)));
        assert!(!answers_agree(&json!("Y"), &json!("N")));
        // unknown tokens only match themselves
        assert!(!answers_agree(&json!("Y"), &json!("maybe")));
        assert!(answers_agree(&json!("Maybe"), &json!(" maybe ")));
    }

    #[test]
    fn test_accuracy_with_fuzzy_labels() {
        let scorer = FieldScorer::new();
        let mut errors = FieldErrors::default();
        let gt = json!({"心脏病": "Y", "高血压": "N", "Diabetes": "N", "Stroke": "Y"});
        let pred = json!({"1. Heart Disease": "YES", "Hypertension": "Y", "Diabetes": "no"});
        let score = scorer.score(
            &spec("disease_status", Evaluation::Accuracy),
            Some(&gt),
            Some(&pred),
            &mut errors,
        );
        assert!((score - 0.5).abs() < 1e-12);
        assert_eq!(
            errors.get("disease_status"),
            Some(FieldCounts::Labels { correct: 2, total: 4 })
        );
    }

    #[test]
    fn test_missing_ground_truth_records_nothing() {
        let scorer = FieldScorer::new();
        let mut errors = FieldErrors::default();
        let field = spec("logical_values", Evaluation::Accuracy);
        assert_eq!(scorer.score(&field, None, Some(&json!({"a": "Y"})), &mut errors), 0.0);
        assert_eq!(scorer.score(&field, Some(&json!({})), None, &mut errors), 0.0);
        assert_eq!(scorer.score(&field, Some(&json!(["Y"])), None, &mut errors), 0.0);
        assert_eq!(errors.get("logical_values"), None);
    }

    #[test]
    fn test_missing_prediction_counts_total() {
        let scorer = FieldScorer::new();
        let mut errors = FieldErrors::default();
        let field = spec("logical_values", Evaluation::Accuracy);
        let score = scorer.score(&field, Some(&json!({"a": "Y", "b": "N"})), None, &mut errors);
        assert_eq!(score, 0.0);
        assert_eq!(
            errors.get("logical_values"),
            Some(FieldCounts::Labels { correct: 0, total: 2 })
        );
    }

    #[test]
    fn test_f1_field() {
        let scorer = FieldScorer::new();
        let mut errors = FieldErrors::default();
        let field = spec("medical_entities", Evaluation::F1);
        let score = scorer.score(
            &field,
            Some(&json!(["aspirin", "metformin"])),
            Some(&json!(["Aspirin 100mg", "Metformin"])),
            &mut errors,
        );
        assert_eq!(score, 1.0);
        assert_eq!(
            errors.get("medical_entities"),
            Some(FieldCounts::Entities { tp: 2, fp: 0, fn_: 0 })
        );
    }

    #[test]
    fn test_f1_single_string_prediction() {
        let scorer = FieldScorer::new();
        let mut errors = FieldErrors::default();
        let field = spec("medical_entities", Evaluation::F1);
        let score = scorer.score(
            &field,
            Some(&json!(["insulin"])),
            Some(&json!("Insulin 10 units")),
            &mut errors,
        );
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_pairing_strict_normalization() {
        let scorer = FieldScorer::new();
        let mut errors = FieldErrors::default();
        let field = spec("field_pairings", Evaluation::Pairing);
        let gt = json!({"药物": "Under medication", "日期": "2024-01-05", "Remarks": "none"});
        let pred = json!({"DRUGS": "undermedication for BP", "Date": "2024/01/05", "Remarks": ""});
        let score = scorer.score(&field, Some(&gt), Some(&pred), &mut errors);
        assert!((score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_exact_match_is_strict() {
        let scorer = FieldScorer::new();
        let mut errors = FieldErrors::default();
        let field = spec("vitals", Evaluation::ExactMatch);
        let gt = json!({"Pulse": 72, "Weight": "60kg"});
        let pred = json!({"pulse": 72, "Weight": "60 kg"});
        let score = scorer.score(&field, Some(&gt), Some(&pred), &mut errors);
        assert_eq!(score, 0.5);
    }
}
