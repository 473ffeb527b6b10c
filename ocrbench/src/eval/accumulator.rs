//! Per-run field error counters.
//!
//! One [`FieldErrors`] belongs to one evaluation run. Field scoring takes it
//! by `&mut`, so nothing is shared between runs or threads.

use std::collections::BTreeMap;

use ocrbench_core::{Evaluation, FieldAnalysis, Schema};

use crate::similarity::EntityScores;

/// Raw counts for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCounts {
    /// Label-level correctness (accuracy, pairing, exact match).
    Labels {
        /// Labels judged correct.
        correct: usize,
        /// Labels seen.
        total: usize,
    },
    /// Entity matching (f1).
    Entities {
        /// Ground-truth entities found.
        tp: usize,
        /// Predicted entities matching nothing.
        fp: usize,
        /// Ground-truth entities missed.
        fn_: usize,
    },
}

impl FieldCounts {
    fn empty_for(evaluation: Evaluation) -> Self {
        match evaluation {
            Evaluation::F1 => Self::Entities { tp: 0, fp: 0, fn_: 0 },
            _ => Self::Labels { correct: 0, total: 0 },
        }
    }

    fn analysis(self) -> FieldAnalysis {
        match self {
            Self::Labels { correct, total } => FieldAnalysis::Accuracy {
                accuracy: ratio(correct, total),
                correct,
                total,
            },
            Self::Entities { tp, fp, fn_ } => {
                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, tp + fn_);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                FieldAnalysis::Entity {
                    precision,
                    recall,
                    f1,
                    true_positives: tp,
                    false_positives: fp,
                    false_negatives: fn_,
                }
            }
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Counters for every field of a schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors {
    counts: BTreeMap<String, FieldCounts>,
}

impl FieldErrors {
    /// Zeroed counters for each field of `schema`.
    #[must_use]
    pub fn for_schema(schema: &Schema) -> Self {
        let counts = schema
            .fields()
            .iter()
            .map(|f| (f.name.clone(), FieldCounts::empty_for(f.evaluation)))
            .collect();
        Self { counts }
    }

    /// Add label-level counts for `field`.
    pub fn record_labels(&mut self, field: &str, correct: usize, total: usize) {
        let entry = self
            .counts
            .entry(field.to_string())
            .or_insert(FieldCounts::Labels { correct: 0, total: 0 });
        if let FieldCounts::Labels {
            correct: c,
            total: t,
        } = entry
        {
            *c += correct;
            *t += total;
        }
    }

    /// Add entity counts for `field`.
    pub fn record_entities(&mut self, field: &str, scores: &EntityScores) {
        let entry = self
            .counts
            .entry(field.to_string())
            .or_insert(FieldCounts::Entities { tp: 0, fp: 0, fn_: 0 });
        if let FieldCounts::Entities { tp, fp, fn_ } = entry {
            *tp += scores.true_positives;
            *fp += scores.false_positives;
            *fn_ += scores.false_negatives;
        }
    }

    /// Counts for one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<FieldCounts> {
        self.counts.get(field).copied()
    }

    /// Precision/recall/F1 or accuracy per field.
    #[must_use]
    pub fn analysis(&self) -> BTreeMap<String, FieldAnalysis> {
        self.counts
            .iter()
            .map(|(name, counts)| (name.clone(), counts.analysis()))
            .collect()
    }
}
