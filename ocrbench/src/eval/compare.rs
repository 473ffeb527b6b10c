//! Pairwise model comparison over evaluation reports.
//!
//! Two reports are aligned on the documents they both scored, one metric is
//! pulled out per document, and the resulting paired vectors get a bootstrap
//! interval each plus a paired significance test.
//!
//! ```
//! use ocrbench::eval::compare::{compare_reports, ComparisonConfig, ComparisonOutcome, Winner};
//! use ocrbench::{Report, SampleResult};
//!
//! fn report(scores: &[f64]) -> Report {
//!     let mut report = Report::default();
//!     for (i, s) in scores.iter().enumerate() {
//!         let mut sample = SampleResult::new(format!("doc{}.png", i));
//!         sample.scores.insert("cer".into(), *s);
//!         report.details.push(sample);
//!     }
//!     report
//! }
//!
//! let config = ComparisonConfig::default().with_metric("cer").with_seed(1);
//! let outcome = compare_reports(
//!     &report(&[0.10, 0.11, 0.09, 0.10, 0.12]),
//!     &report(&[0.20, 0.22, 0.19, 0.21, 0.20]),
//!     &config,
//! )
//! .unwrap();
//! match outcome {
//!     ComparisonOutcome::Compared(c) => assert_eq!(c.winner, Winner::Model1),
//!     other => panic!("{:?}", other),
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use ocrbench_core::Report;

use crate::eval::evaluator::WEIGHTED_SCORE;
use crate::eval::significance::{run_test, SignificanceTest, TestKind, DEFAULT_ALPHA};
use crate::eval::stats::{bootstrap_ci, mean, BootstrapConfig};
use crate::{Error, Result};

/// Metrics where a smaller value is better.
pub const LOWER_IS_BETTER: [&str; 3] = ["cer", "wer", "ned"];

/// Whether smaller values of `metric` are better (`cer`, `wer`, `ned`,
/// with or without an `avg_` prefix).
#[must_use]
pub fn is_lower_better(metric: &str) -> bool {
    let lower = metric.to_ascii_lowercase();
    let bare = lower.strip_prefix("avg_").unwrap_or(&lower);
    LOWER_IS_BETTER.contains(&bare)
}

// =============================================================================
// Configuration
// =============================================================================

/// How to compare two reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Per-document metric to compare.
    pub metric: String,
    /// Significance test.
    pub test: TestKind,
    /// Bootstrap interval settings.
    pub bootstrap: BootstrapConfig,
    /// Significance level.
    pub alpha: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            metric: WEIGHTED_SCORE.to_string(),
            test: TestKind::PairedT,
            bootstrap: BootstrapConfig::default(),
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl ComparisonConfig {
    /// Compare on `metric`.
    #[must_use]
    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    /// Use `test` for significance.
    #[must_use]
    pub fn with_test(mut self, test: TestKind) -> Self {
        self.test = test;
        self
    }

    /// Use `n` bootstrap resamples.
    #[must_use]
    pub fn with_bootstrap_resamples(mut self, n: usize) -> Self {
        self.bootstrap = self.bootstrap.with_resamples(n);
        self
    }

    /// Fix the bootstrap seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.bootstrap = self.bootstrap.with_seed(seed);
        self
    }

    /// Significance level.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Check that the levels are proper probabilities.
    pub fn validate(&self) -> Result<()> {
        if self.metric.trim().is_empty() {
            return Err(Error::invalid_input("comparison metric is empty"));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::invalid_input(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        let level = self.bootstrap.confidence_level;
        if !(level > 0.0 && level < 1.0) {
            return Err(Error::invalid_input(format!(
                "confidence level must be in (0, 1), got {}",
                level
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Results
// =============================================================================

/// One model's side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Mean of the metric over common documents.
    pub mean: f64,
    /// Bootstrap interval of the mean (lower, upper).
    pub ci_95: (f64, f64),
    /// Per-document values, ordered by file name.
    pub scores: Vec<f64>,
}

impl ModelSummary {
    fn from_scores(scores: Vec<f64>, bootstrap: &BootstrapConfig) -> Self {
        let ci = bootstrap_ci(&scores, bootstrap);
        Self {
            mean: mean(&scores),
            ci_95: (ci.lower, ci.upper),
            scores,
        }
    }
}

/// Which model came out ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    /// The first report.
    #[serde(rename = "Model 1")]
    Model1,
    /// The second report.
    #[serde(rename = "Model 2")]
    Model2,
    /// The test did not reject equality.
    #[serde(rename = "No significant difference")]
    NoSignificantDifference,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Model1 => "Model 1",
            Self::Model2 => "Model 2",
            Self::NoSignificantDifference => "No significant difference",
        })
    }
}

/// Pick the winner from the test outcome and the two means.
#[must_use]
pub fn determine_winner(metric: &str, test: &SignificanceTest, mean1: f64, mean2: f64) -> Winner {
    if !test.significant {
        return Winner::NoSignificantDifference;
    }
    let first_better = if is_lower_better(metric) {
        mean1 < mean2
    } else {
        mean1 > mean2
    };
    if first_better {
        Winner::Model1
    } else {
        Winner::Model2
    }
}

/// A completed comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// First model's id, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model1_id: Option<String>,
    /// Second model's id, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model2_id: Option<String>,
    /// Metric compared.
    pub metric: String,
    /// Documents scored by both models.
    pub n_samples: usize,
    /// First model.
    pub model1: ModelSummary,
    /// Second model.
    pub model2: ModelSummary,
    /// Paired test on `model1 - model2`.
    pub statistical_test: SignificanceTest,
    /// Verdict.
    pub winner: Winner,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name1 = self.model1_id.as_deref().unwrap_or("Model 1");
        let name2 = self.model2_id.as_deref().unwrap_or("Model 2");
        writeln!(f, "Comparison on {} (n={}):", self.metric, self.n_samples)?;
        for (name, summary) in [(name1, &self.model1), (name2, &self.model2)] {
            writeln!(
                f,
                "  {}: mean={:.4}, 95% CI=[{:.4}, {:.4}]",
                name, summary.mean, summary.ci_95.0, summary.ci_95.1
            )?;
        }
        writeln!(f, "  {}", self.statistical_test)?;
        let winner = match self.winner {
            Winner::Model1 => name1.to_string(),
            Winner::Model2 => name2.to_string(),
            Winner::NoSignificantDifference => self.winner.to_string(),
        };
        write!(f, "  Winner: {}", winner)
    }
}

/// Outcome of comparing two reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonOutcome {
    /// The reports shared documents and were compared.
    Compared(Comparison),
    /// The reports have no document in common.
    NoCommonSamples {
        /// Explanation.
        error: String,
        /// Documents in the first report.
        model1_samples: usize,
        /// Documents in the second report.
        model2_samples: usize,
    },
}

impl ComparisonOutcome {
    /// The comparison, when one was made.
    #[must_use]
    pub fn comparison(&self) -> Option<&Comparison> {
        match self {
            Self::Compared(c) => Some(c),
            Self::NoCommonSamples { .. } => None,
        }
    }
}

impl fmt::Display for ComparisonOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compared(c) => write!(f, "{}", c),
            Self::NoCommonSamples {
                error,
                model1_samples,
                model2_samples,
            } => write!(
                f,
                "{} (model 1: {} samples, model 2: {} samples)",
                error, model1_samples, model2_samples
            ),
        }
    }
}

// =============================================================================
// Comparison
// =============================================================================

/// Compare two reports on `config.metric`.
///
/// Documents are aligned by file name (sorted); a document missing the
/// metric counts as 0.
///
/// # Errors
///
/// Fails when `config` does not validate.
pub fn compare_reports(
    report1: &Report,
    report2: &Report,
    config: &ComparisonConfig,
) -> Result<ComparisonOutcome> {
    config.validate()?;
    let by_file1 = report1.metric_by_file(&config.metric);
    let by_file2 = report2.metric_by_file(&config.metric);

    let common: Vec<&str> = by_file1
        .keys()
        .filter(|name| by_file2.contains_key(*name))
        .copied()
        .collect();
    if common.is_empty() {
        log::warn!(
            "no common samples ({} vs {} documents)",
            by_file1.len(),
            by_file2.len()
        );
        return Ok(ComparisonOutcome::NoCommonSamples {
            error: "No common samples found between models".to_string(),
            model1_samples: by_file1.len(),
            model2_samples: by_file2.len(),
        });
    }

    let pick = |scores: &BTreeMap<&str, Option<f64>>| -> Vec<f64> {
        common
            .iter()
            .map(|name| scores.get(name).copied().flatten().unwrap_or(0.0))
            .collect()
    };
    let scores1 = pick(&by_file1);
    let scores2 = pick(&by_file2);

    let statistical_test = run_test(config.test, &scores1, &scores2, config.alpha)?;
    let model1 = ModelSummary::from_scores(scores1, &config.bootstrap);
    let model2 = ModelSummary::from_scores(scores2, &config.bootstrap);
    let winner = determine_winner(&config.metric, &statistical_test, model1.mean, model2.mean);
    log::debug!(
        "compared {} documents on {}: {} ({})",
        common.len(),
        config.metric,
        winner,
        statistical_test.interpretation
    );

    Ok(ComparisonOutcome::Compared(Comparison {
        model1_id: report1.model_id.clone(),
        model2_id: report2.model_id.clone(),
        metric: config.metric.clone(),
        n_samples: common.len(),
        model1,
        model2,
        statistical_test,
        winner,
    }))
}

/// One pair from [`batch_compare`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseComparison {
    /// First model id.
    pub model1: String,
    /// Second model id.
    pub model2: String,
    /// Result for the pair.
    pub outcome: ComparisonOutcome,
}

/// Compare every unordered pair of models, in sorted id order.
///
/// Pairs run in parallel with the `parallel` feature; the output order is
/// the same either way.
pub fn batch_compare(
    reports: &BTreeMap<String, Report>,
    config: &ComparisonConfig,
) -> Result<Vec<PairwiseComparison>> {
    config.validate()?;
    let entries: Vec<(&String, &Report)> = reports.iter().collect();
    let pairs: Vec<(usize, usize)> = (0..entries.len())
        .flat_map(|i| ((i + 1)..entries.len()).map(move |j| (i, j)))
        .collect();
    log::info!("comparing {} model pairs", pairs.len());

    let run = |&(i, j): &(usize, usize)| -> Result<PairwiseComparison> {
        let (id1, r1) = entries[i];
        let (id2, r2) = entries[j];
        let mut outcome = compare_reports(r1, r2, config)?;
        if let ComparisonOutcome::Compared(c) = &mut outcome {
            c.model1_id = Some(id1.clone());
            c.model2_id = Some(id2.clone());
        }
        Ok(PairwiseComparison {
            model1: id1.clone(),
            model2: id2.clone(),
            outcome,
        })
    };

    #[cfg(feature = "parallel")]
    let results = pairs.par_iter().map(run).collect();
    #[cfg(not(feature = "parallel"))]
    let results = pairs.iter().map(run).collect();
    results
}

// =============================================================================
// Effect size
// =============================================================================

/// Cohen's d for two independent groups, using the pooled standard deviation.
///
/// Returns 0.0 when either group has fewer than two values or the pooled
/// deviation is zero.
#[must_use]
pub fn cohens_d_independent(group1: &[f64], group2: &[f64]) -> f64 {
    let (n1, n2) = (group1.len(), group2.len());
    if n1 < 2 || n2 < 2 {
        return 0.0;
    }
    let (m1, m2) = (mean(group1), mean(group2));
    let ss = |g: &[f64], m: f64| g.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    let pooled_var = (ss(group1, m1) + ss(group2, m2)) / (n1 + n2 - 2) as f64;
    let pooled_sd = pooled_var.sqrt();
    if pooled_sd > 0.0 {
        (m1 - m2) / pooled_sd
    } else {
        0.0
    }
}

/// Conventional label for an effect size.
#[must_use]
pub fn interpret_effect_size(d: f64) -> &'static str {
    let d = d.abs();
    if d < 0.2 {
        "negligible"
    } else if d < 0.5 {
        "small"
    } else if d < 0.8 {
        "medium"
    } else {
        "large"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrbench_core::SampleResult;

    fn report(id: &str, metric: &str, scores: &[(&str, f64)]) -> Report {
        let mut report = Report {
            model_id: Some(id.to_string()),
            ..Report::default()
        };
        for (name, value) in scores {
            let mut sample = SampleResult::new(*name);
            if metric == WEIGHTED_SCORE {
                sample.weighted_score = Some(*value);
            } else {
                sample.scores.insert(metric.to_string(), *value);
            }
            report.details.push(sample);
        }
        report
    }

    fn config(metric: &str) -> ComparisonConfig {
        ComparisonConfig::default()
            .with_metric(metric)
            .with_bootstrap_resamples(500)
            .with_seed(42)
    }

    const FILES: [&str; 6] = ["a.png", "b.png", "c.png", "d.png", "e.png", "f.png"];

    fn pairs(values: [f64; 6]) -> Vec<(&'static str, f64)> {
        FILES.iter().copied().zip(values).collect()
    }

    #[test]
    fn test_lower_is_better_metrics() {
        assert!(is_lower_better("cer"));
        assert!(is_lower_better("WER"));
        assert!(is_lower_better("avg_ned"));
        assert!(!is_lower_better("weighted_score"));
        assert!(!is_lower_better("bow_f1"));
    }

    #[test]
    fn test_cer_lower_wins() {
        let r1 = report("m1", "cer", &pairs([0.10, 0.11, 0.09, 0.10, 0.12, 0.10]));
        let r2 = report("m2", "cer", &pairs([0.20, 0.22, 0.19, 0.21, 0.20, 0.18]));
        let outcome = compare_reports(&r1, &r2, &config("cer")).unwrap();
        let c = outcome.comparison().unwrap();
        assert!(c.statistical_test.significant);
        assert_eq!(c.winner, Winner::Model1);
        assert_eq!(c.model1_id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_weighted_score_higher_wins() {
        let r1 = report("m1", WEIGHTED_SCORE, &pairs([0.10, 0.11, 0.09, 0.10, 0.12, 0.10]));
        let r2 = report("m2", WEIGHTED_SCORE, &pairs([0.20, 0.22, 0.19, 0.21, 0.20, 0.18]));
        let outcome = compare_reports(&r1, &r2, &config(WEIGHTED_SCORE)).unwrap();
        assert_eq!(outcome.comparison().unwrap().winner, Winner::Model2);
    }

    #[test]
    fn test_not_significant() {
        let r1 = report("m1", "cer", &pairs([0.1, 0.3, 0.2, 0.4, 0.1, 0.3]));
        let r2 = report("m2", "cer", &pairs([0.3, 0.1, 0.2, 0.1, 0.4, 0.3]));
        let outcome = compare_reports(&r1, &r2, &config("cer")).unwrap();
        assert_eq!(
            outcome.comparison().unwrap().winner,
            Winner::NoSignificantDifference
        );
    }

    #[test]
    fn test_no_common_samples() {
        let r1 = report("m1", "cer", &[("a.png", 0.1), ("b.png", 0.2)]);
        let r2 = report("m2", "cer", &[("c.png", 0.1)]);
        match compare_reports(&r1, &r2, &config("cer")).unwrap() {
            ComparisonOutcome::NoCommonSamples {
                error,
                model1_samples,
                model2_samples,
            } => {
                assert_eq!(error, "No common samples found between models");
                assert_eq!((model1_samples, model2_samples), (2, 1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_alignment_and_missing_metric() {
        let r1 = report("m1", "cer", &[("b.png", 0.2), ("a.png", 0.1), ("x.png", 0.9)]);
        let mut r2 = report("m2", "cer", &[("a.png", 0.3)]);
        r2.details.push(SampleResult::new("b.png"));
        let outcome = compare_reports(&r1, &r2, &config("cer")).unwrap();
        let c = outcome.comparison().unwrap();
        assert_eq!(c.n_samples, 2);
        assert_eq!(c.model1.scores, vec![0.1, 0.2]);
        assert_eq!(c.model2.scores, vec![0.3, 0.0]);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let r1 = report("m1", "cer", &pairs([0.10, 0.31, 0.09, 0.17, 0.12, 0.10]));
        let r2 = report("m2", "cer", &pairs([0.20, 0.22, 0.19, 0.21, 0.20, 0.18]));
        let a = compare_reports(&r1, &r2, &config("cer")).unwrap();
        let b = compare_reports(&r1, &r2, &config("cer")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_pairs_sorted() {
        let mut reports = BTreeMap::new();
        for (id, shift) in [("gamma", 0.2), ("alpha", 0.0), ("beta", 0.1)] {
            let values = [0.1, 0.2, 0.15, 0.12, 0.18, 0.11].map(|v| v + shift);
            reports.insert(id.to_string(), report(id, "cer", &pairs(values)));
        }
        let results = batch_compare(&reports, &config("cer")).unwrap();
        let ids: Vec<(&str, &str)> = results
            .iter()
            .map(|r| (r.model1.as_str(), r.model2.as_str()))
            .collect();
        assert_eq!(ids, vec![("alpha", "beta"), ("alpha", "gamma"), ("beta", "gamma")]);

        let standalone = compare_reports(&reports["alpha"], &reports["beta"], &config("cer")).unwrap();
        assert_eq!(results[0].outcome, standalone);
    }

    #[test]
    fn test_invalid_config() {
        let r = report("m1", "cer", &[("a.png", 0.1)]);
        assert!(compare_reports(&r, &r, &config("cer").with_alpha(1.5)).is_err());
    }

    #[test]
    fn test_cohens_d_independent() {
        let d = cohens_d_independent(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0]);
        assert!((d + 1.0).abs() < 1e-12);
        assert_eq!(interpret_effect_size(d), "large");
        assert_eq!(cohens_d_independent(&[1.0], &[2.0, 3.0]), 0.0);
        assert_eq!(interpret_effect_size(0.1), "negligible");
        assert_eq!(interpret_effect_size(-0.3), "small");
        assert_eq!(interpret_effect_size(0.6), "medium");
    }
}
