//! Paired significance tests over per-sample scores.
//!
//! Both tests take two equally long score vectors (same documents, same
//! order) and test the per-document differences `a - b`.
//!
//! - [`paired_t_test`]: Student t on the mean difference (needs n ≥ 2).
//! - [`wilcoxon_signed_rank`]: signed-rank test on non-zero differences
//!   (needs n ≥ 3). The p-value comes from the exact null distribution when
//!   there are at most 50 differences with no ties and no zeros, and from
//!   the tie-corrected normal approximation otherwise.
//!
//! Too few samples is not an error: the result carries a message, no
//! statistic, and `significant = false`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use crate::eval::stats::{mean, median, normal_two_sided_p, sample_std_dev, student_t_two_sided_p};

/// Conventional significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Largest sample size for which the exact signed-rank distribution is used.
const EXACT_WILCOXON_MAX_N: usize = 50;

/// Which paired test to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TestKind {
    /// Paired Student t-test.
    #[default]
    #[serde(rename = "t-test")]
    PairedT,
    /// Wilcoxon signed-rank test.
    #[serde(rename = "wilcoxon")]
    Wilcoxon,
}

impl TestKind {
    /// Short name used in output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PairedT => "t-test",
            Self::Wilcoxon => "wilcoxon",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t-test" | "ttest" | "t" | "paired-t" | "parametric" => Ok(Self::PairedT),
            "wilcoxon" | "signed-rank" | "non-parametric" | "nonparametric" => Ok(Self::Wilcoxon),
            other => Err(Error::invalid_input(format!("unknown test '{}'", other))),
        }
    }
}

/// Outcome of a paired test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTest {
    /// Test that was run.
    pub test: TestKind,
    /// Number of paired samples supplied.
    pub n: usize,
    /// Test statistic (t, or min(W+, W−)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistic: Option<f64>,
    /// Two-sided p-value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    /// Whether `p_value < alpha`.
    pub significant: bool,
    /// Level the p-value was compared against.
    pub alpha: f64,
    /// Human-readable verdict.
    pub interpretation: String,
    /// Cohen's d of the differences (t-test only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cohens_d: Option<f64>,
    /// Mean of `a - b` (t-test only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_difference: Option<f64>,
    /// Median of `a - b` (Wilcoxon only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_difference: Option<f64>,
    /// Why the test could not be completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignificanceTest {
    fn not_run(test: TestKind, n: usize, alpha: f64, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            test,
            n,
            statistic: None,
            p_value: None,
            significant: false,
            alpha,
            interpretation: message.clone(),
            cohens_d: None,
            mean_difference: None,
            median_difference: None,
            error: Some(message),
        }
    }

    fn completed(test: TestKind, n: usize, alpha: f64, statistic: f64, p_value: f64) -> Self {
        let significant = p_value < alpha;
        Self {
            test,
            n,
            statistic: Some(statistic),
            p_value: Some(p_value),
            significant,
            alpha,
            interpretation: interpret_p_value(p_value, alpha),
            cohens_d: None,
            mean_difference: None,
            median_difference: None,
            error: None,
        }
    }

    /// Whether the test produced a statistic.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for SignificanceTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.test {
            TestKind::PairedT => "Paired t-test",
            TestKind::Wilcoxon => "Wilcoxon signed-rank test",
        };
        write!(f, "{} (n={}): ", name, self.n)?;
        match (self.statistic, self.p_value) {
            (Some(stat), Some(p)) => {
                write!(f, "statistic={:.4}, p={:.4}", stat, p)?;
                if let Some(d) = self.cohens_d {
                    write!(f, ", d={:.3}", d)?;
                }
                write!(f, " - {}", self.interpretation)
            }
            _ => f.write_str(&self.interpretation),
        }
    }
}

/// Verdict for a p-value at level `alpha`.
#[must_use]
pub fn interpret_p_value(p_value: f64, alpha: f64) -> String {
    if p_value < alpha {
        if p_value < 0.001 {
            "Highly significant difference (p < 0.001)".to_string()
        } else if p_value < 0.01 {
            "Very significant difference (p < 0.01)".to_string()
        } else {
            format!("Significant difference (p < {})", alpha)
        }
    } else {
        format!("No significant difference (p >= {})", alpha)
    }
}

const NON_FINITE: &str = "Test failed: non-finite differences";

fn differences(a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
    if a.len() != b.len() {
        return Err(Error::invalid_input(format!(
            "paired samples differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    Ok(a.iter().zip(b).map(|(x, y)| x - y).collect())
}

// =============================================================================
// Paired t-test
// =============================================================================

/// Paired t-test on `a - b` at the conventional 0.05 level.
///
/// # Errors
///
/// Fails only when the inputs differ in length.
pub fn paired_t_test(a: &[f64], b: &[f64]) -> Result<SignificanceTest> {
    paired_t_test_at(a, b, DEFAULT_ALPHA)
}

/// Paired t-test on `a - b` at level `alpha`.
pub fn paired_t_test_at(a: &[f64], b: &[f64], alpha: f64) -> Result<SignificanceTest> {
    let diffs = differences(a, b)?;
    let n = diffs.len();
    if n < 2 {
        return Ok(SignificanceTest::not_run(
            TestKind::PairedT,
            n,
            alpha,
            "Insufficient samples for t-test (need at least 2)",
        ));
    }
    if diffs.iter().any(|d| !d.is_finite()) {
        return Ok(SignificanceTest::not_run(TestKind::PairedT, n, alpha, NON_FINITE));
    }

    let mean_diff = mean(&diffs);
    let sd = sample_std_dev(&diffs);
    let (statistic, p_value) = if sd > 0.0 {
        let t = mean_diff / (sd / (n as f64).sqrt());
        (t, student_t_two_sided_p(t, (n - 1) as f64))
    } else if mean_diff == 0.0 {
        (0.0, 1.0)
    } else {
        (f64::INFINITY.copysign(mean_diff), 0.0)
    };

    let mut result = SignificanceTest::completed(TestKind::PairedT, n, alpha, statistic, p_value);
    result.cohens_d = Some(if sd > 0.0 { mean_diff / sd } else { 0.0 });
    result.mean_difference = Some(mean_diff);
    Ok(result)
}

// =============================================================================
// Wilcoxon signed-rank
// =============================================================================

/// Average ranks (1-based) of `values`, plus the sizes of tie groups > 1.
fn average_ranks(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end share ranks start+1 ..= end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        if end - start > 1 {
            ties.push(end - start);
        }
        start = end;
    }
    (ranks, ties)
}

/// P(W ≤ w) under the exact null distribution of the signed-rank statistic
/// with `n` untied ranks.
fn exact_signed_rank_cdf(w: usize, n: usize) -> f64 {
    let max_sum = n * (n + 1) / 2;
    let mut counts = vec![0.0f64; max_sum + 1];
    counts[0] = 1.0;
    for rank in 1..=n {
        for s in (rank..=max_sum).rev() {
            counts[s] += counts[s - rank];
        }
    }
    let total = 2f64.powi(n as i32);
    counts.iter().take(w.min(max_sum) + 1).sum::<f64>() / total
}

/// Wilcoxon signed-rank test on `a - b` at the conventional 0.05 level.
///
/// Zero differences are discarded before ranking.
///
/// # Errors
///
/// Fails only when the inputs differ in length.
pub fn wilcoxon_signed_rank(a: &[f64], b: &[f64]) -> Result<SignificanceTest> {
    wilcoxon_signed_rank_at(a, b, DEFAULT_ALPHA)
}

/// Wilcoxon signed-rank test on `a - b` at level `alpha`.
pub fn wilcoxon_signed_rank_at(a: &[f64], b: &[f64], alpha: f64) -> Result<SignificanceTest> {
    let diffs = differences(a, b)?;
    let n = diffs.len();
    if n < 3 {
        return Ok(SignificanceTest::not_run(
            TestKind::Wilcoxon,
            n,
            alpha,
            "Insufficient samples for Wilcoxon test (need at least 3)",
        ));
    }
    if diffs.iter().any(|d| !d.is_finite()) {
        return Ok(SignificanceTest::not_run(TestKind::Wilcoxon, n, alpha, NON_FINITE));
    }

    let nonzero: Vec<f64> = diffs.iter().copied().filter(|d| *d != 0.0).collect();
    if nonzero.is_empty() {
        return Ok(SignificanceTest::not_run(
            TestKind::Wilcoxon,
            n,
            alpha,
            "Test failed: all differences are zero",
        ));
    }

    let magnitudes: Vec<f64> = nonzero.iter().map(|d| d.abs()).collect();
    let (ranks, ties) = average_ranks(&magnitudes);
    let w_plus: f64 = nonzero
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    let m = nonzero.len();
    let w_total = (m * (m + 1)) as f64 / 2.0;
    let w_minus = w_total - w_plus;
    let statistic = w_plus.min(w_minus);

    let exact = m <= EXACT_WILCOXON_MAX_N && ties.is_empty() && m == n;
    let p_value = if exact {
        // No ties: ranks are integers, so the statistic is too.
        let w = statistic.round() as usize;
        (2.0 * exact_signed_rank_cdf(w, m)).min(1.0)
    } else {
        let mf = m as f64;
        let expected = mf * (mf + 1.0) / 4.0;
        let tie_term: f64 = ties.iter().map(|&t| (t * t * t - t) as f64).sum::<f64>() / 48.0;
        let variance = mf * (mf + 1.0) * (2.0 * mf + 1.0) / 24.0 - tie_term;
        if variance <= 0.0 {
            return Ok(SignificanceTest::not_run(
                TestKind::Wilcoxon,
                n,
                alpha,
                "Test failed: signed-rank variance is zero",
            ));
        }
        normal_two_sided_p((statistic - expected) / variance.sqrt())
    };

    let mut result = SignificanceTest::completed(TestKind::Wilcoxon, n, alpha, statistic, p_value);
    result.median_difference = Some(median(&diffs));
    Ok(result)
}

/// Run the chosen test at level `alpha`.
pub fn run_test(kind: TestKind, a: &[f64], b: &[f64], alpha: f64) -> Result<SignificanceTest> {
    match kind {
        TestKind::PairedT => paired_t_test_at(a, b, alpha),
        TestKind::Wilcoxon => wilcoxon_signed_rank_at(a, b, alpha),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_insufficient() {
        let r = paired_t_test(&[0.5], &[0.4]).unwrap();
        assert!(!r.significant);
        assert!(r.statistic.is_none() && r.p_value.is_none());
        assert_eq!(
            r.error.as_deref(),
            Some("Insufficient samples for t-test (need at least 2)")
        );
    }

    #[test]
    fn test_t_length_mismatch_is_error() {
        assert!(paired_t_test(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn test_t_known_value() {
        // differences 1, 2, 3, 4: mean 2.5, sd 1.29099, t = 3.87298, df 3
        let a = [2.0, 4.0, 6.0, 8.0];
        let b = [1.0, 2.0, 3.0, 4.0];
        let r = paired_t_test(&a, &b).unwrap();
        assert!((r.statistic.unwrap() - 3.872_983_346).abs() < 1e-6);
        assert!((r.p_value.unwrap() - 0.030_466).abs() < 1e-4);
        assert!(r.significant);
        assert!((r.cohens_d.unwrap() - 1.936_491_673).abs() < 1e-6);
        assert_eq!(r.mean_difference, Some(2.5));
    }

    #[test]
    fn test_t_identical_samples() {
        let a = [0.1, 0.2, 0.3];
        let r = paired_t_test(&a, &a).unwrap();
        assert_eq!(r.statistic, Some(0.0));
        assert_eq!(r.p_value, Some(1.0));
        assert_eq!(r.cohens_d, Some(0.0));
        assert!(!r.significant);
        assert_eq!(r.interpretation, "No significant difference (p >= 0.05)");
    }

    #[test]
    fn test_t_constant_shift() {
        let r = paired_t_test(&[1.0, 2.0, 3.0], &[0.5, 1.5, 2.5]).unwrap();
        assert_eq!(r.p_value, Some(0.0));
        assert!(r.statistic.unwrap().is_infinite());
        assert!(r.significant);
    }

    #[test]
    fn test_wilcoxon_insufficient() {
        let r = wilcoxon_signed_rank(&[1.0, 2.0], &[0.0, 0.0]).unwrap();
        assert!(!r.significant);
        assert_eq!(
            r.error.as_deref(),
            Some("Insufficient samples for Wilcoxon test (need at least 3)")
        );
    }

    #[test]
    fn test_wilcoxon_all_zero() {
        let a = [0.3, 0.3, 0.3];
        let r = wilcoxon_signed_rank(&a, &a).unwrap();
        assert!(!r.is_completed());
        assert!(r.error.unwrap().starts_with("Test failed"));
    }

    #[test]
    fn test_wilcoxon_exact() {
        // All eight differences positive with distinct magnitudes:
        // W- = 0, p = 2 / 2^8 = 0.0078125
        let a: Vec<f64> = (1..=8).map(|i| i as f64).collect();
        let b = vec![0.0; 8];
        let r = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(r.statistic, Some(0.0));
        assert!((r.p_value.unwrap() - 0.007_812_5).abs() < 1e-12);
        assert_eq!(r.interpretation, "Very significant difference (p < 0.01)");
        assert_eq!(r.median_difference, Some(4.5));
    }

    #[test]
    fn test_wilcoxon_mixed_signs_exact() {
        // differences: +1, -2, +3, +4, -5 → W+ = 8, W- = 7, statistic 7
        let a = [1.0, -2.0, 3.0, 4.0, -5.0];
        let b = [0.0; 5];
        let r = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(r.statistic, Some(7.0));
        // P(W <= 7) for n = 5 is 16/32; doubled and capped at 1
        assert_eq!(r.p_value, Some(1.0));
        assert!(!r.significant);
    }

    #[test]
    fn test_wilcoxon_ties_use_normal() {
        let a = [1.0, 1.0, 1.0, 2.0, 2.0, 3.0];
        let b = [0.0; 6];
        let r = wilcoxon_signed_rank(&a, &b).unwrap();
        assert_eq!(r.statistic, Some(0.0));
        // n = 6, ties {3, 2}: var = 22.75 - 30/48, z = -10.5 / sqrt(22.125)
        let z: f64 = -10.5 / 22.125f64.sqrt();
        assert!((r.p_value.unwrap() - normal_two_sided_p(z)).abs() < 1e-12);
    }

    #[test]
    fn test_average_ranks() {
        let (ranks, ties) = average_ranks(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
        assert_eq!(ties, vec![2]);
    }

    #[test]
    fn test_test_kind_parse() {
        assert_eq!("t-test".parse::<TestKind>().unwrap(), TestKind::PairedT);
        assert_eq!("Wilcoxon".parse::<TestKind>().unwrap(), TestKind::Wilcoxon);
        assert!("anova".parse::<TestKind>().is_err());
    }

    #[test]
    fn test_interpretation_thresholds() {
        assert_eq!(interpret_p_value(0.0005, 0.05), "Highly significant difference (p < 0.001)");
        assert_eq!(interpret_p_value(0.03, 0.05), "Significant difference (p < 0.05)");
        assert_eq!(interpret_p_value(0.05, 0.05), "No significant difference (p >= 0.05)");
    }
}
