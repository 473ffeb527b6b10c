//! Descriptive statistics, distribution functions, and bootstrap intervals.
//!
//! The distribution functions are the usual textbook approximations:
//! Lanczos for `ln Γ`, a Lentz continued fraction for the regularized
//! incomplete beta (which gives the Student t tail), and a Chebyshev fit of
//! `erfc` (relative error < 1.2e-7) for the normal tail.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

// =============================================================================
// Descriptive statistics
// =============================================================================

/// Arithmetic mean; 0.0 for empty input.
///
/// Accumulates deviations from the first element, so a constant slice
/// returns that constant exactly.
#[must_use]
pub fn mean(data: &[f64]) -> f64 {
    let Some(&first) = data.first() else {
        return 0.0;
    };
    let shift: f64 = data.iter().map(|x| x - first).sum();
    first + shift / data.len() as f64
}

/// Sample standard deviation (n − 1 denominator); 0.0 below two samples.
#[must_use]
pub fn sample_std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (data.len() - 1) as f64).sqrt()
}

/// Median; 0.0 for empty input.
#[must_use]
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, 50.0)
}

/// Percentile `q` (0..=100) of already-sorted data, interpolating linearly
/// between closest ranks.
#[must_use]
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => return 0.0,
        1 => return sorted[0],
        _ => {}
    }
    let pos = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

// =============================================================================
// Special functions
// =============================================================================

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEF: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural log of the gamma function for `x > 0`.
#[must_use]
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula.
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    let series = LANCZOS_COEF
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS_COEF[0], |acc, (i, c)| acc + c / (x + i as f64));
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// Continued fraction for the incomplete beta (modified Lentz).
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 3e-16;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;
    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularized incomplete beta function `I_x(a, b)`.
#[must_use]
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Two-sided p-value of a Student t statistic with `df` degrees of freedom.
#[must_use]
pub fn student_t_two_sided_p(t: f64, df: f64) -> f64 {
    if t.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    let x = df / (df + t * t);
    regularized_incomplete_beta(df / 2.0, 0.5, x).clamp(0.0, 1.0)
}

/// Complementary error function.
#[must_use]
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Standard normal CDF.
#[must_use]
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// Two-sided p-value of a standard normal statistic.
#[must_use]
pub fn normal_two_sided_p(z: f64) -> f64 {
    erfc(z.abs() / std::f64::consts::SQRT_2).clamp(0.0, 1.0)
}

// =============================================================================
// Bootstrap
// =============================================================================

/// Bootstrap settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of resamples.
    pub n_resamples: usize,
    /// Interval coverage, e.g. 0.95.
    pub confidence_level: f64,
    /// Fixed seed for reproducible intervals; entropy-seeded when `None`.
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_resamples: 10_000,
            confidence_level: 0.95,
            seed: None,
        }
    }
}

impl BootstrapConfig {
    /// Set the number of resamples.
    #[must_use]
    pub fn with_resamples(mut self, n: usize) -> Self {
        self.n_resamples = n;
        self
    }

    /// Set the confidence level.
    #[must_use]
    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    /// Fix the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// A fresh generator for one interval.
    #[must_use]
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Point estimate with a percentile bootstrap interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Statistic on the original data.
    pub estimate: f64,
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Interval width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Whether `value` lies inside the interval.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Percentile bootstrap interval of the mean.
///
/// ```
/// use ocrbench::eval::stats::{bootstrap_ci, BootstrapConfig};
///
/// let ci = bootstrap_ci(&[0.5; 8], &BootstrapConfig::default().with_seed(7));
/// assert_eq!((ci.lower, ci.estimate, ci.upper), (0.5, 0.5, 0.5));
/// ```
#[must_use]
pub fn bootstrap_ci(data: &[f64], config: &BootstrapConfig) -> ConfidenceInterval {
    bootstrap_ci_with(data, config, mean)
}

/// Percentile bootstrap interval of an arbitrary statistic.
///
/// Empty data yields `(0, 0, 0)`.
pub fn bootstrap_ci_with<F>(data: &[f64], config: &BootstrapConfig, statistic: F) -> ConfidenceInterval
where
    F: Fn(&[f64]) -> f64,
{
    if data.is_empty() {
        return ConfidenceInterval {
            estimate: 0.0,
            lower: 0.0,
            upper: 0.0,
        };
    }
    let estimate = statistic(data);
    if config.n_resamples == 0 {
        return ConfidenceInterval {
            estimate,
            lower: estimate,
            upper: estimate,
        };
    }

    let mut rng = config.rng();
    let n = data.len();
    let mut sample = vec![0.0; n];
    let mut stats: Vec<f64> = (0..config.n_resamples)
        .map(|_| {
            for slot in sample.iter_mut() {
                *slot = data[rng.gen_range(0..n)];
            }
            statistic(sample.as_slice())
        })
        .collect();
    stats.sort_by(f64::total_cmp);

    let alpha = (1.0 - config.confidence_level.clamp(0.0, 1.0)) / 2.0;
    ConfidenceInterval {
        estimate,
        lower: percentile_sorted(&stats, alpha * 100.0),
        upper: percentile_sorted(&stats, (1.0 - alpha) * 100.0),
    }
}
