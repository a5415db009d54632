// SPDX-License-Identifier: AGPL-3.0-only

//! Error estimates for approximated gradient components.
//!
//! Two independent estimators, one per pruning mode:
//!
//! - *Deterministic*: half the interval width per signed component —
//!   the worst-case distance of the midpoint estimate from the truth.
//! - *Statistical*: z · sqrt(sample variance) from a Monte Carlo draw.
//!   This is the spread of a *single* draw, not of the mean; the bound
//!   must cover worst-case tuples, so the conservative choice is
//!   deliberate.
//!
//! A non-finite estimate (bounding-box distance collapsing toward zero)
//! means the caller must abstain from pruning.

use crate::kernel::gradient::GradientBounds;
use crate::kernel::sampling::TripleSampleStats;

/// Per-component error estimates for one triple: negative/positive part
/// of each of the three gradient axes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComponentErrors {
    pub negative1: f64,
    pub positive1: f64,
    pub negative2: f64,
    pub positive2: f64,
    pub negative3: f64,
    pub positive3: f64,
}

impl ComponentErrors {
    /// Whether every estimate is finite and usable for a budget test.
    #[must_use]
    pub fn all_finite(&self) -> bool {
        self.negative1.is_finite()
            && self.positive1.is_finite()
            && self.negative2.is_finite()
            && self.positive2.is_finite()
            && self.negative3.is_finite()
            && self.positive3.is_finite()
    }
}

/// Finite-difference error: half the bound width per signed component.
#[must_use]
pub fn finite_difference_errors(bounds: &GradientBounds) -> ComponentErrors {
    ComponentErrors {
        negative1: (bounds.g1.max_negative - bounds.g1.min_negative) * 0.5,
        positive1: (bounds.g1.max_positive - bounds.g1.min_positive) * 0.5,
        negative2: (bounds.g2.max_negative - bounds.g2.min_negative) * 0.5,
        positive2: (bounds.g2.max_positive - bounds.g2.min_positive) * 0.5,
        negative3: (bounds.g3.max_negative - bounds.g3.min_negative) * 0.5,
        positive3: (bounds.g3.max_positive - bounds.g3.min_positive) * 0.5,
    }
}

/// Sample variance from running sum and sum-of-squares:
/// `(sum_sq − sum²/n) / (n − 1)`. Clamped at zero against rounding.
#[must_use]
pub fn sample_variance(sum: f64, sum_sq: f64, n: usize) -> f64 {
    let n_f = n as f64;
    ((sum_sq - sum * sum / n_f) / (n_f - 1.0)).max(0.0)
}

/// Monte Carlo error: z · sqrt(sample variance) per component.
///
/// Returns `None` below two accepted samples (variance undefined); the
/// sampler keeps drawing in that case.
#[must_use]
pub fn monte_carlo_errors(stats: &TripleSampleStats, z_score: f64) -> Option<ComponentErrors> {
    let n = stats.accepted();
    if n < 2 {
        return None;
    }
    let spread = |sum: f64, sum_sq: f64| z_score * sample_variance(sum, sum_sq, n).sqrt();
    Some(ComponentErrors {
        negative1: spread(stats.negative1.sum, stats.negative1.sum_sq),
        positive1: spread(stats.positive1.sum, stats.positive1.sum_sq),
        negative2: spread(stats.negative2.sum, stats.negative2.sum_sq),
        positive2: spread(stats.positive2.sum, stats.positive2.sum_sq),
        negative3: spread(stats.negative3.sum, stats.negative3.sum_sq),
        positive3: spread(stats.positive3.sum, stats.positive3.sum_sq),
    })
}
