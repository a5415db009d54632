// SPDX-License-Identifier: AGPL-3.0-only

//! Run configuration for the triple-force engine.

use serde::Serialize;

use crate::error::TripoleError;

/// Strength ν of the Axilrod-Teller potential in SI-derived reduced
/// units. Triple-dipole dispersion coefficients for noble gases sit
/// around 1e-18 in these units.
pub const AXILROD_TELLER_NU: f64 = 1e-18;

/// Configuration consumed by [`crate::traversal::compute_forces`].
#[derive(Clone, Debug, Serialize)]
#[must_use]
pub struct ForceConfig {
    /// Label for this case.
    pub label: String,
    /// Per-tuple relative error tolerance ε. Zero forces exact
    /// evaluation everywhere.
    pub relative_error: f64,
    /// Confidence multiplier for Monte Carlo error bounds
    /// (1.96 ≈ 95%).
    pub z_score: f64,
    /// Whether to attempt the Monte Carlo fallback when deterministic
    /// bounds are too loose.
    pub use_monte_carlo: bool,
    /// Accepted samples between statistical prune checks.
    pub mc_batch: usize,
    /// Ceiling on draw attempts per triple; guarantees the sampling
    /// loop terminates.
    pub mc_sample_cap: usize,
    /// Smallest slot population for which sampling is worthwhile.
    pub mc_min_count: usize,
    /// Maximum particles per tree leaf.
    pub leaf_capacity: usize,
    /// Potential strength ν.
    pub nu: f64,
    /// Seed for the sampling stream; same seed, same run.
    pub mc_seed: u64,
}

impl ForceConfig {
    /// Reject out-of-domain fields before a run.
    pub fn validate(&self) -> Result<(), TripoleError> {
        if self.relative_error < 0.0 || !self.relative_error.is_finite() {
            return Err(TripoleError::BadConfig(
                "relative_error",
                format!("must be finite and >= 0, got {}", self.relative_error),
            ));
        }
        if self.z_score < 0.0 || !self.z_score.is_finite() {
            return Err(TripoleError::BadConfig(
                "z_score",
                format!("must be finite and >= 0, got {}", self.z_score),
            ));
        }
        if self.use_monte_carlo && self.mc_batch < 2 {
            return Err(TripoleError::BadConfig(
                "mc_batch",
                format!("variance needs at least 2 samples per batch, got {}", self.mc_batch),
            ));
        }
        Ok(())
    }

    /// Exact evaluation through the tree: nothing prunes, every tuple
    /// is visited. The parity baseline.
    pub fn exact(label: &str) -> Self {
        Self {
            label: label.to_string(),
            relative_error: 0.0,
            z_score: 0.0,
            use_monte_carlo: false,
            mc_batch: 25,
            mc_sample_cap: 0,
            mc_min_count: usize::MAX,
            leaf_capacity: 8,
            nu: 1.0,
            mc_seed: 42,
        }
    }

    /// Deterministic pruning at a given relative error, no sampling.
    pub fn deterministic(label: &str, relative_error: f64) -> Self {
        Self {
            label: label.to_string(),
            relative_error,
            z_score: 0.0,
            use_monte_carlo: false,
            mc_batch: 25,
            mc_sample_cap: 0,
            mc_min_count: usize::MAX,
            leaf_capacity: 8,
            nu: 1.0,
            mc_seed: 42,
        }
    }

    /// Full pipeline: deterministic pruning with the Monte Carlo
    /// fallback at ~95% confidence, batch size matching the original
    /// study configuration.
    pub fn approximate(label: &str, relative_error: f64) -> Self {
        Self {
            label: label.to_string(),
            relative_error,
            z_score: 1.96,
            use_monte_carlo: true,
            mc_batch: 25,
            mc_sample_cap: 10_000,
            mc_min_count: 32,
            leaf_capacity: 8,
            nu: 1.0,
            mc_seed: 42,
        }
    }

    /// Physical ν instead of the unit-strength test value.
    pub fn with_physical_nu(mut self) -> Self {
        self.nu = AXILROD_TELLER_NU;
        self
    }
}
