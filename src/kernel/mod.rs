// SPDX-License-Identifier: AGPL-3.0-only

//! The Axilrod-Teller triple-interaction kernel.
//!
//! Three entry points, one per traversal decision:
//!
//! | Call | Path | Side effect |
//! |------|------|-------------|
//! | `try_prune` | deterministic interval bounds | postponed statistics on success |
//! | `try_prune_monte_carlo` | sampled confidence bounds | postponed statistics on success |
//! | `evaluate_exact` | concrete point triple | per-point force buffers |
//!
//! The kernel owns one scratch [`DistanceTable`] reused across calls:
//! a single instance must not evaluate two triples concurrently, but
//! independent instances may run in parallel as long as writes to a
//! region's statistics are serialized by the caller.

pub mod direct;
pub mod distance;
pub mod error_model;
pub mod gradient;
pub mod prune;
pub mod sampling;

use rand_chacha::ChaCha8Rng;

pub use distance::DistanceTable;
pub use gradient::{ComponentBounds, GradientBounds};
pub use prune::{two_tuple_counts, PruneParams, TwoTupleCounts};

use crate::config::ForceConfig;
use crate::forces::ForceAccumulators;
use crate::kernel::error_model::finite_difference_errors;
use crate::kernel::gradient::eval_gradient_bounds;
use crate::tree::TreeNode;

/// Triple-interaction kernel with reusable scratch state.
#[derive(Debug)]
pub struct AxilrodTellerKernel {
    nu: f64,
    mc_batch: usize,
    mc_sample_cap: usize,
    table: DistanceTable,
}

impl AxilrodTellerKernel {
    #[must_use]
    pub fn new(nu: f64, mc_batch: usize, mc_sample_cap: usize) -> Self {
        Self {
            nu,
            mc_batch,
            mc_sample_cap,
            table: DistanceTable::default(),
        }
    }

    #[must_use]
    pub fn from_config(cfg: &ForceConfig) -> Self {
        Self::new(cfg.nu, cfg.mc_batch, cfg.mc_sample_cap)
    }

    /// Potential strength ν.
    #[must_use]
    pub fn nu(&self) -> f64 {
        self.nu
    }

    /// Deterministic prune attempt for a region triple. On success the
    /// contribution is already propagated into the three regions'
    /// postponed statistics.
    ///
    /// Refuses (returns `false`) on a zero minimum pair distance or any
    /// non-finite bound — the conservative resolution for degenerate
    /// geometry and numeric overflow.
    pub fn try_prune(
        &mut self,
        nodes: &mut [TreeNode],
        slots: [usize; 3],
        params: &PruneParams,
    ) -> bool {
        self.table.fill_from_regions(nodes, slots);
        if self.table.has_zero_min() {
            return false;
        }

        let bounds = eval_gradient_bounds(&self.table, self.nu);
        if !bounds.all_finite() {
            return false;
        }

        let errors = finite_difference_errors(&bounds);
        if !errors.all_finite() {
            return false;
        }

        let counts = two_tuple_counts(nodes, slots);
        if prune::prunable(nodes, slots, &errors, &counts, params) {
            prune::propagate(nodes, slots, &bounds, &counts);
            true
        } else {
            false
        }
    }

    /// Monte Carlo prune attempt; same success side effect as
    /// [`Self::try_prune`], with sampled means standing in for the
    /// interval endpoints.
    pub fn try_prune_monte_carlo(
        &mut self,
        nodes: &mut [TreeNode],
        slots: [usize; 3],
        positions: &[f64],
        params: &PruneParams,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        sampling::monte_carlo_prune(
            &mut self.table,
            nodes,
            slots,
            positions,
            self.nu,
            self.mc_batch,
            self.mc_sample_cap,
            params,
            rng,
        )
    }

    /// Exact evaluation of one concrete point triple.
    pub fn evaluate_exact(
        &mut self,
        positions: &[f64],
        indices: [usize; 3],
        out: &mut ForceAccumulators,
    ) {
        direct::eval_exact(&mut self.table, positions, indices, self.nu, out);
    }
}
