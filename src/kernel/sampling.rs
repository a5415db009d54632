// SPDX-License-Identifier: AGPL-3.0-only

//! Monte Carlo fallback for triples whose deterministic bounds are too
//! loose to prune.
//!
//! Repeatedly draws one point index uniformly from each slot's range,
//! discarding draws that are not strictly increasing (each unordered
//! point-triple is counted at most once), folds the exact gradients of
//! accepted draws into running statistics, and at every batch boundary
//! re-evaluates the confidence-interval error against the budget. On
//! success the sampled means stand in for both interval endpoints and
//! the contribution is propagated like a deterministic prune.
//!
//! Termination: every draw attempt (accepted or rejected) counts
//! against `sample_cap`, so the loop cannot spin on an ordering
//! constraint that rejects nearly everything. No state survives across
//! triples.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::kernel::distance::DistanceTable;
use crate::kernel::error_model::monte_carlo_errors;
use crate::kernel::gradient::{eval_gradient_bounds, ComponentBounds, GradientBounds};
use crate::kernel::prune::{propagate, prunable, two_tuple_counts, PruneParams};
use crate::tree::TreeNode;

/// Running order statistics and moments of one sampled component.
#[derive(Clone, Copy, Debug)]
pub struct RunningStat {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub sum_sq: f64,
}

impl Default for RunningStat {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }
}

impl RunningStat {
    fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Sample mean over `n` accepted draws.
    #[must_use]
    pub fn mean(&self, n: usize) -> f64 {
        self.sum / n as f64
    }
}

/// Per-component running statistics for one triple's sampling run.
#[derive(Clone, Debug, Default)]
pub struct TripleSampleStats {
    pub negative1: RunningStat,
    pub positive1: RunningStat,
    pub negative2: RunningStat,
    pub positive2: RunningStat,
    pub negative3: RunningStat,
    pub positive3: RunningStat,
    accepted: usize,
}

impl TripleSampleStats {
    /// Fold one accepted draw's six exact gradient components.
    pub fn record(&mut self, n1: f64, p1: f64, n2: f64, p2: f64, n3: f64, p3: f64) {
        self.negative1.update(n1);
        self.positive1.update(p1);
        self.negative2.update(n2);
        self.positive2.update(p2);
        self.negative3.update(n3);
        self.positive3.update(p3);
        self.accepted += 1;
    }

    /// Number of accepted draws.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Degenerate interval bounds (min = max = sampled mean) for
    /// propagation after a successful statistical prune.
    #[must_use]
    pub fn mean_bounds(&self) -> GradientBounds {
        let n = self.accepted;
        GradientBounds {
            g1: ComponentBounds::degenerate(self.negative1.mean(n), self.positive1.mean(n)),
            g2: ComponentBounds::degenerate(self.negative2.mean(n), self.positive2.mean(n)),
            g3: ComponentBounds::degenerate(self.negative3.mean(n), self.positive3.mean(n)),
        }
    }
}

/// Draw one index per slot range; `Some` only for strictly increasing
/// triples.
#[must_use]
pub fn draw_ordered_triple(
    rng: &mut ChaCha8Rng,
    ranges: [(usize, usize); 3],
) -> Option<[usize; 3]> {
    let i = rng.gen_range(ranges[0].0..ranges[0].1);
    let j = rng.gen_range(ranges[1].0..ranges[1].1);
    let k = rng.gen_range(ranges[2].0..ranges[2].1);
    (i < j && j < k).then_some([i, j, k])
}

/// Attempt a statistical prune of the slot triple.
#[allow(clippy::too_many_arguments)]
pub fn monte_carlo_prune(
    table: &mut DistanceTable,
    nodes: &mut [TreeNode],
    slots: [usize; 3],
    positions: &[f64],
    nu: f64,
    batch: usize,
    sample_cap: usize,
    params: &PruneParams,
    rng: &mut ChaCha8Rng,
) -> bool {
    let counts = two_tuple_counts(nodes, slots);
    let ranges = [
        (nodes[slots[0]].begin, nodes[slots[0]].end),
        (nodes[slots[1]].begin, nodes[slots[1]].end),
        (nodes[slots[2]].begin, nodes[slots[2]].end),
    ];
    let batch = batch.max(2);

    let mut stats = TripleSampleStats::default();
    let mut attempts = 0usize;
    let mut since_check = 0usize;

    while attempts < sample_cap {
        attempts += 1;
        let Some(indices) = draw_ordered_triple(rng, ranges) else {
            continue;
        };

        table.fill_from_points(positions, indices);
        if table.has_zero_min() {
            // Coincident sampled points: the gradient is singular there.
            continue;
        }
        let exact = eval_gradient_bounds(table, nu);
        stats.record(
            exact.g1.min_negative,
            exact.g1.min_positive,
            exact.g2.min_negative,
            exact.g2.min_positive,
            exact.g3.min_negative,
            exact.g3.min_positive,
        );
        since_check += 1;

        if since_check == batch {
            since_check = 0;
            if let Some(errors) = monte_carlo_errors(&stats, params.z_score) {
                if errors.all_finite() && prunable(nodes, slots, &errors, &counts, params) {
                    propagate(nodes, slots, &stats.mean_bounds(), &counts);
                    return true;
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::tree::NodeStats;
    use rand::SeedableRng;

    #[test]
    fn running_stat_tracks_moments() {
        let mut stat = RunningStat::default();
        for v in [2.0, -1.0, 4.0] {
            stat.update(v);
        }
        assert_eq!(stat.min, -1.0);
        assert_eq!(stat.max, 4.0);
        assert_eq!(stat.sum, 5.0);
        assert_eq!(stat.sum_sq, 21.0);
        assert!((stat.mean(3) - 5.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn draws_respect_strict_ordering() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let ranges = [(0, 6), (0, 6), (0, 6)];
        let mut accepted = 0;
        for _ in 0..500 {
            if let Some([i, j, k]) = draw_ordered_triple(&mut rng, ranges) {
                assert!(i < j && j < k, "accepted draw must be strictly ordered");
                accepted += 1;
            }
        }
        assert!(accepted > 0, "C(6,3) = 20 ordered triples exist; some must be drawn");
    }

    #[test]
    fn draws_are_deterministic_per_seed() {
        let ranges = [(0, 10), (10, 20), (20, 30)];
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            assert_eq!(
                draw_ordered_triple(&mut a, ranges),
                draw_ordered_triple(&mut b, ranges)
            );
        }
    }

    fn leaf(begin: usize, end: usize, positions: &[f64]) -> TreeNode {
        TreeNode {
            begin,
            end,
            bound: BoundingBox::from_points(positions, begin, end),
            children: None,
            stats: NodeStats::default(),
        }
    }

    fn three_cluster_nodes() -> (Vec<f64>, Vec<TreeNode>) {
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let mut positions = Vec::new();
        for center in [0.0, 10.0, 20.0] {
            for _ in 0..8 {
                positions.push(center + rng.gen_range(0.0..1.0));
                positions.push(rng.gen_range(0.0..1.0));
                positions.push(rng.gen_range(0.0..1.0));
            }
        }
        let nodes = vec![
            leaf(0, 8, &positions),
            leaf(8, 16, &positions),
            leaf(16, 24, &positions),
        ];
        (positions, nodes)
    }

    #[test]
    fn cap_guarantees_termination_without_budget() {
        let (positions, mut nodes) = three_cluster_nodes();
        let mut table = DistanceTable::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let params = PruneParams {
            relative_error: 0.1,
            z_score: 1.96,
            total_n_minus_one_tuples: 253.0,
        };
        // All budgets zero: never prunable, must stop at the cap.
        let pruned = monte_carlo_prune(
            &mut table,
            &mut nodes,
            [0, 1, 2],
            &positions,
            1.0,
            25,
            200,
            &params,
            &mut rng,
        );
        assert!(!pruned);
    }

    #[test]
    fn seeded_budget_prunes_with_mean_estimate() {
        let (positions, mut nodes) = three_cluster_nodes();
        for node in &mut nodes {
            node.stats.negative_gradient1_u = -1e12;
            node.stats.positive_gradient1_l = 1e12;
            node.stats.negative_gradient2_u = [-1e12; 3];
            node.stats.positive_gradient2_l = [1e12; 3];
        }
        let mut table = DistanceTable::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let params = PruneParams {
            relative_error: 0.5,
            z_score: 1.96,
            total_n_minus_one_tuples: 253.0,
        };
        let pruned = monte_carlo_prune(
            &mut table,
            &mut nodes,
            [0, 1, 2],
            &positions,
            1.0,
            25,
            10_000,
            &params,
            &mut rng,
        );
        assert!(pruned, "huge accumulated magnitude must accept the sampled mean");

        // Degenerate (mean) bounds: exact and bound accumulators agree.
        let stats = &nodes[0].stats;
        assert!(stats.postponed_negative_gradient1_e < 0.0);
        assert!(stats.postponed_positive_gradient1_l > 0.0);
        assert_eq!(
            stats.postponed_negative_gradient1_e,
            stats.postponed_negative_gradient1_u
        );
        assert_eq!(
            stats.postponed_positive_gradient1_l,
            stats.postponed_positive_gradient1_e
        );
    }
}
