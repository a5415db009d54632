// SPDX-License-Identifier: AGPL-3.0-only

//! Exact evaluation of one concrete point triple.
//!
//! The base case of the traversal: no pruning, no error accounting.
//! Each of the three points in turn plays the primary slot and receives
//! the pair of gradients along its two axes — the scalar sum into its
//! own-axis buffers, the partner-coordinate-weighted sum into its
//! cross-axis buffers. Exact values land in both the exact and the
//! bound accumulators.

use crate::forces::ForceAccumulators;
use crate::geometry::DIM;
use crate::kernel::distance::DistanceTable;
use crate::kernel::gradient::eval_gradient_bounds;

/// One point's share: gradients `neg_p/pos_p` along the axis to
/// `partner_p`, `neg_q/pos_q` along the axis to `partner_q`.
#[allow(clippy::too_many_arguments)]
fn contribute(
    positions: &[f64],
    target: usize,
    partner_p: usize,
    partner_q: usize,
    neg_p: f64,
    pos_p: f64,
    neg_q: f64,
    pos_q: f64,
    out: &mut ForceAccumulators,
) {
    out.negative_force1_e[target] += neg_p + neg_q;
    out.negative_force1_u[target] += neg_p + neg_q;
    out.positive_force1_l[target] += pos_p + pos_q;
    out.positive_force1_e[target] += pos_p + pos_q;

    for d in 0..DIM {
        let x_p = positions[partner_p * DIM + d];
        let x_q = positions[partner_q * DIM + d];
        let negative = neg_p * x_p + neg_q * x_q;
        let positive = pos_p * x_p + pos_q * x_q;
        out.negative_force2_e[target * DIM + d] += negative;
        out.negative_force2_u[target * DIM + d] += negative;
        out.positive_force2_l[target * DIM + d] += positive;
        out.positive_force2_e[target * DIM + d] += positive;
    }
}

/// Evaluate the exact force contribution of the triple `(i, j, k)` and
/// accumulate it for all three points.
///
/// Precondition: the indices are valid and the points are pairwise
/// distinct in space.
pub fn eval_exact(
    table: &mut DistanceTable,
    positions: &[f64],
    indices: [usize; 3],
    nu: f64,
    out: &mut ForceAccumulators,
) {
    table.fill_from_points(positions, indices);
    let exact = eval_gradient_bounds(table, nu);

    // Point mode collapses every interval; take the min endpoint.
    let (n1, p1) = (exact.g1.min_negative, exact.g1.min_positive);
    let (n2, p2) = (exact.g2.min_negative, exact.g2.min_positive);
    let (n3, p3) = (exact.g3.min_negative, exact.g3.min_positive);
    let [i, j, k] = indices;

    contribute(positions, i, j, k, n1, p1, n2, p2, out);
    contribute(positions, j, i, k, n1, p1, n3, p3, out);
    contribute(positions, k, i, j, n2, p2, n3, p3, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DIM;
    use crate::particles::{equilateral_triangle, random_cloud};
    use crate::tolerances::NET_FORCE_ABS;

    fn total_force(positions: &[f64], out: &ForceAccumulators) -> [f64; DIM] {
        let forces = out.net_force(positions);
        let mut total = [0.0; DIM];
        for p in 0..out.len() {
            for d in 0..DIM {
                total[d] += forces[p * DIM + d];
            }
        }
        total
    }

    #[test]
    fn equilateral_triple_has_zero_net_force() {
        let positions = equilateral_triangle(1.0);
        let mut table = DistanceTable::default();
        let mut out = ForceAccumulators::zeros(3);
        eval_exact(&mut table, &positions, [0, 1, 2], 1.0, &mut out);

        let total = total_force(&positions, &out);
        for d in 0..DIM {
            assert!(
                total[d].abs() < NET_FORCE_ABS,
                "net force component {d} = {} should vanish by symmetry",
                total[d]
            );
        }
    }

    #[test]
    fn arbitrary_triple_obeys_newtons_third_law() {
        // The decomposition F_p = x_p·Σg − Σg·x_partner cancels in the
        // sum for any geometry, not just symmetric ones.
        let positions = vec![
            0.0, 0.0, 0.0, //
            1.2, 0.1, -0.3, //
            0.4, 1.5, 0.8,
        ];
        let mut table = DistanceTable::default();
        let mut out = ForceAccumulators::zeros(3);
        eval_exact(&mut table, &positions, [0, 1, 2], 1.0, &mut out);

        let total = total_force(&positions, &out);
        for d in 0..DIM {
            assert!(total[d].abs() < NET_FORCE_ABS, "net force {d} = {}", total[d]);
        }
    }

    #[test]
    fn exact_and_bound_buffers_agree() {
        let positions = random_cloud(3, 3.0, 5);
        let mut table = DistanceTable::default();
        let mut out = ForceAccumulators::zeros(3);
        eval_exact(&mut table, &positions, [0, 1, 2], 1.0, &mut out);

        for p in 0..3 {
            assert_eq!(out.negative_force1_e[p], out.negative_force1_u[p]);
            assert_eq!(out.positive_force1_l[p], out.positive_force1_e[p]);
            for d in 0..DIM {
                assert_eq!(
                    out.negative_force2_e[p * DIM + d],
                    out.negative_force2_u[p * DIM + d]
                );
            }
        }
    }

    #[test]
    fn accumulation_is_additive() {
        let positions = random_cloud(4, 3.0, 8);
        let mut table = DistanceTable::default();

        let mut combined = ForceAccumulators::zeros(4);
        eval_exact(&mut table, &positions, [0, 1, 2], 1.0, &mut combined);
        eval_exact(&mut table, &positions, [0, 1, 3], 1.0, &mut combined);

        let mut separate_a = ForceAccumulators::zeros(4);
        eval_exact(&mut table, &positions, [0, 1, 2], 1.0, &mut separate_a);
        let mut separate_b = ForceAccumulators::zeros(4);
        eval_exact(&mut table, &positions, [0, 1, 3], 1.0, &mut separate_b);
        separate_a.merge(&separate_b);

        for p in 0..4 {
            assert!((combined.negative_force1_e[p] - separate_a.negative_force1_e[p]).abs() < 1e-15);
            assert!((combined.positive_force1_e[p] - separate_a.positive_force1_e[p]).abs() < 1e-15);
        }
    }
}
