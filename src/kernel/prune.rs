// SPDX-License-Identifier: AGPL-3.0-only

//! Prunability test and contribution propagation for a region triple.
//!
//! A triple may be summarized only when, for every one of its three
//! slots, the error charged to that slot's region stays within the
//! region's budget: the global per-tuple relative error times the
//! gradient magnitude the region has already provably accumulated.
//! Aliased slots (the same region appearing twice or three times) share
//! one verdict so the budget is not charged twice under two role
//! labels.
//!
//! On success the contribution of every point-triple in the candidate
//! is folded into each region's postponed statistics: the pair-count-
//! weighted interval midpoint into the exact accumulators, the
//! conservative extreme into the bound accumulators, and the partners'
//! coordinate sums into the cross-axis vector accumulators.

use crate::geometry::{add_scaled, l1_norm, DIM};
use crate::kernel::error_model::ComponentErrors;
use crate::kernel::gradient::{ComponentBounds, GradientBounds};
use crate::tree::{NodeStats, TreeNode};

/// Global pruning parameters, passed explicitly through every call.
#[derive(Clone, Copy, Debug)]
pub struct PruneParams {
    /// Relative error tolerance ε.
    pub relative_error: f64,
    /// Confidence multiplier for the Monte Carlo error (e.g. 1.96).
    pub z_score: f64,
    /// Global budget normalizer: C(n − 1, 2) for the full particle set.
    pub total_n_minus_one_tuples: f64,
}

/// Unordered pair counts contributed by the two partner regions of each
/// slot, with the combinatorial aliasing correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TwoTupleCounts {
    /// Pairs drawn from slots 1 and 2 (partners of slot 0).
    pub jk: f64,
    /// Pairs drawn from slots 0 and 2 (partners of slot 1).
    pub ik: f64,
    /// Pairs drawn from slots 0 and 1 (partners of slot 2).
    pub ij: f64,
}

fn choose2(count: f64) -> f64 {
    (count * (count - 1.0) * 0.5).max(0.0)
}

/// Pair counts for a slot triple, collapsing aliased slots: C(a−1, 2)
/// when all three coincide, (a−1)·b / C(a, 2) when two coincide, plain
/// products when all distinct. Canonical ordering makes `a == c` with
/// `a != b` impossible.
#[must_use]
pub fn two_tuple_counts(nodes: &[TreeNode], [a, b, c]: [usize; 3]) -> TwoTupleCounts {
    let count_a = nodes[a].count() as f64;
    let count_b = nodes[b].count() as f64;
    let count_c = nodes[c].count() as f64;

    if a == b {
        if b == c {
            let shared = choose2(count_a - 1.0);
            TwoTupleCounts {
                jk: shared,
                ik: shared,
                ij: shared,
            }
        } else {
            TwoTupleCounts {
                jk: (count_a - 1.0) * count_c,
                ik: (count_a - 1.0) * count_c,
                ij: choose2(count_a),
            }
        }
    } else if b == c {
        TwoTupleCounts {
            jk: choose2(count_b),
            ik: count_a * (count_c - 1.0),
            ij: count_a * (count_b - 1.0),
        }
    } else {
        TwoTupleCounts {
            jk: count_b * count_c,
            ik: count_a * count_c,
            ij: count_a * count_b,
        }
    }
}

/// Total number of strictly ordered point triples in a slot triple.
#[must_use]
pub fn num_tuples(nodes: &[TreeNode], [a, b, c]: [usize; 3]) -> f64 {
    let count_a = nodes[a].count() as f64;
    if a == b && b == c {
        (count_a * (count_a - 1.0) * (count_a - 2.0) / 6.0).max(0.0)
    } else if a == b {
        choose2(count_a) * nodes[c].count() as f64
    } else if b == c {
        count_a * choose2(nodes[b].count() as f64)
    } else {
        count_a * nodes[b].count() as f64 * nodes[c].count() as f64
    }
}

/// One slot's budget test. `p` and `q` are the slot's two partner
/// regions; `err_p`/`err_q` the signed errors of the pair axes joining
/// the slot to them.
#[allow(clippy::too_many_arguments)]
fn slot_prunable(
    stats: &NodeStats,
    p_count: f64,
    p_l1: f64,
    err_p_neg: f64,
    err_p_pos: f64,
    q_count: f64,
    q_l1: f64,
    err_q_neg: f64,
    err_q_pos: f64,
    num_pairs: f64,
    params: &PruneParams,
) -> bool {
    let per_tuple = params.relative_error / params.total_n_minus_one_tuples;

    let own_negative = (err_p_neg + err_q_neg)
        <= per_tuple
            * (stats.negative_gradient1_u + stats.postponed_negative_gradient1_u).abs();
    let own_positive = (err_p_pos + err_q_pos)
        <= per_tuple * (stats.positive_gradient1_l + stats.postponed_positive_gradient1_l);

    let cross_budget = params.relative_error * num_pairs / params.total_n_minus_one_tuples;
    let negative_l1 =
        l1_norm(&stats.negative_gradient2_u) + l1_norm(&stats.postponed_negative_gradient2_u);
    let positive_l1 =
        l1_norm(&stats.positive_gradient2_l) + l1_norm(&stats.postponed_positive_gradient2_l);

    let cross_negative = q_count * p_l1 * err_p_neg + p_count * q_l1 * err_q_neg
        <= cross_budget * negative_l1;
    let cross_positive = q_count * p_l1 * err_p_pos + p_count * q_l1 * err_q_pos
        <= cross_budget * positive_l1;

    own_negative && own_positive && cross_negative && cross_positive
}

/// Whether all three slots accept the approximation. Evaluated
/// short-circuit in slot order; an aliased slot reuses the verdict of
/// the slot it aliases.
#[must_use]
pub fn prunable(
    nodes: &[TreeNode],
    [a, b, c]: [usize; 3],
    errors: &ComponentErrors,
    counts: &TwoTupleCounts,
    params: &PruneParams,
) -> bool {
    let count = |id: usize| nodes[id].count() as f64;
    let l1 = |id: usize| nodes[id].stats.l1_norm_coordinate_sum;

    let slot0 = slot_prunable(
        &nodes[a].stats,
        count(b),
        l1(b),
        errors.negative1,
        errors.positive1,
        count(c),
        l1(c),
        errors.negative2,
        errors.positive2,
        counts.jk,
        params,
    );
    if !slot0 {
        return false;
    }

    let slot1 = if b == a {
        slot0
    } else {
        slot_prunable(
            &nodes[b].stats,
            count(a),
            l1(a),
            errors.negative1,
            errors.positive1,
            count(c),
            l1(c),
            errors.negative3,
            errors.positive3,
            counts.ik,
            params,
        )
    };
    if !slot1 {
        return false;
    }

    if c == b {
        slot1
    } else {
        slot_prunable(
            &nodes[c].stats,
            count(a),
            l1(a),
            errors.negative2,
            errors.positive2,
            count(b),
            l1(b),
            errors.negative3,
            errors.positive3,
            counts.ij,
            params,
        )
    }
}

#[derive(Clone, Copy)]
struct PartnerView {
    count: f64,
    coordinate_sum: [f64; DIM],
}

fn partner_view(nodes: &[TreeNode], id: usize) -> PartnerView {
    PartnerView {
        count: nodes[id].count() as f64,
        coordinate_sum: nodes[id].stats.coordinate_sum,
    }
}

/// Fold one slot's share into its postponed statistics.
fn propagate_slot(
    nodes: &mut [TreeNode],
    self_id: usize,
    p: PartnerView,
    q: PartnerView,
    b_p: ComponentBounds,
    b_q: ComponentBounds,
    num_pairs: f64,
) {
    let stats = &mut nodes[self_id].stats;

    stats.postponed_negative_gradient1_e += num_pairs
        * 0.5
        * (b_p.min_negative + b_p.max_negative + b_q.min_negative + b_q.max_negative);
    stats.postponed_negative_gradient1_u += num_pairs * (b_p.max_negative + b_q.max_negative);
    stats.postponed_positive_gradient1_l += num_pairs * (b_p.min_positive + b_q.min_positive);
    stats.postponed_positive_gradient1_e += num_pairs
        * 0.5
        * (b_p.min_positive + b_p.max_positive + b_q.min_positive + b_q.max_positive);

    add_scaled(
        &mut stats.postponed_negative_gradient2_e,
        q.count * 0.5 * (b_p.min_negative + b_p.max_negative),
        &p.coordinate_sum,
    );
    add_scaled(
        &mut stats.postponed_negative_gradient2_e,
        p.count * 0.5 * (b_q.min_negative + b_q.max_negative),
        &q.coordinate_sum,
    );
    add_scaled(
        &mut stats.postponed_negative_gradient2_u,
        q.count * b_p.max_negative,
        &p.coordinate_sum,
    );
    add_scaled(
        &mut stats.postponed_negative_gradient2_u,
        p.count * b_q.max_negative,
        &q.coordinate_sum,
    );
    add_scaled(
        &mut stats.postponed_positive_gradient2_l,
        q.count * b_p.min_positive,
        &p.coordinate_sum,
    );
    add_scaled(
        &mut stats.postponed_positive_gradient2_l,
        p.count * b_q.min_positive,
        &q.coordinate_sum,
    );
    add_scaled(
        &mut stats.postponed_positive_gradient2_e,
        q.count * 0.5 * (b_p.min_positive + b_p.max_positive),
        &p.coordinate_sum,
    );
    add_scaled(
        &mut stats.postponed_positive_gradient2_e,
        p.count * 0.5 * (b_q.min_positive + b_q.max_positive),
        &q.coordinate_sum,
    );
}

/// Distribute a pruned triple's contribution into the three regions'
/// postponed statistics, skipping a slot that aliases the one before
/// it. Touches nothing outside the three regions' own statistics.
pub fn propagate(
    nodes: &mut [TreeNode],
    [a, b, c]: [usize; 3],
    bounds: &GradientBounds,
    counts: &TwoTupleCounts,
) {
    let view_a = partner_view(nodes, a);
    let view_b = partner_view(nodes, b);
    let view_c = partner_view(nodes, c);

    propagate_slot(nodes, a, view_b, view_c, bounds.g1, bounds.g2, counts.jk);
    if b != a {
        propagate_slot(nodes, b, view_a, view_c, bounds.g1, bounds.g3, counts.ik);
    }
    if c != b {
        propagate_slot(nodes, c, view_a, view_b, bounds.g2, bounds.g3, counts.ij);
    }
}
