// SPDX-License-Identifier: AGPL-3.0-only

//! Arena kd-tree over the particle set.
//!
//! Nodes live in a flat `Vec` and are addressed by index, so aliasing
//! between the three slots of an interaction triple is a plain integer
//! comparison. Build is a median split on the widest axis; every node
//! owns a contiguous `[begin, end)` range into the (physically
//! reordered) position array, and the permutation back to the caller's
//! order is retained in `old_from_new`.
//!
//! Each node carries a [`NodeStats`] record: running bounds on the
//! force-gradient mass its particles have accumulated, plus "postponed"
//! twins holding contributions that were approximated at this node and
//! not yet pushed down. The postponed amounts must be flushed top-down
//! before per-particle values are read; `flush_postponed` does exactly
//! that and leaves every postponed field zero.

use crate::error::TripoleError;
use crate::forces::ForceAccumulators;
use crate::geometry::{BoundingBox, DIM};

/// Per-region statistics mutated by the pruning kernel.
///
/// Scalar fields are own-axis gradient accumulators; `[f64; DIM]`
/// fields are cross-axis (coordinate-weighted) accumulators. Suffixes:
/// `_e` exact estimate, `_u` upper bound (negative parts), `_l` lower
/// bound (positive parts).
#[derive(Clone, Debug, Default)]
pub struct NodeStats {
    pub negative_gradient1_e: f64,
    pub negative_gradient1_u: f64,
    pub positive_gradient1_l: f64,
    pub positive_gradient1_e: f64,
    pub negative_gradient2_e: [f64; DIM],
    pub negative_gradient2_u: [f64; DIM],
    pub positive_gradient2_l: [f64; DIM],
    pub positive_gradient2_e: [f64; DIM],

    pub postponed_negative_gradient1_e: f64,
    pub postponed_negative_gradient1_u: f64,
    pub postponed_positive_gradient1_l: f64,
    pub postponed_positive_gradient1_e: f64,
    pub postponed_negative_gradient2_e: [f64; DIM],
    pub postponed_negative_gradient2_u: [f64; DIM],
    pub postponed_positive_gradient2_l: [f64; DIM],
    pub postponed_positive_gradient2_e: [f64; DIM],

    /// Sum of member positions, fixed at build time.
    pub coordinate_sum: [f64; DIM],
    /// Sum of absolute member coordinates: an upper bound on the L1
    /// norm of any signed recombination of the region's coordinates.
    pub l1_norm_coordinate_sum: f64,
}

/// One region of the decomposition.
#[derive(Clone, Debug)]
pub struct TreeNode {
    /// First particle index (tree order, inclusive).
    pub begin: usize,
    /// One past the last particle index (tree order, exclusive).
    pub end: usize,
    /// Tight axis-aligned bound over the member particles.
    pub bound: BoundingBox,
    /// Child node indices, `None` for a leaf.
    pub children: Option<(usize, usize)>,
    /// Mutable statistics record.
    pub stats: NodeStats,
}

impl TreeNode {
    /// Number of particles in the region.
    #[must_use]
    pub fn count(&self) -> usize {
        self.end - self.begin
    }

    /// Whether the node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// The full decomposition: node arena + reordered positions.
#[derive(Debug)]
pub struct TripleTree {
    /// Node arena; root at index 0.
    pub nodes: Vec<TreeNode>,
    /// Positions reordered so every node's range is contiguous.
    pub positions: Vec<f64>,
    /// `old_from_new[t]` = original index of tree-order particle `t`.
    pub old_from_new: Vec<usize>,
}

/// Signed merge toward zero: keeps `|result| <= |a|` and `<= |b|`, so a
/// bound valid for each child stays valid for the union.
#[must_use]
pub fn merge_toward_zero(a: f64, b: f64) -> f64 {
    if a.signum() != b.signum() {
        0.0
    } else if a.abs() <= b.abs() {
        a
    } else {
        b
    }
}

impl TripleTree {
    /// Build a tree over a flat position array (stride [`DIM`]).
    ///
    /// Leaves hold at most `leaf_capacity` particles (minimum 1).
    pub fn build(positions: &[f64], leaf_capacity: usize) -> Result<Self, TripoleError> {
        if positions.is_empty() {
            return Err(TripoleError::EmptySystem);
        }
        if positions.len() % DIM != 0 {
            return Err(TripoleError::MalformedPositions(positions.len()));
        }
        let n = positions.len() / DIM;
        let leaf_capacity = leaf_capacity.max(1);

        let mut perm: Vec<usize> = (0..n).collect();
        let mut nodes = Vec::new();
        build_recursive(&mut nodes, &mut perm, 0, n, positions, leaf_capacity);

        // Physically reorder so node ranges index contiguous particles.
        let mut reordered = vec![0.0; positions.len()];
        for (t, &orig) in perm.iter().enumerate() {
            reordered[t * DIM..t * DIM + DIM]
                .copy_from_slice(&positions[orig * DIM..orig * DIM + DIM]);
        }

        Ok(Self {
            nodes,
            positions: reordered,
            old_from_new: perm,
        })
    }

    /// Total particle count.
    #[must_use]
    pub fn n_particles(&self) -> usize {
        self.old_from_new.len()
    }

    /// Push every node's postponed statistics down to its children and,
    /// at leaves, into the per-particle accumulators; absorb them into
    /// the leaf's own accumulators on the way. All postponed fields are
    /// zero afterwards.
    pub fn flush_postponed(&mut self, out: &mut ForceAccumulators) {
        self.flush_node(0, out);
    }

    fn flush_node(&mut self, id: usize, out: &mut ForceAccumulators) {
        let (children, begin, end) = {
            let node = &self.nodes[id];
            (node.children, node.begin, node.end)
        };

        // Detach this node's postponed contribution.
        let carried = {
            let stats = &mut self.nodes[id].stats;
            let carried = (
                stats.postponed_negative_gradient1_e,
                stats.postponed_negative_gradient1_u,
                stats.postponed_positive_gradient1_l,
                stats.postponed_positive_gradient1_e,
                stats.postponed_negative_gradient2_e,
                stats.postponed_negative_gradient2_u,
                stats.postponed_positive_gradient2_l,
                stats.postponed_positive_gradient2_e,
            );
            stats.postponed_negative_gradient1_e = 0.0;
            stats.postponed_negative_gradient1_u = 0.0;
            stats.postponed_positive_gradient1_l = 0.0;
            stats.postponed_positive_gradient1_e = 0.0;
            stats.postponed_negative_gradient2_e = [0.0; DIM];
            stats.postponed_negative_gradient2_u = [0.0; DIM];
            stats.postponed_positive_gradient2_l = [0.0; DIM];
            stats.postponed_positive_gradient2_e = [0.0; DIM];
            carried
        };
        let (n1e, n1u, p1l, p1e, n2e, n2u, p2l, p2e) = carried;

        match children {
            Some((left, right)) => {
                for child in [left, right] {
                    let stats = &mut self.nodes[child].stats;
                    stats.postponed_negative_gradient1_e += n1e;
                    stats.postponed_negative_gradient1_u += n1u;
                    stats.postponed_positive_gradient1_l += p1l;
                    stats.postponed_positive_gradient1_e += p1e;
                    for d in 0..DIM {
                        stats.postponed_negative_gradient2_e[d] += n2e[d];
                        stats.postponed_negative_gradient2_u[d] += n2u[d];
                        stats.postponed_positive_gradient2_l[d] += p2l[d];
                        stats.postponed_positive_gradient2_e[d] += p2e[d];
                    }
                }
                self.flush_node(left, out);
                self.flush_node(right, out);
            }
            None => {
                // Absorb into the leaf's own accumulators, then deliver
                // to every member particle.
                let stats = &mut self.nodes[id].stats;
                stats.negative_gradient1_e += n1e;
                stats.negative_gradient1_u += n1u;
                stats.positive_gradient1_l += p1l;
                stats.positive_gradient1_e += p1e;
                for d in 0..DIM {
                    stats.negative_gradient2_e[d] += n2e[d];
                    stats.negative_gradient2_u[d] += n2u[d];
                    stats.positive_gradient2_l[d] += p2l[d];
                    stats.positive_gradient2_e[d] += p2e[d];
                }
                for p in begin..end {
                    out.negative_force1_e[p] += n1e;
                    out.negative_force1_u[p] += n1u;
                    out.positive_force1_l[p] += p1l;
                    out.positive_force1_e[p] += p1e;
                    for d in 0..DIM {
                        out.negative_force2_e[p * DIM + d] += n2e[d];
                        out.negative_force2_u[p * DIM + d] += n2u[d];
                        out.positive_force2_l[p * DIM + d] += p2l[d];
                        out.positive_force2_e[p * DIM + d] += p2e[d];
                    }
                }
            }
        }
    }

    /// Refresh a leaf's running bounds from the per-particle direct
    /// accumulators: the least-magnitude member value is a bound valid
    /// for every member.
    pub fn refresh_leaf_bounds(&mut self, id: usize, out: &ForceAccumulators) {
        let (begin, end) = (self.nodes[id].begin, self.nodes[id].end);
        let stats = &mut self.nodes[id].stats;

        let mut neg1 = f64::MIN;
        let mut pos1 = f64::MAX;
        let mut neg2 = [0.0; DIM];
        let mut pos2 = [0.0; DIM];
        neg2.copy_from_slice(&out.negative_force2_u[begin * DIM..begin * DIM + DIM]);
        pos2.copy_from_slice(&out.positive_force2_l[begin * DIM..begin * DIM + DIM]);
        for p in begin..end {
            neg1 = neg1.max(out.negative_force1_u[p]);
            pos1 = pos1.min(out.positive_force1_l[p]);
            for d in 0..DIM {
                neg2[d] = merge_toward_zero(neg2[d], out.negative_force2_u[p * DIM + d]);
                pos2[d] = merge_toward_zero(pos2[d], out.positive_force2_l[p * DIM + d]);
            }
        }
        stats.negative_gradient1_u = neg1;
        stats.positive_gradient1_l = pos1;
        stats.negative_gradient2_u = neg2;
        stats.positive_gradient2_l = pos2;
    }

    /// Refresh an internal node's running bounds from its children,
    /// folding in each child's still-postponed amounts. The merge is
    /// toward zero, so the result under-estimates accumulated magnitude
    /// (less pruning, never an unsound budget).
    pub fn refresh_internal_bounds(&mut self, id: usize) {
        let Some((left, right)) = self.nodes[id].children else {
            return;
        };

        let eff = |stats: &NodeStats| {
            let neg1 = stats.negative_gradient1_u + stats.postponed_negative_gradient1_u;
            let pos1 = stats.positive_gradient1_l + stats.postponed_positive_gradient1_l;
            let mut neg2 = [0.0; DIM];
            let mut pos2 = [0.0; DIM];
            for d in 0..DIM {
                neg2[d] =
                    stats.negative_gradient2_u[d] + stats.postponed_negative_gradient2_u[d];
                pos2[d] =
                    stats.positive_gradient2_l[d] + stats.postponed_positive_gradient2_l[d];
            }
            (neg1, pos1, neg2, pos2)
        };
        let (l_neg1, l_pos1, l_neg2, l_pos2) = eff(&self.nodes[left].stats);
        let (r_neg1, r_pos1, r_neg2, r_pos2) = eff(&self.nodes[right].stats);

        let stats = &mut self.nodes[id].stats;
        stats.negative_gradient1_u = l_neg1.max(r_neg1);
        stats.positive_gradient1_l = l_pos1.min(r_pos1);
        for d in 0..DIM {
            stats.negative_gradient2_u[d] = merge_toward_zero(l_neg2[d], r_neg2[d]);
            stats.positive_gradient2_l[d] = merge_toward_zero(l_pos2[d], r_pos2[d]);
        }
    }
}

fn build_recursive(
    nodes: &mut Vec<TreeNode>,
    perm: &mut [usize],
    begin: usize,
    end: usize,
    positions: &[f64],
    leaf_capacity: usize,
) -> usize {
    let id = nodes.len();

    let mut bound = BoundingBox::empty();
    let mut coordinate_sum = [0.0; DIM];
    let mut l1_norm = 0.0;
    for &orig in perm.iter() {
        let point = &positions[orig * DIM..orig * DIM + DIM];
        bound.expand(point);
        for d in 0..DIM {
            coordinate_sum[d] += point[d];
            l1_norm += point[d].abs();
        }
    }

    let stats = NodeStats {
        coordinate_sum,
        l1_norm_coordinate_sum: l1_norm,
        ..NodeStats::default()
    };
    nodes.push(TreeNode {
        begin,
        end,
        bound,
        children: None,
        stats,
    });

    if perm.len() > leaf_capacity {
        // Widest axis, median element split.
        let mut split_dim = 0;
        for d in 1..DIM {
            let node = &nodes[id];
            if node.bound.hi[d] - node.bound.lo[d]
                > node.bound.hi[split_dim] - node.bound.lo[split_dim]
            {
                split_dim = d;
            }
        }
        let mid = perm.len() / 2;
        perm.select_nth_unstable_by(mid, |&a, &b| {
            positions[a * DIM + split_dim]
                .partial_cmp(&positions[b * DIM + split_dim])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let (left_perm, right_perm) = perm.split_at_mut(mid);
        let left = build_recursive(nodes, left_perm, begin, begin + mid, positions, leaf_capacity);
        let right = build_recursive(nodes, right_perm, begin + mid, end, positions, leaf_capacity);
        nodes[id].children = Some((left, right));
    }

    id
}
