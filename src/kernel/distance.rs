// SPDX-License-Identifier: AGPL-3.0-only

//! Pairwise squared-distance bounds for an interaction triple.
//!
//! The 3×3 table stores, off-diagonal, the minimum squared distance in
//! the upper triangle (`get(i, j)` with i < j) and the maximum in the
//! lower triangle (`get(j, i)`). Point mode fills both triangles with
//! the exact distance, so min == max and every downstream interval
//! collapses.

use crate::geometry::distance_sq;
use crate::tree::TreeNode;

/// Scratch table of pairwise squared-distance bounds.
#[derive(Clone, Debug, Default)]
pub struct DistanceTable {
    cells: [[f64; 3]; 3],
}

impl DistanceTable {
    /// Minimum squared distance between slots `a` and `b` (a != b).
    #[must_use]
    pub fn min_sq(&self, a: usize, b: usize) -> f64 {
        self.cells[a.min(b)][a.max(b)]
    }

    /// Maximum squared distance between slots `a` and `b` (a != b).
    #[must_use]
    pub fn max_sq(&self, a: usize, b: usize) -> f64 {
        self.cells[a.max(b)][a.min(b)]
    }

    /// Fill from region bounds: closest and farthest approach per pair.
    pub fn fill_from_regions(&mut self, nodes: &[TreeNode], slots: [usize; 3]) {
        for i in 0..2 {
            let bound_i = &nodes[slots[i]].bound;
            for j in (i + 1)..3 {
                let bound_j = &nodes[slots[j]].bound;
                self.cells[i][j] = bound_i.min_distance_sq(bound_j);
                self.cells[j][i] = bound_i.max_distance_sq(bound_j);
            }
        }
    }

    /// Fill symmetric from three concrete points.
    pub fn fill_from_points(&mut self, positions: &[f64], indices: [usize; 3]) {
        for i in 0..2 {
            for j in (i + 1)..3 {
                let dsq = distance_sq(positions, indices[i], indices[j]);
                self.cells[i][j] = dsq;
                self.cells[j][i] = dsq;
            }
        }
    }

    /// Whether any pair's minimum squared distance is exactly zero
    /// (degenerate geometry: gradient bounds would divide by zero).
    #[must_use]
    pub fn has_zero_min(&self) -> bool {
        self.cells[0][1] == 0.0 || self.cells[0][2] == 0.0 || self.cells[1][2] == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TripleTree;

    #[test]
    fn point_mode_is_symmetric() {
        let positions = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 2.0, 0.0,
        ];
        let mut table = DistanceTable::default();
        table.fill_from_points(&positions, [0, 1, 2]);
        assert_eq!(table.min_sq(0, 1), 1.0);
        assert_eq!(table.max_sq(0, 1), 1.0);
        assert_eq!(table.min_sq(0, 2), 4.0);
        assert_eq!(table.min_sq(1, 2), 5.0);
        assert!(!table.has_zero_min());
    }

    #[test]
    fn region_mode_brackets_points() {
        let positions = crate::particles::random_cloud(32, 6.0, 17);
        let tree = TripleTree::build(&positions, 4).expect("build");
        let root = &tree.nodes[0];
        let (left, right) = root.children.expect("split");

        let mut table = DistanceTable::default();
        table.fill_from_regions(&tree.nodes, [left, right, right]);

        let lhs = &tree.nodes[left];
        let rhs = &tree.nodes[right];
        for i in lhs.begin..lhs.end {
            for j in rhs.begin..rhs.end {
                let dsq = distance_sq(&tree.positions, i, j);
                assert!(dsq >= table.min_sq(0, 1) - 1e-12);
                assert!(dsq <= table.max_sq(0, 1) + 1e-12);
            }
        }
    }

    #[test]
    fn coincident_points_flag_zero() {
        let positions = vec![
            1.0, 1.0, 1.0, //
            1.0, 1.0, 1.0, //
            0.0, 2.0, 0.0,
        ];
        let mut table = DistanceTable::default();
        table.fill_from_points(&positions, [0, 1, 2]);
        assert!(table.has_zero_min());
    }

    #[test]
    fn aliased_region_has_zero_min() {
        let positions = crate::particles::random_cloud(16, 5.0, 23);
        let tree = TripleTree::build(&positions, 4).expect("build");
        let mut table = DistanceTable::default();
        table.fill_from_regions(&tree.nodes, [0, 0, 0]);
        // A region against itself overlaps: min distance is zero.
        assert!(table.has_zero_min());
    }
}
