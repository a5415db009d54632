// SPDX-License-Identifier: AGPL-3.0-only

//! Interval bounds on the Axilrod-Teller gradient components.
//!
//! The three-body potential's gradient along a pair axis is a sum of
//! rational terms in the three pairwise distances with powers 1 through
//! 9. Every term is monotonic in each distance separately, so
//! substituting the tightest extreme distance per factor yields exact
//! interval bounds — no numeric approximation is involved.
//!
//! The gradient along each axis splits into a negative (attractive)
//! and a positive (repulsive) part, bounded independently. The closed
//! form, with r1 the primary-axis distance and r2, r3 the side axes:
//!
//!   negative = C · ( −8/(r1⁴r2³r3³) − 1/(r2⁵r3⁵) − 1/(r1²r2³r3⁵)
//!                    − 1/(r1²r2⁵r3³) − 3/(r1⁴r2 r3⁵) − 3/(r1⁴r2⁵r3)
//!                    − 5/(r1⁶r2 r3³) − 5/(r1⁶r2³r3) )
//!   positive = C · ( 5 r2/(r1⁶r3⁵) + 5 r3/(r1⁶r2⁵) + 6/(r1⁴r2³r3³) )
//!   C        = 3ν / (8 r1)
//!
//! Callers must reject a zero minimum distance before evaluating:
//! every term divides by a distance power.

use crate::kernel::distance::DistanceTable;

/// Distance powers for the primary axis: r, r², r⁴, r⁶.
#[derive(Clone, Copy, Debug)]
struct PrimaryPowers {
    r: f64,
    r2: f64,
    r4: f64,
    r6: f64,
}

impl PrimaryPowers {
    fn from_sq(dsq: f64) -> Self {
        let r4 = dsq * dsq;
        Self {
            r: dsq.sqrt(),
            r2: dsq,
            r4,
            r6: dsq * r4,
        }
    }
}

/// Distance powers for a side axis: r, r³, r⁵.
#[derive(Clone, Copy, Debug)]
struct SidePowers {
    r: f64,
    r3: f64,
    r5: f64,
}

impl SidePowers {
    fn from_sq(dsq: f64) -> Self {
        let r = dsq.sqrt();
        let r3 = dsq * r;
        Self {
            r,
            r3,
            r5: dsq * r3,
        }
    }
}

/// Attractive part of the gradient, without the common factor.
/// Strictly negative for positive distances.
fn negative_term(p1: PrimaryPowers, p2: SidePowers, p3: SidePowers) -> f64 {
    -8.0 / (p1.r4 * p2.r3 * p3.r3)
        - 1.0 / (p2.r5 * p3.r5)
        - 1.0 / (p1.r2 * p2.r3 * p3.r5)
        - 1.0 / (p1.r2 * p2.r5 * p3.r3)
        - 3.0 / (p1.r4 * p2.r * p3.r5)
        - 3.0 / (p1.r4 * p2.r5 * p3.r)
        - 5.0 / (p1.r6 * p2.r * p3.r3)
        - 5.0 / (p1.r6 * p2.r3 * p3.r)
}

/// Repulsive part of the gradient, without the common factor. The two
/// side-axis numerators take the opposite extreme from the denominators,
/// so they are passed separately.
fn positive_term(num_r2: f64, num_r3: f64, p1: PrimaryPowers, p2: SidePowers, p3: SidePowers) -> f64 {
    5.0 * num_r2 / (p1.r6 * p3.r5) + 5.0 * num_r3 / (p1.r6 * p2.r5)
        + 6.0 / (p1.r4 * p2.r3 * p3.r3)
}

/// Interval bounds on one signed gradient axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ComponentBounds {
    pub min_negative: f64,
    pub max_negative: f64,
    pub min_positive: f64,
    pub max_positive: f64,
}

impl ComponentBounds {
    /// Whether all four bounds are finite (non-finite bounds arise when
    /// a bounding-box distance collapses toward zero).
    #[must_use]
    pub fn all_finite(&self) -> bool {
        self.min_negative.is_finite()
            && self.max_negative.is_finite()
            && self.min_positive.is_finite()
            && self.max_positive.is_finite()
    }

    /// Midpoint of the negative interval (unbiased point estimate).
    #[must_use]
    pub fn midpoint_negative(&self) -> f64 {
        0.5 * (self.min_negative + self.max_negative)
    }

    /// Midpoint of the positive interval.
    #[must_use]
    pub fn midpoint_positive(&self) -> f64 {
        0.5 * (self.min_positive + self.max_positive)
    }

    /// A degenerate interval (min == max), used when the Monte Carlo
    /// path substitutes a sampled mean for both bounds.
    #[must_use]
    pub fn degenerate(negative: f64, positive: f64) -> Self {
        Self {
            min_negative: negative,
            max_negative: negative,
            min_positive: positive,
            max_positive: positive,
        }
    }
}

/// Bounds on all three gradient axes of a triple: `g1` along i–j, `g2`
/// along i–k, `g3` along j–k.
#[derive(Clone, Copy, Debug, Default)]
pub struct GradientBounds {
    pub g1: ComponentBounds,
    pub g2: ComponentBounds,
    pub g3: ComponentBounds,
}

impl GradientBounds {
    /// Whether all twelve bounds are finite.
    #[must_use]
    pub fn all_finite(&self) -> bool {
        self.g1.all_finite() && self.g2.all_finite() && self.g3.all_finite()
    }
}

/// Bounds for one axis, with `order[0]`–`order[1]` playing primary.
fn axis_bounds(table: &DistanceTable, order: [usize; 3], nu: f64) -> ComponentBounds {
    let min1 = PrimaryPowers::from_sq(table.min_sq(order[0], order[1]));
    let max1 = PrimaryPowers::from_sq(table.max_sq(order[0], order[1]));
    let min2 = SidePowers::from_sq(table.min_sq(order[0], order[2]));
    let max2 = SidePowers::from_sq(table.max_sq(order[0], order[2]));
    let min3 = SidePowers::from_sq(table.min_sq(order[1], order[2]));
    let max3 = SidePowers::from_sq(table.max_sq(order[1], order[2]));

    // Common factor is monotone decreasing in r1: the min bound of the
    // magnitude pairs with the max distance and vice versa.
    let min_common = 3.0 * nu / (8.0 * max1.r);
    let max_common = 3.0 * nu / (8.0 * min1.r);

    ComponentBounds {
        min_negative: max_common * negative_term(min1, min2, min3),
        max_negative: min_common * negative_term(max1, max2, max3),
        min_positive: min_common * positive_term(min2.r, min3.r, max1, max2, max3),
        max_positive: max_common * positive_term(max2.r, max3.r, min1, min2, min3),
    }
}

/// Evaluate all three axes with cyclic relabeling of the primary pair,
/// reusing one distance table.
#[must_use]
pub fn eval_gradient_bounds(table: &DistanceTable, nu: f64) -> GradientBounds {
    GradientBounds {
        g1: axis_bounds(table, [0, 1, 2], nu),
        g2: axis_bounds(table, [0, 2, 1], nu),
        g3: axis_bounds(table, [2, 1, 0], nu),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::kernel::distance::DistanceTable;
    use crate::tree::{NodeStats, TreeNode};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn point_table(positions: &[f64]) -> DistanceTable {
        let mut table = DistanceTable::default();
        table.fill_from_points(positions, [0, 1, 2]);
        table
    }

    #[test]
    fn point_mode_collapses_intervals() {
        let positions = vec![
            0.0, 0.0, 0.0, //
            1.1, 0.0, 0.0, //
            0.3, 1.4, 0.0,
        ];
        let bounds = eval_gradient_bounds(&point_table(&positions), 1.0);
        for axis in [bounds.g1, bounds.g2, bounds.g3] {
            assert_eq!(axis.min_negative, axis.max_negative);
            assert_eq!(axis.min_positive, axis.max_positive);
            assert!(axis.min_negative < 0.0, "attractive part is negative");
            assert!(axis.min_positive > 0.0, "repulsive part is positive");
        }
    }

    #[test]
    fn nu_scales_linearly() {
        let positions = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.5, 1.2, 0.0,
        ];
        let unit = eval_gradient_bounds(&point_table(&positions), 1.0);
        let scaled = eval_gradient_bounds(&point_table(&positions), 1e-18);
        assert!((scaled.g1.min_negative - 1e-18 * unit.g1.min_negative).abs() < 1e-30);
        assert!((scaled.g3.max_positive - 1e-18 * unit.g3.max_positive).abs() < 1e-30);
    }

    fn region_node(origin: [f64; 3], side: f64) -> TreeNode {
        TreeNode {
            begin: 0,
            end: 1,
            bound: BoundingBox {
                lo: origin,
                hi: [origin[0] + side, origin[1] + side, origin[2] + side],
            },
            children: None,
            stats: NodeStats::default(),
        }
    }

    #[test]
    fn region_bounds_bracket_sampled_triples() {
        let mut rng = ChaCha8Rng::seed_from_u64(101);
        let side = 0.5;
        // Well-separated boxes keep every pair distance positive.
        let origins = [[0.0, 0.0, 0.0], [3.0, 0.5, 0.0], [1.0, 3.0, 1.0]];
        let nodes: Vec<TreeNode> = origins.iter().map(|&o| region_node(o, side)).collect();

        let mut region_table = DistanceTable::default();
        region_table.fill_from_regions(&nodes, [0, 1, 2]);
        assert!(!region_table.has_zero_min());
        let interval = eval_gradient_bounds(&region_table, 1.0);

        for _ in 0..200 {
            let mut positions = Vec::with_capacity(9);
            for origin in &origins {
                for d in 0..3 {
                    positions.push(origin[d] + rng.gen_range(0.0..side));
                }
            }
            let exact = eval_gradient_bounds(&point_table(&positions), 1.0);
            for (bound, point) in [
                (interval.g1, exact.g1),
                (interval.g2, exact.g2),
                (interval.g3, exact.g3),
            ] {
                assert!(
                    point.min_negative >= bound.min_negative - 1e-12
                        && point.min_negative <= bound.max_negative + 1e-12,
                    "negative gradient {} outside [{}, {}]",
                    point.min_negative,
                    bound.min_negative,
                    bound.max_negative
                );
                assert!(
                    point.min_positive >= bound.min_positive - 1e-12
                        && point.min_positive <= bound.max_positive + 1e-12,
                    "positive gradient {} outside [{}, {}]",
                    point.min_positive,
                    bound.min_positive,
                    bound.max_positive
                );
            }
        }
    }

    #[test]
    fn midpoints_lie_inside() {
        let positions = vec![
            0.0, 0.0, 0.0, //
            1.3, 0.2, 0.0, //
            0.4, 1.8, 0.3,
        ];
        let bounds = eval_gradient_bounds(&point_table(&positions), 1.0);
        let g = bounds.g1;
        assert!(g.midpoint_negative() >= g.min_negative && g.midpoint_negative() <= g.max_negative);
        assert!(g.midpoint_positive() >= g.min_positive && g.midpoint_positive() <= g.max_positive);
    }

    #[test]
    fn degenerate_interval_is_flat() {
        let c = ComponentBounds::degenerate(-2.0, 3.0);
        assert_eq!(c.min_negative, c.max_negative);
        assert_eq!(c.midpoint_negative(), -2.0);
        assert_eq!(c.midpoint_positive(), 3.0);
        assert!(c.all_finite());
    }

    #[test]
    fn touching_regions_produce_non_finite_bounds() {
        // Overlapping boxes: min distance zero, bounds blow up.
        let nodes = vec![
            region_node([0.0, 0.0, 0.0], 1.0),
            region_node([0.5, 0.0, 0.0], 1.0),
            region_node([4.0, 0.0, 0.0], 1.0),
        ];
        let mut table = DistanceTable::default();
        table.fill_from_regions(&nodes, [0, 1, 2]);
        assert!(table.has_zero_min());
        let bounds = eval_gradient_bounds(&table, 1.0);
        assert!(!bounds.all_finite(), "zero min distance must not yield finite bounds");
    }
}
