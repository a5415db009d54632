// SPDX-License-Identifier: AGPL-3.0-only

//! Axis-aligned bounding geometry for tree regions.
//!
//! Regions expose closest-approach and farthest-approach squared
//! distances against each other; those two numbers are the only
//! geometric facts the pruning kernel consumes.

/// Spatial dimension. Positions are flat `[f64]` arrays with this stride.
pub const DIM: usize = 3;

/// Axis-aligned bounding box over [`DIM`]-dimensional points.
#[derive(Clone, Debug)]
pub struct BoundingBox {
    pub lo: [f64; DIM],
    pub hi: [f64; DIM],
}

impl BoundingBox {
    /// Empty box: grows to fit on the first `expand`.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            lo: [f64::MAX; DIM],
            hi: [f64::MIN; DIM],
        }
    }

    /// Tight box over a contiguous slice of flat positions.
    #[must_use]
    pub fn from_points(positions: &[f64], begin: usize, end: usize) -> Self {
        let mut bound = Self::empty();
        for p in begin..end {
            bound.expand(&positions[p * DIM..p * DIM + DIM]);
        }
        bound
    }

    /// Grow to include one point.
    pub fn expand(&mut self, point: &[f64]) {
        for d in 0..DIM {
            self.lo[d] = self.lo[d].min(point[d]);
            self.hi[d] = self.hi[d].max(point[d]);
        }
    }

    /// Whether a point lies inside (closed bounds).
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        (0..DIM).all(|d| point[d] >= self.lo[d] && point[d] <= self.hi[d])
    }

    /// Minimum squared distance between any point of `self` and any
    /// point of `other`. Zero when the boxes overlap.
    #[must_use]
    pub fn min_distance_sq(&self, other: &Self) -> f64 {
        let mut dsq = 0.0;
        for d in 0..DIM {
            let gap = (self.lo[d] - other.hi[d]).max(other.lo[d] - self.hi[d]).max(0.0);
            dsq += gap * gap;
        }
        dsq
    }

    /// Maximum squared distance between any point of `self` and any
    /// point of `other`: per axis, the farther pair of opposite faces.
    #[must_use]
    pub fn max_distance_sq(&self, other: &Self) -> f64 {
        let mut dsq = 0.0;
        for d in 0..DIM {
            let span = (self.hi[d] - other.lo[d]).abs().max((other.hi[d] - self.lo[d]).abs());
            dsq += span * span;
        }
        dsq
    }
}

/// `dst += scale * src`, component-wise.
pub fn add_scaled(dst: &mut [f64; DIM], scale: f64, src: &[f64; DIM]) {
    for d in 0..DIM {
        dst[d] += scale * src[d];
    }
}

/// L1 norm of a fixed-dimension vector.
#[must_use]
pub fn l1_norm(v: &[f64; DIM]) -> f64 {
    v.iter().map(|x| x.abs()).sum()
}

/// Exact squared Euclidean distance between two flat-array points.
#[must_use]
pub fn distance_sq(positions: &[f64], i: usize, j: usize) -> f64 {
    let mut dsq = 0.0;
    for d in 0..DIM {
        let delta = positions[i * DIM + d] - positions[j * DIM + d];
        dsq += delta * delta;
    }
    dsq
}
