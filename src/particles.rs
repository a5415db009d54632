// SPDX-License-Identifier: AGPL-3.0-only

//! Particle-set generators for tests, benchmarks, and validation runs.
//!
//! All generators take an explicit seed and are deterministic: the same
//! seed must reproduce the same configuration bit-for-bit.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::geometry::DIM;

/// Particles on an FCC lattice filling a cubic box of side `box_side`.
///
/// Returns the flat position array and the actual particle count
/// (4·c³ for the smallest cell count c with 4·c³ ≥ n, truncated to n).
#[must_use]
pub fn fcc_lattice(n: usize, box_side: f64) -> (Vec<f64>, usize) {
    let mut n_cell = 1usize;
    while 4 * n_cell * n_cell * n_cell < n {
        n_cell += 1;
    }
    let a = box_side / n_cell as f64;

    // FCC basis in units of the lattice constant.
    let basis = [
        [0.0, 0.0, 0.0],
        [0.5, 0.5, 0.0],
        [0.5, 0.0, 0.5],
        [0.0, 0.5, 0.5],
    ];

    let mut positions = Vec::with_capacity(4 * n_cell.pow(3) * DIM);
    for ix in 0..n_cell {
        for iy in 0..n_cell {
            for iz in 0..n_cell {
                for b in &basis {
                    positions.push((ix as f64 + b[0]) * a);
                    positions.push((iy as f64 + b[1]) * a);
                    positions.push((iz as f64 + b[2]) * a);
                }
            }
        }
    }
    positions.truncate(n * DIM);
    let n_actual = positions.len() / DIM;
    (positions, n_actual)
}

/// Uniform random cloud in a cubic box of side `box_side`.
#[must_use]
pub fn random_cloud(n: usize, box_side: f64, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut positions = Vec::with_capacity(n * DIM);
    for _ in 0..n * DIM {
        positions.push(rng.gen_range(0.0..box_side));
    }
    positions
}

/// Two well-separated uniform clusters of `n_each` particles; cluster
/// centers sit `separation` apart along x. Exercises the far-field
/// pruning paths.
#[must_use]
pub fn clustered_pair(n_each: usize, cluster_side: f64, separation: f64, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut positions = Vec::with_capacity(2 * n_each * DIM);
    for c in 0..2 {
        let offset = c as f64 * separation;
        for _ in 0..n_each {
            positions.push(offset + rng.gen_range(0.0..cluster_side));
            positions.push(rng.gen_range(0.0..cluster_side));
            positions.push(rng.gen_range(0.0..cluster_side));
        }
    }
    positions
}

/// Equilateral triangle of side `side` in the z = 0 plane.
#[must_use]
pub fn equilateral_triangle(side: f64) -> Vec<f64> {
    let h = side * 3.0_f64.sqrt() / 2.0;
    vec![
        0.0, 0.0, 0.0, //
        side, 0.0, 0.0, //
        side / 2.0, h, 0.0,
    ]
}
