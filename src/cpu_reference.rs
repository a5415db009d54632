// SPDX-License-Identifier: AGPL-3.0-only

//! Brute-force all-triples reference evaluator.
//!
//! Visits every `i < j < k` tuple through the same kernel arithmetic as
//! the tree path, with no tree, no pruning, and no postponed state.
//! This is the parity baseline for the test suite and the validation
//! binary. Work is parallelized over the leading index with per-thread
//! accumulator sets merged at the end, so region statistics never need
//! to be shared between threads.

use rayon::prelude::*;

use crate::forces::ForceAccumulators;
use crate::geometry::DIM;
use crate::kernel::direct::eval_exact;
use crate::kernel::DistanceTable;

/// Number of unordered triples in an `n`-particle system.
#[must_use]
pub fn total_triples(n: usize) -> f64 {
    let n = n as f64;
    (n * (n - 1.0) * (n - 2.0) / 6.0).max(0.0)
}

/// Exact forces on every particle, in input order.
#[must_use]
pub fn compute_forces_reference(positions: &[f64], nu: f64) -> Vec<f64> {
    let n = positions.len() / DIM;
    if n < 3 {
        return vec![0.0; positions.len()];
    }

    let merged = (0..n - 2)
        .into_par_iter()
        .fold(
            || (DistanceTable::default(), ForceAccumulators::zeros(n)),
            |(mut table, mut acc), i| {
                for j in (i + 1)..n {
                    for k in (j + 1)..n {
                        eval_exact(&mut table, positions, [i, j, k], nu, &mut acc);
                    }
                }
                (table, acc)
            },
        )
        .map(|(_, acc)| acc)
        .reduce(
            || ForceAccumulators::zeros(n),
            |mut a, b| {
                a.merge(&b);
                a
            },
        );

    merged.net_force(positions)
}
