// SPDX-License-Identifier: AGPL-3.0-only

//! Canonical triple recursion over the decomposition tree.
//!
//! Slots are kept in canonical order (non-decreasing `begin`), and a
//! split replaces every aliased occurrence of a node with its children
//! at once, so any two distinct slots are always disjoint ranges. Per
//! candidate triple the order of attack is: deterministic prune,
//! statistical prune (when enabled and the slots are populous enough),
//! recursion into the largest unsplit slot, and exact evaluation once
//! every slot is a leaf.
//!
//! Budgets grow as the walk proceeds: leaves refresh their running
//! bounds from the per-particle buffers after each exact evaluation,
//! and an internal node recombines its children's bounds when the walk
//! ascends back through it. Early triples therefore evaluate exactly
//! and later, far-field triples prune against the accumulated mass.
//!
//! After the walk, postponed statistics are flushed top-down and the
//! net forces are assembled in the caller's original particle order.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::ForceConfig;
use crate::error::TripoleError;
use crate::forces::ForceAccumulators;
use crate::geometry::DIM;
use crate::kernel::prune::num_tuples;
use crate::kernel::{AxilrodTellerKernel, PruneParams};
use crate::tree::TripleTree;

/// Counters describing how a run spent its work.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TraversalStats {
    /// Triples summarized by interval bounds.
    pub deterministic_prunes: usize,
    /// Triples summarized by sampling.
    pub monte_carlo_prunes: usize,
    /// Point tuples evaluated exactly.
    pub direct_tuples: u64,
    /// Point tuples covered by prunes.
    pub pruned_tuples: f64,
    /// Candidate triples visited.
    pub triples_visited: usize,
}

/// Output of one force computation.
#[derive(Clone, Debug)]
pub struct ForceResult {
    /// Net force per particle, flat stride-3, caller's original order.
    pub forces: Vec<f64>,
    /// Work counters.
    pub stats: TraversalStats,
    /// The configuration that produced this result.
    pub config: ForceConfig,
}

/// Compute the three-body forces on every particle.
///
/// `positions` is a flat stride-3 array in any order; the result is
/// reported in the same order. Systems with fewer than three particles
/// have no triples and return zero forces.
pub fn compute_forces(
    positions: &[f64],
    cfg: &ForceConfig,
) -> Result<ForceResult, TripoleError> {
    cfg.validate()?;
    if positions.is_empty() {
        return Err(TripoleError::EmptySystem);
    }
    if positions.len() % DIM != 0 {
        return Err(TripoleError::MalformedPositions(positions.len()));
    }
    let n = positions.len() / DIM;
    if n < 3 {
        return Ok(ForceResult {
            forces: vec![0.0; positions.len()],
            stats: TraversalStats::default(),
            config: cfg.clone(),
        });
    }

    let mut tree = TripleTree::build(positions, cfg.leaf_capacity)?;
    let n_minus_one = (n - 1) as f64;
    let params = PruneParams {
        relative_error: cfg.relative_error,
        z_score: cfg.z_score,
        total_n_minus_one_tuples: n_minus_one * (n_minus_one - 1.0) * 0.5,
    };

    let mut walk = Walk {
        tree: &mut tree,
        kernel: AxilrodTellerKernel::from_config(cfg),
        out: ForceAccumulators::zeros(n),
        rng: ChaCha8Rng::seed_from_u64(cfg.mc_seed),
        stats: TraversalStats::default(),
        params,
        cfg,
    };
    walk.recurse([0, 0, 0]);

    let Walk { mut out, stats, .. } = walk;
    tree.flush_postponed(&mut out);

    // Back to the caller's particle order.
    let tree_forces = out.net_force(&tree.positions);
    let mut forces = vec![0.0; positions.len()];
    for (t, &orig) in tree.old_from_new.iter().enumerate() {
        forces[orig * DIM..orig * DIM + DIM]
            .copy_from_slice(&tree_forces[t * DIM..t * DIM + DIM]);
    }

    Ok(ForceResult {
        forces,
        stats,
        config: cfg.clone(),
    })
}

struct Walk<'a> {
    tree: &'a mut TripleTree,
    kernel: AxilrodTellerKernel,
    out: ForceAccumulators,
    rng: ChaCha8Rng,
    stats: TraversalStats,
    params: PruneParams,
    cfg: &'a ForceConfig,
}

impl Walk<'_> {
    /// Whether any strictly increasing point triple can be drawn.
    fn tuple_exists(&self, [a, b, c]: [usize; 3]) -> bool {
        let count = |id: usize| self.tree.nodes[id].count();
        if a == b && b == c {
            count(a) >= 3
        } else if a == b {
            count(a) >= 2
        } else if b == c {
            count(b) >= 2
        } else {
            true
        }
    }

    fn recurse(&mut self, slots: [usize; 3]) {
        if !self.tuple_exists(slots) {
            return;
        }
        self.stats.triples_visited += 1;
        let tuple_mass = num_tuples(&self.tree.nodes, slots);

        if self.kernel.try_prune(&mut self.tree.nodes, slots, &self.params) {
            self.stats.deterministic_prunes += 1;
            self.stats.pruned_tuples += tuple_mass;
            return;
        }

        let [a, b, c] = slots;
        let min_count = [a, b, c]
            .iter()
            .map(|&id| self.tree.nodes[id].count())
            .min()
            .unwrap_or(0);
        if self.cfg.use_monte_carlo
            && min_count >= self.cfg.mc_min_count
            && self.kernel.try_prune_monte_carlo(
                &mut self.tree.nodes,
                slots,
                &self.tree.positions,
                &self.params,
                &mut self.rng,
            )
        {
            self.stats.monte_carlo_prunes += 1;
            self.stats.pruned_tuples += tuple_mass;
            return;
        }

        let all_leaves = [a, b, c].iter().all(|&id| self.tree.nodes[id].is_leaf());
        if all_leaves {
            self.evaluate_leaf_triple(slots);
            return;
        }

        // Split the most populous unsplit slot, replacing every aliased
        // occurrence with its children to keep distinct slots disjoint.
        let split = [a, b, c]
            .into_iter()
            .filter(|&id| !self.tree.nodes[id].is_leaf())
            .max_by_key(|&id| self.tree.nodes[id].count())
            .unwrap_or(a);
        let (left, right) = self.tree.nodes[split].children.unwrap_or((split, split));

        if a == b && b == c {
            self.recurse([left, left, left]);
            self.recurse([left, left, right]);
            self.recurse([left, right, right]);
            self.recurse([right, right, right]);
        } else if a == b {
            if split == a {
                self.recurse([left, left, c]);
                self.recurse([left, right, c]);
                self.recurse([right, right, c]);
            } else {
                self.recurse([a, b, left]);
                self.recurse([a, b, right]);
            }
        } else if b == c {
            if split == b {
                self.recurse([a, left, left]);
                self.recurse([a, left, right]);
                self.recurse([a, right, right]);
            } else {
                self.recurse([left, b, c]);
                self.recurse([right, b, c]);
            }
        } else if split == a {
            self.recurse([left, b, c]);
            self.recurse([right, b, c]);
        } else if split == b {
            self.recurse([a, left, c]);
            self.recurse([a, right, c]);
        } else {
            self.recurse([a, b, left]);
            self.recurse([a, b, right]);
        }

        self.tree.refresh_internal_bounds(split);
    }

    fn evaluate_leaf_triple(&mut self, [a, b, c]: [usize; 3]) {
        let (a_begin, a_end) = (self.tree.nodes[a].begin, self.tree.nodes[a].end);
        let (b_begin, b_end) = (self.tree.nodes[b].begin, self.tree.nodes[b].end);
        let (c_begin, c_end) = (self.tree.nodes[c].begin, self.tree.nodes[c].end);

        for i in a_begin..a_end {
            for j in b_begin.max(i + 1)..b_end {
                for k in c_begin.max(j + 1)..c_end {
                    self.kernel
                        .evaluate_exact(&self.tree.positions, [i, j, k], &mut self.out);
                    self.stats.direct_tuples += 1;
                }
            }
        }

        self.tree.refresh_leaf_bounds(a, &self.out);
        if b != a {
            self.tree.refresh_leaf_bounds(b, &self.out);
        }
        if c != b {
            self.tree.refresh_leaf_bounds(c, &self.out);
        }
    }
}
