// SPDX-License-Identifier: AGPL-3.0-only

//! Validate the triple-force engine against the brute-force reference.
//!
//! Checks, in order:
//!   - closed-triple symmetry (net force cancels)
//!   - exact tree traversal vs. all-triples reference parity
//!   - tuple accounting (direct + pruned covers C(n, 3))
//!   - degenerate-region pruning reduces to exact evaluation
//!   - approximate runs stay within the stacked error budget
//!
//! Run:
//!   cargo run --release --bin validate_forces            # N=64
//!   cargo run --release --bin validate_forces -- --full  # N=256
//!   cargo run --release --bin validate_forces -- --json  # dump checks

use std::time::Instant;

use tripole::cpu_reference::{compute_forces_reference, total_triples};
use tripole::geometry::DIM;
use tripole::particles::{clustered_pair, equilateral_triangle, random_cloud};
use tripole::tolerances;
use tripole::validation::ValidationHarness;
use tripole::{compute_forces, ForceConfig};

/// Largest component difference, normalized by the largest reference
/// component. Individual components can cancel to near zero, so a
/// per-component relative measure would amplify rounding noise.
fn max_normalized_difference(a: &[f64], b: &[f64]) -> f64 {
    let scale = b
        .iter()
        .map(|y| y.abs())
        .fold(0.0, f64::max)
        .max(tolerances::SUM_ORDER_ABS);
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
        / scale
}

fn net_force_magnitude(forces: &[f64]) -> f64 {
    let mut total = [0.0; DIM];
    for p in 0..forces.len() / DIM {
        for d in 0..DIM {
            total[d] += forces[p * DIM + d];
        }
    }
    total.iter().map(|t| t.abs()).fold(0.0, f64::max)
}

fn main() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  tripole — Axilrod-Teller triple forces, tree vs reference ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let args: Vec<String> = std::env::args().collect();
    let full = args.iter().any(|a| a == "--full");
    let dump_json = args.iter().any(|a| a == "--json");
    let n = if full { 256 } else { 64 };

    let mut harness = ValidationHarness::new("validate_forces");

    // ── Closed-triple symmetry ──
    let triangle = equilateral_triangle(1.0);
    let cfg = ForceConfig::exact("triangle");
    match compute_forces(&triangle, &cfg) {
        Ok(result) => {
            harness.check_abs(
                "equilateral triple net force",
                net_force_magnitude(&result.forces),
                0.0,
                tolerances::NET_FORCE_ABS,
            );
        }
        Err(err) => {
            println!("  triangle run failed: {err}");
            harness.check_bool("equilateral triple net force", false);
        }
    }

    // ── Exact parity on a random cloud ──
    println!("  ── Exact parity: {n} particles ──");
    let positions = random_cloud(n, (n as f64).cbrt() * 2.0, 42);
    let t_ref = Instant::now();
    let reference = compute_forces_reference(&positions, 1.0);
    println!("    reference ({} tuples): {:.2}s", total_triples(n), t_ref.elapsed().as_secs_f64());

    let t_tree = Instant::now();
    let exact_cfg = ForceConfig::exact("parity");
    match compute_forces(&positions, &exact_cfg) {
        Ok(result) => {
            println!(
                "    tree ({} direct, {} pruned): {:.2}s",
                result.stats.direct_tuples,
                result.stats.deterministic_prunes,
                t_tree.elapsed().as_secs_f64()
            );
            harness.check_upper(
                "exact traversal parity (max rel diff)",
                max_normalized_difference(&result.forces, &reference),
                tolerances::SUM_ORDER_REL,
            );
            harness.check_abs(
                "tuple accounting (exact run)",
                result.stats.direct_tuples as f64 + result.stats.pruned_tuples,
                total_triples(n),
                0.5,
            );
        }
        Err(err) => {
            println!("  exact run failed: {err}");
            harness.check_bool("exact traversal parity (max rel diff)", false);
        }
    }

    // ── Degenerate-region pruning ──
    let mut unit_leaf_cfg = ForceConfig::exact("unit-leaves");
    unit_leaf_cfg.leaf_capacity = 1;
    let small = random_cloud(12, 6.0, 7);
    let small_reference = compute_forces_reference(&small, 1.0);
    match compute_forces(&small, &unit_leaf_cfg) {
        Ok(result) => {
            harness.check_upper(
                "single-point-region prunes match exact",
                max_normalized_difference(&result.forces, &small_reference),
                tolerances::SUM_ORDER_REL,
            );
            harness.check_bool(
                "single-point-region prunes occurred",
                result.stats.deterministic_prunes > 0,
            );
        }
        Err(err) => {
            println!("  unit-leaf run failed: {err}");
            harness.check_bool("single-point-region prunes match exact", false);
        }
    }

    // ── Approximate runs: deterministic and Monte Carlo ──
    let clustered = clustered_pair(n / 2, 1.0, 25.0, 11);
    let clustered_reference = compute_forces_reference(&clustered, 1.0);
    for (label, cfg) in [
        ("deterministic ε=0.05", ForceConfig::deterministic("det", 0.05)),
        ("monte carlo ε=0.05", ForceConfig::approximate("mc", 0.05)),
    ] {
        match compute_forces(&clustered, &cfg) {
            Ok(result) => {
                println!(
                    "  {label}: {} det prunes, {} mc prunes, {} direct tuples",
                    result.stats.deterministic_prunes,
                    result.stats.monte_carlo_prunes,
                    result.stats.direct_tuples
                );
                harness.check_upper(
                    &format!("{label} stays in stacked budget"),
                    max_normalized_difference(&result.forces, &clustered_reference),
                    tolerances::BUDGET_STACKING_FACTOR * cfg.relative_error,
                );
                harness.check_abs(
                    &format!("{label} tuple accounting"),
                    result.stats.direct_tuples as f64 + result.stats.pruned_tuples,
                    total_triples(clustered.len() / DIM),
                    0.5,
                );
            }
            Err(err) => {
                println!("  {label} run failed: {err}");
                harness.check_bool(&format!("{label} stays in stacked budget"), false);
            }
        }
    }

    if dump_json {
        match harness.to_json() {
            Ok(json) => println!("{json}"),
            Err(err) => println!("  JSON dump failed: {err}"),
        }
    }

    std::process::exit(harness.summarize());
}
