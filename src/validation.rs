// SPDX-License-Identifier: AGPL-3.0-only

//! Validation harness for tripole binaries.
//!
//! Every validation binary follows the same pattern: explicit pass/fail
//! checks against tolerances from [`crate::tolerances`], a ✓/✗ summary
//! on stdout, exit code 0 only when every check passes, and an optional
//! machine-readable JSON dump of the check list.

use serde::Serialize;

/// How a check's threshold is applied.
#[derive(Clone, Copy, Debug, Serialize)]
pub enum CheckKind {
    /// |observed − expected| < threshold
    Absolute,
    /// |observed − expected| / max(|expected|, ε) < threshold
    Relative,
    /// observed < threshold
    UpperBound,
    /// plain boolean condition
    Condition,
}

/// One recorded check.
#[derive(Clone, Debug, Serialize)]
pub struct Check {
    pub label: String,
    pub kind: CheckKind,
    pub passed: bool,
    pub observed: f64,
    pub expected: f64,
    pub threshold: f64,
}

/// Accumulates checks and renders the run summary.
#[derive(Debug, Default, Serialize)]
#[must_use]
pub struct ValidationHarness {
    pub name: String,
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    /// |observed − expected| < threshold.
    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, threshold: f64) {
        let passed = (observed - expected).abs() < threshold;
        self.push(label, CheckKind::Absolute, passed, observed, expected, threshold);
    }

    /// Relative check with an absolute fallback when `expected` is
    /// itself below the threshold.
    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, threshold: f64) {
        let passed = if expected.abs() > threshold {
            ((observed - expected) / expected).abs() < threshold
        } else {
            (observed - expected).abs() < threshold
        };
        self.push(label, CheckKind::Relative, passed, observed, expected, threshold);
    }

    /// observed < threshold.
    pub fn check_upper(&mut self, label: &str, observed: f64, threshold: f64) {
        let passed = observed < threshold;
        self.push(label, CheckKind::UpperBound, passed, observed, threshold, threshold);
    }

    /// Plain boolean condition.
    pub fn check_bool(&mut self, label: &str, condition: bool) {
        self.push(
            label,
            CheckKind::Condition,
            condition,
            f64::from(u8::from(condition)),
            1.0,
            0.0,
        );
    }

    fn push(
        &mut self,
        label: &str,
        kind: CheckKind,
        passed: bool,
        observed: f64,
        expected: f64,
        threshold: f64,
    ) {
        self.checks.push(Check {
            label: label.to_string(),
            kind,
            passed,
            observed,
            expected,
            threshold,
        });
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.passed_count() == self.checks.len()
    }

    /// Print the per-check lines and the summary; returns the process
    /// exit code (0 all passed, 1 otherwise).
    #[must_use]
    pub fn summarize(&self) -> i32 {
        println!();
        for check in &self.checks {
            let icon = if check.passed { '✓' } else { '✗' };
            println!(
                "  {icon} {:<44} observed {:>13.6e}  expected {:>13.6e}",
                check.label, check.observed, check.expected
            );
        }
        println!(
            "\n  {}: {}/{} checks passed",
            self.name,
            self.passed_count(),
            self.checks.len()
        );
        i32::from(!self.all_passed())
    }

    /// JSON dump of the whole harness for machine consumption.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_check_boundaries() {
        let mut h = ValidationHarness::new("test");
        h.check_abs("close", 1.0001, 1.0, 0.001);
        h.check_abs("far", 1.1, 1.0, 0.001);
        assert!(h.checks[0].passed);
        assert!(!h.checks[1].passed);
        assert_eq!(h.passed_count(), 1);
        assert!(!h.all_passed());
    }

    #[test]
    fn rel_check_near_zero_expected_uses_abs() {
        let mut h = ValidationHarness::new("test");
        h.check_rel("tiny", 1e-15, 0.0, 1e-10);
        assert!(h.checks[0].passed, "abs fallback for near-zero expected");
        h.check_rel("large", 0.5, 0.0, 1e-10);
        assert!(!h.checks[1].passed);
    }

    #[test]
    fn upper_bound_equal_fails() {
        let mut h = ValidationHarness::new("test");
        h.check_upper("at", 1.0, 1.0);
        assert!(!h.checks[0].passed, "strict upper bound");
        h.check_upper("under", 0.99, 1.0);
        assert!(h.checks[1].passed);
    }

    #[test]
    fn bool_check_records() {
        let mut h = ValidationHarness::new("test");
        h.check_bool("yes", true);
        h.check_bool("no", false);
        assert!(h.checks[0].passed);
        assert!(!h.checks[1].passed);
        assert_eq!(h.summarize(), 1);
    }

    #[test]
    fn json_dump_contains_labels() {
        let mut h = ValidationHarness::new("dump");
        h.check_abs("energy", 1.0, 1.0, 0.1);
        let json = h.to_json().expect("serialize");
        assert!(json.contains("\"name\": \"dump\""));
        assert!(json.contains("energy"));
    }

    #[test]
    fn empty_harness_passes() {
        let h = ValidationHarness::new("empty");
        assert!(h.all_passed());
        assert_eq!(h.summarize(), 0);
    }
}
