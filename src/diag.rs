//! Fixed-Point Diagnostics
//!
//! Error measurement of fixed-point results against double-precision
//! references. Used by tests and tuning passes to verify the transcendental
//! approximations stay inside their stated tolerance; never part of the
//! replicated simulation itself.

use crate::math::Fix64;

/// Signed error of a fixed-point value against an `f64` reference.
pub fn absolute_error(value: Fix64, expected: f64) -> f64 {
    value.to_f64() - expected
}

/// Aggregate error statistics over a batch of (fixed, reference) pairs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ErrorStats {
    /// Number of pairs measured.
    pub count: usize,
    /// Largest absolute error.
    pub max_abs: f64,
    /// Mean absolute error.
    pub mean_abs: f64,
}

impl ErrorStats {
    /// Measure `values` against `expected`, pairwise.
    ///
    /// Panics when the slices differ in length — mismatched batches are a
    /// test-harness bug, not a runtime condition.
    pub fn from_pairs(values: &[Fix64], expected: &[f64]) -> Self {
        assert_eq!(
            values.len(),
            expected.len(),
            "value and reference batches must have the same length"
        );
        if values.is_empty() {
            return Self::default();
        }

        let mut sum = 0.0;
        let mut max_abs: f64 = 0.0;
        for (&value, &reference) in values.iter().zip(expected) {
            let err = absolute_error(value, reference).abs();
            sum += err;
            max_abs = max_abs.max(err);
        }

        Self {
            count: values.len(),
            max_abs,
            mean_abs: sum / values.len() as f64,
        }
    }

    /// True when every measured error is below `tolerance`.
    pub fn within(&self, tolerance: f64) -> bool {
        self.max_abs < tolerance
    }
}

// ============================================================================
// Tests
// ============================================================================
