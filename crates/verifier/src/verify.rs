// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scale-normalized tensor comparison.
//!
//! For each checked name the computed and reference tensors must have the
//! same shape. Both are then divided by `max(computed)` and every element
//! pair must satisfy `|c - r| < 1.5 * 10^-decimal`. Every name is checked
//! and every failure is collected.

use crate::{TensorSource, VerifyError};
use serde::Serialize;
use tensor_core::{Shape, Tensor};

/// Default number of decimal places of agreement.
pub const DEFAULT_DECIMAL: u32 = 5;

/// Which side of the comparison could not provide a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Computed,
    Reference,
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    ShapeMismatch {
        name: String,
        computed: Shape,
        reference: Shape,
    },
    ValueMismatch {
        name: String,
        /// Largest scaled deviation.
        max_deviation: f32,
        /// Flat index of the largest deviation.
        index: usize,
        tolerance: f32,
    },
    Missing {
        name: String,
        side: Side,
        detail: String,
    },
}

impl Mismatch {
    pub fn name(&self) -> &str {
        match self {
            Self::ShapeMismatch { name, .. }
            | Self::ValueMismatch { name, .. }
            | Self::Missing { name, .. } => name,
        }
    }
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShapeMismatch {
                name,
                computed,
                reference,
            } => write!(f, "{name}: shape {computed} != reference {reference}"),
            Self::ValueMismatch {
                name,
                max_deviation,
                index,
                tolerance,
            } => write!(
                f,
                "{name}: deviation {max_deviation:e} at index {index} exceeds {tolerance:e}"
            ),
            Self::Missing { name, side, detail } => {
                write!(f, "{name}: {side:?} tensor unavailable ({detail})")
            }
        }
    }
}

/// Outcome of checking one name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TensorCheck {
    pub name: String,
    /// Normalization divisor applied to both sides.
    pub scale: f32,
    /// Largest scaled deviation, when shapes matched.
    pub max_deviation: Option<f32>,
    pub passed: bool,
}

/// Result of a verification run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationReport {
    pub decimal: u32,
    pub checks: Vec<TensorCheck>,
    pub mismatches: Vec<Mismatch>,
}

impl VerificationReport {
    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Names that failed, in check order.
    pub fn failed_names(&self) -> Vec<&str> {
        self.mismatches.iter().map(Mismatch::name).collect()
    }

    /// Converts a report with failures into [`VerifyError::Failed`].
    pub fn into_result(self) -> Result<Self, VerifyError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(VerifyError::Failed(self))
        }
    }

    pub fn to_json(&self) -> Result<String, VerifyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn summary(&self) -> String {
        let mut s = format!(
            "verified {} tensors to {} decimals: {} passed, {} failed",
            self.checks.len(),
            self.decimal,
            self.checks.len() - self.mismatches.len(),
            self.mismatches.len()
        );
        for m in &self.mismatches {
            s.push_str("\n  ");
            s.push_str(&m.to_string());
        }
        s
    }
}

/// Compares named tensors from two sources.
#[derive(Debug, Clone, Copy)]
pub struct Verifier {
    decimal: u32,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(DEFAULT_DECIMAL)
    }
}

impl Verifier {
    pub fn new(decimal: u32) -> Self {
        Self { decimal }
    }

    /// Absolute tolerance applied after normalization.
    pub fn tolerance(&self) -> f32 {
        1.5 * 10f32.powi(-(self.decimal as i32))
    }

    /// Checks every name in `names`, collecting all failures.
    pub fn verify<C, R>(&self, names: &[impl AsRef<str>], computed: &C, reference: &R) -> VerificationReport
    where
        C: TensorSource + ?Sized,
        R: TensorSource + ?Sized,
    {
        let mut report = VerificationReport {
            decimal: self.decimal,
            ..Default::default()
        };

        for name in names {
            let name = name.as_ref();
            let fetched = computed
                .fetch(name)
                .map_err(|e| (Side::Computed, e))
                .and_then(|c| reference.fetch(name).map(|r| (c, r)).map_err(|e| (Side::Reference, e)));
            let (check, mismatch) = match fetched {
                Ok((c, r)) => self.compare(name, &c, &r),
                Err((side, e)) => (
                    TensorCheck {
                        name: name.to_string(),
                        scale: 1.0,
                        max_deviation: None,
                        passed: false,
                    },
                    Some(Mismatch::Missing {
                        name: name.to_string(),
                        side,
                        detail: e.to_string(),
                    }),
                ),
            };

            match &mismatch {
                Some(m) => tracing::warn!("{m}"),
                None => tracing::debug!(
                    "{name}: ok (scale {}, max deviation {:e})",
                    check.scale,
                    check.max_deviation.unwrap_or(0.0)
                ),
            }
            report.checks.push(check);
            report.mismatches.extend(mismatch);
        }

        tracing::info!(
            "{} vs {}: {}",
            computed.label(),
            reference.label(),
            report.summary().lines().next().unwrap_or_default()
        );
        report
    }

    /// Compares one pair of tensors.
    pub fn compare(&self, name: &str, computed: &Tensor, reference: &Tensor) -> (TensorCheck, Option<Mismatch>) {
        let scale = normalization_scale(computed);
        let mut check = TensorCheck {
            name: name.to_string(),
            scale,
            max_deviation: None,
            passed: false,
        };

        if computed.shape() != reference.shape() {
            let mismatch = Mismatch::ShapeMismatch {
                name: name.to_string(),
                computed: computed.shape().clone(),
                reference: reference.shape().clone(),
            };
            return (check, Some(mismatch));
        }

        let tolerance = self.tolerance();
        let mut worst = (0.0f32, 0usize);
        let mut failed = false;
        for (i, (c, r)) in computed
            .as_f32_slice()
            .iter()
            .zip(reference.as_f32_slice())
            .enumerate()
        {
            let deviation = (c / scale - r / scale).abs();
            // NaN never satisfies the bound and ranks above any finite deviation.
            failed |= !(deviation < tolerance);
            let key = if deviation.is_nan() { f32::INFINITY } else { deviation };
            if key > worst.0 {
                worst = (key, i);
            }
        }

        check.max_deviation = Some(worst.0);
        check.passed = !failed;
        let mismatch = failed.then(|| Mismatch::ValueMismatch {
            name: name.to_string(),
            max_deviation: worst.0,
            index: worst.1,
            tolerance,
        });
        (check, mismatch)
    }
}

/// `max(computed)`, or `1.0` when that is zero, non-finite, or the tensor
/// is empty.
pub fn normalization_scale(computed: &Tensor) -> f32 {
    match computed.max_value() {
        Some(m) if m.is_finite() && m != 0.0 => m,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn t(dims: &[usize], values: Vec<f32>) -> Tensor {
        Tensor::from_vec(Shape::new(dims.to_vec()), values).unwrap()
    }

    fn map(entries: Vec<(&str, Tensor)>) -> BTreeMap<String, Tensor> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_tolerance() {
        assert!((Verifier::new(5).tolerance() - 1.5e-5).abs() < 1e-12);
        assert!((Verifier::new(2).tolerance() - 0.015).abs() < 1e-9);
    }

    #[test]
    fn test_large_scale_small_relative_error_passes() {
        let c = t(&[3], vec![1000.0, 500.0, -250.0]);
        let r = t(&[3], vec![1000.004, 500.002, -250.001]);
        let (check, mismatch) = Verifier::default().compare("fc8", &c, &r);
        assert!(mismatch.is_none());
        assert!(check.passed);
        assert_eq!(check.scale, 1000.0);
    }

    #[test]
    fn test_perturbation_reports_worst_index() {
        let c = t(&[4], vec![1.0, 0.5, 0.25, 0.0]);
        let r = t(&[4], vec![1.0, 0.5001, 0.2, 0.0]);
        let (_, mismatch) = Verifier::default().compare("pool1", &c, &r);
        match mismatch {
            Some(Mismatch::ValueMismatch { name, index, max_deviation, .. }) => {
                assert_eq!(name, "pool1");
                assert_eq!(index, 2);
                assert!((max_deviation - 0.05).abs() < 1e-6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let c = t(&[2, 2], vec![1.0; 4]);
        let r = t(&[4], vec![1.0; 4]);
        let (_, mismatch) = Verifier::default().compare("conv1", &c, &r);
        assert!(matches!(mismatch, Some(Mismatch::ShapeMismatch { .. })));
    }

    #[test]
    fn test_degenerate_scale() {
        assert_eq!(normalization_scale(&t(&[2], vec![-2.0, -1.0])), -1.0);
        assert_eq!(normalization_scale(&t(&[2], vec![0.0, 0.0])), 1.0);
        assert_eq!(normalization_scale(&t(&[1], vec![f32::INFINITY])), 1.0);
    }

    #[test]
    fn test_nan_fails() {
        let c = t(&[2], vec![1.0, f32::NAN]);
        let r = t(&[2], vec![1.0, 1.0]);
        let (check, mismatch) = Verifier::default().compare("prob", &c, &r);
        assert!(!check.passed);
        assert!(mismatch.is_some());
    }

    #[test]
    fn test_all_failures_collected() {
        let computed = map(vec![
            ("conv1", t(&[2], vec![1.0, 2.0])),
            ("pool1", t(&[2], vec![1.0, 2.0])),
            ("fc6", t(&[2], vec![1.0, 2.0])),
        ]);
        let reference = map(vec![
            ("conv1", t(&[2], vec![1.0, 2.0])),
            ("pool1", t(&[2], vec![1.5, 2.0])),
            ("fc6", t(&[1], vec![1.0])),
            ("prob", t(&[1], vec![1.0])),
        ]);
        let names = ["conv1", "pool1", "fc6", "prob"];
        let report = Verifier::default().verify(&names, &computed, &reference);

        assert_eq!(report.checks.len(), 4);
        assert_eq!(report.failed_names(), vec!["pool1", "fc6", "prob"]);
        assert!(matches!(
            &report.mismatches[2],
            Mismatch::Missing { side: Side::Computed, .. }
        ));
        assert!(report.summary().contains("1 passed, 3 failed"));
        assert!(report.to_json().unwrap().contains("\"kind\": \"shape_mismatch\""));
        assert!(matches!(report.into_result(), Err(VerifyError::Failed(_))));
    }

    #[test]
    fn test_success_converts_to_ok() {
        let a = map(vec![("prob", t(&[2], vec![0.25, 0.75]))]);
        let report = Verifier::new(6).verify(&["prob"], &a, &a);
        assert!(report.is_success());
        assert!(report.into_result().is_ok());
    }
}
