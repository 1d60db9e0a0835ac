// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax activation operation.

use super::expect_output;
use crate::{Tensor, TensorError, TensorView};

/// Computes softmax along `axis`: `output[i] = exp(x[i] - max) / sum(exp(x - max))`.
///
/// Uses the numerically stable variant that subtracts the maximum value
/// before exponentiation to prevent overflow. The tensor is treated as
/// `[outer, axis_dim, inner]`, so `axis = 1` on an `NCHW` tensor normalises
/// across channels at every spatial position, as Caffe does.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ,
/// or [`TensorError::InvalidArgument`] if `axis` is out of range.
pub fn softmax(input: &TensorView<'_>, axis: i32, output: &mut Tensor) -> Result<(), TensorError> {
    expect_output("softmax", input.shape(), output.shape())?;

    let shape = input.shape();
    if shape.rank() == 0 {
        // Scalar: softmax of a single value is 1.0.
        output.as_f32_slice_mut()[0] = 1.0;
        return Ok(());
    }

    let axis = shape.canonical_axis(axis)?;
    let outer = shape.count(0, axis);
    let channels = shape.dims()[axis];
    let inner = shape.count_from(axis + 1);
    if channels == 0 {
        return Ok(()); // Empty softmax dimension.
    }

    let src = input.as_f32_slice();
    let dst = output.as_f32_slice_mut();

    for o in 0..outer {
        let base = o * channels * inner;
        for i in 0..inner {
            let at = |c: usize| base + c * inner + i;

            // Find max for numerical stability.
            let max_val = (0..channels)
                .map(|c| src[at(c)])
                .fold(f32::NEG_INFINITY, f32::max);

            // Compute exp(x - max) and sum.
            let mut sum = 0.0f32;
            for c in 0..channels {
                let e = (src[at(c)] - max_val).exp();
                dst[at(c)] = e;
                sum += e;
            }

            // Normalize.
            if sum > 0.0 {
                let inv_sum = 1.0 / sum;
                for c in 0..channels {
                    dst[at(c)] *= inv_sum;
                }
            }
        }
    }

    Ok(())
}
