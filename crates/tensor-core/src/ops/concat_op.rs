// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Concatenation and splitting along an axis.

use super::expect_output;
use crate::{Shape, Tensor, TensorError, TensorView};

/// Computes the shape of concatenating `inputs` along `axis`.
///
/// All inputs must agree on every dimension except `axis`.
pub fn concat_output_shape(inputs: &[&Shape], axis: usize) -> Result<Shape, TensorError> {
    let first = inputs.first().ok_or_else(|| TensorError::InvalidArgument {
        op: "concat",
        detail: "no inputs".into(),
    })?;
    if axis >= first.rank() {
        return Err(TensorError::InvalidArgument {
            op: "concat",
            detail: format!("axis {axis} out of range for shape {first}"),
        });
    }
    let mut total = 0;
    for s in inputs {
        let compatible = s.rank() == first.rank()
            && s.dims()
                .iter()
                .zip(first.dims())
                .enumerate()
                .all(|(i, (a, b))| i == axis || a == b);
        if !compatible {
            return Err(TensorError::ShapeMismatch {
                op: "concat",
                lhs: (*first).clone(),
                rhs: (*s).clone(),
            });
        }
        total += s.dims()[axis];
    }
    Ok(first.with_dim(axis, total))
}

/// Concatenates `inputs` along `axis` into `output`.
pub fn concat(inputs: &[TensorView<'_>], axis: usize, output: &mut Tensor) -> Result<(), TensorError> {
    let shapes: Vec<&Shape> = inputs.iter().map(|v| v.shape()).collect();
    let expected = concat_output_shape(&shapes, axis)?;
    expect_output("concat (output)", &expected, output.shape())?;

    let outer = expected.count(0, axis);
    let inner = expected.count_from(axis + 1);
    let out_axis = expected.dims()[axis];
    let y = output.as_f32_slice_mut();

    let mut offset = 0;
    for v in inputs {
        let len = v.shape().dims()[axis];
        let x = v.as_f32_slice();
        for o in 0..outer {
            let src = &x[o * len * inner..(o + 1) * len * inner];
            let dst_start = (o * out_axis + offset) * inner;
            y[dst_start..dst_start + len * inner].copy_from_slice(src);
        }
        offset += len;
    }
    Ok(())
}

/// Splits `input` along `axis` into pieces of the given sizes.
///
/// # Errors
/// Returns [`TensorError::InvalidArgument`] if the sizes do not sum to the
/// axis extent.
pub fn split(input: &TensorView<'_>, axis: usize, sizes: &[usize]) -> Result<Vec<Tensor>, TensorError> {
    let shape = input.shape();
    if axis >= shape.rank() {
        return Err(TensorError::InvalidArgument {
            op: "split",
            detail: format!("axis {axis} out of range for shape {shape}"),
        });
    }
    let extent = shape.dims()[axis];
    if sizes.iter().sum::<usize>() != extent {
        return Err(TensorError::InvalidArgument {
            op: "split",
            detail: format!("sizes {sizes:?} do not sum to axis extent {extent}"),
        });
    }

    let outer = shape.count(0, axis);
    let inner = shape.count_from(axis + 1);
    let x = input.as_f32_slice();

    let mut pieces = Vec::with_capacity(sizes.len());
    let mut offset = 0;
    for &len in sizes {
        let mut piece = Tensor::zeros(shape.with_dim(axis, len));
        let dst = piece.as_f32_slice_mut();
        for o in 0..outer {
            let src_start = (o * extent + offset) * inner;
            dst[o * len * inner..(o + 1) * len * inner]
                .copy_from_slice(&x[src_start..src_start + len * inner]);
        }
        offset += len;
        pieces.push(piece);
    }
    Ok(pieces)
}
