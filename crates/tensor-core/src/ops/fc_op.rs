// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fully-connected (`InnerProduct`) layers.

use super::expect_output;
use crate::{Shape, Tensor, TensorError, TensorView};

/// Fully-connected layer: `output = flatten(input, axis) @ weight^T + bias`.
///
/// `input` is viewed as `[M, K]` where `M = count(0, axis)` and
/// `K = count(axis, rank)`. `weight` is `[N, K]` (Caffe's `InnerProduct`
/// layout, one row per output unit), `bias` is `[N]`, and `output` must
/// be `[M, N]`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if `K`, `N` or the output shape disagree.
pub fn fully_connected(
    input: &TensorView<'_>,
    weight: &TensorView<'_>,
    bias: Option<&TensorView<'_>>,
    axis: usize,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let m = input.shape().count(0, axis);
    let k = input.shape().count_from(axis);

    let (n, wk) = match weight.shape().dims() {
        &[n, wk] => (n, wk),
        _ => {
            return Err(TensorError::RankMismatch {
                op: "fully_connected (weight)",
                expected: 2,
                actual: weight.shape().clone(),
            })
        }
    };
    if wk != k {
        return Err(TensorError::ShapeMismatch {
            op: "fully_connected",
            lhs: input.shape().clone(),
            rhs: weight.shape().clone(),
        });
    }
    if let Some(b) = bias {
        if b.shape().num_elements() != n {
            return Err(TensorError::ShapeMismatch {
                op: "fully_connected (bias)",
                lhs: Shape::vector(n),
                rhs: b.shape().clone(),
            });
        }
    }
    expect_output("fully_connected (output)", &Shape::matrix(m, n), output.shape())?;

    let x = input.as_f32_slice();
    let w = weight.as_f32_slice();
    let y = output.as_f32_slice_mut();

    for i in 0..m {
        let row = &x[i * k..(i + 1) * k];
        for j in 0..n {
            let w_row = &w[j * k..(j + 1) * k];
            y[i * n + j] = row.iter().zip(w_row).map(|(a, b)| a * b).sum();
        }
    }
    if let Some(b) = bias {
        let b = b.as_f32_slice();
        for row in y.chunks_exact_mut(n) {
            for (v, bj) in row.iter_mut().zip(b) {
                *v += bj;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fc_flattens_nchw_input() {
        // Input [1, 2, 1, 2] flattens to [1, 4].
        let x = Tensor::from_f32(Shape::nchw(1, 2, 1, 2), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let w = Tensor::from_f32(
            Shape::matrix(2, 4),
            &[1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        let b = Tensor::from_f32(Shape::vector(2), &[0.5, -10.0]).unwrap();
        let mut y = Tensor::zeros(Shape::matrix(1, 2));

        fully_connected(&x.view(), &w.view(), Some(&b.view()), 1, &mut y).unwrap();

        assert_eq!(y.as_f32_slice(), &[1.5, 0.0]);
    }

    #[test]
    fn test_fc_rows_dot_weight_rows() {
        let x = Tensor::from_f32(Shape::matrix(2, 3), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        // One weight row per output unit.
        let w = Tensor::from_f32(Shape::matrix(2, 3), &[7.0, 9.0, 11.0, 8.0, 10.0, 12.0]).unwrap();
        let mut y = Tensor::zeros(Shape::matrix(2, 2));

        fully_connected(&x.view(), &w.view(), None, 1, &mut y).unwrap();

        assert_eq!(y.as_f32_slice(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_fc_rejects_wrong_inner_dim() {
        let x = Tensor::zeros(Shape::matrix(1, 5));
        let w = Tensor::zeros(Shape::matrix(2, 4));
        let mut y = Tensor::zeros(Shape::matrix(1, 2));
        assert!(fully_connected(&x.view(), &w.view(), None, 1, &mut y).is_err());
    }
}
