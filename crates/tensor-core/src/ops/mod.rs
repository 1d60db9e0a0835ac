// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor arithmetic operations.
//!
//! Each operation writes into a pre-allocated output tensor whose shape the
//! caller obtains from the matching `*_output_shape` helper (or, for
//! shape-preserving kernels, from the input). All spatial kernels assume
//! `NCHW` layout.

mod activation_op;
mod concat_op;
mod conv_op;
mod eltwise_op;
mod lrn_op;
mod fc_op;
mod pool_op;
mod softmax_op;

pub use activation_op::{activation, Activation};
pub use concat_op::{concat, concat_output_shape, split};
pub use conv_op::{conv2d, conv2d_output_shape, Conv2dParams};
pub use eltwise_op::{eltwise, EltwiseOp};
pub use lrn_op::{lrn, LrnParams};
pub use fc_op::fully_connected;
pub use pool_op::{pool2d, pool2d_output_shape, Pool2dParams, PoolMethod};
pub use softmax_op::softmax;

use crate::{Shape, TensorError};

/// Checks that `shape` is 4-D and returns `(n, c, h, w)`.
pub(crate) fn nchw_dims(op: &'static str, shape: &Shape) -> Result<(usize, usize, usize, usize), TensorError> {
    match shape.dims() {
        &[n, c, h, w] => Ok((n, c, h, w)),
        _ => Err(TensorError::RankMismatch {
            op,
            expected: 4,
            actual: shape.clone(),
        }),
    }
}

/// Checks that the output tensor has the expected shape.
pub(crate) fn expect_output(op: &'static str, expected: &Shape, actual: &Shape) -> Result<(), TensorError> {
    if expected != actual {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: expected.clone(),
            rhs: actual.clone(),
        });
    }
    Ok(())
}
