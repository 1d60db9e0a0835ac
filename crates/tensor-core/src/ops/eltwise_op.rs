// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise reductions over same-shaped tensors.

use super::expect_output;
use crate::{Tensor, TensorError, TensorView};

/// Element-wise reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EltwiseOp {
    Sum,
    Prod,
    Max,
}

/// Reduces `inputs` element-wise into `output`. All shapes must match.
pub fn eltwise(op: EltwiseOp, inputs: &[TensorView<'_>], output: &mut Tensor) -> Result<(), TensorError> {
    let (first, rest) = inputs.split_first().ok_or_else(|| TensorError::InvalidArgument {
        op: "eltwise",
        detail: "no inputs".into(),
    })?;
    expect_output("eltwise", first.shape(), output.shape())?;
    for v in rest {
        expect_output("eltwise", first.shape(), v.shape())?;
    }

    let y = output.as_f32_slice_mut();
    y.copy_from_slice(first.as_f32_slice());
    for v in rest {
        for (d, &s) in y.iter_mut().zip(v.as_f32_slice()) {
            *d = match op {
                EltwiseOp::Sum => *d + s,
                EltwiseOp::Prod => *d * s,
                EltwiseOp::Max => d.max(s),
            };
        }
    }
    Ok(())
}
