// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pointwise activation functions.

use super::expect_output;
use crate::{Tensor, TensorError, TensorView};

/// A pointwise activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// `max(x, 0)`.
    Relu,
    /// `x` for positive inputs, `alpha * x` otherwise (Caffe's `negative_slope`).
    LeakyRelu { alpha: f32 },
    /// `1 / (1 + exp(-x))`.
    Sigmoid,
    /// Hyperbolic tangent.
    Tanh,
}

impl Activation {
    #[inline]
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::LeakyRelu { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

/// Applies `act` element-wise. `output` must have the input's shape.
pub fn activation(
    act: Activation,
    input: &TensorView<'_>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    expect_output("activation", input.shape(), output.shape())?;
    for (d, &s) in output
        .as_f32_slice_mut()
        .iter_mut()
        .zip(input.as_f32_slice())
    {
        *d = act.apply(s);
    }
    Ok(())
}
