// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cross-channel local response normalization.

use super::{expect_output, nchw_dims};
use crate::{Tensor, TensorError, TensorView};

/// Parameters of cross-channel LRN.
///
/// `output = x / (bias + alpha / size * Σ x_j²)^beta`, where the sum runs
/// over the `size` channels centred on the current one (zero outside).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LrnParams {
    pub size: usize,
    pub alpha: f32,
    pub beta: f32,
    pub bias: f32,
}

/// Applies cross-channel LRN to an `NCHW` tensor.
///
/// # Errors
/// Returns [`TensorError::InvalidArgument`] if `size` is even or zero.
pub fn lrn(input: &TensorView<'_>, params: &LrnParams, output: &mut Tensor) -> Result<(), TensorError> {
    if params.size == 0 || params.size % 2 == 0 {
        return Err(TensorError::InvalidArgument {
            op: "lrn",
            detail: format!("local size must be odd, got {}", params.size),
        });
    }
    let (n, c, h, w) = nchw_dims("lrn", input.shape())?;
    expect_output("lrn", input.shape(), output.shape())?;

    let half = params.size / 2;
    let plane = h * w;
    let alpha_over_size = params.alpha / params.size as f32;
    let x = input.as_f32_slice();
    let y = output.as_f32_slice_mut();

    for b in 0..n {
        let img = &x[b * c * plane..(b + 1) * c * plane];
        let out = &mut y[b * c * plane..(b + 1) * c * plane];
        for ch in 0..c {
            let lo = ch.saturating_sub(half);
            let hi = (ch + half).min(c - 1);
            for p in 0..plane {
                let mut sq = 0.0f32;
                for j in lo..=hi {
                    let v = img[j * plane + p];
                    sq += v * v;
                }
                let scale = params.bias + alpha_over_size * sq;
                out[ch * plane + p] = img[ch * plane + p] * scale.powf(-params.beta);
            }
        }
    }

    Ok(())
}
