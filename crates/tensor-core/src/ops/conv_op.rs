// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 2-D convolution over `NCHW` tensors.

use super::{expect_output, nchw_dims};
use crate::{Shape, Tensor, TensorError, TensorView};

/// Geometry of a 2-D convolution. All pairs are `[height, width]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dParams {
    pub kernel: [usize; 2],
    pub stride: [usize; 2],
    pub pad: [usize; 2],
    pub dilation: [usize; 2],
}

impl Default for Conv2dParams {
    fn default() -> Self {
        Self {
            kernel: [1, 1],
            stride: [1, 1],
            pad: [0, 0],
            dilation: [1, 1],
        }
    }
}

impl Conv2dParams {
    fn validate(&self) -> Result<(), TensorError> {
        if self.kernel.contains(&0) || self.stride.contains(&0) || self.dilation.contains(&0) {
            return Err(TensorError::InvalidArgument {
                op: "conv2d",
                detail: format!("kernel, stride and dilation must be positive: {self:?}"),
            });
        }
        Ok(())
    }

    fn output_extent(&self, axis: usize, input: usize) -> Result<usize, TensorError> {
        let span = self.dilation[axis] * (self.kernel[axis] - 1) + 1;
        let padded = input + 2 * self.pad[axis];
        if padded < span {
            return Err(TensorError::InvalidArgument {
                op: "conv2d",
                detail: format!("kernel extent {span} exceeds padded input {padded}"),
            });
        }
        Ok((padded - span) / self.stride[axis] + 1)
    }
}

/// Computes the `[N, out_channels, H_out, W_out]` shape of a convolution.
pub fn conv2d_output_shape(
    input: &Shape,
    out_channels: usize,
    params: &Conv2dParams,
) -> Result<Shape, TensorError> {
    params.validate()?;
    let (n, _, h, w) = nchw_dims("conv2d", input)?;
    Ok(Shape::nchw(
        n,
        out_channels,
        params.output_extent(0, h)?,
        params.output_extent(1, w)?,
    ))
}

/// Convolves `input` `[N, C, H, W]` with `weight` `[M, C, kh, kw]` and an
/// optional `bias` `[M]`, writing `[N, M, H_out, W_out]` into `output`.
///
/// Zero padding is applied symmetrically. Grouped convolution is expressed
/// by the caller as channel split + per-group convolution + concat.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if channel counts, kernel size,
/// bias length or the output shape disagree.
pub fn conv2d(
    input: &TensorView<'_>,
    weight: &TensorView<'_>,
    bias: Option<&TensorView<'_>>,
    params: &Conv2dParams,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let (n, c, h, w) = nchw_dims("conv2d (input)", input.shape())?;
    let (m, wc, kh, kw) = nchw_dims("conv2d (weight)", weight.shape())?;
    if wc != c || [kh, kw] != params.kernel {
        return Err(TensorError::ShapeMismatch {
            op: "conv2d",
            lhs: input.shape().clone(),
            rhs: weight.shape().clone(),
        });
    }
    if let Some(b) = bias {
        if b.shape().num_elements() != m {
            return Err(TensorError::ShapeMismatch {
                op: "conv2d (bias)",
                lhs: Shape::vector(m),
                rhs: b.shape().clone(),
            });
        }
    }
    let expected = conv2d_output_shape(input.shape(), m, params)?;
    expect_output("conv2d (output)", &expected, output.shape())?;

    let (oh, ow) = (expected.dims()[2], expected.dims()[3]);
    let [sh, sw] = params.stride;
    let [ph, pw] = params.pad;
    let [dh, dw] = params.dilation;

    let x = input.as_f32_slice();
    let k = weight.as_f32_slice();
    let bias = bias.map(|b| b.as_f32_slice());
    let y = output.as_f32_slice_mut();

    for b in 0..n {
        let x_img = &x[b * c * h * w..(b + 1) * c * h * w];
        for oc in 0..m {
            let k_oc = &k[oc * c * kh * kw..(oc + 1) * c * kh * kw];
            let init = bias.map_or(0.0, |bv| bv[oc]);
            let y_plane = &mut y[(b * m + oc) * oh * ow..(b * m + oc + 1) * oh * ow];
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut acc = 0.0f32;
                    for ic in 0..c {
                        let x_plane = &x_img[ic * h * w..(ic + 1) * h * w];
                        let k_plane = &k_oc[ic * kh * kw..(ic + 1) * kh * kw];
                        for ky in 0..kh {
                            let iy = (oy * sh + ky * dh) as isize - ph as isize;
                            if iy < 0 || iy >= h as isize {
                                continue;
                            }
                            let x_row = &x_plane[iy as usize * w..(iy as usize + 1) * w];
                            for kx in 0..kw {
                                let ix = (ox * sw + kx * dw) as isize - pw as isize;
                                if ix < 0 || ix >= w as isize {
                                    continue;
                                }
                                acc += k_plane[ky * kw + kx] * x_row[ix as usize];
                            }
                        }
                    }
                    y_plane[oy * ow + ox] = acc + init;
                }
            }
        }
    }

    Ok(())
}
