// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Max and average pooling with Caffe's output sizing.
//!
//! Caffe rounds the pooled extent **up** (`ceil`) and then drops a trailing
//! window that would start inside the padding only. Average pooling divides
//! by the window area clipped to the *padded* input, not the valid region.
//! Both details matter for numerical agreement with the source framework.

use super::{expect_output, nchw_dims};
use crate::{Shape, Tensor, TensorError, TensorView};

/// Pooling reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMethod {
    Max,
    Average,
}

/// Geometry of a 2-D pooling window. All pairs are `[height, width]`.
///
/// When `global` is set, the kernel covers the whole spatial extent and
/// `kernel`, `stride` and `pad` are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pool2dParams {
    pub method: PoolMethod,
    pub kernel: [usize; 2],
    pub stride: [usize; 2],
    pub pad: [usize; 2],
    pub global: bool,
}

impl Pool2dParams {
    /// Resolves the effective kernel/stride/pad for an `h × w` input.
    fn resolve(&self, h: usize, w: usize) -> Result<([usize; 2], [usize; 2], [usize; 2]), TensorError> {
        if self.global {
            return Ok(([h, w], [1, 1], [0, 0]));
        }
        if self.kernel.contains(&0) || self.stride.contains(&0) {
            return Err(TensorError::InvalidArgument {
                op: "pool2d",
                detail: format!("kernel and stride must be positive: {self:?}"),
            });
        }
        for axis in 0..2 {
            if self.pad[axis] >= self.kernel[axis] {
                return Err(TensorError::InvalidArgument {
                    op: "pool2d",
                    detail: format!("pad {:?} must be smaller than kernel {:?}", self.pad, self.kernel),
                });
            }
        }
        Ok((self.kernel, self.stride, self.pad))
    }
}

fn pooled_extent(input: usize, kernel: usize, stride: usize, pad: usize) -> Result<usize, TensorError> {
    let padded = input + 2 * pad;
    if padded < kernel {
        return Err(TensorError::InvalidArgument {
            op: "pool2d",
            detail: format!("kernel {kernel} exceeds padded input {padded}"),
        });
    }
    let mut pooled = (padded - kernel).div_ceil(stride) + 1;
    // The last pooling window must start inside the image, not the padding.
    if pad > 0 && (pooled - 1) * stride >= input + pad {
        pooled -= 1;
    }
    Ok(pooled)
}

/// Computes the `[N, C, H_out, W_out]` shape of a pooling operation.
pub fn pool2d_output_shape(input: &Shape, params: &Pool2dParams) -> Result<Shape, TensorError> {
    let (n, c, h, w) = nchw_dims("pool2d", input)?;
    let (kernel, stride, pad) = params.resolve(h, w)?;
    Ok(Shape::nchw(
        n,
        c,
        pooled_extent(h, kernel[0], stride[0], pad[0])?,
        pooled_extent(w, kernel[1], stride[1], pad[1])?,
    ))
}

/// Pools `input` `[N, C, H, W]` into `output` using Caffe semantics.
pub fn pool2d(
    input: &TensorView<'_>,
    params: &Pool2dParams,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let (n, c, h, w) = nchw_dims("pool2d", input.shape())?;
    let (kernel, stride, pad) = params.resolve(h, w)?;
    let expected = pool2d_output_shape(input.shape(), params)?;
    expect_output("pool2d (output)", &expected, output.shape())?;
    let (oh, ow) = (expected.dims()[2], expected.dims()[3]);

    let x = input.as_f32_slice();
    let y = output.as_f32_slice_mut();

    for plane in 0..n * c {
        let x_plane = &x[plane * h * w..(plane + 1) * h * w];
        let y_plane = &mut y[plane * oh * ow..(plane + 1) * oh * ow];
        for py in 0..oh {
            for px in 0..ow {
                let hstart = (py * stride[0]) as isize - pad[0] as isize;
                let wstart = (px * stride[1]) as isize - pad[1] as isize;
                y_plane[py * ow + px] = match params.method {
                    PoolMethod::Max => {
                        let hend = (hstart + kernel[0] as isize).min(h as isize) as usize;
                        let wend = (wstart + kernel[1] as isize).min(w as isize) as usize;
                        let (hs, ws) = (hstart.max(0) as usize, wstart.max(0) as usize);
                        let mut m = f32::MIN;
                        for iy in hs..hend {
                            for ix in ws..wend {
                                m = m.max(x_plane[iy * w + ix]);
                            }
                        }
                        m
                    }
                    PoolMethod::Average => {
                        let hend = (hstart + kernel[0] as isize).min((h + pad[0]) as isize);
                        let wend = (wstart + kernel[1] as isize).min((w + pad[1]) as isize);
                        let area = ((hend - hstart) * (wend - wstart)) as f32;
                        let (hs, ws) = (hstart.max(0) as usize, wstart.max(0) as usize);
                        let (he, we) = (hend.min(h as isize) as usize, wend.min(w as isize) as usize);
                        let mut sum = 0.0f32;
                        for iy in hs..he {
                            for ix in ws..we {
                                sum += x_plane[iy * w + ix];
                            }
                        }
                        sum / area
                    }
                };
            }
        }
    }

    Ok(())
}
