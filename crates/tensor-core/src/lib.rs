// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Dense `f32` tensors and the NCHW kernels needed to execute a translated
//! Caffe network.
//!
//! This crate provides:
//! - [`Tensor`]: an owned, row-major n-dimensional `f32` tensor.
//! - [`TensorView`]: a borrowed, read-only view used as kernel input.
//! - [`Shape`]: runtime shape descriptors with element-count helpers.
//! - Kernels: convolution, max/average pooling (Caffe ceil-mode sizing),
//!   cross-channel LRN, fully-connected, softmax, pointwise activations,
//!   channel concat/split and element-wise reductions.
//!
//! # Design Goals
//! - Every kernel writes into a caller-allocated output so the engine
//!   controls allocation; output shapes come from the `*_output_shape`
//!   helpers.
//! - Arithmetic follows the reference framework's loop order closely
//!   enough that results agree to well within 1e-5 after normalization.
//! - Clean error types via `thiserror`.

mod error;
mod ops;
mod shape;
mod tensor;

pub use error::TensorError;
pub use ops::{
    activation, concat, concat_output_shape, conv2d, conv2d_output_shape, eltwise,
    fully_connected, lrn, pool2d, pool2d_output_shape, softmax, split,
    Activation, Conv2dParams, EltwiseOp, LrnParams, Pool2dParams, PoolMethod,
};
pub use shape::Shape;
pub use tensor::{Tensor, TensorView};
