// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The reference execution engine for translated graphs.
//!
//! The runtime takes:
//! - A validated `TargetGraph` from `translator`.
//! - Its converted `TargetParameterSet` (or an exported SafeTensors file).
//! - An input tensor.
//!
//! And executes the graph once, operator by operator, on `tensor-core`
//! kernels. Every named intermediate stays in the [`Workspace`] so it can be
//! compared against reference dumps afterwards.
//!
//! # Type-State Pipeline
//! [`Pipeline`] enforces the load → translate → prepare → run order:
//! ```text
//! Pipeline<Loaded> → Pipeline<Translated> → Pipeline<Ready>
//! ```
//! Transitions are compile-time checked.

mod config;
mod error;
mod metrics;
mod parameter_file;
mod pipeline;
mod workspace;

pub use config::{RunConfig, CAFFENET_CHECKED, DEFAULT_FIXTURE_DIR};
pub use error::RuntimeError;
pub use metrics::{OperatorMetrics, RunMetrics};
pub use parameter_file::ParameterFile;
pub use pipeline::{Loaded, Pipeline, PipelineState, Ready, Translated};
pub use workspace::Workspace;
