// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # translator
//!
//! Turns a loaded Caffe network into an operator graph plus a parameter set.
//!
//! The pipeline has four stages:
//! - [`params`] converts each trained blob into a canonical [`Tensor`](tensor_core::Tensor).
//! - [`mapper`] maps one source layer to zero or more [`TargetOperator`]s.
//! - [`translate`] walks the layers in order, threading a [`Namespace`]
//!   that renames in-place outputs, and checks the result.
//! - [`rewrite`] drops inference-identity operators (dropout).
//!
//! Graphs serialize as a Caffe2-style `NetDef` ([`netdef`]) or as JSON;
//! parameters as `TensorProtos` or SafeTensors.
//!
//! # Example
//! ```no_run
//! use caffe_model::CaffeLoader;
//! use std::path::Path;
//! use translator::{remove_inference_identities, translate, TranslateOptions};
//!
//! let net = CaffeLoader::load(
//!     Path::new("data/deploy.prototxt"),
//!     Path::new("data/model.caffemodel"),
//! )
//! .unwrap();
//! let t = translate(&net, &TranslateOptions::default()).unwrap();
//! let graph = remove_inference_identities(&t.graph).unwrap();
//! println!("{}", graph.summary());
//! ```

mod error;
pub mod mapper;
mod namespace;
pub mod netdef;
pub mod params;
pub mod rewrite;
mod target;
pub mod translate;

pub use error::TranslateError;
pub use mapper::{map_layer, LayerTranslation};
pub use namespace::Namespace;
pub use rewrite::remove_inference_identities;
pub use target::{ConvArgs, OpKind, PoolArgs, TargetGraph, TargetOperator, TargetParameterSet};
pub use translate::{translate, TranslateOptions, Translation};
