// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # caffe-model
//!
//! The source side of the translator: Caffe network descriptions and their
//! trained parameters.
//!
//! - [`SourceLayer`] / [`LayerKind`] / [`LayerConfig`]: one layer of the
//!   network with its configuration resolved against Caffe's defaults.
//! - [`ParameterBlob`]: a trained array with its declared (possibly legacy)
//!   shape.
//! - [`SourceNet`]: declared inputs plus layers in declaration order.
//! - [`CaffeLoader`]: reads a `deploy.prototxt` (or JSON) description and a
//!   binary `.caffemodel`, and matches blobs to layers by name.
//!
//! # Example
//! ```no_run
//! use caffe_model::CaffeLoader;
//! use std::path::Path;
//!
//! let net = CaffeLoader::load(
//!     Path::new("data/deploy.prototxt"),
//!     Path::new("data/model.caffemodel"),
//! )
//! .unwrap();
//! for layer in &net.layers {
//!     println!("  {}", layer.summary());
//! }
//! ```

mod blob;
pub mod description;
mod error;
mod layer;
mod loader;
mod net;
pub mod proto;
mod prototxt;

pub use blob::{BlobRole, BlobShape, ParameterBlob};
pub use description::NetDescription;
pub use error::ModelError;
pub use layer::{
    ConvolutionConfig, EltwiseConfig, EltwiseMethod, FlattenConfig, InnerProductConfig, LayerConfig,
    LayerKind, LrnConfig, NormRegion, PoolingConfig, PoolingMethod, SourceLayer,
};
pub use loader::CaffeLoader;
pub use net::{InputDecl, SourceNet, TrainedParameters};
