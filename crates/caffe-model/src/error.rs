// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for loading Caffe network descriptions and parameters.

/// Errors that can occur when reading a source model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A model file could not be read.
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    /// The JSON form of the description is malformed or has the wrong schema.
    #[error("failed to parse description: {0}")]
    Json(#[from] serde_json::Error),

    /// The prototxt form of the description is syntactically invalid.
    #[error("prototxt syntax error at {line}:{column}: {detail}")]
    Syntax {
        line: usize,
        column: usize,
        detail: String,
    },

    /// The binary parameter container is not a valid `NetParameter`.
    #[error("failed to decode caffemodel: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A layer or blob definition is invalid.
    #[error("invalid layer '{layer}': {detail}")]
    InvalidLayer { layer: String, detail: String },

    /// Two layers in the same description share a name.
    #[error("duplicate layer name '{0}'")]
    DuplicateLayer(String),
}
