// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for translation, rewriting and target serialization.

use caffe_model::ModelError;

/// Errors raised while translating a source network.
///
/// Every variant names the offending layer, operator or tensor. Translation
/// stops at the first error; no partial graph is returned.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// A parameter blob's declared shape does not match its payload, or the
    /// blob cannot be put in canonical form.
    #[error("cannot convert parameter '{tensor}': {detail}")]
    Conversion { tensor: String, detail: String },

    /// No mapping rule exists for the layer's type.
    #[error("no mapping rule for layer '{layer}' of type '{kind}'")]
    UnknownLayer { layer: String, kind: String },

    /// The target graph violates producer-before-consumer ordering or
    /// output-name uniqueness.
    #[error("graph integrity violation at '{at}': {detail}")]
    GraphIntegrity { at: String, detail: String },

    /// A layer that needs trained parameters has none (or too few).
    #[error("layer '{layer}' is missing trained parameters: {detail}")]
    MissingParameters { layer: String, detail: String },

    /// The layer's type is known but this configuration is not supported.
    #[error("layer '{layer}' uses an unsupported configuration: {detail}")]
    UnsupportedParameter { layer: String, detail: String },

    /// The source model itself is invalid.
    #[error("source model error: {0}")]
    Model(#[from] ModelError),

    /// A serialized graph or parameter set is malformed.
    #[error("malformed serialized model: {0}")]
    Decode(String),

    /// A JSON graph dump could not be written or read.
    #[error("graph JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parameter export to SafeTensors failed.
    #[error("SafeTensors export failed: {0}")]
    SafeTensors(#[from] safetensors::SafeTensorError),
}

impl TranslateError {
    pub(crate) fn integrity(at: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::GraphIntegrity {
            at: at.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn unsupported(layer: &str, detail: impl Into<String>) -> Self {
        Self::UnsupportedParameter {
            layer: layer.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<prost::DecodeError> for TranslateError {
    fn from(e: prost::DecodeError) -> Self {
        Self::Decode(e.to_string())
    }
}
