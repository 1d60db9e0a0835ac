// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for fixture I/O and verification.

use crate::VerificationReport;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// A file could not be read or written.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A `.npy` payload is malformed or uses an unsupported layout.
    #[error("invalid .npy data in '{origin}': {detail}")]
    Npy { origin: String, detail: String },

    /// A named tensor is not available from a source.
    #[error("tensor '{name}' is unavailable: {detail}")]
    Unavailable { name: String, detail: String },

    /// At least one checked tensor disagreed with its reference.
    #[error("{}", .0.summary())]
    Failed(VerificationReport),

    #[error("runtime error: {0}")]
    Runtime(#[from] runtime::RuntimeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VerifyError {
    pub(crate) fn npy(origin: &str, detail: impl Into<String>) -> Self {
        Self::Npy {
            origin: origin.to_string(),
            detail: detail.into(),
        }
    }
}
