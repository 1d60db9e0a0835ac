// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph execution.

/// Errors that can occur while feeding, running or fetching.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A blob was fetched or read before anything stored it.
    #[error("blob '{0}' does not exist in the workspace")]
    MissingBlob(String),

    /// An operator's inputs or outputs do not fit its kind.
    #[error("operator '{operator}' is malformed: {detail}")]
    InvalidOperator { operator: String, detail: String },

    /// A tensor kernel failed while running an operator.
    #[error("execution error in operator '{operator}': {source}")]
    ExecutionError {
        operator: String,
        #[source]
        source: tensor_core::TensorError,
    },

    /// Reading an exported parameter file failed.
    #[error("parameter loading failed for '{path}': {detail}")]
    ParameterLoad { path: String, detail: String },

    /// Loading or translating the source model failed.
    #[error("model error: {0}")]
    Model(#[from] caffe_model::ModelError),

    #[error("translation error: {0}")]
    Translate(#[from] translator::TranslateError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl RuntimeError {
    pub(crate) fn execution(operator: &str) -> impl FnOnce(tensor_core::TensorError) -> Self + '_ {
        move |source| Self::ExecutionError {
            operator: operator.to_string(),
            source,
        }
    }
}
