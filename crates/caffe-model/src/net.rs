// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A complete source network: declared inputs plus ordered layers.

use crate::description::NetDescription;
use crate::{ModelError, ParameterBlob, SourceLayer};
use std::collections::{BTreeMap, HashSet};
use tensor_core::Shape;

/// A network input declared at net level (`input:` / `input_shape`).
#[derive(Debug, Clone, PartialEq)]
pub struct InputDecl {
    pub name: String,
    pub shape: Option<Shape>,
}

/// Trained parameters decoded from a binary container, keyed by layer name.
#[derive(Debug, Clone, Default)]
pub struct TrainedParameters {
    pub net_name: String,
    pub layers: BTreeMap<String, Vec<ParameterBlob>>,
}

impl TrainedParameters {
    pub fn num_blobs(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }

    pub fn num_values(&self) -> usize {
        self.layers.values().flatten().map(|b| b.data.len()).sum()
    }
}

/// The source model in declaration order.
#[derive(Debug, Clone)]
pub struct SourceNet {
    pub name: String,
    pub inputs: Vec<InputDecl>,
    pub layers: Vec<SourceLayer>,
}

impl SourceNet {
    /// Builds a net from a parsed description. Layer names must be unique.
    pub fn from_description(desc: &NetDescription) -> Result<Self, ModelError> {
        let inputs = desc
            .declared_inputs()?
            .into_iter()
            .map(|(name, shape)| InputDecl { name, shape })
            .collect();
        let layers = desc.resolve_layers()?;

        let mut seen = HashSet::new();
        for layer in &layers {
            if !seen.insert(layer.name.as_str()) {
                return Err(ModelError::DuplicateLayer(layer.name.clone()));
            }
        }

        Ok(Self {
            name: desc.name.clone(),
            inputs,
            layers,
        })
    }

    /// Attaches trained blobs to description layers by name.
    ///
    /// Binary layers without a description counterpart are ignored. Layers
    /// left without blobs are not an error here; translation decides whether
    /// a kind needs them.
    pub fn attach_parameters(mut self, mut params: TrainedParameters) -> Self {
        let mut attached = 0usize;
        for layer in &mut self.layers {
            if let Some(blobs) = params.layers.remove(&layer.name) {
                attached += blobs.len();
                layer.blobs = blobs;
            }
        }
        for name in params.layers.keys() {
            tracing::debug!("ignoring trained layer '{name}': not in the description");
        }
        tracing::info!(
            "attached {attached} blobs from '{}' to '{}'",
            params.net_name,
            self.name
        );
        self
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, name: &str) -> Option<&SourceLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Total number of trained values across all layers.
    pub fn num_parameters(&self) -> usize {
        self.layers
            .iter()
            .flat_map(|l| &l.blobs)
            .map(|b| b.data.len())
            .sum()
    }

    /// Returns a summary string describing the net.
    pub fn summary(&self) -> String {
        format!(
            "Net '{}': {} inputs, {} layers, {:.2}M parameters",
            self.name,
            self.inputs.len(),
            self.num_layers(),
            self.num_parameters() as f64 / 1e6,
        )
    }
}
