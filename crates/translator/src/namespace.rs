// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor-name bookkeeping threaded through translation.
//!
//! Caffe lets a layer write back into the tensor it reads (`bottom: "conv1"
//! top: "conv1"`). The target graph forbids that, so every emitted name is
//! recorded here and an output that would reuse a taken name gets a fresh
//! one. The source name's binding then moves to the fresh name so later
//! layers read the latest value.

use crate::TranslateError;
use std::collections::{BTreeMap, BTreeSet};

/// Emitted target names plus the current source→target binding.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    names: BTreeSet<String>,
    bindings: BTreeMap<String, String>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a data input. Its target name is its source name.
    ///
    /// # Errors
    /// [`TranslateError::GraphIntegrity`] if the name is already in use.
    pub fn declare_input(&mut self, name: &str) -> Result<(), TranslateError> {
        if !self.names.insert(name.to_string()) {
            return Err(TranslateError::integrity(name, "input declared more than once"));
        }
        self.bindings.insert(name.to_string(), name.to_string());
        Ok(())
    }

    /// Current target name of a source tensor read by `layer`.
    pub fn resolve(&self, source: &str, layer: &str) -> Result<String, TranslateError> {
        self.bindings.get(source).cloned().ok_or_else(|| {
            TranslateError::integrity(layer, format!("input '{source}' is not produced by any earlier layer"))
        })
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns `base` if free, otherwise `base_1`, `base_2`, ... The returned
    /// name is reserved.
    pub fn fresh(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut n = 1usize;
        while self.names.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        self.names.insert(candidate.clone());
        candidate
    }

    /// Points `source` at `target`.
    pub fn bind(&mut self, source: &str, target: &str) {
        self.bindings.insert(source.to_string(), target.to_string());
    }

    /// Reserves a target name for `output` of `layer` and binds it.
    ///
    /// The source name is used when free. A taken name (in-place writes, or
    /// a top reused by a later layer) becomes `{output}_{layer}`.
    pub fn bind_output(&mut self, layer: &str, output: &str) -> String {
        let target = if self.is_taken(output) {
            self.fresh(&format!("{output}_{layer}"))
        } else {
            self.fresh(output)
        };
        self.bind(output, &target);
        target
    }

    /// Reserves a parameter tensor name.
    ///
    /// # Errors
    /// [`TranslateError::GraphIntegrity`] if the name collides with an
    /// existing tensor.
    pub fn reserve_parameter(&mut self, name: &str) -> Result<(), TranslateError> {
        if !self.names.insert(name.to_string()) {
            return Err(TranslateError::integrity(name, "parameter name collides with another tensor"));
        }
        Ok(())
    }

    /// Final source→target bindings.
    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }
}
