// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference-time graph rewriting.

use crate::target::TargetGraph;
use crate::TranslateError;
use std::collections::HashMap;

/// Removes every operator that is an identity at inference time (dropout)
/// and rewires its consumers to its input.
///
/// One forward pass suffices for chains: a substitution is recorded only
/// after its source has been resolved, so every stored value is already
/// final. Retained operators keep their order and arguments.
///
/// # Errors
/// [`TranslateError::GraphIntegrity`] if an identity operator does not have
/// exactly one input and one output, or if the rewritten graph fails
/// validation.
pub fn remove_inference_identities(graph: &TargetGraph) -> Result<TargetGraph, TranslateError> {
    let mut substitutions: HashMap<String, String> = HashMap::new();
    let resolve = |subs: &HashMap<String, String>, name: &str| -> String {
        subs.get(name).cloned().unwrap_or_else(|| name.to_string())
    };

    let mut operators = Vec::with_capacity(graph.operators.len());
    for op in &graph.operators {
        if op.kind.is_inference_identity() {
            let (input, output) = match (op.inputs.as_slice(), op.outputs.as_slice()) {
                ([input], [output]) => (input, output),
                _ => {
                    return Err(TranslateError::integrity(
                        op.name.as_str(),
                        "identity operator must have one input and one output",
                    ))
                }
            };
            let upstream = resolve(&substitutions, input);
            tracing::debug!("removing {} '{}': {output} -> {upstream}", op.kind.type_name(), op.name);
            substitutions.insert(output.clone(), upstream);
            continue;
        }

        let mut op = op.clone();
        for input in &mut op.inputs {
            *input = resolve(&substitutions, input);
        }
        operators.push(op);
    }

    let removed = graph.operators.len() - operators.len();
    let mut external_outputs: Vec<String> = Vec::with_capacity(graph.external_outputs.len());
    for name in &graph.external_outputs {
        let name = resolve(&substitutions, name);
        if !external_outputs.contains(&name) {
            external_outputs.push(name);
        }
    }

    let rewritten = TargetGraph {
        name: graph.name.clone(),
        operators,
        external_inputs: graph.external_inputs.clone(),
        parameters: graph.parameters.clone(),
        external_outputs,
        input_shapes: graph.input_shapes.clone(),
        blob_names: graph
            .blob_names
            .iter()
            .map(|(source, target)| (source.clone(), resolve(&substitutions, target)))
            .collect(),
    };
    rewritten.validate()?;

    tracing::info!("'{}': removed {removed} inference-identity operators", graph.name);
    Ok(rewritten)
}
