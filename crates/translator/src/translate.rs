// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Whole-network translation.

use crate::mapper::map_layer;
use crate::target::{TargetGraph, TargetParameterSet};
use crate::{Namespace, TranslateError};
use caffe_model::SourceNet;
use std::time::Instant;

/// Knobs for [`translate`].
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Overrides the graph name (defaults to the source net's name).
    pub net_name: Option<String>,
    /// Source tensor names to expose as outputs. When empty, every tensor
    /// that no later layer consumes is exposed.
    pub external_outputs: Vec<String>,
}

/// A translated graph together with its parameters.
#[derive(Debug, Clone)]
pub struct Translation {
    pub graph: TargetGraph,
    pub parameters: TargetParameterSet,
}

/// Translates a source network, layer by layer in declaration order.
///
/// The result is checked with [`TargetGraph::validate`] before it is
/// returned. Translating the same net twice yields identical results.
///
/// # Errors
/// The first [`TranslateError`] raised by any layer, or by the final
/// integrity check.
pub fn translate(net: &SourceNet, options: &TranslateOptions) -> Result<Translation, TranslateError> {
    let start = Instant::now();
    let mut ns = Namespace::new();
    let mut graph = TargetGraph {
        name: options.net_name.clone().unwrap_or_else(|| net.name.clone()),
        ..Default::default()
    };
    let mut parameters = TargetParameterSet::new();

    for input in &net.inputs {
        ns.declare_input(&input.name)?;
        graph.external_inputs.push(input.name.clone());
        if let Some(shape) = &input.shape {
            graph.input_shapes.insert(input.name.clone(), shape.clone());
        }
    }

    // Source tensors not yet consumed by a later layer, in production order.
    let mut dangling: Vec<String> = Vec::new();

    for layer in &net.layers {
        let mapped = map_layer(layer, &mut ns)?;
        tracing::debug!(
            "{} -> {} operators, {} parameters",
            layer.summary(),
            mapped.operators.len(),
            mapped.parameters.len()
        );

        for (name, shape) in mapped.external_inputs {
            if let Some(shape) = shape {
                graph.input_shapes.insert(name.clone(), shape);
            }
            graph.external_inputs.push(name);
        }
        for (name, tensor) in mapped.parameters {
            graph.parameters.push(name.clone());
            parameters.insert(name, tensor)?;
        }
        graph.operators.extend(mapped.operators);

        dangling.retain(|t| !layer.inputs.contains(t));
        for output in &layer.outputs {
            if !dangling.contains(output) {
                dangling.push(output.clone());
            }
        }
    }

    let requested = if options.external_outputs.is_empty() {
        dangling
    } else {
        options.external_outputs.clone()
    };
    for source in &requested {
        let target = ns.resolve(source, "external outputs")?;
        if !graph.external_outputs.contains(&target) {
            graph.external_outputs.push(target);
        }
    }
    graph.blob_names = ns.bindings().clone();

    graph.validate()?;
    tracing::info!(
        "translated '{}': {} layers -> {} operators, {} parameter tensors ({:.2}M values) in {:?}",
        graph.name,
        net.num_layers(),
        graph.num_operators(),
        parameters.len(),
        parameters.num_values() as f64 / 1e6,
        start.elapsed()
    );
    Ok(Translation { graph, parameters })
}

#[cfg(test)]
mod tests {
    use super::*;
    use caffe_model::NetDescription;

    fn net(src: &str) -> SourceNet {
        SourceNet::from_description(&NetDescription::from_prototxt(src).unwrap()).unwrap()
    }

    #[test]
    fn test_in_place_chain_bindings() {
        let net = net(
            r#"
            name: "chain"
            input: "data"
            input_shape { dim: 1 dim: 3 dim: 4 dim: 4 }
            layer { name: "s" type: "Sigmoid" bottom: "data" top: "act" }
            layer { name: "r" type: "ReLU" bottom: "act" top: "act" }
            layer { name: "t" type: "TanH" bottom: "act" top: "act" }
            "#,
        );
        let t = translate(&net, &TranslateOptions::default()).unwrap();
        let g = &t.graph;
        assert_eq!(g.operators[1].inputs, vec!["act"]);
        assert_eq!(g.operators[1].outputs, vec!["act_r"]);
        assert_eq!(g.operators[2].inputs, vec!["act_r"]);
        assert_eq!(g.operators[2].outputs, vec!["act_t"]);
        assert_eq!(g.external_outputs, vec!["act_t"]);
        assert_eq!(g.resolve_blob("act"), "act_t");
        assert!(g.input_shapes.contains_key("data"));
        assert!(t.parameters.is_empty());
    }

    #[test]
    fn test_dangling_outputs_and_overrides() {
        let src = r#"
            input: "data"
            layer { name: "a" type: "Sigmoid" bottom: "data" top: "a" }
            layer { name: "b" type: "TanH" bottom: "a" top: "b" }
            layer { name: "c" type: "ReLU" bottom: "a" top: "c" }
            "#;
        let t = translate(&net(src), &TranslateOptions::default()).unwrap();
        assert_eq!(t.graph.external_outputs, vec!["b", "c"]);

        let options = TranslateOptions {
            net_name: Some("renamed".into()),
            external_outputs: vec!["a".into()],
        };
        let t = translate(&net(src), &options).unwrap();
        assert_eq!(t.graph.name, "renamed");
        assert_eq!(t.graph.external_outputs, vec!["a"]);

        let options = TranslateOptions {
            external_outputs: vec!["nope".into()],
            ..Default::default()
        };
        assert!(matches!(
            translate(&net(src), &options),
            Err(TranslateError::GraphIntegrity { .. })
        ));
    }

    #[test]
    fn test_unknown_layer_stops_translation() {
        let src = r#"
            input: "data"
            layer { name: "bn" type: "BatchNorm" bottom: "data" top: "bn" }
            "#;
        let err = translate(&net(src), &TranslateOptions::default()).unwrap_err();
        assert!(err.to_string().contains("'bn'"));
    }

    #[test]
    fn test_forward_reference_in_source() {
        let src = r#"
            input: "data"
            layer { name: "a" type: "TanH" bottom: "later" top: "a" }
            layer { name: "b" type: "TanH" bottom: "data" top: "later" }
            "#;
        assert!(matches!(
            translate(&net(src), &TranslateOptions::default()),
            Err(TranslateError::GraphIntegrity { ref at, .. }) if at == "a"
        ));
    }
}
