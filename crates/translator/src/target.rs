// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The target representation: operators, graphs and parameter sets.

use crate::TranslateError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tensor_core::{Shape, Tensor};

/// Window geometry shared by `Conv`. All pairs are `[height, width]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvArgs {
    pub kernel: [usize; 2],
    pub stride: [usize; 2],
    pub pad: [usize; 2],
    pub dilation: [usize; 2],
}

/// Window geometry shared by `MaxPool` and `AveragePool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolArgs {
    pub kernel: [usize; 2],
    pub stride: [usize; 2],
    pub pad: [usize; 2],
    pub global: bool,
}

/// Target operator kinds with their type-specific arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OpKind {
    /// Inputs: `X`, `W`, optional `b`.
    Conv(ConvArgs),
    MaxPool(PoolArgs),
    AveragePool(PoolArgs),
    /// Cross-channel LRN; `bias` is Caffe's `k`.
    #[serde(rename = "LRN")]
    Lrn { size: usize, alpha: f32, beta: f32, bias: f32 },
    Relu,
    LeakyRelu { alpha: f32 },
    Sigmoid,
    Tanh,
    /// Inputs: `X`, `W` (`[out, in]`), optional `b`.
    #[serde(rename = "FC")]
    Fc { axis: i32 },
    Dropout { ratio: f32 },
    Softmax { axis: i32 },
    Concat { axis: i32 },
    /// Splits the channel axis into as many equal parts as there are outputs.
    DepthSplit,
    /// Concatenates along the channel axis.
    DepthConcat,
    Sum,
    Mul,
    Max,
    /// Keeps `dims[..axis]` and collapses the rest into one dimension.
    Flatten { axis: i32 },
}

impl OpKind {
    /// Operator type name as it appears in a serialized `NetDef`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Conv(_) => "Conv",
            Self::MaxPool(_) => "MaxPool",
            Self::AveragePool(_) => "AveragePool",
            Self::Lrn { .. } => "LRN",
            Self::Relu => "Relu",
            Self::LeakyRelu { .. } => "LeakyRelu",
            Self::Sigmoid => "Sigmoid",
            Self::Tanh => "Tanh",
            Self::Fc { .. } => "FC",
            Self::Dropout { .. } => "Dropout",
            Self::Softmax { .. } => "Softmax",
            Self::Concat { .. } => "Concat",
            Self::DepthSplit => "DepthSplit",
            Self::DepthConcat => "DepthConcat",
            Self::Sum => "Sum",
            Self::Mul => "Mul",
            Self::Max => "Max",
            Self::Flatten { .. } => "Flatten",
        }
    }

    /// Whether the operator passes its input through unchanged at inference
    /// time and can be removed by the rewriter.
    pub fn is_inference_identity(&self) -> bool {
        matches!(self, Self::Dropout { .. })
    }
}

/// One operator of a target graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOperator {
    pub name: String,
    #[serde(flatten)]
    pub kind: OpKind,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl TargetOperator {
    pub fn new(name: impl Into<String>, kind: OpKind, inputs: Vec<String>, outputs: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs,
            outputs,
        }
    }
}

/// A translated network.
///
/// Operators are in execution order. Every operator input is a data input,
/// a parameter, or the output of a strictly earlier operator; see
/// [`validate`](Self::validate).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetGraph {
    pub name: String,
    pub operators: Vec<TargetOperator>,
    /// Data inputs fed at run time, in declaration order.
    pub external_inputs: Vec<String>,
    /// Names of the parameter tensors the graph reads.
    pub parameters: Vec<String>,
    pub external_outputs: Vec<String>,
    /// Declared shapes of data inputs, where the description gave one.
    #[serde(default)]
    pub input_shapes: BTreeMap<String, Shape>,
    /// Source tensor name to the target tensor holding its final value.
    #[serde(default)]
    pub blob_names: BTreeMap<String, String>,
}

impl TargetGraph {
    pub fn num_operators(&self) -> usize {
        self.operators.len()
    }

    /// Target name for a source tensor name. Names without a recorded
    /// binding are returned unchanged.
    pub fn resolve_blob<'a>(&'a self, source: &'a str) -> &'a str {
        self.blob_names.get(source).map(String::as_str).unwrap_or(source)
    }

    /// Checks producer-before-consumer ordering and name uniqueness.
    ///
    /// # Errors
    /// [`TranslateError::GraphIntegrity`] naming the first offending
    /// operator or tensor.
    pub fn validate(&self) -> Result<(), TranslateError> {
        let mut available: HashSet<&str> = HashSet::new();
        for name in self.external_inputs.iter().chain(&self.parameters) {
            if !available.insert(name.as_str()) {
                return Err(TranslateError::integrity(
                    name.as_str(),
                    "declared more than once as an input or parameter",
                ));
            }
        }

        let mut producer: HashMap<&str, usize> = HashMap::new();
        for (pos, op) in self.operators.iter().enumerate() {
            for output in &op.outputs {
                if let Some(&earlier) = producer.get(output.as_str()) {
                    return Err(TranslateError::integrity(
                        op.name.as_str(),
                        format!(
                            "output '{output}' already produced by '{}'",
                            self.operators[earlier].name
                        ),
                    ));
                }
                if available.contains(output.as_str()) {
                    return Err(TranslateError::integrity(
                        op.name.as_str(),
                        format!("output '{output}' overwrites a graph input"),
                    ));
                }
                producer.insert(output.as_str(), pos);
            }
        }

        for (pos, op) in self.operators.iter().enumerate() {
            for input in &op.inputs {
                if available.contains(input.as_str()) {
                    continue;
                }
                let detail = match producer.get(input.as_str()) {
                    Some(&p) if p == pos => format!("reads its own output '{input}'"),
                    Some(&p) if p > pos => format!(
                        "reads '{input}' before its producer '{}' runs",
                        self.operators[p].name
                    ),
                    Some(_) => continue,
                    None => format!("reads '{input}', which nothing produces"),
                };
                return Err(TranslateError::integrity(op.name.as_str(), detail));
            }
        }

        for name in &self.external_outputs {
            if !available.contains(name.as_str()) && !producer.contains_key(name.as_str()) {
                return Err(TranslateError::integrity(name.as_str(), "external output is never produced"));
            }
        }
        for (source, target) in &self.blob_names {
            if !available.contains(target.as_str()) && !producer.contains_key(target.as_str()) {
                return Err(TranslateError::integrity(
                    source.as_str(),
                    format!("bound to '{target}', which nothing produces"),
                ));
            }
        }
        Ok(())
    }

    /// Pretty-printed JSON form of the graph.
    pub fn to_json(&self) -> Result<String, TranslateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a JSON graph dump and validates it.
    pub fn from_json(json: &str) -> Result<Self, TranslateError> {
        let graph: Self = serde_json::from_str(json)?;
        graph.validate()?;
        Ok(graph)
    }

    /// Returns a summary string describing the graph.
    pub fn summary(&self) -> String {
        format!(
            "Graph '{}': {} operators, {} inputs, {} parameters, {} outputs",
            self.name,
            self.operators.len(),
            self.external_inputs.len(),
            self.parameters.len(),
            self.external_outputs.len(),
        )
    }
}

/// Converted parameters keyed by target tensor name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TargetParameterSet {
    tensors: BTreeMap<String, Tensor>,
}

impl TargetParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tensor.
    ///
    /// # Errors
    /// [`TranslateError::GraphIntegrity`] if the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) -> Result<(), TranslateError> {
        let name = name.into();
        if self.tensors.contains_key(&name) {
            return Err(TranslateError::integrity(name, "parameter defined twice"));
        }
        self.tensors.insert(name, tensor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.tensors.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Total number of parameter values.
    pub fn num_values(&self) -> usize {
        self.tensors.values().map(|t| t.shape().num_elements()).sum()
    }

    pub fn size_bytes(&self) -> usize {
        self.tensors.values().map(Tensor::size_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(name: &str, inputs: &[&str], outputs: &[&str]) -> TargetOperator {
        TargetOperator::new(
            name,
            OpKind::Relu,
            inputs.iter().map(|s| s.to_string()).collect(),
            outputs.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn graph(ops: Vec<TargetOperator>) -> TargetGraph {
        TargetGraph {
            name: "g".into(),
            operators: ops,
            external_inputs: vec!["data".into()],
            parameters: vec!["w".into()],
            ..Default::default()
        }
    }

    fn integrity_detail(g: &TargetGraph) -> String {
        match g.validate() {
            Err(TranslateError::GraphIntegrity { detail, .. }) => detail,
            other => panic!("expected integrity error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_chain() {
        let mut g = graph(vec![op("a", &["data", "w"], &["x"]), op("b", &["x"], &["y"])]);
        g.external_outputs = vec!["y".into()];
        g.blob_names.insert("data".into(), "data".into());
        g.validate().unwrap();
    }

    #[test]
    fn test_forward_reference_rejected() {
        let g = graph(vec![op("a", &["y"], &["x"]), op("b", &["x"], &["y"])]);
        assert!(integrity_detail(&g).contains("before its producer 'b'"));
    }

    #[test]
    fn test_self_reference_rejected() {
        let g = graph(vec![op("a", &["data"], &["x"]), op("b", &["x"], &["x2"]), op("c", &["x3"], &["x3"])]);
        assert!(integrity_detail(&g).contains("own output"));
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let g = graph(vec![op("a", &["data"], &["x"]), op("b", &["x"], &["x"])]);
        assert!(integrity_detail(&g).contains("already produced by 'a'"));
    }

    #[test]
    fn test_input_overwrite_and_dangling_rejected() {
        let g = graph(vec![op("a", &["data"], &["data"])]);
        assert!(integrity_detail(&g).contains("overwrites"));

        let g = graph(vec![op("a", &["nothing"], &["x"])]);
        assert!(integrity_detail(&g).contains("nothing produces"));

        let mut g = graph(vec![op("a", &["data"], &["x"])]);
        g.external_outputs = vec!["z".into()];
        assert!(g.validate().is_err());
    }

    #[test]
    fn test_parameter_set_rejects_duplicates() {
        let mut set = TargetParameterSet::new();
        set.insert("w", Tensor::zeros(Shape::vector(3))).unwrap();
        assert!(set.insert("w", Tensor::zeros(Shape::vector(3))).is_err());
        assert_eq!(set.len(), 1);
        assert_eq!(set.num_values(), 3);
    }

    #[test]
    fn test_graph_json_shape() {
        let g = TargetGraph {
            name: "g".into(),
            operators: vec![TargetOperator::new(
                "pool1",
                OpKind::MaxPool(PoolArgs {
                    kernel: [3, 3],
                    stride: [2, 2],
                    pad: [0, 0],
                    global: false,
                }),
                vec!["data".into()],
                vec!["pool1".into()],
            )],
            external_inputs: vec!["data".into()],
            ..Default::default()
        };
        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["operators"][0]["type"], "MaxPool");
        assert_eq!(json["operators"][0]["kernel"][0], 3);

        let back = TargetGraph::from_json(&g.to_json().unwrap()).unwrap();
        assert_eq!(back, g);
    }
}
