// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Serialized target formats.
//!
//! A [`TargetGraph`] is written as a Caffe2-style `NetDef` and a
//! [`TargetParameterSet`] as `TensorProtos` (one `TensorProto` per
//! parameter) or as a SafeTensors file. The protobuf messages are declared
//! by hand with `prost` derives; only the fields used here are present.
//!
//! Graph metadata with no `NetDef` field of its own travels as net-level
//! arguments:
//!
//! | Argument                  | Contents                                  |
//! |---------------------------|-------------------------------------------|
//! | `data_inputs`             | external inputs that are not parameters   |
//! | `input_shape/{name}`      | declared shape of a data input            |
//! | `blob_map_sources`        | source tensor names                       |
//! | `blob_map_targets`        | target names, parallel to the above       |

use crate::target::{ConvArgs, OpKind, PoolArgs, TargetGraph, TargetOperator, TargetParameterSet};
use crate::TranslateError;
use prost::Message;
use safetensors::tensor::{Dtype, TensorView as SafeView};
use std::collections::{BTreeMap, HashMap};
use tensor_core::{Shape, Tensor};

/// `TensorProto.DataType.FLOAT`.
const FLOAT: i32 = 1;
/// Caffe2's `LegacyPadding::CAFFE_LEGACY_POOLING`: ceil-mode pooled sizes.
const CAFFE_LEGACY_POOLING: i64 = 3;

#[derive(Clone, PartialEq, Message)]
pub struct NetDef {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub op: Vec<OperatorDef>,
    #[prost(message, repeated, tag = "6")]
    pub arg: Vec<Argument>,
    #[prost(string, repeated, tag = "7")]
    pub external_input: Vec<String>,
    #[prost(string, repeated, tag = "8")]
    pub external_output: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct OperatorDef {
    #[prost(string, repeated, tag = "1")]
    pub input: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub output: Vec<String>,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub r#type: String,
    #[prost(message, repeated, tag = "5")]
    pub arg: Vec<Argument>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Argument {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(float, optional, tag = "2")]
    pub f: Option<f32>,
    #[prost(int64, optional, tag = "3")]
    pub i: Option<i64>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub s: Option<Vec<u8>>,
    #[prost(float, repeated, tag = "5")]
    pub floats: Vec<f32>,
    #[prost(int64, repeated, tag = "6")]
    pub ints: Vec<i64>,
    #[prost(bytes = "vec", repeated, tag = "7")]
    pub strings: Vec<Vec<u8>>,
}

impl Argument {
    fn int(name: &str, v: i64) -> Self {
        Self {
            name: name.into(),
            i: Some(v),
            ..Default::default()
        }
    }

    fn float(name: &str, v: f32) -> Self {
        Self {
            name: name.into(),
            f: Some(v),
            ..Default::default()
        }
    }

    fn string(name: &str, v: &str) -> Self {
        Self {
            name: name.into(),
            s: Some(v.as_bytes().to_vec()),
            ..Default::default()
        }
    }

    fn ints(name: &str, v: impl IntoIterator<Item = i64>) -> Self {
        Self {
            name: name.into(),
            ints: v.into_iter().collect(),
            ..Default::default()
        }
    }

    fn strings<'a>(name: &str, v: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            name: name.into(),
            strings: v.into_iter().map(|s| s.as_bytes().to_vec()).collect(),
            ..Default::default()
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct TensorProto {
    #[prost(int64, repeated, tag = "1")]
    pub dims: Vec<i64>,
    #[prost(int32, tag = "2")]
    pub data_type: i32,
    #[prost(float, repeated, tag = "3")]
    pub float_data: Vec<f32>,
    #[prost(string, tag = "7")]
    pub name: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct TensorProtos {
    #[prost(message, repeated, tag = "1")]
    pub protos: Vec<TensorProto>,
}

// ── Graph encoding ──────────────────────────────────────────────

fn window_args(args: &mut Vec<Argument>, kernel: [usize; 2], stride: [usize; 2], pad: [usize; 2]) {
    args.push(Argument::int("kernel_h", kernel[0] as i64));
    args.push(Argument::int("kernel_w", kernel[1] as i64));
    args.push(Argument::int("stride_h", stride[0] as i64));
    args.push(Argument::int("stride_w", stride[1] as i64));
    args.push(Argument::int("pad_t", pad[0] as i64));
    args.push(Argument::int("pad_l", pad[1] as i64));
    args.push(Argument::int("pad_b", pad[0] as i64));
    args.push(Argument::int("pad_r", pad[1] as i64));
}

fn operator_args(kind: &OpKind) -> Vec<Argument> {
    let mut args = Vec::new();
    match kind {
        OpKind::Conv(c) => {
            window_args(&mut args, c.kernel, c.stride, c.pad);
            args.push(Argument::int("dilation_h", c.dilation[0] as i64));
            args.push(Argument::int("dilation_w", c.dilation[1] as i64));
            args.push(Argument::string("order", "NCHW"));
        }
        OpKind::MaxPool(p) | OpKind::AveragePool(p) => {
            window_args(&mut args, p.kernel, p.stride, p.pad);
            args.push(Argument::int("global_pooling", i64::from(p.global)));
            args.push(Argument::int("legacy_pad", CAFFE_LEGACY_POOLING));
            args.push(Argument::string("order", "NCHW"));
        }
        OpKind::Lrn { size, alpha, beta, bias } => {
            args.push(Argument::int("size", *size as i64));
            args.push(Argument::float("alpha", *alpha));
            args.push(Argument::float("beta", *beta));
            args.push(Argument::float("bias", *bias));
            args.push(Argument::string("order", "NCHW"));
        }
        OpKind::LeakyRelu { alpha } => args.push(Argument::float("alpha", *alpha)),
        OpKind::Dropout { ratio } => {
            args.push(Argument::float("ratio", *ratio));
            args.push(Argument::int("is_test", 1));
        }
        OpKind::Fc { axis } | OpKind::Softmax { axis } | OpKind::Concat { axis } | OpKind::Flatten { axis } => {
            args.push(Argument::int("axis", i64::from(*axis)));
        }
        OpKind::DepthSplit | OpKind::DepthConcat => args.push(Argument::string("order", "NCHW")),
        OpKind::Relu | OpKind::Sigmoid | OpKind::Tanh | OpKind::Sum | OpKind::Mul | OpKind::Max => {}
    }
    args
}

impl TargetGraph {
    /// Encodes the graph as a `NetDef`.
    ///
    /// `external_input` lists data inputs first, then parameters.
    pub fn to_net_def(&self) -> NetDef {
        let mut arg = vec![Argument::strings("data_inputs", &self.external_inputs)];
        for (name, shape) in &self.input_shapes {
            arg.push(Argument::ints(
                &format!("input_shape/{name}"),
                shape.dims().iter().map(|&d| d as i64),
            ));
        }
        arg.push(Argument::strings("blob_map_sources", self.blob_names.keys()));
        arg.push(Argument::strings("blob_map_targets", self.blob_names.values()));

        NetDef {
            name: self.name.clone(),
            op: self
                .operators
                .iter()
                .map(|op| OperatorDef {
                    input: op.inputs.clone(),
                    output: op.outputs.clone(),
                    name: op.name.clone(),
                    r#type: op.kind.type_name().to_string(),
                    arg: operator_args(&op.kind),
                })
                .collect(),
            arg,
            external_input: self
                .external_inputs
                .iter()
                .chain(&self.parameters)
                .cloned()
                .collect(),
            external_output: self.external_outputs.clone(),
        }
    }

    /// Encodes the graph as `NetDef` protobuf bytes.
    pub fn encode_net_def(&self) -> Vec<u8> {
        self.to_net_def().encode_to_vec()
    }

    /// Rebuilds a graph from a `NetDef` and validates it.
    ///
    /// # Errors
    /// [`TranslateError::Decode`] for unknown operator types or missing
    /// arguments; [`TranslateError::GraphIntegrity`] if the decoded graph is
    /// not well formed.
    pub fn from_net_def(def: &NetDef) -> Result<Self, TranslateError> {
        let net_args = ArgMap::new(&def.arg, &def.name);

        let external_inputs = match net_args.strings("data_inputs") {
            Some(data) => data,
            None => def.external_input.clone(),
        };
        let parameters = def
            .external_input
            .iter()
            .filter(|name| !external_inputs.contains(name))
            .cloned()
            .collect();

        let mut input_shapes = BTreeMap::new();
        for a in &def.arg {
            if let Some(name) = a.name.strip_prefix("input_shape/") {
                let dims = a
                    .ints
                    .iter()
                    .map(|&d| usize::try_from(d))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| TranslateError::Decode(format!("negative dimension in '{}'", a.name)))?;
                input_shapes.insert(name.to_string(), Shape::new(dims));
            }
        }

        let sources = net_args.strings("blob_map_sources").unwrap_or_default();
        let targets = net_args.strings("blob_map_targets").unwrap_or_default();
        if sources.len() != targets.len() {
            return Err(TranslateError::Decode(format!(
                "{} blob map sources but {} targets",
                sources.len(),
                targets.len()
            )));
        }

        let operators = def
            .op
            .iter()
            .map(decode_operator)
            .collect::<Result<Vec<_>, _>>()?;

        let graph = Self {
            name: def.name.clone(),
            operators,
            external_inputs,
            parameters,
            external_outputs: def.external_output.clone(),
            input_shapes,
            blob_names: sources.into_iter().zip(targets).collect(),
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Decodes `NetDef` protobuf bytes.
    pub fn decode_net_def(bytes: &[u8]) -> Result<Self, TranslateError> {
        Self::from_net_def(&NetDef::decode(bytes)?)
    }
}

/// Named-argument lookup for one operator or net.
struct ArgMap<'a> {
    owner: &'a str,
    args: HashMap<&'a str, &'a Argument>,
}

impl<'a> ArgMap<'a> {
    fn new(args: &'a [Argument], owner: &'a str) -> Self {
        Self {
            owner,
            args: args.iter().map(|a| (a.name.as_str(), a)).collect(),
        }
    }

    fn missing(&self, name: &str) -> TranslateError {
        TranslateError::Decode(format!("'{}' is missing argument '{name}'", self.owner))
    }

    fn int(&self, name: &str) -> Result<i64, TranslateError> {
        self.args.get(name).and_then(|a| a.i).ok_or_else(|| self.missing(name))
    }

    fn usize(&self, name: &str) -> Result<usize, TranslateError> {
        let v = self.int(name)?;
        usize::try_from(v)
            .map_err(|_| TranslateError::Decode(format!("'{}': argument '{name}' is negative", self.owner)))
    }

    fn axis(&self) -> Result<i32, TranslateError> {
        let v = self.int("axis")?;
        i32::try_from(v).map_err(|_| TranslateError::Decode(format!("'{}': axis {v} out of range", self.owner)))
    }

    fn float(&self, name: &str) -> Result<f32, TranslateError> {
        self.args.get(name).and_then(|a| a.f).ok_or_else(|| self.missing(name))
    }

    fn pair(&self, h: &str, w: &str) -> Result<[usize; 2], TranslateError> {
        Ok([self.usize(h)?, self.usize(w)?])
    }

    fn strings(&self, name: &str) -> Option<Vec<String>> {
        self.args.get(name).map(|a| {
            a.strings
                .iter()
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect()
        })
    }
}

fn decode_operator(def: &OperatorDef) -> Result<TargetOperator, TranslateError> {
    let args = ArgMap::new(&def.arg, &def.name);
    let window = || -> Result<_, TranslateError> {
        Ok((
            args.pair("kernel_h", "kernel_w")?,
            args.pair("stride_h", "stride_w")?,
            args.pair("pad_t", "pad_l")?,
        ))
    };
    let pool = || -> Result<PoolArgs, TranslateError> {
        let (kernel, stride, pad) = window()?;
        Ok(PoolArgs {
            kernel,
            stride,
            pad,
            global: args.int("global_pooling")? != 0,
        })
    };

    let kind = match def.r#type.as_str() {
        "Conv" => {
            let (kernel, stride, pad) = window()?;
            OpKind::Conv(ConvArgs {
                kernel,
                stride,
                pad,
                dilation: args.pair("dilation_h", "dilation_w")?,
            })
        }
        "MaxPool" => OpKind::MaxPool(pool()?),
        "AveragePool" => OpKind::AveragePool(pool()?),
        "LRN" => OpKind::Lrn {
            size: args.usize("size")?,
            alpha: args.float("alpha")?,
            beta: args.float("beta")?,
            bias: args.float("bias")?,
        },
        "Relu" => OpKind::Relu,
        "LeakyRelu" => OpKind::LeakyRelu {
            alpha: args.float("alpha")?,
        },
        "Sigmoid" => OpKind::Sigmoid,
        "Tanh" => OpKind::Tanh,
        "FC" => OpKind::Fc { axis: args.axis()? },
        "Dropout" => OpKind::Dropout {
            ratio: args.float("ratio")?,
        },
        "Softmax" => OpKind::Softmax { axis: args.axis()? },
        "Concat" => OpKind::Concat { axis: args.axis()? },
        "DepthSplit" => OpKind::DepthSplit,
        "DepthConcat" => OpKind::DepthConcat,
        "Sum" => OpKind::Sum,
        "Mul" => OpKind::Mul,
        "Max" => OpKind::Max,
        "Flatten" => OpKind::Flatten { axis: args.axis()? },
        other => {
            return Err(TranslateError::Decode(format!(
                "operator '{}' has unknown type '{other}'",
                def.name
            )))
        }
    };
    Ok(TargetOperator::new(&def.name, kind, def.input.clone(), def.output.clone()))
}

// ── Parameter encoding ──────────────────────────────────────────

impl TargetParameterSet {
    /// Encodes every parameter as a `TensorProto`, in name order.
    pub fn to_tensor_protos(&self) -> TensorProtos {
        TensorProtos {
            protos: self
                .iter()
                .map(|(name, t)| TensorProto {
                    dims: t.shape().dims().iter().map(|&d| d as i64).collect(),
                    data_type: FLOAT,
                    float_data: t.as_f32_slice().to_vec(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    /// Encodes the parameters as `TensorProtos` protobuf bytes.
    pub fn encode_tensor_protos(&self) -> Vec<u8> {
        self.to_tensor_protos().encode_to_vec()
    }

    /// Rebuilds a parameter set from `TensorProtos`.
    pub fn from_tensor_protos(protos: &TensorProtos) -> Result<Self, TranslateError> {
        let mut set = Self::new();
        for p in &protos.protos {
            if p.data_type != FLOAT {
                return Err(TranslateError::Decode(format!(
                    "tensor '{}' has data type {}, only FLOAT is supported",
                    p.name, p.data_type
                )));
            }
            let dims = p
                .dims
                .iter()
                .map(|&d| usize::try_from(d))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| TranslateError::Decode(format!("tensor '{}' has a negative dimension", p.name)))?;
            let tensor = Tensor::from_f32(Shape::new(dims), &p.float_data)
                .map_err(|e| TranslateError::Decode(format!("tensor '{}': {e}", p.name)))?;
            set.insert(p.name.clone(), tensor)?;
        }
        Ok(set)
    }

    /// Decodes `TensorProtos` protobuf bytes.
    pub fn decode_tensor_protos(bytes: &[u8]) -> Result<Self, TranslateError> {
        Self::from_tensor_protos(&TensorProtos::decode(bytes)?)
    }

    /// Serializes the parameters as a SafeTensors file (all `F32`).
    pub fn to_safetensors(&self) -> Result<Vec<u8>, TranslateError> {
        let buffers: Vec<(&str, Vec<usize>, Vec<u8>)> = self
            .iter()
            .map(|(name, t)| (name, t.shape().dims().to_vec(), t.to_le_bytes()))
            .collect();
        let views = buffers
            .iter()
            .map(|(name, dims, bytes)| Ok((*name, SafeView::new(Dtype::F32, dims.clone(), bytes)?)))
            .collect::<Result<BTreeMap<_, _>, safetensors::SafeTensorError>>()?;
        Ok(safetensors::serialize(&views, &None)?)
    }

    /// Reads parameters back from SafeTensors bytes. Only `F32` tensors are
    /// accepted.
    pub fn from_safetensors(bytes: &[u8]) -> Result<Self, TranslateError> {
        let st = safetensors::SafeTensors::deserialize(bytes)?;
        let mut set = Self::new();
        let mut names = st.names();
        names.sort();
        for name in names {
            let view = st.tensor(name)?;
            if view.dtype() != Dtype::F32 {
                return Err(TranslateError::Decode(format!(
                    "tensor '{name}' has dtype {:?}, expected F32",
                    view.dtype()
                )));
            }
            let tensor = Tensor::from_le_bytes(Shape::new(view.shape().to_vec()), view.data())
                .map_err(|e| TranslateError::Decode(format!("tensor '{name}': {e}")))?;
            set.insert(name.clone(), tensor)?;
        }
        Ok(set)
    }
}
