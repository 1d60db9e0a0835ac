// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Network description schema (`deploy.prototxt` or its JSON equivalent).
//!
//! The structs here mirror Caffe's `NetParameter` / `LayerParameter` field
//! names and defaults. Unknown fields (fillers, learning-rate multipliers,
//! transform parameters) are ignored. [`NetDescription::resolve_layers`]
//! turns the raw schema into [`SourceLayer`]s with every default applied.
//!
//! # Format
//! ```text
//! name: "CaffeNet"
//! input: "data"
//! input_dim: 10  input_dim: 3  input_dim: 227  input_dim: 227
//! layer {
//!   name: "conv1"  type: "Convolution"  bottom: "data"  top: "conv1"
//!   convolution_param { num_output: 96 kernel_size: 11 stride: 4 }
//! }
//! ```

use crate::layer::{
    ConvolutionConfig, EltwiseConfig, EltwiseMethod, FlattenConfig, InnerProductConfig, LayerConfig,
    LrnConfig, NormRegion, PoolingConfig, PoolingMethod,
};
use crate::{prototxt, LayerKind, ModelError, SourceLayer};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use tensor_core::Shape;

/// Accepts either a single value or a list, for repeated protobuf fields.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match OneOrMany::<T>::deserialize(deserializer)? {
        OneOrMany::Many(v) => v,
        OneOrMany::One(v) => vec![v],
    })
}

/// Top-level network description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub input: Vec<String>,
    /// Legacy input shape declaration: four values per input.
    #[serde(default, deserialize_with = "one_or_many")]
    pub input_dim: Vec<usize>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub input_shape: Vec<ShapeDesc>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub layer: Vec<LayerDesc>,
    /// Legacy V1 layers.
    #[serde(default, deserialize_with = "one_or_many")]
    pub layers: Vec<LayerDesc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShapeDesc {
    #[serde(default, deserialize_with = "one_or_many")]
    pub dim: Vec<usize>,
}

/// Layer type as written: a name, or a V1 enum number in JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LayerTypeTag {
    Name(String),
    Code(i32),
}

impl Default for LayerTypeTag {
    fn default() -> Self {
        Self::Name(String::new())
    }
}

impl LayerTypeTag {
    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Name(name) => LayerKind::from_type_name(name),
            Self::Code(code) => LayerKind::from_v1_code(*code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Phase {
    #[serde(rename = "TRAIN")]
    Train,
    #[serde(rename = "TEST")]
    Test,
}

/// A `NetStateRule`; only the phase is honoured.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateRule {
    pub phase: Option<Phase>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerDesc {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: LayerTypeTag,
    #[serde(default, deserialize_with = "one_or_many")]
    pub bottom: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub top: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub include: Vec<StateRule>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub exclude: Vec<StateRule>,
    pub input_param: Option<InputParam>,
    pub convolution_param: Option<ConvolutionParam>,
    pub pooling_param: Option<PoolingParam>,
    pub lrn_param: Option<LrnParam>,
    pub relu_param: Option<ReluParam>,
    pub inner_product_param: Option<InnerProductParam>,
    pub dropout_param: Option<DropoutParam>,
    pub softmax_param: Option<AxisParam>,
    pub concat_param: Option<ConcatParam>,
    pub eltwise_param: Option<EltwiseParam>,
    pub flatten_param: Option<FlattenParam>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputParam {
    #[serde(default, deserialize_with = "one_or_many")]
    pub shape: Vec<ShapeDesc>,
}

fn default_true() -> bool {
    true
}
fn default_one_usize() -> usize {
    1
}
fn default_one_i32() -> i32 {
    1
}
fn default_one_f32() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvolutionParam {
    #[serde(default)]
    pub num_output: usize,
    #[serde(default = "default_true")]
    pub bias_term: bool,
    #[serde(default, deserialize_with = "one_or_many")]
    pub pad: Vec<usize>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub kernel_size: Vec<usize>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub stride: Vec<usize>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub dilation: Vec<usize>,
    pub pad_h: Option<usize>,
    pub pad_w: Option<usize>,
    pub kernel_h: Option<usize>,
    pub kernel_w: Option<usize>,
    pub stride_h: Option<usize>,
    pub stride_w: Option<usize>,
    #[serde(default = "default_one_usize")]
    pub group: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum PoolDesc {
    #[default]
    #[serde(rename = "MAX")]
    Max,
    #[serde(rename = "AVE")]
    Ave,
    #[serde(rename = "STOCHASTIC")]
    Stochastic,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolingParam {
    #[serde(default)]
    pub pool: PoolDesc,
    pub kernel_size: Option<usize>,
    pub kernel_h: Option<usize>,
    pub kernel_w: Option<usize>,
    #[serde(default = "default_one_usize")]
    pub stride: usize,
    pub stride_h: Option<usize>,
    pub stride_w: Option<usize>,
    #[serde(default)]
    pub pad: usize,
    pub pad_h: Option<usize>,
    pub pad_w: Option<usize>,
    #[serde(default)]
    pub global_pooling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum NormRegionDesc {
    #[default]
    #[serde(rename = "ACROSS_CHANNELS")]
    AcrossChannels,
    #[serde(rename = "WITHIN_CHANNEL")]
    WithinChannel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LrnParam {
    #[serde(default = "default_local_size")]
    pub local_size: usize,
    #[serde(default = "default_one_f32")]
    pub alpha: f32,
    #[serde(default = "default_beta")]
    pub beta: f32,
    #[serde(default)]
    pub norm_region: NormRegionDesc,
    #[serde(default = "default_one_f32")]
    pub k: f32,
}

fn default_local_size() -> usize {
    5
}
fn default_beta() -> f32 {
    0.75
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReluParam {
    #[serde(default)]
    pub negative_slope: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InnerProductParam {
    #[serde(default)]
    pub num_output: usize,
    #[serde(default = "default_true")]
    pub bias_term: bool,
    #[serde(default = "default_one_i32")]
    pub axis: i32,
    #[serde(default)]
    pub transpose: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DropoutParam {
    #[serde(default = "default_dropout_ratio")]
    pub dropout_ratio: f32,
}

fn default_dropout_ratio() -> f32 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct AxisParam {
    #[serde(default = "default_one_i32")]
    pub axis: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConcatParam {
    pub axis: Option<i32>,
    /// Deprecated spelling of `axis`.
    pub concat_dim: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum EltwiseDesc {
    #[serde(rename = "PROD")]
    Prod,
    #[default]
    #[serde(rename = "SUM")]
    Sum,
    #[serde(rename = "MAX")]
    Max,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EltwiseParam {
    #[serde(default)]
    pub operation: EltwiseDesc,
    #[serde(default, deserialize_with = "one_or_many")]
    pub coeff: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlattenParam {
    #[serde(default = "default_one_i32")]
    pub axis: i32,
    #[serde(default = "default_end_axis")]
    pub end_axis: i32,
}

fn default_end_axis() -> i32 {
    -1
}

impl NetDescription {
    /// Parses the protobuf text form.
    pub fn from_prototxt(text: &str) -> Result<Self, ModelError> {
        let value = prototxt::parse(text)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Parses the JSON form.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses either form, choosing JSON when the document starts with `{`.
    pub fn from_str_auto(text: &str) -> Result<Self, ModelError> {
        if text.trim_start().starts_with('{') {
            Self::from_json(text)
        } else {
            Self::from_prototxt(text)
        }
    }

    /// Reads a description file; `.json` files are parsed as JSON.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            _ => Self::from_str_auto(&text),
        }
    }

    /// Returns the declared network inputs with their shapes, if any.
    ///
    /// `input_shape` takes precedence over the legacy `input_dim` list.
    pub fn declared_inputs(&self) -> Result<Vec<(String, Option<Shape>)>, ModelError> {
        let invalid = |detail: String| ModelError::InvalidLayer {
            layer: self.name.clone(),
            detail,
        };
        if !self.input_shape.is_empty() && self.input_shape.len() != self.input.len() {
            return Err(invalid(format!(
                "{} inputs but {} input_shape entries",
                self.input.len(),
                self.input_shape.len()
            )));
        }
        if self.input_shape.is_empty() && !self.input_dim.is_empty() && self.input_dim.len() != 4 * self.input.len() {
            return Err(invalid(format!(
                "{} inputs need {} input_dim values, found {}",
                self.input.len(),
                4 * self.input.len(),
                self.input_dim.len()
            )));
        }

        Ok(self
            .input
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let shape = if let Some(s) = self.input_shape.get(i) {
                    Some(Shape::new(s.dim.clone()))
                } else if self.input_dim.is_empty() {
                    None
                } else {
                    Some(Shape::new(self.input_dim[4 * i..4 * i + 4].to_vec()))
                };
                (name.clone(), shape)
            })
            .collect())
    }

    /// Resolves the layer list into [`SourceLayer`]s (without blobs).
    ///
    /// Layers excluded from the TEST phase are dropped.
    pub fn resolve_layers(&self) -> Result<Vec<SourceLayer>, ModelError> {
        if !self.layer.is_empty() && !self.layers.is_empty() {
            return Err(ModelError::InvalidLayer {
                layer: self.name.clone(),
                detail: "description mixes 'layer' and legacy 'layers' fields".into(),
            });
        }
        let descs = if self.layer.is_empty() { &self.layers } else { &self.layer };

        let mut resolved = Vec::with_capacity(descs.len());
        for desc in descs {
            if !desc.runs_in_test_phase() {
                tracing::debug!("skipping layer '{}': not part of the TEST phase", desc.name);
                continue;
            }
            resolved.push(desc.resolve()?);
        }
        Ok(resolved)
    }
}

impl LayerDesc {
    fn runs_in_test_phase(&self) -> bool {
        let included = self.include.is_empty()
            || self
                .include
                .iter()
                .any(|r| matches!(r.phase, None | Some(Phase::Test)));
        let excluded = self.exclude.iter().any(|r| r.phase == Some(Phase::Test));
        included && !excluded
    }

    fn invalid(&self, detail: impl Into<String>) -> ModelError {
        ModelError::InvalidLayer {
            layer: self.name.clone(),
            detail: detail.into(),
        }
    }

    /// Applies Caffe's defaults and produces a [`SourceLayer`].
    pub fn resolve(&self) -> Result<SourceLayer, ModelError> {
        if self.name.is_empty() {
            return Err(self.invalid("layer has no name"));
        }
        let kind = self.kind.kind();
        let config = match &kind {
            LayerKind::Input => LayerConfig::Input {
                shapes: self
                    .input_param
                    .as_ref()
                    .map(|p| p.shape.iter().map(|s| Shape::new(s.dim.clone())).collect())
                    .unwrap_or_default(),
            },
            LayerKind::Convolution => {
                let p = self
                    .convolution_param
                    .as_ref()
                    .ok_or_else(|| self.invalid("missing convolution_param"))?;
                LayerConfig::Convolution(self.resolve_convolution(p)?)
            }
            LayerKind::Pooling => {
                let p = self
                    .pooling_param
                    .as_ref()
                    .ok_or_else(|| self.invalid("missing pooling_param"))?;
                LayerConfig::Pooling(self.resolve_pooling(p)?)
            }
            LayerKind::Lrn => {
                let p = self.lrn_param.clone().unwrap_or(LrnParam {
                    local_size: default_local_size(),
                    alpha: 1.0,
                    beta: default_beta(),
                    norm_region: NormRegionDesc::AcrossChannels,
                    k: 1.0,
                });
                LayerConfig::Lrn(LrnConfig {
                    local_size: p.local_size,
                    alpha: p.alpha,
                    beta: p.beta,
                    k: p.k,
                    region: match p.norm_region {
                        NormRegionDesc::AcrossChannels => NormRegion::AcrossChannels,
                        NormRegionDesc::WithinChannel => NormRegion::WithinChannel,
                    },
                })
            }
            LayerKind::Relu => LayerConfig::Relu {
                negative_slope: self.relu_param.as_ref().map_or(0.0, |p| p.negative_slope),
            },
            LayerKind::InnerProduct => {
                let p = self
                    .inner_product_param
                    .as_ref()
                    .ok_or_else(|| self.invalid("missing inner_product_param"))?;
                if p.num_output == 0 {
                    return Err(self.invalid("num_output must be positive"));
                }
                LayerConfig::InnerProduct(InnerProductConfig {
                    num_output: p.num_output,
                    bias_term: p.bias_term,
                    axis: p.axis,
                    transpose: p.transpose,
                })
            }
            LayerKind::Dropout => LayerConfig::Dropout {
                ratio: self
                    .dropout_param
                    .as_ref()
                    .map_or(default_dropout_ratio(), |p| p.dropout_ratio),
            },
            LayerKind::Softmax => LayerConfig::Softmax {
                axis: self.softmax_param.as_ref().map_or(1, |p| p.axis),
            },
            LayerKind::Concat => {
                let p = self.concat_param.clone().unwrap_or_default();
                LayerConfig::Concat {
                    axis: match (p.axis, p.concat_dim) {
                        (Some(axis), _) => axis,
                        (None, Some(dim)) => dim as i32,
                        (None, None) => 1,
                    },
                }
            }
            LayerKind::Eltwise => {
                let p = self.eltwise_param.clone().unwrap_or_default();
                if !p.coeff.is_empty() && p.coeff.len() != self.bottom.len() {
                    return Err(self.invalid(format!(
                        "{} coefficients for {} inputs",
                        p.coeff.len(),
                        self.bottom.len()
                    )));
                }
                LayerConfig::Eltwise(EltwiseConfig {
                    method: match p.operation {
                        EltwiseDesc::Sum => EltwiseMethod::Sum,
                        EltwiseDesc::Prod => EltwiseMethod::Prod,
                        EltwiseDesc::Max => EltwiseMethod::Max,
                    },
                    coeff: p.coeff,
                })
            }
            LayerKind::Flatten => {
                let (axis, end_axis) = self
                    .flatten_param
                    .as_ref()
                    .map_or((1, -1), |p| (p.axis, p.end_axis));
                LayerConfig::Flatten(FlattenConfig { axis, end_axis })
            }
            LayerKind::Sigmoid | LayerKind::TanH | LayerKind::Split | LayerKind::Unsupported(_) => {
                LayerConfig::None
            }
        };

        Ok(SourceLayer {
            name: self.name.clone(),
            kind,
            inputs: self.bottom.clone(),
            outputs: self.top.clone(),
            config,
            blobs: Vec::new(),
        })
    }

    fn resolve_convolution(&self, p: &ConvolutionParam) -> Result<ConvolutionConfig, ModelError> {
        // A repeated spatial field holds one value for both axes or one per axis.
        let pair = |explicit: (Option<usize>, Option<usize>),
                    repeated: &[usize],
                    default: Option<usize>,
                    what: &str|
         -> Result<[usize; 2], ModelError> {
            match (explicit, repeated) {
                ((Some(h), Some(w)), _) => Ok([h, w]),
                ((Some(_), None) | (None, Some(_)), _) => {
                    Err(self.invalid(format!("{what}_h and {what}_w must be given together")))
                }
                (_, []) => default
                    .map(|d| [d, d])
                    .ok_or_else(|| self.invalid(format!("missing {what}"))),
                (_, [v]) => Ok([*v, *v]),
                (_, [h, w]) => Ok([*h, *w]),
                (_, more) => Err(self.invalid(format!("{what} has {} values for 2 spatial axes", more.len()))),
            }
        };

        let kernel = pair((p.kernel_h, p.kernel_w), &p.kernel_size, None, "kernel")?;
        let stride = pair((p.stride_h, p.stride_w), &p.stride, Some(1), "stride")?;
        let pad = pair((p.pad_h, p.pad_w), &p.pad, Some(0), "pad")?;
        let dilation = pair((None, None), &p.dilation, Some(1), "dilation")?;

        if p.num_output == 0 {
            return Err(self.invalid("num_output must be positive"));
        }
        if p.group == 0 || p.num_output % p.group != 0 {
            return Err(self.invalid(format!(
                "num_output {} is not divisible by group {}",
                p.num_output, p.group
            )));
        }
        if kernel.contains(&0) || stride.contains(&0) || dilation.contains(&0) {
            return Err(self.invalid("kernel, stride and dilation must be positive"));
        }

        Ok(ConvolutionConfig {
            num_output: p.num_output,
            bias_term: p.bias_term,
            kernel,
            stride,
            pad,
            dilation,
            group: p.group,
        })
    }

    fn resolve_pooling(&self, p: &PoolingParam) -> Result<PoolingConfig, ModelError> {
        let both = |h: Option<usize>, w: Option<usize>, fallback: Option<usize>, what: &str| match (h, w) {
            (Some(h), Some(w)) => Ok([h, w]),
            (None, None) => fallback
                .map(|v| [v, v])
                .ok_or_else(|| self.invalid(format!("missing {what}"))),
            _ => Err(self.invalid(format!("{what}_h and {what}_w must be given together"))),
        };

        let kernel = if p.global_pooling {
            [0, 0]
        } else {
            both(p.kernel_h, p.kernel_w, p.kernel_size, "kernel_size")?
        };
        let stride = both(p.stride_h, p.stride_w, Some(p.stride), "stride")?;
        let pad = both(p.pad_h, p.pad_w, Some(p.pad), "pad")?;

        Ok(PoolingConfig {
            method: match p.pool {
                PoolDesc::Max => PoolingMethod::Max,
                PoolDesc::Ave => PoolingMethod::Average,
                PoolDesc::Stochastic => PoolingMethod::Stochastic,
            },
            kernel,
            stride,
            pad,
            global: p.global_pooling,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LENET_LIKE: &str = r#"
        name: "tiny"
        input: "data"
        input_dim: 1 input_dim: 3 input_dim: 8 input_dim: 8
        layer {
          name: "conv1" type: "Convolution" bottom: "data" top: "conv1"
          param { lr_mult: 1 } param { lr_mult: 2 }
          convolution_param {
            num_output: 4 kernel_size: 3 pad: 1 group: 2
            weight_filler { type: "gaussian" std: 0.01 }
          }
        }
        layer { name: "relu1" type: "ReLU" bottom: "conv1" top: "conv1" }
        layer {
          name: "pool1" type: "Pooling" bottom: "conv1" top: "pool1"
          pooling_param { pool: AVE kernel_h: 2 kernel_w: 3 stride: 2 }
        }
        layer { name: "norm1" type: "LRN" bottom: "pool1" top: "norm1" lrn_param { local_size: 3 alpha: 0.0001 } }
        layer {
          name: "acc" type: "Accuracy" bottom: "norm1" top: "acc"
          include { phase: TRAIN }
        }
    "#;

    #[test]
    fn test_prototxt_resolves_with_defaults() {
        let desc = NetDescription::from_prototxt(LENET_LIKE).unwrap();
        assert_eq!(desc.name, "tiny");
        assert_eq!(
            desc.declared_inputs().unwrap(),
            vec![("data".to_string(), Some(Shape::nchw(1, 3, 8, 8)))]
        );

        let layers = desc.resolve_layers().unwrap();
        assert_eq!(layers.len(), 4, "TRAIN-only layer must be dropped");

        match &layers[0].config {
            LayerConfig::Convolution(c) => {
                assert_eq!(c.kernel, [3, 3]);
                assert_eq!(c.pad, [1, 1]);
                assert_eq!(c.stride, [1, 1]);
                assert_eq!(c.dilation, [1, 1]);
                assert_eq!(c.group, 2);
                assert!(c.bias_term);
            }
            other => panic!("unexpected config {other:?}"),
        }
        assert!(layers[1].is_in_place());
        match &layers[2].config {
            LayerConfig::Pooling(p) => {
                assert_eq!(p.method, PoolingMethod::Average);
                assert_eq!(p.kernel, [2, 3]);
                assert_eq!(p.stride, [2, 2]);
                assert_eq!(p.pad, [0, 0]);
            }
            other => panic!("unexpected config {other:?}"),
        }
        match &layers[3].config {
            LayerConfig::Lrn(l) => {
                assert_eq!(l.local_size, 3);
                assert_eq!(l.beta, 0.75);
                assert_eq!(l.k, 1.0);
                assert_eq!(l.region, NormRegion::AcrossChannels);
            }
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_json_form_matches_prototxt() {
        let json = r#"{
            "name": "tiny",
            "input": ["data"],
            "input_shape": [{ "dim": [1, 3, 8, 8] }],
            "layer": [
                { "name": "fc", "type": "InnerProduct", "bottom": "data", "top": "fc",
                  "inner_product_param": { "num_output": 10 } },
                { "name": "prob", "type": "Softmax", "bottom": ["fc"], "top": ["prob"] }
            ]
        }"#;
        let desc = NetDescription::from_str_auto(json).unwrap();
        let layers = desc.resolve_layers().unwrap();
        assert_eq!(layers[0].inputs, vec!["data"]);
        assert_eq!(
            layers[0].config,
            LayerConfig::InnerProduct(InnerProductConfig {
                num_output: 10,
                bias_term: true,
                axis: 1,
                transpose: false,
            })
        );
        assert_eq!(layers[1].config, LayerConfig::Softmax { axis: 1 });
    }

    #[test]
    fn test_v1_layers() {
        let text = r#"
            name: "legacy"
            layers { name: "fc7" type: INNER_PRODUCT bottom: "fc6" top: "fc7" inner_product_param { num_output: 4 } }
            layers { name: "drop7" type: DROPOUT bottom: "fc7" top: "fc7" dropout_param { dropout_ratio: 0.3 } }
        "#;
        let layers = NetDescription::from_prototxt(text).unwrap().resolve_layers().unwrap();
        assert_eq!(layers[0].kind, LayerKind::InnerProduct);
        assert_eq!(layers[1].kind, LayerKind::Dropout);
        assert_eq!(layers[1].config, LayerConfig::Dropout { ratio: 0.3 });
    }

    #[test]
    fn test_unknown_type_survives_resolution() {
        let text = r#"layer { name: "bn" type: "BatchNorm" bottom: "x" top: "x" }"#;
        let layers = NetDescription::from_prototxt(text).unwrap().resolve_layers().unwrap();
        assert_eq!(layers[0].kind, LayerKind::Unsupported("BatchNorm".into()));
    }

    #[test]
    fn test_invalid_configurations() {
        let missing_kernel = r#"layer { name: "c" type: "Convolution" convolution_param { num_output: 2 } }"#;
        let err = NetDescription::from_prototxt(missing_kernel)
            .unwrap()
            .resolve_layers()
            .unwrap_err();
        assert!(err.to_string().contains("missing kernel"));

        let bad_group = r#"layer { name: "c" type: "Convolution" convolution_param { num_output: 3 kernel_size: 1 group: 2 } }"#;
        assert!(NetDescription::from_prototxt(bad_group)
            .unwrap()
            .resolve_layers()
            .is_err());

        let half_kernel = r#"layer { name: "p" type: "Pooling" pooling_param { kernel_h: 2 } }"#;
        assert!(NetDescription::from_prototxt(half_kernel)
            .unwrap()
            .resolve_layers()
            .is_err());
    }

    #[test]
    fn test_mismatched_input_dims() {
        let text = r#"input: "data" input_dim: 1 input_dim: 3"#;
        let desc = NetDescription::from_prototxt(text).unwrap();
        assert!(desc.declared_inputs().is_err());
    }
}
