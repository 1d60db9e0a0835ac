// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Source layer definitions.
//!
//! A [`SourceLayer`] is one stage of a Caffe network: its kind, the tensor
//! names it reads ("bottoms") and writes ("tops"), the resolved per-kind
//! configuration, and any trained parameter blobs attached to it. Layers are
//! immutable once the description has been resolved.

use crate::ParameterBlob;
use tensor_core::Shape;

/// The closed set of Caffe layer kinds this workspace understands.
///
/// Type strings with no matching variant are preserved as
/// [`LayerKind::Unsupported`] so that translation can reject them by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Input,
    Convolution,
    Pooling,
    Lrn,
    Relu,
    Sigmoid,
    TanH,
    InnerProduct,
    Dropout,
    Softmax,
    Concat,
    Eltwise,
    Flatten,
    Split,
    Unsupported(String),
}

impl LayerKind {
    /// Parses a layer type string.
    ///
    /// Accepts the modern names (`"Convolution"`, `"InnerProduct"`, `"ReLU"`)
    /// as well as the upper-case V1 names (`"CONVOLUTION"`, `"INNER_PRODUCT"`).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "input" => Some(Self::Input),
            "convolution" | "conv" => Some(Self::Convolution),
            "pooling" | "pool" => Some(Self::Pooling),
            "lrn" => Some(Self::Lrn),
            "relu" => Some(Self::Relu),
            "sigmoid" => Some(Self::Sigmoid),
            "tanh" => Some(Self::TanH),
            "innerproduct" | "fc" => Some(Self::InnerProduct),
            "dropout" => Some(Self::Dropout),
            "softmax" => Some(Self::Softmax),
            "concat" => Some(Self::Concat),
            "eltwise" => Some(Self::Eltwise),
            "flatten" => Some(Self::Flatten),
            "split" => Some(Self::Split),
            _ => None,
        }
    }

    /// Like [`from_str_loose`](Self::from_str_loose), but keeps unknown
    /// strings as [`LayerKind::Unsupported`].
    pub fn from_type_name(s: &str) -> Self {
        Self::from_str_loose(s).unwrap_or_else(|| Self::Unsupported(s.to_string()))
    }

    /// Maps the numeric `V1LayerParameter.LayerType` enum used by old
    /// binary models.
    pub fn from_v1_code(code: i32) -> Self {
        match code {
            3 => Self::Concat,
            4 => Self::Convolution,
            6 => Self::Dropout,
            8 => Self::Flatten,
            14 => Self::InnerProduct,
            15 => Self::Lrn,
            17 => Self::Pooling,
            18 => Self::Relu,
            19 => Self::Sigmoid,
            20 => Self::Softmax,
            22 => Self::Split,
            23 => Self::TanH,
            25 => Self::Eltwise,
            other => Self::Unsupported(format!("V1 layer type {other}")),
        }
    }

    /// Returns the canonical Caffe type name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Input => "Input",
            Self::Convolution => "Convolution",
            Self::Pooling => "Pooling",
            Self::Lrn => "LRN",
            Self::Relu => "ReLU",
            Self::Sigmoid => "Sigmoid",
            Self::TanH => "TanH",
            Self::InnerProduct => "InnerProduct",
            Self::Dropout => "Dropout",
            Self::Softmax => "Softmax",
            Self::Concat => "Concat",
            Self::Eltwise => "Eltwise",
            Self::Flatten => "Flatten",
            Self::Split => "Split",
            Self::Unsupported(name) => name,
        }
    }

    /// Whether layers of this kind carry trained parameters.
    pub fn has_parameters(&self) -> bool {
        matches!(self, Self::Convolution | Self::InnerProduct)
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved convolution geometry. All pairs are `[height, width]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvolutionConfig {
    pub num_output: usize,
    pub bias_term: bool,
    pub kernel: [usize; 2],
    pub stride: [usize; 2],
    pub pad: [usize; 2],
    pub dilation: [usize; 2],
    pub group: usize,
}

/// Pooling reduction as declared in the description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolingMethod {
    Max,
    Average,
    Stochastic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolingConfig {
    pub method: PoolingMethod,
    pub kernel: [usize; 2],
    pub stride: [usize; 2],
    pub pad: [usize; 2],
    pub global: bool,
}

/// LRN normalization region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormRegion {
    AcrossChannels,
    WithinChannel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LrnConfig {
    pub local_size: usize,
    pub alpha: f32,
    pub beta: f32,
    /// Caffe's `k`.
    pub k: f32,
    pub region: NormRegion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InnerProductConfig {
    pub num_output: usize,
    pub bias_term: bool,
    pub axis: i32,
    pub transpose: bool,
}

/// Eltwise reduction as declared in the description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EltwiseMethod {
    Sum,
    Prod,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EltwiseConfig {
    pub method: EltwiseMethod,
    pub coeff: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenConfig {
    pub axis: i32,
    pub end_axis: i32,
}

/// Per-kind layer configuration, resolved from the description's
/// `*_param` blocks with Caffe's defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerConfig {
    /// Kinds without configuration (Sigmoid, TanH, Split, unsupported).
    None,
    Input { shapes: Vec<Shape> },
    Convolution(ConvolutionConfig),
    Pooling(PoolingConfig),
    Lrn(LrnConfig),
    Relu { negative_slope: f32 },
    InnerProduct(InnerProductConfig),
    Dropout { ratio: f32 },
    Softmax { axis: i32 },
    Concat { axis: i32 },
    Eltwise(EltwiseConfig),
    Flatten(FlattenConfig),
}

/// One layer of a source network.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLayer {
    pub name: String,
    pub kind: LayerKind,
    /// Input tensor names (Caffe "bottoms").
    pub inputs: Vec<String>,
    /// Output tensor names (Caffe "tops").
    pub outputs: Vec<String>,
    pub config: LayerConfig,
    /// Trained parameters, in Caffe's blob order.
    pub blobs: Vec<ParameterBlob>,
}

impl SourceLayer {
    /// Returns `true` if any output reuses an input name (Caffe in-place).
    pub fn is_in_place(&self) -> bool {
        self.outputs.iter().any(|o| self.inputs.contains(o))
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) [{}] -> [{}], {} blobs",
            self.name,
            self.kind,
            self.inputs.join(", "),
            self.outputs.join(", "),
            self.blobs.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_modern_and_v1_names() {
        assert_eq!(LayerKind::from_str_loose("Convolution"), Some(LayerKind::Convolution));
        assert_eq!(LayerKind::from_str_loose("CONVOLUTION"), Some(LayerKind::Convolution));
        assert_eq!(LayerKind::from_str_loose("InnerProduct"), Some(LayerKind::InnerProduct));
        assert_eq!(LayerKind::from_str_loose("INNER_PRODUCT"), Some(LayerKind::InnerProduct));
        assert_eq!(LayerKind::from_str_loose("ReLU"), Some(LayerKind::Relu));
        assert_eq!(LayerKind::from_str_loose("LRN"), Some(LayerKind::Lrn));
        assert_eq!(LayerKind::from_str_loose("TanH"), Some(LayerKind::TanH));
        assert_eq!(LayerKind::from_str_loose("BatchNorm"), None);
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        assert_eq!(
            LayerKind::from_type_name("Deconvolution"),
            LayerKind::Unsupported("Deconvolution".into())
        );
        assert_eq!(LayerKind::from_type_name("Deconvolution").to_string(), "Deconvolution");
    }

    #[test]
    fn test_v1_codes() {
        assert_eq!(LayerKind::from_v1_code(4), LayerKind::Convolution);
        assert_eq!(LayerKind::from_v1_code(14), LayerKind::InnerProduct);
        assert_eq!(LayerKind::from_v1_code(15), LayerKind::Lrn);
        assert_eq!(LayerKind::from_v1_code(6), LayerKind::Dropout);
        assert!(matches!(LayerKind::from_v1_code(5), LayerKind::Unsupported(_)));
    }

    #[test]
    fn test_in_place_detection() {
        let relu = SourceLayer {
            name: "relu1".into(),
            kind: LayerKind::Relu,
            inputs: vec!["conv1".into()],
            outputs: vec!["conv1".into()],
            config: LayerConfig::Relu { negative_slope: 0.0 },
            blobs: vec![],
        };
        assert!(relu.is_in_place());
        assert!(relu.summary().contains("relu1 (ReLU)"));
    }
}
