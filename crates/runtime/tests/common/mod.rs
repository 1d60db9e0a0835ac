// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Builders for small source networks with deterministic parameters.

#![allow(dead_code)]

use caffe_model::{
    BlobRole, BlobShape, ConvolutionConfig, InnerProductConfig, InputDecl, LayerConfig, LayerKind,
    LrnConfig, NormRegion, ParameterBlob, PoolingConfig, PoolingMethod, SourceLayer, SourceNet,
};
use runtime::{Pipeline, Ready, RunConfig};
use tensor_core::{Shape, Tensor};

/// Deterministic values in `[-1, 1)`.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    pub fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
    }

    pub fn values(&mut self, n: usize) -> Vec<f32> {
        (0..n).map(|_| self.next_f32()).collect()
    }

    pub fn tensor(&mut self, dims: &[usize]) -> Tensor {
        let shape = Shape::new(dims.to_vec());
        let n = shape.num_elements();
        Tensor::from_vec(shape, self.values(n)).unwrap()
    }
}

pub fn blob(layer: &str, role: BlobRole, shape: BlobShape, rng: &mut Lcg, scale: f32) -> ParameterBlob {
    let n = shape.num_elements();
    ParameterBlob {
        layer: layer.into(),
        role,
        shape,
        data: rng.values(n).into_iter().map(|v| v * scale).collect(),
    }
}

pub fn layer(name: &str, kind: LayerKind, config: LayerConfig, input: &str, output: &str) -> SourceLayer {
    SourceLayer {
        name: name.into(),
        kind,
        inputs: vec![input.into()],
        outputs: vec![output.into()],
        config,
        blobs: vec![],
    }
}

#[allow(clippy::too_many_arguments)]
pub fn conv(
    name: &str,
    input: &str,
    in_channels: usize,
    out_channels: usize,
    kernel: usize,
    pad: usize,
    group: usize,
    rng: &mut Lcg,
) -> SourceLayer {
    let mut l = layer(
        name,
        LayerKind::Convolution,
        LayerConfig::Convolution(ConvolutionConfig {
            num_output: out_channels,
            bias_term: true,
            kernel: [kernel, kernel],
            stride: [1, 1],
            pad: [pad, pad],
            dilation: [1, 1],
            group,
        }),
        input,
        name,
    );
    let scale = 1.0 / (in_channels / group * kernel * kernel) as f32;
    l.blobs = vec![
        blob(
            name,
            BlobRole::Weight,
            BlobShape::Dims(vec![out_channels, in_channels / group, kernel, kernel]),
            rng,
            scale,
        ),
        blob(name, BlobRole::Bias, BlobShape::Dims(vec![out_channels]), rng, 0.1),
    ];
    l
}

pub fn max_pool(name: &str, input: &str, kernel: usize, stride: usize) -> SourceLayer {
    pool(name, input, PoolingMethod::Max, kernel, stride)
}

pub fn pool(name: &str, input: &str, method: PoolingMethod, kernel: usize, stride: usize) -> SourceLayer {
    layer(
        name,
        LayerKind::Pooling,
        LayerConfig::Pooling(PoolingConfig {
            method,
            kernel: [kernel, kernel],
            stride: [stride, stride],
            pad: [0, 0],
            global: false,
        }),
        input,
        name,
    )
}

pub fn lrn(name: &str, input: &str) -> SourceLayer {
    layer(
        name,
        LayerKind::Lrn,
        LayerConfig::Lrn(LrnConfig {
            local_size: 5,
            alpha: 1e-4,
            beta: 0.75,
            k: 1.0,
            region: NormRegion::AcrossChannels,
        }),
        input,
        name,
    )
}

/// In-place ReLU on `blob`.
pub fn relu(name: &str, blob: &str) -> SourceLayer {
    layer(name, LayerKind::Relu, LayerConfig::Relu { negative_slope: 0.0 }, blob, blob)
}

/// In-place dropout on `blob`.
pub fn dropout(name: &str, blob: &str) -> SourceLayer {
    layer(name, LayerKind::Dropout, LayerConfig::Dropout { ratio: 0.5 }, blob, blob)
}

/// Inner product whose weight is stored in the legacy `(1, 1, out, in)` form
/// when `legacy` is set.
pub fn fc(name: &str, input: &str, in_features: usize, out_features: usize, legacy: bool, rng: &mut Lcg) -> SourceLayer {
    let mut l = layer(
        name,
        LayerKind::InnerProduct,
        LayerConfig::InnerProduct(InnerProductConfig {
            num_output: out_features,
            bias_term: true,
            axis: 1,
            transpose: false,
        }),
        input,
        name,
    );
    let (weight_shape, bias_shape) = if legacy {
        (
            BlobShape::Legacy {
                num: 1,
                channels: 1,
                height: out_features,
                width: in_features,
            },
            BlobShape::Legacy {
                num: 1,
                channels: 1,
                height: 1,
                width: out_features,
            },
        )
    } else {
        (
            BlobShape::Dims(vec![out_features, in_features]),
            BlobShape::Dims(vec![out_features]),
        )
    };
    let scale = 1.0 / (in_features as f32).sqrt();
    l.blobs = vec![
        blob(name, BlobRole::Weight, weight_shape, rng, scale),
        blob(name, BlobRole::Bias, bias_shape, rng, 0.1),
    ];
    l
}

pub fn softmax(name: &str, input: &str) -> SourceLayer {
    layer(name, LayerKind::Softmax, LayerConfig::Softmax { axis: 1 }, input, name)
}

pub fn net(name: &str, layers: Vec<SourceLayer>) -> SourceNet {
    SourceNet {
        name: name.into(),
        inputs: vec![InputDecl {
            name: "data".into(),
            shape: None,
        }],
        layers,
    }
}

/// Translates, optionally rewrites, and runs `net` on `input`.
pub fn run(net: SourceNet, input: Tensor, apply_rewrite: bool) -> Pipeline<Ready> {
    let config = RunConfig {
        apply_rewrite,
        ..Default::default()
    };
    let mut ready = Pipeline::from_source(config, net)
        .translate()
        .unwrap()
        .prepare()
        .unwrap();
    ready.run(input).unwrap();
    ready
}

/// Asserts element-wise closeness with an absolute tolerance.
pub fn assert_close(actual: &Tensor, expected: &[f32], tol: f32) {
    assert_eq!(actual.as_f32_slice().len(), expected.len(), "length of {}", actual.shape());
    for (i, (a, e)) in actual.as_f32_slice().iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= tol, "element {i}: {a} vs {e}");
    }
}

/// Weight and bias values of a layer's first two blobs.
pub fn params(layer: &SourceLayer) -> (Vec<f32>, Vec<f32>) {
    (layer.blobs[0].data.clone(), layer.blobs[1].data.clone())
}
