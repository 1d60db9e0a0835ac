// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-layer mapping rules.
//!
//! [`map_layer`] turns one source layer into zero or more target operators
//! plus the converted parameters they read. The match over [`LayerKind`] has
//! no wildcard arm, so a new kind cannot be added without a rule.
//!
//! | Source                      | Target                                    |
//! |-----------------------------|-------------------------------------------|
//! | `Input`                     | external inputs, no operator              |
//! | `Convolution` (group 1)     | `Conv`                                    |
//! | `Convolution` (group g)     | `DepthSplit`, g × `Conv`, `DepthConcat`   |
//! | `Pooling` MAX / AVE         | `MaxPool` / `AveragePool`                 |
//! | `LRN`                       | `LRN`                                     |
//! | `ReLU`                      | `Relu` or `LeakyRelu`                     |
//! | `Sigmoid` / `TanH`          | `Sigmoid` / `Tanh`                        |
//! | `InnerProduct`              | `FC`                                      |
//! | `Dropout`                   | `Dropout`                                 |
//! | `Softmax` / `Concat`        | `Softmax` / `Concat`                      |
//! | `Eltwise` SUM / PROD / MAX  | `Sum` / `Mul` / `Max`                     |
//! | `Flatten`                   | `Flatten`                                 |
//! | `Split`                     | aliases only, no operator                 |

use crate::params::{self, parameter_name};
use crate::target::{ConvArgs, OpKind, PoolArgs, TargetOperator};
use crate::{Namespace, TranslateError};
use caffe_model::{
    BlobRole, ConvolutionConfig, EltwiseMethod, LayerConfig, LayerKind, ModelError, NormRegion,
    PoolingMethod, SourceLayer,
};
use tensor_core::{Shape, Tensor};

/// Everything one source layer contributes to the target model.
#[derive(Debug, Default)]
pub struct LayerTranslation {
    pub operators: Vec<TargetOperator>,
    /// Converted parameters in the order the operators read them.
    pub parameters: Vec<(String, Tensor)>,
    /// Data inputs declared by `Input` layers.
    pub external_inputs: Vec<(String, Option<Shape>)>,
}

impl LayerTranslation {
    fn add_parameter(&mut self, ns: &mut Namespace, name: String, tensor: Tensor) -> Result<String, TranslateError> {
        ns.reserve_parameter(&name)?;
        self.parameters.push((name.clone(), tensor));
        Ok(name)
    }
}

/// Maps one source layer against the current namespace.
///
/// Inputs are resolved before outputs are bound, so an in-place layer reads
/// the previous value of its blob and writes a freshly named one.
///
/// # Errors
/// - [`TranslateError::UnknownLayer`] for kinds without a rule.
/// - [`TranslateError::UnsupportedParameter`] for configurations the target
///   cannot express.
/// - [`TranslateError::MissingParameters`] / [`TranslateError::Conversion`]
///   for absent or malformed blobs.
/// - [`TranslateError::GraphIntegrity`] for inputs nothing has produced.
pub fn map_layer(layer: &SourceLayer, ns: &mut Namespace) -> Result<LayerTranslation, TranslateError> {
    let mut out = LayerTranslation::default();
    match &layer.kind {
        LayerKind::Input => {
            let LayerConfig::Input { shapes } = &layer.config else {
                return Err(config_mismatch(layer));
            };
            if !layer.inputs.is_empty() || layer.outputs.is_empty() {
                return Err(invalid(layer, "an input layer has no bottoms and at least one top"));
            }
            if shapes.len() > 1 && shapes.len() != layer.outputs.len() {
                return Err(invalid(
                    layer,
                    format!("{} shapes declared for {} tops", shapes.len(), layer.outputs.len()),
                ));
            }
            for (i, name) in layer.outputs.iter().enumerate() {
                ns.declare_input(name)?;
                let shape = shapes.get(i).or(if shapes.len() == 1 { shapes.first() } else { None });
                out.external_inputs.push((name.clone(), shape.cloned()));
            }
        }

        LayerKind::Convolution => {
            let LayerConfig::Convolution(conv) = &layer.config else {
                return Err(config_mismatch(layer));
            };
            expect_arity(layer, 1, 1)?;
            map_convolution(layer, conv, ns, &mut out)?;
        }

        LayerKind::Pooling => {
            let LayerConfig::Pooling(pool) = &layer.config else {
                return Err(config_mismatch(layer));
            };
            let args = PoolArgs {
                kernel: pool.kernel,
                stride: pool.stride,
                pad: pool.pad,
                global: pool.global,
            };
            let kind = match pool.method {
                PoolingMethod::Max => OpKind::MaxPool(args),
                PoolingMethod::Average => OpKind::AveragePool(args),
                PoolingMethod::Stochastic => {
                    return Err(TranslateError::unsupported(&layer.name, "stochastic pooling"))
                }
            };
            map_unary(layer, kind, ns, &mut out)?;
        }

        LayerKind::Lrn => {
            let LayerConfig::Lrn(lrn) = &layer.config else {
                return Err(config_mismatch(layer));
            };
            if lrn.region == NormRegion::WithinChannel {
                return Err(TranslateError::unsupported(&layer.name, "WITHIN_CHANNEL normalization"));
            }
            if lrn.local_size % 2 == 0 {
                return Err(TranslateError::unsupported(
                    &layer.name,
                    format!("even local_size {}", lrn.local_size),
                ));
            }
            let kind = OpKind::Lrn {
                size: lrn.local_size,
                alpha: lrn.alpha,
                beta: lrn.beta,
                bias: lrn.k,
            };
            map_unary(layer, kind, ns, &mut out)?;
        }

        LayerKind::Relu => {
            let LayerConfig::Relu { negative_slope } = layer.config else {
                return Err(config_mismatch(layer));
            };
            let kind = if negative_slope == 0.0 {
                OpKind::Relu
            } else {
                OpKind::LeakyRelu { alpha: negative_slope }
            };
            map_unary(layer, kind, ns, &mut out)?;
        }

        LayerKind::Sigmoid => map_unary(layer, OpKind::Sigmoid, ns, &mut out)?,
        LayerKind::TanH => map_unary(layer, OpKind::Tanh, ns, &mut out)?,

        LayerKind::InnerProduct => {
            let LayerConfig::InnerProduct(ip) = &layer.config else {
                return Err(config_mismatch(layer));
            };
            if ip.transpose {
                return Err(TranslateError::unsupported(&layer.name, "transposed inner-product weights"));
            }
            expect_arity(layer, 1, 1)?;
            let input = ns.resolve(&layer.inputs[0], &layer.name)?;
            let mut blobs = convert_blobs(layer, 1 + usize::from(ip.bias_term))?.into_iter();

            let mut inputs = vec![input];
            if let Some(weight) = blobs.next() {
                expect_leading(layer, BlobRole::Weight, &weight, ip.num_output)?;
                inputs.push(out.add_parameter(ns, parameter_name(&layer.name, BlobRole::Weight), weight)?);
            }
            if let Some(bias) = blobs.next() {
                expect_leading(layer, BlobRole::Bias, &bias, ip.num_output)?;
                inputs.push(out.add_parameter(ns, parameter_name(&layer.name, BlobRole::Bias), bias)?);
            }
            let output = ns.bind_output(&layer.name, &layer.outputs[0]);
            out.operators.push(TargetOperator::new(
                &layer.name,
                OpKind::Fc { axis: ip.axis },
                inputs,
                vec![output],
            ));
        }

        LayerKind::Dropout => {
            let LayerConfig::Dropout { ratio } = layer.config else {
                return Err(config_mismatch(layer));
            };
            map_unary(layer, OpKind::Dropout { ratio }, ns, &mut out)?;
        }

        LayerKind::Softmax => {
            let LayerConfig::Softmax { axis } = layer.config else {
                return Err(config_mismatch(layer));
            };
            map_unary(layer, OpKind::Softmax { axis }, ns, &mut out)?;
        }

        LayerKind::Concat => {
            let LayerConfig::Concat { axis } = layer.config else {
                return Err(config_mismatch(layer));
            };
            if layer.inputs.is_empty() || layer.outputs.len() != 1 {
                return Err(invalid(layer, "concat needs at least one bottom and exactly one top"));
            }
            map_reduction(layer, OpKind::Concat { axis }, ns, &mut out)?;
        }

        LayerKind::Eltwise => {
            let LayerConfig::Eltwise(elt) = &layer.config else {
                return Err(config_mismatch(layer));
            };
            if layer.inputs.len() < 2 || layer.outputs.len() != 1 {
                return Err(invalid(layer, "eltwise needs at least two bottoms and exactly one top"));
            }
            let kind = match elt.method {
                EltwiseMethod::Sum => {
                    if !elt.coeff.is_empty() && elt.coeff.len() != layer.inputs.len() {
                        return Err(invalid(
                            layer,
                            format!("{} coefficients for {} bottoms", elt.coeff.len(), layer.inputs.len()),
                        ));
                    }
                    if elt.coeff.iter().any(|&c| c != 1.0) {
                        return Err(TranslateError::unsupported(
                            &layer.name,
                            format!("SUM with coefficients {:?}", elt.coeff),
                        ));
                    }
                    OpKind::Sum
                }
                EltwiseMethod::Prod | EltwiseMethod::Max if !elt.coeff.is_empty() => {
                    return Err(TranslateError::unsupported(
                        &layer.name,
                        "coefficients are only meaningful for SUM",
                    ));
                }
                EltwiseMethod::Prod => OpKind::Mul,
                EltwiseMethod::Max => OpKind::Max,
            };
            map_reduction(layer, kind, ns, &mut out)?;
        }

        LayerKind::Flatten => {
            let LayerConfig::Flatten(flat) = &layer.config else {
                return Err(config_mismatch(layer));
            };
            if flat.end_axis != -1 {
                return Err(TranslateError::unsupported(
                    &layer.name,
                    format!("flatten end_axis {}", flat.end_axis),
                ));
            }
            map_unary(layer, OpKind::Flatten { axis: flat.axis }, ns, &mut out)?;
        }

        LayerKind::Split => {
            if layer.inputs.len() != 1 || layer.outputs.is_empty() {
                return Err(invalid(layer, "split needs exactly one bottom and at least one top"));
            }
            let input = ns.resolve(&layer.inputs[0], &layer.name)?;
            for output in &layer.outputs {
                ns.bind(output, &input);
            }
        }

        LayerKind::Unsupported(kind) => {
            return Err(TranslateError::UnknownLayer {
                layer: layer.name.clone(),
                kind: kind.clone(),
            })
        }
    }

    if !layer.kind.has_parameters() && !layer.blobs.is_empty() {
        tracing::warn!("layer '{}' ({}): ignoring {} unexpected blobs", layer.name, layer.kind, layer.blobs.len());
    }
    Ok(out)
}

fn map_unary(
    layer: &SourceLayer,
    kind: OpKind,
    ns: &mut Namespace,
    out: &mut LayerTranslation,
) -> Result<(), TranslateError> {
    expect_arity(layer, 1, 1)?;
    let input = ns.resolve(&layer.inputs[0], &layer.name)?;
    let output = ns.bind_output(&layer.name, &layer.outputs[0]);
    out.operators
        .push(TargetOperator::new(&layer.name, kind, vec![input], vec![output]));
    Ok(())
}

fn map_reduction(
    layer: &SourceLayer,
    kind: OpKind,
    ns: &mut Namespace,
    out: &mut LayerTranslation,
) -> Result<(), TranslateError> {
    let inputs = layer
        .inputs
        .iter()
        .map(|name| ns.resolve(name, &layer.name))
        .collect::<Result<Vec<_>, _>>()?;
    let output = ns.bind_output(&layer.name, &layer.outputs[0]);
    out.operators
        .push(TargetOperator::new(&layer.name, kind, inputs, vec![output]));
    Ok(())
}

fn map_convolution(
    layer: &SourceLayer,
    conv: &ConvolutionConfig,
    ns: &mut Namespace,
    out: &mut LayerTranslation,
) -> Result<(), TranslateError> {
    let group = conv.group;
    if group == 0 || conv.num_output % group != 0 {
        return Err(invalid(
            layer,
            format!("num_output {} is not divisible by group {group}", conv.num_output),
        ));
    }
    let input = ns.resolve(&layer.inputs[0], &layer.name)?;
    let mut blobs = convert_blobs(layer, 1 + usize::from(conv.bias_term))?.into_iter();
    let weight = blobs.next().ok_or_else(|| TranslateError::MissingParameters {
        layer: layer.name.clone(),
        detail: "no weight blob".into(),
    })?;
    let bias = blobs.next();

    expect_leading(layer, BlobRole::Weight, &weight, conv.num_output)?;
    if weight.shape().dims()[2..] != conv.kernel {
        return Err(TranslateError::Conversion {
            tensor: parameter_name(&layer.name, BlobRole::Weight),
            detail: format!("weight {} does not match kernel {:?}", weight.shape(), conv.kernel),
        });
    }
    if let Some(b) = &bias {
        expect_leading(layer, BlobRole::Bias, b, conv.num_output)?;
    }

    let args = ConvArgs {
        kernel: conv.kernel,
        stride: conv.stride,
        pad: conv.pad,
        dilation: conv.dilation,
    };

    if group == 1 {
        let mut inputs = vec![input];
        inputs.push(out.add_parameter(ns, parameter_name(&layer.name, BlobRole::Weight), weight)?);
        if let Some(b) = bias {
            inputs.push(out.add_parameter(ns, parameter_name(&layer.name, BlobRole::Bias), b)?);
        }
        let output = ns.bind_output(&layer.name, &layer.outputs[0]);
        out.operators
            .push(TargetOperator::new(&layer.name, OpKind::Conv(args), inputs, vec![output]));
        return Ok(());
    }

    let weights = params::slice(&weight, group, &parameter_name(&layer.name, BlobRole::Weight))?;
    let biases = match bias {
        Some(b) => params::slice(&b, group, &parameter_name(&layer.name, BlobRole::Bias))?
            .into_iter()
            .map(Some)
            .collect(),
        None => vec![None; group],
    };

    let group_inputs: Vec<String> = (0..group)
        .map(|i| ns.fresh(&format!("{}_gconv_{i}_in", layer.name)))
        .collect();
    out.operators.push(TargetOperator::new(
        format!("{}_gconv_split", layer.name),
        OpKind::DepthSplit,
        vec![input],
        group_inputs.clone(),
    ));

    let mut group_outputs = Vec::with_capacity(group);
    for (i, ((x, w), b)) in group_inputs.into_iter().zip(weights).zip(biases).enumerate() {
        let prefix = format!("{}_gconv_{i}", layer.name);
        let mut inputs = vec![x, out.add_parameter(ns, format!("{prefix}_w"), w)?];
        if let Some(b) = b {
            inputs.push(out.add_parameter(ns, format!("{prefix}_b"), b)?);
        }
        let y = ns.fresh(&format!("{prefix}_out"));
        out.operators
            .push(TargetOperator::new(&prefix, OpKind::Conv(args), inputs, vec![y.clone()]));
        group_outputs.push(y);
    }

    let output = ns.bind_output(&layer.name, &layer.outputs[0]);
    out.operators.push(TargetOperator::new(
        &layer.name,
        OpKind::DepthConcat,
        group_outputs,
        vec![output],
    ));
    Ok(())
}

/// Converts the layer's blobs after checking there are exactly `expected`.
fn convert_blobs(layer: &SourceLayer, expected: usize) -> Result<Vec<Tensor>, TranslateError> {
    if layer.blobs.len() < expected {
        return Err(TranslateError::MissingParameters {
            layer: layer.name.clone(),
            detail: format!("expected {expected} blobs, found {}", layer.blobs.len()),
        });
    }
    if layer.blobs.len() > expected {
        return Err(TranslateError::Conversion {
            tensor: parameter_name(&layer.name, BlobRole::from_index(expected)),
            detail: format!("layer takes {expected} blobs, found {}", layer.blobs.len()),
        });
    }
    layer
        .blobs
        .iter()
        .map(|blob| params::convert(blob, &layer.kind))
        .collect()
}

fn expect_leading(layer: &SourceLayer, role: BlobRole, tensor: &Tensor, num_output: usize) -> Result<(), TranslateError> {
    match tensor.shape().dims().first() {
        Some(&d) if d == num_output => Ok(()),
        _ => Err(TranslateError::Conversion {
            tensor: parameter_name(&layer.name, role),
            detail: format!("shape {} does not match num_output {num_output}", tensor.shape()),
        }),
    }
}

fn expect_arity(layer: &SourceLayer, inputs: usize, outputs: usize) -> Result<(), TranslateError> {
    if layer.inputs.len() != inputs || layer.outputs.len() != outputs {
        return Err(invalid(
            layer,
            format!(
                "expected {inputs} bottom(s) and {outputs} top(s), found {} and {}",
                layer.inputs.len(),
                layer.outputs.len()
            ),
        ));
    }
    Ok(())
}

fn invalid(layer: &SourceLayer, detail: impl Into<String>) -> TranslateError {
    TranslateError::Model(ModelError::InvalidLayer {
        layer: layer.name.clone(),
        detail: detail.into(),
    })
}

fn config_mismatch(layer: &SourceLayer) -> TranslateError {
    invalid(layer, format!("configuration does not belong to a {} layer", layer.kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use caffe_model::{
        BlobShape, EltwiseConfig, FlattenConfig, InnerProductConfig, LrnConfig, ParameterBlob,
        PoolingConfig,
    };

    fn layer(name: &str, kind: LayerKind, inputs: &[&str], outputs: &[&str], config: LayerConfig) -> SourceLayer {
        SourceLayer {
            name: name.into(),
            kind,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            config,
            blobs: vec![],
        }
    }

    fn blob(layer: &str, index: usize, dims: Vec<usize>) -> ParameterBlob {
        let n = dims.iter().product();
        ParameterBlob {
            layer: layer.into(),
            role: BlobRole::from_index(index),
            shape: BlobShape::Dims(dims),
            data: (0..n).map(|i| i as f32).collect(),
        }
    }

    fn conv(name: &str, group: usize, bias: bool) -> SourceLayer {
        let mut l = layer(
            name,
            LayerKind::Convolution,
            &["data"],
            &[name],
            LayerConfig::Convolution(ConvolutionConfig {
                num_output: 4,
                bias_term: bias,
                kernel: [3, 3],
                stride: [1, 1],
                pad: [1, 1],
                dilation: [1, 1],
                group,
            }),
        );
        l.blobs.push(blob(name, 0, vec![4, 4 / group, 3, 3]));
        if bias {
            l.blobs.push(blob(name, 1, vec![4]));
        }
        l
    }

    fn ns_with(inputs: &[&str]) -> Namespace {
        let mut ns = Namespace::new();
        for i in inputs {
            ns.declare_input(i).unwrap();
        }
        ns
    }

    #[test]
    fn test_input_layer_declares_inputs() {
        let mut ns = Namespace::new();
        let l = layer(
            "input",
            LayerKind::Input,
            &[],
            &["data", "label"],
            LayerConfig::Input {
                shapes: vec![Shape::nchw(1, 3, 8, 8)],
            },
        );
        let t = map_layer(&l, &mut ns).unwrap();
        assert!(t.operators.is_empty());
        assert_eq!(t.external_inputs.len(), 2);
        assert_eq!(t.external_inputs[1].1, Some(Shape::nchw(1, 3, 8, 8)));
        assert_eq!(ns.resolve("label", "x").unwrap(), "label");
    }

    #[test]
    fn test_convolution_single_group() {
        let mut ns = ns_with(&["data"]);
        let t = map_layer(&conv("conv1", 1, true), &mut ns).unwrap();
        assert_eq!(t.operators.len(), 1);
        let op = &t.operators[0];
        assert_eq!(op.inputs, vec!["data", "conv1_w", "conv1_b"]);
        assert_eq!(op.outputs, vec!["conv1"]);
        assert!(matches!(op.kind, OpKind::Conv(ConvArgs { pad: [1, 1], .. })));
        assert_eq!(t.parameters[0].1.shape(), &Shape::nchw(4, 4, 3, 3));
    }

    #[test]
    fn test_grouped_convolution_expands() {
        let mut ns = ns_with(&["data"]);
        let t = map_layer(&conv("conv2", 2, true), &mut ns).unwrap();

        let kinds: Vec<&str> = t.operators.iter().map(|o| o.kind.type_name()).collect();
        assert_eq!(kinds, vec!["DepthSplit", "Conv", "Conv", "DepthConcat"]);
        assert_eq!(t.operators[0].outputs, vec!["conv2_gconv_0_in", "conv2_gconv_1_in"]);
        assert_eq!(
            t.operators[2].inputs,
            vec!["conv2_gconv_1_in", "conv2_gconv_1_w", "conv2_gconv_1_b"]
        );
        assert_eq!(t.operators[3].inputs, vec!["conv2_gconv_0_out", "conv2_gconv_1_out"]);
        assert_eq!(t.operators[3].outputs, vec!["conv2"]);

        let names: Vec<&str> = t.parameters.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["conv2_gconv_0_w", "conv2_gconv_0_b", "conv2_gconv_1_w", "conv2_gconv_1_b"]);
        assert_eq!(t.parameters[2].1.shape(), &Shape::nchw(2, 2, 3, 3));
        // Second slice starts at output channel 2.
        assert_eq!(t.parameters[2].1.as_f32_slice()[0], 36.0);
        assert_eq!(t.parameters[3].1.as_f32_slice(), &[2.0, 3.0]);
    }

    #[test]
    fn test_missing_and_extra_blobs() {
        let mut ns = ns_with(&["data"]);
        let mut l = conv("conv1", 1, true);
        l.blobs.truncate(1);
        assert!(matches!(
            map_layer(&l, &mut ns),
            Err(TranslateError::MissingParameters { ref layer, .. }) if layer == "conv1"
        ));

        let mut l = conv("conv1", 1, false);
        l.blobs.push(blob("conv1", 1, vec![4]));
        assert!(matches!(map_layer(&l, &mut ns), Err(TranslateError::Conversion { .. })));
    }

    #[test]
    fn test_num_output_checked_against_weights() {
        let mut ns = ns_with(&["data"]);
        let mut l = conv("conv1", 1, false);
        l.blobs[0] = blob("conv1", 0, vec![5, 4, 3, 3]);
        assert!(matches!(
            map_layer(&l, &mut ns),
            Err(TranslateError::Conversion { ref tensor, .. }) if tensor == "conv1_w"
        ));
    }

    #[test]
    fn test_pooling_rules() {
        let pool = |method| {
            layer(
                "pool1",
                LayerKind::Pooling,
                &["data"],
                &["pool1"],
                LayerConfig::Pooling(PoolingConfig {
                    method,
                    kernel: [3, 3],
                    stride: [2, 2],
                    pad: [0, 0],
                    global: false,
                }),
            )
        };
        let t = map_layer(&pool(PoolingMethod::Average), &mut ns_with(&["data"])).unwrap();
        assert_eq!(t.operators[0].kind.type_name(), "AveragePool");
        let t = map_layer(&pool(PoolingMethod::Max), &mut ns_with(&["data"])).unwrap();
        assert_eq!(t.operators[0].kind.type_name(), "MaxPool");
        assert!(matches!(
            map_layer(&pool(PoolingMethod::Stochastic), &mut ns_with(&["data"])),
            Err(TranslateError::UnsupportedParameter { .. })
        ));
    }

    #[test]
    fn test_lrn_rules() {
        let lrn = |region, local_size| {
            layer(
                "norm1",
                LayerKind::Lrn,
                &["data"],
                &["norm1"],
                LayerConfig::Lrn(LrnConfig {
                    local_size,
                    alpha: 1e-4,
                    beta: 0.75,
                    k: 2.0,
                    region,
                }),
            )
        };
        let t = map_layer(&lrn(NormRegion::AcrossChannels, 5), &mut ns_with(&["data"])).unwrap();
        assert_eq!(
            t.operators[0].kind,
            OpKind::Lrn {
                size: 5,
                alpha: 1e-4,
                beta: 0.75,
                bias: 2.0
            }
        );
        for bad in [lrn(NormRegion::WithinChannel, 5), lrn(NormRegion::AcrossChannels, 4)] {
            assert!(matches!(
                map_layer(&bad, &mut ns_with(&["data"])),
                Err(TranslateError::UnsupportedParameter { .. })
            ));
        }
    }

    #[test]
    fn test_in_place_relu_and_leaky() {
        let mut ns = ns_with(&["data"]);
        map_layer(&conv("conv1", 1, true), &mut ns).unwrap();
        let relu = layer(
            "relu1",
            LayerKind::Relu,
            &["conv1"],
            &["conv1"],
            LayerConfig::Relu { negative_slope: 0.1 },
        );
        let t = map_layer(&relu, &mut ns).unwrap();
        let op = &t.operators[0];
        assert_eq!(op.kind, OpKind::LeakyRelu { alpha: 0.1 });
        assert_eq!(op.inputs, vec!["conv1"]);
        assert_eq!(op.outputs, vec!["conv1_relu1"]);
        assert_eq!(ns.resolve("conv1", "next").unwrap(), "conv1_relu1");
    }

    #[test]
    fn test_inner_product_rules() {
        let ip = |transpose| {
            let mut l = layer(
                "fc6",
                LayerKind::InnerProduct,
                &["data"],
                &["fc6"],
                LayerConfig::InnerProduct(InnerProductConfig {
                    num_output: 3,
                    bias_term: true,
                    axis: 1,
                    transpose,
                }),
            );
            l.blobs = vec![
                ParameterBlob {
                    shape: BlobShape::Legacy {
                        num: 1,
                        channels: 1,
                        height: 3,
                        width: 8,
                    },
                    ..blob("fc6", 0, vec![24])
                },
                blob("fc6", 1, vec![3]),
            ];
            l
        };
        let t = map_layer(&ip(false), &mut ns_with(&["data"])).unwrap();
        assert_eq!(t.operators[0].kind, OpKind::Fc { axis: 1 });
        assert_eq!(t.parameters[0].1.shape(), &Shape::matrix(3, 8));
        assert!(matches!(
            map_layer(&ip(true), &mut ns_with(&["data"])),
            Err(TranslateError::UnsupportedParameter { .. })
        ));
    }

    #[test]
    fn test_eltwise_rules() {
        let elt = |method, coeff: Vec<f32>| {
            layer(
                "sum",
                LayerKind::Eltwise,
                &["a", "b"],
                &["sum"],
                LayerConfig::Eltwise(EltwiseConfig { method, coeff }),
            )
        };
        let ok = [
            (elt(EltwiseMethod::Sum, vec![]), OpKind::Sum),
            (elt(EltwiseMethod::Sum, vec![1.0, 1.0]), OpKind::Sum),
            (elt(EltwiseMethod::Prod, vec![]), OpKind::Mul),
            (elt(EltwiseMethod::Max, vec![]), OpKind::Max),
        ];
        for (l, kind) in ok {
            let t = map_layer(&l, &mut ns_with(&["a", "b"])).unwrap();
            assert_eq!(t.operators[0].kind, kind);
            assert_eq!(t.operators[0].inputs, vec!["a", "b"]);
        }
        for bad in [elt(EltwiseMethod::Sum, vec![1.0, -1.0]), elt(EltwiseMethod::Max, vec![1.0, 1.0])] {
            assert!(matches!(
                map_layer(&bad, &mut ns_with(&["a", "b"])),
                Err(TranslateError::UnsupportedParameter { .. })
            ));
        }
    }

    #[test]
    fn test_split_aliases_without_operators() {
        let mut ns = ns_with(&["data"]);
        let l = layer("split", LayerKind::Split, &["data"], &["d0", "d1"], LayerConfig::None);
        let t = map_layer(&l, &mut ns).unwrap();
        assert!(t.operators.is_empty());
        assert_eq!(ns.resolve("d1", "x").unwrap(), "data");
    }

    #[test]
    fn test_simple_kinds() {
        let cases = [
            (LayerKind::Sigmoid, LayerConfig::None, OpKind::Sigmoid),
            (LayerKind::TanH, LayerConfig::None, OpKind::Tanh),
            (LayerKind::Dropout, LayerConfig::Dropout { ratio: 0.5 }, OpKind::Dropout { ratio: 0.5 }),
            (LayerKind::Softmax, LayerConfig::Softmax { axis: 1 }, OpKind::Softmax { axis: 1 }),
            (LayerKind::Concat, LayerConfig::Concat { axis: 1 }, OpKind::Concat { axis: 1 }),
            (
                LayerKind::Flatten,
                LayerConfig::Flatten(FlattenConfig { axis: 1, end_axis: -1 }),
                OpKind::Flatten { axis: 1 },
            ),
        ];
        for (kind, config, expected) in cases {
            let l = layer("l", kind, &["data"], &["y"], config);
            let t = map_layer(&l, &mut ns_with(&["data"])).unwrap();
            assert_eq!(t.operators[0].kind, expected);
            assert_eq!(t.operators[0].outputs, vec!["y"]);
        }
    }

    #[test]
    fn test_unknown_kind_and_bad_input() {
        let l = layer(
            "deconv",
            LayerKind::Unsupported("Deconvolution".into()),
            &["data"],
            &["y"],
            LayerConfig::None,
        );
        assert!(matches!(
            map_layer(&l, &mut ns_with(&["data"])),
            Err(TranslateError::UnknownLayer { ref kind, .. }) if kind == "Deconvolution"
        ));

        let l = layer("t", LayerKind::TanH, &["ghost"], &["y"], LayerConfig::None);
        assert!(matches!(
            map_layer(&l, &mut ns_with(&["data"])),
            Err(TranslateError::GraphIntegrity { .. })
        ));
    }
}
