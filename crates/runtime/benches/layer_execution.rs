// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for single-operator and whole-graph execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use runtime::Workspace;
use tensor_core::{Shape, Tensor};
use translator::{ConvArgs, OpKind, PoolArgs, TargetGraph, TargetOperator};

fn filled(dims: &[usize], value: f32) -> Tensor {
    let shape = Shape::new(dims.to_vec());
    let n = shape.num_elements();
    Tensor::from_vec(shape, vec![value; n]).unwrap()
}

fn op(name: &str, kind: OpKind, inputs: &[&str], output: &str) -> TargetOperator {
    TargetOperator::new(
        name,
        kind,
        inputs.iter().map(|s| s.to_string()).collect(),
        vec![output.to_string()],
    )
}

/// conv → relu → pool → fc → softmax on a 1×3×64×64 input.
fn small_graph() -> (TargetGraph, Workspace) {
    let conv = ConvArgs {
        kernel: [5, 5],
        stride: [1, 1],
        pad: [2, 2],
        dilation: [1, 1],
    };
    let pool = PoolArgs {
        kernel: [3, 3],
        stride: [2, 2],
        pad: [0, 0],
        global: false,
    };
    let graph = TargetGraph {
        name: "bench".into(),
        operators: vec![
            op("conv1", OpKind::Conv(conv), &["data", "conv1_w", "conv1_b"], "conv1"),
            op("relu1", OpKind::Relu, &["conv1"], "conv1_relu1"),
            op("pool1", OpKind::MaxPool(pool), &["conv1_relu1"], "pool1"),
            op("fc", OpKind::Fc { axis: 1 }, &["pool1", "fc_w", "fc_b"], "fc"),
            op("prob", OpKind::Softmax { axis: 1 }, &["fc"], "prob"),
        ],
        external_inputs: vec!["data".into()],
        parameters: vec!["conv1_w".into(), "conv1_b".into(), "fc_w".into(), "fc_b".into()],
        external_outputs: vec!["prob".into()],
        ..Default::default()
    };

    let mut ws = Workspace::new();
    ws.feed_blob("data", filled(&[1, 3, 64, 64], 0.5));
    ws.feed_blob("conv1_w", filled(&[16, 3, 5, 5], 0.01));
    ws.feed_blob("conv1_b", filled(&[16], 0.0));
    ws.feed_blob("fc_w", filled(&[100, 16 * 32 * 32], 0.001));
    ws.feed_blob("fc_b", filled(&[100], 0.0));
    (graph, ws)
}

fn bench_single_operator(c: &mut Criterion) {
    let (mut graph, mut ws) = small_graph();
    graph.operators.truncate(1);
    graph.parameters.truncate(2);
    graph.external_outputs = vec!["conv1".into()];

    c.bench_function("conv_5x5_16x64x64", |b| {
        b.iter(|| ws.run_net_once(black_box(&graph)).unwrap())
    });
}

fn bench_graph(c: &mut Criterion) {
    let (graph, mut ws) = small_graph();
    c.bench_function("conv_relu_pool_fc_softmax", |b| {
        b.iter(|| ws.run_net_once(black_box(&graph)).unwrap())
    });
}

criterion_group!(benches, bench_single_operator, bench_graph);
criterion_main!(benches);
