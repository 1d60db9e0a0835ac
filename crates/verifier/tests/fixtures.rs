// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: the fixture-backed verification flow.
//!
//! A small network is written to disk as a prototxt plus a binary
//! parameter file, reference dumps are produced by running the graph with
//! dropout still in place, and the rewritten graph is verified against them.
//! The CaffeNet test runs only when its fixtures are checked out.

use caffe_model::proto::{BlobProto, BlobShapeProto, LayerProto, NetParameterProto};
use prost::Message;
use runtime::{Pipeline, RunConfig, CAFFENET_CHECKED};
use std::path::{Path, PathBuf};
use tensor_core::{Shape, Tensor};
use verifier::{dump_tensors, npy, verify_fixtures, FixtureOutcome, Mismatch, VerifyError};

const DEPLOY: &str = r#"
name: "FixtureNet"
input: "data"
input_dim: 2
input_dim: 3
input_dim: 8
input_dim: 8
layer {
  name: "conv1"
  type: "Convolution"
  bottom: "data"
  top: "conv1"
  convolution_param { num_output: 4 kernel_size: 3 }
}
layer { name: "relu1" type: "ReLU" bottom: "conv1" top: "conv1" }
layer {
  name: "pool1"
  type: "Pooling"
  bottom: "conv1"
  top: "pool1"
  pooling_param { pool: MAX kernel_size: 2 stride: 2 }
}
layer {
  name: "norm1"
  type: "LRN"
  bottom: "pool1"
  top: "norm1"
  lrn_param { local_size: 3 alpha: 0.0001 beta: 0.75 }
}
layer {
  name: "fc6"
  type: "InnerProduct"
  bottom: "norm1"
  top: "fc6"
  inner_product_param { num_output: 5 }
}
layer { name: "relu6" type: "ReLU" bottom: "fc6" top: "fc6" }
layer {
  name: "drop6"
  type: "Dropout"
  bottom: "fc6"
  top: "fc6"
  dropout_param { dropout_ratio: 0.5 }
}
layer {
  name: "fc7"
  type: "InnerProduct"
  bottom: "fc6"
  top: "fc7"
  inner_product_param { num_output: 3 }
}
layer { name: "prob" type: "Softmax" bottom: "fc7" top: "prob" }
"#;

const CHECKED: [&str; 6] = ["conv1", "pool1", "norm1", "fc6", "fc7", "prob"];

fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("verifier_{test}_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn blob(dims: Vec<i64>, seed: f32) -> BlobProto {
    let n: i64 = dims.iter().product();
    BlobProto {
        shape: Some(BlobShapeProto { dim: dims }),
        data: (0..n).map(|i| ((i as f32 * 0.37 + seed).sin()) * 0.2).collect(),
        ..Default::default()
    }
}

fn layer(name: &str, kind: &str, blobs: Vec<BlobProto>) -> LayerProto {
    LayerProto {
        name: name.into(),
        r#type: kind.into(),
        blobs,
        ..Default::default()
    }
}

fn trained_bytes() -> Vec<u8> {
    NetParameterProto {
        name: "FixtureNet".into(),
        layer: vec![
            layer("conv1", "Convolution", vec![blob(vec![4, 3, 3, 3], 0.1), blob(vec![4], 0.2)]),
            layer("fc6", "InnerProduct", vec![blob(vec![5, 36], 0.3), blob(vec![5], 0.4)]),
            layer("fc7", "InnerProduct", vec![blob(vec![3, 5], 0.5), blob(vec![3], 0.6)]),
        ],
        ..Default::default()
    }
    .encode_to_vec()
}

/// Writes the description, weights, input and reference dumps.
fn write_fixtures(dir: &Path) -> RunConfig {
    std::fs::write(dir.join("deploy.prototxt"), DEPLOY).unwrap();
    std::fs::write(dir.join("bvlc_reference_caffenet.caffemodel"), trained_bytes()).unwrap();

    let values: Vec<f32> = (0..2 * 3 * 8 * 8).map(|i| ((i * 7 % 23) as f32 - 11.0) / 11.0).collect();
    let input = Tensor::from_vec(Shape::nchw(2, 3, 8, 8), values).unwrap();
    npy::write_npy(&dir.join("data_dump.npy"), &input).unwrap();

    let mut config = RunConfig::for_fixture_dir(dir);
    config.checked = CHECKED.iter().map(|s| s.to_string()).collect();

    // References come from the graph with dropout kept.
    let reference_config = RunConfig {
        apply_rewrite: false,
        ..config.clone()
    };
    let mut reference = Pipeline::load(reference_config).unwrap().translate().unwrap().prepare().unwrap();
    reference.run(input).unwrap();
    assert_eq!(dump_tensors(&reference, &CHECKED, dir).unwrap(), CHECKED.len());
    config
}

#[test]
fn test_rewritten_graph_matches_references() {
    let dir = scratch_dir("match");
    let config = write_fixtures(&dir);

    match verify_fixtures(&config).unwrap() {
        FixtureOutcome::Verified(report) => {
            assert!(report.is_success());
            assert_eq!(report.checks.len(), CHECKED.len());
        }
        FixtureOutcome::Skipped { .. } => panic!("fixtures exist"),
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_perturbed_reference_names_the_tensor() {
    let dir = scratch_dir("perturbed");
    let config = write_fixtures(&dir);

    let path = dir.join("fc6_dump.npy");
    let mut fc6 = npy::read_npy(&path).unwrap();
    fc6.as_f32_slice_mut()[3] += 0.1;
    npy::write_npy(&path, &fc6).unwrap();
    std::fs::remove_file(dir.join("norm1_dump.npy")).unwrap();

    match verify_fixtures(&config) {
        Err(VerifyError::Failed(report)) => {
            assert_eq!(report.failed_names(), vec!["norm1", "fc6"]);
            assert!(matches!(report.mismatches[1], Mismatch::ValueMismatch { index: 3, .. }));
        }
        other => panic!("expected a failed report, got {other:?}"),
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_input_dump_is_an_error() {
    let dir = scratch_dir("no_input");
    let config = write_fixtures(&dir);
    std::fs::remove_file(dir.join("data_dump.npy")).unwrap();

    assert!(matches!(verify_fixtures(&config), Err(VerifyError::Io { .. })));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_caffenet_reference_fixtures() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/testdata/caffe_translator");
    if !dir.is_dir() {
        eprintln!("skipping: {} not present", dir.display());
        return;
    }
    let config = RunConfig::for_fixture_dir(&dir);
    assert_eq!(config.checked, CAFFENET_CHECKED.map(String::from).to_vec());

    match verify_fixtures(&config) {
        Ok(FixtureOutcome::Verified(report)) => assert!(report.is_success()),
        Ok(FixtureOutcome::Skipped { .. }) => unreachable!("directory exists"),
        Err(e) => panic!("{e}"),
    }
}
