// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named-tensor workspace that executes a [`TargetGraph`] once.
//!
//! Operators run strictly in graph order. Each operator reads its inputs
//! from the workspace and publishes its outputs under their declared names
//! before the next operator starts, so every intermediate remains
//! fetchable after the run.

use crate::{RunMetrics, RuntimeError};
use std::collections::HashMap;
use std::time::Instant;
use tensor_core::{
    Activation, Conv2dParams, EltwiseOp, LrnParams, Pool2dParams, PoolMethod, Shape, Tensor,
    TensorView,
};
use translator::{OpKind, PoolArgs, TargetGraph, TargetOperator, TargetParameterSet};

/// A mutable map from tensor name to value.
#[derive(Debug, Default)]
pub struct Workspace {
    blobs: HashMap<String, Tensor>,
    bytes: usize,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `tensor` under `name`, replacing any previous value.
    pub fn feed_blob(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.bytes += tensor.size_bytes();
        if let Some(old) = self.blobs.insert(name.into(), tensor) {
            self.bytes -= old.size_bytes();
        }
    }

    /// Feeds every tensor of a parameter set under its own name.
    pub fn feed_parameters(&mut self, parameters: &TargetParameterSet) {
        for (name, tensor) in parameters.iter() {
            self.feed_blob(name, tensor.clone());
        }
        tracing::debug!(
            "fed {} parameter tensors ({} values)",
            parameters.len(),
            parameters.num_values()
        );
    }

    /// Returns the tensor stored under `name`.
    ///
    /// # Errors
    /// [`RuntimeError::MissingBlob`] if nothing was stored under `name`.
    pub fn fetch_blob(&self, name: &str) -> Result<&Tensor, RuntimeError> {
        self.blobs
            .get(name)
            .ok_or_else(|| RuntimeError::MissingBlob(name.to_string()))
    }

    pub fn has_blob(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }

    /// Stored names in sorted order.
    pub fn blob_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blobs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Total bytes held by stored tensors.
    pub fn size_bytes(&self) -> usize {
        self.bytes
    }

    /// Removes every stored tensor.
    pub fn reset(&mut self) {
        self.blobs.clear();
        self.bytes = 0;
    }

    /// Runs every operator of `graph` once, in order.
    ///
    /// External inputs and parameters must already be fed.
    ///
    /// # Errors
    /// [`RuntimeError::MissingBlob`] for an unfed input,
    /// [`RuntimeError::InvalidOperator`] for an arity mismatch, and
    /// [`RuntimeError::ExecutionError`] when a kernel rejects its operands.
    pub fn run_net_once(&mut self, graph: &TargetGraph) -> Result<RunMetrics, RuntimeError> {
        let run_start = Instant::now();
        let mut metrics = RunMetrics::new();

        for name in graph.external_inputs.iter().chain(&graph.parameters) {
            if !self.has_blob(name) {
                return Err(RuntimeError::MissingBlob(name.clone()));
            }
        }

        for op in &graph.operators {
            let start = Instant::now();
            let outputs = self.execute(op)?;
            let duration = start.elapsed();

            if outputs.len() != op.outputs.len() {
                return Err(invalid(
                    op,
                    format!("produced {} outputs, declared {}", outputs.len(), op.outputs.len()),
                ));
            }
            let output_bytes = outputs.iter().map(Tensor::size_bytes).sum();
            for (name, tensor) in op.outputs.iter().zip(outputs) {
                self.feed_blob(name.as_str(), tensor);
            }

            tracing::debug!(
                "{} ({}) -> {:?} in {:.3}ms",
                op.name,
                op.kind.type_name(),
                op.outputs,
                duration.as_secs_f64() * 1000.0
            );
            metrics.record_operator(
                op.name.clone(),
                op.kind.type_name(),
                duration,
                output_bytes,
                self.bytes,
            );
        }

        metrics.finalise(run_start.elapsed());
        tracing::info!("{}: {}", graph.name, metrics.summary());
        Ok(metrics)
    }

    fn input(&self, op: &TargetOperator, index: usize) -> Result<&Tensor, RuntimeError> {
        let name = op
            .inputs
            .get(index)
            .ok_or_else(|| invalid(op, format!("missing input #{index}")))?;
        self.fetch_blob(name)
    }

    fn optional_input(&self, op: &TargetOperator, index: usize) -> Result<Option<&Tensor>, RuntimeError> {
        if index < op.inputs.len() {
            self.input(op, index).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Computes the outputs of `op` without touching the workspace.
    fn execute(&self, op: &TargetOperator) -> Result<Vec<Tensor>, RuntimeError> {
        let err = || RuntimeError::execution(&op.name);
        let single = |t: Tensor| -> Result<Vec<Tensor>, RuntimeError> { Ok(vec![t]) };

        match &op.kind {
            OpKind::Conv(args) => {
                expect_inputs(op, 2..=3)?;
                let x = self.input(op, 0)?;
                let w = self.input(op, 1)?;
                let b = self.optional_input(op, 2)?;
                let params = Conv2dParams {
                    kernel: args.kernel,
                    stride: args.stride,
                    pad: args.pad,
                    dilation: args.dilation,
                };
                let out_channels = w.shape().dim(0).unwrap_or(0);
                let shape = tensor_core::conv2d_output_shape(x.shape(), out_channels, &params)
                    .map_err(err())?;
                let mut out = Tensor::zeros(shape);
                let bias = b.map(Tensor::view);
                tensor_core::conv2d(&x.view(), &w.view(), bias.as_ref(), &params, &mut out)
                    .map_err(err())?;
                single(out)
            }
            OpKind::MaxPool(args) => self.pool(op, PoolMethod::Max, args),
            OpKind::AveragePool(args) => self.pool(op, PoolMethod::Average, args),
            OpKind::Lrn { size, alpha, beta, bias } => {
                expect_inputs(op, 1..=1)?;
                let x = self.input(op, 0)?;
                let params = LrnParams {
                    size: *size,
                    alpha: *alpha,
                    beta: *beta,
                    bias: *bias,
                };
                let mut out = Tensor::zeros(x.shape().clone());
                tensor_core::lrn(&x.view(), &params, &mut out).map_err(err())?;
                single(out)
            }
            OpKind::Relu => self.activate(op, Activation::Relu),
            OpKind::LeakyRelu { alpha } => self.activate(op, Activation::LeakyRelu { alpha: *alpha }),
            OpKind::Sigmoid => self.activate(op, Activation::Sigmoid),
            OpKind::Tanh => self.activate(op, Activation::Tanh),
            OpKind::Fc { axis } => {
                expect_inputs(op, 2..=3)?;
                let x = self.input(op, 0)?;
                let w = self.input(op, 1)?;
                let b = self.optional_input(op, 2)?;
                let axis = x.shape().canonical_axis(*axis).map_err(err())?;
                let n = w.shape().dim(0).unwrap_or(0);
                let m = x.shape().count(0, axis);
                let mut out = Tensor::zeros(Shape::matrix(m, n));
                let bias = b.map(Tensor::view);
                tensor_core::fully_connected(&x.view(), &w.view(), bias.as_ref(), axis, &mut out)
                    .map_err(err())?;
                let mut dims = x.shape().dims()[..axis].to_vec();
                dims.push(n);
                single(out.reshape(Shape::new(dims)).map_err(err())?)
            }
            // Test-mode dropout passes its input through.
            OpKind::Dropout { .. } => {
                expect_inputs(op, 1..=1)?;
                single(self.input(op, 0)?.clone())
            }
            OpKind::Softmax { axis } => {
                expect_inputs(op, 1..=1)?;
                let x = self.input(op, 0)?;
                let mut out = Tensor::zeros(x.shape().clone());
                tensor_core::softmax(&x.view(), *axis, &mut out).map_err(err())?;
                single(out)
            }
            OpKind::Concat { axis } => {
                let first = self.input(op, 0)?;
                let axis = first.shape().canonical_axis(*axis).map_err(err())?;
                self.concat(op, axis)
            }
            OpKind::DepthConcat => self.concat(op, 1),
            OpKind::DepthSplit => {
                expect_inputs(op, 1..=1)?;
                let x = self.input(op, 0)?;
                let parts = op.outputs.len();
                let channels = x.shape().dim(1).unwrap_or(0);
                if parts == 0 || channels % parts != 0 {
                    return Err(invalid(
                        op,
                        format!("{channels} channels do not split into {parts} equal parts"),
                    ));
                }
                let sizes = vec![channels / parts; parts];
                tensor_core::split(&x.view(), 1, &sizes).map_err(err())
            }
            OpKind::Sum => self.reduce(op, EltwiseOp::Sum),
            OpKind::Mul => self.reduce(op, EltwiseOp::Prod),
            OpKind::Max => self.reduce(op, EltwiseOp::Max),
            OpKind::Flatten { axis } => {
                expect_inputs(op, 1..=1)?;
                let x = self.input(op, 0)?;
                let axis = x.shape().canonical_axis(*axis).map_err(err())?;
                let mut dims = x.shape().dims()[..axis].to_vec();
                dims.push(x.shape().count_from(axis));
                single(x.reshape(Shape::new(dims)).map_err(err())?)
            }
        }
    }

    fn pool(&self, op: &TargetOperator, method: PoolMethod, args: &PoolArgs) -> Result<Vec<Tensor>, RuntimeError> {
        expect_inputs(op, 1..=1)?;
        let x = self.input(op, 0)?;
        let params = Pool2dParams {
            method,
            kernel: args.kernel,
            stride: args.stride,
            pad: args.pad,
            global: args.global,
        };
        let shape = tensor_core::pool2d_output_shape(x.shape(), &params)
            .map_err(RuntimeError::execution(&op.name))?;
        let mut out = Tensor::zeros(shape);
        tensor_core::pool2d(&x.view(), &params, &mut out).map_err(RuntimeError::execution(&op.name))?;
        Ok(vec![out])
    }

    fn activate(&self, op: &TargetOperator, act: Activation) -> Result<Vec<Tensor>, RuntimeError> {
        expect_inputs(op, 1..=1)?;
        let x = self.input(op, 0)?;
        let mut out = Tensor::zeros(x.shape().clone());
        tensor_core::activation(act, &x.view(), &mut out).map_err(RuntimeError::execution(&op.name))?;
        Ok(vec![out])
    }

    fn concat(&self, op: &TargetOperator, axis: usize) -> Result<Vec<Tensor>, RuntimeError> {
        let inputs = self.inputs(op)?;
        if inputs.is_empty() {
            return Err(invalid(op, "needs at least one input".into()));
        }
        let shapes: Vec<&Shape> = inputs.iter().map(|t| t.shape()).collect();
        let shape = tensor_core::concat_output_shape(&shapes, axis)
            .map_err(RuntimeError::execution(&op.name))?;
        let views: Vec<TensorView<'_>> = inputs.iter().map(|t| t.view()).collect();
        let mut out = Tensor::zeros(shape);
        tensor_core::concat(&views, axis, &mut out).map_err(RuntimeError::execution(&op.name))?;
        Ok(vec![out])
    }

    fn reduce(&self, op: &TargetOperator, reduction: EltwiseOp) -> Result<Vec<Tensor>, RuntimeError> {
        let inputs = self.inputs(op)?;
        let first = inputs
            .first()
            .ok_or_else(|| invalid(op, "needs at least one input".into()))?;
        let views: Vec<TensorView<'_>> = inputs.iter().map(|t| t.view()).collect();
        let mut out = Tensor::zeros(first.shape().clone());
        tensor_core::eltwise(reduction, &views, &mut out).map_err(RuntimeError::execution(&op.name))?;
        Ok(vec![out])
    }

    fn inputs(&self, op: &TargetOperator) -> Result<Vec<&Tensor>, RuntimeError> {
        op.inputs.iter().map(|name| self.fetch_blob(name)).collect()
    }
}

fn invalid(op: &TargetOperator, detail: String) -> RuntimeError {
    RuntimeError::InvalidOperator {
        operator: op.name.clone(),
        detail,
    }
}

fn expect_inputs(op: &TargetOperator, range: std::ops::RangeInclusive<usize>) -> Result<(), RuntimeError> {
    if range.contains(&op.inputs.len()) {
        Ok(())
    } else {
        Err(invalid(
            op,
            format!(
                "{} takes {}..={} inputs, got {}",
                op.kind.type_name(),
                range.start(),
                range.end(),
                op.inputs.len()
            ),
        ))
    }
}
