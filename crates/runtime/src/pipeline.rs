// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Load → translate → prepare → run, with type-state–enforced ordering.
//!
//! ```text
//! Pipeline<Loaded>
//!     │  .translate()
//!     ▼
//! Pipeline<Translated>
//!     │  .prepare()
//!     ▼
//! Pipeline<Ready>
//!     │  .run(input)
//!     ▼
//!   RunMetrics (intermediates stay in the workspace)
//! ```
//!
//! Each transition consumes the old value and returns a new one, so calling
//! `.run()` before parameters are fed is a compile error.

use crate::{ParameterFile, RunConfig, RunMetrics, RuntimeError, Workspace};
use caffe_model::{CaffeLoader, SourceNet};
use tensor_core::Tensor;
use translator::{remove_inference_identities, translate, TargetGraph, TargetParameterSet, TranslateOptions};

// ── Type-state markers ─────────────────────────────────────────

/// The source network is loaded.
#[derive(Debug)]
pub struct Loaded {
    net: SourceNet,
}

/// The network is translated (and rewritten, if configured).
#[derive(Debug)]
pub struct Translated {
    graph: TargetGraph,
    parameters: TargetParameterSet,
}

/// Parameters are fed; the graph can run.
#[derive(Debug)]
pub struct Ready {
    graph: TargetGraph,
    workspace: Workspace,
}

/// Sealed trait for pipeline states.
pub trait PipelineState: std::fmt::Debug {}
impl PipelineState for Loaded {}
impl PipelineState for Translated {}
impl PipelineState for Ready {}

/// A translate-and-run pipeline for one source network.
///
/// # Example
/// ```no_run
/// use runtime::{Pipeline, RunConfig};
/// use tensor_core::{Shape, Tensor};
///
/// # fn example() -> Result<(), runtime::RuntimeError> {
/// let mut ready = Pipeline::load(RunConfig::default())?
///     .translate()?
///     .prepare()?;
/// let metrics = ready.run(Tensor::zeros(Shape::nchw(10, 3, 227, 227)))?;
/// println!("{}", metrics.summary());
/// let prob = ready.fetch("prob")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Pipeline<S: PipelineState = Loaded> {
    config: RunConfig,
    state: S,
}

impl<S: PipelineState> Pipeline<S> {
    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}

// ── Loaded → Translated ────────────────────────────────────────

impl Pipeline<Loaded> {
    /// Loads the description and weights named by `config`.
    pub fn load(config: RunConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let net = CaffeLoader::load(&config.description, &config.weights)?;
        tracing::info!("{}", net.summary());
        Ok(Self::from_source(config, net))
    }

    /// Starts from an already-built source network.
    pub fn from_source(config: RunConfig, net: SourceNet) -> Self {
        Self {
            config,
            state: Loaded { net },
        }
    }

    pub fn net(&self) -> &SourceNet {
        &self.state.net
    }

    /// Translates the network and, when `apply_rewrite` is set, removes
    /// inference-identity operators.
    pub fn translate(self) -> Result<Pipeline<Translated>, RuntimeError> {
        let translation = translate(&self.state.net, &TranslateOptions::default())?;
        let graph = if self.config.apply_rewrite {
            remove_inference_identities(&translation.graph)?
        } else {
            translation.graph
        };
        Ok(Pipeline {
            config: self.config,
            state: Translated {
                graph,
                parameters: translation.parameters,
            },
        })
    }
}

// ── Translated → Ready ─────────────────────────────────────────

impl Pipeline<Translated> {
    pub fn graph(&self) -> &TargetGraph {
        &self.state.graph
    }

    pub fn parameters(&self) -> &TargetParameterSet {
        &self.state.parameters
    }

    /// Feeds parameters into a fresh workspace.
    ///
    /// When `config.parameters` names a SafeTensors file, its tensors are
    /// fed instead of the freshly translated ones.
    pub fn prepare(self) -> Result<Pipeline<Ready>, RuntimeError> {
        let mut workspace = Workspace::new();
        match &self.config.parameters {
            Some(path) => {
                let parameters = ParameterFile::open(path)?.load()?;
                workspace.feed_parameters(&parameters);
            }
            None => workspace.feed_parameters(&self.state.parameters),
        }
        tracing::info!(
            "workspace prepared: {} tensors, {:.2} MB",
            workspace.blob_names().len(),
            workspace.size_bytes() as f64 / (1024.0 * 1024.0)
        );
        Ok(Pipeline {
            config: self.config,
            state: Ready {
                graph: self.state.graph,
                workspace,
            },
        })
    }
}

// ── Ready: run ─────────────────────────────────────────────────

impl Pipeline<Ready> {
    pub fn graph(&self) -> &TargetGraph {
        &self.state.graph
    }

    pub fn workspace(&self) -> &Workspace {
        &self.state.workspace
    }

    /// Feeds `input` under the configured input name and runs the graph once.
    pub fn run(&mut self, input: Tensor) -> Result<RunMetrics, RuntimeError> {
        let input_name = &self.config.input_name;
        if !self.state.graph.external_inputs.iter().any(|n| n == input_name) {
            return Err(RuntimeError::ConfigError(format!(
                "graph '{}' has no input named '{input_name}' (inputs: {:?})",
                self.state.graph.name, self.state.graph.external_inputs
            )));
        }
        self.state.workspace.feed_blob(input_name.as_str(), input);
        let metrics = self.state.workspace.run_net_once(&self.state.graph)?;

        if self.config.enable_profiling {
            for op in metrics.slowest(3) {
                tracing::debug!(
                    "slow: {} ({}) {:.3}ms",
                    op.operator,
                    op.op_type,
                    op.duration.as_secs_f64() * 1000.0
                );
            }
        }
        Ok(metrics)
    }

    /// Fetches the final value of a source tensor name.
    pub fn fetch(&self, source: &str) -> Result<&Tensor, RuntimeError> {
        self.state
            .workspace
            .fetch_blob(self.state.graph.resolve_blob(source))
    }

    /// Consumes the pipeline, returning the graph and workspace.
    pub fn into_parts(self) -> (TargetGraph, Workspace) {
        (self.state.graph, self.state.workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caffe_model::{InputDecl, LayerConfig, LayerKind, SourceLayer};
    use tensor_core::Shape;

    fn layer(name: &str, kind: LayerKind, config: LayerConfig, blob: &str) -> SourceLayer {
        SourceLayer {
            name: name.into(),
            kind,
            inputs: vec![blob.into()],
            outputs: vec![blob.into()],
            config,
            blobs: vec![],
        }
    }

    fn relu_dropout_net() -> SourceNet {
        SourceNet {
            name: "tiny".into(),
            inputs: vec![InputDecl {
                name: "data".into(),
                shape: None,
            }],
            layers: vec![
                layer("relu", LayerKind::Relu, LayerConfig::Relu { negative_slope: 0.0 }, "data"),
                layer("drop", LayerKind::Dropout, LayerConfig::Dropout { ratio: 0.5 }, "data"),
            ],
        }
    }

    #[test]
    fn test_pipeline_runs_and_resolves_source_names() {
        let mut ready = Pipeline::from_source(RunConfig::default(), relu_dropout_net())
            .translate()
            .unwrap()
            .prepare()
            .unwrap();
        assert!(ready.graph().operators.iter().all(|op| op.kind.type_name() != "Dropout"));

        let input = Tensor::from_f32(Shape::vector(3), &[-1.0, 0.5, 2.0]).unwrap();
        let metrics = ready.run(input).unwrap();
        assert_eq!(metrics.operator_metrics.len(), 1);
        assert_eq!(ready.fetch("data").unwrap().as_f32_slice(), &[0.0, 0.5, 2.0]);
    }

    #[test]
    fn test_without_rewrite_keeps_dropout() {
        let config = RunConfig {
            apply_rewrite: false,
            ..Default::default()
        };
        let translated = Pipeline::from_source(config, relu_dropout_net()).translate().unwrap();
        assert_eq!(translated.graph().num_operators(), 2);
    }

    #[test]
    fn test_unknown_input_name() {
        let config = RunConfig {
            input_name: "image".into(),
            ..Default::default()
        };
        let mut ready = Pipeline::from_source(config, relu_dropout_net())
            .translate()
            .unwrap()
            .prepare()
            .unwrap();
        let err = ready.run(Tensor::zeros(Shape::vector(1))).unwrap_err();
        assert!(matches!(err, RuntimeError::ConfigError(_)));
    }
}
