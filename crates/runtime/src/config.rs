// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! description = "data/testdata/caffe_translator/deploy.prototxt"
//! weights = "data/testdata/caffe_translator/bvlc_reference_caffenet.caffemodel"
//! fixture_dir = "data/testdata/caffe_translator"
//! input_name = "data"
//! checked = ["conv1", "pool1", "prob"]
//! decimal = 5
//! apply_rewrite = true
//! ```

use std::path::{Path, PathBuf};

/// Default location of the CaffeNet reference fixtures.
pub const DEFAULT_FIXTURE_DIR: &str = "data/testdata/caffe_translator";

/// Tensors checked against the CaffeNet reference dumps, in network order.
pub const CAFFENET_CHECKED: [&str; 14] = [
    "conv1", "pool1", "norm1", "conv2", "pool2", "norm2", "conv3", "conv4", "conv5", "pool5", "fc6",
    "fc7", "fc8", "prob",
];

/// Configuration for a translate-run-verify cycle.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunConfig {
    /// Network description (`.prototxt`, or `.json`).
    pub description: PathBuf,
    /// Trained parameters (`.caffemodel`).
    pub weights: PathBuf,
    /// Directory holding `{name}_dump.npy` reference arrays.
    pub fixture_dir: PathBuf,
    /// Name of the data input fed before running.
    #[serde(default = "default_input_name")]
    pub input_name: String,
    /// Source tensor names to verify. Empty means every graph output.
    #[serde(default)]
    pub checked: Vec<String>,
    /// Decimal places of agreement required after scaling.
    #[serde(default = "default_decimal")]
    pub decimal: u32,
    /// Whether to drop inference-identity operators before running.
    #[serde(default = "default_true")]
    pub apply_rewrite: bool,
    /// Optional SafeTensors file that replaces the translated parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<PathBuf>,
    /// Whether to record per-operator timings.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
}

fn default_input_name() -> String {
    "data".to_string()
}

fn default_decimal() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl RunConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, super::RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            super::RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, super::RuntimeError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| super::RuntimeError::ConfigError(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, super::RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| super::RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Builds a configuration for the conventional file names inside a
    /// fixture directory.
    pub fn for_fixture_dir(dir: &Path) -> Self {
        Self {
            description: dir.join("deploy.prototxt"),
            weights: dir.join("bvlc_reference_caffenet.caffemodel"),
            fixture_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), super::RuntimeError> {
        if self.input_name.is_empty() {
            return Err(super::RuntimeError::ConfigError("input_name must not be empty".into()));
        }
        if self.decimal > 12 {
            return Err(super::RuntimeError::ConfigError(format!(
                "decimal {} is beyond f32 precision",
                self.decimal
            )));
        }
        Ok(())
    }

    /// Path of the reference dump for `name`.
    pub fn fixture_path(&self, name: &str) -> PathBuf {
        self.fixture_dir.join(format!("{name}_dump.npy"))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        let dir = Path::new(DEFAULT_FIXTURE_DIR);
        Self {
            description: dir.join("deploy.prototxt"),
            weights: dir.join("bvlc_reference_caffenet.caffemodel"),
            fixture_dir: dir.to_path_buf(),
            input_name: default_input_name(),
            checked: CAFFENET_CHECKED.iter().map(|s| s.to_string()).collect(),
            decimal: default_decimal(),
            apply_rewrite: true,
            parameters: None,
            enable_profiling: true,
        }
    }
}
