// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Exported parameter files in SafeTensors format.
//!
//! [`ParameterFile`] memory-maps a `.safetensors` file once and decodes it
//! into a [`TargetParameterSet`] on demand, so a translated graph can run
//! against parameters exported by an earlier `translate` invocation.

use crate::RuntimeError;
use std::path::{Path, PathBuf};
use translator::TargetParameterSet;

/// A memory-mapped SafeTensors parameter file.
pub struct ParameterFile {
    path: PathBuf,
    mmap: memmap2::Mmap,
}

impl ParameterFile {
    /// Opens and memory-maps `path`.
    pub fn open(path: &Path) -> Result<Self, RuntimeError> {
        let file = std::fs::File::open(path).map_err(|e| load_error(path, format!("cannot open: {e}")))?;
        // SAFETY: the mapping is read-only and the file is not modified
        // while the mapping is alive.
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| load_error(path, format!("mmap failed: {e}")))?;
        tracing::info!(
            "parameter file: mmap'd {} ({:.2} MB)",
            path.display(),
            mmap.len() as f64 / (1024.0 * 1024.0),
        );
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the mapped file in bytes.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Decodes every tensor in the file.
    pub fn load(&self) -> Result<TargetParameterSet, RuntimeError> {
        let set = TargetParameterSet::from_safetensors(&self.mmap)
            .map_err(|e| load_error(&self.path, e.to_string()))?;
        tracing::debug!("{}: {} tensors", self.path.display(), set.len());
        Ok(set)
    }

    /// Writes `parameters` to `path` in SafeTensors format.
    pub fn save(path: &Path, parameters: &TargetParameterSet) -> Result<(), RuntimeError> {
        let bytes = parameters
            .to_safetensors()
            .map_err(|e| load_error(path, e.to_string()))?;
        std::fs::write(path, bytes).map_err(|e| load_error(path, format!("cannot write: {e}")))
    }
}

impl std::fmt::Debug for ParameterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterFile")
            .field("path", &self.path)
            .field("len", &self.mmap.len())
            .finish()
    }
}

fn load_error(path: &Path, detail: String) -> RuntimeError {
    RuntimeError::ParameterLoad {
        path: path.display().to_string(),
        detail,
    }
}
