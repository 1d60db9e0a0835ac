// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named-tensor sources the verifier reads from.

use crate::{npy, VerifyError};
use runtime::{Pipeline, Ready, Workspace};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tensor_core::Tensor;

/// Anything that can produce a tensor by source name.
pub trait TensorSource {
    /// Short label used in reports (`"computed"`, a directory path, ...).
    fn label(&self) -> String;

    /// Returns the tensor for `name`.
    ///
    /// # Errors
    /// Any error here is reported as a `Missing` entry for that name; it
    /// does not abort verification.
    fn fetch(&self, name: &str) -> Result<Cow<'_, Tensor>, VerifyError>;
}

/// Raw workspace lookup; names are not translated.
impl TensorSource for Workspace {
    fn label(&self) -> String {
        "workspace".into()
    }

    fn fetch(&self, name: &str) -> Result<Cow<'_, Tensor>, VerifyError> {
        Ok(Cow::Borrowed(self.fetch_blob(name)?))
    }
}

/// Source names resolve through the graph's blob mapping.
impl TensorSource for Pipeline<Ready> {
    fn label(&self) -> String {
        format!("computed ({})", self.graph().name)
    }

    fn fetch(&self, name: &str) -> Result<Cow<'_, Tensor>, VerifyError> {
        Ok(Cow::Borrowed(Pipeline::<Ready>::fetch(self, name)?))
    }
}

impl TensorSource for BTreeMap<String, Tensor> {
    fn label(&self) -> String {
        "in-memory".into()
    }

    fn fetch(&self, name: &str) -> Result<Cow<'_, Tensor>, VerifyError> {
        self.get(name)
            .map(Cow::Borrowed)
            .ok_or_else(|| VerifyError::Unavailable {
                name: name.to_string(),
                detail: "not in map".into(),
            })
    }
}

/// A directory of `{name}_dump.npy` reference arrays.
#[derive(Debug, Clone)]
pub struct FixtureDir {
    dir: PathBuf,
}

impl FixtureDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}_dump.npy"))
    }
}

impl TensorSource for FixtureDir {
    fn label(&self) -> String {
        self.dir.display().to_string()
    }

    fn fetch(&self, name: &str) -> Result<Cow<'_, Tensor>, VerifyError> {
        npy::read_npy(&self.path_of(name)).map(Cow::Owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    #[test]
    fn test_fixture_dir_paths_and_fetch() {
        let dir = std::env::temp_dir().join("caffe_translate_fixture_dir");
        std::fs::create_dir_all(&dir).unwrap();
        let fixtures = FixtureDir::new(&dir);
        assert!(fixtures.exists());
        assert_eq!(fixtures.path_of("fc8"), dir.join("fc8_dump.npy"));

        let t = Tensor::from_vec(Shape::vector(2), vec![1.0, 2.0]).unwrap();
        npy::write_npy(&fixtures.path_of("fc8"), &t).unwrap();
        assert_eq!(fixtures.fetch("fc8").unwrap().into_owned(), t);
        assert!(fixtures.fetch("fc9").is_err());
    }

    #[test]
    fn test_workspace_source() {
        let mut ws = Workspace::new();
        ws.feed_blob("a", Tensor::zeros(Shape::vector(1)));
        assert!(ws.fetch("a").is_ok());
        assert!(matches!(
            TensorSource::fetch(&ws, "b"),
            Err(VerifyError::Runtime(runtime::RuntimeError::MissingBlob(_)))
        ));
    }
}
