// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! End-to-end check of a translated network against stored reference dumps.

use crate::{npy, FixtureDir, TensorSource, VerificationReport, Verifier, VerifyError};
use runtime::{Pipeline, RunConfig};
use std::path::{Path, PathBuf};
use translator::TargetGraph;

/// Name of the input dump inside a fixture directory.
pub const INPUT_FIXTURE: &str = "data";

#[derive(Debug)]
pub enum FixtureOutcome {
    /// The fixture directory does not exist; nothing was translated.
    Skipped { dir: PathBuf },
    Verified(VerificationReport),
}

/// Loads, translates, runs and verifies the network named by `config`.
///
/// Returns [`FixtureOutcome::Skipped`] when `config.fixture_dir` is absent.
///
/// # Errors
/// Any load, translation or execution error, and [`VerifyError::Failed`]
/// when at least one checked tensor disagrees.
pub fn verify_fixtures(config: &RunConfig) -> Result<FixtureOutcome, VerifyError> {
    let fixtures = FixtureDir::new(&config.fixture_dir);
    if !fixtures.exists() {
        tracing::info!(
            "fixture directory '{}' not found, skipping verification",
            fixtures.dir().display()
        );
        return Ok(FixtureOutcome::Skipped {
            dir: config.fixture_dir.clone(),
        });
    }

    let input = npy::read_npy(&config.fixture_path(INPUT_FIXTURE))?;
    tracing::info!("input '{}': {}", config.input_name, input.shape());

    let mut ready = Pipeline::load(config.clone())?.translate()?.prepare()?;
    ready.run(input)?;

    let names = if config.checked.is_empty() {
        output_source_names(ready.graph())
    } else {
        config.checked.clone()
    };
    let report = Verifier::new(config.decimal).verify(&names, &ready, &fixtures);
    report.into_result().map(FixtureOutcome::Verified)
}

/// Source names whose final values are graph outputs, in output order.
///
/// Outputs without a recorded source name are returned as-is.
pub fn output_source_names(graph: &TargetGraph) -> Vec<String> {
    graph
        .external_outputs
        .iter()
        .map(|target| {
            graph
                .blob_names
                .iter()
                .find(|(_, t)| *t == target)
                .map(|(source, _)| source.clone())
                .unwrap_or_else(|| target.clone())
        })
        .collect()
}

/// Writes each named tensor of `source` to `{dir}/{name}_dump.npy`.
///
/// Returns the number of files written.
pub fn dump_tensors<S>(source: &S, names: &[impl AsRef<str>], dir: &Path) -> Result<usize, VerifyError>
where
    S: TensorSource + ?Sized,
{
    std::fs::create_dir_all(dir).map_err(|e| VerifyError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;
    let out = FixtureDir::new(dir);
    for name in names {
        let name = name.as_ref();
        let tensor = source.fetch(name)?;
        npy::write_npy(&out.path_of(name), &tensor)?;
        tracing::debug!("dumped {name} {}", tensor.shape());
    }
    Ok(names.len())
}
