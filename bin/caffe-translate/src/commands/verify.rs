// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `caffe-translate verify`: translate, run once, and compare every checked
//! tensor against its reference dump.

use runtime::RunConfig;
use verifier::{verify_fixtures, FixtureOutcome, VerifyError};

pub fn execute(config: RunConfig, json: bool) -> anyhow::Result<()> {
    println!("  Fixtures:    {}", config.fixture_dir.display());
    println!("  Description: {}", config.description.display());
    println!("  Weights:     {}", config.weights.display());
    println!(
        "  Checking {} tensors to {} decimals{}",
        config.checked.len(),
        config.decimal,
        if config.apply_rewrite { "" } else { " (no rewrite)" }
    );
    println!();

    match verify_fixtures(&config) {
        Ok(FixtureOutcome::Skipped { dir }) => {
            println!("  Fixture directory '{}' not found; skipping.", dir.display());
            Ok(())
        }
        Ok(FixtureOutcome::Verified(report)) => {
            if json {
                println!("{}", report.to_json()?);
            } else {
                println!("  {}", report.summary());
            }
            Ok(())
        }
        Err(VerifyError::Failed(report)) => {
            if json {
                println!("{}", report.to_json()?);
            }
            anyhow::bail!("{}", report.summary())
        }
        Err(e) => {
            tracing::error!("verification aborted: {e}");
            Err(e.into())
        }
    }
}
