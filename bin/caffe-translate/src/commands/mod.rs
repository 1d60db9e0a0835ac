// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

pub mod inspect;
pub mod translate;
pub mod verify;

use runtime::RunConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber. `RUST_LOG` wins over `-v` counts.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn print_opt_in_notice() {
    println!("caffe-translate: no command given, nothing to do.");
    println!();
    println!("  Translation and verification are opt-in. Run one of:");
    println!("    caffe-translate translate -d deploy.prototxt -w model.caffemodel");
    println!("    caffe-translate inspect   -d deploy.prototxt");
    println!(
        "    caffe-translate verify    --fixture-dir {}",
        runtime::DEFAULT_FIXTURE_DIR
    );
    println!();
    println!("  See `caffe-translate --help` for all options.");
}

/// Builds the run configuration: the TOML file if given, otherwise the
/// defaults for `fixture_dir` (or the default fixture directory).
pub fn load_config(path: Option<&Path>, fixture_dir: Option<PathBuf>) -> anyhow::Result<RunConfig> {
    let config = match (path, fixture_dir) {
        (Some(path), dir) => {
            let mut config = RunConfig::from_file(path)?;
            if let Some(dir) = dir {
                config.fixture_dir = dir;
            }
            config
        }
        (None, Some(dir)) => RunConfig::for_fixture_dir(&dir),
        (None, None) => RunConfig::default(),
    };
    Ok(config)
}

/// Truncates a string to `max_len` with ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
