// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # caffe-translate
//!
//! Command-line interface for the Caffe model translator.
//!
//! ## Usage
//! ```bash
//! # Translate a model into predict_net.pb / init_net.pb
//! caffe-translate translate -d deploy.prototxt -w model.caffemodel -o out/
//!
//! # Show source layers and the translated operator list
//! caffe-translate inspect -d deploy.prototxt -w model.caffemodel
//!
//! # Translate, run and compare against reference dumps
//! caffe-translate verify --fixture-dir data/testdata/caffe_translator
//! ```
//!
//! Without a subcommand the binary prints how to opt in and exits cleanly,
//! so it is safe to invoke from automated test sweeps.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "caffe-translate",
    about = "Translate Caffe models into NetDef graphs and verify them",
    version,
    author
)]
struct Cli {
    /// Path to a TOML run configuration (CLI flags override its values).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a description and its trained parameters.
    Translate {
        /// Network description (.prototxt or .json).
        #[arg(short, long)]
        description: PathBuf,

        /// Trained parameters (.caffemodel).
        #[arg(short, long)]
        weights: PathBuf,

        /// Output directory.
        #[arg(short, long, default_value = "translated")]
        out_dir: PathBuf,

        /// Name of the translated net (defaults to the description's name).
        #[arg(long)]
        net_name: Option<String>,

        /// Source tensors to expose as outputs (comma-separated; default:
        /// every tensor no later layer consumes).
        #[arg(long, value_delimiter = ',')]
        outputs: Vec<String>,

        /// Keep inference-identity operators such as Dropout.
        #[arg(long)]
        no_rewrite: bool,

        /// Also write the graph as JSON.
        #[arg(long)]
        json: bool,

        /// Also write parameters as SafeTensors.
        #[arg(long)]
        safetensors: bool,
    },

    /// Print source layers and the translated operator list.
    Inspect {
        /// Network description (.prototxt or .json).
        #[arg(short, long)]
        description: PathBuf,

        /// Trained parameters; without them only source layers are shown.
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Keep inference-identity operators such as Dropout.
        #[arg(long)]
        no_rewrite: bool,
    },

    /// Translate, execute and compare against `{name}_dump.npy` references.
    Verify {
        /// Directory holding deploy.prototxt, the caffemodel and the dumps.
        #[arg(short, long)]
        fixture_dir: Option<PathBuf>,

        /// Override the description path.
        #[arg(short, long)]
        description: Option<PathBuf>,

        /// Override the weights path.
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Source tensors to check (comma-separated).
        #[arg(long, value_delimiter = ',')]
        checked: Vec<String>,

        /// Decimal places of agreement after normalization.
        #[arg(long)]
        decimal: Option<u32>,

        /// Verify the graph without the inference rewrite.
        #[arg(long)]
        no_rewrite: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        commands::print_opt_in_notice();
        return Ok(());
    };

    match command {
        Commands::Translate {
            description,
            weights,
            out_dir,
            net_name,
            outputs,
            no_rewrite,
            json,
            safetensors,
        } => commands::translate::execute(commands::translate::Args {
            description,
            weights,
            out_dir,
            net_name,
            outputs,
            rewrite: !no_rewrite,
            json,
            safetensors,
        }),
        Commands::Inspect {
            description,
            weights,
            no_rewrite,
        } => commands::inspect::execute(description, weights, !no_rewrite),
        Commands::Verify {
            fixture_dir,
            description,
            weights,
            checked,
            decimal,
            no_rewrite,
            json,
        } => {
            let mut config = commands::load_config(cli.config.as_deref(), fixture_dir)?;
            if let Some(d) = description {
                config.description = d;
            }
            if let Some(w) = weights {
                config.weights = w;
            }
            if !checked.is_empty() {
                config.checked = checked;
            }
            if let Some(d) = decimal {
                config.decimal = d;
            }
            if no_rewrite {
                config.apply_rewrite = false;
            }
            config.validate()?;
            commands::verify::execute(config, json)
        }
    }
}
