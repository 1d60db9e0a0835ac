// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `caffe-translate translate`: write `predict_net.pb` and `init_net.pb`.

use anyhow::Context;
use caffe_model::CaffeLoader;
use std::path::PathBuf;
use translator::{remove_inference_identities, translate, TranslateOptions};

pub struct Args {
    pub description: PathBuf,
    pub weights: PathBuf,
    pub out_dir: PathBuf,
    pub net_name: Option<String>,
    pub outputs: Vec<String>,
    pub rewrite: bool,
    pub json: bool,
    pub safetensors: bool,
}

pub fn execute(args: Args) -> anyhow::Result<()> {
    let net = CaffeLoader::load(&args.description, &args.weights).with_context(|| {
        format!(
            "failed to load '{}' with '{}'",
            args.description.display(),
            args.weights.display()
        )
    })?;
    println!("  Source: {}", net.summary());

    let options = TranslateOptions {
        net_name: args.net_name,
        external_outputs: args.outputs,
    };
    let translation = translate(&net, &options)?;
    let graph = if args.rewrite {
        remove_inference_identities(&translation.graph)?
    } else {
        translation.graph
    };
    let parameters = translation.parameters;
    println!("  Target: {}", graph.summary());

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("cannot create '{}'", args.out_dir.display()))?;

    let mut written = Vec::new();
    let predict = args.out_dir.join("predict_net.pb");
    std::fs::write(&predict, graph.encode_net_def())?;
    written.push(predict);

    let init = args.out_dir.join("init_net.pb");
    std::fs::write(&init, parameters.encode_tensor_protos())?;
    written.push(init);

    if args.json {
        let path = args.out_dir.join("predict_net.json");
        std::fs::write(&path, graph.to_json()?)?;
        written.push(path);
    }
    if args.safetensors {
        let path = args.out_dir.join("init_net.safetensors");
        runtime::ParameterFile::save(&path, &parameters)?;
        written.push(path);
    }

    println!(
        "  Parameters: {} tensors, {:.2} MB",
        parameters.len(),
        parameters.size_bytes() as f64 / (1024.0 * 1024.0)
    );
    for path in written {
        tracing::info!("wrote {}", path.display());
        println!("  wrote {}", path.display());
    }
    Ok(())
}
