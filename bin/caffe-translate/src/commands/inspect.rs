// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `caffe-translate inspect`: display source layers and translated operators.

use super::truncate;
use caffe_model::CaffeLoader;
use std::path::PathBuf;
use translator::{remove_inference_identities, translate, TranslateOptions};

pub fn execute(description: PathBuf, weights: Option<PathBuf>, rewrite: bool) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            caffe-translate · Model Inspector         ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let net = match &weights {
        Some(w) => CaffeLoader::load(&description, w)?,
        None => CaffeLoader::load_description(&description)?,
    };

    // ── Source ─────────────────────────────────────────────────
    println!("  {}", net.summary());
    println!();
    println!(
        "  {:<4} {:<20} {:<14} {:<24} {:<24} {:>6}",
        "Idx", "Layer", "Type", "Inputs", "Outputs", "Blobs",
    );
    println!("  {}", "-".repeat(98));
    for (i, layer) in net.layers.iter().enumerate() {
        println!(
            "  {:<4} {:<20} {:<14} {:<24} {:<24} {:>6}",
            i,
            truncate(&layer.name, 20),
            truncate(layer.kind.as_str(), 14),
            truncate(&layer.inputs.join(","), 24),
            truncate(&layer.outputs.join(","), 24),
            layer.blobs.len(),
        );
    }
    println!();

    if weights.is_none() {
        println!("  (pass --weights to see the translated graph)");
        return Ok(());
    }

    // ── Target ─────────────────────────────────────────────────
    let translation = translate(&net, &TranslateOptions::default())?;
    let graph = if rewrite {
        remove_inference_identities(&translation.graph)?
    } else {
        translation.graph
    };

    println!("  {}", graph.summary());
    println!();
    println!(
        "  {:<4} {:<22} {:<12} {:<36} {:<24}",
        "Idx", "Operator", "Type", "Inputs", "Outputs",
    );
    println!("  {}", "-".repeat(98));
    for (i, op) in graph.operators.iter().enumerate() {
        println!(
            "  {:<4} {:<22} {:<12} {:<36} {:<24}",
            i,
            truncate(&op.name, 22),
            op.kind.type_name(),
            truncate(&op.inputs.join(","), 36),
            truncate(&op.outputs.join(","), 24),
        );
    }
    println!();

    let renamed: Vec<_> = graph
        .blob_names
        .iter()
        .filter(|(source, target)| source != target)
        .collect();
    if !renamed.is_empty() {
        println!("  Renamed tensors:");
        for (source, target) in renamed {
            println!("   {source:<20} -> {target}");
        }
        println!();
    }
    println!(
        "  Parameters: {} tensors, {:.2} MB",
        translation.parameters.len(),
        translation.parameters.size_bytes() as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}
