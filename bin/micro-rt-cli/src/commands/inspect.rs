// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `micro-rt inspect` command: display model structure.
//!
//! Loads the JSON manifest and prints tensors, operators and weight sizes.

use super::truncate;
use model_ir::ModelLoader;
use std::path::PathBuf;

pub fn execute(model: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              micro-rt · Model Inspector              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let graph = ModelLoader::load(&model).map_err(|e| {
        anyhow::anyhow!("failed to load model from '{}': {e}", model.display())
    })?;

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", graph.summary());
    if !graph.description.is_empty() {
        println!("  Description: {}", graph.description);
    }
    println!(
        "  Total weights: {:.2} KB",
        graph.total_weight_bytes() as f64 / 1024.0,
    );
    println!();

    for (s, sg) in graph.subgraphs.iter().enumerate() {
        // ── Tensors ────────────────────────────────────────────
        println!("  Subgraph {s} '{}': inputs {:?}, outputs {:?}", sg.name, sg.inputs, sg.outputs);
        println!();
        println!(
            "  {:<4} {:<24} {:<6} {:<16} {:>10} {:<9}",
            "Idx", "Name", "DType", "Shape", "Bytes", "Kind",
        );
        println!("  {}", "-".repeat(74));

        let mut activation_bytes = 0;
        for (t, tensor) in sg.tensors.iter().enumerate() {
            let kind = if graph.weight_data(tensor).is_some() {
                "weight"
            } else if tensor.is_variable {
                "variable"
            } else {
                activation_bytes += tensor.size_bytes();
                "activation"
            };
            println!(
                "  {:<4} {:<24} {:<6} {:<16} {:>10} {:<9}",
                t,
                truncate(&tensor.display_name(t), 24),
                tensor.dtype.as_str(),
                truncate(&tensor.shape.to_string(), 16),
                tensor.size_bytes(),
                kind,
            );
        }
        println!();

        // ── Operators ──────────────────────────────────────────
        println!("  {:<4} {:<24} {:<20} {:<20}", "Node", "Operator", "Inputs", "Outputs");
        println!("  {}", "-".repeat(70));
        for (n, op) in sg.operators.iter().enumerate() {
            println!(
                "  {:<4} {:<24} {:<20} {:<20}",
                n,
                truncate(graph.opcode_of(op).name(), 24),
                truncate(&format!("{:?}", op.inputs), 20),
                truncate(&format!("{:?}", op.outputs), 20),
            );
        }
        println!();
        println!(
            "  Activations without reuse: {:.2} KB (the arena plan packs these by lifetime)",
            activation_bytes as f64 / 1024.0,
        );
        println!();
    }
    Ok(())
}
