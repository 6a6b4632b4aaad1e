// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `micro-rt run` command: execute a model with the reference kernels.
//!
//! ```text
//! load manifest → Interpreter::try_new → allocate_tensors → write input → invoke × N
//! ```

use crate::kernels::reference_resolver;
use anyhow::Context;
use model_ir::ModelLoader;
use runtime::{Interpreter, LayerProfiler, RuntimeConfig};
use std::path::PathBuf;
use std::time::Instant;
use tensor_core::{DType, TensorRef};

/// Builds the run configuration. A config file, when given, takes
/// precedence over the command-line arguments.
pub fn resolve_config(
    config: Option<PathBuf>,
    model: Option<PathBuf>,
    arena: String,
    profile: bool,
) -> anyhow::Result<RuntimeConfig> {
    if let Some(path) = config {
        let config = RuntimeConfig::from_file(&path)?;
        tracing::info!("using config {}", path.display());
        return Ok(config);
    }
    let model_path = model.context("either --model or --config is required")?;
    Ok(RuntimeConfig {
        model_path,
        arena_size: arena,
        profile_layers: profile,
        report_layers: false,
    })
}

pub fn execute(config: RuntimeConfig, input: Option<String>, repeat: usize) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║               micro-rt · Model Runner                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Configuration ──────────────────────────────────────────
    let arena_size = config.parse_arena_size()?;
    println!("  Config:");
    println!("   Model:    {}", config.model_path.display());
    println!("   Arena:    {arena_size}");
    println!("   Repeat:   {repeat}");
    println!();

    let graph = ModelLoader::load(&config.model_path).with_context(|| {
        format!("failed to load model from '{}'", config.model_path.display())
    })?;
    let resolver = reference_resolver();
    let mut arena = config.allocate_arena()?;

    // ── Allocation ─────────────────────────────────────────────
    let mut interpreter = Interpreter::try_new(&graph, &resolver, &mut arena)?;
    interpreter.allocate_tensors()?;
    println!("  {}", interpreter.arena_stats().summary());
    println!();

    if let Some(values) = input {
        let values = parse_values(&values)?;
        let mut tensor = interpreter.input_mut(0)?;
        anyhow::ensure!(
            tensor.dtype() == DType::F32,
            "input 0 is {}, only f32 input is supported",
            tensor.dtype().as_str()
        );
        anyhow::ensure!(
            values.len() == tensor.num_elements(),
            "input 0 takes {} values, got {}",
            tensor.num_elements(),
            values.len()
        );
        tensor.copy_from_slice(&values)?;
    }

    // ── Invoke ─────────────────────────────────────────────────
    let mut profiler = LayerProfiler::with_capacity(interpreter.node_count())
        .report_layers(config.report_layers);
    let start = Instant::now();
    for _ in 0..repeat {
        if config.profiling_enabled() {
            interpreter.invoke_with(&mut profiler)?;
        } else {
            interpreter.invoke()?;
        }
    }
    let elapsed = start.elapsed();

    // ── Results ────────────────────────────────────────────────
    println!("  Outputs:");
    for i in 0..interpreter.outputs_size() {
        let tensor = interpreter.output(i)?;
        println!("   [{i}] {} = {}", tensor.shape(), format_values(tensor)?);
    }
    println!();
    println!(
        "  {repeat} invokes in {:.3} ms ({:.1} us/invoke)",
        elapsed.as_secs_f64() * 1e3,
        elapsed.as_secs_f64() * 1e6 / repeat.max(1) as f64,
    );

    if config.profiling_enabled() {
        println!();
        print_profile(&interpreter, &profiler);
    }
    Ok(())
}

fn parse_values(s: &str) -> anyhow::Result<Vec<f32>> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .with_context(|| format!("invalid input value '{}'", v.trim()))
        })
        .collect()
}

fn format_values(tensor: TensorRef<'_>) -> anyhow::Result<String> {
    let cells: Vec<String> = match tensor.dtype() {
        DType::F32 => tensor.values::<f32>()?.map(|v| format!("{v}")).collect(),
        DType::I32 => tensor.values::<i32>()?.map(|v| v.to_string()).collect(),
        DType::I16 => tensor.values::<i16>()?.map(|v| v.to_string()).collect(),
        DType::I8 => tensor.values::<i8>()?.map(|v| v.to_string()).collect(),
        DType::U8 => tensor.values::<u8>()?.map(|v| v.to_string()).collect(),
        other => return Ok(format!("<{} bytes of {}>", tensor.as_bytes().len(), other.as_str())),
    };
    Ok(format!("[{}]", cells.join(", ")))
}

fn print_profile(interpreter: &Interpreter<'_, '_>, profiler: &LayerProfiler) {
    println!("  {:<6} {:<24} {:>8} {:>12} {:>12}", "Node", "Layer", "Calls", "Mean (us)", "Max (us)");
    println!("  {}", "-".repeat(66));
    for layer in profiler.layers() {
        let op = interpreter.operator_name(layer.node).unwrap_or("?");
        println!(
            "  {:<6} {:<24} {:>8} {:>12.1} {:>12.1}",
            layer.node,
            super::truncate(op, 24),
            layer.calls,
            layer.mean().as_secs_f64() * 1e6,
            layer.max.as_secs_f64() * 1e6,
        );
    }
    println!();
    println!("  {}", profiler.summary());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_values("1, 2.5,-3").unwrap(), vec![1.0, 2.5, -3.0]);
        assert!(parse_values("1,x").is_err());
    }

    #[test]
    fn test_resolve_config_requires_model() {
        assert!(resolve_config(None, None, "60K".into(), false).is_err());
        let c = resolve_config(None, Some("m.json".into()), "1K".into(), true).unwrap();
        assert_eq!(c.arena_size, "1K");
        assert!(c.profiling_enabled());
    }

    #[test]
    fn test_format_values() {
        let shape = tensor_core::Shape::vector(2);
        let bytes: Vec<u8> = [1i32, -2].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let t = TensorRef::new(DType::I32, &shape, &bytes).unwrap();
        assert_eq!(format_values(t).unwrap(), "[1, -2]");
    }
}
