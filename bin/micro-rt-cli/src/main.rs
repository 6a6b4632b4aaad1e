// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # micro-rt
//!
//! Command-line host for the micro-rt interpreter.
//!
//! ## Usage
//! ```bash
//! # Print tensors and operators of a model
//! micro-rt inspect --model ./models/add.json
//!
//! # Run a model ten times with a fixed input and per-layer timings
//! micro-rt run --model ./models/add.json --arena 60K --input 1,2,3,4 --repeat 10 --profile
//!
//! # Take everything from a config file
//! micro-rt --config ./micro-rt.toml run
//! ```

mod commands;
mod kernels;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "micro-rt",
    about = "Graph interpreter running models out of a fixed arena",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (overrides CLI arguments).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a model with the reference kernels.
    Run {
        /// Path to the JSON model manifest.
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Tensor arena size (e.g., "60K", "1M").
        #[arg(short, long, default_value = "60K")]
        arena: String,

        /// Comma-separated f32 values for input 0.
        #[arg(short, long)]
        input: Option<String>,

        /// Number of invokes.
        #[arg(short, long, default_value_t = 1)]
        repeat: usize,

        /// Print per-layer timings.
        #[arg(short, long)]
        profile: bool,
    },

    /// Inspect a model: print tensors, operators and weight sizes.
    Inspect {
        /// Path to the JSON model manifest.
        #[arg(short, long)]
        model: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            model,
            arena,
            input,
            repeat,
            profile,
        } => {
            let config = commands::run::resolve_config(cli.config, model, arena, profile)?;
            commands::run::execute(config, input, repeat)
        }
        Commands::Inspect { model } => commands::inspect::execute(model),
    }
}
