// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! A graph interpreter that executes a validated single-subgraph model
//! entirely out of one caller-supplied byte buffer.
//!
//! The runtime takes:
//! - A validated `ModelGraph` from `model-ir`.
//! - An [`OpResolver`] mapping operator codes to [`Kernel`]s.
//! - A `&mut [u8]` arena, managed by `memory-manager`.
//!
//! # Phases
//! ```text
//! Init ──► Prepare ──► Invoke ──► Invoke ──► ...
//!  │         │           │
//!  │         │           └─ kernels read inputs, write outputs
//!  │         └─ kernels request scratch, share storage
//!  └─ kernels allocate persistent state
//! ```
//! Kernels only see the interpreter through the context type of the
//! current phase, so a kernel cannot request scratch memory during invoke
//! or touch tensor data during prepare.
//!
//! # Errors
//! Failures are returned as [`RuntimeError`] and also sent to an
//! [`ErrorReporter`], which defaults to `tracing`.

mod config;
pub mod context;
mod engine;
mod error;
mod kernel;
mod metrics;
mod reporter;

pub use config::RuntimeConfig;
pub use context::{
    ContextBridge, InitContext, InvokeContext, NodeBuffers, Phase, PrepareContext, MAX_NODE_BUFFERS,
};
pub use engine::{Interpreter, InterpreterBuilder, NodeAndRegistration};
pub use error::{KernelError, KernelStatus, RuntimeError};
pub use kernel::{Kernel, MutableOpResolver, NodeState, OpResolver, Registration};
pub use metrics::{BenchmarkHook, LayerMetrics, LayerProfiler, NoopHook};
pub use reporter::{CollectingReporter, ErrorReporter, TracingReporter};
