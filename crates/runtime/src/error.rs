// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the interpreter and the kernels it drives.

use memory_manager::ArenaError;
use std::fmt;
use tensor_core::TensorError;

/// Non-ok kernel outcomes that are not plain failures.
///
/// The interpreter stops at a node returning one of these but hands the
/// status back untouched, so the caller decides what it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelStatus {
    DelegateError,
    ApplicationError,
    DelegateDataNotFound,
    DelegateDataWriteError,
    DelegateDataReadError,
    Cancelled,
}

impl KernelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DelegateError => "delegate error",
            Self::ApplicationError => "application error",
            Self::DelegateDataNotFound => "delegate data not found",
            Self::DelegateDataWriteError => "delegate data write error",
            Self::DelegateDataReadError => "delegate data read error",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for KernelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors a kernel returns from `init`, `prepare` or `invoke`.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// Hard failure; the interpreter reports the failing node.
    #[error("{0}")]
    Failed(String),

    /// A status passed through to the caller unchanged.
    #[error("kernel status: {0}")]
    Status(KernelStatus),

    /// An arena request failed.
    #[error("arena: {0}")]
    Arena(#[from] ArenaError),

    /// A tensor view was misused.
    #[error("tensor: {0}")]
    Tensor(#[from] TensorError),

    /// A node-relative tensor index does not exist.
    #[error("node has no {kind} {index} (it has {len})")]
    MissingTensor {
        kind: &'static str,
        index: usize,
        len: usize,
    },
}

impl KernelError {
    /// Shorthand for [`KernelError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Errors returned by the interpreter.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The model was serialized with an unsupported schema version.
    #[error("model schema version {found} is not equal to supported version {supported}")]
    SchemaVersionMismatch { found: u32, supported: u32 },

    /// Only single-subgraph models can be executed.
    #[error("only 1 subgraph is supported, model has {0}")]
    MultiSubgraphUnsupported(usize),

    /// No kernel is registered for an operator.
    #[error("didn't find op for builtin opcode '{op}' (node {node})")]
    OperatorResolutionFailure { node: usize, op: String },

    /// The arena could not satisfy a request.
    #[error("arena allocation failed: {0}")]
    AllocationFailure(#[from] ArenaError),

    /// A kernel's `init` failed.
    #[error("node {op} (number {node}) failed to initialize: {source}")]
    NodeInitFailure {
        node: usize,
        op: String,
        #[source]
        source: KernelError,
    },

    /// A kernel's `prepare` failed.
    #[error("node {op} (number {node}) failed to prepare: {source}")]
    NodePrepareFailure {
        node: usize,
        op: String,
        #[source]
        source: KernelError,
    },

    /// A kernel's `invoke` failed.
    #[error("node {op} (number {node}) failed to invoke: {source}")]
    NodeInvokeFailure {
        node: usize,
        op: String,
        #[source]
        source: KernelError,
    },

    /// A kernel returned a non-failure, non-ok status.
    #[error("node returned status: {0}")]
    KernelStatus(KernelStatus),

    /// An accessor index is past the end of its list.
    #[error("{kind} index {index} out of range (length is {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// An arena tensor was accessed before `allocate_tensors` succeeded.
    #[error("tensor {0} has no data until tensors are allocated")]
    TensorNotAllocated(usize),

    /// Mutable access to a weight tensor.
    #[error("tensor {0} is a read-only weight")]
    ReadOnlyTensor(usize),

    /// The interpreter failed to initialize; see `initialization_status`.
    #[error("invoke called on model that is not consistent")]
    InvokeAfterFailedInit,

    /// A variable tensor could not be reset.
    #[error("failed to reset variable tensor {index}: {detail}")]
    VariableResetFailure { index: usize, detail: String },

    /// A tensor view could not be built.
    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),

    /// Model loading failed.
    #[error("model error: {0}")]
    Model(#[from] model_ir::ModelError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
