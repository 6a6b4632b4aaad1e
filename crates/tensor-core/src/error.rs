// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor views.

use crate::{DType, Shape};

/// Errors that can occur when viewing or converting tensor data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the expected size for the given shape and dtype.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Typed access requested an element type the tensor does not hold.
    #[error("dtype mismatch: tensor holds {actual}, accessed as {expected}")]
    DTypeMismatch { expected: DType, actual: DType },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// An element index was past the end of the tensor.
    #[error("element index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}
