// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model loading and graph validation.

/// Errors that can occur when building or validating a model graph.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model file could not be read.
    #[error("failed to read model: {0}")]
    ReadError(#[from] std::io::Error),

    /// The model JSON is malformed.
    #[error("failed to parse model: {0}")]
    ParseError(#[from] serde_json::Error),

    /// An operator code names no known builtin operator.
    #[error("unknown builtin operator '{0}'")]
    UnknownOperator(String),

    /// A tensor descriptor is inconsistent with the rest of the graph.
    #[error("invalid tensor {index} in subgraph {subgraph}: {detail}")]
    InvalidTensor {
        subgraph: usize,
        index: usize,
        detail: String,
    },

    /// An operator record refers to something that does not exist.
    #[error("invalid operator {index} in subgraph {subgraph}: {detail}")]
    InvalidOperator {
        subgraph: usize,
        index: usize,
        detail: String,
    },

    /// The graph is malformed as a whole.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),
}
