// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model descriptor.
//!
//! The manifest is a human-writable stand-in for a serialized model, used by
//! the CLI and by tests:
//!
//! ```json
//! {
//!   "version": 3,
//!   "description": "add constant",
//!   "operator_codes": ["ADD", { "custom": "MY_OP" }],
//!   "buffers": [{ "f32": [1.0, 1.0, 1.0, 1.0] }],
//!   "subgraphs": [{
//!     "tensors": [
//!       { "name": "x",   "dtype": "f32", "shape": [4] },
//!       { "name": "one", "dtype": "f32", "shape": [4], "buffer": 0 },
//!       { "name": "y",   "dtype": "f32", "shape": [4] }
//!     ],
//!     "operators": [{ "opcode": 0, "inputs": [0, 1], "outputs": [2] }],
//!     "inputs": [0],
//!     "outputs": [2]
//!   }]
//! }
//! ```
//!
//! `buffer` indexes the manifest's own `buffers` list; tensors without one
//! are activations. Typed buffer lists are encoded little-endian.

use crate::graph::SCHEMA_VERSION;
use crate::ModelError;
use std::path::Path;
use tensor_core::{DType, Shape};

/// Top-level manifest structure.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub description: String,
    pub operator_codes: Vec<OpCodeEntry>,
    #[serde(default)]
    pub buffers: Vec<BufferData>,
    pub subgraphs: Vec<SubgraphManifest>,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

/// An operator-code table entry: a builtin name or `{"custom": name}`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum OpCodeEntry {
    Builtin(String),
    Custom { custom: String },
}

/// Raw bytes, or typed values encoded little-endian.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferData {
    Bytes(Vec<u8>),
    F32(Vec<f32>),
    I32(Vec<i32>),
    I16(Vec<i16>),
    I8(Vec<i8>),
}

impl BufferData {
    /// Encodes the values as little-endian bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Self::Bytes(b) => b.clone(),
            Self::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I8(v) => v.iter().map(|&x| x as u8).collect(),
        }
    }
}

/// One subgraph.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SubgraphManifest {
    #[serde(default)]
    pub name: String,
    pub tensors: Vec<TensorManifest>,
    #[serde(default)]
    pub operators: Vec<OperatorManifest>,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
}

/// One tensor.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TensorManifest {
    #[serde(default)]
    pub name: Option<String>,
    pub dtype: DType,
    pub shape: Shape,
    /// Index into [`ModelManifest::buffers`].
    #[serde(default)]
    pub buffer: Option<usize>,
    #[serde(default)]
    pub variable: bool,
    #[serde(default)]
    pub zero_point: Option<i32>,
}

/// One operator.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OperatorManifest {
    /// Index into [`ModelManifest::operator_codes`].
    pub opcode: usize,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
    #[serde(default)]
    pub options: Option<BufferData>,
}

impl ModelManifest {
    /// Reads and parses a manifest from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let manifest: Self = serde_json::from_str(json)?;
        Ok(manifest)
    }
}
