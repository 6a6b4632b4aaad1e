// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! The decoded, immutable representation of a model that the interpreter
//! executes:
//!
//! - [`TensorDef`]: element type, shape, weight-buffer index, variable flag.
//! - [`OperatorDef`] and [`OpCode`]: operator records in execution order and
//!   the identities kernels are registered under.
//! - [`Subgraph`]: tensors, operators, graph inputs and outputs.
//! - [`ModelGraph`]: schema version, operator-code table, weight buffers and
//!   subgraphs, with a **type-state pattern** (`Loaded` → `Validated`).
//! - [`ModelLoader`]: builds graphs from a JSON [`ModelManifest`].
//!
//! Weight buffers are stored little-endian, as serialized; the runtime
//! corrects byte order on big-endian hosts.
//!
//! # Example
//! ```
//! use model_ir::ModelLoader;
//!
//! let graph = ModelLoader::from_json_str(r#"{
//!     "operator_codes": ["RELU"],
//!     "subgraphs": [{
//!         "tensors": [
//!             {"dtype": "f32", "shape": [2]},
//!             {"dtype": "f32", "shape": [2]}
//!         ],
//!         "operators": [{"opcode": 0, "inputs": [0], "outputs": [1]}],
//!         "inputs": [0],
//!         "outputs": [1]
//!     }]
//! }"#)
//! .unwrap()
//! .validate()
//! .unwrap();
//! assert_eq!(graph.subgraphs.len(), 1);
//! ```

mod error;
pub mod graph;
mod loader;
pub mod manifest;
mod operator;
mod tensor;

pub use error::ModelError;
pub use graph::{ModelGraph, Subgraph, SCHEMA_VERSION};
pub use loader::ModelLoader;
pub use manifest::ModelManifest;
pub use operator::{BuiltinOperator, OpCode, OperatorDef};
pub use tensor::{TensorDef, EMPTY_BUFFER};
