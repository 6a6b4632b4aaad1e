// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: the decoded model as tables of tensors, operators and
//! weight buffers.
//!
//! # Type-State Pattern
//!
//! ```text
//! ModelGraph<Loaded>    : tables decoded, not yet checked.
//!       │  .validate()
//!       ▼
//! ModelGraph<Validated> : every index in range, weight sizes consistent.
//! ```
//!
//! The interpreter only accepts `ModelGraph<Validated>`, so it never has to
//! bounds-check graph indices while running. Schema version and subgraph
//! count are *not* validated here: they are properties the interpreter
//! rejects at construction, and a graph carrying them is still well-formed.

use crate::tensor::EMPTY_BUFFER;
use crate::{ModelError, OpCode, OperatorDef, TensorDef};
use std::fmt;

/// Schema version this workspace reads and executes.
pub const SCHEMA_VERSION: u32 = 3;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been decoded but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and can be executed.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── Subgraph ───────────────────────────────────────────────────────

/// One executable graph: tensors, operators in execution order, and the
/// tensor indices that form its inputs and outputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subgraph {
    pub name: String,
    pub tensors: Vec<TensorDef>,
    pub operators: Vec<OperatorDef>,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
}

impl Subgraph {
    fn validate(&self, sg: usize, num_opcodes: usize, buffers: &[Vec<u8>]) -> Result<(), ModelError> {
        let num_buffers = buffers.len();
        for (index, tensor) in self.tensors.iter().enumerate() {
            if tensor.buffer >= num_buffers {
                return Err(ModelError::InvalidTensor {
                    subgraph: sg,
                    index,
                    detail: format!(
                        "buffer {} out of range (graph has {num_buffers})",
                        tensor.buffer
                    ),
                });
            }
            let Some(size) = tensor.shape.checked_size_bytes(tensor.dtype) else {
                return Err(ModelError::InvalidTensor {
                    subgraph: sg,
                    index,
                    detail: format!("{} {} is too large to address", tensor.dtype, tensor.shape),
                });
            };
            let data = &buffers[tensor.buffer];
            if !data.is_empty() && tensor.is_variable {
                return Err(ModelError::InvalidTensor {
                    subgraph: sg,
                    index,
                    detail: "variable tensor cannot be backed by a weight buffer".to_string(),
                });
            }
            if !data.is_empty() && data.len() != size {
                return Err(ModelError::InvalidTensor {
                    subgraph: sg,
                    index,
                    detail: format!(
                        "weight buffer holds {} bytes, {} {} needs {}",
                        data.len(),
                        tensor.dtype,
                        tensor.shape,
                        size
                    ),
                });
            }
        }

        let num_tensors = self.tensors.len();
        for (index, op) in self.operators.iter().enumerate() {
            if op.opcode_index >= num_opcodes {
                return Err(ModelError::InvalidOperator {
                    subgraph: sg,
                    index,
                    detail: format!(
                        "opcode index {} out of range (table has {num_opcodes})",
                        op.opcode_index
                    ),
                });
            }
            if let Some(t) = op.tensor_indices().find(|&t| t >= num_tensors) {
                return Err(ModelError::InvalidOperator {
                    subgraph: sg,
                    index,
                    detail: format!("tensor index {t} out of range (subgraph has {num_tensors})"),
                });
            }
            for (k, &t) in op.outputs.iter().enumerate() {
                if op.inputs.contains(&t) || op.outputs[..k].contains(&t) {
                    return Err(ModelError::InvalidOperator {
                        subgraph: sg,
                        index,
                        detail: format!("tensor {t} written more than once or read and written"),
                    });
                }
            }
            let is_weight = |t: usize| !buffers[self.tensors[t].buffer].is_empty();
            if let Some(&t) = op.outputs.iter().find(|&&t| is_weight(t)) {
                return Err(ModelError::InvalidOperator {
                    subgraph: sg,
                    index,
                    detail: format!("writes to weight tensor {t}"),
                });
            }
        }

        for (kind, list) in [("input", &self.inputs), ("output", &self.outputs)] {
            if let Some(&t) = list.iter().find(|&&t| t >= num_tensors) {
                return Err(ModelError::InvalidGraph(format!(
                    "subgraph {sg} {kind} tensor {t} out of range (subgraph has {num_tensors})"
                )));
            }
        }
        Ok(())
    }
}

// ── ModelGraph ─────────────────────────────────────────────────────

/// The complete decoded model. The generic parameter `S` encodes the
/// validation state at compile time.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    /// Schema version the model was serialized with.
    pub version: u32,
    /// Free-form description.
    pub description: String,
    /// Operator-code table indexed by [`OperatorDef::opcode_index`].
    pub operator_codes: Vec<OpCode>,
    /// Weight buffers, little-endian. Index 0 is always empty.
    pub buffers: Vec<Vec<u8>>,
    pub subgraphs: Vec<Subgraph>,
    /// State marker (zero-sized, compile-time only).
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelGraph<Loaded> {
    /// Creates a graph in the `Loaded` state. The empty sentinel buffer is
    /// inserted at index 0 if `buffers` does not start with one.
    pub fn new(
        version: u32,
        description: impl Into<String>,
        operator_codes: Vec<OpCode>,
        mut buffers: Vec<Vec<u8>>,
        subgraphs: Vec<Subgraph>,
    ) -> Self {
        if buffers.first().map_or(true, |b| !b.is_empty()) {
            buffers.insert(EMPTY_BUFFER, Vec::new());
        }
        Self {
            version,
            description: description.into(),
            operator_codes,
            buffers,
            subgraphs,
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - Buffer 0 is the empty sentinel.
    /// - Every tensor's buffer index is in range, its byte size fits in
    ///   `usize`, and a non-empty weight buffer is exactly
    ///   `num_elements × dtype size` bytes.
    /// - A variable tensor is never backed by a weight buffer.
    /// - Every operator's opcode index and tensor indices are in range, no
    ///   operator writes to a weight tensor, and no output is also an input
    ///   or listed twice.
    /// - Subgraph input/output indices are in range.
    pub fn validate(self) -> Result<ModelGraph<Validated>, ModelError> {
        if self.buffers.first().map_or(true, |b| !b.is_empty()) {
            return Err(ModelError::InvalidGraph(
                "buffer 0 must be the empty sentinel".into(),
            ));
        }

        for (sg, subgraph) in self.subgraphs.iter().enumerate() {
            subgraph.validate(sg, self.operator_codes.len(), &self.buffers)?;
        }

        if self.version != SCHEMA_VERSION {
            tracing::warn!(
                "model schema version {} differs from supported version {}",
                self.version,
                SCHEMA_VERSION,
            );
        }

        Ok(ModelGraph {
            version: self.version,
            description: self.description,
            operator_codes: self.operator_codes,
            buffers: self.buffers,
            subgraphs: self.subgraphs,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Validated state ────────────────────────────────────────────────

impl ModelGraph<Validated> {
    /// Returns subgraph `index`.
    pub fn subgraph(&self, index: usize) -> Option<&Subgraph> {
        self.subgraphs.get(index)
    }

    /// Returns the operator code an operator record points at.
    pub fn opcode_of(&self, op: &OperatorDef) -> &OpCode {
        &self.operator_codes[op.opcode_index]
    }

    /// Returns the weight bytes backing `tensor`, or `None` for an
    /// activation tensor.
    pub fn weight_data(&self, tensor: &TensorDef) -> Option<&[u8]> {
        let data = &self.buffers[tensor.buffer];
        (!data.is_empty()).then_some(data.as_slice())
    }

    /// Total bytes held in weight buffers.
    pub fn total_weight_bytes(&self) -> usize {
        self.buffers.iter().map(Vec::len).sum()
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        let (tensors, operators) = self
            .subgraphs
            .iter()
            .fold((0, 0), |(t, o), sg| (t + sg.tensors.len(), o + sg.operators.len()));
        format!(
            "Model '{}' (schema v{}): {} subgraph(s), {} tensors, {} operators, {} weight bytes",
            self.description,
            self.version,
            self.subgraphs.len(),
            tensors,
            operators,
            self.total_weight_bytes(),
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ModelGraph '{}' (schema v{}):", self.description, self.version)?;
        for (i, sg) in self.subgraphs.iter().enumerate() {
            writeln!(
                f,
                "  subgraph {i} '{}': inputs {:?}, outputs {:?}",
                sg.name, sg.inputs, sg.outputs
            )?;
            for (n, op) in sg.operators.iter().enumerate() {
                let name = self
                    .operator_codes
                    .get(op.opcode_index)
                    .map_or("<invalid>", OpCode::name);
                writeln!(f, "    [{n}] {name} {:?} -> {:?}", op.inputs, op.outputs)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuiltinOperator;
    use tensor_core::{DType, Shape};

    /// Helper: `out = ADD(x, c)` with a constant weight `c`.
    fn add_graph() -> ModelGraph<Loaded> {
        let c: Vec<u8> = [1.0f32; 4].iter().flat_map(|v| v.to_le_bytes()).collect();
        ModelGraph::new(
            SCHEMA_VERSION,
            "add",
            vec![BuiltinOperator::Add.into()],
            vec![Vec::new(), c],
            vec![Subgraph {
                name: "main".into(),
                tensors: vec![
                    TensorDef::activation(DType::F32, Shape::vector(4)).named("x"),
                    TensorDef::weight(DType::F32, Shape::vector(4), 1).named("c"),
                    TensorDef::activation(DType::F32, Shape::vector(4)).named("out"),
                ],
                operators: vec![OperatorDef::new(0, vec![0, 1], vec![2])],
                inputs: vec![0],
                outputs: vec![2],
            }],
        )
    }

    #[test]
    fn test_validate_ok() {
        let graph = add_graph().validate().unwrap();
        let sg = graph.subgraph(0).unwrap();
        assert!(graph.weight_data(&sg.tensors[1]).is_some());
        assert!(graph.weight_data(&sg.tensors[0]).is_none());
        assert_eq!(graph.opcode_of(&sg.operators[0]).name(), "ADD");
    }

    #[test]
    fn test_sentinel_inserted() {
        let graph = ModelGraph::new(SCHEMA_VERSION, "s", vec![], vec![vec![1, 2]], vec![]);
        assert_eq!(graph.buffers.len(), 2);
        assert!(graph.buffers[0].is_empty());
    }

    #[test]
    fn test_validate_weight_size_mismatch() {
        let mut graph = add_graph();
        graph.buffers[1].truncate(12);
        assert!(matches!(
            graph.validate(),
            Err(ModelError::InvalidTensor { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_bad_buffer_index() {
        let mut graph = add_graph();
        graph.subgraphs[0].tensors[0].buffer = 9;
        assert!(matches!(
            graph.validate(),
            Err(ModelError::InvalidTensor { index: 0, .. })
        ));
    }

    #[test]
    fn test_validate_bad_opcode() {
        let mut graph = add_graph();
        graph.subgraphs[0].operators[0].opcode_index = 3;
        assert!(matches!(
            graph.validate(),
            Err(ModelError::InvalidOperator { index: 0, .. })
        ));
    }

    #[test]
    fn test_validate_bad_tensor_index() {
        let mut graph = add_graph();
        graph.subgraphs[0].operators[0].inputs.push(42);
        assert!(graph.validate().is_err());

        let mut graph = add_graph();
        graph.subgraphs[0].outputs = vec![3];
        assert!(matches!(graph.validate(), Err(ModelError::InvalidGraph(_))));
    }

    #[test]
    fn test_validate_write_to_weight() {
        let mut graph = add_graph();
        graph.subgraphs[0].operators[0].outputs = vec![1];
        assert!(matches!(
            graph.validate(),
            Err(ModelError::InvalidOperator { .. })
        ));
    }

    #[test]
    fn test_validate_in_place_output() {
        let mut graph = add_graph();
        graph.subgraphs[0].operators[0].outputs = vec![0];
        assert!(matches!(
            graph.validate(),
            Err(ModelError::InvalidOperator { .. })
        ));
    }

    #[test]
    fn test_validate_variable_weight() {
        let mut graph = add_graph();
        graph.subgraphs[0].tensors[1].is_variable = true;
        assert!(matches!(
            graph.validate(),
            Err(ModelError::InvalidTensor { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_unaddressable_activation() {
        let mut graph = add_graph();
        graph.subgraphs[0].tensors[2].shape = Shape::new(vec![usize::MAX / 2, 4]);
        assert!(matches!(
            graph.validate(),
            Err(ModelError::InvalidTensor { index: 2, .. })
        ));

        let mut graph = add_graph();
        graph.subgraphs[0].tensors[0].shape = Shape::vector(usize::MAX / 2);
        assert!(matches!(
            graph.validate(),
            Err(ModelError::InvalidTensor { index: 0, .. })
        ));
    }

    #[test]
    fn test_version_and_subgraph_count_not_checked() {
        let mut graph = add_graph();
        graph.version = 2;
        graph.subgraphs.push(Subgraph::default());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_summary_and_display() {
        let graph = add_graph().validate().unwrap();
        let s = graph.summary();
        assert!(s.contains("'add'"));
        assert!(s.contains("3 tensors"));
        assert!(s.contains("16 weight bytes"));

        let display = format!("{graph}");
        assert!(display.contains("[0] ADD [0, 1] -> [2]"));
    }
}
