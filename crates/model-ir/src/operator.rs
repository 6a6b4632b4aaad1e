// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator identities and operator records.
//!
//! Every graph carries an operator-code table. Each [`OperatorDef`] points
//! into that table with `opcode_index`; the runtime looks up a kernel by the
//! resulting [`OpCode`].

use std::fmt;

/// Operators with a well-known identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinOperator {
    Add,
    AveragePool2d,
    Concatenation,
    Conv2d,
    DepthwiseConv2d,
    Dequantize,
    FullyConnected,
    Logistic,
    MaxPool2d,
    Mean,
    Mul,
    Pad,
    Quantize,
    Relu,
    Relu6,
    Reshape,
    Softmax,
    Sub,
    Tanh,
}

impl BuiltinOperator {
    /// Every builtin, in declaration order.
    pub const ALL: [BuiltinOperator; 19] = [
        Self::Add,
        Self::AveragePool2d,
        Self::Concatenation,
        Self::Conv2d,
        Self::DepthwiseConv2d,
        Self::Dequantize,
        Self::FullyConnected,
        Self::Logistic,
        Self::MaxPool2d,
        Self::Mean,
        Self::Mul,
        Self::Pad,
        Self::Quantize,
        Self::Relu,
        Self::Relu6,
        Self::Reshape,
        Self::Softmax,
        Self::Sub,
        Self::Tanh,
    ];

    /// Returns the canonical upper-case name (e.g. `"CONV_2D"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::AveragePool2d => "AVERAGE_POOL_2D",
            Self::Concatenation => "CONCATENATION",
            Self::Conv2d => "CONV_2D",
            Self::DepthwiseConv2d => "DEPTHWISE_CONV_2D",
            Self::Dequantize => "DEQUANTIZE",
            Self::FullyConnected => "FULLY_CONNECTED",
            Self::Logistic => "LOGISTIC",
            Self::MaxPool2d => "MAX_POOL_2D",
            Self::Mean => "MEAN",
            Self::Mul => "MUL",
            Self::Pad => "PAD",
            Self::Quantize => "QUANTIZE",
            Self::Relu => "RELU",
            Self::Relu6 => "RELU6",
            Self::Reshape => "RESHAPE",
            Self::Softmax => "SOFTMAX",
            Self::Sub => "SUB",
            Self::Tanh => "TANH",
        }
    }

    /// Parses a canonical name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for BuiltinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity a kernel is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpCode {
    Builtin(BuiltinOperator),
    /// A vendor- or application-defined operator, identified by name.
    Custom(String),
}

impl OpCode {
    /// Human-readable operator name: the builtin's canonical name, or the
    /// custom name.
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(op) => op.as_str(),
            Self::Custom(name) => name,
        }
    }

    /// Returns `true` for custom operators.
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl From<BuiltinOperator> for OpCode {
    fn from(op: BuiltinOperator) -> Self {
        Self::Builtin(op)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One node of a subgraph, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorDef {
    /// Index into the graph's operator-code table.
    pub opcode_index: usize,
    /// Input tensor indices.
    pub inputs: Vec<usize>,
    /// Output tensor indices.
    pub outputs: Vec<usize>,
    /// Opaque option blob handed to the kernel at init.
    pub options: Vec<u8>,
}

impl OperatorDef {
    pub fn new(opcode_index: usize, inputs: Vec<usize>, outputs: Vec<usize>) -> Self {
        Self {
            opcode_index,
            inputs,
            outputs,
            options: Vec::new(),
        }
    }

    /// Attaches an option blob.
    pub fn with_options(mut self, options: Vec<u8>) -> Self {
        self.options = options;
        self
    }

    /// Iterates over every tensor index this operator touches.
    pub fn tensor_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.inputs.iter().chain(self.outputs.iter()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_round_trip() {
        for op in BuiltinOperator::ALL {
            assert_eq!(BuiltinOperator::from_name(op.as_str()), Some(op));
        }
        assert_eq!(BuiltinOperator::from_name("conv_2d"), Some(BuiltinOperator::Conv2d));
        assert_eq!(BuiltinOperator::from_name("LSTM"), None);
    }

    #[test]
    fn test_opcode_name() {
        assert_eq!(OpCode::from(BuiltinOperator::FullyConnected).name(), "FULLY_CONNECTED");
        let custom = OpCode::Custom("ETHOS_U".into());
        assert_eq!(custom.to_string(), "ETHOS_U");
        assert!(custom.is_custom());
    }

    #[test]
    fn test_tensor_indices() {
        let op = OperatorDef::new(0, vec![0, 1], vec![2]);
        assert_eq!(op.tensor_indices().collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
