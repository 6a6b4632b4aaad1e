// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor descriptors.
//!
//! A [`TensorDef`] carries no data. Its `buffer` field indexes the graph's
//! weight-buffer table; buffer `0` is always the empty sentinel, so a tensor
//! pointing at it (or at any other empty buffer) is an activation that the
//! runtime places in its arena.

use tensor_core::{DType, Shape};

/// Index of the empty sentinel buffer every graph carries.
pub const EMPTY_BUFFER: usize = 0;

/// Metadata for one tensor of a subgraph.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TensorDef {
    /// Optional human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Element type.
    pub dtype: DType,
    /// Fixed dimensions.
    pub shape: Shape,
    /// Index into the graph's weight-buffer table.
    #[serde(default)]
    pub buffer: usize,
    /// State carried across invocations (e.g. recurrent cell state).
    #[serde(default)]
    pub is_variable: bool,
    /// Quantization zero point, for 8-bit quantized tensors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_point: Option<i32>,
}

impl TensorDef {
    /// Creates an unnamed activation tensor.
    pub fn activation(dtype: DType, shape: Shape) -> Self {
        Self {
            name: None,
            dtype,
            shape,
            buffer: EMPTY_BUFFER,
            is_variable: false,
            zero_point: None,
        }
    }

    /// Creates an unnamed tensor backed by weight buffer `buffer`.
    pub fn weight(dtype: DType, shape: Shape, buffer: usize) -> Self {
        Self {
            buffer,
            ..Self::activation(dtype, shape)
        }
    }

    /// Sets the name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the tensor as variable.
    pub fn variable(mut self) -> Self {
        self.is_variable = true;
        self
    }

    /// Number of elements.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Size of the tensor's data in bytes.
    pub fn size_bytes(&self) -> usize {
        self.shape.size_bytes(self.dtype)
    }

    /// The byte every element is reset to when variables are cleared.
    ///
    /// Only 8-bit quantized tensors have a non-zero reset value.
    pub fn reset_byte(&self) -> u8 {
        match (self.dtype, self.zero_point) {
            (DType::I8, Some(zp)) => zp as i8 as u8,
            (DType::U8, Some(zp)) => zp as u8,
            _ => 0,
        }
    }

    /// Returns the name, or `"tensor_<index>"` if it has none.
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("tensor_{index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        let t = TensorDef::activation(DType::F32, Shape::matrix(2, 3));
        assert_eq!(t.num_elements(), 6);
        assert_eq!(t.size_bytes(), 24);
        assert_eq!(t.buffer, EMPTY_BUFFER);
    }

    #[test]
    fn test_reset_byte() {
        let mut t = TensorDef::activation(DType::I8, Shape::vector(4)).variable();
        assert_eq!(t.reset_byte(), 0);
        t.zero_point = Some(-128);
        assert_eq!(t.reset_byte(), 0x80);

        // Zero points only apply to 8-bit types.
        let f = TensorDef {
            zero_point: Some(3),
            ..TensorDef::activation(DType::F32, Shape::vector(1))
        };
        assert_eq!(f.reset_byte(), 0);
    }

    #[test]
    fn test_display_name() {
        let t = TensorDef::weight(DType::F32, Shape::vector(1), 1);
        assert_eq!(t.display_name(7), "tensor_7");
        assert_eq!(t.named("bias").display_name(7), "bias");
    }

    #[test]
    fn test_serde_defaults() {
        let t: TensorDef = serde_json::from_str(r#"{"dtype":"u8","shape":[2,2]}"#).unwrap();
        assert_eq!(t, TensorDef::activation(DType::U8, Shape::matrix(2, 2)));
    }
}
