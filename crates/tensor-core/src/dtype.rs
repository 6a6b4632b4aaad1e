// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element data types.

use std::fmt;

/// Enumerates the numeric kinds a model tensor can hold.
///
/// The interpreter uses `DType` to size arena buffers, to pick the
/// byte-swap width during endianness correction, and to check typed
/// access from kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit IEEE 754 floating point.
    F32,
    /// 16-bit IEEE 754 floating point (stored as raw bits).
    F16,
    /// 64-bit IEEE 754 floating point.
    F64,
    /// 8-bit signed integer (quantised activations and weights).
    I8,
    /// 8-bit unsigned integer (legacy asymmetric quantisation).
    U8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer (biases, shapes, indices).
    I32,
    /// 64-bit signed integer.
    I64,
    /// One byte per boolean.
    Bool,
    /// Complex number as two 32-bit floats (real, imaginary).
    Complex64,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::I8 | DType::U8 | DType::Bool => 1,
            DType::F16 | DType::I16 => 2,
            DType::F32 | DType::I32 => 4,
            DType::F64 | DType::I64 | DType::Complex64 => 8,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F16 => "f16",
            DType::F64 => "f64",
            DType::I8 => "i8",
            DType::U8 => "u8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::Bool => "bool",
            DType::Complex64 => "complex64",
        }
    }

    /// Returns `true` for the 8-bit quantised integer kinds, whose
    /// "zero" value is the tensor's zero point rather than 0.
    pub fn is_quantized_8bit(self) -> bool {
        matches!(self, DType::I8 | DType::U8)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
