// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Byte-order correction for weight buffers.
//!
//! Model weights are always encoded little-endian. On a big-endian host the
//! interpreter corrects every read-only weight tensor once, at construction,
//! so no conversion is needed during inference. Correcting a buffer twice
//! restores the original bytes, so callers must gate it on a single flag.

use crate::{DType, TensorError};

/// A byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// The fixed encoding of weight data in a model.
    pub const MODEL: ByteOrder = ByteOrder::Little;

    /// Returns the byte order of the host this code was compiled for.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// Returns `true` if weights must be byte-swapped on a host with this order.
    pub fn needs_correction(self) -> bool {
        self != Self::MODEL
    }
}

/// Width in bytes of each independently swapped scalar, or `None` if the
/// element type is left untouched.
///
/// `Complex64` is two `f32` components, each swapped on its own.
fn swap_width(dtype: DType) -> Option<usize> {
    match dtype {
        DType::F32 | DType::I32 | DType::Complex64 => Some(4),
        DType::F16 | DType::I16 => Some(2),
        DType::I64 => Some(8),
        _ => None,
    }
}

/// Byte-swaps every element of `data` in place according to `dtype`.
///
/// Returns the number of scalars swapped (zero for untouched types).
pub fn correct_endianness(dtype: DType, data: &mut [u8]) -> Result<usize, TensorError> {
    let Some(width) = swap_width(dtype) else {
        return Ok(0);
    };
    if data.len() % dtype.size_bytes() != 0 {
        return Err(TensorError::BufferSizeMismatch {
            expected: data.len() - data.len() % dtype.size_bytes(),
            actual: data.len(),
        });
    }
    for scalar in data.chunks_exact_mut(width) {
        scalar.reverse();
    }
    Ok(data.len() / width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_swap() {
        let mut data = 1.5f32.to_be_bytes().to_vec();
        data.extend_from_slice(&(-2.0f32).to_be_bytes());
        let swapped = correct_endianness(DType::F32, &mut data).unwrap();
        assert_eq!(swapped, 2);
        assert_eq!(&data[..4], &1.5f32.to_le_bytes());
        assert_eq!(&data[4..], &(-2.0f32).to_le_bytes());
    }

    #[test]
    fn test_i64_and_i16_swap() {
        let mut wide = 0x0102_0304_0506_0708i64.to_le_bytes().to_vec();
        correct_endianness(DType::I64, &mut wide).unwrap();
        assert_eq!(wide, 0x0102_0304_0506_0708i64.to_be_bytes());

        let mut narrow = vec![0x12, 0x34, 0x56, 0x78];
        correct_endianness(DType::I16, &mut narrow).unwrap();
        assert_eq!(narrow, vec![0x34, 0x12, 0x78, 0x56]);
    }

    #[test]
    fn test_complex_swaps_each_component() {
        let mut data = Vec::new();
        data.extend_from_slice(&3.0f32.to_be_bytes());
        data.extend_from_slice(&4.0f32.to_be_bytes());
        assert_eq!(correct_endianness(DType::Complex64, &mut data).unwrap(), 2);
        assert_eq!(&data[..4], &3.0f32.to_le_bytes());
        assert_eq!(&data[4..], &4.0f32.to_le_bytes());
    }

    #[test]
    fn test_untouched_types() {
        let mut data = vec![1, 2, 3, 4];
        assert_eq!(correct_endianness(DType::I8, &mut data).unwrap(), 0);
        assert_eq!(correct_endianness(DType::F64, &mut data).unwrap(), 0);
        assert_eq!(data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_double_correction_is_identity() {
        let original = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let mut data = original.clone();
        correct_endianness(DType::I32, &mut data).unwrap();
        assert_ne!(data, original);
        correct_endianness(DType::I32, &mut data).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn test_ragged_buffer_rejected() {
        let mut data = vec![0u8; 6];
        assert!(correct_endianness(DType::F32, &mut data).is_err());
    }

    #[test]
    fn test_model_order() {
        assert!(!ByteOrder::Little.needs_correction());
        assert!(ByteOrder::Big.needs_correction());
    }
}
