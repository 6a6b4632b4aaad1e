// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors.

use std::fmt;

/// The dimensions of a model tensor.
///
/// A shape is fixed once the tensor is allocated: the interpreter sizes arena
/// buffers from it and never resizes them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![1, 28, 28, 1]);
    /// assert_eq!(s.rank(), 4);
    /// assert_eq!(s.num_elements(), 784);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements: the product of all dimensions.
    ///
    /// A scalar shape (rank 0) holds one element.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Like [`num_elements`](Self::num_elements), but `None` on overflow.
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Computes the memory footprint in bytes for a given [`crate::DType`].
    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Like [`size_bytes`](Self::size_bytes), but `None` on overflow.
    pub fn checked_size_bytes(&self, dtype: super::DType) -> Option<usize> {
        self.checked_num_elements()?.checked_mul(dtype.size_bytes())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
    }

    #[test]
    fn test_zero_dimension_has_no_elements() {
        let s = Shape::new(vec![4, 0, 2]);
        assert_eq!(s.num_elements(), 0);
        assert_eq!(s.size_bytes(DType::F32), 0);
    }

    #[test]
    fn test_size_bytes() {
        let s = Shape::new(vec![1, 10]);
        assert_eq!(s.size_bytes(DType::F32), 40);
        assert_eq!(s.size_bytes(DType::I16), 20);
        assert_eq!(s.size_bytes(DType::I8), 10);
    }

    #[test]
    fn test_checked_sizes() {
        let s = Shape::matrix(3, 4);
        assert_eq!(s.checked_num_elements(), Some(12));
        assert_eq!(s.checked_size_bytes(DType::F32), Some(48));

        let huge = Shape::new(vec![usize::MAX / 2, 4]);
        assert_eq!(huge.checked_num_elements(), None);
        let wide = Shape::new(vec![usize::MAX / 2]);
        assert_eq!(wide.checked_num_elements(), Some(usize::MAX / 2));
        assert_eq!(wide.checked_size_bytes(DType::F32), None);
        assert_eq!(Shape::scalar().checked_size_bytes(DType::I8), Some(1));
    }

    #[test]
    fn test_display() {
        let s = Shape::new(vec![1, 4, 4, 8]);
        assert_eq!(format!("{s}"), "[1, 4, 4, 8]");
    }

    #[test]
    fn test_serde_is_plain_list() {
        let s = Shape::matrix(2, 3);
        assert_eq!(serde_json::to_string(&s).unwrap(), "[2,3]");
        let back: Shape = serde_json::from_str("[2,3]").unwrap();
        assert_eq!(back, s);
    }
}
