// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Typed views over tensor bytes.
//!
//! Tensor data lives either in the interpreter arena or in the model's weight
//! storage. Neither place guarantees element alignment, so views never cast
//! the byte slice: every element is decoded with `from_ne_bytes` and encoded
//! with `to_ne_bytes`. Weights have already been corrected to native order
//! by the time a view is created.

use crate::{DType, Shape, TensorError};

/// A scalar type that can be read from and written to tensor bytes.
pub trait Element: Copy + 'static {
    /// The tensor element type this scalar corresponds to.
    const DTYPE: DType;

    /// Decodes one element from exactly `DTYPE.size_bytes()` bytes.
    fn from_bytes(bytes: &[u8]) -> Self;

    /// Encodes one element into exactly `DTYPE.size_bytes()` bytes.
    fn write_bytes(self, out: &mut [u8]);
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = $dtype;

                fn from_bytes(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }

                fn write_bytes(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_element! {
    f32 => DType::F32,
    f64 => DType::F64,
    i8 => DType::I8,
    u8 => DType::U8,
    i16 => DType::I16,
    i32 => DType::I32,
    i64 => DType::I64,
}

fn check_len(shape: &Shape, dtype: DType, actual: usize) -> Result<(), TensorError> {
    let expected = shape.size_bytes(dtype);
    if expected != actual {
        return Err(TensorError::BufferSizeMismatch { expected, actual });
    }
    Ok(())
}

fn check_dtype<T: Element>(actual: DType) -> Result<(), TensorError> {
    if T::DTYPE != actual {
        return Err(TensorError::DTypeMismatch {
            expected: T::DTYPE,
            actual,
        });
    }
    Ok(())
}

/// A read-only view of one tensor's data.
#[derive(Debug, Clone, Copy)]
pub struct TensorRef<'a> {
    dtype: DType,
    shape: &'a Shape,
    data: &'a [u8],
}

impl<'a> TensorRef<'a> {
    /// Creates a view, checking that `data` is exactly the tensor's byte size.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{DType, Shape, TensorRef};
    /// let shape = Shape::vector(2);
    /// let bytes: Vec<u8> = [1.0f32, 2.0].iter().flat_map(|v| v.to_ne_bytes()).collect();
    /// let view = TensorRef::new(DType::F32, &shape, &bytes).unwrap();
    /// assert_eq!(view.to_vec::<f32>().unwrap(), vec![1.0, 2.0]);
    /// ```
    pub fn new(dtype: DType, shape: &'a Shape, data: &'a [u8]) -> Result<Self, TensorError> {
        check_len(shape, dtype, data.len())?;
        Ok(Self { dtype, shape, data })
    }

    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Returns the number of elements.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Iterates the elements as `T`, failing if `T` is not the tensor's type.
    pub fn values<T: Element>(&self) -> Result<impl Iterator<Item = T> + 'a, TensorError> {
        check_dtype::<T>(self.dtype)?;
        let data: &'a [u8] = self.data;
        Ok(data.chunks_exact(self.dtype.size_bytes()).map(T::from_bytes))
    }

    /// Reads a single element.
    pub fn get<T: Element>(&self, index: usize) -> Result<T, TensorError> {
        check_dtype::<T>(self.dtype)?;
        let size = self.dtype.size_bytes();
        let len = self.num_elements();
        if index >= len {
            return Err(TensorError::IndexOutOfBounds { index, len });
        }
        Ok(T::from_bytes(&self.data[index * size..(index + 1) * size]))
    }

    /// Copies all elements into a `Vec`. Intended for callers, not kernels.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TensorError> {
        Ok(self.values::<T>()?.collect())
    }
}

/// An exclusive, writable view of one tensor's data.
#[derive(Debug)]
pub struct TensorMut<'a> {
    dtype: DType,
    shape: &'a Shape,
    data: &'a mut [u8],
}

impl<'a> TensorMut<'a> {
    /// Creates a writable view, checking the byte size like [`TensorRef::new`].
    pub fn new(dtype: DType, shape: &'a Shape, data: &'a mut [u8]) -> Result<Self, TensorError> {
        check_len(shape, dtype, data.len())?;
        Ok(Self { dtype, shape, data })
    }

    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// Returns the number of elements.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Reborrows as a read-only view.
    pub fn view(&self) -> TensorRef<'_> {
        TensorRef {
            dtype: self.dtype,
            shape: self.shape,
            data: self.data,
        }
    }

    /// Converts into a read-only view with the full lifetime.
    pub fn into_ref(self) -> TensorRef<'a> {
        TensorRef {
            dtype: self.dtype,
            shape: self.shape,
            data: self.data,
        }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.data
    }

    /// Returns the raw bytes mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// Writes a single element.
    pub fn set<T: Element>(&mut self, index: usize, value: T) -> Result<(), TensorError> {
        check_dtype::<T>(self.dtype)?;
        let size = self.dtype.size_bytes();
        let len = self.num_elements();
        if index >= len {
            return Err(TensorError::IndexOutOfBounds { index, len });
        }
        value.write_bytes(&mut self.data[index * size..(index + 1) * size]);
        Ok(())
    }

    /// Sets every element to `value`.
    pub fn fill<T: Element>(&mut self, value: T) -> Result<(), TensorError> {
        check_dtype::<T>(self.dtype)?;
        for chunk in self.data.chunks_exact_mut(self.dtype.size_bytes()) {
            value.write_bytes(chunk);
        }
        Ok(())
    }

    /// Sets every byte to `byte`, regardless of element type.
    pub fn fill_bytes(&mut self, byte: u8) {
        self.data.fill(byte);
    }

    /// Writes elements produced by `values`, one per tensor element.
    ///
    /// The iterator must yield exactly `num_elements()` items.
    pub fn write_from<T, I>(&mut self, values: I) -> Result<(), TensorError>
    where
        T: Element,
        I: IntoIterator<Item = T>,
    {
        check_dtype::<T>(self.dtype)?;
        let size = self.dtype.size_bytes();
        let total = self.data.len();
        let mut written = 0;
        let mut chunks = self.data.chunks_exact_mut(size);
        for value in values {
            let Some(chunk) = chunks.next() else {
                return Err(TensorError::BufferSizeMismatch {
                    expected: total,
                    actual: (written + 1) * size,
                });
            };
            value.write_bytes(chunk);
            written += 1;
        }
        if written * size != total {
            return Err(TensorError::BufferSizeMismatch {
                expected: total,
                actual: written * size,
            });
        }
        Ok(())
    }

    /// Copies the elements of `values` into the tensor.
    pub fn copy_from_slice<T: Element>(&mut self, values: &[T]) -> Result<(), TensorError> {
        self.write_from(values.iter().copied())
    }

    /// Copies raw bytes from another view of the same byte size.
    pub fn copy_bytes_from(&mut self, source: &TensorRef<'_>) -> Result<(), TensorError> {
        if source.as_bytes().len() != self.data.len() {
            return Err(TensorError::BufferSizeMismatch {
                expected: self.data.len(),
                actual: source.as_bytes().len(),
            });
        }
        self.data.copy_from_slice(source.as_bytes());
        Ok(())
    }
}
