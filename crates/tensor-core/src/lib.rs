// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor primitives shared by every crate in the micro-rt workspace.
//!
//! This crate provides:
//! - [`DType`]: the element kinds a model tensor may carry.
//! - [`Shape`]: fixed dimension lists with element-count helpers.
//! - [`TensorRef`] / [`TensorMut`]: typed, bounds-checked views over byte
//!   slices that live in the interpreter arena or in weight storage.
//! - [`endian`]: in-place byte-order correction for weight buffers.
//!
//! # Design Goals
//! - Views never own memory: the arena (or the model) does.
//! - Element access goes through native-endian byte conversion, so there is
//!   no alignment requirement on the backing slice.
//! - Clean error types via `thiserror`.

mod dtype;
pub mod endian;
mod error;
mod shape;
mod view;

pub use dtype::DType;
pub use endian::ByteOrder;
pub use error::TensorError;
pub use shape::Shape;
pub use view::{Element, TensorMut, TensorRef};
