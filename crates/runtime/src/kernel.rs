// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The kernel contract and operator lookup.
//!
//! A [`Kernel`] implements one operator. The interpreter never knows which
//! kernels exist: it asks an [`OpResolver`] for a [`Registration`] per
//! operator code, once, before any kernel runs.

use crate::context::{InitContext, InvokeContext, PrepareContext};
use crate::KernelError;
use model_ir::{BuiltinOperator, OpCode};
use std::any::Any;
use std::fmt;

/// Per-node state created by [`Kernel::init`] and owned by the interpreter
/// until it hands it back to [`Kernel::free`].
#[derive(Default)]
pub struct NodeState(Option<Box<dyn Any>>);

impl NodeState {
    /// A node without state.
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn new<T: Any>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrows the state as `T`, if that is what it holds.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_ref()?.downcast_ref()
    }

    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.as_mut()?.downcast_mut()
    }

    /// Takes the state back out as `T`.
    pub fn into_inner<T: Any>(self) -> Option<T> {
        self.0?.downcast().ok().map(|b| *b)
    }
}

impl fmt::Debug for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_empty() { "NodeState(empty)" } else { "NodeState(..)" })
    }
}

/// One operator implementation.
///
/// The interpreter calls, per node and in graph order: `init` once, then
/// `prepare` once, then `invoke` on every inference, and finally `free`
/// when it is dropped. Only `invoke` is mandatory.
pub trait Kernel {
    /// Parses `options` and creates the node's state. Persistent arena
    /// memory may be allocated here.
    fn init(&self, ctx: &mut InitContext<'_, '_>, options: &[u8]) -> Result<NodeState, KernelError> {
        let _ = (ctx, options);
        Ok(NodeState::empty())
    }

    /// Checks tensor shapes and types and requests arena memory.
    fn prepare(&self, ctx: &mut PrepareContext<'_, '_>, state: &mut NodeState) -> Result<(), KernelError> {
        let _ = (ctx, state);
        Ok(())
    }

    /// Computes the node's outputs.
    fn invoke(&self, ctx: &mut InvokeContext<'_, '_>, state: &mut NodeState) -> Result<(), KernelError>;

    /// `false` if the node has no runtime work; `invoke` is then never called.
    fn has_invoke(&self) -> bool {
        true
    }

    /// Releases the node's state.
    fn free(&self, state: NodeState) {
        drop(state);
    }
}

/// A resolved operator: the kernel registered for an operator code.
#[derive(Clone, Copy)]
pub struct Registration<'r> {
    pub op: &'r OpCode,
    pub kernel: &'r dyn Kernel,
}

impl fmt::Debug for Registration<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("op", &self.op.name())
            .field("has_invoke", &self.kernel.has_invoke())
            .finish()
    }
}

/// Maps operator codes to kernels.
pub trait OpResolver {
    fn find(&self, op: &OpCode) -> Option<Registration<'_>>;
}

/// An [`OpResolver`] backed by a small table, filled at startup.
#[derive(Default)]
pub struct MutableOpResolver {
    entries: Vec<(OpCode, Box<dyn Kernel>)>,
}

impl MutableOpResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `kernel` for `op`, replacing any earlier registration.
    pub fn add(&mut self, op: impl Into<OpCode>, kernel: impl Kernel + 'static) -> &mut Self {
        let op = op.into();
        let kernel: Box<dyn Kernel> = Box::new(kernel);
        match self.entries.iter_mut().find(|(code, _)| *code == op) {
            Some(entry) => entry.1 = kernel,
            None => self.entries.push((op, kernel)),
        }
        self
    }

    /// Registers a builtin operator.
    pub fn add_builtin(&mut self, op: BuiltinOperator, kernel: impl Kernel + 'static) -> &mut Self {
        self.add(op, kernel)
    }

    /// Registers a custom operator by name.
    pub fn add_custom(&mut self, name: &str, kernel: impl Kernel + 'static) -> &mut Self {
        self.add(OpCode::Custom(name.to_string()), kernel)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered operator codes, in registration order.
    pub fn ops(&self) -> impl Iterator<Item = &OpCode> {
        self.entries.iter().map(|(op, _)| op)
    }
}

impl OpResolver for MutableOpResolver {
    fn find(&self, op: &OpCode) -> Option<Registration<'_>> {
        self.entries
            .iter()
            .find(|(code, _)| code == op)
            .map(|(code, kernel)| Registration {
                op: code,
                kernel: kernel.as_ref(),
            })
    }
}

impl fmt::Debug for MutableOpResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ops().map(OpCode::name)).finish()
    }
}
