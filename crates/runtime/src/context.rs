// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The surface kernels see.
//!
//! Each lifecycle phase hands kernels a different capability object, so what
//! a kernel may do is decided by the type it receives rather than by checks
//! inside the arena:
//!
//! ```text
//!                   allocate_persistent   request_scratch   node_buffers
//! InitContext              ✓                    ✗                 ✗
//! PrepareContext           ✓                    ✓                 ✗
//! InvokeContext            ✗                    ✗                 ✓
//! ```
//!
//! All three borrow the interpreter's [`ContextBridge`], which records the
//! active [`Phase`] and the node currently being processed. Scratch requests
//! read that cursor to start their live range, so the bridge is single
//! threaded and not reentrant.

use crate::{ErrorReporter, KernelError};
use memory_manager::{Arena, ArenaError, BufferId, LiveRange, Span, MAX_CARVE_SPANS};
use model_ir::{OperatorDef, TensorDef};
use std::borrow::Cow;
use std::fmt;
use tensor_core::{TensorMut, TensorRef};

/// Most tensors plus buffers one node can view during a single invoke.
pub const MAX_NODE_BUFFERS: usize = MAX_CARVE_SPANS;

/// The lifecycle phase the interpreter is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Init,
    Prepare,
    Invoke,
}

/// Interpreter-owned state shared by every context object.
#[derive(Debug, Default)]
pub struct ContextBridge {
    phase: Phase,
    current_node: Option<usize>,
}

impl ContextBridge {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the node being initialized, prepared or invoked.
    pub fn current_node(&self) -> Option<usize> {
        self.current_node
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn set_node_index(&mut self, node: Option<usize>) {
        self.current_node = node;
    }
}

/// Where an interpreter tensor's bytes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Arena-owned, not yet planned.
    Unallocated,
    /// Read-only weight data of the given tensor.
    Weight(usize),
    Arena(BufferId),
}

// ── Init ───────────────────────────────────────────────────────────

/// Capabilities available to [`Kernel::init`](crate::Kernel::init).
pub struct InitContext<'c, 'a> {
    bridge: &'c ContextBridge,
    arena: &'c mut Arena<'a>,
    reporter: &'c dyn ErrorReporter,
}

impl<'c, 'a> InitContext<'c, 'a> {
    pub(crate) fn new(
        bridge: &'c ContextBridge,
        arena: &'c mut Arena<'a>,
        reporter: &'c dyn ErrorReporter,
    ) -> Self {
        Self {
            bridge,
            arena,
            reporter,
        }
    }

    pub fn node_index(&self) -> usize {
        self.bridge.current_node.unwrap_or_default()
    }

    /// Allocates zeroed arena memory that lives as long as the interpreter.
    pub fn allocate_persistent(&mut self, size: usize) -> Result<BufferId, KernelError> {
        Ok(self.arena.allocate_persistent(size)?)
    }

    /// Writes into a persistent buffer allocated earlier.
    pub fn persistent_buffer_mut(&mut self, id: BufferId) -> Result<&mut [u8], KernelError> {
        Ok(self.arena.buffer_mut(id)?)
    }

    pub fn report_error(&self, args: fmt::Arguments<'_>) {
        self.reporter.report(args);
    }
}

// ── Prepare ────────────────────────────────────────────────────────

/// Capabilities available to [`Kernel::prepare`](crate::Kernel::prepare).
pub struct PrepareContext<'c, 'a> {
    bridge: &'c ContextBridge,
    arena: &'c mut Arena<'a>,
    reporter: &'c dyn ErrorReporter,
    node: &'c OperatorDef,
    tensors: &'c [TensorDef],
    placements: &'c [Placement],
    storage_alias: &'c mut [Option<usize>],
    last_node: usize,
}

impl<'c, 'a> PrepareContext<'c, 'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        bridge: &'c ContextBridge,
        arena: &'c mut Arena<'a>,
        reporter: &'c dyn ErrorReporter,
        node: &'c OperatorDef,
        tensors: &'c [TensorDef],
        placements: &'c [Placement],
        storage_alias: &'c mut [Option<usize>],
        last_node: usize,
    ) -> Self {
        Self {
            bridge,
            arena,
            reporter,
            node,
            tensors,
            placements,
            storage_alias,
            last_node,
        }
    }

    pub fn node_index(&self) -> usize {
        self.bridge.current_node.unwrap_or_default()
    }

    pub fn num_inputs(&self) -> usize {
        self.node.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.node.outputs.len()
    }

    /// Metadata of the node's `k`-th input.
    pub fn input_def(&self, k: usize) -> Result<&'c TensorDef, KernelError> {
        node_tensor(self.tensors, &self.node.inputs, "input", k)
    }

    /// Metadata of the node's `k`-th output.
    pub fn output_def(&self, k: usize) -> Result<&'c TensorDef, KernelError> {
        node_tensor(self.tensors, &self.node.outputs, "output", k)
    }

    /// Returns `true` if the `k`-th input is a read-only weight.
    pub fn input_is_constant(&self, k: usize) -> Result<bool, KernelError> {
        let t = tensor_at(&self.node.inputs, "input", k)?;
        Ok(matches!(self.placements[t], Placement::Weight(_)))
    }

    /// Allocates zeroed arena memory that lives as long as the interpreter.
    pub fn allocate_persistent(&mut self, size: usize) -> Result<BufferId, KernelError> {
        Ok(self.arena.allocate_persistent(size)?)
    }

    /// Writes into a persistent buffer allocated earlier.
    pub fn persistent_buffer_mut(&mut self, id: BufferId) -> Result<&mut [u8], KernelError> {
        Ok(self.arena.buffer_mut(id)?)
    }

    /// Requests scratch memory usable while this node is invoked.
    pub fn request_scratch_buffer(&mut self, size: usize) -> Result<BufferId, KernelError> {
        let node = self.node_index();
        self.request_scratch_buffer_until(size, node)
    }

    /// Requests scratch memory whose contents survive from this node up to
    /// and including `last_node`.
    pub fn request_scratch_buffer_until(
        &mut self,
        size: usize,
        last_node: usize,
    ) -> Result<BufferId, KernelError> {
        let first = self.node_index();
        if last_node > self.last_node {
            return Err(ArenaError::InvalidLiveRange {
                first,
                last: last_node,
            }
            .into());
        }
        let live = LiveRange::new(first, last_node)?;
        Ok(self.arena.request_scratch(live, size)?)
    }

    /// Makes output `output` share the storage of input `input`, so the node
    /// needs no invoke work to produce it. Both tensors must have the same
    /// byte size.
    pub fn share_input_storage(&mut self, output: usize, input: usize) -> Result<(), KernelError> {
        let out = tensor_at(&self.node.outputs, "output", output)?;
        let inp = tensor_at(&self.node.inputs, "input", input)?;
        let (out_size, in_size) = (self.tensors[out].size_bytes(), self.tensors[inp].size_bytes());
        if out_size != in_size {
            return Err(KernelError::failed(format!(
                "cannot share storage of tensor {inp} ({in_size} bytes) with tensor {out} ({out_size} bytes)"
            )));
        }
        self.storage_alias[out] = Some(self.storage_alias[inp].unwrap_or(inp));
        Ok(())
    }

    pub fn report_error(&self, args: fmt::Arguments<'_>) {
        self.reporter.report(args);
    }
}

// ── Invoke ─────────────────────────────────────────────────────────

/// Capabilities available to [`Kernel::invoke`](crate::Kernel::invoke).
///
/// There is no way to allocate from here; kernels reach buffers they
/// obtained earlier through [`node_buffers`](Self::node_buffers).
pub struct InvokeContext<'c, 'a> {
    bridge: &'c ContextBridge,
    arena: &'c mut Arena<'a>,
    reporter: &'c dyn ErrorReporter,
    node: &'c OperatorDef,
    tensors: &'c [TensorDef],
    placements: &'c [Placement],
    weights: &'c [Option<Cow<'c, [u8]>>],
}

impl<'c, 'a> InvokeContext<'c, 'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        bridge: &'c ContextBridge,
        arena: &'c mut Arena<'a>,
        reporter: &'c dyn ErrorReporter,
        node: &'c OperatorDef,
        tensors: &'c [TensorDef],
        placements: &'c [Placement],
        weights: &'c [Option<Cow<'c, [u8]>>],
    ) -> Self {
        Self {
            bridge,
            arena,
            reporter,
            node,
            tensors,
            placements,
            weights,
        }
    }

    pub fn node_index(&self) -> usize {
        self.bridge.current_node.unwrap_or_default()
    }

    pub fn num_inputs(&self) -> usize {
        self.node.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.node.outputs.len()
    }

    pub fn input_def(&self, k: usize) -> Result<&'c TensorDef, KernelError> {
        node_tensor(self.tensors, &self.node.inputs, "input", k)
    }

    pub fn output_def(&self, k: usize) -> Result<&'c TensorDef, KernelError> {
        node_tensor(self.tensors, &self.node.outputs, "output", k)
    }

    /// Resolves every input, every output and each of `extra` (scratch or
    /// persistent buffers) into simultaneous views, without touching the
    /// heap.
    ///
    /// Inputs are shared views; outputs and extra buffers are exclusive and
    /// handed out once each.
    pub fn node_buffers(&mut self, extra: &[BufferId]) -> Result<NodeBuffers<'_>, KernelError> {
        let node = self.node;
        let node_idx = self.node_index();
        let (weights, tensors, placements) = (self.weights, self.tensors, self.placements);
        let (n_in, n_out) = (node.inputs.len(), node.outputs.len());
        let total = n_in + n_out + extra.len();
        if total > MAX_NODE_BUFFERS {
            return Err(ArenaError::TooManySpans {
                count: total,
                max: MAX_NODE_BUFFERS,
            }
            .into());
        }

        let mut spans = [Span { offset: 0, len: 0 }; MAX_NODE_BUFFERS];
        for (k, &t) in node.inputs.iter().chain(&node.outputs).enumerate() {
            spans[k] = match placements[t] {
                Placement::Arena(id) => self.arena.span(id)?,
                // Weights live outside the arena; an empty span carves nothing.
                Placement::Weight(_) => Span { offset: 0, len: 0 },
                Placement::Unallocated => {
                    return Err(KernelError::failed(format!("tensor {t} is not allocated")))
                }
            };
        }
        for (k, &id) in extra.iter().enumerate() {
            spans[n_in + n_out + k] = self.arena.span(id)?;
        }

        let mut slices: [Option<&mut [u8]>; MAX_NODE_BUFFERS] = std::array::from_fn(|_| None);
        let mut aliases = [None; MAX_NODE_BUFFERS];
        self.arena
            .carve(&spans[..total], &mut slices[..total], &mut aliases[..total])?;

        let mut buffers = NodeBuffers::empty(n_in, n_out, extra.len());

        let mut shared: [Option<&[u8]>; MAX_NODE_BUFFERS] = [None; MAX_NODE_BUFFERS];
        for (k, &t) in node.inputs.iter().enumerate() {
            let data: &[u8] = match placements[t] {
                Placement::Weight(root) => weights[root].as_deref().unwrap_or_default(),
                _ => match aliases[k] {
                    Some(j) => shared[j].unwrap_or_default(),
                    None => slices[k].take().map(|s| &*s).unwrap_or_default(),
                },
            };
            shared[k] = Some(data);
            let def = &tensors[t];
            buffers.inputs[k] = Some(TensorRef::new(def.dtype, &def.shape, data)?);
        }

        for k in n_in..total {
            if aliases[k].is_some() {
                return Err(KernelError::failed(format!(
                    "buffer {k} of node {node_idx} is referenced twice"
                )));
            }
            let Some(slice) = slices[k].take() else {
                return Err(KernelError::failed(format!("buffer {k} could not be resolved")));
            };
            if k < n_in + n_out {
                let def = &tensors[node.outputs[k - n_in]];
                buffers.outputs[k - n_in] = Some(TensorMut::new(def.dtype, &def.shape, slice)?);
            } else {
                buffers.extra[k - n_in - n_out] = Some(slice);
            }
        }
        Ok(buffers)
    }

    pub fn report_error(&self, args: fmt::Arguments<'_>) {
        self.reporter.report(args);
    }
}

fn tensor_at(list: &[usize], kind: &'static str, k: usize) -> Result<usize, KernelError> {
    list.get(k).copied().ok_or(KernelError::MissingTensor {
        kind,
        index: k,
        len: list.len(),
    })
}

fn node_tensor<'t>(
    tensors: &'t [TensorDef],
    list: &[usize],
    kind: &'static str,
    k: usize,
) -> Result<&'t TensorDef, KernelError> {
    Ok(&tensors[tensor_at(list, kind, k)?])
}

/// Simultaneous views of one node's tensors and buffers during invoke.
pub struct NodeBuffers<'n> {
    inputs: [Option<TensorRef<'n>>; MAX_NODE_BUFFERS],
    outputs: [Option<TensorMut<'n>>; MAX_NODE_BUFFERS],
    extra: [Option<&'n mut [u8]>; MAX_NODE_BUFFERS],
    num_inputs: usize,
    num_outputs: usize,
    num_extra: usize,
}

impl<'n> NodeBuffers<'n> {
    fn empty(num_inputs: usize, num_outputs: usize, num_extra: usize) -> Self {
        Self {
            inputs: [None; MAX_NODE_BUFFERS],
            outputs: std::array::from_fn(|_| None),
            extra: std::array::from_fn(|_| None),
            num_inputs,
            num_outputs,
            num_extra,
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Shared view of input `k`. May be called any number of times.
    pub fn input(&self, k: usize) -> Result<TensorRef<'n>, KernelError> {
        self.inputs[..self.num_inputs]
            .get(k)
            .copied()
            .flatten()
            .ok_or(KernelError::MissingTensor {
                kind: "input",
                index: k,
                len: self.num_inputs,
            })
    }

    /// Exclusive view of output `k`. Each output is handed out once.
    pub fn output(&mut self, k: usize) -> Result<TensorMut<'n>, KernelError> {
        take(&mut self.outputs[..self.num_outputs], "output", k)
    }

    /// Exclusive view of the `k`-th extra buffer passed to
    /// [`InvokeContext::node_buffers`]. Each buffer is handed out once.
    pub fn buffer(&mut self, k: usize) -> Result<&'n mut [u8], KernelError> {
        take(&mut self.extra[..self.num_extra], "buffer", k)
    }
}

fn take<T>(slots: &mut [Option<T>], kind: &'static str, k: usize) -> Result<T, KernelError> {
    let len = slots.len();
    match slots.get_mut(k) {
        Some(slot) => slot
            .take()
            .ok_or_else(|| KernelError::failed(format!("{kind} {k} already taken"))),
        None => Err(KernelError::MissingTensor {
            kind,
            index: k,
            len,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectingReporter;
    use tensor_core::{DType, Shape};

    fn defs() -> Vec<TensorDef> {
        vec![
            TensorDef::activation(DType::F32, Shape::vector(4)),
            TensorDef::weight(DType::F32, Shape::vector(4), 1),
            TensorDef::activation(DType::F32, Shape::vector(4)),
        ]
    }

    #[test]
    fn test_bridge_defaults() {
        let mut bridge = ContextBridge::default();
        assert_eq!(bridge.phase(), Phase::Idle);
        assert_eq!(bridge.current_node(), None);
        bridge.set_phase(Phase::Prepare);
        bridge.set_node_index(Some(3));
        assert_eq!(bridge.phase(), Phase::Prepare);
        assert_eq!(bridge.current_node(), Some(3));
    }

    #[test]
    fn test_prepare_scratch_range_checks() {
        let mut buf = vec![0u8; 256];
        let mut arena = Arena::new(&mut buf).unwrap();
        let mut bridge = ContextBridge::default();
        bridge.set_node_index(Some(1));
        let reporter = CollectingReporter::new();
        let tensors = defs();
        let op = OperatorDef::new(0, vec![0, 1], vec![2]);
        let placements = [Placement::Unallocated, Placement::Weight(1), Placement::Unallocated];
        let mut alias = [None; 3];

        let mut ctx = PrepareContext::new(
            &bridge, &mut arena, &reporter, &op, &tensors, &placements, &mut alias, 2,
        );
        assert!(ctx.request_scratch_buffer(32).is_ok());
        assert!(ctx.request_scratch_buffer_until(32, 2).is_ok());
        assert!(matches!(
            ctx.request_scratch_buffer_until(32, 3),
            Err(KernelError::Arena(ArenaError::InvalidLiveRange { first: 1, last: 3 }))
        ));
        assert!(matches!(
            ctx.request_scratch_buffer_until(32, 0),
            Err(KernelError::Arena(ArenaError::InvalidLiveRange { .. }))
        ));
        assert!(ctx.input_is_constant(1).unwrap());
        assert!(!ctx.input_is_constant(0).unwrap());
        assert!(matches!(
            ctx.output_def(1),
            Err(KernelError::MissingTensor { kind: "output", index: 1, len: 1 })
        ));

        ctx.share_input_storage(0, 0).unwrap();
        drop(ctx);
        assert_eq!(alias[2], Some(0));
    }

    #[test]
    fn test_node_buffers_views() {
        let mut buf = vec![0u8; 256];
        let mut arena = Arena::new(&mut buf).unwrap();
        let x = arena.plan_tensor(LiveRange::at(0), 16).unwrap();
        let y = arena.plan_tensor(LiveRange::at(0), 16).unwrap();
        let s = arena.request_scratch(LiveRange::at(0), 8).unwrap();
        arena.finish_tensor_allocation().unwrap();
        arena.buffer_mut(x).unwrap().copy_from_slice(
            &[1.0f32, 2.0, 3.0, 4.0].iter().flat_map(|v| v.to_ne_bytes()).collect::<Vec<_>>(),
        );

        let bridge = ContextBridge::default();
        let reporter = CollectingReporter::new();
        let tensors = defs();
        let op = OperatorDef::new(0, vec![0, 1, 0], vec![2]);
        let placements = [Placement::Arena(x), Placement::Weight(1), Placement::Arena(y)];
        let one: Vec<u8> = [1.0f32; 4].iter().flat_map(|v| v.to_ne_bytes()).collect();
        let weights = [None, Some(Cow::Owned(one)), None];

        let mut ctx = InvokeContext::new(
            &bridge, &mut arena, &reporter, &op, &tensors, &placements, &weights,
        );
        let mut bufs = ctx.node_buffers(&[s]).unwrap();
        let a = bufs.input(0).unwrap();
        let b = bufs.input(1).unwrap();
        let again = bufs.input(2).unwrap();
        assert_eq!(again.to_vec::<f32>().unwrap(), a.to_vec::<f32>().unwrap());

        let mut out = bufs.output(0).unwrap();
        out.write_from(
            a.values::<f32>()
                .unwrap()
                .zip(b.values::<f32>().unwrap())
                .map(|(x, y)| x + y),
        )
        .unwrap();
        assert_eq!(bufs.buffer(0).unwrap().len(), 8);
        assert!(bufs.output(0).is_err());
        assert!(matches!(bufs.input(3), Err(KernelError::MissingTensor { .. })));
        drop(bufs);
        drop(ctx);

        let bytes = arena.buffer(y).unwrap();
        let sum: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(sum, vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_node_buffers_rejects_duplicate_extra() {
        let mut buf = vec![0u8; 128];
        let mut arena = Arena::new(&mut buf).unwrap();
        let p = arena.allocate_persistent(16).unwrap();
        arena.finish_tensor_allocation().unwrap();

        let bridge = ContextBridge::default();
        let reporter = CollectingReporter::new();
        let tensors: Vec<TensorDef> = Vec::new();
        let op = OperatorDef::new(0, vec![], vec![]);
        let mut ctx = InvokeContext::new(&bridge, &mut arena, &reporter, &op, &tensors, &[], &[]);
        assert!(ctx.node_buffers(&[p, p]).is_err());
        assert!(ctx.node_buffers(&[p]).is_ok());
    }
}
