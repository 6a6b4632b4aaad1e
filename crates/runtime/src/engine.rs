// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The interpreter: lifecycle orchestration over one graph and one arena.
//!
//! ```text
//! Interpreter::new(graph, resolver, &mut arena)
//!     │  schema + subgraph checks, weight byte-order correction
//!     ▼
//! constructed ──allocate_tensors()──► allocated ──invoke()──► allocated
//!     │            resolve all ops          ▲                    │
//!     │            Init  (per node)         └────────────────────┘
//!     │            Prepare (per node)
//!     │            plan tensors + finish arena
//!     ▼
//!   drop: Kernel::free per node
//! ```
//!
//! A construction failure does not prevent building the instance: it is
//! recorded, every later `allocate_tensors`/`invoke` fails with
//! [`RuntimeError::InvokeAfterFailedInit`], and the accessors still answer.
//! [`Interpreter::try_new`] returns the construction error instead.
//!
//! # Tensor lifetimes
//!
//! Arena tensors are packed by liveness. A tensor is live from the first
//! node that touches it to the last one. Graph inputs, graph outputs and
//! variable tensors are live over the whole graph, so callers can write
//! inputs before `invoke`, read outputs after it, and variables keep their
//! state between invokes.

use crate::context::{ContextBridge, InitContext, InvokeContext, Phase, Placement, PrepareContext};
use crate::metrics::{BenchmarkHook, NoopHook};
use crate::reporter::{ErrorReporter, TracingReporter};
use crate::{KernelError, NodeState, OpResolver, Registration, RuntimeError};
use memory_manager::{Arena, ArenaStats, LiveRange};
use model_ir::graph::Validated;
use model_ir::{ModelGraph, Subgraph, TensorDef, SCHEMA_VERSION};
use std::borrow::Cow;
use tensor_core::endian::correct_endianness;
use tensor_core::{ByteOrder, TensorMut, TensorRef};

static TRACING_REPORTER: TracingReporter = TracingReporter;

static EMPTY_SUBGRAPH: Subgraph = Subgraph {
    name: String::new(),
    tensors: Vec::new(),
    operators: Vec::new(),
    inputs: Vec::new(),
    outputs: Vec::new(),
};

/// A node paired with its resolved kernel and the state its `init` returned.
#[derive(Debug)]
pub struct NodeAndRegistration<'r> {
    pub index: usize,
    pub registration: Registration<'r>,
    state: NodeState,
}

impl NodeAndRegistration<'_> {
    pub fn state(&self) -> &NodeState {
        &self.state
    }
}

// ── Builder ────────────────────────────────────────────────────────

/// Configures an [`Interpreter`] before construction.
pub struct InterpreterBuilder<'m> {
    graph: &'m ModelGraph<Validated>,
    resolver: &'m dyn OpResolver,
    reporter: &'m dyn ErrorReporter,
    host_order: ByteOrder,
}

impl<'m> InterpreterBuilder<'m> {
    /// Routes diagnostics to `reporter` instead of `tracing`.
    pub fn reporter(mut self, reporter: &'m dyn ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Overrides the detected host byte order.
    pub fn host_byte_order(mut self, order: ByteOrder) -> Self {
        self.host_order = order;
        self
    }

    /// Builds the interpreter, recording any construction failure in it.
    pub fn build<'a>(self, arena: &'a mut [u8]) -> Interpreter<'m, 'a> {
        let mut interpreter = Interpreter {
            graph: self.graph,
            subgraph: &EMPTY_SUBGRAPH,
            resolver: self.resolver,
            reporter: self.reporter,
            arena: None,
            bridge: ContextBridge::default(),
            weights: Vec::new(),
            placements: Vec::new(),
            storage_alias: Vec::new(),
            nodes: Vec::new(),
            init_error: None,
            tensors_allocated: false,
        };
        if let Err(e) = interpreter.initialize(arena, self.host_order) {
            interpreter.reporter.report(format_args!("{e}"));
            interpreter.init_error = Some(e);
        }
        interpreter
    }

    /// Builds the interpreter, returning any construction failure.
    pub fn try_build<'a>(self, arena: &'a mut [u8]) -> Result<Interpreter<'m, 'a>, RuntimeError> {
        let mut interpreter = self.build(arena);
        match interpreter.init_error.take() {
            Some(e) => Err(e),
            None => Ok(interpreter),
        }
    }
}

// ── Interpreter ────────────────────────────────────────────────────

/// Executes one single-subgraph model out of a caller-supplied arena.
///
/// # Example
/// ```
/// use model_ir::ModelLoader;
/// use runtime::{Interpreter, MutableOpResolver};
///
/// let graph = ModelLoader::from_json_str(r#"{
///     "operator_codes": [],
///     "subgraphs": [{
///         "tensors": [{"dtype": "f32", "shape": [2]}],
///         "inputs": [0], "outputs": [0]
///     }]
/// }"#).unwrap().validate().unwrap();
///
/// let resolver = MutableOpResolver::new();
/// let mut arena = vec![0u8; 1024];
/// let mut interpreter = Interpreter::try_new(&graph, &resolver, &mut arena).unwrap();
///
/// interpreter.input_mut(0).unwrap().copy_from_slice(&[1.0f32, 2.0]).unwrap();
/// interpreter.invoke().unwrap();
/// assert_eq!(interpreter.output(0).unwrap().to_vec::<f32>().unwrap(), vec![1.0, 2.0]);
/// ```
pub struct Interpreter<'m, 'a> {
    graph: &'m ModelGraph<Validated>,
    subgraph: &'m Subgraph,
    resolver: &'m dyn OpResolver,
    reporter: &'m dyn ErrorReporter,
    arena: Option<Arena<'a>>,
    bridge: ContextBridge,
    /// Native-order weight bytes, per tensor.
    weights: Vec<Option<Cow<'m, [u8]>>>,
    placements: Vec<Placement>,
    /// Tensor whose storage each tensor shares, set by kernels in prepare.
    storage_alias: Vec<Option<usize>>,
    nodes: Vec<NodeAndRegistration<'m>>,
    init_error: Option<RuntimeError>,
    tensors_allocated: bool,
}

impl<'m, 'a> Interpreter<'m, 'a> {
    /// Starts configuring an interpreter.
    pub fn builder(
        graph: &'m ModelGraph<Validated>,
        resolver: &'m dyn OpResolver,
    ) -> InterpreterBuilder<'m> {
        InterpreterBuilder {
            graph,
            resolver,
            reporter: &TRACING_REPORTER,
            host_order: ByteOrder::native(),
        }
    }

    /// Creates an interpreter. A construction failure is recorded and can be
    /// read back with [`initialization_status`](Self::initialization_status).
    pub fn new(
        graph: &'m ModelGraph<Validated>,
        resolver: &'m dyn OpResolver,
        arena: &'a mut [u8],
    ) -> Self {
        Self::builder(graph, resolver).build(arena)
    }

    /// Creates an interpreter, returning any construction failure.
    pub fn try_new(
        graph: &'m ModelGraph<Validated>,
        resolver: &'m dyn OpResolver,
        arena: &'a mut [u8],
    ) -> Result<Self, RuntimeError> {
        Self::builder(graph, resolver).try_build(arena)
    }

    fn initialize(&mut self, arena: &'a mut [u8], host_order: ByteOrder) -> Result<(), RuntimeError> {
        let graph = self.graph;
        if graph.version != SCHEMA_VERSION {
            return Err(RuntimeError::SchemaVersionMismatch {
                found: graph.version,
                supported: SCHEMA_VERSION,
            });
        }
        let subgraph = match graph.subgraphs.as_slice() {
            [only] => only,
            other => return Err(RuntimeError::MultiSubgraphUnsupported(other.len())),
        };
        let arena = Arena::new(arena)?;

        let mut corrected = 0;
        let mut weights = Vec::with_capacity(subgraph.tensors.len());
        let mut placements = Vec::with_capacity(subgraph.tensors.len());
        for (t, def) in subgraph.tensors.iter().enumerate() {
            match graph.weight_data(def) {
                Some(data) if host_order.needs_correction() => {
                    let mut owned = data.to_vec();
                    if correct_endianness(def.dtype, &mut owned)? > 0 {
                        corrected += 1;
                    }
                    weights.push(Some(Cow::Owned(owned)));
                    placements.push(Placement::Weight(t));
                }
                Some(data) => {
                    weights.push(Some(Cow::Borrowed(data)));
                    placements.push(Placement::Weight(t));
                }
                None => {
                    weights.push(None);
                    placements.push(Placement::Unallocated);
                }
            }
        }
        if corrected > 0 {
            tracing::info!("corrected byte order of {corrected} weight tensors");
        }

        tracing::debug!(
            "interpreter over {} tensors, {} operators, {} byte arena",
            subgraph.tensors.len(),
            subgraph.operators.len(),
            arena.capacity(),
        );
        self.subgraph = subgraph;
        self.arena = Some(arena);
        self.storage_alias = vec![None; subgraph.tensors.len()];
        self.weights = weights;
        self.placements = placements;
        Ok(())
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Resolves every operator, runs Init and Prepare on every node, and
    /// lays out all tensors in the arena.
    ///
    /// Calling this again after it succeeded does nothing. After a failure,
    /// the node states are released and a later call starts over.
    pub fn allocate_tensors(&mut self) -> Result<(), RuntimeError> {
        let result = self.allocate_inner();
        if let Err(e) = &result {
            self.reporter.report(format_args!("{e}"));
        }
        result
    }

    fn allocate_inner(&mut self) -> Result<(), RuntimeError> {
        if self.init_error.is_some() {
            return Err(RuntimeError::InvokeAfterFailedInit);
        }
        if self.tensors_allocated {
            return Ok(());
        }
        let result = self.allocate_phases();
        self.bridge.set_node_index(None);
        if result.is_err() {
            self.tensors_allocated = false;
            self.release_nodes();
            self.bridge.set_phase(Phase::Idle);
        }
        result
    }

    fn allocate_phases(&mut self) -> Result<(), RuntimeError> {
        let (graph, subgraph, reporter, resolver) =
            (self.graph, self.subgraph, self.reporter, self.resolver);
        let Some(arena) = self.arena.as_mut() else {
            return Err(RuntimeError::InvokeAfterFailedInit);
        };
        arena.reset();
        self.storage_alias.fill(None);
        for placement in &mut self.placements {
            if let Placement::Arena(_) = placement {
                *placement = Placement::Unallocated;
            }
        }

        // Resolve everything before any kernel runs.
        let mut registrations = Vec::with_capacity(subgraph.operators.len());
        for (i, op) in subgraph.operators.iter().enumerate() {
            let code = graph.opcode_of(op);
            let registration = resolver.find(code).ok_or_else(|| {
                RuntimeError::OperatorResolutionFailure {
                    node: i,
                    op: code.name().to_string(),
                }
            })?;
            registrations.push(registration);
        }

        self.bridge.set_phase(Phase::Init);
        for (i, registration) in registrations.into_iter().enumerate() {
            self.bridge.set_node_index(Some(i));
            let mut ctx = InitContext::new(&self.bridge, arena, reporter);
            let state = registration
                .kernel
                .init(&mut ctx, &subgraph.operators[i].options)
                .map_err(|e| classify(i, registration, e, Phase::Init))?;
            self.nodes.push(NodeAndRegistration {
                index: i,
                registration,
                state,
            });
        }

        self.bridge.set_phase(Phase::Prepare);
        let last_node = subgraph.operators.len().saturating_sub(1);
        for node in &mut self.nodes {
            self.bridge.set_node_index(Some(node.index));
            let mut ctx = PrepareContext::new(
                &self.bridge,
                arena,
                reporter,
                &subgraph.operators[node.index],
                &subgraph.tensors,
                &self.placements,
                &mut self.storage_alias,
                last_node,
            );
            node.registration
                .kernel
                .prepare(&mut ctx, &mut node.state)
                .map_err(|e| classify(node.index, node.registration, e, Phase::Prepare))?;
        }
        self.bridge.set_node_index(None);

        self.bridge.set_phase(Phase::Invoke);
        let lifetimes = tensor_lifetimes(subgraph, &self.storage_alias);
        for (t, def) in subgraph.tensors.iter().enumerate() {
            if self.placements[t] != Placement::Unallocated || self.storage_alias[t].is_some() {
                continue;
            }
            let live = lifetimes[t].unwrap_or(LiveRange::at(0));
            self.placements[t] = Placement::Arena(arena.plan_tensor(live, def.size_bytes())?);
        }
        arena.finish_tensor_allocation()?;
        for t in 0..subgraph.tensors.len() {
            if let Some(root) = self.storage_alias[t] {
                self.placements[t] = self.placements[root];
            }
        }

        tracing::info!("{}", arena.stats().summary());
        self.reset_variables()?;
        self.tensors_allocated = true;
        Ok(())
    }

    /// Runs every node once, in graph order.
    pub fn invoke(&mut self) -> Result<(), RuntimeError> {
        self.invoke_with(&mut NoopHook)
    }

    /// Runs every node once, calling `hook` around the invoke and around
    /// each node that has invoke work.
    ///
    /// A kernel returning [`KernelError::Status`] stops the run and its
    /// status is returned unchanged as [`RuntimeError::KernelStatus`],
    /// without a diagnostic.
    pub fn invoke_with(&mut self, hook: &mut dyn BenchmarkHook) -> Result<(), RuntimeError> {
        if self.init_error.is_some() {
            self.reporter
                .report(format_args!("Invoke() called after initialization failed"));
            return Err(RuntimeError::InvokeAfterFailedInit);
        }
        let result = match self.allocate_inner() {
            Ok(()) => self.run_nodes(hook),
            Err(e) => Err(e),
        };
        match &result {
            Ok(()) | Err(RuntimeError::KernelStatus(_)) => {}
            Err(e) => self.reporter.report(format_args!("{e}")),
        }
        result
    }

    fn run_nodes(&mut self, hook: &mut dyn BenchmarkHook) -> Result<(), RuntimeError> {
        let (graph, subgraph, reporter) = (self.graph, self.subgraph, self.reporter);
        let Some(arena) = self.arena.as_mut() else {
            return Err(RuntimeError::InvokeAfterFailedInit);
        };

        hook.invoke_started();
        for node in &mut self.nodes {
            let kernel = node.registration.kernel;
            if !kernel.has_invoke() {
                continue;
            }
            let op = &subgraph.operators[node.index];
            let name = graph.opcode_of(op).name();

            self.bridge.set_node_index(Some(node.index));
            hook.node_started(node.index, name);
            let mut ctx = InvokeContext::new(
                &self.bridge,
                arena,
                reporter,
                op,
                &subgraph.tensors,
                &self.placements,
                &self.weights,
            );
            let status = kernel.invoke(&mut ctx, &mut node.state);
            hook.node_finished(node.index, name);

            if let Err(e) = status {
                self.bridge.set_node_index(None);
                return Err(match e {
                    KernelError::Status(s) => RuntimeError::KernelStatus(s),
                    source => RuntimeError::NodeInvokeFailure {
                        node: node.index,
                        op: name.to_string(),
                        source,
                    },
                });
            }
        }
        self.bridge.set_node_index(None);
        hook.invoke_finished();
        Ok(())
    }

    /// Resets every variable tensor to its zero point (8-bit quantized
    /// tensors) or to zero. Stops at the first failure; tensors already
    /// reset stay reset.
    pub fn reset_variable_tensors(&mut self) -> Result<(), RuntimeError> {
        let result = if self.init_error.is_some() {
            Err(RuntimeError::InvokeAfterFailedInit)
        } else {
            self.reset_variables()
        };
        if let Err(e) = &result {
            self.reporter.report(format_args!("{e}"));
        }
        result
    }

    fn reset_variables(&mut self) -> Result<(), RuntimeError> {
        let subgraph = self.subgraph;
        for (t, def) in subgraph.tensors.iter().enumerate() {
            if !def.is_variable {
                continue;
            }
            let failure = |detail: &str| RuntimeError::VariableResetFailure {
                index: t,
                detail: detail.to_string(),
            };
            match (self.placements[t], self.arena.as_mut()) {
                (Placement::Arena(id), Some(arena)) => {
                    let data = arena.buffer_mut(id).map_err(|e| failure(&e.to_string()))?;
                    data.fill(def.reset_byte());
                }
                (Placement::Weight(_), _) => return Err(failure("tensor is a read-only weight")),
                _ => return Err(failure("tensor is not allocated")),
            }
        }
        Ok(())
    }

    fn release_nodes(&mut self) {
        for node in self.nodes.drain(..) {
            node.registration.kernel.free(node.state);
        }
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Read-only view of graph input `index`.
    pub fn input(&self, index: usize) -> Result<TensorRef<'_>, RuntimeError> {
        let t = self.list_entry(&self.subgraph.inputs, "Input", index)?;
        self.view(t)
    }

    /// Writable view of graph input `index`.
    pub fn input_mut(&mut self, index: usize) -> Result<TensorMut<'_>, RuntimeError> {
        let t = self.list_entry(&self.subgraph.inputs, "Input", index)?;
        self.view_mut(t)
    }

    /// Read-only view of graph output `index`.
    pub fn output(&self, index: usize) -> Result<TensorRef<'_>, RuntimeError> {
        let t = self.list_entry(&self.subgraph.outputs, "Output", index)?;
        self.view(t)
    }

    /// Read-only view of any tensor.
    pub fn tensor(&self, index: usize) -> Result<TensorRef<'_>, RuntimeError> {
        self.check_tensor_index(index)?;
        self.view(index)
    }

    /// Writable view of any arena tensor.
    pub fn tensor_mut(&mut self, index: usize) -> Result<TensorMut<'_>, RuntimeError> {
        self.check_tensor_index(index)?;
        self.view_mut(index)
    }

    /// Metadata of any tensor.
    pub fn tensor_def(&self, index: usize) -> Result<&'m TensorDef, RuntimeError> {
        self.check_tensor_index(index)?;
        let subgraph = self.subgraph;
        Ok(&subgraph.tensors[index])
    }

    pub fn inputs_size(&self) -> usize {
        self.subgraph.inputs.len()
    }

    pub fn outputs_size(&self) -> usize {
        self.subgraph.outputs.len()
    }

    pub fn tensors_size(&self) -> usize {
        self.subgraph.tensors.len()
    }

    pub fn node_count(&self) -> usize {
        self.subgraph.operators.len()
    }

    /// The operator name of node `node`: a builtin's canonical name or the
    /// custom operator's name.
    pub fn operator_name(&self, node: usize) -> Option<&'m str> {
        let graph = self.graph;
        self.subgraph
            .operators
            .get(node)
            .map(|op| graph.opcode_of(op).name())
    }

    /// Resolved nodes, in graph order. Empty until tensors are allocated.
    pub fn nodes(&self) -> &[NodeAndRegistration<'m>] {
        &self.nodes
    }

    /// The construction error, if construction failed.
    pub fn initialization_status(&self) -> Result<(), &RuntimeError> {
        match &self.init_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn tensors_allocated(&self) -> bool {
        self.tensors_allocated
    }

    pub fn phase(&self) -> Phase {
        self.bridge.phase()
    }

    /// Arena usage snapshot.
    pub fn arena_stats(&self) -> ArenaStats {
        self.arena.as_ref().map(Arena::stats).unwrap_or_default()
    }

    /// Bytes of the arena in use at either end.
    pub fn arena_used_bytes(&self) -> usize {
        self.arena_stats().used_bytes()
    }

    /// Worker threads this interpreter uses. Execution is single-threaded.
    pub fn recommended_num_threads(&self) -> usize {
        1
    }

    fn list_entry(&self, list: &[usize], kind: &'static str, index: usize) -> Result<usize, RuntimeError> {
        list.get(index).copied().ok_or_else(|| {
            self.reporter.report(format_args!(
                "{kind} index {index} out of range (length is {})",
                list.len()
            ));
            RuntimeError::IndexOutOfRange {
                kind,
                index,
                len: list.len(),
            }
        })
    }

    fn check_tensor_index(&self, index: usize) -> Result<(), RuntimeError> {
        let len = self.subgraph.tensors.len();
        if index < len {
            return Ok(());
        }
        self.reporter.report(format_args!(
            "Tensor index {index} out of range (length is {len})"
        ));
        Err(RuntimeError::IndexOutOfRange {
            kind: "Tensor",
            index,
            len,
        })
    }

    fn view(&self, t: usize) -> Result<TensorRef<'_>, RuntimeError> {
        let def = &self.subgraph.tensors[t];
        let data: &[u8] = match (self.placements[t], self.arena.as_ref()) {
            (Placement::Weight(root), _) => self.weights[root].as_deref().unwrap_or_default(),
            (Placement::Arena(id), Some(arena)) if self.tensors_allocated => arena.buffer(id)?,
            _ => return Err(self.not_allocated(t)),
        };
        Ok(TensorRef::new(def.dtype, &def.shape, data)?)
    }

    fn view_mut(&mut self, t: usize) -> Result<TensorMut<'_>, RuntimeError> {
        let subgraph = self.subgraph;
        let def = &subgraph.tensors[t];
        match self.placements[t] {
            Placement::Weight(_) => {
                self.reporter.report(format_args!("Tensor {t} is read-only"));
                Err(RuntimeError::ReadOnlyTensor(t))
            }
            Placement::Arena(id) if self.tensors_allocated && self.arena.is_some() => {
                let arena = self.arena.as_mut().ok_or(RuntimeError::TensorNotAllocated(t))?;
                Ok(TensorMut::new(def.dtype, &def.shape, arena.buffer_mut(id)?)?)
            }
            _ => Err(self.not_allocated(t)),
        }
    }

    fn not_allocated(&self, t: usize) -> RuntimeError {
        self.reporter.report(format_args!(
            "Tensor {t} has no data; call allocate_tensors() first"
        ));
        RuntimeError::TensorNotAllocated(t)
    }
}

impl Drop for Interpreter<'_, '_> {
    fn drop(&mut self) {
        self.release_nodes();
    }
}

impl std::fmt::Debug for Interpreter<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("phase", &self.bridge.phase())
            .field("tensors", &self.subgraph.tensors.len())
            .field("nodes", &self.subgraph.operators.len())
            .field("tensors_allocated", &self.tensors_allocated)
            .field("init_error", &self.init_error)
            .finish()
    }
}

/// Maps a kernel failure during Init or Prepare to the interpreter error.
fn classify(node: usize, registration: Registration<'_>, error: KernelError, phase: Phase) -> RuntimeError {
    let op = registration.op.name().to_string();
    match (error, phase) {
        (KernelError::Arena(e), _) => RuntimeError::AllocationFailure(e),
        (source, Phase::Init) => RuntimeError::NodeInitFailure { node, op, source },
        (source, _) => RuntimeError::NodePrepareFailure { node, op, source },
    }
}

/// Computes each storage root's live range over node indices. Tensors that
/// share storage extend their root's range.
fn tensor_lifetimes(subgraph: &Subgraph, storage_alias: &[Option<usize>]) -> Vec<Option<LiveRange>> {
    let root = |t: usize| storage_alias[t].unwrap_or(t);
    let mut ranges: Vec<Option<(usize, usize)>> = vec![None; subgraph.tensors.len()];
    let mut touch = |t: usize, first: usize, last: usize| {
        let r = &mut ranges[root(t)];
        *r = Some(match *r {
            Some((f, l)) => (f.min(first), l.max(last)),
            None => (first, last),
        });
    };

    let last_node = subgraph.operators.len().saturating_sub(1);
    for &t in subgraph.inputs.iter().chain(&subgraph.outputs) {
        touch(t, 0, last_node);
    }
    for (t, def) in subgraph.tensors.iter().enumerate() {
        if def.is_variable {
            touch(t, 0, last_node);
        }
    }
    for (i, op) in subgraph.operators.iter().enumerate() {
        for t in op.tensor_indices() {
            touch(t, i, i);
        }
    }

    ranges
        .into_iter()
        .map(|r| r.map(|(first, last)| LiveRange { first, last }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{BuiltinOperator, OperatorDef};
    use tensor_core::{DType, Shape};

    fn chain(n: usize) -> Subgraph {
        Subgraph {
            name: "chain".into(),
            tensors: (0..=n)
                .map(|_| TensorDef::activation(DType::F32, Shape::vector(4)))
                .collect(),
            operators: (0..n).map(|i| OperatorDef::new(0, vec![i], vec![i + 1])).collect(),
            inputs: vec![0],
            outputs: vec![n],
        }
    }

    #[test]
    fn test_lifetimes_chain() {
        let sg = chain(4);
        let ranges = tensor_lifetimes(&sg, &[None; 5]);
        assert_eq!(ranges[0], Some(LiveRange { first: 0, last: 3 }));
        assert_eq!(ranges[1], Some(LiveRange { first: 0, last: 1 }));
        assert_eq!(ranges[2], Some(LiveRange { first: 1, last: 2 }));
        assert_eq!(ranges[4], Some(LiveRange { first: 0, last: 3 }));
    }

    #[test]
    fn test_lifetimes_shared_storage_extends_root() {
        let sg = chain(3);
        let alias = [None, None, Some(1), None];
        let ranges = tensor_lifetimes(&sg, &alias);
        assert_eq!(ranges[1], Some(LiveRange { first: 0, last: 2 }));
        assert_eq!(ranges[2], None);
    }

    #[test]
    fn test_lifetimes_variables_span_graph() {
        let mut sg = chain(3);
        sg.tensors.push(TensorDef::activation(DType::I8, Shape::vector(2)).variable());
        sg.operators[1].inputs.push(4);
        let ranges = tensor_lifetimes(&sg, &[None; 5]);
        assert_eq!(ranges[4], Some(LiveRange { first: 0, last: 2 }));
    }

    #[test]
    fn test_lifetimes_unused_tensor() {
        let mut sg = chain(1);
        sg.tensors.push(TensorDef::activation(DType::F32, Shape::scalar()));
        let ranges = tensor_lifetimes(&sg, &[None; 3]);
        assert_eq!(ranges[2], None);
    }

    #[test]
    fn test_classify() {
        struct K;
        impl crate::Kernel for K {
            fn invoke(&self, _: &mut InvokeContext<'_, '_>, _: &mut NodeState) -> Result<(), KernelError> {
                Ok(())
            }
        }
        let op = BuiltinOperator::Conv2d.into();
        let registration = Registration { op: &op, kernel: &K };

        let err = classify(2, registration, KernelError::failed("bad shape"), Phase::Prepare);
        assert!(matches!(err, RuntimeError::NodePrepareFailure { node: 2, ref op, .. } if op == "CONV_2D"));

        let err = classify(
            0,
            registration,
            memory_manager::ArenaError::ZeroSizedArena.into(),
            Phase::Init,
        );
        assert!(matches!(err, RuntimeError::AllocationFailure(_)));

        let err = classify(1, registration, KernelError::failed("x"), Phase::Init);
        assert!(matches!(err, RuntimeError::NodeInitFailure { node: 1, .. }));
    }

    #[test]
    fn test_failed_variable_reset_leaves_tensors_unallocated() {
        use std::cell::Cell;
        use std::rc::Rc;

        struct Count(Rc<Cell<usize>>);
        impl crate::Kernel for Count {
            fn invoke(&self, _: &mut InvokeContext<'_, '_>, _: &mut NodeState) -> Result<(), KernelError> {
                self.0.set(self.0.get() + 1);
                Ok(())
            }
        }

        let mut sg = chain(1);
        sg.tensors.push(TensorDef::activation(DType::I8, Shape::vector(4)).variable());
        let graph = ModelGraph::new(
            SCHEMA_VERSION,
            "reset",
            vec![BuiltinOperator::Add.into()],
            Vec::new(),
            vec![sg],
        )
        .validate()
        .unwrap();
        let invokes = Rc::new(Cell::new(0));
        let mut resolver = crate::MutableOpResolver::new();
        resolver.add_builtin(BuiltinOperator::Add, Count(invokes.clone()));
        let mut arena = vec![0u8; 1024];
        let mut interpreter = Interpreter::new(&graph, &resolver, &mut arena);
        // Pin the variable to read-only storage so its reset fails after
        // every node has been prepared.
        interpreter.placements[2] = Placement::Weight(2);

        let err = interpreter.allocate_tensors().unwrap_err();
        assert!(matches!(err, RuntimeError::VariableResetFailure { index: 2, .. }));
        assert!(!interpreter.tensors_allocated());
        assert!(interpreter.nodes().is_empty());

        assert!(matches!(
            interpreter.invoke(),
            Err(RuntimeError::VariableResetFailure { index: 2, .. })
        ));
        assert_eq!(invokes.get(), 0);
        assert!(!interpreter.tensors_allocated());
    }
}
