// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for tensor allocation and invoke over an ADD chain.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use model_ir::{BuiltinOperator, ModelGraph, OperatorDef, Subgraph, TensorDef};
use runtime::{Interpreter, InvokeContext, Kernel, KernelError, MutableOpResolver, NodeState};
use tensor_core::{DType, Shape};

struct AddOne;

impl Kernel for AddOne {
    fn invoke(&self, ctx: &mut InvokeContext<'_, '_>, _: &mut NodeState) -> Result<(), KernelError> {
        let mut buffers = ctx.node_buffers(&[])?;
        let input = buffers.input(0)?;
        buffers.output(0)?.write_from(input.values::<f32>()?.map(|v| v + 1.0))?;
        Ok(())
    }
}

fn add_chain(nodes: usize, width: usize) -> model_ir::ModelGraph<model_ir::graph::Validated> {
    let subgraph = Subgraph {
        name: "chain".into(),
        tensors: (0..=nodes)
            .map(|_| TensorDef::activation(DType::F32, Shape::vector(width)))
            .collect(),
        operators: (0..nodes)
            .map(|i| OperatorDef::new(0, vec![i], vec![i + 1]))
            .collect(),
        inputs: vec![0],
        outputs: vec![nodes],
    };
    ModelGraph::new(
        model_ir::SCHEMA_VERSION,
        "bench".into(),
        vec![BuiltinOperator::Add.into()],
        Vec::new(),
        vec![subgraph],
    )
    .validate()
    .expect("valid chain")
}

fn resolver() -> MutableOpResolver {
    let mut resolver = MutableOpResolver::new();
    resolver.add_builtin(BuiltinOperator::Add, AddOne);
    resolver
}

fn bench_allocate(c: &mut Criterion) {
    let resolver = resolver();
    let mut group = c.benchmark_group("allocate_tensors");
    for nodes in [8, 64] {
        let graph = add_chain(nodes, 256);
        let mut arena = vec![0u8; 64 * 1024];
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &graph, |b, graph| {
            b.iter(|| {
                let mut interpreter = Interpreter::new(graph, &resolver, &mut arena);
                interpreter.allocate_tensors().expect("fits");
                black_box(interpreter.arena_used_bytes())
            })
        });
    }
    group.finish();
}

fn bench_invoke(c: &mut Criterion) {
    let resolver = resolver();
    let mut group = c.benchmark_group("invoke");
    for nodes in [8, 64] {
        let graph = add_chain(nodes, 256);
        let mut arena = vec![0u8; 64 * 1024];
        let mut interpreter = Interpreter::new(&graph, &resolver, &mut arena);
        interpreter.allocate_tensors().expect("fits");
        group.bench_function(BenchmarkId::from_parameter(nodes), |b| {
            b.iter(|| interpreter.invoke().expect("invoke"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_allocate, bench_invoke);
criterion_main!(benches);
