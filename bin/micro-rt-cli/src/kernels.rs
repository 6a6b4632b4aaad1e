// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference f32 kernels used by `micro-rt run`.
//!
//! | Operator          | Inputs                      | Notes                          |
//! |-------------------|-----------------------------|--------------------------------|
//! | `ADD`             | `a` or `a, b`               | options: optional f32 constant |
//! | `RELU`            | `x`                         |                                |
//! | `RESHAPE`         | `x`                         | shares storage, no invoke work |
//! | `FULLY_CONNECTED` | `x, weights[out, in], bias?`| accumulates in scratch         |

use model_ir::BuiltinOperator;
use runtime::{
    InitContext, InvokeContext, Kernel, KernelError, MutableOpResolver, NodeState, PrepareContext,
};
use tensor_core::DType;

/// Builds a resolver holding every reference kernel.
pub fn reference_resolver() -> MutableOpResolver {
    let mut resolver = MutableOpResolver::new();
    resolver
        .add_builtin(BuiltinOperator::Add, Add)
        .add_builtin(BuiltinOperator::Relu, Relu)
        .add_builtin(BuiltinOperator::Reshape, Reshape)
        .add_builtin(BuiltinOperator::FullyConnected, FullyConnected);
    resolver
}

fn require_f32(ctx: &PrepareContext<'_, '_>) -> Result<(), KernelError> {
    for k in 0..ctx.num_inputs() {
        let def = ctx.input_def(k)?;
        if def.dtype != DType::F32 {
            return Err(KernelError::failed(format!("input {k} is {}, expected f32", def.dtype.as_str())));
        }
    }
    for k in 0..ctx.num_outputs() {
        if ctx.output_def(k)?.dtype != DType::F32 {
            return Err(KernelError::failed(format!("output {k} is not f32")));
        }
    }
    Ok(())
}

// ── ADD ────────────────────────────────────────────────────────────

struct Add;

impl Kernel for Add {
    fn init(&self, _: &mut InitContext<'_, '_>, options: &[u8]) -> Result<NodeState, KernelError> {
        let constant = match *options {
            [] => 0.0,
            [a, b, c, d, ..] => f32::from_le_bytes([a, b, c, d]),
            _ => return Err(KernelError::failed("ADD options must hold one f32")),
        };
        Ok(NodeState::new(constant))
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_, '_>, _: &mut NodeState) -> Result<(), KernelError> {
        require_f32(ctx)?;
        let out = ctx.output_def(0)?.num_elements();
        for k in 0..ctx.num_inputs() {
            let n = ctx.input_def(k)?.num_elements();
            if n != out && n != 1 {
                return Err(KernelError::failed(format!(
                    "input {k} has {n} elements, output has {out}"
                )));
            }
        }
        Ok(())
    }

    fn invoke(&self, ctx: &mut InvokeContext<'_, '_>, state: &mut NodeState) -> Result<(), KernelError> {
        let constant = state.get::<f32>().copied().unwrap_or_default();
        let mut buffers = ctx.node_buffers(&[])?;
        let a = buffers.input(0)?;
        let b = match buffers.num_inputs() {
            1 => None,
            _ => Some(buffers.input(1)?),
        };
        let mut out = buffers.output(0)?;
        for i in 0..out.num_elements() {
            let x = a.get::<f32>(i % a.num_elements())?;
            let y = match b {
                Some(b) => b.get::<f32>(i % b.num_elements())?,
                None => 0.0,
            };
            out.set(i, x + y + constant)?;
        }
        Ok(())
    }
}

// ── RELU ───────────────────────────────────────────────────────────

struct Relu;

impl Kernel for Relu {
    fn prepare(&self, ctx: &mut PrepareContext<'_, '_>, _: &mut NodeState) -> Result<(), KernelError> {
        require_f32(ctx)?;
        if ctx.input_def(0)?.num_elements() != ctx.output_def(0)?.num_elements() {
            return Err(KernelError::failed("RELU input and output differ in size"));
        }
        Ok(())
    }

    fn invoke(&self, ctx: &mut InvokeContext<'_, '_>, _: &mut NodeState) -> Result<(), KernelError> {
        let mut buffers = ctx.node_buffers(&[])?;
        let input = buffers.input(0)?;
        buffers
            .output(0)?
            .write_from(input.values::<f32>()?.map(|v| v.max(0.0)))?;
        Ok(())
    }
}

// ── RESHAPE ────────────────────────────────────────────────────────

struct Reshape;

impl Kernel for Reshape {
    fn prepare(&self, ctx: &mut PrepareContext<'_, '_>, _: &mut NodeState) -> Result<(), KernelError> {
        if ctx.input_is_constant(0)? {
            return Err(KernelError::failed("cannot reshape a weight tensor in place"));
        }
        ctx.share_input_storage(0, 0)
    }

    fn invoke(&self, _: &mut InvokeContext<'_, '_>, _: &mut NodeState) -> Result<(), KernelError> {
        Ok(())
    }

    fn has_invoke(&self) -> bool {
        false
    }
}

// ── FULLY_CONNECTED ────────────────────────────────────────────────

struct FullyConnected;

#[derive(Debug, Default)]
struct FcPlan {
    batch: usize,
    in_features: usize,
    out_features: usize,
    scratch: Option<memory_manager::BufferId>,
}

impl Kernel for FullyConnected {
    fn init(&self, _: &mut InitContext<'_, '_>, _: &[u8]) -> Result<NodeState, KernelError> {
        Ok(NodeState::new(FcPlan::default()))
    }

    fn prepare(&self, ctx: &mut PrepareContext<'_, '_>, state: &mut NodeState) -> Result<(), KernelError> {
        require_f32(ctx)?;
        let weights = ctx.input_def(1)?;
        let [out_features, in_features] = *weights.shape.dims() else {
            return Err(KernelError::failed(format!(
                "weights must be [out, in], got {}",
                weights.shape
            )));
        };
        let input = ctx.input_def(0)?.num_elements();
        if in_features == 0 || input % in_features != 0 {
            return Err(KernelError::failed(format!(
                "input of {input} elements does not split into rows of {in_features}"
            )));
        }
        let batch = input / in_features;
        if ctx.output_def(0)?.num_elements() != batch * out_features {
            return Err(KernelError::failed("output size does not match batch x out"));
        }
        if ctx.num_inputs() > 2 && ctx.input_def(2)?.num_elements() != out_features {
            return Err(KernelError::failed("bias must have one value per output"));
        }

        let scratch = ctx.request_scratch_buffer(out_features * DType::F32.size_bytes())?;
        let plan = state
            .get_mut::<FcPlan>()
            .ok_or_else(|| KernelError::failed("missing FULLY_CONNECTED state"))?;
        *plan = FcPlan {
            batch,
            in_features,
            out_features,
            scratch: Some(scratch),
        };
        tracing::debug!(batch, in_features, out_features, "fully connected planned");
        Ok(())
    }

    fn invoke(&self, ctx: &mut InvokeContext<'_, '_>, state: &mut NodeState) -> Result<(), KernelError> {
        let Some(&FcPlan {
            batch,
            in_features,
            out_features,
            scratch: Some(scratch),
        }) = state.get::<FcPlan>()
        else {
            return Err(KernelError::failed("FULLY_CONNECTED was not prepared"));
        };

        let mut buffers = ctx.node_buffers(&[scratch])?;
        let (x, w) = (buffers.input(0)?, buffers.input(1)?);
        let bias = match buffers.num_inputs() {
            n if n > 2 => Some(buffers.input(2)?),
            _ => None,
        };
        let acc = buffers
            .buffer(0)?
            .get_mut(..out_features * 4)
            .ok_or_else(|| KernelError::failed("scratch smaller than requested"))?;
        let mut out = buffers.output(0)?;

        for b in 0..batch {
            for (o, slot) in acc.chunks_exact_mut(4).enumerate() {
                let mut sum = match bias {
                    Some(bias) => bias.get::<f32>(o)?,
                    None => 0.0,
                };
                for i in 0..in_features {
                    sum += x.get::<f32>(b * in_features + i)? * w.get::<f32>(o * in_features + i)?;
                }
                slot.copy_from_slice(&sum.to_ne_bytes());
            }
            for (o, slot) in acc.chunks_exact(4).enumerate() {
                let value = f32::from_ne_bytes([slot[0], slot[1], slot[2], slot[3]]);
                out.set(b * out_features + o, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::ModelLoader;
    use runtime::{Interpreter, RuntimeError};

    fn run(json: &str, input: &[f32]) -> Result<Vec<f32>, RuntimeError> {
        let graph = ModelLoader::from_json_str(json)?.validate()?;
        let resolver = reference_resolver();
        let mut arena = vec![0u8; 4096];
        let mut interpreter = Interpreter::try_new(&graph, &resolver, &mut arena)?;
        interpreter.allocate_tensors()?;
        interpreter.input_mut(0)?.copy_from_slice(input)?;
        interpreter.invoke()?;
        let out = interpreter.output(0)?.to_vec::<f32>()?;
        Ok(out)
    }

    #[test]
    fn test_fully_connected_with_bias_then_relu() {
        let json = r#"{
            "operator_codes": ["FULLY_CONNECTED", "RELU"],
            "buffers": [{"f32": [1.0, 0.0, 0.0, 1.0, -1.0, -1.0]}, {"f32": [0.5, 0.5, 0.5]}],
            "subgraphs": [{
                "tensors": [
                    {"dtype": "f32", "shape": [1, 2]},
                    {"dtype": "f32", "shape": [3, 2], "buffer": 0},
                    {"dtype": "f32", "shape": [3], "buffer": 1},
                    {"dtype": "f32", "shape": [1, 3]},
                    {"dtype": "f32", "shape": [1, 3]}
                ],
                "operators": [
                    {"opcode": 0, "inputs": [0, 1, 2], "outputs": [3]},
                    {"opcode": 1, "inputs": [3], "outputs": [4]}
                ],
                "inputs": [0],
                "outputs": [4]
            }]
        }"#;
        assert_eq!(run(json, &[2.0, 3.0]).unwrap(), vec![2.5, 3.5, 0.0]);
    }

    #[test]
    fn test_add_broadcasts_scalar_and_constant() {
        let json = r#"{
            "operator_codes": ["ADD"],
            "buffers": [{"f32": [10.0]}],
            "subgraphs": [{
                "tensors": [
                    {"dtype": "f32", "shape": [3]},
                    {"dtype": "f32", "shape": [], "buffer": 0},
                    {"dtype": "f32", "shape": [3]}
                ],
                "operators": [{"opcode": 0, "inputs": [0, 1], "outputs": [2], "options": {"f32": [0.5]}}],
                "inputs": [0],
                "outputs": [2]
            }]
        }"#;
        assert_eq!(run(json, &[1.0, 2.0, 3.0]).unwrap(), vec![11.5, 12.5, 13.5]);
    }

    #[test]
    fn test_reshape_rejects_weight_input() {
        let json = r#"{
            "operator_codes": ["RESHAPE"],
            "buffers": [{"f32": [1.0, 2.0]}],
            "subgraphs": [{
                "tensors": [
                    {"dtype": "f32", "shape": [2], "buffer": 0},
                    {"dtype": "f32", "shape": [1, 2]},
                    {"dtype": "f32", "shape": [2]}
                ],
                "operators": [{"opcode": 0, "inputs": [0], "outputs": [1]}],
                "inputs": [2],
                "outputs": [1]
            }]
        }"#;
        assert!(matches!(
            run(json, &[0.0, 0.0]),
            Err(RuntimeError::NodePrepareFailure { node: 0, .. })
        ));
    }

    #[test]
    fn test_fully_connected_rejects_bad_weights() {
        let json = r#"{
            "operator_codes": ["FULLY_CONNECTED"],
            "buffers": [{"f32": [1.0, 2.0, 3.0]}],
            "subgraphs": [{
                "tensors": [
                    {"dtype": "f32", "shape": [2]},
                    {"dtype": "f32", "shape": [3], "buffer": 0},
                    {"dtype": "f32", "shape": [3]}
                ],
                "operators": [{"opcode": 0, "inputs": [0, 1], "outputs": [2]}],
                "inputs": [0],
                "outputs": [2]
            }]
        }"#;
        assert!(matches!(
            run(json, &[1.0, 1.0]),
            Err(RuntimeError::NodePrepareFailure { .. })
        ));
    }
}
