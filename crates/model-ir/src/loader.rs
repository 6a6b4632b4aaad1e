// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model loading from a JSON manifest.
//!
//! The loader turns a [`ModelManifest`] into a [`ModelGraph`]: operator
//! names are resolved to [`OpCode`]s, typed buffer lists are encoded
//! little-endian and the empty sentinel buffer is prepended, shifting every
//! manifest buffer index up by one.

use crate::graph::{Loaded, Validated};
use crate::manifest::{OpCodeEntry, SubgraphManifest};
use crate::tensor::EMPTY_BUFFER;
use crate::{
    BuiltinOperator, ModelError, ModelGraph, ModelManifest, OpCode, OperatorDef, Subgraph,
    TensorDef,
};
use std::path::Path;

/// Loads model graphs from JSON manifests.
///
/// # Example
/// ```no_run
/// use model_ir::ModelLoader;
/// use std::path::Path;
///
/// let graph = ModelLoader::load(Path::new("./models/add.json")).unwrap();
/// println!("{}", graph.summary());
/// ```
pub struct ModelLoader;

impl ModelLoader {
    /// Loads and validates a model from a manifest file.
    pub fn load(path: &Path) -> Result<ModelGraph<Validated>, ModelError> {
        let manifest = ModelManifest::from_file(path)?;
        let graph = Self::from_manifest(&manifest)?.validate()?;
        tracing::info!("loaded {} from {}", graph.summary(), path.display());
        Ok(graph)
    }

    /// Decodes a manifest from a JSON string, without validating it.
    pub fn from_json_str(json: &str) -> Result<ModelGraph<Loaded>, ModelError> {
        Self::from_manifest(&ModelManifest::from_json(json)?)
    }

    /// Builds an unvalidated graph from a parsed manifest.
    pub fn from_manifest(manifest: &ModelManifest) -> Result<ModelGraph<Loaded>, ModelError> {
        let operator_codes = manifest
            .operator_codes
            .iter()
            .map(|entry| match entry {
                OpCodeEntry::Builtin(name) => BuiltinOperator::from_name(name)
                    .map(OpCode::Builtin)
                    .ok_or_else(|| ModelError::UnknownOperator(name.clone())),
                OpCodeEntry::Custom { custom } => Ok(OpCode::Custom(custom.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut buffers = Vec::with_capacity(manifest.buffers.len() + 1);
        buffers.push(Vec::new());
        buffers.extend(manifest.buffers.iter().map(|b| b.to_le_bytes()));

        let subgraphs = manifest.subgraphs.iter().map(build_subgraph).collect();

        Ok(ModelGraph::new(
            manifest.version,
            manifest.description.clone(),
            operator_codes,
            buffers,
            subgraphs,
        ))
    }
}

fn build_subgraph(sg: &SubgraphManifest) -> Subgraph {
    let tensors = sg
        .tensors
        .iter()
        .map(|t| TensorDef {
            name: t.name.clone(),
            dtype: t.dtype,
            shape: t.shape.clone(),
            buffer: t.buffer.map_or(EMPTY_BUFFER, |b| b + 1),
            is_variable: t.variable,
            zero_point: t.zero_point,
        })
        .collect();

    let operators = sg
        .operators
        .iter()
        .map(|op| {
            OperatorDef::new(op.opcode, op.inputs.clone(), op.outputs.clone())
                .with_options(op.options.as_ref().map(|o| o.to_le_bytes()).unwrap_or_default())
        })
        .collect();

    Subgraph {
        name: sg.name.clone(),
        tensors,
        operators,
        inputs: sg.inputs.clone(),
        outputs: sg.outputs.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::DType;

    const ADD_CONST: &str = r#"{
        "description": "add constant",
        "operator_codes": ["ADD"],
        "buffers": [{"f32": [1.0, 1.0, 1.0, 1.0]}],
        "subgraphs": [{
            "name": "main",
            "tensors": [
                {"name": "x", "dtype": "f32", "shape": [4]},
                {"name": "one", "dtype": "f32", "shape": [4], "buffer": 0},
                {"name": "y", "dtype": "f32", "shape": [4]}
            ],
            "operators": [{"opcode": 0, "inputs": [0, 1], "outputs": [2], "options": {"bytes": [7]}}],
            "inputs": [0],
            "outputs": [2]
        }]
    }"#;

    #[test]
    fn test_from_json_str() {
        let graph = ModelLoader::from_json_str(ADD_CONST).unwrap().validate().unwrap();
        assert_eq!(graph.buffers.len(), 2);
        let sg = graph.subgraph(0).unwrap();
        assert_eq!(sg.tensors[1].buffer, 1);
        assert_eq!(sg.tensors[0].buffer, EMPTY_BUFFER);
        assert_eq!(sg.tensors[1].dtype, DType::F32);
        assert_eq!(sg.operators[0].options, vec![7]);
        assert_eq!(
            graph.weight_data(&sg.tensors[1]).unwrap(),
            [0u8, 0, 0x80, 0x3F].repeat(4).as_slice()
        );
    }

    #[test]
    fn test_unknown_builtin() {
        let json = ADD_CONST.replace("\"ADD\"", "\"WARP_DRIVE\"");
        assert!(matches!(
            ModelLoader::from_json_str(&json),
            Err(ModelError::UnknownOperator(name)) if name == "WARP_DRIVE"
        ));
    }

    #[test]
    fn test_bad_buffer_index_caught_by_validate() {
        let json = ADD_CONST.replace("\"buffer\": 0", "\"buffer\": 4");
        let graph = ModelLoader::from_json_str(&json).unwrap();
        assert!(matches!(
            graph.validate(),
            Err(ModelError::InvalidTensor { index: 1, .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            ModelLoader::load(Path::new("/nonexistent/model.json")),
            Err(ModelError::ReadError(_))
        ));
    }
}
