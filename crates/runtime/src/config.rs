// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! model_path = "./models/add.json"
//! arena_size = "60K"
//! profile_layers = true
//! report_layers = false
//! ```

use crate::RuntimeError;
use memory_manager::ArenaSize;
use std::path::{Path, PathBuf};

/// Configuration for a host running the interpreter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Path to the JSON model manifest.
    pub model_path: PathBuf,
    /// Tensor arena size (human-readable, e.g. `"60K"`).
    #[serde(default = "default_arena_size")]
    pub arena_size: String,
    /// Attach a layer profiler to every invoke.
    #[serde(default)]
    pub profile_layers: bool,
    /// Log each layer's time as it finishes (implies profiling).
    #[serde(default)]
    pub report_layers: bool,
}

fn default_arena_size() -> String {
    "60K".to_string()
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str).map_err(|e| RuntimeError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the arena size string.
    pub fn parse_arena_size(&self) -> Result<ArenaSize, RuntimeError> {
        ArenaSize::parse(&self.arena_size)
            .map_err(|e| RuntimeError::Config(format!("invalid arena size: {e}")))
    }

    /// Allocates a zeroed buffer of the configured arena size. This is the
    /// only host allocation the arena ever needs.
    pub fn allocate_arena(&self) -> Result<Vec<u8>, RuntimeError> {
        Ok(vec![0u8; self.parse_arena_size()?.as_bytes()])
    }

    /// Whether a profiler should be attached.
    pub fn profiling_enabled(&self) -> bool {
        self.profile_layers || self.report_layers
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/model.json"),
            arena_size: default_arena_size(),
            profile_layers: false,
            report_layers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = RuntimeConfig::default();
        assert_eq!(c.arena_size, "60K");
        assert_eq!(c.parse_arena_size().unwrap().as_bytes(), 60 * 1024);
        assert!(!c.profiling_enabled());
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
model_path = "/tmp/model.json"
arena_size = "2M"
report_layers = true
"#;
        let c = RuntimeConfig::from_toml(toml).unwrap();
        assert_eq!(c.model_path, PathBuf::from("/tmp/model.json"));
        assert_eq!(c.parse_arena_size().unwrap().as_bytes(), 2 * 1024 * 1024);
        assert!(!c.profile_layers);
        assert!(c.profiling_enabled());
    }

    #[test]
    fn test_arena_size_defaults_when_missing() {
        let c = RuntimeConfig::from_toml("model_path = \"m.json\"").unwrap();
        assert_eq!(c.arena_size, "60K");
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = RuntimeConfig {
            arena_size: "128K".into(),
            profile_layers: true,
            ..Default::default()
        };
        let back = RuntimeConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_invalid_arena_size() {
        let c = RuntimeConfig {
            arena_size: "lots".into(),
            ..Default::default()
        };
        assert!(matches!(c.parse_arena_size(), Err(RuntimeError::Config(_))));
        assert!(c.allocate_arena().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(RuntimeConfig::from_toml("model_path = ").is_err());
    }

    #[test]
    fn test_allocate_arena() {
        let c = RuntimeConfig {
            arena_size: "4K".into(),
            ..Default::default()
        };
        assert_eq!(c.allocate_arena().unwrap().len(), 4096);
    }
}
