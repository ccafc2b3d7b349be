use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diagnostics::CompileError;

/// Analyzer settings. Every field has a default so an empty TOML document
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Marker type whose subtypes carry the serializable contract.
    pub serializable_marker: String,
    /// Root of the reference-type hierarchy.
    pub object_type: String,
    /// Root-object methods that interfaces may redeclare abstractly without
    /// affecting the single-abstract-method count.
    pub object_methods: Vec<ObjectMethod>,
    /// Worker threads for batch analysis. `None` uses available parallelism.
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMethod {
    pub name: String,
    pub arity: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            serializable_marker: "Serializable".to_string(),
            object_type: "Object".to_string(),
            object_methods: vec![
                ObjectMethod { name: "equals".to_string(), arity: 1 },
                ObjectMethod { name: "hashCode".to_string(), arity: 0 },
                ObjectMethod { name: "toString".to_string(), arity: 0 },
            ],
            threads: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, CompileError> {
        toml::from_str(content).map_err(|e| CompileError::config(format!("invalid config: {e}"), None))
    }

    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompileError::config(format!("cannot read config: {e}"), Some(path.to_path_buf()))
        })?;
        toml::from_str(&content).map_err(|e| {
            CompileError::config(format!("invalid config: {e}"), Some(path.to_path_buf()))
        })
    }

    pub fn is_object_method(&self, name: &str, arity: usize) -> bool {
        self.object_methods.iter().any(|m| m.name == name && m.arity == arity)
    }

    pub fn worker_threads(&self) -> usize {
        self.threads
            .filter(|n| *n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }
}
