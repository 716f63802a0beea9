//! Compilation parameters forwarded to the policy compiler.

use std::collections::BTreeSet;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// Rego language and runtime compatibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegoVersion {
    /// Pre OPA v1.0 syntax.
    Legacy,
    /// OPA v1.0 syntax.
    #[default]
    V1,
}

/// Options for one compiler invocation.
///
/// Values are replaced, never mutated in place: the configurator builds a new
/// value for every update so clones handed to a compiler stay stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilationParameters {
    /// Interpret the source as a bundle rather than a single file.
    pub is_bundle: bool,

    /// Output bundle revision.
    pub revision: Option<String>,

    /// Documents that will be queried for policy decisions.
    pub entrypoints: Option<BTreeSet<String>>,

    /// Capabilities file path.
    pub capabilities_file_path: Option<String>,

    /// Capabilities JSON content.
    #[serde(skip)]
    pub capabilities_bytes: Option<Bytes>,

    /// Emit debug information in the compiled output.
    pub debug: bool,

    /// Drop rules not reachable from the entrypoints.
    pub prune_unused: bool,

    /// File patterns the compiler skips when loading a bundle.
    pub ignore: BTreeSet<String>,

    /// Language compatibility of the sources.
    pub rego_version: RegoVersion,
}

impl CompilationParameters {
    /// Parse parameters from YAML (or JSON, which is a YAML subset).
    pub fn from_yaml_str(text: &str) -> CompileResult<Self> {
        serde_yaml::from_str(text).map_err(|e| CompileError::Config {
            message: format!("failed to parse compilation parameters: {}", e),
        })
    }

    /// Load parameters from a YAML or JSON file.
    pub fn load(path: impl AsRef<Path>) -> CompileResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CompileError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&text)
    }

    /// Entrypoints in sorted order, empty when none were set.
    pub fn entrypoints(&self) -> impl Iterator<Item = &str> {
        self.entrypoints.iter().flatten().map(String::as_str)
    }
}
