use serde::{Deserialize, Serialize};

/// Archive entry name of the bundle manifest.
pub const MANIFEST_ENTRY: &str = "/.manifest";

/// OPA bundle manifest, written as a distinguished `/.manifest` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Bundle revision.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,

    /// Data paths owned by this bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<Vec<String>>,

    /// Entrypoint to wasm module mappings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub wasm: Vec<WasmResolver>,

    /// Rego language version of the bundle sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rego_version: Option<u32>,

    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Maps an entrypoint to the wasm module that evaluates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasmResolver {
    pub entrypoint: String,
    pub module: String,
}

impl BundleManifest {
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            ..Default::default()
        }
    }

    pub fn with_roots(mut self, roots: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roots = Some(roots.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(Default::default)
            .insert(key.into(), value);
        self
    }

    pub(crate) fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
