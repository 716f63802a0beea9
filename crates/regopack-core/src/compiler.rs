//! Contract of the external policy compiler.

use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::params::CompilationParameters;

/// Compiled artifact returned by a compiler. Its content is opaque here.
pub type ArtifactStream = Box<dyn Read + Send>;

/// Version information reported by a compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegoCompilerVersion {
    pub version: String,
    #[serde(default)]
    pub go_version: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
}

/// A policy compiler that turns a file, directory or bundle into an artifact.
#[async_trait]
pub trait RegoCompiler: Send + Sync {
    async fn version(&self) -> anyhow::Result<RegoCompilerVersion>;

    /// Compile a source file, bundle directory or bundle archive on disk.
    async fn compile_path(
        &self,
        path: &Path,
        params: &CompilationParameters,
    ) -> anyhow::Result<ArtifactStream>;

    /// Compile a source or bundle read from `stream`.
    async fn compile_stream(
        &self,
        stream: &mut (dyn Read + Send),
        params: &CompilationParameters,
    ) -> anyhow::Result<ArtifactStream>;
}
