//! One-call compilation helpers for common source shapes.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use bytes::Bytes;

use crate::bundle::BundleWriter;
use crate::compiler::{ArtifactStream, RegoCompiler};
use crate::configurator::RegoCompilerConfigurator;
use crate::error::{CompileError, CompileResult};

/// Shortcuts over [`RegoCompilerConfigurator`], available on every compiler.
#[async_trait]
pub trait RegoCompilerExt: RegoCompiler {
    /// Compile a bundle directory or bundle archive on disk.
    async fn compile_bundle(
        &self,
        bundle_path: &str,
        entrypoints: Option<&[&str]>,
        capabilities_path: Option<&str>,
    ) -> CompileResult<ArtifactStream> {
        let mut c = RegoCompilerConfigurator::new(self);
        c.with_as_bundle(true).with_source_path(bundle_path)?;
        if let Some(entrypoints) = entrypoints {
            c.with_entrypoints(entrypoints.iter().copied())?;
        }
        if let Some(path) = capabilities_path {
            c.with_capabilities_path(path)?;
        }
        c.compile().await
    }

    /// Compile a single policy source file.
    async fn compile_file(
        &self,
        source_path: &str,
        entrypoints: Option<&[&str]>,
    ) -> CompileResult<ArtifactStream> {
        let mut c = RegoCompilerConfigurator::new(self);
        c.with_source_path(source_path)?;
        if let Some(entrypoints) = entrypoints {
            c.with_entrypoints(entrypoints.iter().copied())?;
        }
        c.compile().await
    }

    /// Compile a bundle read from `bundle`. The stream stays with the caller.
    async fn compile_bundle_stream(
        &self,
        bundle: &mut (dyn Read + Send),
        entrypoints: Option<&[&str]>,
        capabilities_json: Option<Bytes>,
    ) -> CompileResult<ArtifactStream> {
        let mut c = RegoCompilerConfigurator::new(self);
        c.with_as_bundle(true).with_source_stream(bundle);
        if let Some(entrypoints) = entrypoints {
            c.with_entrypoints(entrypoints.iter().copied())?;
        }
        if let Some(json) = capabilities_json {
            c.with_capabilities_json(json)?;
        }
        c.compile().await
    }

    /// Compile policy source text, packaged as `/policy.rego`.
    async fn compile_source(
        &self,
        source: &str,
        entrypoints: Option<&[&str]>,
    ) -> CompileResult<ArtifactStream> {
        if source.is_empty() {
            return Err(CompileError::empty("source"));
        }

        let mut writer = BundleWriter::new(Vec::new(), None);
        writer.write_entry("policy.rego", source.as_bytes())?;
        let mut bundle = Cursor::new(writer.finish()?);

        let mut c = RegoCompilerConfigurator::new(self);
        c.with_as_bundle(true).with_source_stream(&mut bundle);
        if let Some(entrypoints) = entrypoints {
            c.with_entrypoints(entrypoints.iter().copied())?;
        }
        c.compile().await
    }
}

impl<T: RegoCompiler + ?Sized> RegoCompilerExt for T {}
