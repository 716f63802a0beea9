//! Fluent configurator that packages sources and invokes the compiler.

use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::PathBuf;

use bytes::Bytes;
use tracing::debug;

use crate::bundle::BundleWriter;
use crate::compiler::{ArtifactStream, RegoCompiler};
use crate::entry::{PassThrough, SourceEntry, SourceStream};
use crate::error::{CompileError, CompileResult};
use crate::manifest::BundleManifest;
use crate::params::{CompilationParameters, RegoVersion};

/// Collects sources and compilation parameters, then compiles them.
///
/// A single file path or bundle stream (with no manifest) goes to the
/// compiler as-is. Anything else is packaged into one bundle first, in the
/// order the sources were added.
///
/// Every `compile` call sees all sources added so far, so a configurator is
/// meant to be used once.
///
/// # Example
///
/// ```no_run
/// use regopack_core::{RegoCompiler, RegoCompilerConfigurator};
///
/// # async fn example(compiler: &dyn RegoCompiler) -> regopack_core::CompileResult<()> {
/// let mut configurator = RegoCompilerConfigurator::new(compiler);
/// configurator
///     .with_source_code("package authz\nallow := true")?
///     .with_source_path("policies/common.rego")?
///     .with_entrypoints(["authz/allow"])?;
///
/// let artifact = configurator.compile().await?;
/// # drop(artifact);
/// # Ok(())
/// # }
/// ```
pub struct RegoCompilerConfigurator<'a, C: RegoCompiler + ?Sized> {
    compiler: &'a C,
    params: CompilationParameters,
    manifest: Option<BundleManifest>,
    entries: Vec<SourceEntry<'a>>,
    source_index: usize,
}

impl<'a, C: RegoCompiler + ?Sized> RegoCompilerConfigurator<'a, C> {
    pub fn new(compiler: &'a C) -> Self {
        Self {
            compiler,
            params: CompilationParameters::default(),
            manifest: None,
            entries: Vec::new(),
            source_index: 0,
        }
    }

    /// Parameters the next compiler call will receive.
    pub fn parameters(&self) -> &CompilationParameters {
        &self.params
    }

    pub fn entries(&self) -> &[SourceEntry<'a>] {
        &self.entries
    }

    /// Replace all compilation parameters, e.g. with ones loaded from a file.
    pub fn with_parameters(&mut self, params: CompilationParameters) -> &mut Self {
        self.params = params;
        self
    }

    /// Output bundle revision.
    pub fn with_revision(&mut self, revision: impl Into<String>) -> CompileResult<&mut Self> {
        let revision = non_empty("revision", revision.into())?;
        self.params = CompilationParameters {
            revision: Some(revision),
            ..self.params.clone()
        };
        Ok(self)
    }

    /// Bundle manifest. Its presence always forces packaging.
    pub fn with_manifest(&mut self, manifest: BundleManifest) -> &mut Self {
        self.manifest = Some(manifest);
        self
    }

    /// Whether the compilation source is a bundle or a single file.
    pub fn with_as_bundle(&mut self, is_bundle: bool) -> &mut Self {
        self.params = CompilationParameters {
            is_bundle,
            ..self.params.clone()
        };
        self
    }

    /// Documents that will be queried for policy decisions. Duplicates collapse.
    pub fn with_entrypoints<I, S>(&mut self, entrypoints: I) -> CompileResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entrypoints = non_empty_set("entrypoints", entrypoints)?;
        self.params = CompilationParameters {
            entrypoints: Some(entrypoints),
            ..self.params.clone()
        };
        Ok(self)
    }

    /// Capabilities file describing the built-ins policies may use.
    pub fn with_capabilities_path(&mut self, path: impl Into<String>) -> CompileResult<&mut Self> {
        let path = non_empty("capabilities", path.into())?;
        self.params = CompilationParameters {
            capabilities_file_path: Some(path),
            ..self.params.clone()
        };
        Ok(self)
    }

    /// Capabilities JSON describing the built-ins policies may use.
    pub fn with_capabilities_json(&mut self, json: impl Into<Bytes>) -> CompileResult<&mut Self> {
        let json = json.into();
        if json.is_empty() {
            return Err(CompileError::empty("capabilities"));
        }
        self.params = CompilationParameters {
            capabilities_bytes: Some(json),
            ..self.params.clone()
        };
        Ok(self)
    }

    pub fn with_debug(&mut self, debug: bool) -> &mut Self {
        self.params = CompilationParameters {
            debug,
            ..self.params.clone()
        };
        self
    }

    pub fn with_prune_unused(&mut self, prune_unused: bool) -> &mut Self {
        self.params = CompilationParameters {
            prune_unused,
            ..self.params.clone()
        };
        self
    }

    /// File patterns the compiler skips when loading a bundle.
    pub fn with_ignore<I, S>(&mut self, patterns: I) -> CompileResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ignore = non_empty_set("ignore", patterns)?;
        self.params = CompilationParameters {
            ignore,
            ..self.params.clone()
        };
        Ok(self)
    }

    pub fn with_rego_version(&mut self, rego_version: RegoVersion) -> &mut Self {
        self.params = CompilationParameters {
            rego_version,
            ..self.params.clone()
        };
        self
    }

    /// Add a source file, bundle directory or bundle archive on disk.
    pub fn with_source_path(&mut self, path: impl Into<PathBuf>) -> CompileResult<&mut Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(CompileError::empty("path"));
        }
        self.entries.push(SourceEntry::Path(path));
        Ok(self)
    }

    /// Add a stream holding a complete bundle. The stream is borrowed and
    /// drained by `compile`, never closed.
    pub fn with_source_stream(&mut self, stream: SourceStream<'a>) -> &mut Self {
        self.entries.push(SourceEntry::Bundle(stream));
        self
    }

    /// Add a stream holding the raw content of a single file named `name`.
    pub fn with_source_file_stream(
        &mut self,
        name: impl Into<String>,
        stream: SourceStream<'a>,
    ) -> CompileResult<&mut Self> {
        let name = non_empty("name", name.into())?;
        self.entries.push(SourceEntry::FileStream { name, stream });
        Ok(self)
    }

    /// Add policy source text, packaged as `src<N>.rego`.
    pub fn with_source_code(&mut self, source: impl Into<String>) -> CompileResult<&mut Self> {
        let code = non_empty("source", source.into())?;
        let file_name = format!("src{}.rego", self.source_index);
        self.source_index += 1;
        self.entries.push(SourceEntry::Source { code, file_name });
        Ok(self)
    }

    /// Package the sources if needed and compile them.
    ///
    /// Packaging reads files and drains streams synchronously on the calling
    /// task, before the first await on the compiler. Large inputs therefore
    /// block the executor thread for that time, and dropping the future only
    /// cancels the compiler call, not packaging already under way. Callers
    /// with large trees can build the bundle with
    /// [`BundleWriter`](crate::bundle::BundleWriter) on a blocking thread and
    /// pass it in through [`with_source_stream`](Self::with_source_stream).
    ///
    /// The intermediate bundle buffer is owned by the future and freed with
    /// it.
    pub async fn compile(&mut self) -> CompileResult<ArtifactStream> {
        if self.entries.is_empty() {
            return Err(CompileError::NoSourceSpecified);
        }

        if self.manifest.is_none() && self.entries.len() == 1 {
            if let Some(source) = self.entries[0].as_pass_through() {
                let artifact = match source {
                    PassThrough::Path(path) => {
                        debug!(path = %path.display(), "compiling path without repackaging");
                        self.compiler.compile_path(path, &self.params).await?
                    }
                    PassThrough::Stream(stream) => {
                        debug!("compiling bundle stream without repackaging");
                        self.compiler.compile_stream(stream, &self.params).await?
                    }
                };
                return Ok(artifact);
            }
        }

        let mut bundle = Cursor::new(self.build_bundle()?);
        self.with_as_bundle(true);

        Ok(self
            .compiler
            .compile_stream(&mut bundle, &self.params)
            .await?)
    }

    /// Blocking: reads every file and drains every stream.
    fn build_bundle(&mut self) -> CompileResult<Vec<u8>> {
        debug!(
            entries = self.entries.len(),
            manifest = self.manifest.is_some(),
            "packaging sources into bundle"
        );

        let mut writer = BundleWriter::new(Vec::new(), self.manifest.clone());
        for entry in &mut self.entries {
            debug!(kind = entry.kind(), "rendering source entry");
            entry.write_to(&mut writer)?;
        }

        let bytes = writer.finish()?;
        debug!(bytes = bytes.len(), "bundle packaged");
        Ok(bytes)
    }
}

fn non_empty(argument: &'static str, value: String) -> CompileResult<String> {
    if value.is_empty() {
        return Err(CompileError::empty(argument));
    }
    Ok(value)
}

fn non_empty_set<I, S>(argument: &'static str, values: I) -> CompileResult<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let set = values
        .into_iter()
        .map(|v| non_empty(argument, v.into()))
        .collect::<CompileResult<BTreeSet<_>>>()?;
    if set.is_empty() {
        return Err(CompileError::empty(argument));
    }
    Ok(set)
}
