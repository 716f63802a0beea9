//! Policy bundle composition for OPA-style policy compilers.
//!
//! This crate collects policy sources of different shapes and hands them to a
//! compiler as either a single pass-through input or one packaged bundle:
//!
//! - File paths (single files, bundle directories, bundle archives)
//! - Policy source text, named `src0.rego`, `src1.rego`, ...
//! - Streams holding a complete bundle, merged entry by entry
//! - Streams holding one raw file
//!
//! The compiler itself is an external collaborator behind [`RegoCompiler`].
//!
//! # Quick Start
//!
//! ```no_run
//! use regopack_core::{BundleManifest, RegoCompiler, RegoCompilerConfigurator};
//!
//! # async fn example(compiler: &dyn RegoCompiler) -> regopack_core::CompileResult<()> {
//! let mut configurator = RegoCompilerConfigurator::new(compiler);
//! configurator
//!     .with_manifest(BundleManifest::new("2024-06-01").with_roots(["authz"]))
//!     .with_source_path("policies/authz.rego")?
//!     .with_entrypoints(["authz/allow"])?;
//!
//! let mut artifact = configurator.compile().await?;
//! let mut compiled = Vec::new();
//! std::io::Read::read_to_end(&mut artifact, &mut compiled).unwrap();
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod compiler;
pub mod configurator;
pub mod entry;
pub mod error;
pub mod ext;
pub mod manifest;
pub mod params;

pub use bundle::{BundleEntry, BundleReader, BundleWriter};
pub use compiler::{ArtifactStream, RegoCompiler, RegoCompilerVersion};
pub use configurator::RegoCompilerConfigurator;
pub use entry::{PassThrough, SourceEntry, SourceStream};
pub use error::{CompileError, CompileResult};
pub use ext::RegoCompilerExt;
pub use manifest::{BundleManifest, WasmResolver, MANIFEST_ENTRY};
pub use params::{CompilationParameters, RegoVersion};
