//! Recording test compiler shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use regopack_core::{ArtifactStream, CompilationParameters, RegoCompiler, RegoCompilerVersion};

/// What the compiler was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Path(PathBuf, CompilationParameters),
    Stream(Vec<u8>, CompilationParameters),
}

/// Compiler that records each call and echoes the stream input back.
#[derive(Default)]
pub struct RecordingCompiler {
    calls: Mutex<Vec<Call>>,
    fail_with: Option<String>,
}

impl RecordingCompiler {
    pub fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn single_call(&self) -> Call {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one compiler call");
        calls.into_iter().next().unwrap()
    }
}

#[async_trait]
impl RegoCompiler for RecordingCompiler {
    async fn version(&self) -> anyhow::Result<RegoCompilerVersion> {
        Ok(RegoCompilerVersion {
            version: "1".into(),
            ..Default::default()
        })
    }

    async fn compile_path(
        &self,
        path: &Path,
        params: &CompilationParameters,
    ) -> anyhow::Result<ArtifactStream> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Path(path.to_path_buf(), params.clone()));
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{}", message);
        }
        Ok(Box::new(Cursor::new(path.to_string_lossy().into_owned())))
    }

    async fn compile_stream(
        &self,
        stream: &mut (dyn Read + Send),
        params: &CompilationParameters,
    ) -> anyhow::Result<ArtifactStream> {
        let mut input = Vec::new();
        stream.read_to_end(&mut input)?;
        self.calls
            .lock()
            .unwrap()
            .push(Call::Stream(input.clone(), params.clone()));
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{}", message);
        }
        Ok(Box::new(Cursor::new(input)))
    }
}

/// Read an artifact to the end.
pub fn drain(mut artifact: ArtifactStream) -> Vec<u8> {
    let mut out = Vec::new();
    artifact.read_to_end(&mut out).unwrap();
    out
}

/// (name, content) pairs of a bundle, in archive order.
pub fn bundle_entries(bytes: &[u8]) -> Vec<(String, String)> {
    regopack_core::BundleReader::open(bytes)
        .unwrap()
        .into_entries()
        .into_iter()
        .map(|e| (e.name, String::from_utf8(e.content).unwrap()))
        .collect()
}
