//! Source entries accumulated by the configurator.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::bundle::BundleWriter;
use crate::error::CompileResult;

/// Borrowed caller stream. The caller keeps ownership and disposal.
pub type SourceStream<'a> = &'a mut (dyn Read + Send);

/// One contribution to a bundle.
pub enum SourceEntry<'a> {
    /// File or directory on disk.
    Path(PathBuf),
    /// In-memory policy text with its synthetic `src<N>.rego` name.
    Source { code: String, file_name: String },
    /// Stream holding a complete gzip+tar bundle.
    Bundle(SourceStream<'a>),
    /// Stream holding the raw content of one file.
    FileStream {
        name: String,
        stream: SourceStream<'a>,
    },
}

/// Compiler input borrowed from a single pass-through entry.
pub enum PassThrough<'s> {
    Path(&'s Path),
    Stream(&'s mut (dyn Read + Send)),
}

impl SourceEntry<'_> {
    /// Render this entry into `bundle`. Streams are drained.
    pub fn write_to<W: Write>(&mut self, bundle: &mut BundleWriter<W>) -> CompileResult<()> {
        match self {
            Self::Path(path) => bundle.write_file(path),
            Self::Source { code, file_name } => bundle.write_entry(file_name, code.as_bytes()),
            Self::Bundle(stream) => bundle.write_bundle(&mut **stream).map(|_| ()),
            Self::FileStream { name, stream } => bundle.write_reader(name, &mut **stream),
        }
    }

    /// The input to hand to the compiler as is, when this entry needs no
    /// repackaging.
    pub fn as_pass_through(&mut self) -> Option<PassThrough<'_>> {
        match self {
            Self::Path(path) => Some(PassThrough::Path(path.as_path())),
            Self::Bundle(stream) => Some(PassThrough::Stream(&mut **stream)),
            Self::Source { .. } | Self::FileStream { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path(_) => "path",
            Self::Source { .. } => "source",
            Self::Bundle(_) => "bundle",
            Self::FileStream { .. } => "file-stream",
        }
    }
}

impl std::fmt::Debug for SourceEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Source { file_name, .. } => f
                .debug_struct("Source")
                .field("file_name", file_name)
                .finish_non_exhaustive(),
            Self::Bundle(_) => f.write_str("Bundle(..)"),
            Self::FileStream { name, .. } => f
                .debug_struct("FileStream")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleReader;

    #[test]
    fn test_pass_through_kinds() {
        let mut bundle = std::io::Cursor::new(b"bundle".to_vec());
        let mut file = std::io::empty();

        let mut path = SourceEntry::Path("p.rego".into());
        assert!(matches!(
            path.as_pass_through(),
            Some(PassThrough::Path(p)) if p == Path::new("p.rego")
        ));

        let mut stream = SourceEntry::Bundle(&mut bundle);
        let Some(PassThrough::Stream(inner)) = stream.as_pass_through() else {
            panic!("bundle stream should pass through");
        };
        let mut read = Vec::new();
        inner.read_to_end(&mut read).unwrap();
        assert_eq!(read, b"bundle");

        assert!(SourceEntry::Source {
            code: "package p".into(),
            file_name: "src0.rego".into()
        }
        .as_pass_through()
        .is_none());
        assert!(SourceEntry::FileStream {
            name: "data.json".into(),
            stream: &mut file
        }
        .as_pass_through()
        .is_none());
    }

    #[test]
    fn test_render_source_and_file_stream() {
        let mut data = std::io::Cursor::new(b"{}".to_vec());
        let mut entries = vec![
            SourceEntry::Source {
                code: "package a".into(),
                file_name: "src0.rego".into(),
            },
            SourceEntry::FileStream {
                name: "data.json".into(),
                stream: &mut data,
            },
        ];

        let mut writer = BundleWriter::new(Vec::new(), None);
        for entry in &mut entries {
            entry.write_to(&mut writer).unwrap();
        }
        let bytes = writer.finish().unwrap();

        let reader = BundleReader::open(bytes.as_slice()).unwrap();
        assert_eq!(reader.get("/src0.rego").unwrap().content, b"package a");
        assert_eq!(reader.get("/data.json").unwrap().content, b"{}");
    }
}
