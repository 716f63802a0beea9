use std::io::{Read, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use tar::{Builder, EntryType};
use tracing::debug;
use walkdir::WalkDir;

use super::tar_read::{self, RawEntry};
use super::tar_write::{self, normalize_entry_name};
use crate::error::{CompileError, CompileResult};
use crate::manifest::{BundleManifest, MANIFEST_ENTRY};

/// Sequential writer for a gzip-compressed tar bundle.
///
/// Entries are emitted in call order. The manifest supplied at construction
/// is written last, by [`finish`](Self::finish), which consumes the writer
/// so nothing can be appended after the archive is closed.
///
/// # Example
///
/// ```
/// use regopack_core::bundle::{BundleReader, BundleWriter};
///
/// let mut writer = BundleWriter::new(Vec::new(), None);
/// writer.write_entry("policy.rego", b"package authz").unwrap();
/// let bytes = writer.finish().unwrap();
///
/// let reader = BundleReader::open(bytes.as_slice()).unwrap();
/// assert_eq!(reader.entries()[0].name, "/policy.rego");
/// ```
pub struct BundleWriter<W: Write> {
    tar: Builder<GzEncoder<W>>,
    manifest: Option<BundleManifest>,
    entries: usize,
}

impl<W: Write> BundleWriter<W> {
    pub fn new(writer: W, manifest: Option<BundleManifest>) -> Self {
        Self {
            tar: tar_write::create_deterministic_tar(writer),
            manifest,
            entries: 0,
        }
    }

    /// Number of entries written so far, excluding the manifest.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Append a file from disk under its own (normalized) path.
    ///
    /// A directory is walked and each file below it is added under its path
    /// relative to the directory.
    pub fn write_file(&mut self, path: impl AsRef<Path>) -> CompileResult<()> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path)
            .map_err(CompileError::archive_io(format!("reading {}", path.display())))?;

        if meta.is_dir() {
            return self.write_directory(path);
        }

        let data = std::fs::read(path)
            .map_err(CompileError::archive_io(format!("reading {}", path.display())))?;
        self.write_named(path.as_os_str().as_encoded_bytes(), &data)
    }

    /// Append every file below `root`, sorted by path.
    pub fn write_directory(&mut self, root: impl AsRef<Path>) -> CompileResult<()> {
        let root = root.as_ref();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let context = format!("walking {}", root.display());
                CompileError::archive_io(context)(e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let data = std::fs::read(entry.path()).map_err(CompileError::archive_io(format!(
                "reading {}",
                entry.path().display()
            )))?;
            self.write_named(relative.as_os_str().as_encoded_bytes(), &data)?;
        }
        Ok(())
    }

    /// Append in-memory content under `name`.
    pub fn write_entry(&mut self, name: &str, content: &[u8]) -> CompileResult<()> {
        self.write_named(name.as_bytes(), content)
    }

    fn write_named(&mut self, name: &[u8], content: &[u8]) -> CompileResult<()> {
        let name = normalize_entry_name(name);
        let shown = String::from_utf8_lossy(&name);
        let header = tar_write::file_header(EntryType::Regular, content.len() as u64, 0o644);
        tar_write::append_named(&mut self.tar, header, &name, None, content)
            .map_err(CompileError::archive_io(format!("writing entry {}", shown)))?;

        debug!(entry = %shown, bytes = content.len(), "bundle entry written");
        self.entries += 1;
        Ok(())
    }

    /// Drain `reader` and append its content under `name`.
    pub fn write_reader(&mut self, name: &str, reader: &mut dyn Read) -> CompileResult<()> {
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(CompileError::archive_io(format!("draining stream for {}", name)))?;
        self.write_entry(name, &content)
    }

    /// Splice every entry of an existing gzip+tar bundle into this one.
    ///
    /// Entries keep their name bytes, order, kind, mode and link target.
    /// Links and other special entries are copied with their (empty) body.
    /// Duplicate names are kept as separate entries. Returns the number of
    /// entries copied.
    pub fn write_bundle(&mut self, reader: impl Read) -> CompileResult<usize> {
        let tar = &mut self.tar;
        let mut copied = 0;

        tar_read::for_each_entry(reader, |raw: RawEntry| {
            let shown = String::from_utf8_lossy(&raw.name);
            let kind = raw.header.entry_type();
            if !kind.is_file() && !kind.is_dir() {
                debug!(entry = %shown, ?kind, "copying special bundle entry");
            }

            tar_write::copy_header(&raw.header, raw.data.len() as u64)
                .and_then(|copy| {
                    tar_write::append_named(
                        tar,
                        copy,
                        &raw.name,
                        raw.link_name.as_deref(),
                        &raw.data,
                    )
                })
                .map_err(CompileError::archive_io(format!("copying entry {}", shown)))?;
            copied += 1;
            Ok(())
        })?;

        debug!(entries = copied, "merged existing bundle");
        self.entries += copied;
        Ok(copied)
    }

    /// Write the manifest (if any), close the archive and return the sink.
    pub fn finish(mut self) -> CompileResult<W> {
        if let Some(manifest) = self.manifest.take() {
            let bytes = manifest.to_vec()?;
            let header = tar_write::file_header(EntryType::Regular, bytes.len() as u64, 0o644);
            tar_write::append_named(
                &mut self.tar,
                header,
                MANIFEST_ENTRY.as_bytes(),
                None,
                &bytes,
            )
            .map_err(CompileError::archive_io("writing bundle manifest"))?;
        }

        let encoder = self
            .tar
            .into_inner()
            .map_err(CompileError::archive_io("finalizing tar archive"))?;
        encoder
            .finish()
            .map_err(CompileError::archive_io("compressing gzip stream"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleReader;

    fn names(bytes: &[u8]) -> Vec<String> {
        BundleReader::open(bytes)
            .unwrap()
            .entries()
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    #[test]
    fn test_entries_in_call_order() {
        let mut writer = BundleWriter::new(Vec::new(), None);
        writer.write_entry("b.rego", b"package b").unwrap();
        writer.write_entry("a.rego", b"package a").unwrap();
        writer.write_entry("data.json", b"{}").unwrap();
        assert_eq!(writer.entry_count(), 3);

        let bytes = writer.finish().unwrap();
        assert_eq!(names(&bytes), vec!["/b.rego", "/a.rego", "/data.json"]);
    }

    #[test]
    fn test_manifest_written_last() {
        let mut writer = BundleWriter::new(Vec::new(), Some(BundleManifest::new("r1")));
        writer.write_entry("policy.rego", b"package p").unwrap();

        let bytes = writer.finish().unwrap();
        assert_eq!(names(&bytes), vec!["/policy.rego", MANIFEST_ENTRY]);

        let reader = BundleReader::open(bytes.as_slice()).unwrap();
        assert_eq!(reader.manifest().unwrap().unwrap().revision, "r1");
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let bytes = BundleWriter::new(Vec::new(), None).finish().unwrap();
        assert!(names(&bytes).is_empty());
    }

    #[test]
    fn test_write_bundle_splices_in_place_and_keeps_duplicates() {
        let mut inner = BundleWriter::new(Vec::new(), None);
        inner.write_entry("x.rego", b"package x").unwrap();
        inner.write_entry("shared.rego", b"package inner").unwrap();
        let inner = inner.finish().unwrap();

        let mut outer = BundleWriter::new(Vec::new(), None);
        outer.write_entry("shared.rego", b"package outer").unwrap();
        assert_eq!(outer.write_bundle(inner.as_slice()).unwrap(), 2);
        outer.write_entry("z.rego", b"package z").unwrap();
        assert_eq!(outer.entry_count(), 4);

        let bytes = outer.finish().unwrap();
        let reader = BundleReader::open(bytes.as_slice()).unwrap();
        let entries = reader.entries();
        assert_eq!(
            entries.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
            vec!["/shared.rego", "/x.rego", "/shared.rego", "/z.rego"]
        );
        assert_eq!(entries[0].content, b"package outer");
        assert_eq!(entries[2].content, b"package inner");
    }

    #[test]
    fn test_write_bundle_rejects_non_gzip() {
        let mut writer = BundleWriter::new(Vec::new(), None);
        let err = writer.write_bundle(&b"not a bundle"[..]).unwrap_err();
        assert!(matches!(err, CompileError::ArchiveIo { .. }));
    }

    #[test]
    fn test_write_file_missing_is_archive_io() {
        let mut writer = BundleWriter::new(Vec::new(), None);
        let err = writer.write_file("/nonexistent/policy.rego").unwrap_err();
        assert!(matches!(err, CompileError::ArchiveIo { .. }));
    }

    #[test]
    fn test_write_directory_uses_relative_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("authz")).unwrap();
        std::fs::write(dir.path().join("authz/policy.rego"), "package authz").unwrap();
        std::fs::write(dir.path().join("data.json"), "{\"a\":1}").unwrap();

        let mut writer = BundleWriter::new(Vec::new(), None);
        writer.write_file(dir.path()).unwrap();
        let bytes = writer.finish().unwrap();

        assert_eq!(names(&bytes), vec!["/authz/policy.rego", "/data.json"]);
    }

    #[test]
    fn test_write_reader_drains_stream() {
        let mut source = std::io::Cursor::new(b"{\"roles\":[]}".to_vec());
        let mut writer = BundleWriter::new(Vec::new(), None);
        writer.write_reader("data.json", &mut source).unwrap();
        let bytes = writer.finish().unwrap();

        let reader = BundleReader::open(bytes.as_slice()).unwrap();
        assert_eq!(reader.get("/data.json").unwrap().content, b"{\"roles\":[]}");
        assert_eq!(source.position(), 12);
    }
}
