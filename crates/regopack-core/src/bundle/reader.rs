//! Bundle reader.
//!
//! Loads a whole gzip+tar bundle into memory. Policy bundles are small
//! enough that streaming buys nothing here.

use std::io::Read;

use tar::EntryType;

use super::tar_read::{self, RawEntry};
use crate::error::CompileResult;
use crate::manifest::{BundleManifest, MANIFEST_ENTRY};

/// One entry of a bundle, in archive order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    /// Entry name; bytes that are not UTF-8 are shown lossily.
    pub name: String,
    pub kind: EntryType,
    /// Target of symlink and hard link entries.
    pub link_name: Option<String>,
    pub content: Vec<u8>,
}

/// In-memory view of a bundle archive.
#[derive(Debug, Clone)]
pub struct BundleReader {
    entries: Vec<BundleEntry>,
}

impl BundleReader {
    /// Decompress and read every entry of `reader`.
    pub fn open<R: Read>(reader: R) -> CompileResult<Self> {
        let mut entries = Vec::new();
        tar_read::for_each_entry(reader, |raw: RawEntry| {
            entries.push(BundleEntry {
                name: lossy(raw.name.as_slice()),
                kind: raw.header.entry_type(),
                link_name: raw.link_name.as_deref().map(lossy),
                content: raw.data,
            });
            Ok(())
        })?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// First entry with the given name.
    pub fn get(&self, name: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Parsed `/.manifest`, if the bundle carries one.
    pub fn manifest(&self) -> CompileResult<Option<BundleManifest>> {
        match self.get(MANIFEST_ENTRY) {
            Some(entry) => Ok(Some(serde_json::from_slice(&entry.content)?)),
            None => Ok(None),
        }
    }

    pub fn into_entries(self) -> Vec<BundleEntry> {
        self.entries
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
