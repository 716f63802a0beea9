use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;
use tar::Header;

use crate::error::{CompileError, CompileResult};

/// One raw entry decoded from a gzip+tar stream.
pub(crate) struct RawEntry {
    pub header: Header,
    /// Name bytes exactly as stored, long names resolved.
    pub name: Vec<u8>,
    /// Link target of symlink and hard link entries.
    pub link_name: Option<Vec<u8>>,
    pub data: Vec<u8>,
}

/// Decode every entry of a gzip+tar stream in archive order.
///
/// GNU long names, long links and pax path extensions are resolved by
/// `tar` before the visitor sees the entry.
pub(crate) fn for_each_entry<R: Read>(
    reader: R,
    mut visit: impl FnMut(RawEntry) -> CompileResult<()>,
) -> CompileResult<usize> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let entries = archive
        .entries()
        .map_err(CompileError::archive_io("reading bundle archive"))?;

    let mut count = 0;
    for entry in entries {
        let mut entry = entry.map_err(CompileError::archive_io("reading bundle entry"))?;
        let name = entry.path_bytes().into_owned();
        let link_name = entry.link_name_bytes().map(Cow::into_owned);
        let header = entry.header().clone();

        let mut data = Vec::new();
        entry.read_to_end(&mut data).map_err(CompileError::archive_io(format!(
            "reading bundle entry {}",
            String::from_utf8_lossy(&name)
        )))?;

        visit(RawEntry {
            header,
            name,
            link_name,
            data,
        })?;
        count += 1;
    }

    Ok(count)
}
