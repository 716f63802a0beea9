use std::io::{self, Write};

use flate2::write::GzEncoder;
use flate2::{Compression, GzBuilder};
use tar::{Builder, EntryType, Header};

/// Width of the name field in a tar header.
const NAME_FIELD_LEN: usize = 100;

const GNU_LONG_LINK: &[u8] = b"././@LongLink";

pub(crate) fn create_deterministic_tar<W: Write>(writer: W) -> Builder<GzEncoder<W>> {
    let encoder = GzBuilder::new()
        .mtime(0)
        .operating_system(255)
        .write(writer, Compression::default());

    let mut tar = Builder::new(encoder);
    tar.mode(tar::HeaderMode::Deterministic);
    tar
}

/// Normalize a host path or entry name to the bundle's `/name` convention.
///
/// Works on raw bytes so names that are not UTF-8 keep their bytes.
pub(crate) fn normalize_entry_name(name: &[u8]) -> Vec<u8> {
    let name: Vec<u8> = name
        .iter()
        .map(|&b| if b == b'\\' { b'/' } else { b })
        .collect();
    let mut rest = name.as_slice();
    loop {
        if let Some(stripped) = rest.strip_prefix(b"./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix(b"/") {
            rest = stripped;
        } else {
            break;
        }
    }

    let mut normalized = Vec::with_capacity(rest.len() + 1);
    normalized.push(b'/');
    normalized.extend_from_slice(rest);
    normalized
}

pub(crate) fn file_header(entry_type: EntryType, size: u64, mode: u32) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_size(size);
    header.set_mode(mode);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header
}

/// Header for a copy of `source`: same kind, mode, mtime and device
/// numbers, with owner fields cleared.
pub(crate) fn copy_header(source: &Header, size: u64) -> io::Result<Header> {
    let mode = source.mode().unwrap_or(0o644);
    let mut copy = file_header(source.entry_type(), size, mode);
    if let Ok(mtime) = source.mtime() {
        copy.set_mtime(mtime);
    }
    if let (Ok(Some(major)), Ok(Some(minor))) = (source.device_major(), source.device_minor()) {
        copy.set_device_major(major)?;
        copy.set_device_minor(minor)?;
    }
    Ok(copy)
}

/// Append one entry under `name`, with an optional link target.
///
/// `Header::set_path` refuses absolute names, so name and link bytes are
/// written directly. Values that overflow the header use GNU long name and
/// long link records.
pub(crate) fn append_named<T: Write>(
    tar: &mut Builder<T>,
    mut header: Header,
    name: &[u8],
    link_name: Option<&[u8]>,
    data: &[u8],
) -> io::Result<()> {
    if name.len() > NAME_FIELD_LEN {
        append_long_record(tar, EntryType::GNULongName, name)?;
    }
    if let Some(link) = link_name {
        if link.len() > NAME_FIELD_LEN {
            append_long_record(tar, EntryType::GNULongLink, link)?;
        }
        fill_field(&mut header.as_old_mut().linkname, link);
    }

    fill_field(&mut header.as_old_mut().name, name);
    header.set_cksum();
    tar.append(&header, data)
}

fn append_long_record<T: Write>(
    tar: &mut Builder<T>,
    kind: EntryType,
    value: &[u8],
) -> io::Result<()> {
    let mut long = file_header(kind, value.len() as u64 + 1, 0o644);
    fill_field(&mut long.as_old_mut().name, GNU_LONG_LINK);
    long.set_cksum();

    let mut payload = Vec::with_capacity(value.len() + 1);
    payload.extend_from_slice(value);
    payload.push(0);
    tar.append(&long, payload.as_slice())
}

/// Copy `value` into a fixed header field, truncating and NUL-padding.
fn fill_field(field: &mut [u8; NAME_FIELD_LEN], value: &[u8]) {
    field.fill(0);
    let len = value.len().min(NAME_FIELD_LEN);
    field[..len].copy_from_slice(&value[..len]);
}
