//! Flat-file persistence for index artifacts.
//!
//! Every artifact is a single file: a fixed 40-byte header followed by the
//! component's raw little-endian payload. Files are designed to be memory
//! mapped and queried in place, so payloads are plain packed words rather
//! than a serialized object graph.
//!
//! Header layout (all little-endian):
//!
//! ```text
//! offset  size  field
//!      0     4  magic  ("SEAM"; doubles as the byte-order check)
//!      4     4  format version
//!      8     4  artifact kind
//!     12     4  reserved (zero)
//!     16     8  text length |T|
//!     24     8  parameter 0 (component specific)
//!     32     8  parameter 1 (component specific)
//! ```
//!
//! The compile-time mapping parameters live next to the magic number:
//! LUT depth K = 12 ([`crate::lut::LUT_K`]), CSA sampling period P = 16
//! ([`crate::csa::CSA_PERIOD`]), minimum seed length Γ = 17
//! ([`crate::mapper::GAMMA`]).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{Result, SeamError};

/// File magic, `b"SEAM"` read as a little-endian u32. A file written on a
/// foreign-endian machine reads back byte-swapped and is rejected.
pub const MAGIC: u32 = u32::from_le_bytes(*b"SEAM");

/// On-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the fixed header.
pub const HEADER_LEN: usize = 40;

/// Artifact kinds, one per file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Kind {
    Bwt = 1,
    Occ = 2,
    Csa = 3,
    Lut = 4,
    Chr = 5,
}

impl Kind {
    /// File extension appended to the index prefix.
    pub fn extension(self) -> &'static str {
        match self {
            Kind::Bwt => ".bwt",
            Kind::Occ => ".occ",
            Kind::Csa => ".sa",
            Kind::Lut => ".lut",
            Kind::Chr => ".chr",
        }
    }
}

/// Parsed artifact header.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub kind: Kind,
    pub txtlen: u64,
    pub p0: u64,
    pub p1: u64,
}

impl Header {
    pub fn new(kind: Kind, txtlen: u64, p0: u64, p1: u64) -> Self {
        Header { kind, txtlen, p0, p1 }
    }

    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf[8..12].copy_from_slice(&(self.kind as u32).to_le_bytes());
        buf[16..24].copy_from_slice(&self.txtlen.to_le_bytes());
        buf[24..32].copy_from_slice(&self.p0.to_le_bytes());
        buf[32..40].copy_from_slice(&self.p1.to_le_bytes());
        buf
    }

    fn parse(bytes: &[u8], expected: Kind) -> Result<Header> {
        if bytes.len() < HEADER_LEN {
            return Err(SeamError::CorruptIndex("file shorter than header".into()));
        }
        let magic = read_u32(bytes, 0);
        if magic != MAGIC {
            return Err(SeamError::CorruptIndex(
                "bad magic (not an index file, or foreign byte order)".into(),
            ));
        }
        let version = read_u32(bytes, 4);
        if version != FORMAT_VERSION {
            return Err(SeamError::CorruptIndex(format!(
                "unsupported format version {version}"
            )));
        }
        let kind = read_u32(bytes, 8);
        if kind != expected as u32 {
            return Err(SeamError::CorruptIndex(format!(
                "wrong artifact kind {kind}, expected {:?}",
                expected
            )));
        }
        Ok(Header {
            kind: expected,
            txtlen: read_u64_at(bytes, 16),
            p0: read_u64_at(bytes, 24),
            p1: read_u64_at(bytes, 32),
        })
    }
}

/// Payload storage: an owned buffer while building, a borrowed view of a
/// read-only memory map after loading. Dropping the mapped variant unmaps
/// the region.
enum BlobData {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

/// A payload byte region with typed word accessors.
pub struct Blob {
    data: BlobData,
    start: usize,
}

impl Blob {
    pub fn from_vec(bytes: Vec<u8>) -> Blob {
        Blob { data: BlobData::Owned(bytes), start: 0 }
    }

    fn from_mmap(map: Mmap, start: usize) -> Blob {
        Blob { data: BlobData::Mapped(map), start }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        match &self.data {
            BlobData::Owned(v) => &v[self.start..],
            BlobData::Mapped(m) => &m[self.start..],
        }
    }

    /// Read the i-th little-endian u64 of the payload.
    #[inline]
    pub fn word(&self, i: usize) -> u64 {
        read_u64_at(self.bytes(), i * 8)
    }
}

impl Deref for Blob {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes()
    }
}

#[inline]
fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Read a little-endian u64 at a byte offset.
#[inline]
pub fn read_u64_at(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
        bytes[offset + 4],
        bytes[offset + 5],
        bytes[offset + 6],
        bytes[offset + 7],
    ])
}

/// Append a little-endian u64 to a payload under construction.
#[inline]
pub fn push_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Path of an artifact: the index prefix with the kind's extension
/// appended (`ref.fa` -> `ref.fa.bwt`).
pub fn artifact_path(prefix: &Path, kind: Kind) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(kind.extension());
    PathBuf::from(name)
}

/// Write header + payload to the artifact file for `kind`.
pub fn write_artifact(prefix: &Path, header: Header, payload: &[u8]) -> Result<()> {
    let path = artifact_path(prefix, header.kind);
    let file = File::create(&path).map_err(|source| SeamError::Open { path, source })?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&header.to_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Memory-map an artifact read-only and validate its header. Each
/// artifact is mapped through its own descriptor; the map lives as long
/// as the returned [`Blob`].
pub fn map_artifact(prefix: &Path, kind: Kind) -> Result<(Header, Blob)> {
    let path = artifact_path(prefix, kind);
    let file = File::open(&path).map_err(|source| SeamError::Open { path, source })?;
    // Safety: the file is opened read-only and the mapping is never
    // mutated; concurrent truncation by another process is outside the
    // supported lifecycle of an index.
    let map = unsafe { Mmap::map(&file)? };
    let header = Header::parse(&map, kind)?;
    Ok((header, Blob::from_mmap(map, HEADER_LEN)))
}
