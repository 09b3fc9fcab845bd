//! Discovery of the zlib segments that follow the save header.
//!
//! The body is not length-framed in a way we trust, so segments are found by
//! zlib signature and accepted only if they inflate cleanly.

use memchr::memmem;
use tracing::debug;

use crate::reader::ByteCursor;

/// zlib CMF/FLG pairs for the default, best and fastest compression levels.
pub const ZLIB_SIGNATURES: [[u8; 2]; 3] = [[0x78, 0x9C], [0x78, 0xDA], [0x78, 0x01]];

/// Marker that opens the decompressed object body.
pub const BODY_MARKER: &[u8; 4] = b"KSAV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderBounds {
    /// First byte after the header JSON, or 0 if the header is undersized.
    pub offset: usize,
    pub is_compressed: bool,
}

/// The inflated segment that carries the `KSAV` group table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyBlock {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InflatedSegment {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

/// Locate the end of the header without decoding its JSON.
pub fn header_end(data: &[u8]) -> HeaderBounds {
    let mut c = ByteCursor::new(data);
    let Ok(_build_version) = c.read_u32() else {
        return HeaderBounds::default();
    };
    let (Ok(header_size), Ok(header_version)) = (c.read_u32(), c.read_u32()) else {
        return HeaderBounds::default();
    };
    let mut is_compressed = false;
    if header_version >= 1 {
        match c.read_u32() {
            Ok(flag) => is_compressed = flag != 0,
            Err(_) => return HeaderBounds::default(),
        }
    }
    if c.skip(header_size as usize).is_err() {
        return HeaderBounds {
            offset: 0,
            is_compressed,
        };
    }
    HeaderBounds {
        offset: c.position(),
        is_compressed,
    }
}

/// Every offset at or after `from` that starts with a zlib signature,
/// ascending and without duplicates.
pub fn candidate_offsets(data: &[u8], from: usize) -> Vec<usize> {
    let Some(search) = data.get(from..) else {
        return Vec::new();
    };
    let mut offsets: Vec<usize> = ZLIB_SIGNATURES
        .iter()
        .flat_map(|sig| memmem::find_iter(search, sig).map(move |pos| from + pos))
        .collect();
    offsets.sort_unstable();
    offsets.dedup();
    offsets
}

/// Find and inflate the object body: the first post-header segment that
/// inflates and contains `KSAV`.
pub fn find_body(data: &[u8]) -> Option<BodyBlock> {
    let start = header_end(data).offset;
    for offset in candidate_offsets(data, start) {
        let Some(bytes) = inflate_at(data, offset) else {
            continue;
        };
        if memmem::find(&bytes, BODY_MARKER).is_some() {
            debug!(offset, inflated = bytes.len(), "located KSAV body segment");
            return Some(BodyBlock { offset, bytes });
        }
    }
    debug!(start, "no zlib segment containing KSAV");
    None
}

/// Lazily inflate every candidate segment at or after `from`.
pub fn inflated_segments(data: &[u8], from: usize) -> impl Iterator<Item = InflatedSegment> + '_ {
    candidate_offsets(data, from)
        .into_iter()
        .filter_map(move |offset| {
            inflate_at(data, offset).map(|bytes| InflatedSegment { offset, bytes })
        })
}

fn inflate_at(data: &[u8], offset: usize) -> Option<Vec<u8>> {
    let mut c = ByteCursor::new(data);
    c.seek_to(offset).ok()?;
    c.inflate(None).ok().map(|block| block.into_bytes())
}

/// Post-header variant of [`inflated_segments`].
pub fn iter_decompressed_blocks(data: &[u8]) -> impl Iterator<Item = InflatedSegment> + '_ {
    inflated_segments(data, header_end(data).offset)
}
