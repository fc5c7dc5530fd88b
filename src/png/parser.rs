//! Low-level PNG chunk scanning using manual byte slicing

use std::collections::HashMap;

use log::{debug, trace, warn};

use crate::utils::{PNG_SIGNATURE, crc32, read_u32_be, slice_at};
use crate::{PngDpiError, PngDpiResult};

/// Image data chunk type
pub const IDAT: &str = "IDAT";
/// Terminating chunk type
pub const IEND: &str = "IEND";

/// Length field + type field + CRC field around every chunk's data
pub const CHUNK_OVERHEAD: usize = 12;

/// Location of one chunk inside a PNG buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Offset of the chunk's length field
    pub start: usize,
    /// Offset of the first data byte, right after the type field
    pub data_offset: usize,
    /// Data length as declared by the length field
    pub size: u32,
}

impl ChunkInfo {
    /// Bytes covered by the whole chunk, length field through CRC
    pub fn span(&self) -> usize {
        (self.size as usize).saturating_add(CHUNK_OVERHEAD)
    }

    /// Offset one past the chunk's CRC
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.span())
    }
}

/// Which occurrence of a repeated chunk type the table keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceRule {
    /// Keep the first chunk seen and skip later ones
    FirstOccurrenceOnly,
    /// Every later chunk overwrites the entry
    LastOccurrenceWins,
}

impl OccurrenceRule {
    pub fn for_chunk_type(chunk_type: &str) -> Self {
        match chunk_type {
            IDAT => OccurrenceRule::FirstOccurrenceOnly,
            _ => OccurrenceRule::LastOccurrenceWins,
        }
    }

    /// Whether a chunk should be written into the table given whether its
    /// type already has an entry
    pub fn should_record(self, already_present: bool) -> bool {
        match self {
            OccurrenceRule::FirstOccurrenceOnly => !already_present,
            OccurrenceRule::LastOccurrenceWins => true,
        }
    }
}

/// Chunk locations keyed by four-character type code. `IEND` is never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkTable {
    entries: HashMap<String, ChunkInfo>,
}

impl ChunkTable {
    pub fn get(&self, chunk_type: &str) -> Option<&ChunkInfo> {
        self.entries.get(chunk_type)
    }

    pub fn contains(&self, chunk_type: &str) -> bool {
        self.entries.contains_key(chunk_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by their position in the file
    pub fn by_offset(&self) -> Vec<(&str, &ChunkInfo)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(ty, info)| (ty.as_str(), info))
            .collect();
        entries.sort_by_key(|(_, info)| info.start);
        entries
    }

    fn record(&mut self, chunk_type: String, info: ChunkInfo) {
        let rule = OccurrenceRule::for_chunk_type(&chunk_type);
        if rule.should_record(self.contains(&chunk_type)) {
            trace!("recording {} at {}", chunk_type, info.start);
            self.entries.insert(chunk_type, info);
        } else {
            debug!("skipping repeated {} chunk at {}", chunk_type, info.start);
        }
    }
}

/// Check for the PNG signature at `offset`. Never fails: a short buffer is
/// simply not a PNG.
pub fn is_png(buffer: &[u8], offset: usize) -> bool {
    slice_at(buffer, offset, PNG_SIGNATURE.len()) == Some(&PNG_SIGNATURE[..])
}

/// Read the four-byte chunk type code at `offset`
pub fn read_chunk_type(buffer: &[u8], offset: usize) -> PngDpiResult<String> {
    let bytes = slice_at(buffer, offset, 4).ok_or(PngDpiError::ChunkRead {
        offset,
        needed: 4,
        len: buffer.len(),
    })?;
    Ok(bytes.iter().map(|&b| char::from(b)).collect())
}

/// Scan the chunks of the PNG starting at `offset` into a [`ChunkTable`].
///
/// Stops at `IEND` (trailing bytes are ignored) or once the scan position
/// moves past the end of the buffer. Only the first `IDAT` is kept; for any
/// other repeated type the last one wins.
pub fn read_chunks(buffer: &[u8], offset: usize) -> PngDpiResult<ChunkTable> {
    scan_chunks(buffer, offset).inspect_err(|e| warn!("chunk scan failed: {}", e))
}

fn scan_chunks(buffer: &[u8], offset: usize) -> PngDpiResult<ChunkTable> {
    if !is_png(buffer, offset) {
        return Err(PngDpiError::InvalidSignature { offset });
    }

    let mut table = ChunkTable::default();
    let mut pos = offset + PNG_SIGNATURE.len();

    while pos < buffer.len() {
        let start = pos;
        let size = read_u32_be(buffer, pos).ok_or(PngDpiError::ChunkRead {
            offset: pos,
            needed: 4,
            len: buffer.len(),
        })?;
        pos += 4;

        let chunk_type = read_chunk_type(buffer, pos)?;
        pos += 4;

        if chunk_type == IEND {
            debug!("reached IEND at {}", start);
            break;
        }

        table.record(chunk_type, ChunkInfo { start, data_offset: pos, size });

        // data + CRC
        pos = pos.saturating_add(size as usize).saturating_add(4);
    }

    Ok(table)
}

/// Look up one chunk type. A missing chunk is `Ok(None)`, not an error.
pub fn find_chunk(buffer: &[u8], chunk_type: &str) -> PngDpiResult<Option<ChunkInfo>> {
    Ok(read_chunks(buffer, 0)?.get(chunk_type).copied())
}

/// Check the stored CRC of every chunk up to and including `IEND`.
///
/// Returns the number of chunks checked. Data that ends on a chunk boundary
/// without an `IEND` is `MissingIend`.
pub fn verify_chunk_crcs(buffer: &[u8]) -> PngDpiResult<usize> {
    if !is_png(buffer, 0) {
        return Err(PngDpiError::InvalidSignature { offset: 0 });
    }

    let mut pos = PNG_SIGNATURE.len();
    let mut checked = 0;

    while pos < buffer.len() {
        let size = read_u32_be(buffer, pos).ok_or(PngDpiError::ChunkRead {
            offset: pos,
            needed: 4,
            len: buffer.len(),
        })? as usize;
        let covered_len = size.saturating_add(4);
        let covered = slice_at(buffer, pos + 4, covered_len).ok_or(PngDpiError::ChunkParse {
            offset: pos + 4,
            needed: covered_len,
            len: buffer.len(),
        })?;
        let crc_offset = pos + 4 + covered_len;
        let stored = read_u32_be(buffer, crc_offset).ok_or(PngDpiError::ChunkParse {
            offset: crc_offset,
            needed: 4,
            len: buffer.len(),
        })?;

        let chunk_type = &covered[..4];
        PngDpiError::validate_png_chunk(chunk_type, stored, crc32(covered))?;
        checked += 1;

        if chunk_type == IEND.as_bytes() {
            return Ok(checked);
        }
        pos = crc_offset + 4;
    }

    Err(PngDpiError::MissingIend { offset: pos })
}
