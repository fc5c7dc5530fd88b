//! # PNG DPI Tool
//!
//! This library rewrites the `pHYs` (physical pixel dimensions) chunk of a PNG
//! so that an image exported at a given device pixel ratio declares a matching
//! resolution to the software that opens it.
//!
//! The core concept is a single forward scan that builds a table of chunk
//! locations, followed by splicing a freshly checksummed 21-byte `pHYs`
//! chunk into a copy of the input.

// Public API exports
pub mod cli;
pub mod png;
pub mod utils;

pub use png::{
    ChunkInfo, ChunkTable, OccurrenceRule, OutputOptions, PhysicalDimensions, PngImage,
    TaggedImage, find_chunk, is_png, parse_physical_dimensions, read_chunk_type, read_chunks,
    read_physical_dimensions, set_physical_chunk, verify_chunk_crcs,
};
pub use utils::crc32;

/// Result type alias for PNG DPI operations
pub type PngDpiResult<T> = Result<T, PngDpiError>;

/// Error type for every fallible chunk operation
#[derive(Debug, thiserror::Error)]
pub enum PngDpiError {
    #[error("invalid PNG signature at offset {offset}")]
    InvalidSignature { offset: usize },

    #[error("chunk read out of bounds: {needed} bytes at offset {offset}, buffer is {len} bytes")]
    ChunkRead { offset: usize, needed: usize, len: usize },

    #[error("chunk parse out of bounds: {needed} bytes at offset {offset}, buffer is {len} bytes")]
    ChunkParse { offset: usize, needed: usize, len: usize },

    #[error("no IEND chunk before end of data at offset {offset}")]
    MissingIend { offset: usize },

    #[error("invalid device pixel ratio: {0}")]
    InvalidDevicePixelRatio(f64),

    #[error("CRC mismatch in chunk {chunk}: stored {expected:#010x}, computed {actual:#010x}")]
    CrcMismatch { chunk: String, expected: u32, actual: u32 },

    #[error("Input file error: {0}")]
    InputFile(#[from] std::io::Error),
}

impl PngDpiError {
    /// Validate that a PNG chunk's stored CRC matches the computed one
    pub fn validate_png_chunk(
        chunk_type: &[u8],
        expected_crc: u32,
        actual_crc: u32,
    ) -> PngDpiResult<()> {
        if expected_crc != actual_crc {
            Err(PngDpiError::CrcMismatch {
                chunk: String::from_utf8_lossy(chunk_type).into_owned(),
                expected: expected_crc,
                actual: actual_crc,
            })
        } else {
            Ok(())
        }
    }
}
