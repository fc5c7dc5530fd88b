//! PNG chunk table and `pHYs` manipulation module

pub mod parser;
pub mod phys;

use std::fs;
use std::path::Path;

use crate::PngDpiResult;
pub use parser::{
    ChunkInfo, ChunkTable, OccurrenceRule, find_chunk, is_png, read_chunk_type, read_chunks,
    verify_chunk_crcs,
};
pub use phys::{
    OutputOptions, PhysicalDimensions, TaggedImage, parse_physical_dimensions,
    read_physical_dimensions, set_physical_chunk,
};

/// PNG file contents together with their chunk table
#[derive(Debug, Clone)]
pub struct PngImage {
    raw_data: Vec<u8>,
    chunks: ChunkTable,
}

impl PngImage {
    /// Load PNG file from path
    pub fn from_file(path: &Path) -> PngDpiResult<Self> {
        let raw_data = fs::read(path)?;
        Self::from_data(raw_data)
    }

    /// Create from raw data
    pub fn from_data(raw_data: Vec<u8>) -> PngDpiResult<Self> {
        let chunks = read_chunks(&raw_data, 0)?;
        Ok(Self { raw_data, chunks })
    }

    pub fn chunks(&self) -> &ChunkTable {
        &self.chunks
    }

    /// The `pHYs` record, if the file carries one
    pub fn physical_dimensions(&self) -> PngDpiResult<Option<PhysicalDimensions>> {
        self.chunks
            .get(phys::PHYS)
            .map(|info| parse_physical_dimensions(&self.raw_data, info.data_offset))
            .transpose()
    }

    /// A copy of this image declaring the resolution for `device_pixel_ratio`
    pub fn with_device_pixel_ratio(&self, device_pixel_ratio: f64) -> PngDpiResult<Self> {
        let options = OutputOptions::default();
        let tagged = set_physical_chunk(&self.raw_data, device_pixel_ratio, &options)?;
        Self::from_data(tagged.into_bytes())
    }

    /// Write the PNG to a file
    pub fn write_to_file(&self, path: &Path) -> PngDpiResult<()> {
        fs::write(path, &self.raw_data)?;
        Ok(())
    }

    /// Get the raw data
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw_data
    }
}

/// In-memory PNG builders for unit tests
#[cfg(test)]
pub(crate) mod test_support {
    use crate::utils::{PNG_SIGNATURE, crc32};

    /// 1x1, 8-bit RGB, no interlace
    pub const IHDR_1X1: &[u8] = &[
        0x00, 0x00, 0x00, 0x01, // width = 1
        0x00, 0x00, 0x00, 0x01, // height = 1
        0x08, // bit depth = 8
        0x02, // color type = 2 (RGB)
        0x00, // compression = 0
        0x00, // filter = 0
        0x00, // interlace = 0
    ];

    /// zlib stream for one red pixel behind a filter-type-0 byte
    pub const IDAT_1X1: &[u8] = &[
        0x78, 0x9C, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x03, 0x01, 0x01, 0x00,
    ];

    /// 2835 pixels per meter on both axes
    pub const PHYS_72_DPI: &[u8] = &[0x00, 0x00, 0x0B, 0x13, 0x00, 0x00, 0x0B, 0x13, 0x01];

    /// Perceptual rendering intent
    pub const SRGB: &[u8] = &[0x00];

    pub fn chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len() + 12);
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(data);
        let crc_data = [chunk_type.as_slice(), data].concat();
        out.extend_from_slice(&crc32(&crc_data).to_be_bytes());
        out
    }

    /// Signature, the given chunks, then `IEND`
    pub fn png_from_chunks(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let mut png = PNG_SIGNATURE.to_vec();
        for (chunk_type, data) in chunks {
            png.extend_from_slice(&chunk(chunk_type, data));
        }
        png.extend_from_slice(&chunk(b"IEND", &[]));
        png
    }
}
