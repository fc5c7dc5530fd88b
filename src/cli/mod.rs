//! Report types shared by the command-line front end

use crate::png::{
    ChunkTable, PhysicalDimensions, is_png, read_physical_dimensions, verify_chunk_crcs,
};
use crate::{PngDpiError, PngDpiResult};

/// Validation result for a PNG file
#[derive(Debug, PartialEq)]
pub enum ValidationResult {
    /// Signature and every chunk CRC check out
    Valid { chunks: usize },
    /// The file does not start with the PNG signature
    NotPng,
    /// A chunk is truncated or carries a bad CRC
    Corrupt(String),
}

/// Check a buffer's signature and every chunk CRC
pub fn validate_png(data: &[u8]) -> ValidationResult {
    if !is_png(data, 0) {
        return ValidationResult::NotPng;
    }
    match verify_chunk_crcs(data) {
        Ok(chunks) => ValidationResult::Valid { chunks },
        Err(e) => ValidationResult::Corrupt(e.to_string()),
    }
}

/// One line per chunk table entry, in file order
pub fn describe_chunks(table: &ChunkTable) -> Vec<String> {
    table
        .by_offset()
        .into_iter()
        .map(|(ty, info)| {
            format!(
                "{:<4}  start={:<8} data={:<8} size={}",
                ty, info.start, info.data_offset, info.size
            )
        })
        .collect()
}

/// Human-readable summary of a `pHYs` record
pub fn describe_physical(dims: &PhysicalDimensions) -> String {
    match (dims.dpi_x(), dims.dpi_y()) {
        (Some(x), Some(y)) => format!(
            "{} x {} px/m ({:.2} x {:.2} dpi)",
            dims.ppu_x, dims.ppu_y, x, y
        ),
        _ => format!("{} x {} px/unit (aspect ratio only)", dims.ppu_x, dims.ppu_y),
    }
}

/// `pHYs` line for `inspect`, or a note that the chunk is absent
pub fn physical_summary(data: &[u8]) -> PngDpiResult<String> {
    Ok(match read_physical_dimensions(data)? {
        Some(dims) => describe_physical(&dims),
        None => "no pHYs chunk".to_string(),
    })
}

/// Parse `--dpr` values, rejecting anything `set_physical_chunk` would
pub fn parse_device_pixel_ratio(s: &str) -> Result<f64, String> {
    let dpr: f64 = s.parse().map_err(|e| format!("not a number: {}", e))?;
    PhysicalDimensions::from_device_pixel_ratio(dpr)
        .map(|_| dpr)
        .map_err(|e: PngDpiError| e.to_string())
}
