//! `pHYs` chunk reading and rewriting

use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};

use super::parser::{IDAT, find_chunk, read_chunks};
use crate::utils::{crc32, push_u32_be, slice_at};
use crate::{PngDpiError, PngDpiResult};

/// Physical pixel dimensions chunk type
pub const PHYS: &str = "pHYs";

/// Pixels per meter written per unit of device pixel ratio (about 72 dpi)
pub const PHYS_PER_DPR: f64 = 2835.5;

/// Insertion point used when the file has neither `pHYs` nor `IDAT`.
///
/// Equals signature + `IHDR` + one 13-byte ancillary chunk (e.g. `sRGB`);
/// for any other layout it can land inside a chunk.
pub const FALLBACK_INSERT_OFFSET: usize = 46;

/// Payload length of a `pHYs` chunk
pub const PHYS_DATA_LEN: usize = 9;

/// Full size of an encoded `pHYs` chunk, length field through CRC
pub const PHYS_CHUNK_LEN: usize = PHYS_DATA_LEN + 12;

/// Unit specifier: no unit, only the aspect ratio is meaningful
pub const UNIT_UNKNOWN: u8 = 0;
/// Unit specifier: pixels per meter
pub const UNIT_METER: u8 = 1;

const INCHES_PER_METER: f64 = 39.3701;

const DEFAULT_MIME_TYPE: &str = "image/png";

/// Decoded `pHYs` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalDimensions {
    pub ppu_x: u32,
    pub ppu_y: u32,
    pub unit: u8,
}

impl PhysicalDimensions {
    /// Square pixels in meters, scaled from the device pixel ratio. The
    /// rounded density must be at least 1 px/m and fit in a `u32`.
    pub fn from_device_pixel_ratio(device_pixel_ratio: f64) -> PngDpiResult<Self> {
        let target = (PHYS_PER_DPR * device_pixel_ratio).round();
        if !device_pixel_ratio.is_finite()
            || device_pixel_ratio <= 0.0
            || target < 1.0
            || target > f64::from(u32::MAX)
        {
            return Err(PngDpiError::InvalidDevicePixelRatio(device_pixel_ratio));
        }
        let ppu = target as u32;
        Ok(Self { ppu_x: ppu, ppu_y: ppu, unit: UNIT_METER })
    }

    pub fn is_meters(&self) -> bool {
        self.unit == UNIT_METER
    }

    /// Horizontal resolution in dots per inch, when the unit is meters
    pub fn dpi_x(&self) -> Option<f64> {
        self.is_meters().then(|| f64::from(self.ppu_x) / INCHES_PER_METER)
    }

    /// Vertical resolution in dots per inch, when the unit is meters
    pub fn dpi_y(&self) -> Option<f64> {
        self.is_meters().then(|| f64::from(self.ppu_y) / INCHES_PER_METER)
    }

    /// The 9-byte payload
    pub fn to_bytes(&self) -> [u8; PHYS_DATA_LEN] {
        let mut out = [0u8; PHYS_DATA_LEN];
        out[0..4].copy_from_slice(&self.ppu_x.to_be_bytes());
        out[4..8].copy_from_slice(&self.ppu_y.to_be_bytes());
        out[8] = self.unit;
        out
    }

    /// Complete chunk: length, type, payload and CRC over type + payload
    pub fn to_chunk(&self) -> Vec<u8> {
        let mut chunk = Vec::with_capacity(PHYS_CHUNK_LEN);
        push_u32_be(&mut chunk, PHYS_DATA_LEN as u32);
        chunk.extend_from_slice(PHYS.as_bytes());
        chunk.extend_from_slice(&self.to_bytes());
        let crc = crc32(&chunk[4..]);
        push_u32_be(&mut chunk, crc);
        chunk
    }
}

/// Parse a `pHYs` payload starting at `offset`
pub fn parse_physical_dimensions(
    buffer: &[u8],
    offset: usize,
) -> PngDpiResult<PhysicalDimensions> {
    let out_of_bounds = PngDpiError::ChunkParse {
        offset,
        needed: PHYS_DATA_LEN,
        len: buffer.len(),
    };
    let payload = match slice_at(buffer, offset, PHYS_DATA_LEN) {
        Some(payload) => payload,
        None => {
            warn!("pHYs payload truncated: {}", out_of_bounds);
            return Err(out_of_bounds);
        }
    };
    Ok(PhysicalDimensions {
        ppu_x: BigEndian::read_u32(&payload[0..4]),
        ppu_y: BigEndian::read_u32(&payload[4..8]),
        unit: payload[8],
    })
}

/// Find and parse the `pHYs` chunk, if the file has one
pub fn read_physical_dimensions(buffer: &[u8]) -> PngDpiResult<Option<PhysicalDimensions>> {
    find_chunk(buffer, PHYS)?
        .map(|info| parse_physical_dimensions(buffer, info.data_offset))
        .transpose()
}

/// Caller metadata attached to the rewritten image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// MIME type of the output; `image/png` when unset
    pub mime_type: Option<String>,
}

impl OutputOptions {
    pub fn with_mime_type(mime_type: impl Into<String>) -> Self {
        Self { mime_type: Some(mime_type.into()) }
    }
}

/// Bytes produced by [`set_physical_chunk`] together with their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedImage {
    data: Vec<u8>,
    mime_type: String,
}

impl TaggedImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn write_to_file(&self, path: &std::path::Path) -> PngDpiResult<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}

/// Where the new chunk goes and how many existing bytes it replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Splice {
    at: usize,
    replace: usize,
}

fn choose_splice(buffer: &[u8]) -> PngDpiResult<Splice> {
    let table = read_chunks(buffer, 0)?;

    let splice = if let Some(phys) = table.get(PHYS) {
        debug!("replacing pHYs at {}", phys.start);
        Splice { at: phys.start, replace: phys.span() }
    } else if let Some(idat) = table.get(IDAT) {
        debug!("inserting pHYs before IDAT at {}", idat.start);
        Splice { at: idat.start, replace: 0 }
    } else {
        warn!(
            "no pHYs or IDAT chunk, inserting pHYs at fixed offset {}",
            FALLBACK_INSERT_OFFSET
        );
        Splice { at: FALLBACK_INSERT_OFFSET, replace: 0 }
    };

    if splice.at.saturating_add(splice.replace) > buffer.len() {
        let err = PngDpiError::ChunkParse {
            offset: splice.at,
            needed: splice.replace,
            len: buffer.len(),
        };
        warn!("cannot place pHYs: {}", err);
        return Err(err);
    }
    Ok(splice)
}

/// Write a `pHYs` chunk declaring `2835.5 * device_pixel_ratio` pixels per
/// meter on both axes.
///
/// An existing `pHYs` is replaced in place; otherwise the chunk goes right
/// before the first `IDAT`. The input is left untouched.
pub fn set_physical_chunk(
    buffer: &[u8],
    device_pixel_ratio: f64,
    options: &OutputOptions,
) -> PngDpiResult<TaggedImage> {
    let dims = PhysicalDimensions::from_device_pixel_ratio(device_pixel_ratio)?;
    let splice = choose_splice(buffer)?;

    let mut data = Vec::with_capacity(buffer.len() + PHYS_CHUNK_LEN);
    data.extend_from_slice(&buffer[..splice.at]);
    data.extend_from_slice(&dims.to_chunk());
    data.extend_from_slice(&buffer[splice.at + splice.replace..]);

    let mime_type = options
        .mime_type
        .clone()
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

    Ok(TaggedImage { data, mime_type })
}
