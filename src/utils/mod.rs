//! Byte-level helpers shared by the PNG chunk code

use byteorder::{BigEndian, ByteOrder};

/// The eight magic bytes every PNG stream starts with
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Reflected IEEE 802.3 polynomial, as used by zlib and PNG
const CRC32_POLY: u32 = 0xEDB8_8320;

/// Lookup table for `crc32`, one entry per possible byte value
pub const CRC32_TABLE: [u32; 256] = make_crc32_table();

const fn make_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { CRC32_POLY ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

/// Calculate the PNG/zlib CRC32 of `data`
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in data {
        crc = CRC32_TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize] ^ (crc >> 8);
    }
    !crc
}

/// Borrow `len` bytes at `offset`, or `None` if that runs past the end
pub fn slice_at(bytes: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    let end = offset.checked_add(len)?;
    bytes.get(offset..end)
}

/// Read a big-endian u32, or `None` when fewer than 4 bytes remain
pub fn read_u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    slice_at(bytes, offset, 4).map(BigEndian::read_u32)
}

/// Append a big-endian u32 to `out`
pub fn push_u32_be(out: &mut Vec<u8>, value: u32) {
    let mut buf = [0u8; 4];
    BigEndian::write_u32(&mut buf, value);
    out.extend_from_slice(&buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_calculation() {
        let data = b"Hello, World!";
        assert_eq!(crc32(data), 0xEC4AC3D0);
        assert_eq!(crc32(b"IEND"), 0xAE426082);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_crc32_matches_crc32fast() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&data);
        assert_eq!(crc32(&data), hasher.finalize());
    }

    #[test]
    fn test_table_edges() {
        assert_eq!(CRC32_TABLE[0], 0);
        assert_eq!(CRC32_TABLE[1], 0x7707_3096);
        assert_eq!(CRC32_TABLE[255], 0x2D02_EF8D);
    }

    #[test]
    fn test_u32_be_operations() {
        let mut buf = Vec::new();
        push_u32_be(&mut buf, 0xDEADBEEF);
        assert_eq!(buf, [0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(read_u32_be(&buf, 0), Some(0xDEADBEEF));
        assert_eq!(read_u32_be(&buf, 1), None);
        assert_eq!(read_u32_be(&buf, usize::MAX), None);
    }
}
