//! CRC-32 over message frames.
//!
//! Reflected polynomial `0xEDB88320`, initial value 0, no final xor.
//! Binary frames append the value as 4 little-endian bytes, ASCII
//! frames as 8 lowercase hex digits after `*`. Sub-messages embedded
//! inside another frame carry their checksum bit-inverted so the outer
//! checksum cannot collide with the inner one ([`CrcMode::Flipped`]).

const POLYNOMIAL: u32 = 0xEDB8_8320;

const CRC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLYNOMIAL
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Folds one byte into a running checksum.
#[inline]
pub fn update(crc: u32, byte: u8) -> u32 {
    CRC_TABLE[((crc ^ byte as u32) & 0xFF) as usize] ^ (crc >> 8)
}

/// Checksum over a whole buffer.
pub fn crc32(data: &[u8]) -> u32 {
    data.iter().fold(0, |crc, &b| update(crc, b))
}

/// Whether the final checksum value is bit-inverted.
///
/// `Flipped` is used for sub-messages embedded in an outer frame; the
/// flip is always an explicit parameter, never shared converter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcMode {
    Normal,
    Flipped,
}

impl CrcMode {
    /// Applies the mode to a computed checksum.
    #[inline]
    pub fn finish(self, crc: u32) -> u32 {
        match self {
            Self::Normal => crc,
            Self::Flipped => crc ^ 0xFFFF_FFFF,
        }
    }
}
