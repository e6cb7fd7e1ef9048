//! # Capsule Checksum
//!
//! CRC-8/DVB-S2 over the packet id, length and payload of a capsule.
//!
//! **Polynomial**: 0xD5 (x^8 + x^7 + x^6 + x^4 + x^2 + 1)
//! **Initial Value**: 0x00

/// CRC-8/DVB-S2 polynomial
const CRC8_POLY: u8 = 0xD5;

/// Lookup table, built at compile time
const CRC8_TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;

        while bit < 8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ CRC8_POLY } else { crc << 1 };
            bit += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Running checksum, fed one byte at a time by the incremental decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc8(u8);

impl Crc8 {
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.0 = CRC8_TABLE[(self.0 ^ byte) as usize];
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Checksum of a contiguous byte slice
///
/// # Examples
///
/// ```
/// use prop_link::capsule::crc::crc8;
///
/// assert_eq!(crc8(&[]), 0x00);
/// assert_ne!(crc8(&[46, 16]), 0x00);
/// ```
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = Crc8::new();
    for &byte in data {
        crc.update(byte);
    }
    crc.value()
}
