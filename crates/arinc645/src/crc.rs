//! CRC engines with the ARINC 645 parameter sets.
//!
//! All engines are `crc::Crc` instances over the standard algorithm
//! catalogue. The two load-bearing ones are [`CRC16`] (the file header CRC,
//! CCITT polynomial 0x1021, initial value 0xFFFF, no reflection) and
//! [`CRC32`] (the Load CRC, the reflected IEEE polynomial). [`CRC8`] and
//! [`CRC64`] only occur as Check Value algorithms.

use ::crc::{CRC_8_SMBUS, CRC_16_IBM_3740, CRC_32_ISO_HDLC, CRC_64_WE, Crc};

/// ARINC 645 8-bit CRC (Check Value algorithm only).
pub static CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// ARINC 665 file header CRC. Polynomial 0x1021, init 0xFFFF, unreflected.
pub static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// ARINC 665 Load CRC. The reflected IEEE 802.3 polynomial.
pub static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// ARINC 645 64-bit CRC (Check Value algorithm only).
pub static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_WE);

/// One-shot header CRC over a byte slice.
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// One-shot Load CRC over a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Streaming Load CRC computation.
///
/// The Load CRC covers a load header plus the contents of every data and
/// support file; those arrive in separate reads, hence the streaming form.
pub struct Crc32Digest(::crc::Digest<'static, u32>);

impl Crc32Digest {
    pub fn new() -> Self {
        Crc32Digest(CRC32.digest())
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    pub fn finalize(self) -> u32 {
        self.0.finalize()
    }
}

impl Default for Crc32Digest {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Crc32Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32Digest").finish_non_exhaustive()
    }
}
