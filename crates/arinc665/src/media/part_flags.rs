//! Load Part Flags.

use modular_bitfield::prelude::*;

/// The 16-bit Part Flags word of a load (Supplement 3/4/5).
///
/// Bit 0 marks a download part; the remaining 15 bits are reserved and
/// stay zero.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartFlags {
    /// The part contains instructions for download rather than upload.
    pub download: bool,
    #[skip]
    __: B15,
}

impl Default for PartFlags {
    fn default() -> Self {
        PartFlags::new()
    }
}

impl From<u16> for PartFlags {
    fn from(value: u16) -> Self {
        PartFlags::from_bytes(value.to_le_bytes())
    }
}

impl From<PartFlags> for u16 {
    fn from(value: PartFlags) -> Self {
        u16::from_le_bytes(value.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_is_bit_zero() {
        let flags = PartFlags::new().with_download(true);
        assert_eq!(u16::from(flags), 0x0001);
        assert!(PartFlags::from(0x0001).download());
        assert!(!PartFlags::from(0x0000).download());
    }

    #[test]
    fn test_u16_roundtrip() {
        for value in [0x0000u16, 0x0001] {
            assert_eq!(u16::from(PartFlags::from(value)), value);
        }
    }
}
