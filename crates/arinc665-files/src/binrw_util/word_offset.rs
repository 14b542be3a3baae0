//! Typed 16-bit-word offsets.
//!
//! Every intra-file pointer in an ARINC 665 file is a count of 16-bit words
//! from the start of the file; a value of zero means "absent". Keeping the
//! word count in its own type pushes the `* 2` conversion to the byte-read
//! boundary instead of scattering it through the codecs.

use binrw::prelude::*;

use crate::error::{Error, Result};

/// A 32-bit pointer counted in 16-bit words from file start.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, BinRead, BinWrite)]
pub struct WordOffset(pub u32);

impl WordOffset {
    /// The "absent" pointer.
    pub const NULL: WordOffset = WordOffset(0);

    /// Builds a pointer from a byte offset, which must be even.
    pub fn from_byte_offset(offset: usize) -> Self {
        debug_assert!(offset % 2 == 0, "byte offset {offset} is not 16-bit aligned");
        WordOffset((offset / 2) as u32)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The byte offset this pointer addresses.
    pub fn byte_offset(self) -> usize {
        self.0 as usize * 2
    }

    /// Converts to a byte offset after bounds-checking against the file
    /// size. Null pointers are rejected; callers test [`is_null`] first.
    ///
    /// [`is_null`]: WordOffset::is_null
    pub fn checked_byte_offset(self, file_len: usize) -> Result<usize> {
        if self.is_null() {
            return Err(Error::InvalidFile("null pointer dereferenced"));
        }
        let offset = self.byte_offset();
        if offset >= file_len {
            return Err(Error::InvalidFile("pointer beyond end of file"));
        }
        Ok(offset)
    }
}

impl std::fmt::Display for WordOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "+{}w", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_offset_conversion() {
        assert_eq!(WordOffset(10).byte_offset(), 20);
        assert_eq!(WordOffset::from_byte_offset(20), WordOffset(10));
        assert!(WordOffset::NULL.is_null());
    }

    #[test]
    fn test_checked_byte_offset_bounds() {
        assert_eq!(WordOffset(4).checked_byte_offset(10).unwrap(), 8);
        assert!(WordOffset(5).checked_byte_offset(10).is_err());
        assert!(WordOffset::NULL.checked_byte_offset(10).is_err());
    }
}
