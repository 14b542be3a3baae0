//! Codec error types.

use thiserror::Error;

/// Codec result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Field a CRC mismatch was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcField {
    /// The trailing 16-bit file CRC.
    File,
    /// The 32-bit Load CRC of a Load Header trailer.
    Load,
}

impl std::fmt::Display for CrcField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrcField::File => f.write_str("file CRC"),
            CrcField::Load => f.write_str("load CRC"),
        }
    }
}

/// Errors raised while encoding or decoding ARINC 665 files.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed raw bytes: bad length fields, non-zero spare, pointer out
    /// of bounds or mis-ordered, next-entry-pointer rule violations,
    /// inconsistent length fields.
    #[error("invalid ARINC 665 file: {0}")]
    InvalidFile(&'static str),

    /// The file format version is not one this library encodes or decodes.
    #[error("unsupported ARINC 665 file format version {0:#06x}")]
    UnsupportedVersion(u16),

    /// A stored CRC does not match the computed one.
    #[error("{field} mismatch: computed {computed:#010x}, stored {stored:#010x}")]
    CrcMismatch {
        field: CrcField,
        computed: u32,
        stored: u32,
    },

    /// Low-level read/write failure from the binary layer.
    #[error("binary layout error: {0}")]
    Binary(#[from] binrw::Error),

    /// Failure of the underlying byte stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
