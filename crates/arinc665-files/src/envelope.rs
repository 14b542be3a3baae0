//! Common file envelope.
//!
//! Every ARINC 665 file starts with a 32-bit file length in 16-bit words
//! and a 16-bit file format version, and ends with a 16-bit file CRC
//! covering everything before it. Load Headers keep the file CRC at
//! `end - 6` so the 32-bit Load CRC can follow it.

use arinc645::crc16;

use crate::error::{CrcField, Error, Result};
use crate::version::SupportedArinc665Version;

/// Byte offset of the file length field.
pub const FILE_LENGTH_OFFSET: usize = 0;
/// Byte offset of the file format version field.
pub const FORMAT_VERSION_OFFSET: usize = 4;
/// File CRC position from the end for all types except Load Headers.
pub const DEFAULT_CRC_OFFSET: usize = 2;

/// Validates length, version and file CRC of a raw file.
///
/// `crc_offset` is the distance of the file CRC from the end of the file.
/// Returns the decoded supplement generation.
pub fn check_envelope(raw: &[u8], crc_offset: usize) -> Result<SupportedArinc665Version> {
    if raw.len() < 6 + crc_offset || raw.len() % 2 != 0 {
        return Err(Error::InvalidFile("file too short or not 16-bit aligned"));
    }

    let stored_length = u32::from_be_bytes(raw[FILE_LENGTH_OFFSET..FILE_LENGTH_OFFSET + 4].try_into().unwrap());
    if stored_length as u64 * 2 != raw.len() as u64 {
        return Err(Error::InvalidFile("file length field does not match file size"));
    }

    let format_version = u16::from_be_bytes(
        raw[FORMAT_VERSION_OFFSET..FORMAT_VERSION_OFFSET + 2].try_into().unwrap(),
    );
    let version = SupportedArinc665Version::from_file_format_version(format_version)?;

    let crc_position = raw.len() - crc_offset;
    let computed = crc16(&raw[..crc_position]);
    let stored = u16::from_be_bytes(raw[crc_position..crc_position + 2].try_into().unwrap());
    if computed != stored {
        return Err(Error::CrcMismatch {
            field: CrcField::File,
            computed: computed.into(),
            stored: stored.into(),
        });
    }

    Ok(version)
}

/// Stamps length, version and file CRC into an encoded file.
///
/// The buffer must already have its final size, including zeroed space for
/// the CRC fields.
pub fn finish_file(raw: &mut [u8], version: SupportedArinc665Version, crc_offset: usize) {
    debug_assert!(raw.len() % 2 == 0, "encoded file is not 16-bit aligned");

    let length_words = (raw.len() / 2) as u32;
    raw[FILE_LENGTH_OFFSET..FILE_LENGTH_OFFSET + 4].copy_from_slice(&length_words.to_be_bytes());
    raw[FORMAT_VERSION_OFFSET..FORMAT_VERSION_OFFSET + 2]
        .copy_from_slice(&version.file_format_version().to_be_bytes());

    update_file_crc(raw, crc_offset);
}

/// Recomputes the file CRC over the prefix and stores it.
pub fn update_file_crc(raw: &mut [u8], crc_offset: usize) {
    let crc_position = raw.len() - crc_offset;
    let crc = crc16(&raw[..crc_position]);
    raw[crc_position..crc_position + 2].copy_from_slice(&crc.to_be_bytes());
}

/// Reads a big-endian `u16` at a byte offset, bounds-checked.
pub fn read_u16_at(raw: &[u8], offset: usize) -> Result<u16> {
    raw.get(offset..offset + 2)
        .map(|bytes| u16::from_be_bytes(bytes.try_into().unwrap()))
        .ok_or(Error::InvalidFile("field beyond end of file"))
}

/// Reads a big-endian `u32` at a byte offset, bounds-checked.
pub fn read_u32_at(raw: &[u8], offset: usize) -> Result<u32> {
    raw.get(offset..offset + 4)
        .map(|bytes| u32::from_be_bytes(bytes.try_into().unwrap()))
        .ok_or(Error::InvalidFile("field beyond end of file"))
}
