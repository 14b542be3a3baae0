//! List of Files file (`FILES.LUM`).
//!
//! The List of Files enumerates every file of the media set with its path,
//! medium and CRC, and ties the set together: a copy sits on the root of
//! each medium, identical except for the media sequence number.
//!
//! File layout:
//!
//! | Field | Size (bits) |
//! | --- | :-: |
//! | File Length | 32 |
//! | File Format Version | 16 |
//! | Spare | 16 |
//! | Pointer to Media Set PN | 32 |
//! | Pointer to Files Table | 32 |
//! | Pointer to User Defined Data | 32 |
//! | Pointer to File Check Value (3/4/5 only) | 32 |
//! | Media Set PN, Sequence Number, Members | … |
//! | Files Table | … |
//! | User Defined Data | … |
//! | File Check Value (3/4/5 only) | … |
//! | File CRC | 16 |

use std::io::{Cursor, Seek, SeekFrom, Write};

use binrw::{BinReaderExt, BinWriterExt, Endian};
use log::warn;

use arinc645::{CheckValue, CheckValueType};

use crate::FileClass;
use crate::binrw_util::prelude::*;
use crate::check_value::{decode_check_value_at, read_check_value, write_check_value};
use crate::envelope::{self, DEFAULT_CRC_OFFSET};
use crate::error::{Error, Result};
use crate::version::SupportedArinc665Version;

const SPARE_OFFSET: usize = 6;
const MEDIA_SET_PN_PTR_OFFSET: usize = 8;
const FILES_PTR_OFFSET: usize = 12;
const UDD_PTR_OFFSET: usize = 16;
const CHECK_VALUE_PTR_OFFSET: usize = 20;

const HEADER_SIZE_V2: usize = 20;
const HEADER_SIZE_V3: usize = 24;

/// One row of the files table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub filename: String,
    /// Parent directory with `\` separators; the root is `\`.
    pub path_name: String,
    /// Medium the file lives on.
    pub member_sequence_number: u16,
    /// CRC-16 over the file contents.
    pub crc: u16,
    /// Per-file Check Value (Supplement 3/4/5; `NOT_USED` otherwise).
    pub check_value: CheckValue,
}

/// Decoded `FILES.LUM` contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListFile {
    pub version: SupportedArinc665Version,
    pub media_set_pn: String,
    pub media_sequence_number: u8,
    pub number_of_media_set_members: u8,
    pub files: Vec<FileInfo>,
    pub user_defined_data: Vec<u8>,
    /// The list's own Check Value (Supplement 3/4/5). Computed over the
    /// file up to the Check Value structure; use [`encode_check_value`]
    /// after encoding to splice the real value in.
    ///
    /// [`encode_check_value`]: FileListFile::encode_check_value
    pub check_value: CheckValue,
}

impl FileListFile {
    pub fn new(version: SupportedArinc665Version) -> Self {
        Self {
            version,
            media_set_pn: String::new(),
            media_sequence_number: 0,
            number_of_media_set_members: 0,
            files: Vec::new(),
            user_defined_data: Vec::new(),
            check_value: CheckValue::NOT_USED,
        }
    }

    /// Decodes and validates a raw `FILES.LUM`.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let version = envelope::check_envelope(raw, DEFAULT_CRC_OFFSET)?;
        let v3 = version == SupportedArinc665Version::Supplement345;

        if envelope::read_u16_at(raw, SPARE_OFFSET)? != 0 {
            return Err(Error::InvalidFile("spare is not 0"));
        }

        let pn_ptr = WordOffset(envelope::read_u32_at(raw, MEDIA_SET_PN_PTR_OFFSET)?);
        let files_ptr = WordOffset(envelope::read_u32_at(raw, FILES_PTR_OFFSET)?);
        let udd_ptr = WordOffset(envelope::read_u32_at(raw, UDD_PTR_OFFSET)?);
        let check_value_ptr = if v3 {
            WordOffset(envelope::read_u32_at(raw, CHECK_VALUE_PTR_OFFSET)?)
        } else {
            WordOffset::NULL
        };

        // Media set part number block
        let mut cursor = Cursor::new(raw);
        cursor.seek(SeekFrom::Start(pn_ptr.checked_byte_offset(raw.len())? as u64))?;
        let media_set_pn = read_str(&mut cursor, Endian::Big)?;
        let media_sequence_number: u8 = cursor.read_be()?;
        let number_of_media_set_members: u8 = cursor.read_be()?;

        let files = decode_files_info(raw, files_ptr.checked_byte_offset(raw.len())?, v3)?;

        let user_defined_data = if udd_ptr.is_null() {
            Vec::new()
        } else {
            let start = udd_ptr.checked_byte_offset(raw.len())?;
            let end = if check_value_ptr.is_null() {
                raw.len() - DEFAULT_CRC_OFFSET
            } else {
                if check_value_ptr <= udd_ptr {
                    return Err(Error::InvalidFile("check value pointer precedes user defined data"));
                }
                check_value_ptr.checked_byte_offset(raw.len())?
            };
            raw[start..end].to_vec()
        };

        let check_value = if check_value_ptr.is_null() {
            CheckValue::NOT_USED
        } else {
            decode_check_value_at(raw, check_value_ptr.byte_offset())?
        };

        Ok(Self {
            version,
            media_set_pn,
            media_sequence_number,
            number_of_media_set_members,
            files,
            user_defined_data,
            check_value,
        })
    }

    /// Encodes the file, computing the envelope fields and the file CRC.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let v3 = self.version == SupportedArinc665Version::Supplement345;
        let header_size = if v3 { HEADER_SIZE_V3 } else { HEADER_SIZE_V2 };

        let mut raw = vec![0u8; header_size];

        // Media set part number block
        let pn_ptr = WordOffset::from_byte_offset(raw.len());
        let mut block = Cursor::new(Vec::new());
        write_str(&mut block, Endian::Big, &self.media_set_pn)?;
        block.write_be(&self.media_sequence_number)?;
        block.write_be(&self.number_of_media_set_members)?;
        raw.extend_from_slice(block.get_ref());

        // Files table
        let files_ptr = WordOffset::from_byte_offset(raw.len());
        raw.extend_from_slice(&encode_files_info(&self.files, v3)?);

        // User defined data
        let user_defined_data = padded_user_defined_data(&self.user_defined_data);
        let udd_ptr = if user_defined_data.is_empty() {
            WordOffset::NULL
        } else {
            let ptr = WordOffset::from_byte_offset(raw.len());
            raw.extend_from_slice(&user_defined_data);
            ptr
        };

        // File check value structure (Supplement 3/4/5 only)
        let check_value_ptr = WordOffset::from_byte_offset(raw.len());
        if v3 {
            let mut cursor = Cursor::new(Vec::new());
            write_check_value(&mut cursor, Endian::Big, &self.check_value)?;
            raw.extend_from_slice(cursor.get_ref());
        }

        raw[MEDIA_SET_PN_PTR_OFFSET..MEDIA_SET_PN_PTR_OFFSET + 4]
            .copy_from_slice(&pn_ptr.0.to_be_bytes());
        raw[FILES_PTR_OFFSET..FILES_PTR_OFFSET + 4].copy_from_slice(&files_ptr.0.to_be_bytes());
        raw[UDD_PTR_OFFSET..UDD_PTR_OFFSET + 4].copy_from_slice(&udd_ptr.0.to_be_bytes());
        if v3 {
            raw[CHECK_VALUE_PTR_OFFSET..CHECK_VALUE_PTR_OFFSET + 4]
                .copy_from_slice(&check_value_ptr.0.to_be_bytes());
        }

        // File CRC
        raw.extend_from_slice(&[0u8; 2]);
        envelope::finish_file(&mut raw, self.version, DEFAULT_CRC_OFFSET);

        Ok(raw)
    }

    /// Splices the list's own Check Value into an encoded `FILES.LUM` and
    /// recomputes the file CRC.
    pub fn encode_check_value(raw: &mut [u8], check_value: &CheckValue) -> Result<()> {
        let version = SupportedArinc665Version::from_file_format_version(envelope::read_u16_at(
            raw,
            envelope::FORMAT_VERSION_OFFSET,
        )?)?;
        if version != SupportedArinc665Version::Supplement345 {
            return Ok(());
        }

        let check_value_ptr = WordOffset(envelope::read_u32_at(raw, CHECK_VALUE_PTR_OFFSET)?);
        let offset = check_value_ptr.checked_byte_offset(raw.len())?;

        let encoded = crate::check_value::encode_check_value(check_value);
        raw.get_mut(offset..offset + encoded.len())
            .ok_or(Error::InvalidFile("check value does not fit the reserved space"))?
            .copy_from_slice(&encoded);

        envelope::update_file_crc(raw, DEFAULT_CRC_OFFSET);
        Ok(())
    }

    /// The byte region the list's own Check Value is computed over: the
    /// file prefix up to the Check Value structure. Supplement 3/4/5 only.
    pub fn check_value_region(raw: &[u8]) -> Result<&[u8]> {
        let version = SupportedArinc665Version::from_file_format_version(envelope::read_u16_at(
            raw,
            envelope::FORMAT_VERSION_OFFSET,
        )?)?;
        if version != SupportedArinc665Version::Supplement345 {
            return Err(Error::InvalidFile("file check value requires Supplement 3/4/5"));
        }
        let check_value_ptr = WordOffset(envelope::read_u32_at(raw, CHECK_VALUE_PTR_OFFSET)?);
        let offset = check_value_ptr.checked_byte_offset(raw.len())?;
        Ok(&raw[..offset])
    }

    /// The declared Check Value algorithm of the list itself.
    pub fn check_value_type(&self) -> CheckValueType {
        self.check_value.check_value_type()
    }

    /// Whether two decoded `FILES.LUM` files describe the same media set.
    ///
    /// Part number, member count, user defined data and the files table
    /// must agree; the rows for `LOADS.LUM`/`BATCHES.LUM` are compared by
    /// name and path only, as their CRCs legitimately differ between media
    /// (each copy encodes its own media sequence number).
    pub fn belongs_to_same_media_set(&self, other: &FileListFile) -> bool {
        if self.media_set_pn != other.media_set_pn
            || self.number_of_media_set_members != other.number_of_media_set_members
            || self.user_defined_data != other.user_defined_data
            || self.files.len() != other.files.len()
        {
            return false;
        }

        self.files.iter().zip(&other.files).all(|(mine, theirs)| {
            if mine.filename != theirs.filename || mine.path_name != theirs.path_name {
                return false;
            }
            match FileClass::from_filename(&mine.filename) {
                Some(FileClass::LoadList | FileClass::BatchList) => true,
                _ => {
                    mine.crc == theirs.crc
                        && mine.member_sequence_number == theirs.member_sequence_number
                        && mine.check_value == theirs.check_value
                }
            }
        })
    }
}

/// Pads odd user defined data to even length, logging the repair.
pub(crate) fn padded_user_defined_data(user_defined_data: &[u8]) -> Vec<u8> {
    let mut padded = user_defined_data.to_vec();
    if padded.len() % 2 != 0 {
        warn!("user defined data must be 16-bit aligned - extending by one zero byte");
        padded.push(0);
    }
    padded
}

fn encode_files_info(files: &[FileInfo], v3: bool) -> Result<Vec<u8>> {
    let mut table = Cursor::new(Vec::new());
    let count = u16::try_from(files.len())
        .map_err(|_| Error::InvalidFile("more files than the table can hold"))?;
    table.write_be(&count)?;

    for (index, info) in files.iter().enumerate() {
        let mut entry = Cursor::new(vec![0u8; 2]);
        entry.seek(SeekFrom::End(0))?;
        write_str(&mut entry, Endian::Big, &info.filename)?;
        write_str(&mut entry, Endian::Big, &info.path_name)?;
        entry.write_be(&info.member_sequence_number)?;
        entry.write_be(&info.crc)?;
        if v3 {
            write_check_value(&mut entry, Endian::Big, &info.check_value)?;
        }

        let mut bytes = entry.into_inner();
        let next_entry = if index + 1 == files.len() { 0u16 } else { (bytes.len() / 2) as u16 };
        bytes[..2].copy_from_slice(&next_entry.to_be_bytes());
        table.write_all(&bytes)?;
    }

    Ok(table.into_inner())
}

fn decode_files_info(raw: &[u8], offset: usize, v3: bool) -> Result<Vec<FileInfo>> {
    let mut cursor = Cursor::new(raw);
    cursor.seek(SeekFrom::Start(offset as u64))?;

    let count: u16 = cursor.read_be()?;
    let mut files = Vec::with_capacity(count.into());

    let mut entry_start = cursor.stream_position()?;
    for index in 0..count {
        cursor.seek(SeekFrom::Start(entry_start))?;

        let next_entry: u16 = cursor.read_be()?;
        check_next_entry_pointer(next_entry, index, count)?;

        let filename = read_str(&mut cursor, Endian::Big)?;
        let path_name = read_str(&mut cursor, Endian::Big)?;
        let member_sequence_number: u16 = cursor.read_be()?;
        let crc: u16 = cursor.read_be()?;
        let check_value = if v3 {
            read_check_value(&mut cursor, Endian::Big)?
        } else {
            CheckValue::NOT_USED
        };

        files.push(FileInfo {
            filename,
            path_name,
            member_sequence_number,
            crc,
            check_value,
        });

        entry_start += u64::from(next_entry) * 2;
    }

    Ok(files)
}

/// Enforces the next-entry-pointer rule: non-zero on every entry but the
/// last, zero on the last.
pub(crate) fn check_next_entry_pointer(next_entry: u16, index: u16, count: u16) -> Result<()> {
    let last = index + 1 == count;
    if last && next_entry != 0 {
        return Err(Error::InvalidFile("next entry pointer of last entry is not 0"));
    }
    if !last && next_entry == 0 {
        return Err(Error::InvalidFile("next entry pointer is 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arinc645::crc16;

    fn sample(version: SupportedArinc665Version) -> FileListFile {
        FileListFile {
            version,
            media_set_pn: "SET-001".into(),
            media_sequence_number: 1,
            number_of_media_set_members: 2,
            files: vec![
                FileInfo {
                    filename: "LOADS.LUM".into(),
                    path_name: "\\".into(),
                    member_sequence_number: 1,
                    crc: 0x1234,
                    check_value: CheckValue::NOT_USED,
                },
                FileInfo {
                    filename: "README.TXT".into(),
                    path_name: "\\DOCS".into(),
                    member_sequence_number: 2,
                    crc: 0xABCD,
                    check_value: match version {
                        SupportedArinc665Version::Supplement2 => CheckValue::NOT_USED,
                        SupportedArinc665Version::Supplement345 => CheckValue::from_crc16(0xABCD),
                    },
                },
            ],
            user_defined_data: vec![0xDE, 0xAD],
            check_value: match version {
                SupportedArinc665Version::Supplement2 => CheckValue::NOT_USED,
                SupportedArinc665Version::Supplement345 => {
                    CheckValue::zeroed(CheckValueType::Sha256)
                }
            },
        }
    }

    #[test]
    fn test_roundtrip_supplement_2() {
        let original = sample(SupportedArinc665Version::Supplement2);
        let raw = original.to_bytes().unwrap();
        let decoded = FileListFile::from_bytes(&raw).unwrap();
        assert_eq!(decoded, original);
        // Byte-exact idempotence
        assert_eq!(decoded.to_bytes().unwrap(), raw);
    }

    #[test]
    fn test_roundtrip_supplement_345() {
        let original = sample(SupportedArinc665Version::Supplement345);
        let raw = original.to_bytes().unwrap();
        let decoded = FileListFile::from_bytes(&raw).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.to_bytes().unwrap(), raw);
    }

    #[test]
    fn test_trailing_crc_covers_prefix() {
        let raw = sample(SupportedArinc665Version::Supplement2).to_bytes().unwrap();
        let stored = u16::from_be_bytes(raw[raw.len() - 2..].try_into().unwrap());
        assert_eq!(stored, crc16(&raw[..raw.len() - 2]));
    }

    #[test]
    fn test_corruption_is_detected() {
        let mut raw = sample(SupportedArinc665Version::Supplement2).to_bytes().unwrap();
        raw[9] ^= 0xFF;
        assert!(matches!(
            FileListFile::from_bytes(&raw),
            Err(Error::CrcMismatch { .. }),
        ));
    }

    #[test]
    fn test_spliced_check_value_roundtrips() {
        let original = sample(SupportedArinc665Version::Supplement345);
        let mut raw = original.to_bytes().unwrap();

        let region = FileListFile::check_value_region(&raw).unwrap().to_vec();
        let check_value = arinc645::CheckValueGenerator::check_value(
            CheckValueType::Sha256,
            &region,
        );
        FileListFile::encode_check_value(&mut raw, &check_value).unwrap();

        let decoded = FileListFile::from_bytes(&raw).unwrap();
        assert_eq!(decoded.check_value, check_value);
        assert_eq!(decoded.check_value_type(), CheckValueType::Sha256);
    }

    #[test]
    fn test_udd_padding_is_repaired_on_encode() {
        let mut file_list = sample(SupportedArinc665Version::Supplement2);
        file_list.user_defined_data = vec![0xAA, 0xBB, 0xCC];
        let raw = file_list.to_bytes().unwrap();
        let decoded = FileListFile::from_bytes(&raw).unwrap();
        assert_eq!(decoded.user_defined_data, vec![0xAA, 0xBB, 0xCC, 0x00]);
    }

    #[test]
    fn test_belongs_to_same_media_set() {
        let first = sample(SupportedArinc665Version::Supplement2);

        let mut second = first.clone();
        second.media_sequence_number = 2;
        // The list-of-loads row may differ in CRC between media.
        second.files[0].crc = 0x9999;
        assert!(first.belongs_to_same_media_set(&second));

        // A regular file row must not differ.
        second.files[1].crc = 0x9999;
        assert!(!first.belongs_to_same_media_set(&second));

        let mut third = first.clone();
        third.media_set_pn = "SET-002".into();
        assert!(!first.belongs_to_same_media_set(&third));
    }

    #[test]
    fn test_empty_table_and_udd() {
        let mut file_list = FileListFile::new(SupportedArinc665Version::Supplement2);
        file_list.media_set_pn = "PN".into();
        file_list.media_sequence_number = 1;
        file_list.number_of_media_set_members = 1;
        let raw = file_list.to_bytes().unwrap();
        let decoded = FileListFile::from_bytes(&raw).unwrap();
        assert!(decoded.files.is_empty());
        assert!(decoded.user_defined_data.is_empty());
    }

    #[test]
    fn test_broken_next_entry_pointer_is_fatal() {
        let raw = sample(SupportedArinc665Version::Supplement2).to_bytes().unwrap();
        let files_ptr = u32::from_be_bytes(raw[12..16].try_into().unwrap()) as usize * 2;
        let mut broken = raw.clone();
        // Zero the first entry's next-entry pointer (two entries follow the
        // count word, so the first one must chain).
        broken[files_ptr + 2] = 0;
        broken[files_ptr + 3] = 0;
        let end = broken.len() - 2;
        let crc = crc16(&broken[..end]);
        broken[end..].copy_from_slice(&crc.to_be_bytes());
        assert!(matches!(
            FileListFile::from_bytes(&broken),
            Err(Error::InvalidFile(_)),
        ));
    }
}
