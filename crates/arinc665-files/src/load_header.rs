//! Load Header file (`*.LUH`).
//!
//! A load consists of this header plus the data and support files it lists.
//! The header carries two integrity trailers: the 16-bit file CRC at
//! `end - 6` covering everything before it, and the 32-bit Load CRC at
//! `end - 4` covering the header *and* the contents of every data and
//! support file in listing order. Supplement 3/4/5 headers additionally
//! embed a Load Check Value over the same stream, positioned before the
//! file CRC.
//!
//! Because the Load CRC and Load Check Value depend on file contents the
//! codec cannot see, they are patched into the encoded bytes afterwards
//! through the associated `process_*`/`encode_*` functions; see the module
//! documentation of [`crate`] for the orchestration.
//!
//! File layout (Supplement 3/4/5; Supplement 2 ends the pointer block after
//! the user-defined-data pointer and keeps the part-flags word as spare):
//!
//! | Field | Size (bits) |
//! | --- | :-: |
//! | Header File Length | 32 |
//! | Load File Format Version | 16 |
//! | Part Flags | 16 |
//! | Pointer to Load PN | 32 |
//! | Pointer to Target HW IDs | 32 |
//! | Pointer to Data Files | 32 |
//! | Pointer to Support Files | 32 |
//! | Pointer to User Defined Data | 32 |
//! | Pointer to Load Type Description | 32 |
//! | Pointer to Target HW IDs with Positions | 32 |
//! | Pointer to Load Check Value | 32 |
//! | body sections | … |
//! | Load Check Value | … |
//! | Header File CRC | 16 |
//! | Load CRC | 32 |

use std::io::{Cursor, Seek, SeekFrom, Write};

use binrw::{BinReaderExt, BinWriterExt, Endian};

use arinc645::{CheckValue, CheckValueGenerator};

use crate::binrw_util::prelude::*;
use crate::check_value::{decode_check_value_at, read_check_value, write_check_value};
use crate::envelope;
use crate::error::{Error, Result};
use crate::file_list::{check_next_entry_pointer, padded_user_defined_data};
use crate::version::SupportedArinc665Version;

const PART_FLAGS_OFFSET: usize = 6;
const PN_PTR_OFFSET: usize = 8;
const THW_IDS_PTR_OFFSET: usize = 12;
const DATA_FILES_PTR_OFFSET: usize = 16;
const SUPPORT_FILES_PTR_OFFSET: usize = 20;
const UDD_PTR_OFFSET: usize = 24;
const LOAD_TYPE_PTR_OFFSET: usize = 28;
const THW_ID_POSITIONS_PTR_OFFSET: usize = 32;
const LOAD_CHECK_VALUE_PTR_OFFSET: usize = 36;

const HEADER_SIZE_V2: usize = 28;
const HEADER_SIZE_V3: usize = 40;

/// File CRC position from the end of a load header.
pub const FILE_CRC_OFFSET: usize = 6;
/// Load CRC position from the end of a load header.
pub const LOAD_CRC_OFFSET: usize = 4;

/// Download bit of the Part Flags word. The remaining 15 bits are reserved.
pub const PART_FLAG_DOWNLOAD: u16 = 0x0001;

/// One entry of the data- or support-files table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadFileInfo {
    pub filename: String,
    pub part_number: String,
    /// File length in bytes. Supplement 2 *data* files store lengths as
    /// 16-bit word counts on the wire, so for them this is the byte count
    /// rounded up to even.
    pub length: u64,
    /// CRC-16 over the file contents.
    pub crc: u16,
    /// Per-file Check Value (Supplement 3/4/5; `NOT_USED` otherwise).
    pub check_value: CheckValue,
}

/// Decoded `*.LUH` contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadHeaderFile {
    pub version: SupportedArinc665Version,
    /// Part Flags (Supplement 3/4/5; the field is spare and must be zero in
    /// Supplement 2 files).
    pub part_flags: u16,
    pub part_number: String,
    /// Load Type description and id (Supplement 3/4/5).
    pub load_type: Option<(String, u16)>,
    pub target_hardware_ids: Vec<String>,
    /// Position restrictions per target hardware id (Supplement 3/4/5).
    pub target_hardware_id_positions: Vec<(String, Vec<String>)>,
    pub data_files: Vec<LoadFileInfo>,
    pub support_files: Vec<LoadFileInfo>,
    pub user_defined_data: Vec<u8>,
    /// The Load Check Value (Supplement 3/4/5). Encoding writes the stored
    /// value verbatim; load synthesis starts from [`CheckValue::zeroed`] and
    /// splices the computed value via [`encode_load_check_value`].
    ///
    /// [`encode_load_check_value`]: LoadHeaderFile::encode_load_check_value
    pub load_check_value: CheckValue,
    /// The Load CRC trailer word. Patched via [`encode_load_crc`] during
    /// synthesis.
    ///
    /// [`encode_load_crc`]: LoadHeaderFile::encode_load_crc
    pub load_crc: u32,
}

impl LoadHeaderFile {
    pub fn new(version: SupportedArinc665Version) -> Self {
        Self {
            version,
            part_flags: 0,
            part_number: String::new(),
            load_type: None,
            target_hardware_ids: Vec::new(),
            target_hardware_id_positions: Vec::new(),
            data_files: Vec::new(),
            support_files: Vec::new(),
            user_defined_data: Vec::new(),
            load_check_value: CheckValue::NOT_USED,
            load_crc: 0,
        }
    }

    /// Decodes and validates a raw `*.LUH`.
    ///
    /// The file CRC is verified; the Load CRC and Load Check Value are
    /// decoded but *not* verified, as that requires the data and support
    /// file contents.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let version = envelope::check_envelope(raw, FILE_CRC_OFFSET)?;
        let v3 = version == SupportedArinc665Version::Supplement345;

        let part_flags = envelope::read_u16_at(raw, PART_FLAGS_OFFSET)?;
        if !v3 && part_flags != 0 {
            return Err(Error::InvalidFile("spare is not 0"));
        }

        let pn_ptr = WordOffset(envelope::read_u32_at(raw, PN_PTR_OFFSET)?);
        let thw_ids_ptr = WordOffset(envelope::read_u32_at(raw, THW_IDS_PTR_OFFSET)?);
        let data_files_ptr = WordOffset(envelope::read_u32_at(raw, DATA_FILES_PTR_OFFSET)?);
        let support_files_ptr = WordOffset(envelope::read_u32_at(raw, SUPPORT_FILES_PTR_OFFSET)?);
        let udd_ptr = WordOffset(envelope::read_u32_at(raw, UDD_PTR_OFFSET)?);

        let (load_type_ptr, thw_positions_ptr, check_value_ptr) = if v3 {
            (
                WordOffset(envelope::read_u32_at(raw, LOAD_TYPE_PTR_OFFSET)?),
                WordOffset(envelope::read_u32_at(raw, THW_ID_POSITIONS_PTR_OFFSET)?),
                WordOffset(envelope::read_u32_at(raw, LOAD_CHECK_VALUE_PTR_OFFSET)?),
            )
        } else {
            (WordOffset::NULL, WordOffset::NULL, WordOffset::NULL)
        };

        let mut cursor = Cursor::new(raw);

        cursor.seek(SeekFrom::Start(pn_ptr.checked_byte_offset(raw.len())? as u64))?;
        let part_number = read_str(&mut cursor, Endian::Big)?;

        let load_type = if load_type_ptr.is_null() {
            None
        } else {
            cursor.seek(SeekFrom::Start(load_type_ptr.checked_byte_offset(raw.len())? as u64))?;
            let description = read_str(&mut cursor, Endian::Big)?;
            let type_id: u16 = cursor.read_be()?;
            Some((description, type_id))
        };

        cursor.seek(SeekFrom::Start(thw_ids_ptr.checked_byte_offset(raw.len())? as u64))?;
        let target_hardware_ids = read_str_list(&mut cursor, Endian::Big)?;

        let target_hardware_id_positions = if thw_positions_ptr.is_null() {
            Vec::new()
        } else {
            cursor.seek(SeekFrom::Start(thw_positions_ptr.checked_byte_offset(raw.len())? as u64))?;
            let count: u16 = cursor.read_be()?;
            let mut positions = Vec::with_capacity(count.into());
            for _ in 0..count {
                let target_hardware_id = read_str(&mut cursor, Endian::Big)?;
                let target_positions = read_str_list(&mut cursor, Endian::Big)?;
                positions.push((target_hardware_id, target_positions));
            }
            positions
        };

        let data_files = decode_load_files(
            raw,
            data_files_ptr.checked_byte_offset(raw.len())?,
            v3,
            LoadFileKind::Data,
        )?;

        let support_files = if support_files_ptr.is_null() {
            Vec::new()
        } else {
            decode_load_files(
                raw,
                support_files_ptr.checked_byte_offset(raw.len())?,
                v3,
                LoadFileKind::Support,
            )?
        };

        let user_defined_data = if udd_ptr.is_null() {
            Vec::new()
        } else {
            let start = udd_ptr.checked_byte_offset(raw.len())?;
            let end = if check_value_ptr.is_null() {
                raw.len() - FILE_CRC_OFFSET
            } else {
                if check_value_ptr <= udd_ptr {
                    return Err(Error::InvalidFile("load check value pointer precedes user defined data"));
                }
                check_value_ptr.checked_byte_offset(raw.len())?
            };
            raw[start..end].to_vec()
        };

        let load_check_value = if check_value_ptr.is_null() {
            CheckValue::NOT_USED
        } else {
            decode_check_value_at(raw, check_value_ptr.byte_offset())?
        };

        let load_crc = u32::from_be_bytes(raw[raw.len() - LOAD_CRC_OFFSET..].try_into().unwrap());

        Ok(Self {
            version,
            part_flags: if v3 { part_flags } else { 0 },
            part_number,
            load_type,
            target_hardware_ids,
            target_hardware_id_positions,
            data_files,
            support_files,
            user_defined_data,
            load_check_value,
            load_crc,
        })
    }

    /// Encodes the file, computing the envelope fields and the file CRC.
    ///
    /// The stored [`load_check_value`][Self::load_check_value] and
    /// [`load_crc`][Self::load_crc] are written verbatim; synthesis starts
    /// from zeroed values and patches them afterwards.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let v3 = self.version == SupportedArinc665Version::Supplement345;
        let header_size = if v3 { HEADER_SIZE_V3 } else { HEADER_SIZE_V2 };

        let mut raw = vec![0u8; header_size];

        // Part flags (spare in Supplement 2)
        let part_flags = if v3 { self.part_flags } else { 0 };
        raw[PART_FLAGS_OFFSET..PART_FLAGS_OFFSET + 2].copy_from_slice(&part_flags.to_be_bytes());

        // Load part number
        let pn_ptr = WordOffset::from_byte_offset(raw.len());
        let mut block = Cursor::new(Vec::new());
        write_str(&mut block, Endian::Big, &self.part_number)?;
        raw.extend_from_slice(block.get_ref());

        // Load type (Supplement 3/4/5, only when set)
        let mut load_type_ptr = WordOffset::NULL;
        if v3 {
            if let Some((description, type_id)) = &self.load_type {
                load_type_ptr = WordOffset::from_byte_offset(raw.len());
                let mut block = Cursor::new(Vec::new());
                write_str(&mut block, Endian::Big, description)?;
                block.write_be(type_id)?;
                raw.extend_from_slice(block.get_ref());
            }
        }

        // Target hardware ids
        let thw_ids_ptr = WordOffset::from_byte_offset(raw.len());
        let mut block = Cursor::new(Vec::new());
        write_str_list(&mut block, Endian::Big, &self.target_hardware_ids)?;
        raw.extend_from_slice(block.get_ref());

        // Target hardware ids with positions (Supplement 3/4/5); entries
        // without positions are not encoded.
        let mut thw_positions_ptr = WordOffset::NULL;
        if v3 {
            let encoded_positions: Vec<_> = self
                .target_hardware_id_positions
                .iter()
                .filter(|(_, positions)| !positions.is_empty())
                .collect();
            if !encoded_positions.is_empty() {
                thw_positions_ptr = WordOffset::from_byte_offset(raw.len());
                let mut block = Cursor::new(Vec::new());
                let count = u16::try_from(encoded_positions.len())
                    .map_err(|_| Error::InvalidFile("more target hardware ids than the table can hold"))?;
                block.write_be(&count)?;
                for (target_hardware_id, positions) in encoded_positions {
                    write_str(&mut block, Endian::Big, target_hardware_id)?;
                    write_str_list(&mut block, Endian::Big, positions)?;
                }
                raw.extend_from_slice(block.get_ref());
            }
        }

        // Data files table (always present, possibly empty)
        let data_files_ptr = WordOffset::from_byte_offset(raw.len());
        raw.extend_from_slice(&encode_load_files(&self.data_files, v3, LoadFileKind::Data)?);

        // Support files table (pointer null when empty)
        let mut support_files_ptr = WordOffset::NULL;
        if !self.support_files.is_empty() {
            support_files_ptr = WordOffset::from_byte_offset(raw.len());
            raw.extend_from_slice(&encode_load_files(&self.support_files, v3, LoadFileKind::Support)?);
        }

        // User defined data (pointer null when empty)
        let user_defined_data = padded_user_defined_data(&self.user_defined_data);
        let mut udd_ptr = WordOffset::NULL;
        if !user_defined_data.is_empty() {
            udd_ptr = WordOffset::from_byte_offset(raw.len());
            raw.extend_from_slice(&user_defined_data);
        }

        // Load check value structure (Supplement 3/4/5; pointer always set)
        let check_value_ptr = WordOffset::from_byte_offset(raw.len());
        if v3 {
            let mut block = Cursor::new(Vec::new());
            write_check_value(&mut block, Endian::Big, &self.load_check_value)?;
            raw.extend_from_slice(block.get_ref());
        }

        raw[PN_PTR_OFFSET..PN_PTR_OFFSET + 4].copy_from_slice(&pn_ptr.0.to_be_bytes());
        raw[THW_IDS_PTR_OFFSET..THW_IDS_PTR_OFFSET + 4]
            .copy_from_slice(&thw_ids_ptr.0.to_be_bytes());
        raw[DATA_FILES_PTR_OFFSET..DATA_FILES_PTR_OFFSET + 4]
            .copy_from_slice(&data_files_ptr.0.to_be_bytes());
        raw[SUPPORT_FILES_PTR_OFFSET..SUPPORT_FILES_PTR_OFFSET + 4]
            .copy_from_slice(&support_files_ptr.0.to_be_bytes());
        raw[UDD_PTR_OFFSET..UDD_PTR_OFFSET + 4].copy_from_slice(&udd_ptr.0.to_be_bytes());
        if v3 {
            raw[LOAD_TYPE_PTR_OFFSET..LOAD_TYPE_PTR_OFFSET + 4]
                .copy_from_slice(&load_type_ptr.0.to_be_bytes());
            raw[THW_ID_POSITIONS_PTR_OFFSET..THW_ID_POSITIONS_PTR_OFFSET + 4]
                .copy_from_slice(&thw_positions_ptr.0.to_be_bytes());
            raw[LOAD_CHECK_VALUE_PTR_OFFSET..LOAD_CHECK_VALUE_PTR_OFFSET + 4]
                .copy_from_slice(&check_value_ptr.0.to_be_bytes());
        }

        // File CRC + Load CRC trailer
        raw.extend_from_slice(&[0u8; FILE_CRC_OFFSET]);
        envelope::finish_file(&mut raw, self.version, FILE_CRC_OFFSET);
        let load_crc_position = raw.len() - LOAD_CRC_OFFSET;
        raw[load_crc_position..].copy_from_slice(&self.load_crc.to_be_bytes());

        Ok(raw)
    }

    /// Feeds the header's share of the Load CRC stream: everything up to
    /// but excluding the Load CRC trailer word.
    pub fn process_load_crc(raw: &[u8], load_crc: &mut arinc645::Crc32Digest) {
        load_crc.update(&raw[..raw.len() - LOAD_CRC_OFFSET]);
    }

    /// Writes the Load CRC into the trailer of an encoded load header.
    pub fn encode_load_crc(raw: &mut [u8], crc: u32) {
        let position = raw.len() - LOAD_CRC_OFFSET;
        raw[position..].copy_from_slice(&crc.to_be_bytes());
    }

    /// Reads the Load CRC from the trailer of an encoded load header.
    pub fn decode_load_crc(raw: &[u8]) -> u32 {
        u32::from_be_bytes(raw[raw.len() - LOAD_CRC_OFFSET..].try_into().unwrap())
    }

    /// Feeds the header's share of the Load Check Value stream: everything
    /// up to the Load Check Value structure. A no-op for Supplement 2
    /// files, which have no such field.
    pub fn process_load_check_value(
        raw: &[u8],
        generator: &mut CheckValueGenerator,
    ) -> Result<()> {
        let Some(offset) = load_check_value_offset(raw)? else {
            return Ok(());
        };
        generator.update(&raw[..offset]);
        Ok(())
    }

    /// Splices the Load Check Value into an encoded load header and
    /// recomputes the file CRC, which covers it. A no-op for Supplement 2
    /// files.
    pub fn encode_load_check_value(raw: &mut [u8], check_value: &CheckValue) -> Result<()> {
        let Some(offset) = load_check_value_offset(raw)? else {
            return Ok(());
        };

        let encoded = crate::check_value::encode_check_value(check_value);
        raw.get_mut(offset..offset + encoded.len())
            .ok_or(Error::InvalidFile("load check value does not fit the reserved space"))?
            .copy_from_slice(&encoded);

        envelope::update_file_crc(raw, FILE_CRC_OFFSET);
        Ok(())
    }

    /// Reads the Load Check Value of an encoded load header;
    /// [`CheckValue::NOT_USED`] for Supplement 2 files.
    pub fn decode_load_check_value(raw: &[u8]) -> Result<CheckValue> {
        match load_check_value_offset(raw)? {
            None => Ok(CheckValue::NOT_USED),
            Some(offset) => decode_check_value_at(raw, offset),
        }
    }
}

/// Byte offset of the Load Check Value structure; `None` on Supplement 2.
fn load_check_value_offset(raw: &[u8]) -> Result<Option<usize>> {
    let version = SupportedArinc665Version::from_file_format_version(envelope::read_u16_at(
        raw,
        envelope::FORMAT_VERSION_OFFSET,
    )?)?;
    if version != SupportedArinc665Version::Supplement345 {
        return Ok(None);
    }

    let check_value_ptr = WordOffset(envelope::read_u32_at(raw, LOAD_CHECK_VALUE_PTR_OFFSET)?);
    if check_value_ptr.is_null() {
        return Err(Error::InvalidFile("load check value pointer is 0"));
    }
    Ok(Some(check_value_ptr.checked_byte_offset(raw.len())?))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LoadFileKind {
    /// Lengths are stored as 16-bit word counts (Supplement 2 semantics).
    Data,
    /// Lengths are stored in bytes.
    Support,
}

fn encode_load_files(files: &[LoadFileInfo], v3: bool, kind: LoadFileKind) -> Result<Vec<u8>> {
    let mut table = Cursor::new(Vec::new());
    let count = u16::try_from(files.len())
        .map_err(|_| Error::InvalidFile("more files than the table can hold"))?;
    table.write_be(&count)?;

    for (index, info) in files.iter().enumerate() {
        let mut entry = Cursor::new(vec![0u8; 2]);
        entry.seek(SeekFrom::End(0))?;
        write_str(&mut entry, Endian::Big, &info.filename)?;
        write_str(&mut entry, Endian::Big, &info.part_number)?;

        let length_32 = match kind {
            LoadFileKind::Data => info.length.div_ceil(2),
            LoadFileKind::Support => info.length,
        };
        let length_32 = u32::try_from(length_32)
            .map_err(|_| Error::InvalidFile("file length exceeds 32-bit length field"))?;
        entry.write_be(&length_32)?;
        entry.write_be(&info.crc)?;

        if v3 {
            if kind == LoadFileKind::Data {
                entry.write_be(&info.length)?;
            }
            write_check_value(&mut entry, Endian::Big, &info.check_value)?;
        }

        let mut bytes = entry.into_inner();
        let next_entry = if index + 1 == files.len() { 0u16 } else { (bytes.len() / 2) as u16 };
        bytes[..2].copy_from_slice(&next_entry.to_be_bytes());
        table.write_all(&bytes)?;
    }

    Ok(table.into_inner())
}

fn decode_load_files(
    raw: &[u8],
    offset: usize,
    v3: bool,
    kind: LoadFileKind,
) -> Result<Vec<LoadFileInfo>> {
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
        let part_number = read_str(&mut cursor, Endian::Big)?;
        let length_32: u32 = cursor.read_be()?;
        let crc: u16 = cursor.read_be()?;

        // Supplement 2 data files only store the rounded word count, so the
        // byte length reconstructed here may be one larger than the actual
        // file.
        let mut length = match kind {
            LoadFileKind::Data => u64::from(length_32) * 2,
            LoadFileKind::Support => u64::from(length_32),
        };

        let mut check_value = CheckValue::NOT_USED;
        if v3 {
            if kind == LoadFileKind::Data {
                let length_bytes: u64 = cursor.read_be()?;
                let expected_words = length_bytes.div_ceil(2);
                if u32::try_from(expected_words).is_ok_and(|words| words != length_32) {
                    return Err(Error::InvalidFile("inconsistent length fields"));
                }
                length = length_bytes;
            }
            check_value = read_check_value(&mut cursor, Endian::Big)?;
        }

        files.push(LoadFileInfo {
            filename,
            part_number,
            length,
            crc,
            check_value,
        });

        entry_start += u64::from(next_entry) * 2;
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arinc645::{CheckValueGenerator, CheckValueType, crc16, crc32};

    fn sample(version: SupportedArinc665Version) -> LoadHeaderFile {
        let v3 = version == SupportedArinc665Version::Supplement345;
        LoadHeaderFile {
            version,
            part_flags: if v3 { PART_FLAG_DOWNLOAD } else { 0 },
            part_number: "L-001".into(),
            load_type: v3.then(|| ("Operational Software".to_owned(), 0x0010)),
            target_hardware_ids: vec!["THW-A".into(), "THW-B".into()],
            target_hardware_id_positions: if v3 {
                vec![("THW-A".into(), vec!["L".into(), "R".into()])]
            } else {
                Vec::new()
            },
            data_files: vec![
                LoadFileInfo {
                    filename: "F1.BIN".into(),
                    part_number: "D-001".into(),
                    length: 4,
                    crc: 0x1111,
                    check_value: CheckValue::NOT_USED,
                },
                LoadFileInfo {
                    filename: "F2.BIN".into(),
                    part_number: "D-002".into(),
                    length: 7,
                    crc: 0x2222,
                    check_value: if v3 { CheckValue::from_crc16(0x2222) } else { CheckValue::NOT_USED },
                },
            ],
            support_files: vec![LoadFileInfo {
                filename: "S1.TXT".into(),
                part_number: "S-001".into(),
                length: 5,
                crc: 0x3333,
                check_value: CheckValue::NOT_USED,
            }],
            user_defined_data: vec![0xCA, 0xFE],
            load_check_value: if v3 {
                CheckValue::zeroed(CheckValueType::Crc32)
            } else {
                CheckValue::NOT_USED
            },
            load_crc: 0,
        }
    }

    #[test]
    fn test_roundtrip_supplement_345() {
        let original = sample(SupportedArinc665Version::Supplement345);
        let raw = original.to_bytes().unwrap();
        let decoded = LoadHeaderFile::from_bytes(&raw).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.to_bytes().unwrap(), raw);
    }

    #[test]
    fn test_roundtrip_supplement_2() {
        let original = sample(SupportedArinc665Version::Supplement2);
        let raw = original.to_bytes().unwrap();
        let decoded = LoadHeaderFile::from_bytes(&raw).unwrap();
        // Supplement 2 data file lengths survive only as rounded word
        // counts.
        let mut expected = original.clone();
        expected.data_files[1].length = 8;
        assert_eq!(decoded, expected);
        assert_eq!(decoded.to_bytes().unwrap(), raw);
    }

    #[test]
    fn test_file_crc_excludes_load_crc() {
        let raw = sample(SupportedArinc665Version::Supplement345).to_bytes().unwrap();
        let crc_position = raw.len() - FILE_CRC_OFFSET;
        let stored = u16::from_be_bytes(raw[crc_position..crc_position + 2].try_into().unwrap());
        assert_eq!(stored, crc16(&raw[..crc_position]));
    }

    #[test]
    fn test_load_crc_and_check_value_patching() {
        let mut raw = sample(SupportedArinc665Version::Supplement345).to_bytes().unwrap();
        let data = [0x01u8, 0x02, 0x03];

        // Check value first: it is covered by the load CRC.
        let mut generator = CheckValueGenerator::new(CheckValueType::Crc32);
        LoadHeaderFile::process_load_check_value(&raw, &mut generator).unwrap();
        generator.update(&data);
        let check_value = generator.finish();
        LoadHeaderFile::encode_load_check_value(&mut raw, &check_value).unwrap();

        let mut load_crc = arinc645::Crc32Digest::new();
        LoadHeaderFile::process_load_crc(&raw, &mut load_crc);
        load_crc.update(&data);
        let crc = load_crc.finalize();
        LoadHeaderFile::encode_load_crc(&mut raw, crc);

        assert_eq!(LoadHeaderFile::decode_load_check_value(&raw).unwrap(), check_value);
        assert_eq!(LoadHeaderFile::decode_load_crc(&raw), crc);

        // The file CRC was recomputed over the spliced check value.
        let crc_position = raw.len() - FILE_CRC_OFFSET;
        let stored = u16::from_be_bytes(raw[crc_position..crc_position + 2].try_into().unwrap());
        assert_eq!(stored, crc16(&raw[..crc_position]));

        // The header still decodes and now carries the spliced values.
        let decoded = LoadHeaderFile::from_bytes(&raw).unwrap();
        assert_eq!(decoded.load_check_value, check_value);
        assert_eq!(decoded.load_crc, crc);
    }

    #[test]
    fn test_load_crc_matches_streamed_concatenation() {
        let mut raw = sample(SupportedArinc665Version::Supplement345).to_bytes().unwrap();
        let payload = [0xAAu8, 0xBB, 0xCC, 0xDD];

        let mut load_crc = arinc645::Crc32Digest::new();
        LoadHeaderFile::process_load_crc(&raw, &mut load_crc);
        load_crc.update(&payload);
        LoadHeaderFile::encode_load_crc(&mut raw, load_crc.finalize());

        let mut concatenated = raw[..raw.len() - LOAD_CRC_OFFSET].to_vec();
        concatenated.extend_from_slice(&payload);
        assert_eq!(LoadHeaderFile::decode_load_crc(&raw), crc32(&concatenated));
    }

    #[test]
    fn test_nonzero_spare_rejected_on_supplement_2() {
        let mut raw = sample(SupportedArinc665Version::Supplement2).to_bytes().unwrap();
        raw[PART_FLAGS_OFFSET + 1] = 0x01;
        envelope::update_file_crc(&mut raw, FILE_CRC_OFFSET);
        assert!(matches!(
            LoadHeaderFile::from_bytes(&raw),
            Err(Error::InvalidFile("spare is not 0")),
        ));
    }

    #[test]
    fn test_inconsistent_length_fields_rejected() {
        let mut header = sample(SupportedArinc665Version::Supplement345);
        header.data_files.truncate(1);
        header.support_files.clear();
        let mut raw = header.to_bytes().unwrap();

        // The single data file entry stores word count 2 for its 4-byte
        // length; bump the 64-bit byte length to 6 to break consistency.
        let table_offset =
            u32::from_be_bytes(raw[DATA_FILES_PTR_OFFSET..DATA_FILES_PTR_OFFSET + 4].try_into().unwrap())
                as usize
                * 2;
        // count(2) + next(2) + "F1.BIN"(8) + "D-001"(8) + length(4) + crc(2)
        let byte_length_offset = table_offset + 2 + 2 + 8 + 8 + 4 + 2;
        raw[byte_length_offset..byte_length_offset + 8].copy_from_slice(&6u64.to_be_bytes());
        envelope::update_file_crc(&mut raw, FILE_CRC_OFFSET);

        assert!(matches!(
            LoadHeaderFile::from_bytes(&raw),
            Err(Error::InvalidFile("inconsistent length fields")),
        ));
    }

    #[test]
    fn test_empty_positions_are_not_encoded() {
        let mut header = sample(SupportedArinc665Version::Supplement345);
        header.target_hardware_id_positions = vec![("THW-A".into(), Vec::new())];
        let decoded = LoadHeaderFile::from_bytes(&header.to_bytes().unwrap()).unwrap();
        assert!(decoded.target_hardware_id_positions.is_empty());
    }

    #[test]
    fn test_no_load_type_encodes_null_pointer() {
        let mut header = sample(SupportedArinc665Version::Supplement345);
        header.load_type = None;
        let raw = header.to_bytes().unwrap();
        let decoded = LoadHeaderFile::from_bytes(&raw).unwrap();
        assert_eq!(decoded.load_type, None);
    }

    #[test]
    fn test_supplement_2_has_no_load_check_value() {
        let raw = sample(SupportedArinc665Version::Supplement2).to_bytes().unwrap();
        assert_eq!(
            LoadHeaderFile::decode_load_check_value(&raw).unwrap(),
            CheckValue::NOT_USED,
        );

        let mut generator = CheckValueGenerator::new(CheckValueType::Crc32);
        LoadHeaderFile::process_load_check_value(&raw, &mut generator).unwrap();
        // Nothing was fed: the value equals the empty-input value.
        assert_eq!(
            generator.finish(),
            CheckValueGenerator::check_value(CheckValueType::Crc32, &[]),
        );
    }
}
