//! List of Loads file (`LOADS.LUM`).
//!
//! Enumerates every load of the media set: header filename, part number,
//! medium and compatible target hardware. A copy sits on the root of each
//! medium, identical except for the media sequence number.

use std::io::{Cursor, Seek, SeekFrom, Write};

use binrw::{BinReaderExt, BinWriterExt, Endian};

use crate::binrw_util::prelude::*;
use crate::envelope::{self, DEFAULT_CRC_OFFSET};
use crate::error::{Error, Result};
use crate::file_list::{check_next_entry_pointer, padded_user_defined_data};
use crate::version::SupportedArinc665Version;

const SPARE_OFFSET: usize = 6;
const MEDIA_SET_PN_PTR_OFFSET: usize = 8;
const LOADS_PTR_OFFSET: usize = 12;
const UDD_PTR_OFFSET: usize = 16;

const HEADER_SIZE: usize = 20;

/// One row of the loads table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadInfo {
    pub part_number: String,
    pub header_filename: String,
    /// Medium the load header lives on.
    pub member_sequence_number: u16,
    pub target_hardware_ids: Vec<String>,
}

/// Decoded `LOADS.LUM` contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadListFile {
    pub version: SupportedArinc665Version,
    pub media_set_pn: String,
    pub media_sequence_number: u8,
    pub number_of_media_set_members: u8,
    pub loads: Vec<LoadInfo>,
    pub user_defined_data: Vec<u8>,
}

impl LoadListFile {
    pub fn new(version: SupportedArinc665Version) -> Self {
        Self {
            version,
            media_set_pn: String::new(),
            media_sequence_number: 0,
            number_of_media_set_members: 0,
            loads: Vec::new(),
            user_defined_data: Vec::new(),
        }
    }

    /// Decodes and validates a raw `LOADS.LUM`.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let version = envelope::check_envelope(raw, DEFAULT_CRC_OFFSET)?;

        if envelope::read_u16_at(raw, SPARE_OFFSET)? != 0 {
            return Err(Error::InvalidFile("spare is not 0"));
        }

        let pn_ptr = WordOffset(envelope::read_u32_at(raw, MEDIA_SET_PN_PTR_OFFSET)?);
        let loads_ptr = WordOffset(envelope::read_u32_at(raw, LOADS_PTR_OFFSET)?);
        let udd_ptr = WordOffset(envelope::read_u32_at(raw, UDD_PTR_OFFSET)?);

        let mut cursor = Cursor::new(raw);
        cursor.seek(SeekFrom::Start(pn_ptr.checked_byte_offset(raw.len())? as u64))?;
        let media_set_pn = read_str(&mut cursor, Endian::Big)?;
        let media_sequence_number: u8 = cursor.read_be()?;
        let number_of_media_set_members: u8 = cursor.read_be()?;

        let loads = decode_loads_info(raw, loads_ptr.checked_byte_offset(raw.len())?)?;

        let user_defined_data = if udd_ptr.is_null() {
            Vec::new()
        } else {
            let start = udd_ptr.checked_byte_offset(raw.len())?;
            raw[start..raw.len() - DEFAULT_CRC_OFFSET].to_vec()
        };

        Ok(Self {
            version,
            media_set_pn,
            media_sequence_number,
            number_of_media_set_members,
            loads,
            user_defined_data,
        })
    }

    /// Encodes the file, computing the envelope fields and the file CRC.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut raw = vec![0u8; HEADER_SIZE];

        let pn_ptr = WordOffset::from_byte_offset(raw.len());
        let mut block = Cursor::new(Vec::new());
        write_str(&mut block, Endian::Big, &self.media_set_pn)?;
        block.write_be(&self.media_sequence_number)?;
        block.write_be(&self.number_of_media_set_members)?;
        raw.extend_from_slice(block.get_ref());

        let loads_ptr = WordOffset::from_byte_offset(raw.len());
        raw.extend_from_slice(&encode_loads_info(&self.loads)?);

        let user_defined_data = padded_user_defined_data(&self.user_defined_data);
        let udd_ptr = if user_defined_data.is_empty() {
            WordOffset::NULL
        } else {
            let ptr = WordOffset::from_byte_offset(raw.len());
            raw.extend_from_slice(&user_defined_data);
            ptr
        };

        raw[MEDIA_SET_PN_PTR_OFFSET..MEDIA_SET_PN_PTR_OFFSET + 4]
            .copy_from_slice(&pn_ptr.0.to_be_bytes());
        raw[LOADS_PTR_OFFSET..LOADS_PTR_OFFSET + 4].copy_from_slice(&loads_ptr.0.to_be_bytes());
        raw[UDD_PTR_OFFSET..UDD_PTR_OFFSET + 4].copy_from_slice(&udd_ptr.0.to_be_bytes());

        raw.extend_from_slice(&[0u8; 2]);
        envelope::finish_file(&mut raw, self.version, DEFAULT_CRC_OFFSET);

        Ok(raw)
    }

    /// Whether two decoded `LOADS.LUM` files describe the same media set:
    /// everything but the media sequence number must agree.
    pub fn belongs_to_same_media_set(&self, other: &LoadListFile) -> bool {
        self.media_set_pn == other.media_set_pn
            && self.number_of_media_set_members == other.number_of_media_set_members
            && self.user_defined_data == other.user_defined_data
            && self.loads == other.loads
    }
}

fn encode_loads_info(loads: &[LoadInfo]) -> Result<Vec<u8>> {
    let mut table = Cursor::new(Vec::new());
    let count = u16::try_from(loads.len())
        .map_err(|_| Error::InvalidFile("more loads than the table can hold"))?;
    table.write_be(&count)?;

    for (index, info) in loads.iter().enumerate() {
        let mut entry = Cursor::new(vec![0u8; 2]);
        entry.seek(SeekFrom::End(0))?;
        write_str(&mut entry, Endian::Big, &info.header_filename)?;
        write_str(&mut entry, Endian::Big, &info.part_number)?;
        entry.write_be(&info.member_sequence_number)?;
        write_str_list(&mut entry, Endian::Big, &info.target_hardware_ids)?;

        let mut bytes = entry.into_inner();
        let next_entry = if index + 1 == loads.len() { 0u16 } else { (bytes.len() / 2) as u16 };
        bytes[..2].copy_from_slice(&next_entry.to_be_bytes());
        table.write_all(&bytes)?;
    }

    Ok(table.into_inner())
}

fn decode_loads_info(raw: &[u8], offset: usize) -> Result<Vec<LoadInfo>> {
    let mut cursor = Cursor::new(raw);
    cursor.seek(SeekFrom::Start(offset as u64))?;

    let count: u16 = cursor.read_be()?;
    let mut loads = Vec::with_capacity(count.into());

    let mut entry_start = cursor.stream_position()?;
    for index in 0..count {
        cursor.seek(SeekFrom::Start(entry_start))?;

        let next_entry: u16 = cursor.read_be()?;
        check_next_entry_pointer(next_entry, index, count)?;

        let header_filename = read_str(&mut cursor, Endian::Big)?;
        let part_number = read_str(&mut cursor, Endian::Big)?;
        let member_sequence_number: u16 = cursor.read_be()?;
        let target_hardware_ids = read_str_list(&mut cursor, Endian::Big)?;

        loads.push(LoadInfo {
            part_number,
            header_filename,
            member_sequence_number,
            target_hardware_ids,
        });

        entry_start += u64::from(next_entry) * 2;
    }

    Ok(loads)
}
