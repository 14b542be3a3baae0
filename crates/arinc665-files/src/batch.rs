//! Batch file (`*.LUB`).
//!
//! A batch groups loads for one or more target hardware positions so an
//! operator can start them as a unit. The file stores the batch part
//! number, a free-form comment and, per target hardware id/position, the
//! chained list of member loads.

use std::io::{Cursor, Seek, SeekFrom, Write};

use binrw::{BinReaderExt, BinWriterExt, Endian};

use crate::binrw_util::prelude::*;
use crate::envelope::{self, DEFAULT_CRC_OFFSET};
use crate::error::{Error, Result};
use crate::file_list::check_next_entry_pointer;
use crate::version::SupportedArinc665Version;

const SPARE_OFFSET: usize = 6;
const PN_PTR_OFFSET: usize = 8;
const COMMENT_PTR_OFFSET: usize = 12;
const TARGETS_PTR_OFFSET: usize = 16;

const HEADER_SIZE: usize = 20;

/// One load reference within a batch target entry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchLoadInfo {
    pub header_filename: String,
    pub part_number: String,
}

/// Loads to start on one target hardware id/position.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchTargetInfo {
    /// Target hardware id qualified with a position, e.g. `THW-A_POS1`.
    pub target_hardware_id_position: String,
    pub loads: Vec<BatchLoadInfo>,
}

/// Decoded `*.LUB` contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFile {
    pub version: SupportedArinc665Version,
    pub part_number: String,
    pub comment: String,
    pub targets_hardware: Vec<BatchTargetInfo>,
}

impl BatchFile {
    pub fn new(version: SupportedArinc665Version) -> Self {
        Self {
            version,
            part_number: String::new(),
            comment: String::new(),
            targets_hardware: Vec::new(),
        }
    }

    /// Decodes and validates a raw `*.LUB`.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let version = envelope::check_envelope(raw, DEFAULT_CRC_OFFSET)?;

        if envelope::read_u16_at(raw, SPARE_OFFSET)? != 0 {
            return Err(Error::InvalidFile("spare is not 0"));
        }

        let pn_ptr = WordOffset(envelope::read_u32_at(raw, PN_PTR_OFFSET)?);
        let comment_ptr = WordOffset(envelope::read_u32_at(raw, COMMENT_PTR_OFFSET)?);
        let targets_ptr = WordOffset(envelope::read_u32_at(raw, TARGETS_PTR_OFFSET)?);

        let mut cursor = Cursor::new(raw);

        cursor.seek(SeekFrom::Start(pn_ptr.checked_byte_offset(raw.len())? as u64))?;
        let part_number = read_str(&mut cursor, Endian::Big)?;

        let comment = if comment_ptr.is_null() {
            String::new()
        } else {
            cursor.seek(SeekFrom::Start(comment_ptr.checked_byte_offset(raw.len())? as u64))?;
            read_str(&mut cursor, Endian::Big)?
        };

        cursor.seek(SeekFrom::Start(targets_ptr.checked_byte_offset(raw.len())? as u64))?;
        let target_count: u16 = cursor.read_be()?;
        let mut targets_hardware = Vec::with_capacity(target_count.into());
        for _ in 0..target_count {
            let target_hardware_id_position = read_str(&mut cursor, Endian::Big)?;

            let load_count: u16 = cursor.read_be()?;
            let mut loads = Vec::with_capacity(load_count.into());
            let mut entry_start = cursor.stream_position()?;
            for index in 0..load_count {
                cursor.seek(SeekFrom::Start(entry_start))?;

                let next_entry: u16 = cursor.read_be()?;
                check_next_entry_pointer(next_entry, index, load_count)?;

                let header_filename = read_str(&mut cursor, Endian::Big)?;
                let part_number = read_str(&mut cursor, Endian::Big)?;
                loads.push(BatchLoadInfo { header_filename, part_number });

                // The last entry has no chain pointer; the next target
                // continues directly after its fields.
                entry_start = if next_entry == 0 {
                    cursor.stream_position()?
                } else {
                    entry_start + u64::from(next_entry) * 2
                };
            }
            cursor.seek(SeekFrom::Start(entry_start))?;

            targets_hardware.push(BatchTargetInfo { target_hardware_id_position, loads });
        }

        Ok(Self {
            version,
            part_number,
            comment,
            targets_hardware,
        })
    }

    /// Encodes the file, computing the envelope fields and the file CRC.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut raw = vec![0u8; HEADER_SIZE];

        let pn_ptr = WordOffset::from_byte_offset(raw.len());
        let mut block = Cursor::new(Vec::new());
        write_str(&mut block, Endian::Big, &self.part_number)?;
        raw.extend_from_slice(block.get_ref());

        let comment_ptr = WordOffset::from_byte_offset(raw.len());
        let mut block = Cursor::new(Vec::new());
        write_str(&mut block, Endian::Big, &self.comment)?;
        raw.extend_from_slice(block.get_ref());

        let targets_ptr = WordOffset::from_byte_offset(raw.len());
        raw.extend_from_slice(&self.encode_targets()?);

        raw[PN_PTR_OFFSET..PN_PTR_OFFSET + 4].copy_from_slice(&pn_ptr.0.to_be_bytes());
        raw[COMMENT_PTR_OFFSET..COMMENT_PTR_OFFSET + 4]
            .copy_from_slice(&comment_ptr.0.to_be_bytes());
        raw[TARGETS_PTR_OFFSET..TARGETS_PTR_OFFSET + 4]
            .copy_from_slice(&targets_ptr.0.to_be_bytes());

        raw.extend_from_slice(&[0u8; 2]);
        envelope::finish_file(&mut raw, self.version, DEFAULT_CRC_OFFSET);

        Ok(raw)
    }

    fn encode_targets(&self) -> Result<Vec<u8>> {
        let mut table = Cursor::new(Vec::new());
        let target_count = u16::try_from(self.targets_hardware.len())
            .map_err(|_| Error::InvalidFile("more targets than the table can hold"))?;
        table.write_be(&target_count)?;

        for target in &self.targets_hardware {
            write_str(&mut table, Endian::Big, &target.target_hardware_id_position)?;

            let load_count = u16::try_from(target.loads.len())
                .map_err(|_| Error::InvalidFile("more loads than the table can hold"))?;
            table.write_be(&load_count)?;

            for (index, load) in target.loads.iter().enumerate() {
                let mut entry = Cursor::new(vec![0u8; 2]);
                entry.seek(SeekFrom::End(0))?;
                write_str(&mut entry, Endian::Big, &load.header_filename)?;
                write_str(&mut entry, Endian::Big, &load.part_number)?;

                let mut bytes = entry.into_inner();
                let next_entry =
                    if index + 1 == target.loads.len() { 0u16 } else { (bytes.len() / 2) as u16 };
                bytes[..2].copy_from_slice(&next_entry.to_be_bytes());
                table.write_all(&bytes)?;
            }
        }

        Ok(table.into_inner())
    }
}
