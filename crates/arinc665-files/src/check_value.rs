//! Check Value wire form.
//!
//! A Check Value is stored as a 16-bit length (in 16-bit words, counting the
//! length word, the type word and the value), a 16-bit type id, and the
//! value bytes padded to even length. A zero length word encodes "Not Used"
//! and terminates the structure after two bytes.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use binrw::{BinResult, Endian, prelude::*};

use arinc645::{CheckValue, CheckValueType};

use crate::error::{Error, Result};

/// Reads a Check Value structure from the current stream position.
pub fn read_check_value<R: Read + Seek>(reader: &mut R, endian: Endian) -> BinResult<CheckValue> {
    let position = reader.stream_position()?;
    let length_words = u16::read_options(reader, endian, ())?;

    if length_words == 0 {
        return Ok(CheckValue::NOT_USED);
    }

    let type_id = u16::read_options(reader, endian, ())?;
    let check_value_type =
        CheckValueType::try_from(type_id).map_err(|source| binrw::Error::Custom {
            pos: position,
            err: Box::new(source.to_string()),
        })?;

    if length_words != check_value_type.length_words() {
        return Err(binrw::Error::AssertFail {
            pos: position,
            message: format!(
                "check value length {} does not match algorithm {} ({} words)",
                length_words,
                check_value_type,
                check_value_type.length_words(),
            ),
        });
    }

    let value_length = check_value_type.value_length();
    let mut value = vec![0u8; value_length.next_multiple_of(2)];
    reader.read_exact(&mut value)?;
    value.truncate(value_length);

    Ok(CheckValue::new(check_value_type, value))
}

/// Writes a Check Value structure at the current stream position.
pub fn write_check_value<W: Write + Seek>(
    writer: &mut W,
    endian: Endian,
    check_value: &CheckValue,
) -> BinResult<()> {
    let check_value_type = check_value.check_value_type();
    check_value_type.length_words().write_options(writer, endian, ())?;

    if check_value_type == CheckValueType::NotUsed {
        return Ok(());
    }

    u16::from(check_value_type).write_options(writer, endian, ())?;
    writer.write_all(check_value.value())?;
    if check_value.value().len() % 2 != 0 {
        writer.write_all(&[0u8])?;
    }
    Ok(())
}

/// Decodes a Check Value embedded at a byte offset of a raw file.
pub fn decode_check_value_at(raw: &[u8], offset: usize) -> Result<CheckValue> {
    if offset >= raw.len() {
        return Err(Error::InvalidFile("check value pointer beyond end of file"));
    }
    let mut cursor = Cursor::new(raw);
    cursor.seek(SeekFrom::Start(offset as u64))?;
    Ok(read_check_value(&mut cursor, Endian::Big)?)
}

/// Encodes a Check Value into a standalone buffer.
pub fn encode_check_value(check_value: &CheckValue) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    write_check_value(&mut cursor, Endian::Big, check_value)
        .expect("writing to a memory buffer cannot fail");
    cursor.into_inner()
}
