//! Length-prefixed string encoding.
//!
//! An ARINC 665 string is a 16-bit character count followed by the
//! characters; a zero pad byte follows when the count is odd so the next
//! field stays 16-bit aligned. A string list is a 16-bit element count
//! followed by that many strings.

use std::io::{Read, Seek, Write};
use std::ops::Deref;

use binrw::{BinRead, BinResult, BinWrite, Endian, prelude::*};

/// A length-prefixed, even-padded string.
///
/// The codecs mostly use plain `String` fields and the free
/// [`read_str`]/[`write_str`] helpers; this wrapper exists for layouts that
/// embed strings in derived binrw structures and for fixture tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Arinc665String(pub String);

impl BinRead for Arinc665String {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        read_str(reader, endian).map(Arinc665String)
    }
}

impl BinWrite for Arinc665String {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        write_str(writer, endian, &self.0)
    }
}

impl Deref for Arinc665String {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for Arinc665String {
    fn from(value: &str) -> Self {
        Arinc665String(value.to_owned())
    }
}

impl From<Arinc665String> for String {
    fn from(value: Arinc665String) -> Self {
        value.0
    }
}

/// Reads a length-prefixed string, consuming the pad byte on odd lengths.
pub fn read_str<R: Read + Seek>(reader: &mut R, endian: Endian) -> BinResult<String> {
    let position = reader.stream_position()?;
    let length = u16::read_options(reader, endian, ())? as usize;

    let mut bytes = vec![0u8; length.next_multiple_of(2)];
    reader.read_exact(&mut bytes)?;
    bytes.truncate(length);

    String::from_utf8(bytes).map_err(|source| binrw::Error::Custom {
        pos: position,
        err: Box::new(format!("string is not valid UTF-8: {source}")),
    })
}

/// Writes a length-prefixed string, padding to even length.
pub fn write_str<W: Write + Seek>(writer: &mut W, endian: Endian, value: &str) -> BinResult<()> {
    let length = u16::try_from(value.len()).map_err(|_| binrw::Error::AssertFail {
        pos: 0,
        message: format!("string too long for 16-bit length prefix: {} bytes", value.len()),
    })?;

    length.write_options(writer, endian, ())?;
    writer.write_all(value.as_bytes())?;
    if value.len() % 2 != 0 {
        writer.write_all(&[0u8])?;
    }
    Ok(())
}

/// Reads a 16-bit count followed by that many strings.
pub fn read_str_list<R: Read + Seek>(reader: &mut R, endian: Endian) -> BinResult<Vec<String>> {
    let count = u16::read_options(reader, endian, ())?;
    (0..count).map(|_| read_str(reader, endian)).collect()
}

/// Writes a 16-bit count followed by the strings.
pub fn write_str_list<W: Write + Seek>(
    writer: &mut W,
    endian: Endian,
    values: &[String],
) -> BinResult<()> {
    let count = u16::try_from(values.len()).map_err(|_| binrw::Error::AssertFail {
        pos: 0,
        message: format!("string list too long for 16-bit count: {} elements", values.len()),
    })?;

    count.write_options(writer, endian, ())?;
    for value in values {
        write_str(writer, endian, value)?;
    }
    Ok(())
}

/// Encoded size of a string in bytes: length word plus even-padded content.
pub const fn encoded_str_len(value: &str) -> usize {
    2 + value.len().next_multiple_of(2)
}

/// Encoded size of a string list in bytes.
pub fn encoded_str_list_len(values: &[String]) -> usize {
    2 + values.iter().map(|value| encoded_str_len(value)).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arinc665_tests::*;

    test_binrw! {
        Arinc665String => even_string: Arinc665String::from("ABCD") => "0004 41424344"
    }

    test_binrw! {
        Arinc665String => odd_string: Arinc665String::from("ABC") => "0003 414243 00"
    }

    test_binrw! {
        Arinc665String => empty_string: Arinc665String::from("") => "0000"
    }

    #[test]
    fn test_str_list_roundtrip() {
        let values = vec!["THW-A".to_owned(), "THW-BB".to_owned(), String::new()];
        let mut cursor = std::io::Cursor::new(Vec::new());
        write_str_list(&mut cursor, Endian::Big, &values).unwrap();
        assert_eq!(cursor.get_ref().len(), encoded_str_list_len(&values));

        cursor.set_position(0);
        assert_eq!(read_str_list(&mut cursor, Endian::Big).unwrap(), values);
    }

    #[test]
    fn test_encoded_len_counts_padding() {
        assert_eq!(encoded_str_len(""), 2);
        assert_eq!(encoded_str_len("A"), 4);
        assert_eq!(encoded_str_len("AB"), 4);
        assert_eq!(encoded_str_len("ABC"), 6);
    }

    #[test]
    fn test_truncated_string_is_an_error() {
        let data = decode_hex("0004 4142".replace(' ', "").as_str());
        let mut cursor = std::io::Cursor::new(&data);
        assert!(read_str(&mut cursor, Endian::Big).is_err());
    }
}
