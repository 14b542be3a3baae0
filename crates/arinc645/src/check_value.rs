//! Check Value model types.
//!
//! A Check Value is a typed strong checksum over an artefact (a file, a
//! load, or a list file). ARINC 645 assigns each algorithm a 16-bit wire id
//! and prescribes that the *value* part is padded to 16-bit alignment.

use thiserror::Error;

/// Raised when a wire id does not name a known Check Value algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown check value type id {0:#06x}")]
pub struct UnknownCheckValueType(pub u16);

/// Check Value algorithm selector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum CheckValueType {
    /// No Check Value is used for the artefact.
    #[default]
    NotUsed = 0,
    Crc8 = 1,
    Crc16 = 2,
    Crc32 = 3,
    Crc64 = 4,
    Md5 = 5,
    Sha1 = 6,
    Sha256 = 7,
    Sha512 = 8,
}

impl CheckValueType {
    /// Size of the raw (unpadded) value in bytes.
    pub const fn value_length(self) -> usize {
        match self {
            CheckValueType::NotUsed => 0,
            CheckValueType::Crc8 => 1,
            CheckValueType::Crc16 => 2,
            CheckValueType::Crc32 => 4,
            CheckValueType::Crc64 => 8,
            CheckValueType::Md5 => 16,
            CheckValueType::Sha1 => 20,
            CheckValueType::Sha256 => 32,
            CheckValueType::Sha512 => 64,
        }
    }

    /// Size of the encoded structure in bytes: length word, type word and
    /// even-padded value. `NotUsed` encodes as a bare zero length word.
    pub const fn encoded_length(self) -> usize {
        match self {
            CheckValueType::NotUsed => 2,
            _ => 4 + self.value_length().next_multiple_of(2),
        }
    }

    /// The on-wire length field: the encoded structure size in 16-bit
    /// words, zero for `NotUsed`.
    pub const fn length_words(self) -> u16 {
        match self {
            CheckValueType::NotUsed => 0,
            _ => (self.encoded_length() / 2) as u16,
        }
    }
}

impl From<CheckValueType> for u16 {
    fn from(value: CheckValueType) -> Self {
        value as u16
    }
}

impl TryFrom<u16> for CheckValueType {
    type Error = UnknownCheckValueType;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => CheckValueType::NotUsed,
            1 => CheckValueType::Crc8,
            2 => CheckValueType::Crc16,
            3 => CheckValueType::Crc32,
            4 => CheckValueType::Crc64,
            5 => CheckValueType::Md5,
            6 => CheckValueType::Sha1,
            7 => CheckValueType::Sha256,
            8 => CheckValueType::Sha512,
            other => return Err(UnknownCheckValueType(other)),
        })
    }
}

impl std::fmt::Display for CheckValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CheckValueType::NotUsed => "Not Used",
            CheckValueType::Crc8 => "CRC-8",
            CheckValueType::Crc16 => "CRC-16",
            CheckValueType::Crc32 => "CRC-32",
            CheckValueType::Crc64 => "CRC-64",
            CheckValueType::Md5 => "MD5",
            CheckValueType::Sha1 => "SHA-1",
            CheckValueType::Sha256 => "SHA-256",
            CheckValueType::Sha512 => "SHA-512",
        };
        f.write_str(name)
    }
}

/// A computed Check Value: algorithm tag plus the raw value bytes.
///
/// The "no check value" state is modelled as [`CheckValue::NOT_USED`]; it
/// compares equal only to itself.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct CheckValue {
    check_value_type: CheckValueType,
    value: Vec<u8>,
}

impl CheckValue {
    /// The absent Check Value.
    pub const NOT_USED: CheckValue = CheckValue {
        check_value_type: CheckValueType::NotUsed,
        value: Vec::new(),
    };

    /// Builds a Check Value from an algorithm tag and raw value bytes.
    ///
    /// The value length must match the algorithm; mismatches are a caller
    /// bug, not wire data, hence the panic.
    pub fn new(check_value_type: CheckValueType, value: Vec<u8>) -> Self {
        assert_eq!(
            value.len(),
            check_value_type.value_length(),
            "check value size does not match algorithm {check_value_type}",
        );
        Self { check_value_type, value }
    }

    /// A Check Value of the given algorithm with an all-zero value.
    ///
    /// Used to reserve correctly-sized space in encoded files before the
    /// real value is spliced in.
    pub fn zeroed(check_value_type: CheckValueType) -> Self {
        Self {
            check_value_type,
            value: vec![0u8; check_value_type.value_length()],
        }
    }

    /// A CRC-16 Check Value from the checksum word.
    pub fn from_crc16(crc: u16) -> Self {
        Self::new(CheckValueType::Crc16, crc.to_be_bytes().to_vec())
    }

    /// A CRC-32 Check Value from the checksum word.
    pub fn from_crc32(crc: u32) -> Self {
        Self::new(CheckValueType::Crc32, crc.to_be_bytes().to_vec())
    }

    pub fn check_value_type(&self) -> CheckValueType {
        self.check_value_type
    }

    /// Raw value bytes, big-endian for the CRC algorithms.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn is_used(&self) -> bool {
        self.check_value_type != CheckValueType::NotUsed
    }

    /// The CRC-16 checksum word, when this is a CRC-16 Check Value.
    pub fn crc16(&self) -> Option<u16> {
        match self.check_value_type {
            CheckValueType::Crc16 => Some(u16::from_be_bytes(self.value[..2].try_into().ok()?)),
            _ => None,
        }
    }

    /// The CRC-32 checksum word, when this is a CRC-32 Check Value.
    pub fn crc32(&self) -> Option<u32> {
        match self.check_value_type {
            CheckValueType::Crc32 => Some(u32::from_be_bytes(self.value[..4].try_into().ok()?)),
            _ => None,
        }
    }
}

impl std::fmt::Display for CheckValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_used() {
            return f.write_str("Not Used");
        }
        write!(f, "{} ", self.check_value_type)?;
        for byte in &self.value {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}
