//! ARINC 645 integrity primitives.
//!
//! ARINC Report 645 defines the integrity mechanisms shared by the ARINC 665
//! media-set formats: the 16-bit header CRC, the 32-bit Load CRC, and the
//! typed *Check Value* family (CRCs and cryptographic digests). This crate
//! provides:
//!
//! * the CRC engines with the ARINC parameter sets ([`crc16`], [`crc32`],
//!   and the wider variants used as Check Values),
//! * the [`CheckValue`] / [`CheckValueType`] model types, and
//! * the streaming [`CheckValueGenerator`] that computes any of the Check
//!   Value algorithms behind a single interface.
//!
//! The on-disk encoding of a Check Value is part of the ARINC 665 file
//! formats and lives in the `arinc665-files` crate.

#![forbid(unsafe_code)]

pub mod check_value;
pub mod crc;
pub mod generator;

pub use check_value::{CheckValue, CheckValueType, UnknownCheckValueType};
pub use crc::{CRC8, CRC16, CRC32, CRC64, Crc32Digest, crc16, crc32};
pub use generator::CheckValueGenerator;
