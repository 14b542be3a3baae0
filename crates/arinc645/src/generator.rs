//! Streaming Check Value computation.
//!
//! [`CheckValueGenerator`] hides the algorithm zoo behind one streaming
//! interface: feed bytes with [`update`][CheckValueGenerator::update],
//! obtain the typed result with [`finish`][CheckValueGenerator::finish].
//! New algorithms only touch this module; the file codecs stay untouched.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::check_value::{CheckValue, CheckValueType};
use crate::crc;

/// Algorithm backend interface. One implementation per Check Value family.
trait CheckValueAlgo {
    fn update(&mut self, data: &[u8]);
    fn finish(self: Box<Self>) -> Vec<u8>;
}

/// Streaming generator for a single Check Value.
///
/// Generating with [`CheckValueType::NotUsed`] is valid: the generator
/// swallows all input and finishes with [`CheckValue::NOT_USED`]. This keeps
/// the compile and verify paths free of special cases.
pub struct CheckValueGenerator {
    check_value_type: CheckValueType,
    algo: Option<Box<dyn CheckValueAlgo>>,
}

impl CheckValueGenerator {
    /// Creates a generator for the given algorithm.
    pub fn new(check_value_type: CheckValueType) -> Self {
        let algo: Option<Box<dyn CheckValueAlgo>> = match check_value_type {
            CheckValueType::NotUsed => None,
            CheckValueType::Crc8 => Some(Box::new(Crc8Algo(crc::CRC8.digest()))),
            CheckValueType::Crc16 => Some(Box::new(Crc16Algo(crc::CRC16.digest()))),
            CheckValueType::Crc32 => Some(Box::new(Crc32Algo(crc::CRC32.digest()))),
            CheckValueType::Crc64 => Some(Box::new(Crc64Algo(crc::CRC64.digest()))),
            CheckValueType::Md5 => Some(Box::new(DigestAlgo(Md5::new()))),
            CheckValueType::Sha1 => Some(Box::new(DigestAlgo(Sha1::new()))),
            CheckValueType::Sha256 => Some(Box::new(DigestAlgo(Sha256::new()))),
            CheckValueType::Sha512 => Some(Box::new(DigestAlgo(Sha512::new()))),
        };
        Self { check_value_type, algo }
    }

    /// The algorithm this generator computes.
    pub fn check_value_type(&self) -> CheckValueType {
        self.check_value_type
    }

    /// Feeds bytes into the running computation.
    pub fn update(&mut self, data: &[u8]) {
        if let Some(algo) = &mut self.algo {
            algo.update(data);
        }
    }

    /// Completes the computation and returns the typed Check Value.
    pub fn finish(self) -> CheckValue {
        match self.algo {
            None => CheckValue::NOT_USED,
            Some(algo) => CheckValue::new(self.check_value_type, algo.finish()),
        }
    }

    /// One-shot convenience over a single buffer.
    pub fn check_value(check_value_type: CheckValueType, data: &[u8]) -> CheckValue {
        let mut generator = Self::new(check_value_type);
        generator.update(data);
        generator.finish()
    }
}

impl std::fmt::Debug for CheckValueGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckValueGenerator")
            .field("check_value_type", &self.check_value_type)
            .finish_non_exhaustive()
    }
}

struct Crc8Algo(::crc::Digest<'static, u8>);

impl CheckValueAlgo for Crc8Algo {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_be_bytes().to_vec()
    }
}

struct Crc16Algo(::crc::Digest<'static, u16>);

impl CheckValueAlgo for Crc16Algo {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_be_bytes().to_vec()
    }
}

struct Crc32Algo(::crc::Digest<'static, u32>);

impl CheckValueAlgo for Crc32Algo {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_be_bytes().to_vec()
    }
}

struct Crc64Algo(::crc::Digest<'static, u64>);

impl CheckValueAlgo for Crc64Algo {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_be_bytes().to_vec()
    }
}

struct DigestAlgo<D: Digest>(D);

impl<D: Digest> CheckValueAlgo for DigestAlgo<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}
