//! In-memory media set model.
//!
//! A [`MediaSet`] owns the whole entity tree in one arena; [`NodeId`]
//! handles address directories, regular files, loads and batches. All
//! cross-references (a load's data files, a batch's loads, child/parent
//! links) are ids into the same arena, so the media set is the exclusive
//! owner and dropping it drops the graph.

pub mod media_set;
pub mod part_flags;
pub mod printer;

use std::num::NonZeroU8;

pub use media_set::{
    BatchData, FileKind, LoadData, LoadFileRef, MediaSet, NodeId, TargetHardwareIdPositions,
};
pub use part_flags::PartFlags;

/// A medium number in `1..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediumNumber(NonZeroU8);

/// A medium number override; `None` inherits the container default.
pub type OptionalMediumNumber = Option<MediumNumber>;

impl MediumNumber {
    /// The first medium; every media set has it.
    pub const FIRST: MediumNumber = MediumNumber(NonZeroU8::MIN);

    pub const fn new(number: u8) -> Option<Self> {
        match NonZeroU8::new(number) {
            Some(number) => Some(MediumNumber(number)),
            None => None,
        }
    }

    pub const fn get(self) -> u8 {
        self.0.get()
    }

    /// The following medium number; `None` past 255.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(MediumNumber)
    }
}

impl From<NonZeroU8> for MediumNumber {
    fn from(value: NonZeroU8) -> Self {
        MediumNumber(value)
    }
}

impl std::fmt::Display for MediumNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Iterates `1..=last`.
pub fn medium_numbers(last: MediumNumber) -> impl Iterator<Item = MediumNumber> {
    (1..=last.get()).map(|number| MediumNumber::new(number).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medium_number_bounds() {
        assert!(MediumNumber::new(0).is_none());
        assert_eq!(MediumNumber::new(1), Some(MediumNumber::FIRST));
        assert_eq!(MediumNumber::new(255).unwrap().next(), None);
    }

    #[test]
    fn test_medium_numbers_iteration() {
        let last = MediumNumber::new(3).unwrap();
        let numbers: Vec<u8> = medium_numbers(last).map(MediumNumber::get).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
