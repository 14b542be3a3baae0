//! ARINC 665 file format codecs.
//!
//! This crate encodes and decodes the five binary file types an ARINC 665
//! media set is built from:
//!
//! | Type | Well-known name | Codec |
//! | --- | --- | --- |
//! | List of Files | `FILES.LUM` | [`FileListFile`] |
//! | List of Loads | `LOADS.LUM` | [`LoadListFile`] |
//! | List of Batches | `BATCHES.LUM` | [`BatchListFile`] |
//! | Load Header | `*.LUH` | [`LoadHeaderFile`] |
//! | Batch | `*.LUB` | [`BatchFile`] |
//!
//! All types share the same envelope: a 32-bit file length in 16-bit words,
//! a 16-bit file format version, a type-specific body addressed through
//! pointers counted in 16-bit words, and a trailing 16-bit file CRC (Load
//! Headers additionally carry a 32-bit Load CRC after it). Codecs decode
//! from and encode to raw byte buffers; integrity fields that depend on
//! external file contents (Load CRC, Load Check Value) are patched into the
//! raw buffer through the associated functions on [`LoadHeaderFile`] and
//! [`FileListFile`].

#![forbid(unsafe_code)]

pub mod batch;
pub mod batch_list;
pub mod binrw_util;
pub mod check_value;
pub mod envelope;
pub mod error;
pub mod file_list;
pub mod load_header;
pub mod load_list;
pub mod version;

pub use batch::{BatchFile, BatchLoadInfo, BatchTargetInfo};
pub use batch_list::{BatchInfo, BatchListFile};
pub use error::{CrcField, Error, Result};
pub use file_list::{FileInfo, FileListFile};
pub use load_header::{LoadFileInfo, LoadHeaderFile, PART_FLAG_DOWNLOAD};
pub use load_list::{LoadInfo, LoadListFile};
pub use version::SupportedArinc665Version;

/// Well-known name of the List of Files on every medium root.
pub const LIST_OF_FILES_NAME: &str = "FILES.LUM";
/// Well-known name of the List of Loads on every medium root.
pub const LIST_OF_LOADS_NAME: &str = "LOADS.LUM";
/// Well-known name of the optional List of Batches on every medium root.
pub const LIST_OF_BATCHES_NAME: &str = "BATCHES.LUM";

/// ARINC 665 file classes, as derived from well-known filenames.
///
/// Classification by name is only used where the standard prescribes it
/// (list file handling and media-set comparison); files inside the model are
/// classified by the table they appear in, never by their extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    FileList,
    LoadList,
    BatchList,
    LoadHeader,
    Batch,
}

impl FileClass {
    /// Classifies a filename, returning `None` for regular files.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.eq_ignore_ascii_case(LIST_OF_FILES_NAME) {
            return Some(FileClass::FileList);
        }
        if filename.eq_ignore_ascii_case(LIST_OF_LOADS_NAME) {
            return Some(FileClass::LoadList);
        }
        if filename.eq_ignore_ascii_case(LIST_OF_BATCHES_NAME) {
            return Some(FileClass::BatchList);
        }
        let extension = filename.rsplit_once('.').map(|(_, ext)| ext)?;
        if extension.eq_ignore_ascii_case("LUH") {
            Some(FileClass::LoadHeader)
        } else if extension.eq_ignore_ascii_case("LUB") {
            Some(FileClass::Batch)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_class_from_filename() {
        assert_eq!(FileClass::from_filename("FILES.LUM"), Some(FileClass::FileList));
        assert_eq!(FileClass::from_filename("LOADS.LUM"), Some(FileClass::LoadList));
        assert_eq!(FileClass::from_filename("BATCHES.LUM"), Some(FileClass::BatchList));
        assert_eq!(FileClass::from_filename("APP.LUH"), Some(FileClass::LoadHeader));
        assert_eq!(FileClass::from_filename("NIGHTLY.lub"), Some(FileClass::Batch));
        assert_eq!(FileClass::from_filename("README.TXT"), None);
        assert_eq!(FileClass::from_filename("NOEXTENSION"), None);
    }
}
