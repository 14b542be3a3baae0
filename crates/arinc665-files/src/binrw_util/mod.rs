//! Shared byte-layout helpers for the ARINC 665 codecs.

pub mod sized_string;
pub mod word_offset;

pub use sized_string::{Arinc665String, encoded_str_len, encoded_str_list_len};
pub use word_offset::WordOffset;

pub mod prelude {
    pub use super::sized_string::{read_str, read_str_list, write_str, write_str_list};
    pub use super::word_offset::WordOffset;
}
