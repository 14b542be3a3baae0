//! IO abstraction of the compiler and decompiler.
//!
//! The core never touches storage directly; it drives these callback
//! traits. Paths are medium-relative model paths with `\` separators
//! (e.g. `\SW\DATA.BIN`); backends translate them to their own notion of
//! location. Calls are synchronous and treated as atomic; a backend may
//! abort an operation by returning an error, which the core propagates
//! without leaving partial model state behind.

use crate::error::Result;
use crate::media::MediumNumber;

/// Target-side callbacks used by the compiler.
pub trait CompilerBackend {
    /// Prepares the root of a medium.
    fn create_medium(&mut self, medium: MediumNumber) -> Result<()>;

    /// Creates a directory at the model-defined path on a medium.
    fn create_directory(&mut self, medium: MediumNumber, path: &str) -> Result<()>;

    /// Whether the source provides a pre-existing copy of the file; used
    /// by [`FileCreationPolicy::NoneExisting`].
    ///
    /// [`FileCreationPolicy::NoneExisting`]: crate::utils::FileCreationPolicy::NoneExisting
    fn check_file_existence(&mut self, medium: MediumNumber, path: &str) -> Result<bool>;

    /// Copies a pre-existing file from the source to the output.
    fn create_file(&mut self, medium: MediumNumber, path: &str) -> Result<()>;

    /// Writes synthesised bytes to the output.
    fn write_file(&mut self, medium: MediumNumber, path: &str, contents: &[u8]) -> Result<()>;

    /// Reads previously written output back, for CRC and Check Value
    /// computation over the canonical bytes.
    fn read_file(&mut self, medium: MediumNumber, path: &str) -> Result<Vec<u8>>;
}

/// Source-side callbacks used by the decompiler.
pub trait DecompilerSource {
    /// Size of a file on a medium, in bytes.
    fn file_size(&mut self, medium: MediumNumber, path: &str) -> Result<u64>;

    /// Contents of a file on a medium.
    fn read_file(&mut self, medium: MediumNumber, path: &str) -> Result<Vec<u8>>;
}

/// Decompilation progress callback: media set part number and
/// `(current medium, total media)`.
pub type ProgressHandler<'a> = Box<dyn FnMut(&str, (u8, u8)) + 'a>;

/// Model path of a list file at a medium root, e.g. `\FILES.LUM`.
pub fn list_file_path(name: &str) -> String {
    format!("\\{name}")
}
