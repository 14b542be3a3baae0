//! Filesystem-backed IO implementations.
//!
//! [`FilesystemCompilerBackend`] writes each medium into a numbered
//! directory below an output base; [`FilesystemSource`] reads media from
//! explicitly registered directories. Both translate model paths
//! (`\SW\DATA.BIN`) to native relative paths.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::media::MediumNumber;
use crate::utils::io::{CompilerBackend, DecompilerSource};

/// Translates a model path to a native relative path.
fn native_relative_path(path: &str) -> PathBuf {
    path.split('\\').filter(|component| !component.is_empty()).collect()
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no source registered for {path}"))
}

/// Compiler backend rooted at an output directory.
///
/// Media land in `MEDIUM_001`, `MEDIUM_002`, … subdirectories. Source
/// files for [`create_file`][CompilerBackend::create_file] are registered
/// by model path beforehand.
#[derive(Debug)]
pub struct FilesystemCompilerBackend {
    output_base: PathBuf,
    sources: HashMap<String, PathBuf>,
}

impl FilesystemCompilerBackend {
    pub fn new(output_base: impl Into<PathBuf>) -> Self {
        Self { output_base: output_base.into(), sources: HashMap::new() }
    }

    /// Registers the source file backing a model path, used for regular
    /// files and for pre-existing load headers and batch files.
    pub fn register_source(&mut self, model_path: impl Into<String>, source: impl Into<PathBuf>) {
        self.sources.insert(model_path.into(), source.into());
    }

    /// Output directory of a medium.
    pub fn medium_directory(&self, medium: MediumNumber) -> PathBuf {
        self.output_base.join(format!("MEDIUM_{:03}", medium.get()))
    }

    fn target_path(&self, medium: MediumNumber, path: &str) -> PathBuf {
        self.medium_directory(medium).join(native_relative_path(path))
    }
}

impl CompilerBackend for FilesystemCompilerBackend {
    fn create_medium(&mut self, medium: MediumNumber) -> Result<()> {
        fs::create_dir_all(self.medium_directory(medium))?;
        Ok(())
    }

    fn create_directory(&mut self, medium: MediumNumber, path: &str) -> Result<()> {
        fs::create_dir_all(self.target_path(medium, path))?;
        Ok(())
    }

    fn check_file_existence(&mut self, _medium: MediumNumber, path: &str) -> Result<bool> {
        Ok(self.sources.contains_key(path))
    }

    fn create_file(&mut self, medium: MediumNumber, path: &str) -> Result<()> {
        let source = self.sources.get(path).ok_or_else(|| not_found(path))?;
        fs::copy(source, self.target_path(medium, path))?;
        Ok(())
    }

    fn write_file(&mut self, medium: MediumNumber, path: &str, contents: &[u8]) -> Result<()> {
        fs::write(self.target_path(medium, path), contents)?;
        Ok(())
    }

    fn read_file(&mut self, medium: MediumNumber, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.target_path(medium, path))?)
    }
}

/// Decompiler source over one directory per medium.
#[derive(Debug, Default)]
pub struct FilesystemSource {
    media_paths: HashMap<MediumNumber, PathBuf>,
}

impl FilesystemSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the directory holding a medium.
    pub fn medium_path(mut self, medium: MediumNumber, path: impl Into<PathBuf>) -> Self {
        self.media_paths.insert(medium, path.into());
        self
    }

    fn source_path(&self, medium: MediumNumber, path: &str) -> io::Result<PathBuf> {
        let base: &Path = self
            .media_paths
            .get(&medium)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no path for medium {medium}"))
            })?
            .as_ref();
        Ok(base.join(native_relative_path(path)))
    }
}

impl DecompilerSource for FilesystemSource {
    fn file_size(&mut self, medium: MediumNumber, path: &str) -> Result<u64> {
        Ok(fs::metadata(self.source_path(medium, path)?)?.len())
    }

    fn read_file(&mut self, medium: MediumNumber, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.source_path(medium, path)?)?)
    }
}
