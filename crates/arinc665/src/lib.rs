//! ARINC 665 media set model, compiler and decompiler.
//!
//! ARINC 665 defines how airborne software is distributed: a *media set*
//! spreads regular files, *loads* (installable software parts) and
//! *batches* (grouped load manifests) over up to 255 numbered media, tied
//! together by per-medium list files and layered CRCs and Check Values.
//!
//! This crate provides:
//!
//! * [`MediaSet`] — the owning in-memory model of a media set,
//! * [`MediaSetCompiler`] — walks a model and produces the byte-accurate
//!   on-disk media set through a [`CompilerBackend`],
//! * [`MediaSetDecompiler`] — reads an on-disk media set back into a
//!   model through a [`DecompilerSource`], verifying every integrity
//!   artefact,
//! * filesystem implementations of both IO traits.
//!
//! The binary file codecs live in [`arinc665_files`], the integrity
//! primitives in [`arinc645`]; both are re-exported here for convenience.

#![forbid(unsafe_code)]

pub mod error;
pub mod media;
pub mod utils;

pub use error::{CheckValueScope, CrcScope, DecompileState, Error, RefKind, Result};
pub use media::{
    BatchData, FileKind, LoadData, LoadFileRef, MediaSet, MediumNumber, NodeId,
    OptionalMediumNumber, PartFlags, TargetHardwareIdPositions, medium_numbers,
};
pub use utils::{
    CompilerBackend, DecompileResult, DecompilerSource, FileCreationPolicy,
    FilesystemCompilerBackend, FilesystemSource, MediaSetCompiler, MediaSetDecompiler,
    MediaSetDefaults, ProgressHandler,
};

pub use arinc645;
pub use arinc665_files as files;
