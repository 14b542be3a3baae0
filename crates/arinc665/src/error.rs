//! Media-set error types.

use thiserror::Error;

/// Media set result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Scope of a CRC mismatch detected during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcScope {
    /// The CRC-16 a file is listed with.
    File,
    /// The 32-bit Load CRC of a load.
    Load,
}

/// Scope of a Check Value mismatch detected during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckValueScope {
    /// A file's Check Value as listed in `FILES.LUM` or a load header.
    File,
    /// The Load Check Value of a load.
    Load,
    /// The List of Files' own Check Value.
    ListOfFiles,
}

/// Kind of cross-reference that failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// A load's data file reference.
    DataFile,
    /// A load's support file reference.
    SupportFile,
    /// A batch's load reference.
    Load,
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefKind::DataFile => f.write_str("data file"),
            RefKind::SupportFile => f.write_str("support file"),
            RefKind::Load => f.write_str("load"),
        }
    }
}

/// Decompiler state machine stations; terminal failures carry the station
/// they occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompileState {
    ReadFiles,
    ReadLoads,
    ReadBatches,
    VerifyFiles,
    BuildModel,
    LinkLoads,
    LinkBatches,
    VerifyLoadCrcs,
}

impl std::fmt::Display for DecompileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DecompileState::ReadFiles => "read files list",
            DecompileState::ReadLoads => "read loads list",
            DecompileState::ReadBatches => "read batches list",
            DecompileState::VerifyFiles => "verify files",
            DecompileState::BuildModel => "build model",
            DecompileState::LinkLoads => "link loads",
            DecompileState::LinkBatches => "link batches",
            DecompileState::VerifyLoadCrcs => "verify load CRCs",
        };
        f.write_str(name)
    }
}

/// Errors raised by the media set model, compiler and decompiler.
#[derive(Debug, Error)]
pub enum Error {
    /// A file failed to encode or decode; also carries header CRC
    /// mismatches and unsupported format versions.
    #[error(transparent)]
    File(#[from] arinc665_files::Error),

    /// A file or load failed CRC verification.
    #[error("{filename}: {scope:?} CRC mismatch")]
    CrcMismatch { scope: CrcScope, filename: String },

    /// A file or load failed Check Value verification.
    #[error("{filename}: {scope:?} check value mismatch")]
    CheckValueMismatch { scope: CheckValueScope, filename: String },

    /// A list file is not equivalent across the media of the set.
    #[error("{filename} is inconsistent across media")]
    InconsistentAcrossMedia { filename: String },

    /// Cross-file metadata disagrees (list rows, part numbers, sizes).
    #[error("{filename}: {reason}")]
    Inconsistent { reason: &'static str, filename: String },

    /// A load or batch references a file that does not exist in the set.
    #[error("{kind} reference {name:?} not found")]
    CrossReferenceMissing { kind: RefKind, name: String },

    /// A reference matched several files even after CRC disambiguation.
    #[error("{kind} reference {name:?} is ambiguous")]
    CrossReferenceAmbiguous { kind: RefKind, name: String },

    /// A child with that name already exists in the container.
    #[error("name {name:?} already exists in container")]
    Duplicate { name: String },

    /// The entity is referenced by a load or batch and cannot be removed.
    #[error("{name:?} is in use and cannot be removed")]
    InUse { name: String },

    /// The name is not a valid ARINC 665 entity name.
    #[error("invalid name {name:?}")]
    InvalidName { name: String },

    /// The media set violates a structural precondition.
    #[error("invalid media set: {0}")]
    InvalidMediaSet(&'static str),

    /// Terminal decompiler failure, tagged with the state machine station.
    #[error("decompilation failed in state \"{state}\": {source}")]
    Decompile {
        state: DecompileState,
        #[source]
        source: Box<Error>,
    },

    /// Failure from an IO callback.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Tags an error with a decompiler state, unless it already carries
    /// one.
    pub(crate) fn in_state(self, state: DecompileState) -> Error {
        match self {
            already @ Error::Decompile { .. } => already,
            source => Error::Decompile { state, source: Box::new(source) },
        }
    }
}
