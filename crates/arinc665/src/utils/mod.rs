//! Media set processing: compiler, decompiler, IO abstraction and
//! filesystem front-ends.

pub mod compiler;
pub mod decompiler;
pub mod defaults;
pub mod filesystem;
pub mod io;

pub use compiler::MediaSetCompiler;
pub use decompiler::{DecompileResult, MediaSetDecompiler};
pub use defaults::MediaSetDefaults;
pub use filesystem::{FilesystemCompilerBackend, FilesystemSource};
pub use io::{CompilerBackend, DecompilerSource, ProgressHandler, list_file_path};

/// Controls whether the compiler synthesises load header and batch files
/// or copies pre-existing ones from the source.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FileCreationPolicy {
    /// Never synthesise; every file is copied from the source.
    None,
    /// Synthesise only files the source does not provide.
    #[default]
    NoneExisting,
    /// Synthesise every file.
    All,
}
