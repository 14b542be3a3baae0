//! Default configuration for media set handling.

use arinc665_files::SupportedArinc665Version;

use crate::utils::FileCreationPolicy;

/// Defaults applied by frontends when creating, compiling or decompiling
/// media sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSetDefaults {
    /// Whether decompilation verifies CRCs and Check Values.
    pub check_file_integrity: bool,
    /// ARINC 665 version for newly compiled media sets.
    pub version: SupportedArinc665Version,
    /// Load header creation policy.
    pub create_load_headers: FileCreationPolicy,
    /// Batch file creation policy.
    pub create_batch_files: FileCreationPolicy,
}

impl MediaSetDefaults {
    pub const DEFAULT_CHECK_FILE_INTEGRITY: bool = true;
    pub const DEFAULT_VERSION: SupportedArinc665Version = SupportedArinc665Version::Supplement345;
    pub const DEFAULT_FILE_CREATION_POLICY: FileCreationPolicy = FileCreationPolicy::NoneExisting;
}

impl Default for MediaSetDefaults {
    fn default() -> Self {
        MediaSetDefaults {
            check_file_integrity: Self::DEFAULT_CHECK_FILE_INTEGRITY,
            version: Self::DEFAULT_VERSION,
            create_load_headers: Self::DEFAULT_FILE_CREATION_POLICY,
            create_batch_files: Self::DEFAULT_FILE_CREATION_POLICY,
        }
    }
}
