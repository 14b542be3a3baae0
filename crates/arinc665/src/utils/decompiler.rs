//! Media set decompilation.
//!
//! The decompiler reads an on-disk media set back into a [`MediaSet`],
//! verifying every integrity artefact on the way. It runs the linear
//! state machine
//!
//! ```text
//! per medium:  READ_FILES → READ_LOADS → (READ_BATCHES) → VERIFY_FILES
//! then:        BUILD_MODEL → LINK_LOADS → LINK_BATCHES → VERIFY_LOAD_CRCS
//! ```
//!
//! and every terminal failure carries the state it occurred in.

use std::collections::{HashMap, HashSet};

use log::{info, trace};

use arinc645::{CheckValue, CheckValueGenerator, Crc32Digest, crc16};
use arinc665_files::{
    BatchInfo, BatchListFile, FileClass, FileInfo, FileListFile, LIST_OF_BATCHES_NAME,
    LIST_OF_FILES_NAME, LIST_OF_LOADS_NAME, LoadHeaderFile, LoadInfo, LoadListFile,
    SupportedArinc665Version,
};

use crate::error::{CheckValueScope, CrcScope, DecompileState, Error, RefKind, Result};
use crate::media::{MediaSet, MediumNumber, NodeId, PartFlags};
use crate::utils::io::{DecompilerSource, ProgressHandler, list_file_path};

/// Outcome of a decompilation: the rebuilt model plus every Check Value
/// observed per file (the listed CRC-16 and, where declared, the typed
/// Check Values from `FILES.LUM` and load headers).
#[derive(Debug)]
pub struct DecompileResult {
    pub media_set: MediaSet,
    pub check_values: HashMap<NodeId, HashSet<CheckValue>>,
}

/// Builder-style media set decompiler.
pub struct MediaSetDecompiler<'a, S: DecompilerSource> {
    source: &'a mut S,
    progress: Option<ProgressHandler<'a>>,
    check_file_integrity: bool,
}

impl<'a, S: DecompilerSource> MediaSetDecompiler<'a, S> {
    pub fn new(source: &'a mut S) -> Self {
        Self { source, progress: None, check_file_integrity: true }
    }

    /// Progress callback, invoked once per medium.
    pub fn progress_handler(mut self, progress: ProgressHandler<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Whether CRCs and Check Values are verified (default: yes).
    pub fn check_file_integrity(mut self, check_file_integrity: bool) -> Self {
        self.check_file_integrity = check_file_integrity;
        self
    }

    /// Runs the decompilation.
    pub fn decompile(self) -> Result<DecompileResult> {
        let mut run = Decompilation {
            source: self.source,
            progress: self.progress,
            check_file_integrity: self.check_file_integrity,
            file_list: None,
            load_list: None,
            batch_list: None,
            file_rows: Vec::new(),
            loads_rows: HashMap::new(),
            batches_rows: HashMap::new(),
            media_set: MediaSet::new(),
            check_values: HashMap::new(),
            file_rows_by_node: HashMap::new(),
            loads: Vec::new(),
            batches: Vec::new(),
        };

        run.read_first_medium()?;
        run.read_further_media()?;
        run.build_model()?;
        run.link_loads()?;
        run.link_batches()?;
        run.verify_load_crcs()?;

        Ok(DecompileResult { media_set: run.media_set, check_values: run.check_values })
    }
}

/// Model path of a listed file: its path name joined with its filename.
fn row_path(row: &FileInfo) -> String {
    if row.path_name == "\\" {
        format!("\\{}", row.filename)
    } else {
        format!("{}\\{}", row.path_name, row.filename)
    }
}

fn row_medium(row: &FileInfo) -> Result<MediumNumber> {
    u8::try_from(row.member_sequence_number)
        .ok()
        .and_then(MediumNumber::new)
        .ok_or(Error::Inconsistent {
            reason: "member sequence number outside 1..=255",
            filename: row.filename.clone(),
        })
}

struct Decompilation<'a, S: DecompilerSource> {
    source: &'a mut S,
    progress: Option<ProgressHandler<'a>>,
    check_file_integrity: bool,

    file_list: Option<FileListFile>,
    load_list: Option<LoadListFile>,
    batch_list: Option<BatchListFile>,
    /// Non-list rows of `FILES.LUM`, in table order.
    file_rows: Vec<FileInfo>,
    loads_rows: HashMap<String, LoadInfo>,
    batches_rows: HashMap<String, BatchInfo>,

    media_set: MediaSet,
    check_values: HashMap<NodeId, HashSet<CheckValue>>,
    file_rows_by_node: HashMap<NodeId, FileInfo>,
    loads: Vec<(NodeId, FileInfo, LoadInfo)>,
    batches: Vec<(NodeId, FileInfo, BatchInfo)>,
}

impl<S: DecompilerSource> Decompilation<'_, S> {
    fn file_list(&self) -> &FileListFile {
        self.file_list.as_ref().expect("file list read before use")
    }

    fn report_progress(&mut self, medium: u8) {
        if let Some(progress) = &mut self.progress {
            let file_list = self.file_list.as_ref().expect("file list read before use");
            progress(&file_list.media_set_pn, (medium, file_list.number_of_media_set_members));
        }
    }

    // --- per-medium states -----------------------------------------------

    fn read_first_medium(&mut self) -> Result<()> {
        self.read_files_list()
            .map_err(|error| error.in_state(DecompileState::ReadFiles))?;
        self.report_progress(1);

        self.read_loads_list().map_err(|error| error.in_state(DecompileState::ReadLoads))?;
        if self.batch_list_expected() {
            self.read_batches_list()
                .map_err(|error| error.in_state(DecompileState::ReadBatches))?;
        }
        self.verify_medium_files(MediumNumber::FIRST)
            .map_err(|error| error.in_state(DecompileState::VerifyFiles))?;
        Ok(())
    }

    fn batch_list_expected(&self) -> bool {
        self.file_list()
            .files
            .iter()
            .any(|row| FileClass::from_filename(&row.filename) == Some(FileClass::BatchList))
    }

    fn read_files_list(&mut self) -> Result<()> {
        let raw =
            self.source.read_file(MediumNumber::FIRST, &list_file_path(LIST_OF_FILES_NAME))?;
        let file_list = FileListFile::from_bytes(&raw)?;

        info!(
            "decompile media set {:?} with {} media",
            file_list.media_set_pn, file_list.number_of_media_set_members,
        );

        if file_list.media_sequence_number != 1 {
            return Err(Error::Inconsistent {
                reason: "file list of first medium has wrong sequence number",
                filename: LIST_OF_FILES_NAME.to_owned(),
            });
        }

        let mut loads_list_present = false;
        for row in &file_list.files {
            match FileClass::from_filename(&row.filename) {
                Some(FileClass::FileList) => {
                    return Err(Error::Inconsistent {
                        reason: "file list must not list itself",
                        filename: row.filename.clone(),
                    });
                }
                Some(FileClass::LoadList) => {
                    if row.path_name != "\\" {
                        return Err(Error::Inconsistent {
                            reason: "list of loads is not in the root directory",
                            filename: row.filename.clone(),
                        });
                    }
                    loads_list_present = true;
                    self.media_set.set_list_of_loads_check_value_type(
                        row.check_value.is_used().then(|| row.check_value.check_value_type()),
                    );
                }
                Some(FileClass::BatchList) => {
                    if row.path_name != "\\" {
                        return Err(Error::Inconsistent {
                            reason: "list of batches is not in the root directory",
                            filename: row.filename.clone(),
                        });
                    }
                    self.media_set.set_list_of_batches_check_value_type(
                        row.check_value.is_used().then(|| row.check_value.check_value_type()),
                    );
                }
                _ => self.file_rows.push(row.clone()),
            }
        }

        if !loads_list_present {
            return Err(Error::Inconsistent {
                reason: "list of loads missing from file list",
                filename: LIST_OF_LOADS_NAME.to_owned(),
            });
        }

        self.file_list = Some(file_list);
        Ok(())
    }

    fn read_loads_list(&mut self) -> Result<()> {
        let raw =
            self.source.read_file(MediumNumber::FIRST, &list_file_path(LIST_OF_LOADS_NAME))?;
        let load_list = LoadListFile::from_bytes(&raw)?;

        for row in &load_list.loads {
            let file_row = self
                .file_rows
                .iter()
                .find(|file_row| file_row.filename == row.header_filename)
                .ok_or_else(|| Error::Inconsistent {
                    reason: "load list row has no file list entry",
                    filename: row.header_filename.clone(),
                })?;

            if file_row.member_sequence_number != row.member_sequence_number {
                return Err(Error::Inconsistent {
                    reason: "load list and file list disagree",
                    filename: row.header_filename.clone(),
                });
            }

            self.loads_rows.insert(row.header_filename.clone(), row.clone());
        }

        self.load_list = Some(load_list);
        Ok(())
    }

    fn read_batches_list(&mut self) -> Result<()> {
        let raw =
            self.source.read_file(MediumNumber::FIRST, &list_file_path(LIST_OF_BATCHES_NAME))?;
        let batch_list = BatchListFile::from_bytes(&raw)?;

        for row in &batch_list.batches {
            let file_row = self
                .file_rows
                .iter()
                .find(|file_row| file_row.filename == row.filename)
                .ok_or_else(|| Error::Inconsistent {
                    reason: "batch list row has no file list entry",
                    filename: row.filename.clone(),
                })?;

            if file_row.member_sequence_number != row.member_sequence_number {
                return Err(Error::Inconsistent {
                    reason: "batch list and file list disagree",
                    filename: row.filename.clone(),
                });
            }

            self.batches_rows.insert(row.filename.clone(), row.clone());
        }

        self.batch_list = Some(batch_list);
        Ok(())
    }

    fn read_further_media(&mut self) -> Result<()> {
        let members = self.file_list().number_of_media_set_members;

        for medium_number in 2..=members {
            self.report_progress(medium_number);
            let medium = MediumNumber::new(medium_number).expect("medium numbers start at 2 here");

            // FILES.LUM
            let raw = self
                .source
                .read_file(medium, &list_file_path(LIST_OF_FILES_NAME))
                .map_err(|error| error.in_state(DecompileState::ReadFiles))?;
            let file_list = FileListFile::from_bytes(&raw)
                .map_err(|error| Error::from(error).in_state(DecompileState::ReadFiles))?;
            if !file_list.belongs_to_same_media_set(self.file_list())
                || file_list.media_sequence_number != medium_number
            {
                return Err(Error::InconsistentAcrossMedia {
                    filename: LIST_OF_FILES_NAME.to_owned(),
                }
                .in_state(DecompileState::ReadFiles));
            }

            // LOADS.LUM
            let raw = self
                .source
                .read_file(medium, &list_file_path(LIST_OF_LOADS_NAME))
                .map_err(|error| error.in_state(DecompileState::ReadLoads))?;
            let load_list = LoadListFile::from_bytes(&raw)
                .map_err(|error| Error::from(error).in_state(DecompileState::ReadLoads))?;
            if !load_list
                .belongs_to_same_media_set(self.load_list.as_ref().expect("read on first medium"))
                || load_list.media_sequence_number != medium_number
            {
                return Err(Error::InconsistentAcrossMedia {
                    filename: LIST_OF_LOADS_NAME.to_owned(),
                }
                .in_state(DecompileState::ReadLoads));
            }

            // BATCHES.LUM
            if let Some(first_batch_list) = &self.batch_list {
                let raw = self
                    .source
                    .read_file(medium, &list_file_path(LIST_OF_BATCHES_NAME))
                    .map_err(|error| error.in_state(DecompileState::ReadBatches))?;
                let batch_list = BatchListFile::from_bytes(&raw)
                    .map_err(|error| Error::from(error).in_state(DecompileState::ReadBatches))?;
                if !batch_list.belongs_to_same_media_set(first_batch_list)
                    || batch_list.media_sequence_number != medium_number
                {
                    return Err(Error::InconsistentAcrossMedia {
                        filename: LIST_OF_BATCHES_NAME.to_owned(),
                    }
                    .in_state(DecompileState::ReadBatches));
                }
            }

            self.verify_medium_files(medium)
                .map_err(|error| error.in_state(DecompileState::VerifyFiles))?;
        }

        Ok(())
    }

    /// Verifies CRC-16 and declared Check Values of every file the list
    /// places on the medium, plus the medium's own `FILES.LUM` Check
    /// Value.
    fn verify_medium_files(&mut self, medium: MediumNumber) -> Result<()> {
        if !self.check_file_integrity {
            return Ok(());
        }

        for row in &self.file_rows {
            if row.member_sequence_number != u16::from(medium.get()) {
                continue;
            }

            trace!("check file {}", row_path(row));
            let contents = self.source.read_file(medium, &row_path(row))?;

            if crc16(&contents) != row.crc {
                return Err(Error::CrcMismatch {
                    scope: CrcScope::File,
                    filename: row.filename.clone(),
                });
            }

            if row.check_value.is_used() {
                let computed = CheckValueGenerator::check_value(
                    row.check_value.check_value_type(),
                    &contents,
                );
                if computed != row.check_value {
                    return Err(Error::CheckValueMismatch {
                        scope: CheckValueScope::File,
                        filename: row.filename.clone(),
                    });
                }
            }
        }

        // The list's own check value covers the file prefix up to the
        // check value structure.
        if self.file_list().check_value.is_used() {
            let raw = self.source.read_file(medium, &list_file_path(LIST_OF_FILES_NAME))?;
            let medium_list = FileListFile::from_bytes(&raw)?;
            let computed = CheckValueGenerator::check_value(
                medium_list.check_value.check_value_type(),
                FileListFile::check_value_region(&raw)?,
            );
            if computed != medium_list.check_value {
                return Err(Error::CheckValueMismatch {
                    scope: CheckValueScope::ListOfFiles,
                    filename: LIST_OF_FILES_NAME.to_owned(),
                });
            }
        }

        Ok(())
    }

    // --- model construction ----------------------------------------------

    fn build_model(&mut self) -> Result<()> {
        self.build_model_inner().map_err(|error| error.in_state(DecompileState::BuildModel))
    }

    fn build_model_inner(&mut self) -> Result<()> {
        let file_list = self.file_list.take().expect("file list read before use");

        self.media_set.set_part_number(file_list.media_set_pn.clone());
        self.media_set.set_files_user_defined_data(file_list.user_defined_data.clone());
        self.media_set.set_list_of_files_check_value_type(
            file_list.check_value.is_used().then(|| file_list.check_value.check_value_type()),
        );

        let load_list = self.load_list.take().expect("load list read before use");
        self.media_set.set_loads_user_defined_data(load_list.user_defined_data.clone());
        if let Some(batch_list) = self.batch_list.take() {
            self.media_set.set_batches_user_defined_data(batch_list.user_defined_data.clone());
        }

        let file_rows = std::mem::take(&mut self.file_rows);
        for row in &file_rows {
            let medium = row_medium(row)?;
            let parent = self.ensure_directories(&row.path_name)?;

            let node = if let Some(load_row) = self.loads_rows.get(&row.filename) {
                if self.batches_rows.contains_key(&row.filename) {
                    return Err(Error::Inconsistent {
                        reason: "file is listed as both load and batch",
                        filename: row.filename.clone(),
                    });
                }
                let node =
                    self.media_set.add_load(parent, row.filename.clone(), Some(medium))?;
                self.loads.push((node, row.clone(), load_row.clone()));
                node
            } else if let Some(batch_row) = self.batches_rows.get(&row.filename) {
                let node =
                    self.media_set.add_batch(parent, row.filename.clone(), Some(medium))?;
                self.batches.push((node, row.clone(), batch_row.clone()));
                node
            } else {
                self.media_set.add_regular_file(parent, row.filename.clone(), Some(medium))?
            };

            self.media_set.set_check_value_type(
                node,
                row.check_value.is_used().then(|| row.check_value.check_value_type()),
            );

            let observed = self.check_values.entry(node).or_default();
            observed.insert(CheckValue::from_crc16(row.crc));
            if row.check_value.is_used() {
                observed.insert(row.check_value.clone());
            }

            self.file_rows_by_node.insert(node, row.clone());
        }
        self.file_rows = file_rows;

        Ok(())
    }

    /// Walks `\`-separated path components, creating missing directories.
    fn ensure_directories(&mut self, path_name: &str) -> Result<NodeId> {
        let mut container = self.media_set.root();
        for component in path_name.split('\\').filter(|component| !component.is_empty()) {
            container = match self.media_set.subdirectory(container, component) {
                Some(existing) => existing,
                None => self.media_set.add_subdirectory(container, component)?,
            };
        }
        Ok(container)
    }

    // --- load linking ----------------------------------------------------

    fn link_loads(&mut self) -> Result<()> {
        for index in 0..self.loads.len() {
            let (node, file_row, load_row) = self.loads[index].clone();
            self.link_load(node, &file_row, &load_row)
                .map_err(|error| error.in_state(DecompileState::LinkLoads))?;
        }
        Ok(())
    }

    fn link_load(&mut self, node: NodeId, file_row: &FileInfo, load_row: &LoadInfo) -> Result<()> {
        trace!("link load {}", row_path(file_row));

        let raw = self.source.read_file(row_medium(file_row)?, &row_path(file_row))?;
        let header = LoadHeaderFile::from_bytes(&raw)?;

        if header.part_number != load_row.part_number {
            return Err(Error::Inconsistent {
                reason: "load part number differs from list of loads",
                filename: file_row.filename.clone(),
            });
        }

        let mut listed_ids = load_row.target_hardware_ids.clone();
        let mut header_ids = header.target_hardware_ids.clone();
        listed_ids.sort_unstable();
        header_ids.sort_unstable();
        if listed_ids != header_ids {
            return Err(Error::Inconsistent {
                reason: "load target hardware ids differ from list of loads",
                filename: file_row.filename.clone(),
            });
        }

        // Position-restricted ids first, in header order; unrestricted
        // ids follow.
        let mut positions = header.target_hardware_id_positions.clone();
        for id in &header.target_hardware_ids {
            if !positions.iter().any(|(existing, _)| existing == id) {
                positions.push((id.clone(), Vec::new()));
            }
        }

        {
            let data = self.media_set.load_mut(node)?;
            data.part_number = header.part_number.clone();
            data.part_flags = PartFlags::from(header.part_flags);
            data.load_type = header.load_type.clone();
            data.target_hardware_id_positions = positions;
            data.user_defined_data = header.user_defined_data.clone();
            data.load_check_value_type = header
                .load_check_value
                .is_used()
                .then(|| header.load_check_value.check_value_type());
        }

        let supplement2 = header.version == SupportedArinc665Version::Supplement2;
        for entry in &header.data_files {
            let file = self.resolve_load_file(node, entry, RefKind::DataFile)?;
            self.check_load_file(file, entry, supplement2)?;
            self.media_set.add_load_data_file(
                node,
                file,
                entry.part_number.clone(),
                entry.check_value.is_used().then(|| entry.check_value.check_value_type()),
            )?;
        }
        for entry in &header.support_files {
            let file = self.resolve_load_file(node, entry, RefKind::SupportFile)?;
            self.check_load_file(file, entry, false)?;
            self.media_set.add_load_support_file(
                node,
                file,
                entry.part_number.clone(),
                entry.check_value.is_used().then(|| entry.check_value.check_value_type()),
            )?;
        }

        Ok(())
    }

    /// Resolves a data/support file reference: search the load's parent
    /// subtree (falling back to the whole set), then disambiguate by
    /// CRC-16 against the header entry.
    fn resolve_load_file(
        &self,
        load: NodeId,
        entry: &arinc665_files::LoadFileInfo,
        kind: RefKind,
    ) -> Result<NodeId> {
        let parent = self.media_set.parent(load).expect("loads live in a container");

        let mut candidates =
            self.media_set.recursive_regular_files(parent, Some(&entry.filename));
        if candidates.is_empty() {
            candidates =
                self.media_set.recursive_regular_files(self.media_set.root(), Some(&entry.filename));
        }

        match candidates.len() {
            0 => Err(Error::CrossReferenceMissing { kind, name: entry.filename.clone() }),
            1 => Ok(candidates[0]),
            _ => {
                let matching: Vec<NodeId> = candidates
                    .into_iter()
                    .filter(|file| {
                        self.file_rows_by_node
                            .get(file)
                            .is_some_and(|row| row.crc == entry.crc)
                    })
                    .collect();
                match matching.as_slice() {
                    [single] => Ok(*single),
                    _ => Err(Error::CrossReferenceAmbiguous { kind, name: entry.filename.clone() }),
                }
            }
        }
    }

    /// Cross-checks one resolved data/support file against its header
    /// entry: CRC agreement with the file list, size, and Check Value.
    fn check_load_file(
        &mut self,
        file: NodeId,
        entry: &arinc665_files::LoadFileInfo,
        word_sized_length: bool,
    ) -> Result<()> {
        let row = self.file_rows_by_node.get(&file).expect("file built from a row").clone();

        if row.crc != entry.crc {
            return Err(Error::Inconsistent {
                reason: "load file CRC differs from file list",
                filename: entry.filename.clone(),
            });
        }

        // A Check Value of the same algorithm in both tables must agree.
        let mut check_value_checked = !entry.check_value.is_used();
        if entry.check_value.is_used()
            && row.check_value.check_value_type() == entry.check_value.check_value_type()
        {
            if row.check_value != entry.check_value {
                return Err(Error::CheckValueMismatch {
                    scope: CheckValueScope::File,
                    filename: entry.filename.clone(),
                });
            }
            check_value_checked = true;
        }

        if self.check_file_integrity {
            let medium = row_medium(&row)?;
            let size = self.source.file_size(medium, &row_path(&row))?;

            // Supplement 2 data file lengths only survive as rounded word
            // counts.
            let matches = if word_sized_length {
                size.div_ceil(2) == entry.length / 2
            } else {
                size == entry.length
            };
            if !matches {
                return Err(Error::Inconsistent {
                    reason: "load file size differs from load header",
                    filename: entry.filename.clone(),
                });
            }

            if !check_value_checked {
                let contents = self.source.read_file(medium, &row_path(&row))?;
                let computed = CheckValueGenerator::check_value(
                    entry.check_value.check_value_type(),
                    &contents,
                );
                if computed != entry.check_value {
                    return Err(Error::CheckValueMismatch {
                        scope: CheckValueScope::File,
                        filename: entry.filename.clone(),
                    });
                }
            }
        }

        if entry.check_value.is_used() {
            self.check_values.entry(file).or_default().insert(entry.check_value.clone());
        }

        Ok(())
    }

    // --- batch linking ---------------------------------------------------

    fn link_batches(&mut self) -> Result<()> {
        for index in 0..self.batches.len() {
            let (node, file_row, batch_row) = self.batches[index].clone();
            self.link_batch(node, &file_row, &batch_row)
                .map_err(|error| error.in_state(DecompileState::LinkBatches))?;
        }
        Ok(())
    }

    fn link_batch(
        &mut self,
        node: NodeId,
        file_row: &FileInfo,
        batch_row: &BatchInfo,
    ) -> Result<()> {
        trace!("link batch {}", row_path(file_row));

        let raw = self.source.read_file(row_medium(file_row)?, &row_path(file_row))?;
        let batch_file = arinc665_files::BatchFile::from_bytes(&raw)?;

        if batch_file.part_number != batch_row.part_number {
            return Err(Error::Inconsistent {
                reason: "batch part number differs from list of batches",
                filename: file_row.filename.clone(),
            });
        }

        {
            let data = self.media_set.batch_mut(node)?;
            data.part_number = batch_file.part_number.clone();
            data.comment = batch_file.comment.clone();
        }

        for target in &batch_file.targets_hardware {
            let mut loads = Vec::with_capacity(target.loads.len());
            for load_ref in &target.loads {
                let candidates = self
                    .media_set
                    .recursive_loads(self.media_set.root(), Some(&load_ref.header_filename));
                let load = match candidates.as_slice() {
                    [] => {
                        return Err(Error::CrossReferenceMissing {
                            kind: RefKind::Load,
                            name: load_ref.header_filename.clone(),
                        });
                    }
                    [single] => *single,
                    _ => {
                        return Err(Error::CrossReferenceAmbiguous {
                            kind: RefKind::Load,
                            name: load_ref.header_filename.clone(),
                        });
                    }
                };

                if self.media_set.load(load)?.part_number != load_ref.part_number {
                    return Err(Error::Inconsistent {
                        reason: "load part number differs from batch file",
                        filename: load_ref.header_filename.clone(),
                    });
                }

                loads.push(load);
            }

            self.media_set.add_batch_target(
                node,
                target.target_hardware_id_position.clone(),
                loads,
            )?;
        }

        Ok(())
    }

    // --- load integrity --------------------------------------------------

    /// Streams every load (header, then data files, then support files in
    /// header order) through the CRC-32 engine and the Check Value
    /// generator and compares against the trailer values.
    fn verify_load_crcs(&mut self) -> Result<()> {
        if !self.check_file_integrity {
            return Ok(());
        }

        for index in 0..self.loads.len() {
            let (node, file_row, _) = self.loads[index].clone();
            self.verify_load_crc(node, &file_row)
                .map_err(|error| error.in_state(DecompileState::VerifyLoadCrcs))?;
        }
        Ok(())
    }

    fn verify_load_crc(&mut self, node: NodeId, file_row: &FileInfo) -> Result<()> {
        trace!("verify load CRC {}", row_path(file_row));

        let raw = self.source.read_file(row_medium(file_row)?, &row_path(file_row))?;

        let declared_check_value = LoadHeaderFile::decode_load_check_value(&raw)?;
        let mut generator = CheckValueGenerator::new(declared_check_value.check_value_type());
        let mut load_crc = Crc32Digest::new();

        LoadHeaderFile::process_load_crc(&raw, &mut load_crc);
        LoadHeaderFile::process_load_check_value(&raw, &mut generator)?;

        let data = self.media_set.load(node)?;
        let files: Vec<NodeId> = data
            .data_files()
            .iter()
            .chain(data.support_files())
            .map(|file_ref| file_ref.file)
            .collect();
        for file in files {
            let row = self.file_rows_by_node.get(&file).expect("file built from a row").clone();
            let contents = self.source.read_file(row_medium(&row)?, &row_path(&row))?;
            load_crc.update(&contents);
            generator.update(&contents);
        }

        if LoadHeaderFile::decode_load_crc(&raw) != load_crc.finalize() {
            return Err(Error::CrcMismatch {
                scope: CrcScope::Load,
                filename: file_row.filename.clone(),
            });
        }

        if declared_check_value != generator.finish() {
            return Err(Error::CheckValueMismatch {
                scope: CheckValueScope::Load,
                filename: file_row.filename.clone(),
            });
        }

        Ok(())
    }
}
