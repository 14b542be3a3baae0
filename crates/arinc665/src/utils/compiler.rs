//! Media set compilation.
//!
//! The compiler walks a [`MediaSet`] and produces the byte-accurate
//! on-disk media set through a [`CompilerBackend`]: directory structure,
//! regular files, load headers, batch files and the three list files.
//! Output is deterministic: equal inputs produce byte-for-byte identical
//! media sets.
//!
//! Integrity closure dictates the emission order. Regular files are
//! written first; load headers read them back to compute per-file CRCs,
//! Check Values and the Load CRC; `LOADS.LUM` and `BATCHES.LUM` follow;
//! `FILES.LUM` comes last, reading every listed file (the other list
//! files included) back to fill its CRC and Check Value rows.

use log::info;

use arinc645::{CheckValue, CheckValueGenerator, CheckValueType, Crc32Digest, crc16};
use arinc665_files::{
    BatchFile, BatchInfo, BatchListFile, BatchLoadInfo, BatchTargetInfo, FileInfo, FileListFile,
    LIST_OF_BATCHES_NAME, LIST_OF_FILES_NAME, LIST_OF_LOADS_NAME, LoadFileInfo, LoadHeaderFile,
    LoadInfo, LoadListFile, SupportedArinc665Version,
};

use crate::error::{Error, Result};
use crate::media::{MediaSet, MediumNumber, NodeId, medium_numbers};
use crate::utils::io::{CompilerBackend, list_file_path};
use crate::utils::FileCreationPolicy;

/// Builder-style media set compiler.
///
/// ```no_run
/// # fn backend() -> arinc665::FilesystemCompilerBackend { unimplemented!() }
/// use arinc665::files::SupportedArinc665Version;
/// use arinc665::{FileCreationPolicy, MediaSet, MediaSetCompiler};
///
/// let media_set = MediaSet::new();
/// let mut backend = backend();
/// MediaSetCompiler::new(&media_set, &mut backend)
///     .version(SupportedArinc665Version::Supplement345)
///     .create_load_headers(FileCreationPolicy::All)
///     .create_batch_files(FileCreationPolicy::All)
///     .compile()
///     .unwrap();
/// ```
pub struct MediaSetCompiler<'a, B: CompilerBackend> {
    media_set: &'a MediaSet,
    backend: &'a mut B,
    version: SupportedArinc665Version,
    create_load_headers: FileCreationPolicy,
    create_batch_files: FileCreationPolicy,
}

impl<'a, B: CompilerBackend> MediaSetCompiler<'a, B> {
    pub fn new(media_set: &'a MediaSet, backend: &'a mut B) -> Self {
        Self {
            media_set,
            backend,
            version: SupportedArinc665Version::default(),
            create_load_headers: FileCreationPolicy::default(),
            create_batch_files: FileCreationPolicy::default(),
        }
    }

    /// Target ARINC 665 version.
    pub fn version(mut self, version: SupportedArinc665Version) -> Self {
        self.version = version;
        self
    }

    /// Load header creation policy.
    pub fn create_load_headers(mut self, policy: FileCreationPolicy) -> Self {
        self.create_load_headers = policy;
        self
    }

    /// Batch file creation policy.
    pub fn create_batch_files(mut self, policy: FileCreationPolicy) -> Self {
        self.create_batch_files = policy;
        self
    }

    /// Runs the compilation.
    pub fn compile(mut self) -> Result<()> {
        if self.media_set.part_number().is_empty() {
            return Err(Error::InvalidMediaSet("part number is empty"));
        }

        info!("compile media set {:?}", self.media_set.part_number());

        let last_medium = self.media_set.last_medium_number();

        // Media skeleton: directories and regular files.
        for medium in medium_numbers(last_medium) {
            self.backend.create_medium(medium)?;
            self.export_container(medium, self.media_set.root())?;
        }

        // Load headers, then batch files; both may read regular files
        // back.
        for load in self.media_set.recursive_loads(self.media_set.root(), None) {
            self.export_load(load)?;
        }
        for batch in self.media_set.recursive_batches(self.media_set.root(), None) {
            self.export_batch(batch)?;
        }

        let has_batches =
            !self.media_set.recursive_batches(self.media_set.root(), None).is_empty();

        self.export_list_of_loads(last_medium)?;
        if has_batches {
            self.export_list_of_batches(last_medium)?;
        }
        self.export_list_of_files(last_medium, has_batches)?;

        Ok(())
    }

    fn v3(&self) -> bool {
        self.version == SupportedArinc665Version::Supplement345
    }

    fn export_container(&mut self, medium: MediumNumber, container: NodeId) -> Result<()> {
        for &child in self.media_set.children(container) {
            if self.media_set.file_kind(child) == Some(crate::media::FileKind::Regular)
                && self.media_set.effective_medium_number(child) == medium
            {
                info!("export regular file [{medium}]:{}", self.media_set.path(child));
                self.backend.create_file(medium, &self.media_set.path(child))?;
            }
        }

        for subdirectory in self.media_set.subdirectories(container) {
            if self.media_set.container_on_medium(subdirectory, medium) {
                info!("export directory [{medium}]:{}", self.media_set.path(subdirectory));
                self.backend.create_directory(medium, &self.media_set.path(subdirectory))?;
                self.export_container(medium, subdirectory)?;
            }
        }

        Ok(())
    }

    fn export_load(&mut self, load: NodeId) -> Result<()> {
        let medium = self.media_set.effective_medium_number(load);
        let path = self.media_set.path(load);
        info!("export load [{medium}]:{path}");

        match self.create_load_headers {
            FileCreationPolicy::None => self.backend.create_file(medium, &path),
            FileCreationPolicy::NoneExisting => {
                if self.backend.check_file_existence(medium, &path)? {
                    self.backend.create_file(medium, &path)
                } else {
                    self.create_load_header(load)
                }
            }
            FileCreationPolicy::All => self.create_load_header(load),
        }
    }

    fn export_batch(&mut self, batch: NodeId) -> Result<()> {
        let medium = self.media_set.effective_medium_number(batch);
        let path = self.media_set.path(batch);
        info!("export batch [{medium}]:{path}");

        match self.create_batch_files {
            FileCreationPolicy::None => self.backend.create_file(medium, &path),
            FileCreationPolicy::NoneExisting => {
                if self.backend.check_file_existence(medium, &path)? {
                    self.backend.create_file(medium, &path)
                } else {
                    self.create_batch_file(batch)
                }
            }
            FileCreationPolicy::All => self.create_batch_file(batch),
        }
    }

    fn read_model_file(&mut self, file: NodeId) -> Result<Vec<u8>> {
        let medium = self.media_set.effective_medium_number(file);
        let path = self.media_set.path(file);
        self.backend.read_file(medium, &path)
    }

    /// Builds the table entry for one data or support file, reading the
    /// file back for CRC and Check Value.
    fn load_file_information(
        &mut self,
        file_ref: &crate::media::LoadFileRef,
        default_check_value_type: CheckValueType,
    ) -> Result<LoadFileInfo> {
        let contents = self.read_model_file(file_ref.file)?;

        let check_value = if self.v3() {
            let check_value_type = file_ref.check_value_type.unwrap_or(default_check_value_type);
            CheckValueGenerator::check_value(check_value_type, &contents)
        } else {
            CheckValue::NOT_USED
        };

        Ok(LoadFileInfo {
            filename: self.media_set.name(file_ref.file).to_owned(),
            part_number: file_ref.part_number.clone(),
            length: contents.len() as u64,
            crc: crc16(&contents),
            check_value,
        })
    }

    /// Synthesises one load header, including the two-pass Load Check
    /// Value / Load CRC closure.
    fn create_load_header(&mut self, load: NodeId) -> Result<()> {
        let data = self.media_set.load(load)?;
        let load_check_value_type = self.media_set.effective_load_check_value_type(load)?;
        let data_files_default = self.media_set.effective_data_files_check_value_type(load)?;
        let support_files_default = self.media_set.effective_support_files_check_value_type(load)?;

        let mut header = LoadHeaderFile::new(self.version);
        header.part_flags = data.part_flags.into();
        header.part_number = data.part_number.clone();
        header.load_type = data.load_type.clone();
        header.target_hardware_ids =
            data.target_hardware_ids().map(str::to_owned).collect();
        header.target_hardware_id_positions = data.target_hardware_id_positions.clone();
        header.user_defined_data = data.user_defined_data.clone();
        if self.v3() {
            header.load_check_value = CheckValue::zeroed(load_check_value_type);
        }

        let data_files = data.data_files().to_vec();
        let support_files = data.support_files().to_vec();
        for file_ref in &data_files {
            let entry = self.load_file_information(file_ref, data_files_default)?;
            header.data_files.push(entry);
        }
        for file_ref in &support_files {
            let entry = self.load_file_information(file_ref, support_files_default)?;
            header.support_files.push(entry);
        }

        let mut raw = header.to_bytes()?;

        // Load Check Value over header prefix + data files + support
        // files, spliced in before the Load CRC is computed: the CRC
        // covers the spliced bytes.
        if self.v3() {
            let mut generator = CheckValueGenerator::new(load_check_value_type);
            LoadHeaderFile::process_load_check_value(&raw, &mut generator)?;
            for file_ref in data_files.iter().chain(&support_files) {
                let contents = self.read_model_file(file_ref.file)?;
                generator.update(&contents);
            }
            LoadHeaderFile::encode_load_check_value(&mut raw, &generator.finish())?;
        }

        let mut load_crc = Crc32Digest::new();
        LoadHeaderFile::process_load_crc(&raw, &mut load_crc);
        for file_ref in data_files.iter().chain(&support_files) {
            let contents = self.read_model_file(file_ref.file)?;
            load_crc.update(&contents);
        }
        LoadHeaderFile::encode_load_crc(&mut raw, load_crc.finalize());

        let medium = self.media_set.effective_medium_number(load);
        self.backend.write_file(medium, &self.media_set.path(load), &raw)
    }

    fn create_batch_file(&mut self, batch: NodeId) -> Result<()> {
        let data = self.media_set.batch(batch)?;

        let mut batch_file = BatchFile::new(self.version);
        batch_file.part_number = data.part_number.clone();
        batch_file.comment = data.comment.clone();
        for (target_hardware_id_position, loads) in data.targets() {
            batch_file.targets_hardware.push(BatchTargetInfo {
                target_hardware_id_position: target_hardware_id_position.clone(),
                loads: loads
                    .iter()
                    .map(|&load| {
                        Ok(BatchLoadInfo {
                            header_filename: self.media_set.name(load).to_owned(),
                            part_number: self.media_set.load(load)?.part_number.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            });
        }

        let raw = batch_file.to_bytes()?;
        let medium = self.media_set.effective_medium_number(batch);
        self.backend.write_file(medium, &self.media_set.path(batch), &raw)
    }

    fn export_list_of_loads(&mut self, last_medium: MediumNumber) -> Result<()> {
        let mut load_list = LoadListFile::new(self.version);
        load_list.media_set_pn = self.media_set.part_number().to_owned();
        load_list.number_of_media_set_members = last_medium.get();
        load_list.user_defined_data = self.media_set.loads_user_defined_data().to_vec();

        for load in self.media_set.recursive_loads(self.media_set.root(), None) {
            let data = self.media_set.load(load)?;
            load_list.loads.push(LoadInfo {
                part_number: data.part_number.clone(),
                header_filename: self.media_set.name(load).to_owned(),
                member_sequence_number: self.media_set.effective_medium_number(load).get().into(),
                target_hardware_ids: data.target_hardware_ids().map(str::to_owned).collect(),
            });
        }

        for medium in medium_numbers(last_medium) {
            info!("export list of loads [{medium}]");
            load_list.media_sequence_number = medium.get();
            let raw = load_list.to_bytes()?;
            self.backend.write_file(medium, &list_file_path(LIST_OF_LOADS_NAME), &raw)?;
        }

        Ok(())
    }

    fn export_list_of_batches(&mut self, last_medium: MediumNumber) -> Result<()> {
        let mut batch_list = BatchListFile::new(self.version);
        batch_list.media_set_pn = self.media_set.part_number().to_owned();
        batch_list.number_of_media_set_members = last_medium.get();
        batch_list.user_defined_data = self.media_set.batches_user_defined_data().to_vec();

        for batch in self.media_set.recursive_batches(self.media_set.root(), None) {
            let data = self.media_set.batch(batch)?;
            batch_list.batches.push(BatchInfo {
                part_number: data.part_number.clone(),
                filename: self.media_set.name(batch).to_owned(),
                member_sequence_number: self.media_set.effective_medium_number(batch).get().into(),
            });
        }

        for medium in medium_numbers(last_medium) {
            info!("export list of batches [{medium}]");
            batch_list.media_sequence_number = medium.get();
            let raw = batch_list.to_bytes()?;
            self.backend.write_file(medium, &list_file_path(LIST_OF_BATCHES_NAME), &raw)?;
        }

        Ok(())
    }

    /// Reads a written file back and computes its list row CRC and Check
    /// Value.
    fn file_crc_check_value(
        &mut self,
        medium: MediumNumber,
        path: &str,
        check_value_type: CheckValueType,
    ) -> Result<(u16, CheckValue)> {
        let contents = self.backend.read_file(medium, path)?;
        let check_value = if self.v3() {
            CheckValueGenerator::check_value(check_value_type, &contents)
        } else {
            CheckValue::NOT_USED
        };
        Ok((crc16(&contents), check_value))
    }

    fn export_list_of_files(&mut self, last_medium: MediumNumber, has_batches: bool) -> Result<()> {
        // Rows for model files are identical on every medium; compute them
        // once.
        let mut model_rows = Vec::new();
        for file in self.media_set.recursive_files(self.media_set.root()) {
            let medium = self.media_set.effective_medium_number(file);
            let check_value_type = self.media_set.effective_file_check_value_type(file);
            let (crc, check_value) =
                self.file_crc_check_value(medium, &self.media_set.path(file), check_value_type)?;

            model_rows.push(FileInfo {
                filename: self.media_set.name(file).to_owned(),
                path_name: self.media_set.parent_path(file),
                member_sequence_number: medium.get().into(),
                crc,
                check_value,
            });
        }

        let mut file_list = FileListFile::new(self.version);
        file_list.media_set_pn = self.media_set.part_number().to_owned();
        file_list.number_of_media_set_members = last_medium.get();
        file_list.user_defined_data = self.media_set.files_user_defined_data().to_vec();

        let list_check_value_type = self.media_set.effective_list_of_files_check_value_type();
        if self.v3() {
            file_list.check_value = CheckValue::zeroed(list_check_value_type);
        }

        for medium in medium_numbers(last_medium) {
            info!("export list of files [{medium}]");
            file_list.media_sequence_number = medium.get();
            file_list.files.clear();

            // The list files themselves lead the table; their CRCs cover
            // this medium's copies.
            let (crc, check_value) = self.file_crc_check_value(
                medium,
                &list_file_path(LIST_OF_LOADS_NAME),
                self.media_set.effective_list_of_loads_check_value_type(),
            )?;
            file_list.files.push(FileInfo {
                filename: LIST_OF_LOADS_NAME.to_owned(),
                path_name: "\\".to_owned(),
                member_sequence_number: medium.get().into(),
                crc,
                check_value,
            });

            if has_batches {
                let (crc, check_value) = self.file_crc_check_value(
                    medium,
                    &list_file_path(LIST_OF_BATCHES_NAME),
                    self.media_set.effective_list_of_batches_check_value_type(),
                )?;
                file_list.files.push(FileInfo {
                    filename: LIST_OF_BATCHES_NAME.to_owned(),
                    path_name: "\\".to_owned(),
                    member_sequence_number: medium.get().into(),
                    crc,
                    check_value,
                });
            }

            file_list.files.extend(model_rows.iter().cloned());

            let mut raw = file_list.to_bytes()?;
            if self.v3() {
                let mut generator = CheckValueGenerator::new(list_check_value_type);
                generator.update(FileListFile::check_value_region(&raw)?);
                FileListFile::encode_check_value(&mut raw, &generator.finish())?;
            }
            self.backend.write_file(medium, &list_file_path(LIST_OF_FILES_NAME), &raw)?;
        }

        Ok(())
    }
}
