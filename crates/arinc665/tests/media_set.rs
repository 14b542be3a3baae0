//! End-to-end compile/decompile scenarios over an in-memory backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;

use arinc645::{CheckValueType, crc16, crc32};
use arinc665::files::{
    BatchFile, FileListFile, LIST_OF_BATCHES_NAME, LIST_OF_FILES_NAME, LIST_OF_LOADS_NAME,
    LoadHeaderFile, LoadListFile, SupportedArinc665Version,
};
use arinc665::{
    CompilerBackend, DecompileResult, DecompilerSource, DecompileState, Error,
    FileCreationPolicy, MediaSet, MediaSetCompiler, MediaSetDecompiler, MediumNumber, RefKind,
    Result,
};

fn medium(number: u8) -> MediumNumber {
    MediumNumber::new(number).unwrap()
}

/// In-memory media store serving both sides of the pipeline.
#[derive(Debug, Default)]
struct MemoryBackend {
    /// medium → model path → contents
    media: BTreeMap<u8, BTreeMap<String, Vec<u8>>>,
    directories: BTreeMap<u8, BTreeSet<String>>,
    /// Source files served by `create_file`.
    sources: HashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    fn with_source(mut self, path: &str, contents: &[u8]) -> Self {
        self.sources.insert(path.to_owned(), contents.to_vec());
        self
    }

    fn file(&self, medium: u8, path: &str) -> &[u8] {
        &self.media[&medium][path]
    }

    fn file_mut(&mut self, medium: u8, path: &str) -> &mut Vec<u8> {
        self.media.get_mut(&medium).unwrap().get_mut(path).unwrap()
    }

    fn has_file(&self, medium: u8, path: &str) -> bool {
        self.media.get(&medium).is_some_and(|files| files.contains_key(path))
    }
}

impl CompilerBackend for MemoryBackend {
    fn create_medium(&mut self, medium: MediumNumber) -> Result<()> {
        self.media.entry(medium.get()).or_default();
        self.directories.entry(medium.get()).or_default();
        Ok(())
    }

    fn create_directory(&mut self, medium: MediumNumber, path: &str) -> Result<()> {
        self.directories.entry(medium.get()).or_default().insert(path.to_owned());
        Ok(())
    }

    fn check_file_existence(&mut self, _medium: MediumNumber, path: &str) -> Result<bool> {
        Ok(self.sources.contains_key(path))
    }

    fn create_file(&mut self, medium: MediumNumber, path: &str) -> Result<()> {
        let contents = self
            .sources
            .get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_owned()))?
            .clone();
        self.media.entry(medium.get()).or_default().insert(path.to_owned(), contents);
        Ok(())
    }

    fn write_file(&mut self, medium: MediumNumber, path: &str, contents: &[u8]) -> Result<()> {
        self.media.entry(medium.get()).or_default().insert(path.to_owned(), contents.to_vec());
        Ok(())
    }

    fn read_file(&mut self, medium: MediumNumber, path: &str) -> Result<Vec<u8>> {
        DecompilerSource::read_file(self, medium, path)
    }
}

impl DecompilerSource for MemoryBackend {
    fn file_size(&mut self, medium: MediumNumber, path: &str) -> Result<u64> {
        DecompilerSource::read_file(self, medium, path).map(|contents| contents.len() as u64)
    }

    fn read_file(&mut self, medium: MediumNumber, path: &str) -> Result<Vec<u8>> {
        self.media
            .get(&medium.get())
            .and_then(|files| files.get(path))
            .cloned()
            .ok_or_else(|| {
                Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("[{medium}]:{path}"),
                ))
            })
    }
}

fn compile(
    media_set: &MediaSet,
    backend: &mut MemoryBackend,
    version: SupportedArinc665Version,
) -> Result<()> {
    MediaSetCompiler::new(media_set, backend)
        .version(version)
        .create_load_headers(FileCreationPolicy::All)
        .create_batch_files(FileCreationPolicy::All)
        .compile()
}

fn decompile(backend: &mut MemoryBackend) -> Result<DecompileResult> {
    MediaSetDecompiler::new(backend).decompile()
}

/// Flips one bit of the media set part number inside a list file and
/// repairs the trailing file CRC, leaving a decodable but diverging file.
fn corrupt_part_number(raw: &mut [u8]) {
    // Part number content starts after the 24-byte header plus its 16-bit
    // length prefix; byte 26 is inside it for any realistic PN. Flipping
    // the low bit keeps the character printable ASCII.
    raw[26] ^= 0x01;
    let crc_position = raw.len() - 2;
    let crc = crc16(&raw[..crc_position]);
    raw[crc_position..].copy_from_slice(&crc.to_be_bytes());
}

#[test]
fn test_minimal_single_medium() {
    let mut media_set = MediaSet::new();
    media_set.set_part_number("SET-A");
    let root = media_set.root();
    media_set.add_regular_file(root, "README.TXT", None).unwrap();

    let mut backend = MemoryBackend::default().with_source("\\README.TXT", b"ABCD");
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement2).unwrap();

    assert_eq!(backend.file(1, "\\README.TXT"), b"ABCD");
    assert!(!backend.has_file(1, "\\BATCHES.LUM"));

    let file_list = FileListFile::from_bytes(backend.file(1, "\\FILES.LUM")).unwrap();
    assert_eq!(file_list.media_set_pn, "SET-A");
    assert_eq!(file_list.number_of_media_set_members, 1);

    let readme = file_list.files.iter().find(|row| row.filename == "README.TXT").unwrap();
    assert_eq!(readme.path_name, "\\");
    assert_eq!(readme.member_sequence_number, 1);
    assert_eq!(readme.crc, crc16(b"ABCD"));

    let load_list = LoadListFile::from_bytes(backend.file(1, "\\LOADS.LUM")).unwrap();
    assert!(load_list.loads.is_empty());

    let result = decompile(&mut backend).unwrap();
    assert_eq!(result.media_set.part_number(), "SET-A");
    let files = result.media_set.recursive_regular_files(result.media_set.root(), None);
    assert_eq!(files.len(), 1);
    assert_eq!(result.media_set.name(files[0]), "README.TXT");
}

#[test]
fn test_load_round_trip() {
    let mut media_set = MediaSet::new();
    media_set.set_part_number("PN-1");
    let root = media_set.root();
    let f1 = media_set.add_regular_file(root, "F1", None).unwrap();
    let f2 = media_set.add_regular_file(root, "F2", None).unwrap();
    let load = media_set.add_load(root, "APP.LUH", None).unwrap();
    {
        let data = media_set.load_mut(load).unwrap();
        data.part_number = "L-1".to_owned();
        data.target_hardware_id_positions = vec![("THW-A".to_owned(), Vec::new())];
        data.load_check_value_type = Some(CheckValueType::Crc32);
    }
    media_set.add_load_data_file(load, f1, "D-1", None).unwrap();
    media_set.add_load_data_file(load, f2, "D-2", None).unwrap();

    let mut backend = MemoryBackend::default()
        .with_source("\\F1", &[0x01, 0x02])
        .with_source("\\F2", &[0x03, 0x04, 0x05, 0x06]);
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();

    // The Load CRC covers the header up to the Load CRC field plus both
    // data files in listing order.
    let raw = backend.file(1, "\\APP.LUH").to_vec();
    let mut stream = raw[..raw.len() - 4].to_vec();
    stream.extend_from_slice(&[0x01, 0x02]);
    stream.extend_from_slice(&[0x03, 0x04, 0x05, 0x06]);
    assert_eq!(LoadHeaderFile::decode_load_crc(&raw), crc32(&stream));

    let header = LoadHeaderFile::from_bytes(&raw).unwrap();
    assert_eq!(header.part_number, "L-1");
    assert_eq!(header.load_check_value.check_value_type(), CheckValueType::Crc32);

    let result = decompile(&mut backend).unwrap();
    let loads = result.media_set.recursive_loads(result.media_set.root(), None);
    assert_eq!(loads.len(), 1);
    let decompiled = result.media_set.load(loads[0]).unwrap();
    assert_eq!(decompiled.part_number, "L-1");
    assert_eq!(decompiled.load_check_value_type, Some(CheckValueType::Crc32));
    assert_eq!(decompiled.data_files().len(), 2);
    assert_eq!(decompiled.data_files()[0].part_number, "D-1");
    let ids: Vec<&str> = decompiled.target_hardware_ids().collect();
    assert_eq!(ids, vec!["THW-A"]);
}

#[test]
fn test_cross_medium_inconsistency() {
    let mut media_set = MediaSet::new();
    media_set.set_part_number("SET-MULTI");
    let root = media_set.root();
    media_set.add_regular_file(root, "A.BIN", None).unwrap();
    media_set.add_regular_file(root, "B.BIN", Some(medium(2))).unwrap();

    let mut backend = MemoryBackend::default()
        .with_source("\\A.BIN", &[0x11])
        .with_source("\\B.BIN", &[0x22]);
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();
    assert!(backend.has_file(2, "\\FILES.LUM"));

    corrupt_part_number(backend.file_mut(2, "\\FILES.LUM"));

    let error = decompile(&mut backend).unwrap_err();
    assert!(matches!(
        error,
        Error::Decompile {
            state: DecompileState::ReadFiles,
            ref source,
        } if matches!(**source, Error::InconsistentAcrossMedia { ref filename } if filename == LIST_OF_FILES_NAME),
    ));
}

#[test]
fn test_ambiguous_resolution() {
    let mut media_set = MediaSet::new();
    media_set.set_part_number("SET-AMB");
    let root = media_set.root();
    let dir_a = media_set.add_subdirectory(root, "A").unwrap();
    let dir_b = media_set.add_subdirectory(root, "B").unwrap();
    let file_a = media_set.add_regular_file(dir_a, "DATA.BIN", None).unwrap();
    media_set.add_regular_file(dir_b, "DATA.BIN", None).unwrap();
    let load = media_set.add_load(root, "APP.LUH", None).unwrap();
    {
        let data = media_set.load_mut(load).unwrap();
        data.part_number = "L-1".to_owned();
        data.target_hardware_id_positions = vec![("THW-A".to_owned(), Vec::new())];
    }
    media_set.add_load_data_file(load, file_a, "D-1", None).unwrap();

    // Identical contents on both files, hence identical CRCs.
    let mut backend = MemoryBackend::default()
        .with_source("\\A\\DATA.BIN", &[0xAB, 0xCD])
        .with_source("\\B\\DATA.BIN", &[0xAB, 0xCD]);
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();

    let error = decompile(&mut backend).unwrap_err();
    assert!(matches!(
        error,
        Error::Decompile {
            state: DecompileState::LinkLoads,
            ref source,
        } if matches!(
            **source,
            Error::CrossReferenceAmbiguous { kind: RefKind::DataFile, ref name } if name == "DATA.BIN",
        ),
    ));
}

#[test]
fn test_batch_round_trip() {
    let mut media_set = MediaSet::new();
    media_set.set_part_number("SET-B");
    let root = media_set.root();
    let load = media_set.add_load(root, "L.LUH", None).unwrap();
    {
        let data = media_set.load_mut(load).unwrap();
        data.part_number = "L-1".to_owned();
        data.target_hardware_id_positions = vec![("THW-A".to_owned(), Vec::new())];
    }
    let batch = media_set.add_batch(root, "B.LUB", None).unwrap();
    media_set.batch_mut(batch).unwrap().part_number = "B-1".to_owned();
    media_set.add_batch_target(batch, "THW-A_POS1", vec![load]).unwrap();

    let mut backend = MemoryBackend::default();
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();
    assert!(backend.has_file(1, "\\BATCHES.LUM"));

    let batch_file = BatchFile::from_bytes(backend.file(1, "\\B.LUB")).unwrap();
    assert_eq!(batch_file.part_number, "B-1");
    assert_eq!(batch_file.comment, "");
    assert_eq!(batch_file.targets_hardware.len(), 1);
    let target = &batch_file.targets_hardware[0];
    assert_eq!(target.target_hardware_id_position, "THW-A_POS1");
    assert_eq!(target.loads.len(), 1);
    assert_eq!(target.loads[0].header_filename, "L.LUH");
    assert_eq!(target.loads[0].part_number, "L-1");

    let result = decompile(&mut backend).unwrap();
    let batches = result.media_set.recursive_batches(result.media_set.root(), None);
    assert_eq!(batches.len(), 1);
    let decompiled = result.media_set.batch(batches[0]).unwrap();
    assert_eq!(decompiled.part_number, "B-1");
    assert_eq!(decompiled.comment, "");
    let (target_id, target_loads) = &decompiled.targets()[0];
    assert_eq!(target_id, "THW-A_POS1");
    assert_eq!(result.media_set.name(target_loads[0]), "L.LUH");
}

#[test]
fn test_user_defined_data_padding() {
    let mut media_set = MediaSet::new();
    media_set.set_part_number("SET-UDD");
    let root = media_set.root();
    media_set.add_regular_file(root, "X.BIN", None).unwrap();
    media_set.set_files_user_defined_data(vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);

    let mut backend = MemoryBackend::default().with_source("\\X.BIN", &[0x00]);
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();

    let file_list = FileListFile::from_bytes(backend.file(1, "\\FILES.LUM")).unwrap();
    assert_eq!(file_list.user_defined_data, vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x00]);

    let result = decompile(&mut backend).unwrap();
    assert_eq!(
        result.media_set.files_user_defined_data(),
        &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x00],
    );
}

/// Builds a two-medium set with directories, a load with data and support
/// files, and a batch.
fn rich_media_set() -> (MediaSet, MemoryBackend) {
    let mut media_set = MediaSet::new();
    media_set.set_part_number("SET-RICH");
    media_set.set_media_set_check_value_type(Some(CheckValueType::Sha256));
    media_set.set_loads_user_defined_data(vec![0x4C, 0x55]);
    let root = media_set.root();

    let dir = media_set.add_subdirectory(root, "SW").unwrap();
    let data_file = media_set.add_regular_file(dir, "CODE.BIN", None).unwrap();
    let support_file = media_set.add_regular_file(dir, "NOTES.TXT", None).unwrap();
    media_set.add_regular_file(root, "EXTRA.BIN", Some(medium(2))).unwrap();

    let load = media_set.add_load(root, "APP.LUH", None).unwrap();
    {
        let data = media_set.load_mut(load).unwrap();
        data.part_number = "L-100".to_owned();
        data.part_flags = arinc665::PartFlags::new().with_download(true);
        data.load_type = Some(("Operational".to_owned(), 7));
        data.target_hardware_id_positions =
            vec![("THW-A".to_owned(), vec!["L".to_owned(), "R".to_owned()])];
        data.user_defined_data = vec![0x01, 0x02];
    }
    media_set.add_load_data_file(load, data_file, "D-100", None).unwrap();
    media_set
        .add_load_support_file(load, support_file, "S-100", Some(CheckValueType::Md5))
        .unwrap();

    let batch = media_set.add_batch(root, "NIGHTLY.LUB", None).unwrap();
    {
        let data = media_set.batch_mut(batch).unwrap();
        data.part_number = "B-100".to_owned();
        data.comment = "nightly stand".to_owned();
    }
    media_set.add_batch_target(batch, "THW-A_POS1", vec![load]).unwrap();

    let backend = MemoryBackend::default()
        .with_source("\\SW\\CODE.BIN", &[0x10, 0x20, 0x30])
        .with_source("\\SW\\NOTES.TXT", b"support notes")
        .with_source("\\EXTRA.BIN", &[0xFF, 0xEE]);

    (media_set, backend)
}

#[test]
fn test_rich_round_trip_supplement_345() {
    let (media_set, mut backend) = rich_media_set();
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();

    let result = decompile(&mut backend).unwrap();
    let decompiled = &result.media_set;

    assert_eq!(decompiled.part_number(), "SET-RICH");
    assert_eq!(decompiled.last_medium_number(), medium(2));
    assert_eq!(decompiled.loads_user_defined_data(), &[0x4C, 0x55]);

    let loads = decompiled.recursive_loads(decompiled.root(), None);
    let load = decompiled.load(loads[0]).unwrap();
    assert_eq!(load.part_number, "L-100");
    assert!(load.part_flags.download());
    assert_eq!(load.load_type, Some(("Operational".to_owned(), 7)));
    assert_eq!(
        load.target_hardware_id_positions,
        vec![("THW-A".to_owned(), vec!["L".to_owned(), "R".to_owned()])],
    );
    assert_eq!(load.user_defined_data, vec![0x01, 0x02]);
    assert_eq!(load.data_files().len(), 1);
    assert_eq!(load.support_files().len(), 1);
    assert_eq!(
        load.support_files()[0].check_value_type,
        Some(CheckValueType::Md5),
    );
    assert_eq!(decompiled.path(load.data_files()[0].file), "\\SW\\CODE.BIN");

    // Observed check values include the listed CRC and the SHA-256 rows.
    let code_file = decompiled.recursive_regular_files(decompiled.root(), Some("CODE.BIN"))[0];
    let observed = &result.check_values[&code_file];
    assert!(observed.iter().any(|value| value.crc16().is_some()));
    assert!(
        observed
            .iter()
            .any(|value| value.check_value_type() == CheckValueType::Sha256)
    );
}

#[test]
fn test_decompiled_model_recompiles_identically() {
    let (media_set, mut backend) = rich_media_set();
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();

    let result = decompile(&mut backend).unwrap();

    let mut second = MemoryBackend::default()
        .with_source("\\SW\\CODE.BIN", &[0x10, 0x20, 0x30])
        .with_source("\\SW\\NOTES.TXT", b"support notes")
        .with_source("\\EXTRA.BIN", &[0xFF, 0xEE]);
    compile(&result.media_set, &mut second, SupportedArinc665Version::Supplement345).unwrap();

    assert_eq!(backend.media, second.media, "recompilation must be byte-identical");
}

#[test]
fn test_round_trip_supplement_2_drops_version_specific_data() {
    let (media_set, mut backend) = rich_media_set();
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement2).unwrap();

    let result = decompile(&mut backend).unwrap();
    let loads = result.media_set.recursive_loads(result.media_set.root(), None);
    let load = result.media_set.load(loads[0]).unwrap();

    // Supplement 2 has no part flags, load type, positions or check
    // values.
    assert!(!load.part_flags.download());
    assert_eq!(load.load_type, None);
    assert_eq!(load.load_check_value_type, None);
    assert!(load.target_hardware_id_positions.iter().all(|(_, positions)| positions.is_empty()));
    assert_eq!(load.support_files()[0].check_value_type, None);
}

#[test]
fn test_corrupt_data_file_fails_integrity_check() {
    let (media_set, mut backend) = rich_media_set();
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();

    backend.file_mut(1, "\\SW\\CODE.BIN")[0] ^= 0xFF;

    let error = decompile(&mut backend).unwrap_err();
    assert!(matches!(
        error,
        Error::Decompile { state: DecompileState::VerifyFiles, ref source }
            if matches!(**source, Error::CrcMismatch { .. }),
    ));
}

#[test]
fn test_integrity_check_can_be_disabled() {
    let (media_set, mut backend) = rich_media_set();
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();

    // Corrupt a data file and repair nothing: with integrity checking off
    // the structure still decompiles, because file CRCs are only checked
    // on demand.
    backend.file_mut(1, "\\SW\\NOTES.TXT")[0] ^= 0xFF;

    let result = MediaSetDecompiler::new(&mut backend)
        .check_file_integrity(false)
        .decompile()
        .unwrap();
    assert_eq!(result.media_set.part_number(), "SET-RICH");
}

#[test]
fn test_progress_handler_reports_all_media() {
    let (media_set, mut backend) = rich_media_set();
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();

    let mut reported = Vec::new();
    MediaSetDecompiler::new(&mut backend)
        .progress_handler(Box::new(|part_number, (current, total)| {
            reported.push((part_number.to_owned(), current, total));
        }))
        .decompile()
        .unwrap();

    assert_eq!(
        reported,
        vec![("SET-RICH".to_owned(), 1, 2), ("SET-RICH".to_owned(), 2, 2)],
    );
}

#[test]
fn test_missing_loads_list_is_rejected() {
    let mut media_set = MediaSet::new();
    media_set.set_part_number("SET-X");
    media_set.add_regular_file(media_set.root(), "X.BIN", None).unwrap();

    let mut backend = MemoryBackend::default().with_source("\\X.BIN", &[0x00]);
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();

    backend.media.get_mut(&1).unwrap().remove(LIST_OF_LOADS_NAME_PATH);

    let error = decompile(&mut backend).unwrap_err();
    assert!(matches!(
        error,
        Error::Decompile { state: DecompileState::ReadLoads, .. },
    ));
}

const LIST_OF_LOADS_NAME_PATH: &str = "\\LOADS.LUM";

#[test]
fn test_empty_part_number_is_rejected() {
    let media_set = MediaSet::new();
    let mut backend = MemoryBackend::default();
    let error =
        compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap_err();
    assert!(matches!(error, Error::InvalidMediaSet(_)));
}

#[test]
fn test_batches_list_only_when_batches_exist() {
    let mut media_set = MediaSet::new();
    media_set.set_part_number("SET-NB");
    media_set.add_regular_file(media_set.root(), "X.BIN", None).unwrap();

    let mut backend = MemoryBackend::default().with_source("\\X.BIN", &[0x00]);
    compile(&media_set, &mut backend, SupportedArinc665Version::Supplement345).unwrap();

    assert!(!backend.has_file(1, &format!("\\{LIST_OF_BATCHES_NAME}")));
    assert!(backend.has_file(1, &format!("\\{LIST_OF_FILES_NAME}")));
    assert!(backend.has_file(1, &format!("\\{LIST_OF_LOADS_NAME}")));
}
