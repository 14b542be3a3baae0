//! Compile/decompile round trip over the real filesystem.

use arinc645::CheckValueType;
use arinc665::files::SupportedArinc665Version;
use arinc665::{
    FileCreationPolicy, FilesystemCompilerBackend, FilesystemSource, MediaSet, MediaSetCompiler,
    MediaSetDecompiler, MediumNumber, medium_numbers,
};

#[test_log::test]
fn test_filesystem_round_trip() {
    let source_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    let code_path = source_dir.path().join("CODE.BIN");
    let notes_path = source_dir.path().join("NOTES.TXT");
    std::fs::write(&code_path, [0x10u8, 0x20, 0x30, 0x40]).unwrap();
    std::fs::write(&notes_path, b"release notes").unwrap();

    let mut media_set = MediaSet::new();
    media_set.set_part_number("SET-FS");
    media_set.set_media_set_check_value_type(Some(CheckValueType::Sha256));
    let root = media_set.root();
    let directory = media_set.add_subdirectory(root, "SW").unwrap();
    let code = media_set.add_regular_file(directory, "CODE.BIN", None).unwrap();
    let notes = media_set
        .add_regular_file(root, "NOTES.TXT", Some(MediumNumber::new(2).unwrap()))
        .unwrap();
    let load = media_set.add_load(root, "APP.LUH", None).unwrap();
    {
        let data = media_set.load_mut(load).unwrap();
        data.part_number = "L-FS".to_owned();
        data.target_hardware_id_positions = vec![("THW-A".to_owned(), Vec::new())];
    }
    media_set.add_load_data_file(load, code, "D-FS", None).unwrap();
    media_set.add_load_support_file(load, notes, "S-FS", None).unwrap();

    let mut backend = FilesystemCompilerBackend::new(output_dir.path());
    backend.register_source("\\SW\\CODE.BIN", &code_path);
    backend.register_source("\\NOTES.TXT", &notes_path);

    MediaSetCompiler::new(&media_set, &mut backend)
        .version(SupportedArinc665Version::Supplement345)
        .create_load_headers(FileCreationPolicy::All)
        .create_batch_files(FileCreationPolicy::All)
        .compile()
        .unwrap();

    assert!(output_dir.path().join("MEDIUM_001").join("FILES.LUM").is_file());
    assert!(output_dir.path().join("MEDIUM_001").join("SW").join("CODE.BIN").is_file());
    assert!(output_dir.path().join("MEDIUM_002").join("NOTES.TXT").is_file());

    let mut source = FilesystemSource::new();
    for medium in medium_numbers(media_set.last_medium_number()) {
        source = source.medium_path(medium, backend.medium_directory(medium));
    }

    let result = MediaSetDecompiler::new(&mut source).decompile().unwrap();
    let decompiled = &result.media_set;

    assert_eq!(decompiled.part_number(), "SET-FS");
    assert_eq!(decompiled.last_medium_number().get(), 2);

    let loads = decompiled.recursive_loads(decompiled.root(), None);
    assert_eq!(loads.len(), 1);
    let load = decompiled.load(loads[0]).unwrap();
    assert_eq!(load.part_number, "L-FS");
    assert_eq!(decompiled.path(load.data_files()[0].file), "\\SW\\CODE.BIN");
    assert_eq!(decompiled.path(load.support_files()[0].file), "\\NOTES.TXT");
}

#[test_log::test]
fn test_none_existing_policy_copies_prebuilt_headers() {
    let source_dir = tempfile::tempdir().unwrap();
    let first_output = tempfile::tempdir().unwrap();
    let second_output = tempfile::tempdir().unwrap();

    let data_path = source_dir.path().join("DATA.BIN");
    std::fs::write(&data_path, [0xA0u8, 0xA1]).unwrap();

    let mut media_set = MediaSet::new();
    media_set.set_part_number("SET-POL");
    let root = media_set.root();
    let file = media_set.add_regular_file(root, "DATA.BIN", None).unwrap();
    let load = media_set.add_load(root, "APP.LUH", None).unwrap();
    {
        let data = media_set.load_mut(load).unwrap();
        data.part_number = "L-POL".to_owned();
        data.target_hardware_id_positions = vec![("THW-A".to_owned(), Vec::new())];
    }
    media_set.add_load_data_file(load, file, "D-POL", None).unwrap();

    // First pass synthesises the header.
    let mut backend = FilesystemCompilerBackend::new(first_output.path());
    backend.register_source("\\DATA.BIN", &data_path);
    MediaSetCompiler::new(&media_set, &mut backend)
        .create_load_headers(FileCreationPolicy::All)
        .create_batch_files(FileCreationPolicy::All)
        .compile()
        .unwrap();

    let prebuilt = first_output.path().join("MEDIUM_001").join("APP.LUH");

    // Second pass under NoneExisting copies the pre-built header instead
    // of synthesising.
    let mut backend = FilesystemCompilerBackend::new(second_output.path());
    backend.register_source("\\DATA.BIN", &data_path);
    backend.register_source("\\APP.LUH", &prebuilt);
    MediaSetCompiler::new(&media_set, &mut backend)
        .create_load_headers(FileCreationPolicy::NoneExisting)
        .create_batch_files(FileCreationPolicy::NoneExisting)
        .compile()
        .unwrap();

    let copied = std::fs::read(second_output.path().join("MEDIUM_001").join("APP.LUH")).unwrap();
    assert_eq!(copied, std::fs::read(&prebuilt).unwrap());
}
