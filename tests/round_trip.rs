//! End-to-end scenarios: round trip, wrong passphrase, body corruption,
//! truncation.

use lumimaja_core::error::LumiError;
use lumimaja_core::kdf::KdfParams;
use lumimaja_core::{file, HeaderRecord};
use secrecy::SecretString;
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use tempfile::tempdir;

fn pass(s: &str) -> SecretString {
    SecretString::new(s.into())
}

fn write_sample_database(path: &std::path::Path) {
    let mut engine = file::open_write(path, &pass("correct horse battery staple"), KdfParams::for_tests())
        .expect("open_write");
    engine.set_header(HeaderRecord::new((14, 3)));
    engine
        .write_record(&[
            (0x03, b"title".as_slice()),
            (0x04, b"user".as_slice()),
            (0x06, b"secret".as_slice()),
        ])
        .expect("write_record");
    engine.close_sync().expect("close_sync");
}

#[test]
fn round_trip_reads_back_what_was_written() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.lumi3");
    write_sample_database(&path);

    let mut engine =
        file::open_read(&path, &pass("correct horse battery staple")).expect("open_read");
    let entry = engine.read_record().unwrap().expect("one entry");
    assert_eq!(
        entry.fields(),
        &[
            (0x03, b"title".to_vec()),
            (0x04, b"user".to_vec()),
            (0x06, b"secret".to_vec()),
        ]
    );
    assert!(engine.read_record().unwrap().is_none());

    // No temp file left behind.
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path() != path)
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn wrong_passphrase_is_rejected_without_side_effects() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.lumi3");
    write_sample_database(&path);

    let result = file::open_read(&path, &pass("Tr0ub4dor&3"));
    assert!(matches!(result, Err(LumiError::WrongPassword)));

    // No side effect: the file is untouched and still opens with the
    // right passphrase.
    let mut engine =
        file::open_read(&path, &pass("correct horse battery staple")).expect("still valid");
    assert!(engine.read_record().unwrap().is_some());
}

#[test]
fn body_corruption_is_detected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.lumi3");
    write_sample_database(&path);

    // Flip a bit somewhere past the preamble and size frame, inside the
    // body ciphertext.
    let mut bytes = fs::read(&path).unwrap();
    let flip_at = bytes.len() - 20;
    bytes[flip_at] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    let result = file::open_read(&path, &pass("correct horse battery staple"));
    assert!(matches!(result, Err(LumiError::CryptoError)));
}

#[test]
fn truncation_is_detected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.lumi3");
    write_sample_database(&path);

    // Truncate to just past the preamble, well short of the size frame.
    const PREAMBLE_LEN: usize = 4 + 1 + 1 + 1 + 32 + 4 + 4 + 4 + 16;
    let mut file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len((PREAMBLE_LEN + 5) as u64).unwrap();
    drop(file);

    let result = file::open_read(&path, &pass("correct horse battery staple"));
    assert!(matches!(result, Err(LumiError::Truncated)));
}

#[test]
fn mtime_advances_across_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.lumi3");
    write_sample_database(&path);
    let mtime1 = fs::metadata(&path).unwrap().modified().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(20));
    write_sample_database(&path);
    let mtime2 = fs::metadata(&path).unwrap().modified().unwrap();

    assert!(mtime2 >= mtime1);
}

#[test]
fn independent_writes_use_fresh_salts_and_ciphertexts() {
    let dir = tempdir().unwrap();
    let path1 = dir.path().join("a.lumi3");
    let path2 = dir.path().join("b.lumi3");
    write_sample_database(&path1);
    write_sample_database(&path2);

    let bytes1 = fs::read(&path1).unwrap();
    let bytes2 = fs::read(&path2).unwrap();

    // Same logical content, different salt (preamble bytes 7..39) and
    // different overall ciphertext.
    assert_ne!(&bytes1[7..39], &bytes2[7..39]);
    assert_ne!(bytes1, bytes2);
}

#[test]
fn unknown_header_fields_survive_a_read_modify_write_cycle() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.lumi3");

    let mut engine =
        file::open_write(&path, &pass("pw"), KdfParams::for_tests()).expect("open_write");
    let mut header = HeaderRecord::new((14, 3));
    header.unknown_fields = vec![(0x30, vec![1, 2, 3, 4]), (0x31, b"future field".to_vec())];
    engine.set_header(header);
    engine.write_record(&[(0x03, b"only entry".as_slice())]).unwrap();
    engine.close_sync().unwrap();

    let mut reader = file::open_read(&path, &pass("pw")).expect("open_read");
    assert_eq!(
        reader.header().unknown_fields,
        vec![(0x30, vec![1, 2, 3, 4]), (0x31, b"future field".to_vec())]
    );

    // Read-modify-write: keep the header as-is, rewrite the file.
    let header = reader.header().clone();
    reader.close().unwrap();

    let mut writer =
        file::open_write(&path, &pass("pw"), KdfParams::for_tests()).expect("open_write");
    writer.set_header(header);
    writer.write_record(&[(0x03, b"only entry".as_slice())]).unwrap();
    writer.close_sync().unwrap();

    let mut reader2 = file::open_read(&path, &pass("pw")).expect("open_read");
    assert_eq!(
        reader2.header().unknown_fields,
        vec![(0x30, vec![1, 2, 3, 4]), (0x31, b"future field".to_vec())]
    );
}

#[test]
fn corrupted_preamble_magic_is_not_our_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.lumi3");
    write_sample_database(&path);

    let mut file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(b"NOPE").unwrap();
    drop(file);

    let result = file::open_read(&path, &pass("correct horse battery staple"));
    assert!(matches!(result, Err(LumiError::NotOurFile)));
}

#[test]
fn rename_over_existing_destination_replaces_it_atomically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.lumi3");
    write_sample_database(&path);
    let first_contents = fs::read(&path).unwrap();

    // Write again with a different entry; destination must end up with
    // the new content, not a merge of both.
    let mut engine =
        file::open_write(&path, &pass("correct horse battery staple"), KdfParams::for_tests())
            .unwrap();
    engine.set_header(HeaderRecord::new((14, 3)));
    engine
        .write_record(&[(0x03, b"second entry".as_slice())])
        .unwrap();
    engine.close_sync().unwrap();

    let second_contents = fs::read(&path).unwrap();
    assert_ne!(first_contents, second_contents);

    let mut reader =
        file::open_read(&path, &pass("correct horse battery staple")).unwrap();
    let entry = reader.read_record().unwrap().unwrap();
    assert_eq!(entry.fields(), &[(0x03, b"second entry".to_vec())]);
}
