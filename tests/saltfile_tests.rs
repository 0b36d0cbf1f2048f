//! Integration tests for reading and writing salt files.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use saltseal::crypto::{seal, PrivateKey, SaltValue, SALT_LEN};
use saltseal::errors::SaltSealError;
use saltseal::saltfile::format::{encode_file, SaltFileHeader};
use saltseal::saltfile::{SaltFile, SealedSaltRecord, CURRENT_VERSION};
use tempfile::TempDir;

/// Helper: a fresh temp dir plus a salt file path inside it.
fn salt_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("demo.salt");
    (dir, path)
}

fn header() -> SaltFileHeader {
    SaltFileHeader {
        project: "demo".into(),
        created_at: Utc::now(),
        updated_at: None,
        salt_len: SALT_LEN,
    }
}

fn sealed_record(id: &str) -> SealedSaltRecord {
    let key = PrivateKey::generate().unwrap();
    let blob = seal(&SaltValue::from_bytes([9u8; SALT_LEN]), &key.public_key(), id).unwrap();
    SealedSaltRecord::new(id, format!("Site {id}"), blob)
}

fn demo_file() -> SaltFile {
    let mut file = SaltFile::new("demo");
    for id in ["north", "south", "east"] {
        file.add_record(sealed_record(id)).unwrap();
    }
    file
}

// ---------------------------------------------------------------------------
// Save / load
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_preserves_everything() {
    let (_dir, path) = salt_path();
    let file = demo_file();
    file.save(&path).unwrap();

    let loaded = SaltFile::load(&path).unwrap();
    assert_eq!(loaded, file);
    assert_eq!(loaded.project_name(), "demo");
    let ids: Vec<&str> = loaded.records().map(|r| r.site_id()).collect();
    assert_eq!(ids, ["east", "north", "south"]);
}

#[test]
fn resaving_an_unmodified_file_is_byte_identical() {
    let (dir, path) = salt_path();
    demo_file().save(&path).unwrap();
    let original = fs::read(&path).unwrap();

    let copy = dir.path().join("copy.salt");
    SaltFile::load(&path).unwrap().save(&copy).unwrap();
    assert_eq!(fs::read(&copy).unwrap(), original);
}

#[test]
fn saved_file_starts_with_magic_and_version() {
    let (_dir, path) = salt_path();
    demo_file().save(&path).unwrap();
    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"SSLT");
    assert_eq!(bytes[4], CURRENT_VERSION);
}

#[cfg(unix)]
#[test]
fn saved_file_is_world_readable_but_not_writable() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, path) = salt_path();
    demo_file().save(&path).unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[test]
fn missing_file_is_reported_with_its_path() {
    let (_dir, path) = salt_path();
    match SaltFile::load(&path) {
        Err(SaltSealError::SaltFileNotFound(p)) => assert_eq!(p, path),
        other => panic!("expected SaltFileNotFound, got {other:?}"),
    }
}

#[test]
fn newer_version_is_unsupported() {
    let (_dir, path) = salt_path();
    demo_file().save(&path).unwrap();
    let mut bytes = fs::read(&path).unwrap();
    bytes[4] = CURRENT_VERSION + 1;
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(
        SaltFile::load(&path),
        Err(SaltSealError::UnsupportedVersion { found, .. }) if found == CURRENT_VERSION + 1
    ));
}

#[test]
fn version_zero_is_invalid() {
    let mut bytes = demo_file().to_bytes().unwrap();
    bytes[4] = 0;
    assert!(matches!(
        SaltFile::from_bytes(&bytes),
        Err(SaltSealError::InvalidFileFormat(_))
    ));
}

#[test]
fn not_a_salt_file_is_invalid() {
    assert!(matches!(
        SaltFile::from_bytes(b"site_id,site_name,public_key_path\nA,Alpha,a.pub\n"),
        Err(SaltSealError::InvalidFileFormat(_))
    ));
}

#[test]
fn corrupted_byte_fails_checksum() {
    let mut bytes = demo_file().to_bytes().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    assert!(matches!(
        SaltFile::from_bytes(&bytes),
        Err(SaltSealError::ChecksumMismatch)
    ));
}

#[test]
fn malformed_record_reports_its_index() {
    let (a, b) = (sealed_record("a"), sealed_record("b"));
    let mut bytes = encode_file(&header(), &[&a, &b]).unwrap();

    // Walk to the tag byte of record #1.
    let header_len = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
    let first_len_at = 9 + header_len + 4;
    let first_len =
        u32::from_le_bytes(bytes[first_len_at..first_len_at + 4].try_into().unwrap()) as usize;
    let second_tag_at = first_len_at + 4 + first_len + 4;
    bytes[second_tag_at] = 0x7F;

    match SaltFile::from_bytes(&bytes) {
        Err(SaltSealError::MalformedRecord { index, reason }) => {
            assert_eq!(index, 1);
            assert!(reason.contains("tag"), "reason was: {reason}");
        }
        other => panic!("expected MalformedRecord, got {other:?}"),
    }
}

#[test]
fn duplicate_site_in_file_is_rejected() {
    let (a1, a2) = (sealed_record("a"), sealed_record("a"));
    let bytes = encode_file(&header(), &[&a1, &a2]).unwrap();
    assert!(matches!(
        SaltFile::from_bytes(&bytes),
        Err(SaltSealError::DuplicateSite(ref id)) if id == "a"
    ));
}

// ---------------------------------------------------------------------------
// Record lookup
// ---------------------------------------------------------------------------

#[test]
fn record_for_key_finds_the_sealed_recipient() {
    let key = PrivateKey::generate().unwrap();
    let blob = seal(&SaltValue::from_bytes([1u8; SALT_LEN]), &key.public_key(), "west").unwrap();

    let mut file = demo_file();
    file.add_record(SealedSaltRecord::new("west", "West Clinic", blob))
        .unwrap();

    let found = file.record_for_key(&key).unwrap();
    assert_eq!(found.site_id(), "west");
    assert_eq!(found.site_name(), "West Clinic");
    assert!(file.record_for_key(&PrivateKey::generate().unwrap()).is_none());
}
