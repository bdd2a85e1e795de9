//! Integration tests for `VaultStore`: add, list, extract, delete and the
//! naming rules around them.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

use securevault::crypto::SessionKey;
use securevault::errors::VaultError;
use securevault::vault::{ItemListing, VaultStore};

/// Helper: an empty vault directory plus a separate scratch directory.
fn setup() -> (TempDir, TempDir, VaultStore) {
    let vault = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let store = VaultStore::open(vault.path()).unwrap().with_wipe_passes(1);
    (vault, scratch, store)
}

fn key() -> SessionKey {
    SessionKey::new([0x5a; 32])
}

fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Files in `dir` whose names start with a dot (temp files).
fn hidden_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with('.'))
        .collect()
}

// ---------------------------------------------------------------------------
// Add + extract
// ---------------------------------------------------------------------------

#[test]
fn add_then_extract_round_trip() {
    let (vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(1);
    let source = write_file(scratch.path(), "tax return.pdf", b"%PDF-1.7 numbers");

    let item = store
        .add_file(&key(), &source, at(1_700_000_000_123), &mut rng)
        .unwrap();
    assert_eq!(item, "tax_return.pdf_1700000000123.sv");
    assert!(vault.path().join(&item).is_file());
    assert!(source.exists(), "add must not touch the original");

    let out_dir = scratch.path().join("out");
    let written = store.extract(&key(), &item, &out_dir, &mut rng).unwrap();

    assert_eq!(written, out_dir.join("tax return.pdf"));
    assert_eq!(fs::read(&written).unwrap(), b"%PDF-1.7 numbers");
    assert!(hidden_files(&out_dir).is_empty());
}

#[test]
fn add_refuses_to_overwrite_existing_item() {
    let (_vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(2);
    let source = write_file(scratch.path(), "a.txt", b"one");
    let now = at(5);

    store.add_file(&key(), &source, now, &mut rng).unwrap();
    let err = store.add_file(&key(), &source, now, &mut rng).unwrap_err();
    assert!(matches!(err, VaultError::ItemAlreadyExists(_)));
}

#[test]
fn add_rejects_directories() {
    let (_vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(3);

    let err = store
        .add_file(&key(), scratch.path(), at(1), &mut rng)
        .unwrap_err();
    assert!(matches!(err, VaultError::NotAFile(_)));
}

#[test]
fn failed_add_leaves_nothing_behind() {
    let (vault, _scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(4);

    // Declared size larger than the stream: encode fails part-way.
    let err = store
        .add_reader(&key(), &mut Cursor::new(b"abc"), "short.bin", 10, at(1), &mut rng)
        .unwrap_err();
    assert!(matches!(err, VaultError::SizeMismatch { .. }));
    assert_eq!(fs::read_dir(vault.path()).unwrap().count(), 0);
}

#[test]
fn oversized_name_is_rejected_before_any_write() {
    let (vault, _scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(5);
    let name = "x".repeat(70_000);

    let err = store
        .add_reader(&key(), &mut Cursor::new(b"abc"), &name, 3, at(1), &mut rng)
        .unwrap_err();
    assert!(matches!(err, VaultError::NameTooLong(70_000)));
    assert_eq!(fs::read_dir(vault.path()).unwrap().count(), 0);
}

// ---------------------------------------------------------------------------
// Extract naming
// ---------------------------------------------------------------------------

#[test]
fn extract_picks_unique_names() {
    let (_vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(6);
    let source = write_file(scratch.path(), "notes.txt", b"n");
    let item = store.add_file(&key(), &source, at(9), &mut rng).unwrap();

    let out_dir = scratch.path().join("out");
    fs::create_dir(&out_dir).unwrap();
    write_file(&out_dir, "notes.txt", b"existing");

    let first = store.extract(&key(), &item, &out_dir, &mut rng).unwrap();
    let second = store.extract(&key(), &item, &out_dir, &mut rng).unwrap();

    assert_eq!(first, out_dir.join("notes(1).txt"));
    assert_eq!(second, out_dir.join("notes(2).txt"));
    assert_eq!(fs::read(out_dir.join("notes.txt")).unwrap(), b"existing");
}

#[test]
fn extract_ignores_leftover_staging_file() {
    let (_vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(13);
    let source = write_file(scratch.path(), "report.pdf", b"quarterly");
    let item = store.add_file(&key(), &source, at(2), &mut rng).unwrap();

    // Left behind by an extract that was killed mid-write.
    let out_dir = scratch.path().join("out");
    fs::create_dir(&out_dir).unwrap();
    let leftover = write_file(&out_dir, &format!(".{item}.partial"), b"half");

    let written = store.extract(&key(), &item, &out_dir, &mut rng).unwrap();

    assert_eq!(written, out_dir.join("report.pdf"));
    assert_eq!(fs::read(&written).unwrap(), b"quarterly");
    assert_eq!(fs::read(&leftover).unwrap(), b"half");
    assert_eq!(hidden_files(&out_dir), vec![format!(".{item}.partial")]);
}

#[test]
fn extract_strips_directories_from_stored_name() {
    let (vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(7);

    let item = store
        .add_reader(&key(), &mut Cursor::new(b"evil"), "../../escape.sh", 4, at(1), &mut rng)
        .unwrap();

    let out_dir = scratch.path().join("out");
    let written = store.extract(&key(), &item, &out_dir, &mut rng).unwrap();

    assert_eq!(written, out_dir.join("escape.sh"));
    assert!(!vault.path().parent().unwrap().join("escape.sh").exists());
}

#[test]
fn extract_with_wrong_key_writes_nothing() {
    let (_vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(8);
    let source = write_file(scratch.path(), "s.txt", b"secret");
    let item = store.add_file(&key(), &source, at(1), &mut rng).unwrap();

    let out_dir = scratch.path().join("out");
    let err = store
        .extract(&SessionKey::new([1; 32]), &item, &out_dir, &mut rng)
        .unwrap_err();

    assert!(matches!(err, VaultError::AuthenticationFailure));
    assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
}

#[test]
fn item_names_are_validated() {
    let (vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(9);
    fs::write(vault.path().join("vault.properties"), "salt=x\n").unwrap();

    for bad in ["", "..", "../x.sv", "sub/x.sv", "vault.properties"] {
        let err = store
            .extract(&key(), bad, scratch.path(), &mut rng)
            .unwrap_err();
        assert!(
            matches!(err, VaultError::InvalidItemName(_)),
            "{bad:?} should be invalid"
        );
    }

    let err = store
        .extract(&key(), "missing_1.sv", scratch.path(), &mut rng)
        .unwrap_err();
    assert!(matches!(err, VaultError::ItemNotFound(_)));
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[test]
fn list_is_sorted_and_survives_corrupt_items() {
    let (vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(10);
    let b = write_file(scratch.path(), "b.txt", b"bbbb");
    let a = write_file(scratch.path(), "a.txt", b"aa");

    store.add_file(&key(), &b, at(2), &mut rng).unwrap();
    store.add_file(&key(), &a, at(1), &mut rng).unwrap();
    fs::write(vault.path().join("junk_3.sv"), b"not an item").unwrap();
    fs::write(vault.path().join("vault.properties"), b"ignored").unwrap();

    let items = store.list_items().unwrap();
    let names: Vec<&str> = items.iter().map(ItemListing::file_name).collect();
    assert_eq!(names, ["a.txt_1.sv", "b.txt_2.sv", "junk_3.sv"]);

    match &items[0] {
        ItemListing::Valid(summary) => {
            assert_eq!(summary.original_name, "a.txt");
            assert_eq!(summary.original_size, 2);
        }
        ItemListing::Invalid { error, .. } => panic!("unexpected error: {error}"),
    }
    assert!(matches!(
        &items[2],
        ItemListing::Invalid {
            error: VaultError::BadMagic,
            ..
        }
    ));
    assert_eq!(store.item_count().unwrap(), 3);
}

#[test]
fn header_can_be_read_without_key() {
    let (_vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(11);
    let source = write_file(scratch.path(), "h.bin", &[0u8; 1000]);
    let item = store.add_file(&key(), &source, at(1), &mut rng).unwrap();

    let header = store.read_item_header(&item).unwrap();
    assert_eq!(header.original_name, "h.bin");
    assert_eq!(header.original_size, 1000);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn delete_erases_item() {
    let (vault, scratch, store) = setup();
    let mut rng = StdRng::seed_from_u64(12);
    let source = write_file(scratch.path(), "gone.txt", b"bye");
    let item = store.add_file(&key(), &source, at(1), &mut rng).unwrap();

    store.delete(&item, &mut rng).unwrap();

    assert!(!vault.path().join(&item).exists());
    assert!(store.list_items().unwrap().is_empty());
    let err = store.delete(&item, &mut rng).unwrap_err();
    assert!(matches!(err, VaultError::ItemNotFound(_)));
}

#[test]
fn open_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let err = VaultStore::open(&dir.path().join("nope")).err().unwrap();
    assert!(matches!(err, VaultError::VaultNotInitialized(_)));
}

#[cfg(unix)]
#[test]
fn create_dir_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let parent = TempDir::new().unwrap();
    let dir = parent.path().join("SecureVault");
    VaultStore::create_dir(&dir).unwrap();

    let mode = fs::metadata(&dir).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o700);
}
