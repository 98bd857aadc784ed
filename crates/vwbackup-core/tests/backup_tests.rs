//! Integration tests for building and encrypting backups

mod common;

use common::{entry_paths, open_archived_database, read_archive, vault_data_dir};
use std::fs;
use tempfile::TempDir;
use vwbackup_core::{
    build_backup, encrypt_archive, encrypted_path_for, BackupBuilder, BackupConfig, Error,
    Passphrase, SALTED_MAGIC,
};

#[test]
fn test_everything_mode_walks_tree_and_snapshots_database_once() {
    let source = vault_data_dir();
    let output = TempDir::new().unwrap();
    let archive = output.path().join("backup.tar.gz");

    build_backup(source.path(), "every", "data/", &archive).unwrap();

    let entries = read_archive(&archive);
    assert_eq!(
        entry_paths(&entries),
        vec![
            "data",
            "data/attachments",
            "data/attachments/4f2b",
            "data/attachments/4f2b/a1.bin",
            "data/attachments/4f2b/a2.bin",
            "data/config.json",
            "data/icon_cache",
            "data/icon_cache/example.com.png",
            "data/rsa_key.pem",
            "data/rsa_key.pub.pem",
            "data/sends",
            "data/sends/9c1d",
            "data/sends/9c1d/file",
            "data/db.sqlite3",
        ]
    );

    let databases: Vec<_> = entries
        .iter()
        .filter(|e| e.path.ends_with("db.sqlite3"))
        .collect();
    assert_eq!(databases.len(), 1);

    let scratch = TempDir::new().unwrap();
    let conn = open_archived_database(databases[0], scratch.path());
    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .unwrap();
    assert_eq!(users, 2);
}

#[test]
fn test_selective_mode_follows_fixed_order() {
    let source = vault_data_dir();
    let output = TempDir::new().unwrap();
    let archive = output.path().join("backup.tar.gz");

    build_backup(source.path(), "icon_cache,db,sends,config,key,attachments", "data", &archive)
        .unwrap();

    let entries = read_archive(&archive);
    assert_eq!(
        entry_paths(&entries),
        vec![
            "data",
            "data/attachments",
            "data/attachments/4f2b",
            "data/attachments/4f2b/a1.bin",
            "data/attachments/4f2b/a2.bin",
            "data/rsa_key.pem",
            "data/rsa_key.pub.pem",
            "data/config.json",
            "data/sends",
            "data/sends/9c1d",
            "data/sends/9c1d/file",
            "data/icon_cache",
            "data/icon_cache/example.com.png",
            "data/db.sqlite3",
        ]
    );
    assert!(entries[0].is_dir);
}

#[test]
fn test_default_targets() {
    let source = vault_data_dir();
    let output = TempDir::new().unwrap();
    let archive = output.path().join("backup.tar.gz");

    build_backup(source.path(), "", "data/", &archive).unwrap();

    let entries = read_archive(&archive);
    assert_eq!(
        entry_paths(&entries),
        vec![
            "data",
            "data/attachments",
            "data/attachments/4f2b",
            "data/attachments/4f2b/a1.bin",
            "data/attachments/4f2b/a2.bin",
            "data/config.json",
            "data/db.sqlite3",
        ]
    );
}

#[test]
fn test_missing_optional_file_adds_no_entry() {
    let source = vault_data_dir();
    fs::remove_file(source.path().join("config.json")).unwrap();
    let output = TempDir::new().unwrap();
    let archive = output.path().join("backup.tar.gz");

    build_backup(source.path(), "config,db", "data/", &archive).unwrap();

    let entries = read_archive(&archive);
    assert_eq!(entry_paths(&entries), vec!["data", "data/db.sqlite3"]);
}

#[test]
fn test_missing_optional_directories_are_skipped() {
    let source = vault_data_dir();
    fs::remove_dir_all(source.path().join("sends")).unwrap();
    fs::remove_dir_all(source.path().join("icon_cache")).unwrap();
    let output = TempDir::new().unwrap();
    let archive = output.path().join("backup.tar.gz");

    build_backup(source.path(), "sends,icon_cache", "data/", &archive).unwrap();

    assert_eq!(entry_paths(&read_archive(&archive)), vec!["data"]);
}

#[test]
fn test_payload_bytes_match_declared_sizes() {
    let source = vault_data_dir();
    let output = TempDir::new().unwrap();
    let archive = output.path().join("backup.tar.gz");

    let config = BackupConfig::from_spec("all").unwrap();
    let result = BackupBuilder::new(config)
        .create(source.path(), &archive)
        .unwrap();

    let entries = read_archive(&archive);
    let declared: u64 = entries.iter().map(|e| e.declared_size).sum();
    let read: u64 = entries.iter().map(|e| e.data.len() as u64).sum();

    assert_eq!(declared, read);
    assert_eq!(declared, result.payload_bytes);
    assert_eq!(entries.len(), result.entry_count);
    assert_eq!(result.size_bytes, fs::metadata(&archive).unwrap().len());
    assert!(entries.iter().filter(|e| e.is_dir).all(|e| e.declared_size == 0));

    let a1 = entries
        .iter()
        .find(|e| e.path == "data/attachments/4f2b/a1.bin")
        .unwrap();
    assert_eq!(a1.declared_size, 3000);
}

#[test]
fn test_empty_archive_base_places_entries_at_root() {
    let source = vault_data_dir();
    let output = TempDir::new().unwrap();
    let archive = output.path().join("backup.tar.gz");

    build_backup(source.path(), "config,db", "", &archive).unwrap();

    assert_eq!(
        entry_paths(&read_archive(&archive)),
        vec!["config.json", "db.sqlite3"]
    );
}

#[test]
fn test_invalid_targets_fail_before_output_is_created() {
    let source = vault_data_dir();
    let output = TempDir::new().unwrap();
    let archive = output.path().join("backup.tar.gz");

    let err = build_backup(source.path(), "db,bogus,config", "data/", &archive).unwrap_err();

    match &err {
        Error::UnsupportedTargets { tokens } => assert_eq!(tokens, &vec!["bogus".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("bogus"));
    assert!(!err.to_string().contains("config"));
    assert!(!archive.exists());
}

#[test]
fn test_build_then_encrypt_removes_plaintext() {
    let source = vault_data_dir();
    let output = TempDir::new().unwrap();
    let archive = output.path().join("backup.tar.gz");

    let built = build_backup(source.path(), "recommended", "data/", &archive).unwrap();
    let plaintext_len = fs::metadata(&built).unwrap().len();

    let destination = encrypted_path_for(&built);
    let encrypted =
        encrypt_archive(&built, &destination, &Passphrase::from("s3cret")).unwrap();

    assert!(!archive.exists());
    let sealed = fs::read(&encrypted).unwrap();
    assert_eq!(&sealed[..SALTED_MAGIC.len()], SALTED_MAGIC);
    // "Salted__" + 8 byte salt + PKCS#7 padded ciphertext
    assert_eq!(sealed.len() as u64, 16 + (plaintext_len / 16 + 1) * 16);
}
