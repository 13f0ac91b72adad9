use assert_fs::prelude::*;
use std::sync::Arc;

use filedog::{Classifier, Organizer, Outcome, RuleTable};

fn organizer() -> Organizer {
    Organizer::new(Arc::new(Classifier::new(RuleTable::default())))
}

#[test]
fn moved_file_content_is_intact() {
    let temp = assert_fs::TempDir::new().unwrap();
    let source = temp.child("a.txt");
    source.write_str("hello").unwrap();

    let record = organizer().organize_file(source.path(), false);
    assert!(record.is_moved());

    let dest = record.dest.expect("moved record carries a destination");
    assert!(dest.exists());
    assert!(!source.path().exists());
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "hello");
}

#[test]
fn bucket_directory_is_created_on_demand() {
    let temp = assert_fs::TempDir::new().unwrap();
    let source = temp.child("song.mp3");
    // ID3 magic so the sniffer sees audio/mpeg.
    source.write_binary(b"ID3\x03\x00\x00\x00\x00\x00\x00").unwrap();

    let record = organizer().organize_file(source.path(), false);
    assert!(record.is_moved());
    assert_eq!(record.bucket.as_deref(), Some("Audio"));
    assert!(temp.child("Audio").path().is_dir());
}

#[cfg(unix)]
#[test]
fn unreadable_file_still_moves_into_default_bucket() {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let temp = assert_fs::TempDir::new().unwrap();
    let source = temp.child("locked.bin");
    source.write_binary(b"secret").unwrap();
    fs::set_permissions(source.path(), fs::Permissions::from_mode(0o000)).unwrap();

    let record = organizer().organize_file(source.path(), false);
    // Classification cannot read the header; the move itself needs no read
    // access, so the file lands in the default bucket with a warning flag.
    assert_eq!(record.outcome, Outcome::Moved);
    assert!(record.warned);
    assert_eq!(record.bucket.as_deref(), Some("Others"));

    let dest = record.dest.unwrap();
    fs::set_permissions(&dest, fs::Permissions::from_mode(0o644)).unwrap();
    assert_eq!(fs::read(&dest).unwrap(), b"secret");
}
