// Dry runs must report exactly what a real run would do — same buckets,
// same resolved destinations — while leaving the filesystem untouched.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::tempdir;

use filedog::{Classifier, Organizer, OrganizeReport, RuleTable};

const JPEG_MAGIC: [u8; 8] = [0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F'];

fn rows(report: &OrganizeReport) -> Vec<(PathBuf, Option<String>, Option<PathBuf>)> {
    let mut rows: Vec<_> = report
        .records
        .iter()
        .map(|r| (r.source.clone(), r.bucket.clone(), r.dest.clone()))
        .collect();
    rows.sort();
    rows
}

#[test]
fn dry_run_report_matches_real_run() {
    let td = tempdir().unwrap();
    fs::write(td.path().join("photo.jpg"), JPEG_MAGIC).unwrap();
    fs::write(td.path().join("notes.txt"), b"text lives here").unwrap();
    let images = td.path().join("Images");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("photo.jpg"), b"occupied").unwrap();

    let organizer = Organizer::new(Arc::new(Classifier::new(RuleTable::default())));

    let dry = organizer.organize(td.path(), true).unwrap();
    assert!(dry.dry_run);
    assert_eq!(dry.moved(), 2);

    // Nothing moved, nothing created.
    assert!(td.path().join("photo.jpg").exists());
    assert!(td.path().join("notes.txt").exists());
    assert!(!td.path().join("Documents").exists());

    let real = organizer.organize(td.path(), false).unwrap();
    assert!(!real.dry_run);
    assert_eq!(rows(&dry), rows(&real));

    // And the real run actually delivered the predicted destinations.
    for (_, _, dest) in rows(&real) {
        assert!(dest.expect("moved record carries a destination").exists());
    }
}
