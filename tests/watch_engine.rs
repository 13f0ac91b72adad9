// End-to-end watch engine tests: real notify backend, real files, short
// quiet periods. Serialized because platform watch backends dislike many
// concurrent instances in one process.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serial_test::serial;
use tempfile::tempdir;

use filedog::{Classifier, EngineConfig, Organizer, RuleTable, WatchEngine, WatchRegistry};

const JPEG_MAGIC: [u8; 8] = [0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F'];

fn engine_with(quiet: Duration, dirs: &[&Path]) -> WatchEngine {
    let registry = Arc::new(WatchRegistry::new());
    for dir in dirs {
        registry.add(dir);
    }
    let organizer = Arc::new(Organizer::new(Arc::new(Classifier::new(
        RuleTable::default(),
    ))));
    WatchEngine::new(
        registry,
        organizer,
        EngineConfig {
            quiet_period: quiet,
            max_pending: Duration::from_secs(30),
            tick_interval: Duration::from_millis(100),
        },
    )
}

fn wait_for(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    path.exists()
}

#[test]
#[serial]
fn organizes_new_file_after_quiet_period() {
    let td = tempdir().unwrap();
    let engine = engine_with(Duration::from_millis(300), &[td.path()]);
    assert!(engine.start().unwrap());
    thread::sleep(Duration::from_millis(300)); // let the backend arm

    fs::write(td.path().join("photo.jpg"), JPEG_MAGIC).unwrap();

    let dest = td.path().join("Images").join("photo.jpg");
    assert!(wait_for(&dest, Duration::from_secs(10)), "file was not organized");
    assert!(!td.path().join("photo.jpg").exists());

    engine.stop();
    assert!(!engine.status().running);
}

#[test]
#[serial]
fn start_is_idempotent() {
    let td = tempdir().unwrap();
    let engine = engine_with(Duration::from_millis(300), &[td.path()]);
    assert!(engine.start().unwrap());
    assert!(!engine.start().unwrap(), "second start must be a no-op");
    assert!(engine.status().running);
    engine.stop();
}

#[test]
#[serial]
fn incremental_copy_held_until_final_quiet() {
    let td = tempdir().unwrap();
    let engine = engine_with(Duration::from_millis(800), &[td.path()]);
    assert!(engine.start().unwrap());
    thread::sleep(Duration::from_millis(300));

    // A slow transfer: the file grows in increments spaced well under the
    // quiet period, so it must stay put until the writes stop.
    let src = td.path().join("big.bin");
    fs::write(&src, vec![1u8; 4096]).unwrap();
    for _ in 0..8 {
        thread::sleep(Duration::from_millis(150));
        let mut existing = fs::read(&src).unwrap();
        existing.extend_from_slice(&vec![2u8; 4096]);
        fs::write(&src, existing).unwrap();
    }
    assert!(
        src.exists(),
        "file must not be organized while writes are ongoing"
    );

    let dest = td.path().join("Others").join("big.bin");
    assert!(wait_for(&dest, Duration::from_secs(10)));
    assert_eq!(fs::metadata(&dest).unwrap().len(), 4096 * 9);
    engine.stop();
}

#[test]
#[serial]
fn directory_added_while_running_is_picked_up() {
    let td = tempdir().unwrap();
    let first = td.path().join("first");
    let second = td.path().join("second");
    fs::create_dir(&first).unwrap();
    fs::create_dir(&second).unwrap();

    let engine = engine_with(Duration::from_millis(300), &[first.as_path()]);
    assert!(engine.start().unwrap());
    thread::sleep(Duration::from_millis(300));

    assert!(engine.registry().add(&second));
    // Give the next tick a chance to reconcile, then drop a file in.
    thread::sleep(Duration::from_millis(400));
    fs::write(second.join("late.txt"), b"came in late").unwrap();

    let dest = second.join("Documents").join("late.txt");
    assert!(wait_for(&dest, Duration::from_secs(10)));
    engine.stop();
}

#[test]
#[serial]
fn disabled_directory_is_inert_until_enabled() {
    let td = tempdir().unwrap();
    let engine = engine_with(Duration::from_millis(300), &[td.path()]);
    engine.registry().set_enabled(td.path(), false);
    assert!(engine.start().unwrap());
    thread::sleep(Duration::from_millis(300));

    let src = td.path().join("notes.txt");
    fs::write(&src, b"waiting").unwrap();
    thread::sleep(Duration::from_millis(1_200));
    assert!(src.exists(), "disabled directory must not be organized");

    engine.registry().set_enabled(td.path(), true);
    thread::sleep(Duration::from_millis(400)); // reconcile tick
    // New write activity makes the file visible to the fresh watch.
    fs::write(&src, b"waiting still").unwrap();

    let dest = td.path().join("Documents").join("notes.txt");
    assert!(wait_for(&dest, Duration::from_secs(10)));
    engine.stop();
}

#[test]
#[serial]
fn deleted_watched_directory_is_dropped_from_registry() {
    let td = tempdir().unwrap();
    let doomed = td.path().join("doomed");
    fs::create_dir(&doomed).unwrap();

    let engine = engine_with(Duration::from_millis(300), &[doomed.as_path()]);
    assert!(engine.start().unwrap());
    thread::sleep(Duration::from_millis(300));
    assert_eq!(engine.status().directories.len(), 1);

    fs::remove_dir(&doomed).unwrap();
    thread::sleep(Duration::from_millis(600)); // a couple of reconcile ticks

    assert!(
        engine.status().directories.is_empty(),
        "vanished directory must be removed from the registry"
    );
    engine.stop();
}

#[test]
#[serial]
fn stop_latency_is_bounded_by_the_tick() {
    let td = tempdir().unwrap();
    let engine = engine_with(Duration::from_millis(300), &[td.path()]);
    assert!(engine.start().unwrap());
    thread::sleep(Duration::from_millis(200));

    let begin = Instant::now();
    engine.stop();
    assert!(
        begin.elapsed() < Duration::from_secs(2),
        "stop took {:?}",
        begin.elapsed()
    );
    assert!(!engine.status().running);
}
