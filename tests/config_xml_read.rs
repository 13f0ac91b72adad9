// Config loading through the public API: explicit paths only, so the tests
// never touch the real per-user config directory.

use std::fs;
use std::time::Duration;
use tempfile::tempdir;

use filedog::config::{LoadResult, load_config_from_path, load_or_init};

#[test]
fn explicit_path_loads_rules_and_watch_dirs() {
    let td = tempdir().unwrap();
    let path = td.path().join("config.xml");
    fs::write(
        &path,
        r#"<config>
  <default_bucket>Leftovers</default_bucket>
  <rule><match>image/</match><bucket>Pictures</bucket></rule>
  <watch_dir><path>/srv/inbox</path></watch_dir>
  <watch_dir><path>/srv/paused</path><enabled>false</enabled></watch_dir>
  <tick_interval_ms>250</tick_interval_ms>
</config>"#,
    )
    .unwrap();

    let cfg = load_config_from_path(&path).unwrap();
    assert_eq!(cfg.rules.bucket_for("image/webp"), "Pictures");
    assert_eq!(cfg.rules.default_bucket(), "Leftovers");
    assert_eq!(cfg.watch_dirs.len(), 2);
    assert!(cfg.watch_dirs[0].enabled, "enabled defaults to true");
    assert!(!cfg.watch_dirs[1].enabled);
    assert_eq!(cfg.tick_interval, Duration::from_millis(250));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let td = tempdir().unwrap();
    let missing = td.path().join("nope.xml");
    assert!(load_or_init(Some(&missing)).is_err());
}

#[test]
fn explicit_load_result_reports_origin() {
    let td = tempdir().unwrap();
    let path = td.path().join("config.xml");
    fs::write(&path, "<config><log_level>debug</log_level></config>").unwrap();

    match load_or_init(Some(&path)).unwrap() {
        LoadResult::Loaded(cfg, origin) => {
            assert_eq!(origin, path);
            assert_eq!(cfg.log_level, filedog::LogLevel::Debug);
        }
        other => panic!("expected Loaded, got {other:?}"),
    }
}

#[test]
fn whitespace_in_values_is_trimmed() {
    let td = tempdir().unwrap();
    let path = td.path().join("config.xml");
    fs::write(
        &path,
        "<config><rule><match>  image/  </match><bucket>  Pictures  </bucket></rule></config>",
    )
    .unwrap();

    let cfg = load_config_from_path(&path).unwrap();
    assert_eq!(cfg.rules.bucket_for("image/png"), "Pictures");
}
