//! End-to-end walk through the basic lifecycle of a mirrored file

use super::support::Fixture;
use std::fs;
use treemirror::strategy::ChangeKind;

#[test]
fn file_lifecycle_is_mirrored_step_by_step() {
    let fx = Fixture::new();
    let (engine, sink) = fx.engine(&fx.config());

    // New file is copied
    fx.write_source("a.txt", "hello");
    let report = engine.run_once().unwrap();
    assert_eq!(fx.replica_content("a.txt").as_deref(), Some("hello"));
    assert_eq!(sink.count("file_created"), 1);
    assert_eq!(report.mutations(), 1);
    sink.clear();

    // Rename keeps the replica copy and moves it
    fs::rename(fx.source.join("a.txt"), fx.source.join("b.txt")).unwrap();
    let report = engine.run_once().unwrap();
    assert_eq!(fx.replica_content("b.txt").as_deref(), Some("hello"));
    assert!(fx.replica_content("a.txt").is_none());
    assert_eq!(sink.count("file_renamed"), 1);
    assert_eq!(sink.count("file_created"), 0);
    assert_eq!(sink.count("file_deleted"), 0);
    assert_eq!(report.mutations(), 1);
    sink.clear();

    // Edit rewrites the file as one update
    fx.write_source("b.txt", "hello world");
    engine.run_once().unwrap();
    assert_eq!(fx.replica_content("b.txt").as_deref(), Some("hello world"));
    assert_eq!(sink.count("file_updated"), 1);
    assert_eq!(sink.events().len(), 1);
    sink.clear();

    // Delete removes it
    fs::remove_file(fx.source.join("b.txt")).unwrap();
    engine.run_once().unwrap();
    assert!(fx.replica_content("b.txt").is_none());
    assert_eq!(sink.count("file_deleted"), 1);
    assert_eq!(sink.events().len(), 1);
    sink.clear();

    // New subdirectory with a file
    fx.write_source("sub/c.txt", "x");
    engine.run_once().unwrap();
    assert_eq!(fx.replica_content("sub/c.txt").as_deref(), Some("x"));
    assert_eq!(sink.count("directory_created"), 1);
    assert_eq!(sink.count("file_created"), 1);
    assert_eq!(sink.events().len(), 2);

    fx.assert_mirrored();
}

#[test]
fn second_pass_is_a_no_op_for_both_change_strategies() {
    for change in [ChangeKind::ContentHash, ChangeKind::ModifiedTime] {
        let fx = Fixture::new();
        fx.write_source("a.txt", "alpha");
        fx.write_source("nested/deeper/b.txt", "beta");
        fx.write_source("nested/c.txt", "gamma");
        fs::create_dir_all(fx.source.join("empty")).unwrap();

        let mut config = fx.config();
        config.change_detection = change;
        let (engine, _sink) = fx.engine(&config);

        let first = engine.run_once().unwrap();
        assert!(first.mutations() > 0);
        fx.assert_mirrored();

        let second = engine.run_once().unwrap();
        assert_eq!(second.mutations(), 0, "strategy {change}");
        assert!(second.is_clean());
    }
}

#[test]
fn replica_only_content_is_removed_children_first() {
    let fx = Fixture::new();
    fx.write_source("keep.txt", "keep");
    fx.write_replica("keep.txt", "keep");
    fx.write_replica("stale/inner/x.txt", "x");
    fx.write_replica("stale/y.txt", "y");
    fx.write_replica("stray.txt", "stray");

    let (engine, sink) = fx.engine(&fx.config());
    let report = engine.run_once().unwrap();

    fx.assert_mirrored();
    assert_eq!(report.files_deleted, 3);
    assert_eq!(report.directories_deleted, 2);

    let kinds: Vec<&str> = sink.events().iter().map(|e| e.kind()).collect();
    let stale_done = kinds.iter().rposition(|k| *k == "directory_deleted").unwrap();
    let first_start = kinds
        .iter()
        .position(|k| *k == "directory_delete_started")
        .unwrap();
    assert!(first_start < stale_done);
    assert_eq!(kinds.last(), Some(&"directory_deleted"));
}

#[test]
fn tampered_replica_is_healed() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "pristine");
    let (engine, _sink) = fx.engine(&fx.config());
    engine.run_once().unwrap();

    fx.write_replica("a.txt", "tampered");
    let report = engine.run_once().unwrap();
    assert_eq!(report.files_updated, 1);
    assert_eq!(fx.replica_content("a.txt").as_deref(), Some("pristine"));
}

#[test]
fn same_size_edit_is_caught_by_content_hash() {
    let fx = Fixture::new();
    fx.write_source("a.txt", "hello");
    let (engine, _sink) = fx.engine(&fx.config());
    engine.run_once().unwrap();

    fx.write_source("a.txt", "jello");
    let report = engine.run_once().unwrap();
    assert_eq!(report.files_updated, 1);
    assert_eq!(fx.replica_content("a.txt").as_deref(), Some("jello"));
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_names_are_mirrored_without_colliding() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let fx = Fixture::new();
    fs::write(fx.source.join(OsStr::from_bytes(b"a\xff")), "one").unwrap();
    fs::write(fx.source.join(OsStr::from_bytes(b"a\xfe")), "two").unwrap();
    fs::write(fx.replica.join(OsStr::from_bytes(b"a\xfd")), "gone").unwrap();
    let (engine, _sink) = fx.engine(&fx.config());

    let report = engine.run_once().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.files_created, 2);
    assert_eq!(report.files_deleted, 1);
    assert_eq!(fs::read(fx.replica.join(OsStr::from_bytes(b"a\xff"))).unwrap(), b"one");
    assert_eq!(fs::read(fx.replica.join(OsStr::from_bytes(b"a\xfe"))).unwrap(), b"two");
    assert!(!fx.replica.join(OsStr::from_bytes(b"a\xfd")).exists());

    assert_eq!(engine.run_once().unwrap().mutations(), 0);
}

/// Replica copy of both subtrees with the same bytes as the source but older mtimes
fn aged_replica(fx: &Fixture) {
    fx.write_source("same/x.txt", "same");
    fx.write_source("changed/y.txt", "new!");
    fx.write_replica("same/x.txt", "same");
    fx.write_replica("changed/y.txt", "old!");
    let past = filetime::FileTime::from_unix_time(1_000_000_000, 0);
    for file in ["same/x.txt", "changed/y.txt"] {
        filetime::set_file_mtime(fx.replica.join(file), past).unwrap();
    }
}

#[test]
fn prune_unchanged_skips_subtrees_with_equal_content() {
    let fx = Fixture::new();
    aged_replica(&fx);
    let mut config = fx.config();
    config.change_detection = ChangeKind::ModifiedTime;
    config.prune_unchanged = true;
    let (engine, _sink) = fx.engine(&config);

    let report = engine.run_once().unwrap();
    assert_eq!(report.files_updated, 1);
    assert_eq!(fx.replica_content("changed/y.txt").as_deref(), Some("new!"));
    let untouched = fs::metadata(fx.replica.join("same/x.txt")).unwrap();
    assert_eq!(
        filetime::FileTime::from_last_modification_time(&untouched).unix_seconds(),
        1_000_000_000
    );
}

#[test]
fn without_pruning_every_subtree_is_visited() {
    let fx = Fixture::new();
    aged_replica(&fx);
    let mut config = fx.config();
    config.change_detection = ChangeKind::ModifiedTime;
    config.prune_unchanged = false;
    let (engine, _sink) = fx.engine(&config);

    let report = engine.run_once().unwrap();
    assert_eq!(report.files_updated, 2);
    fx.assert_mirrored();
}
