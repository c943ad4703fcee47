//! Moves in the source become renames in the replica, not delete plus copy

use super::support::Fixture;
use std::fs;
use treemirror::strategy::IdentityKind;
use treemirror::sync::SyncEvent;

#[test]
fn renamed_directory_is_moved_with_its_subtree() {
    let fx = Fixture::new();
    fx.write_source("photos/2023/a.jpg", "aaaa");
    fx.write_source("photos/2023/b.jpg", "bbbb");
    fx.write_source("photos/index.txt", "index");
    let (engine, sink) = fx.engine(&fx.config());
    engine.run_once().unwrap();
    sink.clear();

    fs::rename(fx.source.join("photos"), fx.source.join("pictures")).unwrap();
    let report = engine.run_once().unwrap();

    fx.assert_mirrored();
    assert_eq!(report.directories_renamed, 1);
    assert_eq!(report.mutations(), 1);
    assert_eq!(sink.count("file_created"), 0);
    assert_eq!(sink.count("file_deleted"), 0);
    match &sink.events()[0] {
        SyncEvent::DirectoryRenamed { from, to, .. } => {
            assert!(from.ends_with("photos"));
            assert!(to.ends_with("pictures"));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn file_moved_between_names_in_same_directory_is_renamed() {
    let fx = Fixture::new();
    fx.write_source("docs/draft.md", "# notes");
    let (engine, sink) = fx.engine(&fx.config());
    engine.run_once().unwrap();
    sink.clear();

    fs::rename(fx.source.join("docs/draft.md"), fx.source.join("docs/final.md")).unwrap();
    engine.run_once().unwrap();

    fx.assert_mirrored();
    assert_eq!(sink.count("file_renamed"), 1);
    assert_eq!(sink.events().len(), 1);
}

#[test]
fn duplicate_content_picks_first_candidate_in_identity_order() {
    let fx = Fixture::new();
    fx.write_source("new.txt", "same");
    fx.write_replica("b-old.txt", "same");
    fx.write_replica("a-old.txt", "same");

    let (engine, sink) = fx.engine(&fx.config());
    let report = engine.run_once().unwrap();

    fx.assert_mirrored();
    assert_eq!(report.files_renamed, 1);
    assert_eq!(report.files_deleted, 1);
    let renamed_from = sink
        .events()
        .into_iter()
        .find_map(|e| match e {
            SyncEvent::FileRenamed { from, .. } => Some(from),
            _ => None,
        })
        .unwrap();
    assert!(renamed_from.ends_with("a-old.txt"));
}

#[test]
fn content_identity_edit_overwrites_in_place() {
    let fx = Fixture::new();
    fx.write_source("notes.txt", "v1");
    fx.write_source("dir/inner.txt", "inner");
    let mut config = fx.config();
    config.identity = IdentityKind::Content;
    let (engine, sink) = fx.engine(&config);
    engine.run_once().unwrap();
    assert_eq!(engine.run_once().unwrap().mutations(), 0);
    sink.clear();

    fx.write_source("notes.txt", "v2");
    fx.write_source("dir/inner.txt", "changed");
    let report = engine.run_once().unwrap();

    fx.assert_mirrored();
    assert_eq!(report.files_updated, 2);
    assert_eq!(report.files_created, 0);
    assert_eq!(report.files_deleted, 0);
    assert_eq!(report.directories_created, 0);
    assert_eq!(report.directories_deleted, 0);
    assert!(report.is_clean());
}

#[test]
fn content_identity_rename_is_detected() {
    let fx = Fixture::new();
    fx.write_source("old-name.bin", "payload");
    let mut config = fx.config();
    config.identity = IdentityKind::Content;
    let (engine, sink) = fx.engine(&config);
    engine.run_once().unwrap();
    sink.clear();

    fs::rename(fx.source.join("old-name.bin"), fx.source.join("new-name.bin")).unwrap();
    engine.run_once().unwrap();

    fx.assert_mirrored();
    assert_eq!(sink.count("file_renamed"), 1);
    assert_eq!(sink.events().len(), 1);
}

#[test]
fn file_replaced_by_directory_converges_in_one_pass() {
    let fx = Fixture::new();
    fx.write_replica("thing", "was a file");
    fx.write_source("thing/inside.txt", "now a dir");

    let (engine, _sink) = fx.engine(&fx.config());
    let report = engine.run_once().unwrap();

    fx.assert_mirrored();
    assert!(report.is_clean());
}

#[test]
fn directory_replaced_by_file_converges_in_two_passes() {
    let fx = Fixture::new();
    fx.write_replica("thing/inside.txt", "was a dir");
    fx.write_source("thing", "now a file");

    let (engine, _sink) = fx.engine(&fx.config());
    let first = engine.run_once().unwrap();
    assert_eq!(first.directories_deleted, 1);
    engine.run_once().unwrap();

    fx.assert_mirrored();
    assert_eq!(engine.run_once().unwrap().mutations(), 0);
}
