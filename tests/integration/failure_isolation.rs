//! A failing entity is skipped for the pass; everything else still converges

use super::support::{FaultyFileSystem, Fixture};
use std::sync::Arc;
use treemirror::strategy::IdentityKind;
use treemirror::sync::{MemorySink, Operation, SyncEvent};

fn failures(sink: &MemorySink) -> Vec<(Operation, std::path::PathBuf)> {
    sink.events()
        .into_iter()
        .filter_map(|e| match e {
            SyncEvent::Failure { operation, path, .. } => Some((operation, path)),
            _ => None,
        })
        .collect()
}

#[test]
fn failed_copy_does_not_stop_siblings() {
    let fx = Fixture::new();
    fx.write_source("bad.txt", "cannot copy me");
    fx.write_source("good.txt", "fine");
    fx.write_source("sub/also-good.txt", "fine too");

    let faulty = Arc::new(FaultyFileSystem::new());
    faulty.fail_on("bad.txt");
    let (engine, sink) = fx.engine_with(&fx.config(), faulty.clone());

    let report = engine.run_once().unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(report.files_created, 2);
    assert!(fx.replica_content("bad.txt").is_none());
    assert_eq!(fx.replica_content("good.txt").as_deref(), Some("fine"));
    assert_eq!(fx.replica_content("sub/also-good.txt").as_deref(), Some("fine too"));

    let failure = sink
        .events()
        .into_iter()
        .find(|e| matches!(e, SyncEvent::Failure { .. }))
        .unwrap();
    match failure {
        SyncEvent::Failure {
            operation,
            path,
            message,
            ..
        } => {
            assert_eq!(operation, Operation::CopyFile);
            assert!(path.ends_with("bad.txt"));
            assert!(message.contains("injected failure"));
        }
        _ => unreachable!(),
    }

    faulty.heal();
    let report = engine.run_once().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.files_created, 1);
    fx.assert_mirrored();
}

#[test]
fn unreadable_subdirectory_is_skipped_for_the_pass() {
    let fx = Fixture::new();
    fx.write_source("locked/secret.txt", "s");
    fx.write_source("open/visible.txt", "v");

    let faulty = Arc::new(FaultyFileSystem::new());
    faulty.fail_on("locked");
    let (engine, _sink) = fx.engine_with(&fx.config(), faulty.clone());

    let report = engine.run_once().unwrap();
    assert!(report.failures >= 1);
    assert_eq!(fx.replica_content("open/visible.txt").as_deref(), Some("v"));

    faulty.heal();
    engine.run_once().unwrap();
    fx.assert_mirrored();
}

#[test]
fn failed_delete_keeps_directory_for_next_pass() {
    let fx = Fixture::new();
    fx.write_replica("gone/pinned.txt", "p");
    fx.write_replica("gone/loose.txt", "l");

    let faulty = Arc::new(FaultyFileSystem::new());
    faulty.fail_on("pinned.txt");
    let (engine, _sink) = fx.engine_with(&fx.config(), faulty.clone());

    let report = engine.run_once().unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(report.files_deleted, 1);
    assert_eq!(report.directories_deleted, 0);
    assert!(fx.replica.join("gone/pinned.txt").exists());

    faulty.heal();
    let report = engine.run_once().unwrap();
    assert_eq!(report.directories_deleted, 1);
    fx.assert_mirrored();
}

#[test]
fn unreadable_file_under_content_identity_does_not_stop_siblings() {
    let fx = Fixture::new();
    fx.write_source("bad.txt", "cannot hash me");
    fx.write_source("good.txt", "fine");
    let mut config = fx.config();
    config.identity = IdentityKind::Content;

    let faulty = Arc::new(FaultyFileSystem::new());
    faulty.fail_read_on("bad.txt");
    let (engine, sink) = fx.engine_with(&config, faulty.clone());

    let report = engine.run_once().unwrap();
    assert!(report.failures >= 1);
    assert_eq!(report.files_created, 1);
    assert_eq!(fx.replica_content("good.txt").as_deref(), Some("fine"));
    assert!(fx.replica_content("bad.txt").is_none());
    assert!(failures(&sink)
        .iter()
        .any(|(operation, path)| *operation == Operation::Scan && path.ends_with("bad.txt")));

    faulty.heal();
    let report = engine.run_once().unwrap();
    assert!(report.is_clean());
    fx.assert_mirrored();
}

#[test]
fn unreadable_rename_candidate_falls_back_to_copy() {
    let fx = Fixture::new();
    fx.write_source("new.txt", "abcd");
    fx.write_replica("old.txt", "wxyz");

    let faulty = Arc::new(FaultyFileSystem::new());
    faulty.fail_read_on("old.txt");
    let (engine, sink) = fx.engine_with(&fx.config(), faulty);

    let report = engine.run_once().unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(report.files_created, 1);
    assert_eq!(report.files_renamed, 0);
    assert_eq!(report.files_deleted, 1);
    assert_eq!(fx.replica_content("new.txt").as_deref(), Some("abcd"));
    assert!(fx.replica_content("old.txt").is_none());

    let recorded = failures(&sink);
    assert_eq!(recorded[0].0, Operation::Fingerprint);
    assert!(recorded[0].1.ends_with("old.txt"));
}

#[test]
fn unreadable_directory_candidate_falls_back_to_create() {
    let fx = Fixture::new();
    fx.write_source("fresh/a.txt", "abcd");
    fx.write_replica("stale/b.txt", "wxyz");

    let faulty = Arc::new(FaultyFileSystem::new());
    faulty.fail_read_on("b.txt");
    let (engine, _sink) = fx.engine_with(&fx.config(), faulty);

    let report = engine.run_once().unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(report.directories_renamed, 0);
    assert_eq!(report.directories_created, 1);
    assert_eq!(report.directories_deleted, 1);
    assert_eq!(fx.replica_content("fresh/a.txt").as_deref(), Some("abcd"));
    fx.assert_mirrored();
}

#[test]
fn entry_that_cannot_be_listed_leaves_its_replica_counterpart_alone() {
    let fx = Fixture::new();
    fx.write_source("flaky.txt", "new");
    fx.write_source("ok.txt", "ok");
    fx.write_replica("flaky.txt", "old");

    let faulty = Arc::new(FaultyFileSystem::new());
    faulty.fail_stat_on(&fx.source.join("flaky.txt"));
    let (engine, sink) = fx.engine_with(&fx.config(), faulty.clone());

    let report = engine.run_once().unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(report.files_created, 1);
    assert_eq!(report.files_deleted, 0);
    assert_eq!(fx.replica_content("ok.txt").as_deref(), Some("ok"));
    assert_eq!(fx.replica_content("flaky.txt").as_deref(), Some("old"));
    let recorded = failures(&sink);
    assert_eq!(recorded[0].0, Operation::Scan);
    assert!(recorded[0].1.ends_with("flaky.txt"));

    faulty.heal();
    let report = engine.run_once().unwrap();
    assert_eq!(report.files_updated, 1);
    fx.assert_mirrored();
}
