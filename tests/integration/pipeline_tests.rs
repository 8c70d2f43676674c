//! End-to-end behavior of one dispatcher run over a library root.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use subseek::cache::CacheStore;
use subseek::scanner::{Hasher, Walker, WalkerConfig};

use super::support::{Event, Library, RecordingReporter, Reply, ScriptedLookup};

#[test]
fn test_found_writes_subtitle_and_logs() {
    let lib = Library::new();
    let movie = lib.media("movie.mkv", 300 * 1024, 1);
    let body = b"1\n00:00:01,000 --> 00:00:02,000\nHello\n".to_vec();

    let lookup = Arc::new(ScriptedLookup::new());
    lookup.reply_for(&movie, Reply::Found(body.clone()));
    let reporter = Arc::new(RecordingReporter::default());
    let cache = Arc::new(CacheStore::new());
    let dispatcher = lib.dispatcher(cache.clone(), lookup.clone(), reporter.clone(), 4);

    let summary = dispatcher.run_root(&lib.root);

    let subtitle = lib.root.join("movie.srt");
    assert_eq!(fs::read(&subtitle).unwrap(), body);
    assert_eq!(summary.stats.downloaded, 1);
    assert_eq!(dispatcher.context().downloads(), 1);
    assert!(cache.is_empty());

    let entries = lib.log_entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].ends_with("movie.srt"));
    assert_eq!(reporter.events(), vec![Event::Downloaded(movie)]);
}

#[test]
fn test_not_found_is_cached_with_fingerprint() {
    let lib = Library::new();
    let show = lib.media("Show/S01/show.avi", 100 * 1024, 2);
    let expected = Hasher::new().fingerprint(&show).unwrap();

    let lookup = Arc::new(ScriptedLookup::new());
    lookup.reply_for(&show, Reply::NotFound(404));
    let reporter = Arc::new(RecordingReporter::default());
    let cache = Arc::new(CacheStore::new());
    let dispatcher = lib.dispatcher(cache.clone(), lookup.clone(), reporter.clone(), 2);

    let summary = dispatcher.run_root(&lib.root);

    assert_eq!(summary.stats.not_found, 1);
    assert_eq!(cache.get(&show), Some(expected));
    assert!(!show.with_extension("srt").exists());
    assert_eq!(dispatcher.context().downloads(), 0);
    assert!(lib.log_entries().is_empty());
    assert_eq!(reporter.events(), vec![Event::NotFound(show, 404)]);
}

#[test]
fn test_other_statuses_are_cached_too() {
    let lib = Library::new();
    let clip = lib.media("odd.mp4", 1024, 3);

    let lookup = Arc::new(ScriptedLookup::new());
    lookup.reply_for(&clip, Reply::NotFound(400));
    let cache = Arc::new(CacheStore::new());
    let dispatcher = lib.dispatcher(
        cache.clone(),
        lookup,
        Arc::new(RecordingReporter::default()),
        1,
    );

    dispatcher.run_root(&lib.root);
    assert!(cache.contains(&clip));
}

#[test]
fn test_file_with_subtitle_is_never_looked_up() {
    let lib = Library::new();
    lib.media("clip.mkv", 4096, 4);
    fs::write(lib.root.join("clip.srt"), b"existing").unwrap();

    let lookup = Arc::new(ScriptedLookup::new());
    let reporter = Arc::new(RecordingReporter::default());
    let dispatcher = lib.dispatcher(
        Arc::new(CacheStore::new()),
        lookup.clone(),
        reporter.clone(),
        2,
    );

    let summary = dispatcher.run_root(&lib.root);

    assert_eq!(summary.stats.eligible, 0);
    assert!(lookup.calls().is_empty());
    assert!(reporter.events().is_empty());
    assert_eq!(fs::read(lib.root.join("clip.srt")).unwrap(), b"existing");
}

#[test]
fn test_cached_file_is_never_looked_up() {
    let lib = Library::new();
    let old = lib.media("old.mkv", 4096, 5);
    let fresh = lib.media("fresh.mkv", 4096, 6);

    let cache = Arc::new(CacheStore::new());
    cache.add(&old, Hasher::new().fingerprint(&old).unwrap());

    let lookup = Arc::new(ScriptedLookup::new());
    let dispatcher = lib.dispatcher(
        cache,
        lookup.clone(),
        Arc::new(RecordingReporter::default()),
        2,
    );

    dispatcher.run_root(&lib.root);

    assert_eq!(
        lookup.calls(),
        vec![Hasher::new().fingerprint(&fresh).unwrap()]
    );
}

#[test]
fn test_transport_error_is_not_cached() {
    let lib = Library::new();
    let movie = lib.media("flaky.mkv", 8192, 7);

    let lookup = Arc::new(ScriptedLookup::new());
    lookup.reply_for(&movie, Reply::Transport);
    let reporter = Arc::new(RecordingReporter::default());
    let cache = Arc::new(CacheStore::new());
    let dispatcher = lib.dispatcher(cache.clone(), lookup, reporter.clone(), 2);

    let summary = dispatcher.run_root(&lib.root);

    assert_eq!(summary.stats.failed, 1);
    assert!(summary.has_failures());
    assert!(cache.is_empty());
    assert!(!movie.with_extension("srt").exists());
    assert_eq!(reporter.events(), vec![Event::Error(movie.clone())]);

    // Still eligible next time.
    let eligible = Walker::new(&lib.root, WalkerConfig::default())
        .scan(&cache)
        .unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].path, movie);
}

#[test]
fn test_concurrency_never_exceeds_workers() {
    let lib = Library::new();
    for i in 0..24 {
        lib.media(&format!("ep{:02}.mkv", i), 2048, i as u8);
    }

    let lookup = Arc::new(ScriptedLookup::new().with_delay(Duration::from_millis(15)));
    let cache = Arc::new(CacheStore::new());
    let dispatcher = lib.dispatcher(
        cache.clone(),
        lookup.clone(),
        Arc::new(RecordingReporter::default()),
        3,
    );

    let summary = dispatcher.run_root(&lib.root);

    assert_eq!(summary.stats.not_found, 24);
    assert_eq!(lookup.calls().len(), 24);
    assert!(lookup.max_in_flight() >= 1);
    assert!(lookup.max_in_flight() <= 3);
    assert_eq!(cache.count(), 24);
}

#[test]
fn test_each_file_processed_once() {
    let lib = Library::new();
    for i in 0..10 {
        lib.media(&format!("dir{}/m{}.mp4", i % 3, i), 1024, 100 + i as u8);
    }

    let lookup = Arc::new(ScriptedLookup::new());
    let dispatcher = lib.dispatcher(
        Arc::new(CacheStore::new()),
        lookup.clone(),
        Arc::new(RecordingReporter::default()),
        4,
    );
    dispatcher.run_root(&lib.root);

    let mut calls = lookup.calls();
    let total = calls.len();
    calls.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    calls.dedup();
    assert_eq!(total, 10);
    assert_eq!(calls.len(), 10);
}

#[test]
fn test_second_run_skips_everything_handled() {
    let lib = Library::new();
    let found = lib.media("a.mkv", 2048, 8);
    lib.media("b.mkv", 2048, 9);

    let lookup = Arc::new(ScriptedLookup::new());
    lookup.reply_for(&found, Reply::Found(b"sub".to_vec()));
    let cache = Arc::new(CacheStore::new());

    let first = lib.dispatcher(
        cache.clone(),
        lookup.clone(),
        Arc::new(RecordingReporter::default()),
        2,
    );
    first.run_root(&lib.root);
    assert_eq!(lookup.calls().len(), 2);

    let second = lib.dispatcher(
        cache,
        lookup.clone(),
        Arc::new(RecordingReporter::default()),
        2,
    );
    let summary = second.run_root(&lib.root);

    assert_eq!(summary.stats.eligible, 0);
    assert_eq!(lookup.calls().len(), 2);
}

#[test]
fn test_unscannable_root_reports_and_continues() {
    let lib = Library::new();
    let missing = lib.dir.path().join("gone");
    let reporter = Arc::new(RecordingReporter::default());
    let dispatcher = lib.dispatcher(
        Arc::new(CacheStore::new()),
        Arc::new(ScriptedLookup::new()),
        reporter.clone(),
        2,
    );

    let summary = dispatcher.run_root(&missing);

    assert!(summary.scan_failed);
    assert_eq!(reporter.events(), vec![Event::Error(missing)]);
    assert!(dispatcher.completion().is_complete());
}
