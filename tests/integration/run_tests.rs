//! Whole-run behavior across both roots.

use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use subseek::cache::CacheStore;
use subseek::config::Config;
use subseek::error::ExitCode;
use subseek::{exit_code, process_roots};
use tempfile::TempDir;

use super::support::{Event, Gate, RecordingReporter, Reply, ScriptedLookup};

fn config_in(dir: &TempDir) -> Config {
    let shows = dir.path().join("shows");
    let movies = dir.path().join("movies");
    fs::create_dir(&shows).unwrap();
    fs::create_dir(&movies).unwrap();
    Config {
        shows_root: Some(shows),
        movies_root: Some(movies),
        cache_file: dir.path().join("state/cache.json"),
        log_file: dir.path().join("state/downloads.log"),
        workers: Some(2),
        io_retry_delay_secs: 0,
        ..Config::default()
    }
}

fn write_media(path: &Path, seed: u8) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let content: Vec<u8> = (0..8192u32).map(|i| (i as u8) ^ seed).collect();
    fs::write(path, content).unwrap();
}

#[test]
fn test_full_run_over_both_roots() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let episode = config.shows_root.clone().unwrap().join("Show/S01E01.mkv");
    let movie = config.movies_root.clone().unwrap().join("Movie (2001)/movie.mp4");
    write_media(&episode, 1);
    write_media(&movie, 2);

    let lookup = Arc::new(ScriptedLookup::new());
    lookup.reply_for(&movie, Reply::Found(b"subtitle".to_vec()));
    let reporter = Arc::new(RecordingReporter::default());

    let summary = process_roots(
        &config,
        lookup.clone(),
        reporter.clone(),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    assert_eq!(summary.roots.len(), 2);
    assert_eq!(summary.downloads, 1);
    assert_eq!(summary.cached_entries, 1);
    assert_eq!(exit_code(&summary), ExitCode::Success);
    assert_eq!(fs::read(movie.with_extension("srt")).unwrap(), b"subtitle");

    let saved = CacheStore::try_load(&config.cache_file).unwrap();
    assert!(saved.contains(&episode));
    assert_eq!(reporter.events().last(), Some(&Event::Summary));

    // Nothing is asked twice.
    let calls_before = lookup.calls().len();
    let again = process_roots(
        &config,
        lookup.clone(),
        Arc::new(RecordingReporter::default()),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();
    assert_eq!(lookup.calls().len(), calls_before);
    assert_eq!(again.downloads, 0);
    assert_eq!(again.cached_entries, 1);
}

#[test]
fn test_unscannable_root_does_not_stop_the_other() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let movie = config.movies_root.clone().unwrap().join("movie.avi");
    write_media(&movie, 3);
    fs::remove_dir(config.shows_root.as_ref().unwrap()).unwrap();

    let reporter = Arc::new(RecordingReporter::default());
    let summary = process_roots(
        &config,
        Arc::new(ScriptedLookup::new()),
        reporter.clone(),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    assert!(summary.roots[0].scan_failed);
    assert_eq!(summary.roots[1].stats.not_found, 1);
    assert_eq!(exit_code(&summary), ExitCode::PartialSuccess);
    assert!(CacheStore::try_load(&config.cache_file)
        .unwrap()
        .contains(&movie));
}

#[test]
fn test_shutdown_before_start_still_saves() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    write_media(&config.shows_root.clone().unwrap().join("a.mkv"), 4);

    let lookup = Arc::new(ScriptedLookup::new());
    let reporter = Arc::new(RecordingReporter::default());
    let summary = process_roots(
        &config,
        lookup.clone(),
        reporter.clone(),
        Arc::new(AtomicBool::new(true)),
    )
    .unwrap();

    assert!(summary.roots.is_empty());
    assert!(summary.interrupted);
    assert!(lookup.calls().is_empty());
    assert!(config.cache_file.exists());
    assert_eq!(exit_code(&summary), ExitCode::Interrupted);
    assert_eq!(reporter.events(), vec![Event::Summary]);
}

#[test]
fn test_corrupt_cache_starts_empty_and_is_replaced() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let clip = config.movies_root.clone().unwrap().join("clip.mkv");
    write_media(&clip, 5);
    fs::create_dir_all(config.cache_file.parent().unwrap()).unwrap();
    fs::write(&config.cache_file, "{ not json").unwrap();

    let summary = process_roots(
        &config,
        Arc::new(ScriptedLookup::new()),
        Arc::new(RecordingReporter::default()),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    assert_eq!(summary.cached_entries, 1);
    let saved = CacheStore::try_load(&config.cache_file).unwrap();
    assert_eq!(saved.count(), 1);
    assert!(saved.contains(&clip));
}

#[test]
fn test_shutdown_mid_run_saves_finished_work_once() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let shows = config.shows_root.clone().unwrap();
    for i in 0..6 {
        write_media(&shows.join(format!("ep{}.mkv", i)), 10 + i);
    }
    write_media(&config.movies_root.clone().unwrap().join("movie.mkv"), 99);

    let gate = Gate::new();
    let lookup = Arc::new(ScriptedLookup::new().with_gate(Arc::clone(&gate)));
    let reporter = Arc::new(RecordingReporter::default());
    let flag = Arc::new(AtomicBool::new(false));

    let runner = {
        let config = config.clone();
        let lookup = Arc::clone(&lookup);
        let reporter = Arc::clone(&reporter);
        let flag = Arc::clone(&flag);
        thread::spawn(move || process_roots(&config, lookup, reporter, flag))
    };

    gate.wait_for_arrivals(2);
    flag.store(true, Ordering::SeqCst);
    gate.open();
    let summary = runner.join().unwrap().unwrap();

    // The movies root never starts once the flag is up.
    assert_eq!(summary.roots.len(), 1);
    assert_eq!(summary.roots[0].stats.not_found, 2);
    assert_eq!(summary.roots[0].stats.skipped, 4);
    assert!(summary.interrupted);
    assert_eq!(exit_code(&summary), ExitCode::Interrupted);

    let mut looked_up: Vec<String> = lookup
        .calls()
        .iter()
        .map(|fp| fp.as_str().to_string())
        .collect();
    let saved = CacheStore::try_load(&config.cache_file).unwrap();
    let mut cached: Vec<String> = saved
        .entries()
        .iter()
        .map(|e| e.hash.as_str().to_string())
        .collect();
    looked_up.sort();
    cached.sort();
    assert_eq!(cached, looked_up);
    assert_eq!(summary.cached_entries, 2);

    let summaries = reporter
        .events()
        .iter()
        .filter(|e| **e == Event::Summary)
        .count();
    assert_eq!(summaries, 1);
    assert!(!config.cache_file.with_extension("json.tmp").exists());
}
