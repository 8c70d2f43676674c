//! Cooperative shutdown: started work finishes, nothing new starts.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use subseek::cache::CacheStore;

use super::support::{Gate, Library, RecordingReporter, ScriptedLookup};

#[test]
fn test_shutdown_lets_in_flight_lookups_finish() {
    let lib = Library::new();
    for i in 0..10 {
        lib.media(&format!("film{}.mkv", i), 4096, i as u8);
    }

    let gate = Gate::new();
    let lookup = Arc::new(ScriptedLookup::new().with_gate(Arc::clone(&gate)));
    let reporter = Arc::new(RecordingReporter::default());
    let cache = Arc::new(CacheStore::new());
    let dispatcher = Arc::new(lib.dispatcher(cache.clone(), lookup.clone(), reporter.clone(), 3));
    let completion = dispatcher.completion();

    let runner = {
        let dispatcher = Arc::clone(&dispatcher);
        let root = lib.root.clone();
        thread::spawn(move || dispatcher.run_root(&root))
    };

    gate.wait_for_arrivals(3);
    dispatcher.context().request_shutdown();
    gate.open();

    assert!(completion.wait_timeout(Duration::from_secs(10)));
    let summary = runner.join().unwrap();

    assert_eq!(gate.arrivals(), 3);
    assert_eq!(lookup.calls().len(), 3);
    assert_eq!(summary.stats.not_found, 3);
    assert_eq!(summary.stats.skipped, 7);
    assert!(summary.stats.interrupted);
    assert_eq!(reporter.events().len(), 3);

    // Every finished lookup made it into the cache before completion.
    assert_eq!(cache.count(), 3);
    let cache_file = lib.dir.path().join("cache.json");
    cache.save(&cache_file).unwrap();
    assert_eq!(CacheStore::try_load(&cache_file).unwrap().count(), 3);
}

#[test]
fn test_completion_set_once_per_run() {
    let lib = Library::new();
    lib.media("one.mkv", 1024, 1);

    let dispatcher = lib.dispatcher(
        Arc::new(CacheStore::new()),
        Arc::new(ScriptedLookup::new()),
        Arc::new(RecordingReporter::default()),
        2,
    );
    let completion = dispatcher.completion();
    assert!(!completion.is_complete());

    dispatcher.run_root(&lib.root);
    assert!(completion.is_complete());
    assert_eq!(completion.completions(), 1);

    dispatcher.run_root(&lib.root);
    assert_eq!(completion.completions(), 2);
}
