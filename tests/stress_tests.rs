//! Stress tests for concurrent emission around the configure transition
//!
//! These tests verify:
//! - A record emitted while `configure` runs lands exactly once
//! - Concurrent configure calls: exactly one wins
//! - Thread safety under concurrent high-volume logging

use bootlog::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

fn controller(temp: &TempDir) -> Arc<BootstrapController> {
    BootstrapController::builder()
        .temp_dir(temp.path())
        .stderr_writer(Box::new(io::sink()))
        .buffer_capacity(THREADS * PER_THREAD)
        .install_panic_hook(false)
        .build()
        .expect("Failed to build controller")
}

fn message_counts(temp: &TempDir) -> HashMap<String, usize> {
    let content = fs::read_to_string(temp.path().join("bootlog.log")).expect("log file");
    let mut counts = HashMap::new();
    for line in content.lines().filter(|l| l.starts_with("id-")) {
        *counts.entry(line.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Emitters race `configure`; every record must be in the file exactly once
#[test]
fn test_records_racing_configure_land_once() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let controller = controller(&temp);
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let log = controller.get_logger(format!("worker-{}", t));
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    log.warning(format!("id-{}-{}", t, i));
                }
            })
        })
        .collect();

    barrier.wait();
    let config = LoggingConfig::new(temp.path())
        .with_level("WARNING")
        .with_format("%(message)s", FormatStyle::Percent);
    controller.configure(&config).expect("configure");

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let counts = message_counts(&temp);
    assert_eq!(counts.len(), THREADS * PER_THREAD);
    for t in 0..THREADS {
        for i in 0..PER_THREAD {
            assert_eq!(counts.get(&format!("id-{}-{}", t, i)), Some(&1), "id-{}-{}", t, i);
        }
    }
    assert_eq!(controller.metrics().buffer_dropped(), 0);
}

/// Per-thread emission order survives the transition
#[test]
fn test_per_thread_order_preserved() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let controller = controller(&temp);
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let log = controller.get_logger("worker");
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    log.error(format!("id-{}-{}", t, i));
                }
            })
        })
        .collect();

    barrier.wait();
    controller
        .configure(&LoggingConfig::new(temp.path()).with_format("%(message)s", FormatStyle::Percent))
        .expect("configure");
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let content = fs::read_to_string(temp.path().join("bootlog.log")).unwrap();
    let mut next = [0usize; THREADS];
    for line in content.lines().filter(|l| l.starts_with("id-")) {
        let mut parts = line.trim_start_matches("id-").split('-');
        let t: usize = parts.next().unwrap().parse().unwrap();
        let i: usize = parts.next().unwrap().parse().unwrap();
        assert_eq!(i, next[t], "thread {} out of order", t);
        next[t] += 1;
    }
    assert!(next.iter().all(|n| *n == PER_THREAD));
}

/// Only one of many concurrent configure calls succeeds
#[test]
fn test_concurrent_configure_single_winner() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let controller = controller(&temp);
    let barrier = Arc::new(Barrier::new(THREADS));
    let wins = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let controller = Arc::clone(&controller);
            let barrier = Arc::clone(&barrier);
            let wins = Arc::clone(&wins);
            let rejected = Arc::clone(&rejected);
            let dir = temp.path().to_path_buf();
            thread::spawn(move || {
                barrier.wait();
                match controller.configure(&LoggingConfig::new(dir)) {
                    Ok(()) => wins.fetch_add(1, Ordering::SeqCst),
                    Err(e) if e.is_already_configured() => rejected.fetch_add(1, Ordering::SeqCst),
                    Err(e) => panic!("unexpected error: {}", e),
                };
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(rejected.load(Ordering::SeqCst), THREADS - 1);
    assert_eq!(controller.sink_names(), ["stderr", "file"]);
}

/// High-volume logging after configuration from many threads
#[test]
fn test_concurrent_logging_after_configure() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let controller = controller(&temp);
    controller
        .configure(
            &LoggingConfig::new(temp.path())
                .with_level("INFO")
                .with_format("%(message)s", FormatStyle::Percent),
        )
        .unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let log = controller.get_logger("worker");
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    log.info(format!("id-{}-{}", t, i));
                    log.debug1(format!("hidden-{}-{}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let counts = message_counts(&temp);
    assert_eq!(counts.len(), THREADS * PER_THREAD);
    assert!(counts.values().all(|c| *c == 1));
    assert_eq!(controller.metrics().sink_failures(), 0);
}
