//! Panic hook integration
//!
//! The panic hook is process-global, so this binary holds a single test.

use bootlog::prelude::*;
use std::fs;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_panic_logged_once_then_previous_hook_runs() {
    let temp = TempDir::new().expect("Failed to create temp dir");

    let previous_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&previous_calls);
    std::panic::set_hook(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let controller = BootstrapController::builder()
        .temp_dir(temp.path())
        .stderr_writer(Box::new(io::sink()))
        .build()
        .expect("Failed to build controller");
    assert!(bootlog::core::panic_hook_installed());
    assert!(!bootlog::install_panic_hook(&controller));

    controller
        .configure(&LoggingConfig::new(temp.path()).with_format(
            "%(levelname)s %(message)s",
            FormatStyle::Percent,
        ))
        .unwrap();

    let result = std::panic::catch_unwind(|| {
        panic!("disk on fire: {}", 42);
    });
    assert!(result.is_err());

    let content = fs::read_to_string(temp.path().join("bootlog.log")).unwrap();
    let records: Vec<_> = content
        .lines()
        .filter(|l| l.starts_with("ERROR Uncaught exception"))
        .collect();
    assert_eq!(records.len(), 1);
    assert!(content.contains("panicked at tests/panic_hook.rs:"));
    assert!(content.contains("disk on fire: 42"));
    assert_eq!(previous_calls.load(Ordering::SeqCst), 1);

    // once the controller is gone the hook only forwards
    drop(controller);
    let _ = std::panic::catch_unwind(|| panic!("after shutdown"));
    assert_eq!(previous_calls.load(Ordering::SeqCst), 2);
}
