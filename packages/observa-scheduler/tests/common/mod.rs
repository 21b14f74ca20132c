#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Initialize tracing for tests, writing to the captured test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Records the order actions ran in and whether any two of them overlapped.
#[derive(Clone, Default)]
pub struct Probe {
    log: Arc<Mutex<Vec<usize>>>,
    running: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an action as running, record `id`, then mark it finished.
    pub fn record(&self, id: usize) {
        if self.running.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        std::thread::yield_now();
        self.log.lock().unwrap().push(id);
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn log(&self) -> Vec<usize> {
        self.log.lock().unwrap().clone()
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}
