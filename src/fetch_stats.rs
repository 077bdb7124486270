use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct FetchStats {
    fetches: AtomicU64,
    upstream_failures: AtomicU64,
    samples_evicted: AtomicU64,
}

impl Default for FetchStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchStats {
    pub const fn new() -> Self {
        Self {
            fetches: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            samples_evicted: AtomicU64::new(0),
        }
    }

    pub fn inc_fetches(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_upstream_failures(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_samples_evicted(&self, n: u64) {
        self.samples_evicted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self, window_len: usize) -> FetchSnapshot {
        FetchSnapshot {
            fetches: self.fetches.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            samples_evicted: self.samples_evicted.load(Ordering::Relaxed),
            window_len,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FetchSnapshot {
    pub fetches: u64,
    pub upstream_failures: u64,
    pub samples_evicted: u64,
    pub window_len: usize,
}
