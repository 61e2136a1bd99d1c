use std::sync::atomic::{AtomicU64, Ordering};

/// Run-wide counters shared by every worker.
///
/// Workers record `done` and `data_errors` as replies arrive; the pool's
/// completion loop is the only writer of `io_errors` and `timeouts`.
#[derive(Debug, Default)]
pub struct AggregateStats {
    done: AtomicU64,
    data_errors: AtomicU64,
    io_errors: AtomicU64,
    timeouts: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub done: u64,
    pub data_errors: u64,
    pub io_errors: u64,
    pub timeouts: u64,
}

impl AggregateStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_done(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_data_error(&self) {
        self.data_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_io_error(&self) {
        self.io_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            done: self.done.load(Ordering::SeqCst),
            data_errors: self.data_errors.load(Ordering::SeqCst),
            io_errors: self.io_errors.load(Ordering::SeqCst),
            timeouts: self.timeouts.load(Ordering::SeqCst),
        }
    }
}
