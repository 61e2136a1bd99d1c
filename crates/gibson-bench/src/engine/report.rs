use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::stats::AggregateStats;
use super::worker::Termination;

/// Tracks how many workers are still active and fires once when none are.
#[derive(Debug)]
pub struct CompletionDetector {
    active: usize,
    fired: bool,
}

impl CompletionDetector {
    pub fn new(active: usize) -> Self {
        Self {
            active,
            fired: false,
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    /// Account for one terminal event. Returns `true` only for the event that
    /// brings the active count to zero; never again afterwards.
    pub fn terminal(&mut self) -> bool {
        self.active = self.active.saturating_sub(1);
        self.check()
    }

    fn check(&mut self) -> bool {
        if self.active == 0 && !self.fired {
            self.fired = true;
            return true;
        }
        false
    }
}

/// Mutable state of one measured run: clock, active count and counters.
#[derive(Debug)]
pub struct RunState {
    stats: Arc<AggregateStats>,
    detector: CompletionDetector,
    started: Instant,
    total: u64,
}

impl RunState {
    /// Start the clock with `workers` active.
    pub fn start(workers: usize, total: u64, stats: Arc<AggregateStats>) -> Self {
        Self {
            stats,
            detector: CompletionDetector::new(workers),
            started: Instant::now(),
            total,
        }
    }

    pub fn active(&self) -> usize {
        self.detector.active()
    }

    /// Record a worker's terminal event. Returns `true` once every worker has
    /// terminated.
    pub fn on_terminal(&mut self, termination: &Termination) -> bool {
        match termination {
            Termination::Closed => {}
            Termination::Errored(_) => self.stats.record_io_error(),
            Termination::TimedOut => self.stats.record_timeout(),
        }
        let complete = self.detector.terminal();
        debug!(active = self.detector.active(), complete, "Worker terminated");
        complete
    }

    pub fn into_report(self) -> Report {
        let elapsed = self.started.elapsed();
        let snapshot = self.stats.snapshot();
        Report {
            elapsed,
            done: snapshot.done,
            total: self.total,
            timeouts: snapshot.timeouts,
            io_errors: snapshot.io_errors,
            data_errors: snapshot.data_errors,
        }
    }
}

/// Final statistics of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub elapsed: Duration,
    pub done: u64,
    pub total: u64,
    pub timeouts: u64,
    pub io_errors: u64,
    pub data_errors: u64,
}

impl Report {
    /// Successful requests per second; zero when no measurable time elapsed.
    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.done as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed_ms = self.elapsed.as_secs_f64() * 1000.0;
        writeln!(f, "Elapsed         : {:.0} ms", elapsed_ms)?;
        writeln!(f, "Executed        : {} / {} ops", self.done, self.total)?;
        writeln!(f, "Timeouts        : {}", self.timeouts)?;
        writeln!(f, "I/O Errors      : {}", self.io_errors)?;
        writeln!(f, "Data Errors     : {}", self.data_errors)?;
        write!(
            f,
            "Requests/Second : {:.2}",
            self.requests_per_second()
        )
    }
}
