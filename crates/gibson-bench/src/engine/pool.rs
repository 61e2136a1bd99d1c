use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::report::{Report, RunState};
use super::stats::AggregateStats;
use super::worker::{Termination, Worker};
use super::Configuration;
use crate::protocol::Connector;

/// Owns the fixed set of workers and the completion loop.
pub struct WorkerPool<C: Connector> {
    config: Arc<Configuration>,
    connector: Arc<C>,
    stats: Arc<AggregateStats>,
}

impl<C: Connector> WorkerPool<C> {
    pub fn new(config: Arc<Configuration>, connector: Arc<C>, stats: Arc<AggregateStats>) -> Self {
        Self {
            config,
            connector,
            stats,
        }
    }

    /// Start every worker and wait until the last one terminates.
    pub async fn run(self) -> Report {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let workers: Vec<Worker<C>> = (0..self.config.clients)
            .map(|id| {
                Worker::new(
                    id,
                    Arc::clone(&self.connector),
                    Arc::clone(&self.config),
                    Arc::clone(&self.stats),
                    events_tx.clone(),
                )
            })
            .collect();
        drop(events_tx);

        info!(
            clients = self.config.clients,
            requests = self.config.requests,
            operation = %self.config.operation,
            endpoint = %self.config.endpoint,
            "Starting benchmark"
        );

        let mut run = RunState::start(workers.len(), self.config.total(), Arc::clone(&self.stats));
        if workers.is_empty() {
            return run.into_report();
        }

        let mut tasks = JoinSet::new();
        for worker in workers {
            tasks.spawn(worker.run());
        }

        while let Some(event) = events_rx.recv().await {
            match &event.termination {
                Termination::Closed => debug!(
                    worker_id = event.worker_id,
                    completed = event.completed,
                    "Worker closed"
                ),
                Termination::Errored(reason) => warn!(
                    worker_id = event.worker_id,
                    completed = event.completed,
                    reason = %reason,
                    "Worker connection error"
                ),
                Termination::TimedOut => warn!(
                    worker_id = event.worker_id,
                    completed = event.completed,
                    "Worker timed out"
                ),
            }

            if run.on_terminal(&event.termination) {
                break;
            }
        }

        if run.active() > 0 {
            warn!(active = run.active(), "Event channel closed early");
        }

        let report = run.into_report();
        while tasks.join_next().await.is_some() {}
        report
    }
}
