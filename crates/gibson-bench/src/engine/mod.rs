//! Benchmark orchestration: resolve commands, run the prelude, drive the
//! worker pool and produce the final report.

pub mod command;
pub mod pool;
pub mod prelude;
pub mod report;
pub mod stats;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use gibson_common::BenchConfig;

use crate::error::BenchError;
use crate::protocol::{Connector, Endpoint};

pub use command::{resolve, resolve_list, Command};
pub use pool::WorkerPool;
pub use report::{CompletionDetector, Report, RunState};
pub use stats::{AggregateStats, StatsSnapshot};
pub use worker::{Termination, Worker, WorkerEvent, WorkerState};

/// Everything a run needs, resolved and validated once at startup.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub endpoint: Endpoint,
    pub clients: usize,
    pub requests: u64,
    /// `None` when timeouts are disabled.
    pub timeout: Option<Duration>,
    pub operation: Command,
    pub prelude: Vec<Command>,
    /// Per-worker write issued before the request loop; not counted.
    pub setup: Option<Command>,
}

impl Configuration {
    pub fn from_config(config: &BenchConfig) -> Result<Self, BenchError> {
        config.validate().map_err(BenchError::InvalidConfig)?;

        let operation = command::resolve(&config.operator)?;
        let prelude = command::resolve_list(config.prelude())?;
        let setup = match (&config.key, &config.value) {
            (Some(key), Some(value)) => Some(command::setup_command(key, value)?),
            _ => None,
        };
        let endpoint: Endpoint = config.dns.parse().map_err(BenchError::InvalidConfig)?;

        Ok(Self {
            endpoint,
            clients: config.clients,
            requests: config.requests,
            timeout: (config.timeout_ms > 0).then(|| Duration::from_millis(config.timeout_ms)),
            operation,
            prelude,
            setup,
        })
    }

    /// Number of measured requests: clients times requests per client.
    pub fn total(&self) -> u64 {
        (self.clients as u64).saturating_mul(self.requests)
    }
}

/// A configured run against one connector.
pub struct Benchmark<C: Connector> {
    config: Arc<Configuration>,
    connector: Arc<C>,
    stats: Arc<AggregateStats>,
}

impl<C: Connector> Benchmark<C> {
    pub fn new(config: Configuration, connector: C) -> Self {
        Self {
            config: Arc::new(config),
            connector: Arc::new(connector),
            stats: Arc::new(AggregateStats::new()),
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Live counters, e.g. for the metrics endpoint.
    pub fn stats(&self) -> Arc<AggregateStats> {
        Arc::clone(&self.stats)
    }

    pub fn has_prelude(&self) -> bool {
        !self.config.prelude.is_empty()
    }

    pub async fn prelude(&self) -> Result<(), BenchError> {
        prelude::run_prelude(self.connector.as_ref(), &self.config.prelude).await
    }

    /// Run the measured phase. Always yields a report.
    pub async fn run(self) -> Report {
        WorkerPool::new(self.config, self.connector, self.stats)
            .run()
            .await
    }

    /// Prelude followed by the measured phase.
    pub async fn execute(self) -> Result<Report, BenchError> {
        self.prelude().await?;
        Ok(self.run().await)
    }
}
