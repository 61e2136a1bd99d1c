use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace, warn};

use super::stats::AggregateStats;
use super::Configuration;
use crate::protocol::{ClientError, Connection, Connector};

/// How a worker stopped issuing requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// All requests were sent and the connection was closed.
    Closed,
    /// The connection failed.
    Errored(String),
    /// The connection or a request timed out.
    TimedOut,
}

impl Termination {
    fn from_error(err: &ClientError) -> Self {
        match err {
            ClientError::Timeout => Self::TimedOut,
            other => Self::Errored(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Running,
    Terminated(Termination),
}

/// Sent to the pool exactly once per worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEvent {
    pub worker_id: usize,
    pub termination: Termination,
    /// Requests that got a reply, successful or not.
    pub completed: u64,
}

/// Emits the worker's terminal event. If the worker never reports (panic or
/// task cancellation), dropping the guard reports it as errored.
struct TerminalGuard {
    worker_id: usize,
    events: Option<UnboundedSender<WorkerEvent>>,
}

impl TerminalGuard {
    fn new(worker_id: usize, events: UnboundedSender<WorkerEvent>) -> Self {
        Self {
            worker_id,
            events: Some(events),
        }
    }

    fn fire(&mut self, termination: Termination, completed: u64) {
        if let Some(events) = self.events.take() {
            let _ = events.send(WorkerEvent {
                worker_id: self.worker_id,
                termination,
                completed,
            });
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.events.is_some() {
            warn!(worker_id = self.worker_id, "Worker ended without reporting");
            self.fire(Termination::Errored("worker aborted".to_string()), 0);
        }
    }
}

/// One simulated client: a connection driven through a fixed number of
/// strictly sequential requests.
pub struct Worker<C: Connector> {
    id: usize,
    connector: Arc<C>,
    config: Arc<Configuration>,
    stats: Arc<AggregateStats>,
    state: WorkerState,
    completed: u64,
    guard: TerminalGuard,
}

impl<C: Connector> Worker<C> {
    pub fn new(
        id: usize,
        connector: Arc<C>,
        config: Arc<Configuration>,
        stats: Arc<AggregateStats>,
        events: UnboundedSender<WorkerEvent>,
    ) -> Self {
        Self {
            id,
            connector,
            config,
            stats,
            state: WorkerState::Connecting,
            completed: 0,
            guard: TerminalGuard::new(id, events),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    /// Connect, run the request loop and report the terminal event.
    pub async fn run(mut self) {
        let termination = self.drive().await;
        self.transition(WorkerState::Terminated(termination.clone()));
        self.guard.fire(termination, self.completed);
    }

    fn transition(&mut self, next: WorkerState) {
        trace!(worker_id = self.id, from = ?self.state, to = ?next, "State change");
        self.state = next;
    }

    async fn drive(&mut self) -> Termination {
        let mut conn = match self.connector.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                debug!(worker_id = self.id, error = %e, "Connect failed");
                return Termination::from_error(&e);
            }
        };
        self.transition(WorkerState::Running);

        let config = Arc::clone(&self.config);

        if let Some(setup) = &config.setup {
            match conn.query(setup.opcode, &setup.args).await {
                Ok(_) => {}
                Err(e) if e.is_connection_error() => {
                    debug!(worker_id = self.id, error = %e, "Setup write failed");
                    return Termination::from_error(&e);
                }
                Err(e) => {
                    debug!(worker_id = self.id, error = %e, "Setup write rejected");
                }
            }
        }

        let (opcode, args) = config.operation.request();
        while self.completed < config.requests {
            match conn.query(opcode, args).await {
                Ok(_) => self.stats.record_done(),
                Err(e) if e.is_connection_error() => {
                    debug!(
                        worker_id = self.id,
                        completed = self.completed,
                        error = %e,
                        "Connection lost"
                    );
                    return Termination::from_error(&e);
                }
                Err(_) => self.stats.record_data_error(),
            }
            self.completed += 1;
        }

        if let Err(e) = conn.close().await {
            debug!(worker_id = self.id, error = %e, "Close failed");
        }
        Termination::Closed
    }
}
