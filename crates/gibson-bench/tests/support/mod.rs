#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use gibson_bench::engine::Configuration;
use gibson_bench::protocol::gibson::Encoding;
use gibson_bench::protocol::{ClientError, Connection, Connector, Opcode, Reply, ReplyCode};
use gibson_common::BenchConfig;
use tokio::net::TcpListener;

// ============================================================================
// Scripted connector
// ============================================================================

/// Behaviour of one mock connection, assigned in connect order.
#[derive(Debug, Clone)]
pub enum Script {
    Succeed,
    /// Every request gets an error reply.
    RejectAll,
    /// Every n-th request (1-based) gets an error reply.
    RejectEvery(u64),
    /// Request number n (0-based) and later fail with a reset.
    FailAt(u64),
    /// Request number n (0-based) and later time out.
    TimeoutAt(u64),
    /// Request number n (0-based) panics.
    PanicAt(u64),
    RefuseConnect,
    TimeoutConnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub conn: usize,
    pub seq: u64,
    pub opcode: Opcode,
    pub args: String,
}

pub struct MockConnector {
    scripts: Vec<Script>,
    default: Script,
    connects: AtomicUsize,
    closes: Arc<AtomicUsize>,
    log: Arc<Mutex<Vec<Sent>>>,
    delay: Option<Duration>,
}

impl MockConnector {
    pub fn new(default: Script) -> Self {
        Self {
            scripts: Vec::new(),
            default,
            connects: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            log: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Scripts for the first connections, in connect order.
    pub fn with_scripts(mut self, scripts: Vec<Script>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn log(&self) -> Arc<Mutex<Vec<Sent>>> {
        Arc::clone(&self.log)
    }

    pub fn closes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Connection = MockConnection;

    async fn connect(&self) -> Result<MockConnection, ClientError> {
        let id = self.connects.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .get(id)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        match script {
            Script::RefuseConnect => Err(ClientError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            Script::TimeoutConnect => Err(ClientError::Timeout),
            script => Ok(MockConnection {
                id,
                script,
                sent: 0,
                delay: self.delay,
                log: Arc::clone(&self.log),
                closes: Arc::clone(&self.closes),
            }),
        }
    }
}

pub struct MockConnection {
    id: usize,
    script: Script,
    sent: u64,
    delay: Option<Duration>,
    log: Arc<Mutex<Vec<Sent>>>,
    closes: Arc<AtomicUsize>,
}

pub fn ok_reply() -> Reply {
    Reply {
        code: ReplyCode::Value,
        encoding: Encoding::Plain,
        data: Bytes::from_static(b"bar"),
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&mut self, opcode: Opcode, args: &str) -> Result<Reply, ClientError> {
        let seq = self.sent;
        self.sent += 1;

        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        self.log.lock().unwrap().push(Sent {
            conn: self.id,
            seq,
            opcode,
            args: args.to_string(),
        });

        match self.script {
            Script::RejectAll => Err(ClientError::Reply(ReplyCode::NotFound)),
            Script::RejectEvery(n) if (seq + 1) % n == 0 => {
                Err(ClientError::Reply(ReplyCode::Error))
            }
            Script::FailAt(n) if seq >= n => Err(ClientError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            ))),
            Script::TimeoutAt(n) if seq >= n => Err(ClientError::Timeout),
            Script::PanicAt(n) if seq >= n => panic!("scripted panic on connection {}", self.id),
            _ => Ok(ok_reply()),
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Configuration helpers
// ============================================================================

pub fn bench_config(clients: usize, requests: u64) -> BenchConfig {
    BenchConfig {
        dns: "127.0.0.1:10128".to_string(),
        clients,
        requests,
        pre: Some(String::new()),
        ..BenchConfig::default()
    }
}

pub fn configuration(clients: usize, requests: u64) -> Configuration {
    Configuration::from_config(&bench_config(clients, requests)).expect("valid configuration")
}

// ============================================================================
// Fake Gibson server
// ============================================================================

pub mod fake_server;

/// Start the fake server on an ephemeral local port.
pub async fn spawn_fake_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(fake_server::accept_loop(listener));
    addr
}
