//! Connection seam between the benchmark engine and a Gibson server.
//!
//! The engine only sees [`Connector`] and [`Connection`]. [`GibsonConnector`]
//! is the production implementation over TCP or Unix sockets; tests plug in
//! their own.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use super::gibson::{self, FrameError, Opcode, Reply, ReplyCode, REPLY_HEADER_LEN};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("operation timed out")]
    Timeout,
    #[error("server replied {0}")]
    Reply(ReplyCode),
    #[error("protocol error: {0}")]
    Protocol(#[from] FrameError),
}

impl ClientError {
    /// Anything but an error reply leaves the connection unusable.
    pub fn is_connection_error(&self) -> bool {
        !matches!(self, Self::Reply(_))
    }
}

/// Opens connections to the configured target.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: Connection + 'static;

    async fn connect(&self) -> Result<Self::Connection, ClientError>;
}

#[async_trait]
pub trait Connection: Send {
    /// Send one request and wait for its reply. Error replies come back as
    /// [`ClientError::Reply`].
    async fn query(&mut self, opcode: Opcode, args: &str) -> Result<Reply, ClientError>;

    /// Issue every request before waiting on any reply, then collect the
    /// replies in order. The outer error is a connection failure; inner
    /// errors are per-request error replies.
    async fn pipeline(
        &mut self,
        requests: &[(Opcode, &str)],
    ) -> Result<Vec<Result<Reply, ClientError>>, ClientError> {
        let mut replies = Vec::with_capacity(requests.len());
        for (opcode, args) in requests {
            match self.query(*opcode, args).await {
                Err(e) if e.is_connection_error() => return Err(e),
                reply => replies.push(reply),
            }
        }
        Ok(replies)
    }

    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    Unix(PathBuf),
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(format!("missing socket path in '{}'", s));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        let addr = s.strip_prefix("tcp://").unwrap_or(s);
        if addr.is_empty() || !addr.contains(':') {
            return Err(format!("expected host:port, got '{}'", s));
        }
        Ok(Self::Tcp(addr.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{}", addr),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

trait Stream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Stream for T {}

/// Run `fut` under the per-request limit, if one is configured.
async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    match limit {
        Some(limit) => match timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout),
        },
        None => fut.await,
    }
}

#[derive(Debug, Clone)]
pub struct GibsonConnector {
    endpoint: Endpoint,
    timeout: Option<Duration>,
}

impl GibsonConnector {
    pub fn new(endpoint: Endpoint, timeout: Option<Duration>) -> Self {
        Self { endpoint, timeout }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn open(&self) -> Result<Box<dyn Stream>, ClientError> {
        match &self.endpoint {
            Endpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await?;
                let _ = stream.set_nodelay(true);
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok(Box::new(stream))
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(ClientError::Io(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not available on this platform",
            ))),
        }
    }
}

#[async_trait]
impl Connector for GibsonConnector {
    type Connection = GibsonConnection;

    async fn connect(&self) -> Result<GibsonConnection, ClientError> {
        let stream = with_timeout(self.timeout, self.open()).await?;
        debug!(endpoint = %self.endpoint, "Connected");
        Ok(GibsonConnection {
            stream,
            timeout: self.timeout,
            write_buf: BytesMut::with_capacity(256),
        })
    }
}

pub struct GibsonConnection {
    stream: Box<dyn Stream>,
    timeout: Option<Duration>,
    write_buf: BytesMut,
}

impl GibsonConnection {
    async fn flush_requests(&mut self) -> Result<(), ClientError> {
        let frames = self.write_buf.split();
        self.stream.write_all(&frames).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<Reply, ClientError> {
        let mut header = [0u8; REPLY_HEADER_LEN];
        self.stream.read_exact(&mut header).await?;
        let header = gibson::decode_reply_header(&header)?;

        let mut data = vec![0u8; header.size];
        self.stream.read_exact(&mut data).await?;

        Ok(Reply {
            code: header.code,
            encoding: header.encoding,
            data: data.into(),
        })
    }
}

fn into_result(reply: Reply) -> Result<Reply, ClientError> {
    if reply.code.is_error() {
        Err(ClientError::Reply(reply.code))
    } else {
        Ok(reply)
    }
}

#[async_trait]
impl Connection for GibsonConnection {
    async fn query(&mut self, opcode: Opcode, args: &str) -> Result<Reply, ClientError> {
        gibson::encode_request(&mut self.write_buf, opcode, args);
        let limit = self.timeout;
        let reply = with_timeout(limit, async {
            self.flush_requests().await?;
            self.read_reply().await
        })
        .await?;
        into_result(reply)
    }

    async fn pipeline(
        &mut self,
        requests: &[(Opcode, &str)],
    ) -> Result<Vec<Result<Reply, ClientError>>, ClientError> {
        for (opcode, args) in requests {
            gibson::encode_request(&mut self.write_buf, *opcode, args);
        }
        let limit = self.timeout;
        with_timeout(limit, self.flush_requests()).await?;

        let mut replies = Vec::with_capacity(requests.len());
        for _ in requests {
            let reply = with_timeout(limit, self.read_reply()).await?;
            replies.push(into_result(reply));
        }
        Ok(replies)
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
