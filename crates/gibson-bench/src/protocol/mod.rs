pub mod client;
pub mod gibson;

pub use client::{ClientError, Connection, Connector, Endpoint, GibsonConnector};
pub use gibson::{lookup_opcode, Opcode, Reply, ReplyCode};
