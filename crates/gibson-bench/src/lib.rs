pub mod cli;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod protocol;

pub use engine::{Benchmark, Configuration, Report};
pub use error::BenchError;
pub use protocol::GibsonConnector;
