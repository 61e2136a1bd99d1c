use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::ClientError;

/// Failures that abort the run before measurement starts.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Unknown operator \"{0}\", use --help to show the help menu.")]
    UnknownOperation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("pre operation {stage} failed: {source}")]
    Prelude {
        stage: String,
        #[source]
        source: ClientError,
    },
}

impl BenchError {
    pub(crate) fn prelude(stage: impl Into<String>, source: ClientError) -> Self {
        Self::Prelude {
            stage: stage.into(),
            source,
        }
    }
}
