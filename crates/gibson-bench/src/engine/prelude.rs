use tracing::{debug, info};

use super::command::Command;
use crate::error::BenchError;
use crate::protocol::{Connection, Connector, Opcode};

/// Run the setup operations over a single connection before the clock starts.
///
/// Every command is sent before any reply is awaited. Any failure is fatal:
/// the benchmark must not run on top of a partially applied setup.
pub async fn run_prelude<C: Connector>(
    connector: &C,
    commands: &[Command],
) -> Result<(), BenchError> {
    if commands.is_empty() {
        return Ok(());
    }

    let mut conn = connector
        .connect()
        .await
        .map_err(|e| BenchError::prelude("connect", e))?;

    let requests: Vec<(Opcode, &str)> = commands.iter().map(Command::request).collect();
    let replies = match conn.pipeline(&requests).await {
        Ok(replies) => replies,
        Err(e) => return Err(BenchError::prelude("batch", e)),
    };

    for (command, reply) in commands.iter().zip(replies) {
        if let Err(e) = reply {
            let _ = conn.close().await;
            return Err(BenchError::prelude(command.to_string(), e));
        }
        debug!(command = %command, "Pre operation succeeded");
    }

    if let Err(e) = conn.close().await {
        debug!(error = %e, "Closing pre operation connection failed");
    }
    info!(count = commands.len(), "Pre operations completed");
    Ok(())
}
