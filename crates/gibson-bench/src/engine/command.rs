use std::fmt;

use crate::error::BenchError;
use crate::protocol::{lookup_opcode, Opcode};

/// A resolved operation: what to send, and under which name to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub opcode: Opcode,
    pub args: String,
}

impl Command {
    pub fn request(&self) -> (Opcode, &str) {
        (self.opcode, self.args.as_str())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} {}", self.name, self.args)
        }
    }
}

/// Resolve `"OPNAME arg1 arg2 ..."` against the client's capability set.
///
/// Only the ends are trimmed; everything after the first space is sent as typed.
pub fn resolve(operation: &str) -> Result<Command, BenchError> {
    let operation = operation.trim();
    let (name, args) = operation.split_once(' ').unwrap_or((operation, ""));

    let opcode =
        lookup_opcode(name).ok_or_else(|| BenchError::UnknownOperation(name.to_string()))?;

    Ok(Command {
        name: name.to_ascii_uppercase(),
        opcode,
        args: args.to_string(),
    })
}

/// Resolve a `;`-separated list, keeping its order. Blank entries are skipped.
pub fn resolve_list(list: &str) -> Result<Vec<Command>, BenchError> {
    list.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(resolve)
        .collect()
}

/// The write every worker issues before its request loop when a key/value
/// pair is configured.
pub fn setup_command(key: &str, value: &str) -> Result<Command, BenchError> {
    resolve(&format!("SET 0 {} {}", key, value))
}
