//! Fatal errors raised while introspecting an ELF binary.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit status used when the inspection tool cannot be started at all,
/// matching what a shell reports for a missing command.
const EXIT_NOT_FOUND: u8 = 127;

/// A whole-run failure of the ELF introspector.
///
/// Unresolved libraries are never reported through this type; they are
/// ordinary [`Resolution::Unresolved`](crate::Resolution::Unresolved) values.
#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("failed to run `{command}` - is it installed? (install binutils)")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with status {}: {stderr}", display_status(.status))]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse ELF file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: goblin::error::Error,
    },
}

impl IntrospectError {
    /// Process exit status to terminate with. Never zero.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Spawn { .. } => EXIT_NOT_FOUND,
            Self::Failed { status, .. } => match status.and_then(|s| u8::try_from(s).ok()) {
                Some(0) | None => 1,
                Some(code) => code,
            },
            Self::Read { .. } | Self::Parse { .. } => 1,
        }
    }
}

fn display_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "unknown (terminated by signal)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(status: Option<i32>) -> IntrospectError {
        IntrospectError::Failed {
            command: "readelf -d /app/bin/prog".to_string(),
            status,
            stderr: "readelf: Error: 'prog': No such file".to_string(),
        }
    }

    #[test]
    fn test_failed_propagates_tool_status() {
        assert_eq!(failed(Some(1)).exit_code(), 1);
        assert_eq!(failed(Some(2)).exit_code(), 2);
    }

    #[test]
    fn test_failed_never_exits_zero() {
        assert_eq!(failed(None).exit_code(), 1);
        assert_eq!(failed(Some(0)).exit_code(), 1);
        assert_eq!(failed(Some(-1)).exit_code(), 1);
    }

    #[test]
    fn test_spawn_failure_is_127() {
        let err = IntrospectError::Spawn {
            command: "readelf -d prog".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn test_failed_message_names_command_and_stderr() {
        let msg = failed(Some(1)).to_string();
        assert!(msg.contains("readelf -d /app/bin/prog"), "got: {msg}");
        assert!(msg.contains("status 1"), "got: {msg}");
        assert!(msg.contains("No such file"), "got: {msg}");
    }
}
