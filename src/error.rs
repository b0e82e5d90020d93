//! Error types for dabba

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dabba operations
pub type Result<T> = std::result::Result<T, Error>;

/// The step of an object write that failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WritePhase {
    /// Computing the digest over the input stream
    Hash,
    /// Rewinding the input stream after hashing
    Seek,
    /// Creating the shard directory
    Mkdir,
    /// Copying the stream into the object file
    Write,
}

impl fmt::Display for WritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            WritePhase::Hash => "hash",
            WritePhase::Seek => "seek",
            WritePhase::Mkdir => "mkdir",
            WritePhase::Write => "write",
        };
        f.write_str(phase)
    }
}

/// Coarse classification of an [`Error`], for callers that render or
/// branch on failures without matching every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    IoFailure,
    HashFailure,
    NotFound,
    Corrupt,
    TransactionFailure,
    InvalidInput,
    Config,
}

/// Errors that can occur in dabba operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("object {phase} failed: {source}")]
    ObjectWrite {
        phase: WritePhase,
        #[source]
        source: std::io::Error,
    },

    #[error("{context} ({}): {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("meta file {name:?} corrupted on line {line}: {content}")]
    Corrupt {
        name: String,
        line: usize,
        content: String,
    },

    #[error("{op} transaction: {source}")]
    Transaction {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{context}: {source}")]
    Index {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Invalid meta entry {key:?}: {reason}")]
    InvalidMeta { key: String, reason: &'static str },

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Map this error onto its coarse kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ObjectWrite {
                phase: WritePhase::Hash | WritePhase::Seek,
                ..
            } => ErrorKind::HashFailure,
            Error::ObjectWrite { .. } | Error::Io { .. } => ErrorKind::IoFailure,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Corrupt { .. } => ErrorKind::Corrupt,
            Error::Transaction { .. } | Error::Index { .. } => ErrorKind::TransactionFailure,
            Error::InvalidHash(_) | Error::InvalidName(_) | Error::InvalidMeta { .. } => {
                ErrorKind::InvalidInput
            }
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn index(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Error::Index {
            context: context.into(),
            source,
        }
    }
}
