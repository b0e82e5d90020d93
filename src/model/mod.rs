//! Core data model types for dabba

mod file;
mod hash;

pub use file::{now, File, FileId, FileRecord, LogEntry};
pub use hash::ObjectHash;
