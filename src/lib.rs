//! # dabba
//!
//! A content-addressed blob store with a transactional revision index.
//!
//! Bytes are stored once per distinct content, under a path derived from
//! their SHA-1 digest. Logical files get stable integer ids; each id points
//! at the object holding its latest revision and keeps an append-only log
//! of every object it has pointed at.
//!
//! ## Core Concepts
//!
//! - **Objects**: Immutable blobs at `objects/<2 hex>/<38 hex>`
//! - **Logical files**: Stable ids mapped to their current object
//! - **Revision log**: Every object a file has pointed at, oldest first
//! - **Named files**: Content under a chosen name with `key:value` metadata
//!
//! ## Example
//!
//! ```no_run
//! use dabba::Store;
//!
//! let store = Store::open(".dabba")?;
//! let id = store.put_bytes(b"hello world")?;
//! let file = store.read(id)?;
//! assert_eq!(file.content, "hello world");
//! store.close()?;
//! # Ok::<(), dabba::Error>(())
//! ```

pub mod classify;
pub mod config;
pub mod index;
pub mod model;
pub mod store;

mod database;
mod error;

pub use classify::{classify, classify_and_rewind, sniff, ContentType};
pub use config::Config;
pub use database::Store;
pub use error::{Error, ErrorKind, Result, WritePhase};
pub use index::RevisionIndex;
pub use model::{File, FileId, FileRecord, LogEntry, ObjectHash};
pub use store::{Meta, NamedFile, NamedStore, ObjectStore};
