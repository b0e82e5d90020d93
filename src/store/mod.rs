//! On-disk storage
//!
//! Two layouts share the store root:
//! - `objects/<shard>/<rest>`: content-addressed blobs ([`ObjectStore`])
//! - `objects/<name>.dabba` + `meta/<name>.meta`: named content with a
//!   sidecar of `key:value` records ([`NamedStore`])

mod meta;
mod named;
mod objects;

pub use meta::Meta;
pub use named::{NamedFile, NamedStore, META_DIR};
pub use objects::{ObjectStore, OBJECTS_DIR};

use std::io::{self, Read};
use std::path::Path;

/// Stream `reader` into a temporary file next to `path`, then rename it
/// over `path`. Returns the number of bytes written.
pub(crate) fn write_atomic<R: Read + ?Sized>(path: &Path, reader: &mut R) -> io::Result<u64> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let size = io::copy(reader, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(size)
}
