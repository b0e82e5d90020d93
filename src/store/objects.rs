//! Content-addressed object directory
//!
//! Layout:
//! ```text
//! <root>/objects/
//!   <first 2 hex chars>/
//!     <remaining 38 hex chars>
//! ```
//!
//! Identical bytes always land on the same path, so writing an object twice
//! leaves a single, bit-identical file. Objects are never deleted here.

use super::write_atomic;
use crate::error::WritePhase;
use crate::model::ObjectHash;
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name holding objects under the store root
pub const OBJECTS_DIR: &str = "objects";

/// Hash-addressed blob storage under `<root>/objects`
#[derive(Clone, Debug)]
pub struct ObjectStore {
    dir: PathBuf,
}

impl ObjectStore {
    /// Create a handle rooted at `root`; directories are created lazily
    pub fn new(root: impl AsRef<Path>) -> Self {
        ObjectStore {
            dir: root.as_ref().join(OBJECTS_DIR),
        }
    }

    /// The `objects/` directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the object with the given hash: `objects/H[0:2]/H[2:]`
    pub fn object_path(&self, hash: &ObjectHash) -> PathBuf {
        let (shard, file) = hash.shard();
        self.dir.join(shard).join(file)
    }

    /// Hash a whole stream, rewind it, and persist it under its digest.
    ///
    /// The stream is read twice from offset 0, whatever its position on
    /// entry, so it must be seekable. The object is written to a temporary
    /// file in the shard directory and renamed into place; a concurrent
    /// reader sees either nothing or the full object.
    pub fn write<R: Read + Seek + ?Sized>(&self, reader: &mut R) -> Result<ObjectHash> {
        rewind(reader)?;
        let hash = ObjectHash::digest_reader(reader).map_err(|source| Error::ObjectWrite {
            phase: WritePhase::Hash,
            source,
        })?;
        rewind(reader)?;

        let path = self.object_path(&hash);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| Error::ObjectWrite {
                phase: WritePhase::Mkdir,
                source,
            })?;
        }

        let size = write_atomic(&path, reader).map_err(|source| Error::ObjectWrite {
            phase: WritePhase::Write,
            source,
        })?;

        debug!(hash = %hash, size, "wrote object");
        Ok(hash)
    }

    /// Persist an in-memory buffer
    pub fn write_bytes(&self, data: &[u8]) -> Result<ObjectHash> {
        self.write(&mut Cursor::new(data))
    }

    /// Open an object for reading
    pub fn open(&self, hash: &ObjectHash) -> Result<File> {
        let path = self.object_path(hash);
        File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(format!("object {}", hash)),
            _ => Error::io("open object", path, e),
        })
    }

    /// Read an object fully into memory
    pub fn read(&self, hash: &ObjectHash) -> Result<Vec<u8>> {
        let mut file = self.open(hash)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| Error::io("read object", self.object_path(hash), e))?;
        Ok(data)
    }

    /// Check if an object exists on disk
    pub fn contains(&self, hash: &ObjectHash) -> bool {
        self.object_path(hash).is_file()
    }
}

fn rewind<R: Seek + ?Sized>(reader: &mut R) -> Result<()> {
    reader
        .seek(SeekFrom::Start(0))
        .map(drop)
        .map_err(|source| Error::ObjectWrite {
            phase: WritePhase::Seek,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_write_hello_world() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let hash = store.write_bytes(b"hello world").unwrap();

        assert_eq!(hash.to_hex(), "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        let expected = dir
            .path()
            .join("objects")
            .join("2a")
            .join("ae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        assert_eq!(store.object_path(&hash), expected);
        assert_eq!(fs::read(expected).unwrap(), b"hello world");
    }

    #[test]
    fn test_deduplication() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let hash1 = store.write_bytes(b"duplicate data").unwrap();
        let first = fs::read(store.object_path(&hash1)).unwrap();
        let hash2 = store.write_bytes(b"duplicate data").unwrap();
        let second = fs::read(store.object_path(&hash2)).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(first, second);

        // one shard dir, one file, no leftover temp files
        let shard = store.object_path(&hash1).parent().unwrap().to_path_buf();
        assert_eq!(fs::read_dir(&shard).unwrap().count(), 1);
        assert_eq!(fs::read_dir(store.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_empty_stream() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let hash = store.write_bytes(b"").unwrap();
        assert_eq!(hash, ObjectHash::digest(b""));
        assert!(store.read(&hash).unwrap().is_empty());
    }

    #[test]
    fn test_stream_is_rewound_before_copy() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let mut source = tempfile::tempfile().unwrap();
        source.write_all(b"from a real file").unwrap();
        source.seek(SeekFrom::Start(0)).unwrap();

        let hash = store.write(&mut source).unwrap();
        assert_eq!(store.read(&hash).unwrap(), b"from a real file");
    }

    #[test]
    fn test_hash_covers_bytes_before_stream_position() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let mut source = Cursor::new(b"header:payload".to_vec());
        source.seek(SeekFrom::Start(7)).unwrap();

        let hash = store.write(&mut source).unwrap();
        let stored = store.read(&hash).unwrap();
        assert_eq!(stored, b"header:payload");
        assert_eq!(ObjectHash::digest(&stored), hash);

        // the suffix alone is a different object and leaves the first intact
        let suffix = store.write_bytes(b"payload").unwrap();
        assert_ne!(suffix, hash);
        assert_eq!(store.read(&hash).unwrap(), b"header:payload");
    }

    #[test]
    fn test_unreadable_stream_is_a_hash_failure() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "device gone"))
            }
        }

        impl Seek for Broken {
            fn seek(&mut self, _: SeekFrom) -> std::io::Result<u64> {
                Ok(0)
            }
        }

        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let err = store.write(&mut Broken).unwrap_err();
        assert!(matches!(
            err,
            Error::ObjectWrite {
                phase: WritePhase::Hash,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::HashFailure);
        assert!(!store.dir().exists());
    }

    #[test]
    fn test_directory_at_object_path_is_a_write_failure() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        // a non-empty directory where the object file should land
        let blocked = store.object_path(&ObjectHash::digest(b"payload"));
        fs::create_dir_all(blocked.join("occupied")).unwrap();

        let err = store.write_bytes(b"payload").unwrap_err();
        assert!(matches!(
            err,
            Error::ObjectWrite {
                phase: WritePhase::Write,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        // the temp file is cleaned up
        let shard = blocked.parent().unwrap();
        assert_eq!(fs::read_dir(shard).unwrap().count(), 1);
    }

    #[test]
    fn test_unseekable_stream_is_a_seek_failure() {
        struct NoSeek(Cursor<Vec<u8>>);

        impl Read for NoSeek {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                self.0.read(buf)
            }
        }

        impl Seek for NoSeek {
            fn seek(&mut self, _: SeekFrom) -> std::io::Result<u64> {
                Err(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "not seekable",
                ))
            }
        }

        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let err = store
            .write(&mut NoSeek(Cursor::new(b"abc".to_vec())))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ObjectWrite {
                phase: WritePhase::Seek,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::HashFailure);
        assert!(!store.dir().exists());
    }

    #[test]
    fn test_mkdir_failure() {
        let dir = tempdir().unwrap();
        // a plain file where the objects directory should be
        fs::write(dir.path().join("objects"), b"in the way").unwrap();
        let store = ObjectStore::new(dir.path());

        let err = store.write_bytes(b"payload").unwrap_err();
        assert!(matches!(
            err,
            Error::ObjectWrite {
                phase: WritePhase::Mkdir,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn test_open_missing_object() {
        let dir = tempdir().unwrap();
        let store = ObjectStore::new(dir.path());

        let err = store.open(&ObjectHash::digest(b"never written")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!store.contains(&ObjectHash::digest(b"never written")));
    }
}
