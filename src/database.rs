//! High-level Store API
//!
//! This module provides the main entry point for interacting with dabba.

use crate::classify::classify_and_rewind;
use crate::config::Config;
use crate::index::{RevisionIndex, INDEX_FILE};
use crate::model::{File, FileId, FileRecord, LogEntry, ObjectHash};
use crate::store::{NamedStore, ObjectStore};
use crate::{Error, Result};
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::info;

/// An open store rooted at a directory
///
/// ```text
/// <root>/
///   config.json
///   index.db
///   objects/<shard>/<rest>      content-addressed objects
///   objects/<name>.dabba        named content
///   meta/<name>.meta            named metadata
/// ```
///
/// Writes always go object first, index second, so the index never points
/// at an object that was not written.
pub struct Store {
    root: PathBuf,
    config: Config,
    objects: ObjectStore,
    index: RevisionIndex,
    named: NamedStore,
}

impl Store {
    /// Open a store, creating its layout if needed
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| Error::io("create store root", &root, e))?;

        let config = Config::load_or_create(&root)?;
        let objects = ObjectStore::new(&root);
        let named = NamedStore::new(&root);
        named.init()?;
        let index = RevisionIndex::open(root.join(INDEX_FILE))?;

        info!(root = %root.display(), "opened store");
        Ok(Store {
            root,
            config,
            objects,
            index,
            named,
        })
    }

    /// Close the store, flushing the index
    pub fn close(self) -> Result<()> {
        self.index.close()
    }

    // === Logical files ===

    /// Store a stream as a new logical file
    pub fn put<R: Read + Seek + ?Sized>(&self, reader: &mut R) -> Result<FileId> {
        let hash = self.objects.write(reader)?;
        self.index.create(&hash)
    }

    pub fn put_bytes(&self, data: &[u8]) -> Result<FileId> {
        self.put(&mut Cursor::new(data))
    }

    /// Store a stream as the next revision of an existing file
    pub fn update<R: Read + Seek + ?Sized>(&self, id: FileId, reader: &mut R) -> Result<ObjectHash> {
        // fail before writing anything if the id is unknown
        self.index.resolve(id)?;
        let hash = self.objects.write(reader)?;
        self.index.update(id, &hash)?;
        Ok(hash)
    }

    pub fn update_bytes(&self, id: FileId, data: &[u8]) -> Result<ObjectHash> {
        self.update(id, &mut Cursor::new(data))
    }

    /// Assemble the current revision of a file.
    ///
    /// Plain text is returned inline, decoded in its sniffed charset
    /// (UTF-8, or UTF-16 when the object starts with a BOM). `content`
    /// reproduces the stored bytes only when they are valid in that
    /// charset; invalid sequences become U+FFFD. Other content leaves
    /// `content` empty and is reached through [`Store::open_object`].
    pub fn read(&self, id: FileId) -> Result<File> {
        let record = self.index.resolve(id)?;
        let path = self.objects.object_path(&record.object_id);
        let mut object = self.objects.open(&record.object_id)?;

        let content_type = classify_and_rewind(&mut object)
            .map_err(|e| Error::io("classify object", &path, e))?;

        let mut file = File::from_record(record);
        if content_type.is_text() {
            let mut raw = Vec::new();
            object
                .read_to_end(&mut raw)
                .map_err(|e| Error::io("read object", &path, e))?;
            file.content = content_type.decode(&raw);
        }
        file.content_type = content_type.to_string();
        Ok(file)
    }

    /// Open the object behind the current revision, for content that is
    /// returned by reference
    pub fn open_object(&self, id: FileId) -> Result<fs::File> {
        let record = self.index.resolve(id)?;
        self.objects.open(&record.object_id)
    }

    pub fn resolve(&self, id: FileId) -> Result<FileRecord> {
        self.index.resolve(id)
    }

    pub fn history(&self, id: FileId) -> Result<Vec<LogEntry>> {
        self.index.history(id)
    }

    pub fn list(&self) -> Result<Vec<FileRecord>> {
        self.index.list()
    }

    /// Filesystem path of an object
    pub fn object_path(&self, hash: &ObjectHash) -> PathBuf {
        self.objects.object_path(hash)
    }

    // === Configuration ===

    /// Logical name of the default document, if configured
    pub fn start_file(&self) -> Option<&str> {
        self.config.start_file.as_deref()
    }

    /// Change the default document and persist the config
    pub fn set_start_file(&mut self, name: Option<String>) -> Result<()> {
        self.config.start_file = name;
        self.config.save(&self.root)
    }

    // === Accessors ===

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn index(&self) -> &RevisionIndex {
        &self.index
    }

    pub fn named(&self) -> &NamedStore {
        &self.named
    }
}
