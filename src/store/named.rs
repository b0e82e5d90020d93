//! Named file store
//!
//! Content is kept under a caller-chosen name at `objects/<name>.dabba`,
//! with its metadata in a sidecar at `meta/<name>.meta`.
//!
//! Each of the two files is replaced atomically, but not together: a crash
//! between them leaves new content with old metadata. Callers that need
//! both to move as one unit use the revision index instead.

use super::meta::Meta;
use super::objects::OBJECTS_DIR;
use super::write_atomic;
use crate::classify::{classify_and_rewind, ContentType};
use crate::{Error, Result};
use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name holding sidecar metadata under the store root
pub const META_DIR: &str = "meta";

const CONTENT_EXT: &str = "dabba";
const META_EXT: &str = "meta";

/// Files addressed by name rather than by hash
#[derive(Clone, Debug)]
pub struct NamedStore {
    objects: PathBuf,
    meta: PathBuf,
}

impl NamedStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        NamedStore {
            objects: root.join(OBJECTS_DIR),
            meta: root.join(META_DIR),
        }
    }

    /// Create the `objects/` and `meta/` directories
    pub fn init(&self) -> Result<()> {
        for dir in [&self.objects, &self.meta] {
            fs::create_dir_all(dir).map_err(|e| Error::io("create directory", dir, e))?;
        }
        Ok(())
    }

    /// Content path for `name`
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.objects.join(format!("{}.{}", name, CONTENT_EXT)))
    }

    /// Sidecar path for `name`
    pub fn meta_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.meta.join(format!("{}.{}", name, META_EXT)))
    }

    /// Open a named file with its metadata and sniffed type
    pub fn get(&self, name: &str) -> Result<NamedFile> {
        let path = self.path(name)?;
        let mut file = fs::File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(format!("named file {:?}", name)),
            _ => Error::io("open named file", &path, e),
        })?;
        let meta = self.meta(name)?;
        let content_type = classify_and_rewind(&mut file)
            .map_err(|e| Error::io("classify named file", &path, e))?
            .without_params();

        Ok(NamedFile {
            file,
            name: name.to_string(),
            content_type,
            meta,
            path,
        })
    }

    /// Load the sidecar metadata of `name`
    pub fn meta(&self, name: &str) -> Result<Meta> {
        let path = self.meta_path(name)?;
        let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(format!("meta for {:?}", name)),
            _ => Error::io("read meta file", &path, e),
        })?;
        Meta::parse(name, &text)
    }

    /// Replace the content of `name`, then its metadata
    pub fn write<R: Read + ?Sized>(&self, name: &str, reader: &mut R, meta: &Meta) -> Result<()> {
        let path = self.path(name)?;
        meta.validate()?;
        self.init()?;

        let size = write_atomic(&path, reader).map_err(|e| Error::io("write named file", &path, e))?;
        debug!(name, size, "wrote named file");

        self.write_meta(name, meta)
    }

    /// Replace only the metadata of `name`
    pub fn write_meta(&self, name: &str, meta: &Meta) -> Result<()> {
        let path = self.meta_path(name)?;
        meta.validate()?;
        fs::create_dir_all(&self.meta).map_err(|e| Error::io("create directory", &self.meta, e))?;

        let text = meta.serialize();
        write_atomic(&path, &mut text.as_bytes())
            .map_err(|e| Error::io("write meta file", &path, e))?;
        debug!(name, entries = meta.len(), "wrote meta");
        Ok(())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Names of all stored files, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.objects) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io("list named files", &self.objects, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io("list named files", &self.objects, e))?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(CONTENT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

/// An open named file, positioned at its start
#[derive(Debug)]
pub struct NamedFile {
    file: fs::File,
    name: String,
    content_type: ContentType,
    meta: Meta,
    path: PathBuf,
}

impl NamedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sniffed type with parameters stripped, e.g. `text/plain`
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_text(&self) -> bool {
        self.content_type.is_text()
    }

    pub fn is_image(&self) -> bool {
        self.content_type.is_image()
    }

    /// Read the whole file as text, from the start.
    ///
    /// Invalid UTF-8 sequences are replaced with U+FFFD.
    pub fn content(&mut self) -> Result<String> {
        self.rewind()?;
        let mut raw = Vec::new();
        self.file
            .read_to_end(&mut raw)
            .map_err(|e| Error::io("read named file", &self.path, e))?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| Error::io("seek named file", &self.path, e))?;
        Ok(())
    }

    pub fn into_file(self) -> fs::File {
        self.file
    }
}

impl Read for NamedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for NamedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
