//! Revision index
//!
//! Maps a stable [`FileId`] to the object holding its latest content, and
//! keeps an append-only log of every object a file has pointed at.
//!
//! Every mutation runs in one SQLite transaction: the `files` row and its
//! `log` entry become visible together or not at all. The index never
//! checks that an object exists on disk, so callers write the object first
//! and only then record it here. A commit that fails after the object was
//! written leaves an unreferenced object behind, which is harmless: the
//! next attempt hashes to the same object.

mod schema;

pub use schema::SCHEMA_VERSION;

use crate::model::{now, FileId, FileRecord, LogEntry, ObjectHash};
use crate::{Error, Result};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use tracing::debug;

/// File name of the index database under the store root
pub const INDEX_FILE: &str = "index.db";

/// Transactional mapping of logical files to objects
pub struct RevisionIndex {
    conn: Mutex<Connection>,
}

impl RevisionIndex {
    /// Open (or create) an index database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| Error::index(format!("open index {}", path.display()), e))?;
        Self::from_connection(conn)
    }

    /// A throwaway index, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::index("open in-memory index", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        schema::migrate(&conn)?;
        Ok(RevisionIndex {
            conn: Mutex::new(conn),
        })
    }

    /// Register a new logical file pointing at `hash`
    pub fn create(&self, hash: &ObjectHash) -> Result<FileId> {
        let mut conn = self.conn.lock();
        let tx = begin(&mut conn)?;
        let ts = now();

        tx.execute(
            "INSERT INTO files (object_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![hash, ts],
        )
        .map_err(|e| Error::index("insert into files", e))?;
        let id = FileId(tx.last_insert_rowid());

        append_log(&tx, id, hash, ts)?;
        commit(tx)?;

        debug!(file_id = %id, hash = %hash, "created file");
        Ok(id)
    }

    /// Point an existing file at a new object
    pub fn update(&self, id: FileId, hash: &ObjectHash) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = begin(&mut conn)?;

        let previous: i64 = tx
            .query_row(
                "SELECT updated_at FROM files WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::index(format!("look up file {}", id), e))?
            .ok_or_else(|| Error::NotFound(format!("file {}", id)))?;

        // never let the log run backwards, even if the clock does
        let ts = now().max(previous);

        append_log(&tx, id, hash, ts)?;
        tx.execute(
            "UPDATE files SET object_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![hash, ts, id],
        )
        .map_err(|e| Error::index(format!("update file {}", id), e))?;
        commit(tx)?;

        debug!(file_id = %id, hash = %hash, "updated file");
        Ok(())
    }

    /// Read the current record of a file
    pub fn resolve(&self, id: FileId) -> Result<FileRecord> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, object_id, created_at, updated_at FROM files WHERE id = ?1",
            params![id],
            row_to_record,
        )
        .optional()
        .map_err(|e| Error::index(format!("query file {}", id), e))?
        .ok_or_else(|| Error::NotFound(format!("file {}", id)))
    }

    /// Every object a file has pointed at, oldest first
    pub fn history(&self, id: FileId) -> Result<Vec<LogEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT file_id, object_id, updated_at FROM log
                 WHERE file_id = ?1 ORDER BY updated_at, rowid",
            )
            .map_err(|e| Error::index("prepare history query", e))?;

        let entries = stmt
            .query_map(params![id], |row| {
                Ok(LogEntry {
                    file_id: row.get(0)?,
                    object_id: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| Error::index(format!("query history of file {}", id), e))?;

        if entries.is_empty() {
            return Err(Error::NotFound(format!("file {}", id)));
        }
        Ok(entries)
    }

    /// All files, by id
    pub fn list(&self) -> Result<Vec<FileRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, object_id, created_at, updated_at FROM files ORDER BY id")
            .map_err(|e| Error::index("prepare list query", e))?;

        let records = stmt
            .query_map([], row_to_record)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| Error::index("list files", e))?;
        Ok(records)
    }

    /// Number of logical files
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(|e| Error::index("count files", e))
    }

    /// Close the underlying connection, reporting any error
    pub fn close(self) -> Result<()> {
        self.conn
            .into_inner()
            .close()
            .map_err(|(_, e)| Error::index("close index", e))
    }
}

fn begin<'c>(conn: &'c mut Connection) -> Result<Transaction<'c>> {
    conn.transaction()
        .map_err(|source| Error::Transaction { op: "begin", source })
}

fn commit(tx: Transaction<'_>) -> Result<()> {
    tx.commit()
        .map_err(|source| Error::Transaction { op: "commit", source })
}

fn append_log(tx: &Transaction<'_>, id: FileId, hash: &ObjectHash, ts: i64) -> Result<()> {
    tx.execute(
        "INSERT INTO log (file_id, object_id, updated_at) VALUES (?1, ?2, ?3)",
        params![id, hash, ts],
    )
    .map_err(|e| Error::index(format!("append log for file {}", id), e))?;
    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        object_id: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        tags: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tempfile::tempdir;

    fn h(data: &str) -> ObjectHash {
        ObjectHash::digest(data.as_bytes())
    }

    #[test]
    fn test_create_and_resolve() {
        let index = RevisionIndex::open_in_memory().unwrap();

        let id = index.create(&h("B1")).unwrap();
        assert_eq!(id, FileId(1));

        let record = index.resolve(id).unwrap();
        assert_eq!(record.object_id, h("B1"));
        assert_eq!(record.created_at, record.updated_at);
        assert!(record.tags.is_empty());

        let log = index.history(id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].object_id, h("B1"));
        assert_eq!(log[0].updated_at, record.updated_at);
    }

    #[test]
    fn test_update_preserves_id() {
        let index = RevisionIndex::open_in_memory().unwrap();

        let id = index.create(&h("B1")).unwrap();
        index.update(id, &h("B2")).unwrap();

        let record = index.resolve(id).unwrap();
        assert_eq!(record.id, FileId(1));
        assert_eq!(record.object_id, h("B2"));

        let log = index.history(id).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].object_id, h("B1"));
        assert_eq!(log[1].object_id, h("B2"));
    }

    #[test]
    fn test_revision_ordering() {
        let index = RevisionIndex::open_in_memory().unwrap();
        let id = index.create(&h("v0")).unwrap();

        let n = 10;
        for i in 1..=n {
            index.update(id, &h(&format!("v{}", i))).unwrap();
        }

        let log = index.history(id).unwrap();
        assert_eq!(log.len(), n + 1);
        assert!(log.windows(2).all(|w| w[0].updated_at <= w[1].updated_at));
        for (i, entry) in log.iter().enumerate() {
            assert_eq!(entry.object_id, h(&format!("v{}", i)));
        }

        let record = index.resolve(id).unwrap();
        assert_eq!(record.object_id, log.last().unwrap().object_id);
        assert_eq!(record.updated_at, log.last().unwrap().updated_at);
    }

    #[test]
    fn test_ids_are_independent() {
        let index = RevisionIndex::open_in_memory().unwrap();

        let a = index.create(&h("a")).unwrap();
        let b = index.create(&h("a")).unwrap();
        assert_ne!(a, b);

        index.update(b, &h("b")).unwrap();
        assert_eq!(index.history(a).unwrap().len(), 1);
        assert_eq!(index.history(b).unwrap().len(), 2);
        assert_eq!(index.count().unwrap(), 2);

        let ids: Vec<_> = index.list().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_missing_file() {
        let index = RevisionIndex::open_in_memory().unwrap();

        assert_eq!(index.resolve(FileId(7)).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(index.history(FileId(7)).unwrap_err().kind(), ErrorKind::NotFound);

        let err = index.update(FileId(7), &h("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let orphans: i64 = index
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_failed_update_rolls_back_log_append() {
        let index = RevisionIndex::open_in_memory().unwrap();
        let id = index.create(&h("before")).unwrap();

        // the log append succeeds, then the files update aborts
        index
            .conn
            .lock()
            .execute_batch(
                "CREATE TRIGGER fail_update BEFORE UPDATE ON files
                 BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;",
            )
            .unwrap();

        let err = index.update(id, &h("after")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionFailure);

        assert_eq!(index.resolve(id).unwrap().object_id, h("before"));
        let log = index.history(id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].object_id, h("before"));
    }

    #[test]
    fn test_failed_create_leaves_nothing() {
        let index = RevisionIndex::open_in_memory().unwrap();

        index
            .conn
            .lock()
            .execute_batch(
                "CREATE TRIGGER fail_log BEFORE INSERT ON log
                 BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;",
            )
            .unwrap();

        let err = index.create(&h("doomed")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransactionFailure);
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(INDEX_FILE);

        let id = {
            let index = RevisionIndex::open(&path).unwrap();
            let id = index.create(&h("durable")).unwrap();
            index.close().unwrap();
            id
        };

        let index = RevisionIndex::open(&path).unwrap();
        assert_eq!(index.resolve(id).unwrap().object_id, h("durable"));
    }
}
