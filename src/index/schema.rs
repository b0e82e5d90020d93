//! SQLite schema and column conversions for the revision index

use crate::model::{FileId, ObjectHash};
use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;

/// Bumped whenever [`SCHEMA`] changes shape
pub const SCHEMA_VERSION: i32 = 1;

/// Timestamps are unix seconds in INTEGER columns, in both tables.
const SCHEMA: &str = "
BEGIN;
CREATE TABLE IF NOT EXISTS files (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    object_id  TEXT    NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS log (
    file_id    INTEGER NOT NULL REFERENCES files(id),
    object_id  TEXT    NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS log_file_id ON log(file_id);
PRAGMA user_version = 1;
COMMIT;
";

/// Enable constraints and bring the schema up to [`SCHEMA_VERSION`]
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(|e| Error::index("enable foreign keys", e))?;

    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| Error::index("read schema version", e))?;

    if version > SCHEMA_VERSION {
        return Err(Error::Config(format!(
            "index schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }
    if version < SCHEMA_VERSION {
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::index("create index schema", e))?;
    }
    Ok(())
}

impl ToSql for ObjectHash {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_hex()))
    }
}

impl FromSql for ObjectHash {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        ObjectHash::from_hex(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for FileId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for FileId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_i64().map(FileId)
    }
}
