//! Logical file records - stable identities over changing content

use super::ObjectHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity of a logical file in the revision index
///
/// Unlike an [`ObjectHash`], a file id survives content changes: every
/// update points the same id at a new object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub i64);

impl FileId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(FileId)
    }
}

impl From<i64> for FileId {
    fn from(id: i64) -> Self {
        FileId(id)
    }
}

/// Current unix time in seconds, the only timestamp unit stored by the index
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// A row of the `files` table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    /// Hash of the object holding the latest revision
    pub object_id: ObjectHash,
    /// Unix seconds; never changes after creation
    pub created_at: i64,
    /// Unix seconds of the latest revision
    pub updated_at: i64,
    /// Carried for API consumers; the index never populates it
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A row of the append-only `log` table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub file_id: FileId,
    pub object_id: ObjectHash,
    pub updated_at: i64,
}

/// A logical file assembled for a caller
///
/// `content` holds the full text when the object sniffs as plain text.
/// For anything else it is empty and the caller dereferences the object
/// by `object_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub id: FileId,
    pub object_id: ObjectHash,
    pub created_at: i64,
    pub updated_at: i64,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub content_type: String,
    pub content: String,
}

impl File {
    /// Start a result from an index record; type and content are filled in
    /// once the object has been classified.
    pub fn from_record(record: FileRecord) -> Self {
        File {
            id: record.id,
            object_id: record.object_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            tags: record.tags,
            content_type: String::new(),
            content: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_json_field_names() {
        let record = FileRecord {
            id: FileId(1),
            object_id: ObjectHash::digest(b"hello world"),
            created_at: 10,
            updated_at: 20,
            tags: vec![],
        };
        let mut file = File::from_record(record);
        file.content_type = "text/plain; charset=utf-8".into();
        file.content = "hello world".into();

        let value = serde_json::to_value(&file).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["object_id"], "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        assert_eq!(value["created_at"], 10);
        assert_eq!(value["updated_at"], 20);
        assert_eq!(value["tags"], serde_json::json!([]));
        assert_eq!(value["type"], "text/plain; charset=utf-8");
        assert_eq!(value["content"], "hello world");
    }

    #[test]
    fn test_file_id_parse() {
        assert_eq!("42".parse::<FileId>().unwrap(), FileId(42));
        assert!("forty-two".parse::<FileId>().is_err());
    }
}
