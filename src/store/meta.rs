//! Sidecar metadata records
//!
//! Format, one record per line:
//! ```text
//! # comment
//! title:My document
//! url:https://example.com/a:b
//! ```
//! The first `:` separates key from value. Blank lines and `#` lines are
//! ignored. A later occurrence of a key replaces an earlier one.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value metadata attached to a named file
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meta(BTreeMap<String, String>);

impl Meta {
    pub fn new() -> Self {
        Meta::default()
    }

    /// Parse the contents of the meta file belonging to `name`
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (idx, line) in text.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once(':').ok_or_else(|| Error::Corrupt {
                name: name.to_string(),
                line: idx + 1,
                content: line.to_string(),
            })?;
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(Meta(entries))
    }

    /// Render as `key:value` lines, each terminated by `\n`
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.0 {
            out.push_str(key);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    /// Check that every record survives a serialize/parse cycle unchanged
    pub fn validate(&self) -> Result<()> {
        for (key, value) in &self.0 {
            let reason = if key.is_empty() {
                Some("key is empty")
            } else if key.contains(':') {
                Some("key contains ':'")
            } else if key.starts_with('#') {
                Some("key starts with '#'")
            } else if has_line_break(key) {
                Some("key contains a line break")
            } else if has_line_break(value) {
                Some("value contains a line break")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(Error::InvalidMeta {
                    key: key.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn has_line_break(s: &str) -> bool {
    s.contains('\n') || s.contains('\r')
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Meta {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Meta(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<BTreeMap<String, String>> for Meta {
    fn from(map: BTreeMap<String, String>) -> Self {
        Meta(map)
    }
}

impl From<Meta> for BTreeMap<String, String> {
    fn from(meta: Meta) -> Self {
        meta.0
    }
}
