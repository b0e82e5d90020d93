//! Content-addressed hash type using SHA-1

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// A 20-byte SHA-1 digest identifying an object by its content
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHash([u8; 20]);

impl ObjectHash {
    /// Number of hex characters in a digest
    pub const HEX_LEN: usize = 40;

    /// Create a hash from raw bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        ObjectHash(bytes)
    }

    /// Hash an in-memory buffer
    pub fn digest(data: &[u8]) -> Self {
        ObjectHash(Sha1::digest(data).into())
    }

    /// Hash everything remaining in a reader
    pub fn digest_reader<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        let mut hasher = Sha1::new();
        std::io::copy(reader, &mut hasher)?;
        Ok(ObjectHash(hasher.finalize().into()))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 40-character hex string
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.len() != Self::HEX_LEN {
            return Err(crate::Error::InvalidHash(s.to_string()));
        }
        let mut arr = [0u8; 20];
        hex::decode_to_slice(s, &mut arr).map_err(|_| crate::Error::InvalidHash(s.to_string()))?;
        Ok(ObjectHash(arr))
    }

    /// Split the hex digest into its shard directory and file name
    pub fn shard(&self) -> (String, String) {
        let mut hex = self.to_hex();
        let rest = hex.split_off(2);
        (hex, rest)
    }

    /// Get a short prefix for display (first 7 chars, like git)
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHash({})", self.short())
    }
}

impl FromStr for ObjectHash {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        ObjectHash::from_hex(s)
    }
}

impl AsRef<[u8]> for ObjectHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ObjectHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ObjectHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
