//! Content classification
//!
//! Objects carry no file name, so their type is inferred from a short
//! prefix of their bytes. The type decides whether a reader gets the
//! content inline (plain text) or a reference to the object.

mod sniff;

pub use sniff::{sniff, OCTET_STREAM, SNIFF_LEN, TEXT_PLAIN};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

/// Image types a client can render directly from a link
pub const IMAGE_TYPES: &[&str] = &[
    "image/avif",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/svg+xml",
    "image/webp",
];

/// A sniffed MIME type, possibly with parameters (`text/plain; charset=utf-8`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentType(String);

impl ContentType {
    pub fn new(mime: impl Into<String>) -> Self {
        ContentType(mime.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The media type without parameters, lowercased
    pub fn essence(&self) -> String {
        match self.0.parse::<mime::Mime>() {
            Ok(parsed) => parsed.essence_str().to_string(),
            Err(_) => self
                .0
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase(),
        }
    }

    /// Same type with parameters stripped
    pub fn without_params(&self) -> ContentType {
        ContentType(self.essence())
    }

    /// Plain text, in any charset
    pub fn is_text(&self) -> bool {
        self.0.starts_with("text/plain")
    }

    pub fn is_image(&self) -> bool {
        let essence = self.essence();
        IMAGE_TYPES.contains(&essence.as_str())
    }

    /// The `charset` parameter, lowercased
    pub fn charset(&self) -> Option<String> {
        let parsed = self.0.parse::<mime::Mime>().ok()?;
        parsed
            .get_param(mime::CHARSET)
            .map(|charset| charset.as_str().to_ascii_lowercase())
    }

    /// Decode text content in this type's charset.
    ///
    /// UTF-16 is decoded by its byte order and keeps its BOM as U+FEFF.
    /// Anything else is read as UTF-8. Undecodable sequences become
    /// U+FFFD, so bytes round-trip only when they are valid in the charset.
    pub fn decode(&self, raw: &[u8]) -> String {
        match self.charset().as_deref() {
            Some("utf-16le") => decode_utf16(raw, u16::from_le_bytes),
            Some("utf-16be") => decode_utf16(raw, u16::from_be_bytes),
            _ => String::from_utf8_lossy(raw).into_owned(),
        }
    }
}

fn decode_utf16(raw: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    // a dangling odd byte is not a code unit
    let units = raw.chunks(2).map(|pair| match *pair {
        [a, b] => unit([a, b]),
        _ => 0xFFFD,
    });
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentType {
    fn from(s: &str) -> Self {
        ContentType(s.to_string())
    }
}

/// Sniff the type of a stream from at most its first [`SNIFF_LEN`] bytes.
///
/// The stream is left positioned after the bytes that were read; see
/// [`classify_and_rewind`] for readers that must be consumed again.
pub fn classify<R: Read>(reader: &mut R) -> io::Result<ContentType> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    reader.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(ContentType::new(sniff(&head)))
}

/// Sniff the type, then seek back to the start of the stream
pub fn classify_and_rewind<R: Read + Seek>(reader: &mut R) -> io::Result<ContentType> {
    let content_type = classify(reader)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(content_type)
}
