//! Byte-pattern content sniffing
//!
//! Signatures are tried in order against the first [`SNIFF_LEN`] bytes; the
//! first match wins. Data that matches nothing is plain text when it has no
//! binary control bytes, otherwise `application/octet-stream`.

/// Bytes examined when sniffing
pub const SNIFF_LEN: usize = 512;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

enum Signature {
    /// Literal prefix, optionally after leading whitespace
    Exact {
        pattern: &'static [u8],
        skip_ws: bool,
        mime: &'static str,
    },
    /// `data & mask == pattern` over the prefix
    Masked {
        mask: &'static [u8],
        pattern: &'static [u8],
        mime: &'static str,
    },
    /// Case-insensitive opening tag after whitespace, terminated by ` ` or `>`
    Tag {
        pattern: &'static [u8],
        mime: &'static str,
    },
    /// ISO base media file (`ftyp` box); brand decides the type
    Ftyp,
    /// No binary control bytes at all
    Text,
}

const HTML: &str = "text/html; charset=utf-8";

const fn html(pattern: &'static [u8]) -> Signature {
    Signature::Tag {
        pattern,
        mime: HTML,
    }
}

const fn exact(pattern: &'static [u8], mime: &'static str) -> Signature {
    Signature::Exact {
        pattern,
        skip_ws: false,
        mime,
    }
}

const RIFF_MASK: &[u8] = b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF";

static SIGNATURES: &[Signature] = &[
    html(b"<!DOCTYPE HTML"),
    html(b"<HTML"),
    html(b"<HEAD"),
    html(b"<SCRIPT"),
    html(b"<IFRAME"),
    html(b"<H1"),
    html(b"<DIV"),
    html(b"<FONT"),
    html(b"<TABLE"),
    html(b"<A"),
    html(b"<STYLE"),
    html(b"<TITLE"),
    html(b"<B"),
    html(b"<BODY"),
    html(b"<BR"),
    html(b"<P"),
    html(b"<!--"),
    Signature::Tag {
        pattern: b"<SVG",
        mime: "image/svg+xml",
    },
    Signature::Exact {
        pattern: b"<?xml",
        skip_ws: true,
        mime: "text/xml; charset=utf-8",
    },
    exact(b"%PDF-", "application/pdf"),
    exact(b"%!PS-Adobe-", "application/postscript"),
    // byte order marks
    exact(b"\xFE\xFF", "text/plain; charset=utf-16be"),
    exact(b"\xFF\xFE", "text/plain; charset=utf-16le"),
    exact(b"\xEF\xBB\xBF", TEXT_PLAIN),
    // images
    exact(b"\x00\x00\x01\x00", "image/x-icon"),
    exact(b"\x00\x00\x02\x00", "image/x-icon"),
    exact(b"BM", "image/bmp"),
    exact(b"GIF87a", "image/gif"),
    exact(b"GIF89a", "image/gif"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
        mime: "image/webp",
    },
    exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    exact(b"\xFF\xD8\xFF", "image/jpeg"),
    // audio and video
    Signature::Masked {
        mask: RIFF_MASK,
        pattern: b"FORM\x00\x00\x00\x00AIFF",
        mime: "audio/aiff",
    },
    exact(b"ID3", "audio/mpeg"),
    exact(b"OggS\x00", "application/ogg"),
    exact(b"MThd\x00\x00\x00\x06", "audio/midi"),
    Signature::Masked {
        mask: RIFF_MASK,
        pattern: b"RIFF\x00\x00\x00\x00AVI ",
        mime: "video/avi",
    },
    Signature::Masked {
        mask: RIFF_MASK,
        pattern: b"RIFF\x00\x00\x00\x00WAVE",
        mime: "audio/wave",
    },
    Signature::Ftyp,
    exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    // fonts
    exact(b"\x00\x01\x00\x00", "font/ttf"),
    exact(b"OTTO", "font/otf"),
    exact(b"ttcf", "font/collection"),
    exact(b"wOFF", "font/woff"),
    exact(b"wOF2", "font/woff2"),
    // archives
    exact(b"\x1F\x8B\x08", "application/x-gzip"),
    exact(b"PK\x03\x04", "application/zip"),
    exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    exact(b"\x00asm", "application/wasm"),
    Signature::Text,
];

/// Determine the MIME type of `data` from its leading bytes.
///
/// Only the first [`SNIFF_LEN`] bytes are considered. Never fails; unknown
/// binary data is `application/octet-stream`.
pub fn sniff(data: &[u8]) -> &'static str {
    let data = &data[..data.len().min(SNIFF_LEN)];
    let first_non_ws = data
        .iter()
        .position(|b| !is_ws(*b))
        .unwrap_or(data.len());

    SIGNATURES
        .iter()
        .find_map(|sig| sig.matches(data, first_non_ws))
        .unwrap_or(OCTET_STREAM)
}

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> Option<&'static str> {
        match self {
            Signature::Exact {
                pattern,
                skip_ws,
                mime,
            } => {
                let data = if *skip_ws { &data[first_non_ws..] } else { data };
                data.starts_with(pattern).then_some(*mime)
            }
            Signature::Masked {
                mask,
                pattern,
                mime,
            } => {
                if data.len() < pattern.len() {
                    return None;
                }
                data.iter()
                    .zip(mask.iter())
                    .zip(pattern.iter())
                    .all(|((d, m), p)| d & m == *p)
                    .then_some(*mime)
            }
            Signature::Tag { pattern, mime } => {
                let data = &data[first_non_ws..];
                if data.len() < pattern.len() + 1 {
                    return None;
                }
                let head_matches = data
                    .iter()
                    .zip(pattern.iter())
                    .all(|(d, p)| d.to_ascii_uppercase() == *p);
                let terminated = matches!(data[pattern.len()], b' ' | b'>');
                (head_matches && terminated).then_some(*mime)
            }
            Signature::Ftyp => sniff_ftyp(data),
            Signature::Text => (!data.iter().any(|b| is_binary(*b))).then_some(TEXT_PLAIN),
        }
    }
}

/// Classify an ISO-BMFF file by the brands listed in its `ftyp` box
fn sniff_ftyp(data: &[u8]) -> Option<&'static str> {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return None;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size < 12 || box_size % 4 != 0 || data.len() < box_size {
        return None;
    }

    // major brand at 8..12, minor version at 12..16, compatible brands after
    let brands = std::iter::once(&data[8..12])
        .chain(data[16.min(box_size)..box_size].chunks_exact(4));

    let mut is_mp4 = false;
    for brand in brands {
        match brand {
            b"avif" | b"avis" => return Some("image/avif"),
            b if b.starts_with(b"mp4") => is_mp4 = true,
            _ => {}
        }
    }
    is_mp4.then_some("video/mp4")
}

fn is_ws(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_binary(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
