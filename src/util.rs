//! Text decoding, escaping, and media-type helpers.

use std::borrow::Cow;
use std::cmp::Ordering;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in old ebooks)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = WINDOWS_1252.decode(bytes);
    result
}

/// Decode an archive entry, using its XML declaration as the encoding hint.
pub fn decode_document(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// A decoded document that can be written back in the encoding it came in.
///
/// Rewriting only substitutes ASCII references, so encoding the edited text
/// with the same encoding (and BOM) leaves every other byte as it was.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub text: String,
    pub encoding: &'static Encoding,
    pub bom: bool,
}

impl SourceText {
    /// Decode with the same fallbacks as [`decode_text`], remembering the
    /// encoding actually used. A BOM wins over everything else.
    pub fn decode(bytes: &[u8]) -> Self {
        if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
            let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
            return Self {
                text: text.into_owned(),
                encoding,
                bom: true,
            };
        }

        let (text, malformed) = UTF_8.decode_without_bom_handling(bytes);
        if !malformed {
            return Self {
                text: text.into_owned(),
                encoding: UTF_8,
                bom: false,
            };
        }

        // A declaration readable as ASCII rules out UTF-16
        let encoding = extract_xml_encoding(bytes)
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .filter(|encoding| encoding.output_encoding() == *encoding)
            .unwrap_or(WINDOWS_1252);
        let (text, _) = encoding.decode_without_bom_handling(bytes);
        Self {
            text: text.into_owned(),
            encoding,
            bom: false,
        }
    }

    /// Encode `text` the way the original bytes were encoded.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() + 3);

        if self.encoding == UTF_16LE || self.encoding == UTF_16BE {
            let little = self.encoding == UTF_16LE;
            if self.bom {
                out.extend_from_slice(if little { b"\xFF\xFE" } else { b"\xFE\xFF" });
            }
            for unit in text.encode_utf16() {
                let pair = if little { unit.to_le_bytes() } else { unit.to_be_bytes() };
                out.extend_from_slice(&pair);
            }
            return out;
        }

        if self.bom {
            out.extend_from_slice(b"\xEF\xBB\xBF");
        }
        let (bytes, _, _) = self.encoding.encode(text);
        out.extend_from_slice(&bytes);
        out
    }
}

/// Extract encoding from XML declaration.
///
/// Parses `<?xml ... encoding="..." ?>` within the first 100 bytes.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let (&quote, rest) = after_enc.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = rest.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[..value_end]).ok()
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Media type for a file, chosen by its (case-insensitive) extension.
pub fn media_type(filename: &str) -> &'static str {
    let ext = crate::path::extension(filename);
    match ext.as_str() {
        "xhtml" | "html" | "htm" | "xml" => "application/xhtml+xml",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ncx" => "application/x-dtbncx+xml",
        _ => "application/octet-stream",
    }
}

/// Compare two file names so that embedded numbers sort numerically
/// (`Vol 2.epub` before `Vol 10.epub`). Letters compare case-insensitively.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ka = natural_key(a);
    let kb = natural_key(b);
    ka.cmp(&kb)
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum KeyPart {
    // Numbers sort before text, mirroring how a split on digit runs lines up.
    Num(u128, usize),
    Text(String),
}

fn natural_key(name: &str) -> Vec<KeyPart> {
    let lower = name.to_lowercase();
    let mut parts = Vec::new();
    let mut chars = lower.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let is_digit = c.is_ascii_digit();
        let mut end = start;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_ascii_digit() != is_digit {
                break;
            }
            end = i + c.len_utf8();
            chars.next();
        }
        let run = &lower[start..end];
        if is_digit {
            // Leading-zero width breaks ties so "01" and "1" stay distinct.
            let value = run.parse::<u128>().unwrap_or(u128::MAX);
            parts.push(KeyPart::Num(value, run.len()));
        } else {
            parts.push(KeyPart::Text(run.to_string()));
        }
    }

    parts
}
