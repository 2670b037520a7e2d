//! Character encoding detection for content documents.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// How many leading bytes are searched for a declared charset.
const SNIFF_LEN: usize = 1024;

/// Guess the encoding of a content document from its raw bytes.
///
/// Checked in order:
/// 1. a byte order mark
/// 2. well-formed UTF-8
/// 3. the XML declaration (`<?xml ... encoding="..."?>`)
/// 4. an HTML `<meta charset>` or `http-equiv` content type
///
/// Anything else is treated as Windows-1252, which is common in old ebooks
/// and decodes every byte.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }

    if let Some(label) = extract_xml_encoding(bytes).or_else(|| extract_meta_charset(bytes))
        && let Some(encoding) = Encoding::for_label(label.as_bytes())
    {
        return encoding;
    }

    WINDOWS_1252
}

/// Decode a content document, usually with the result of [`detect_encoding`].
///
/// A BOM overrides `encoding`. Uses `Cow<str>` to avoid allocation when the
/// input is valid UTF-8.
pub fn decode_document<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Cow<'a, str> {
    let (text, used, malformed) = encoding.decode(bytes);
    if malformed {
        log::debug!("document is not clean {}; replaced bad sequences", used.name());
    }
    text
}

/// Extract encoding from XML declaration.
fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    // The declaration must sit at the very start of the document
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];
    let decl_end = after_xml
        .windows(2)
        .position(|w| w == b"?>")
        .unwrap_or(after_xml.len());
    let decl = &after_xml[..decl_end];

    let enc_pos = decl
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    quoted_value(&decl[enc_pos + 9..])
}

/// Extract `charset=` from an HTML meta element near the top of the file.
fn extract_meta_charset(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(SNIFF_LEN)];

    let pos = prefix
        .windows(8)
        .position(|w| w.eq_ignore_ascii_case(b"charset="))?;
    let rest = &prefix[pos + 8..];

    match rest.first() {
        Some(b'"') | Some(b'\'') => quoted_value(rest),
        _ => {
            let end = rest
                .iter()
                .position(|&b| {
                    matches!(b, b'"' | b'\'' | b';' | b'>' | b'/') || b.is_ascii_whitespace()
                })
                .unwrap_or(rest.len());
            std::str::from_utf8(&rest[..end]).ok().filter(|s| !s.is_empty())
        }
    }
}

fn quoted_value(bytes: &[u8]) -> Option<&str> {
    let (&quote, rest) = bytes.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = rest.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[..end]).ok().filter(|s| !s.is_empty())
}
