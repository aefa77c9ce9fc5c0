//! Encoding decoder (spec §4.1), grounded on
//! `original_source/src/warc2zim/utils.py`'s `to_string`/`ENCODING_RE`.
//!
//! Named-charset decoding uses `encoding_rs` (the WHATWG charset decoder used
//! throughout the Rust ecosystem, already relied on transitively via
//! `html5ever`); statistical detection uses `chardetng`, `encoding_rs`'s
//! companion crate and the Rust-ecosystem analogue of Python's `chardet`.

use std::sync::LazyLock;

use regex::Regex;

/// Result of decoding a record's payload to text.
pub struct DecodedText {
    pub text: String,
    pub encoding_used: Option<&'static str>,
    pub had_to_drop_bytes: bool,
}

static CHARSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:charset|encoding)\s*=\s*"?([A-Za-z0-9_-]+)"?"#).unwrap());

/// Decode `bytes` to text following the ordered fallback chain in §4.1.
/// `hinted_charset` comes from the record's `Content-Type` header, if any.
/// `fallback_charsets` is a caller-provided ordered list (e.g. `["utf-8", "windows-1252"]`).
pub fn to_string(
    bytes: &[u8],
    hinted_charset: Option<&str>,
    fallback_charsets: &[&str],
) -> Result<DecodedText, anyhow::Error> {
    // 1. Already text: a quick UTF-8 validity check covers "already text"
    //    for byte slices that originated as `String` in test/driver code.
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Ok(DecodedText { text: s.to_string(), encoding_used: Some("utf-8"), had_to_drop_bytes: false });
    }

    // 2. Empty input.
    if bytes.is_empty() {
        return Ok(DecodedText { text: String::new(), encoding_used: None, had_to_drop_bytes: false });
    }

    // 3. Hinted charset, strict.
    if let Some(name) = hinted_charset {
        if let Some(text) = strict_decode(bytes, name) {
            return Ok(DecodedText { text, encoding_used: encoding_label(name), had_to_drop_bytes: false });
        }
    }

    // 4. Scan the first 1024 bytes, ASCII-with-replacement, for charset=/encoding=.
    let scan_window = &bytes[..bytes.len().min(1024)];
    let ascii_scan = String::from_utf8_lossy_ascii(scan_window);
    if let Some(caps) = CHARSET_RE.captures(&ascii_scan) {
        let name = caps.get(1).unwrap().as_str();
        if let Some(text) = strict_decode(bytes, name) {
            return Ok(DecodedText { text, encoding_used: encoding_label(name), had_to_drop_bytes: false });
        }
    }

    // 5. Caller-provided ordered fallback list, strict.
    for name in fallback_charsets {
        if let Some(text) = strict_decode(bytes, name) {
            return Ok(DecodedText { text, encoding_used: encoding_label(name), had_to_drop_bytes: false });
        }
    }

    // 6. Statistical detector.
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let guessed = detector.guess(None, true);
    if let Some(text) = strict_decode(bytes, guessed.name()) {
        return Ok(DecodedText { text, encoding_used: Some(guessed.name()), had_to_drop_bytes: false });
    }

    // 7. Lossy retry of the hinted (or guessed) charset, reporting drops.
    let retry_name = hinted_charset.unwrap_or_else(|| guessed.name());
    if let Some(enc) = encoding_rs::Encoding::for_label(retry_name.as_bytes()) {
        let (text, _, had_errors) = enc.decode(bytes);
        return Ok(DecodedText { text: text.into_owned(), encoding_used: Some(enc.name()), had_to_drop_bytes: had_errors });
    }

    // 8. Exhausted every path.
    Err(anyhow::anyhow!("could not decode {} bytes as text (hint={:?})", bytes.len(), hinted_charset))
}

fn strict_decode(bytes: &[u8], name: &str) -> Option<String> {
    let enc = encoding_rs::Encoding::for_label(name.as_bytes())?;
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

fn encoding_label(name: &str) -> Option<&'static str> {
    encoding_rs::Encoding::for_label(name.as_bytes()).map(|e| e.name())
}

trait AsciiLossy {
    fn from_utf8_lossy_ascii(bytes: &[u8]) -> String;
}

impl AsciiLossy for String {
    fn from_utf8_lossy_ascii(bytes: &[u8]) -> String {
        bytes.iter().map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER }).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_input_passes_through() {
        let d = to_string("héllo".as_bytes(), None, &[]).unwrap();
        assert_eq!(d.text, "héllo");
        assert!(!d.had_to_drop_bytes);
    }

    #[test]
    fn empty_input_is_empty() {
        let d = to_string(&[], None, &[]).unwrap();
        assert_eq!(d.text, "");
        assert_eq!(d.encoding_used, None);
    }

    #[test]
    fn hinted_latin1_decodes_strictly() {
        let bytes = vec![0xe9]; // 'é' in Latin-1, not valid UTF-8 alone.
        let d = to_string(&bytes, Some("iso-8859-1"), &[]).unwrap();
        assert_eq!(d.text, "é");
        assert!(!d.had_to_drop_bytes);
    }

    #[test]
    fn declared_charset_in_meta_is_found() {
        let mut bytes = b"<html><head><meta charset=\"windows-1252\">".to_vec();
        bytes.push(0x93); // left double quote in windows-1252, invalid UTF-8 alone.
        bytes.extend_from_slice(b"</head></html>");
        let d = to_string(&bytes, None, &[]).unwrap();
        assert!(!d.had_to_drop_bytes);
        assert!(d.text.contains('\u{201C}'));
    }

    #[test]
    fn fallback_list_is_tried_in_order() {
        let bytes = vec![0xe9];
        let d = to_string(&bytes, None, &["utf-8", "iso-8859-1"]).unwrap();
        assert_eq!(d.text, "é");
    }
}
