//! Language detection from the elected main page (spec §4.10, §6), grounded
//! on `original_source/src/warc2zim/main.py`'s `find_icon_and_language`.

use std::sync::LazyLock;

use regex::Regex;

static HTML_LANG_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<html\b[^>]*\blang\s*=\s*["']?([a-zA-Z-]+)"#).unwrap());

static META_HTTP_EQUIV_LANG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta\b[^>]*http-equiv\s*=\s*["']?content-language["']?[^>]*content\s*=\s*["']?([a-zA-Z-]+)"#)
        .unwrap()
});

static META_NAME_LANG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<meta\b[^>]*name\s*=\s*["']?language["']?[^>]*content\s*=\s*["']?([a-zA-Z-]+)"#).unwrap()
});

/// `<html lang>` → `<meta http-equiv=content-language>` → `<meta name=language>`.
pub fn detect_language(html: &str) -> Option<String> {
    HTML_LANG_ATTR
        .captures(html)
        .or_else(|| META_HTTP_EQUIV_LANG.captures(html))
        .or_else(|| META_NAME_LANG.captures(html))
        .map(|c| c.get(1).unwrap().as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_html_lang_attribute() {
        let html = r#"<html lang="fr"><head><meta http-equiv="content-language" content="en"></head></html>"#;
        assert_eq!(detect_language(html).as_deref(), Some("fr"));
    }

    #[test]
    fn falls_back_to_http_equiv_meta() {
        let html = r#"<html><head><meta http-equiv="content-language" content="de"></head></html>"#;
        assert_eq!(detect_language(html).as_deref(), Some("de"));
    }

    #[test]
    fn falls_back_to_meta_name_language() {
        let html = r#"<html><head><meta name="language" content="es"></head></html>"#;
        assert_eq!(detect_language(html).as_deref(), Some("es"));
    }

    #[test]
    fn no_hints_returns_none() {
        assert_eq!(detect_language("<html><head></head></html>"), None);
    }
}
