//! Article URL rewriter (spec §4.3), grounded on
//! `original_source/src/warc2zim/url_rewriting.py`'s `ArticleUrlRewriter`.

use std::collections::HashSet;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::http_url::HttpUrl;
use super::zim_path::ZimPath;

/// Schemes that never resolve to an archive entry and are passed through
/// unchanged (step 1 of `rewrite`).
const NON_FETCH_SCHEMES: &[&str] = &["data:", "blob:", "mailto:", "tel:", "javascript:", "about:"];

/// Safe-for-transport encode set matching Python's `quote(normalized,
/// safe="/#")`: everything except RFC3986 unreserved characters (letters,
/// digits, `-_.~`) and the caller's extra-safe `/`/`#` gets percent-encoded,
/// so a literal `?`/`=`/`&` inside an archive path can never be mistaken for
/// a real query component by a browser.
const ARTICLE_SAFE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'#')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub struct ArticleUrlRewriter<'a> {
    document_url: &'a HttpUrl,
    /// Directory component of the document's own archive path (posix-style,
    /// no leading/trailing slash).
    base_segments: Vec<String>,
    known_paths: &'a HashSet<ZimPath>,
}

impl<'a> ArticleUrlRewriter<'a> {
    pub fn new(document_url: &'a HttpUrl, known_paths: &'a HashSet<ZimPath>) -> Self {
        let own_path = ZimPath::normalize(document_url);
        let base_segments = dirname_segments(own_path.as_str());
        Self { document_url, base_segments, known_paths }
    }

    /// Steps 1-3: resolve and normalise, without checking `rewrite_all` or
    /// the known-paths set, and without making the result relative.
    pub fn get_item_path(&self, u: &str, base_href: Option<&str>) -> Option<ZimPath> {
        if is_non_fetch(u) {
            return None;
        }
        let resolved = self.resolve(u, base_href)?;
        Some(ZimPath::normalize(&resolved))
    }

    /// Full `rewrite` operation (spec §4.3).
    pub fn rewrite(&self, u: &str, base_href: Option<&str>, rewrite_all: bool) -> String {
        if is_non_fetch(u) {
            return u.to_string();
        }
        let Some(resolved) = self.resolve(u, base_href) else {
            return u.to_string();
        };
        let target = ZimPath::normalize(&resolved);

        if rewrite_all || self.known_paths.contains(&target) {
            self.make_relative(&target)
        } else {
            log::debug!("leaving {u} unrewritten: not in known-paths set and rewrite_all=false");
            u.to_string()
        }
    }

    fn resolve(&self, u: &str, base_href: Option<&str>) -> Option<HttpUrl> {
        let anchor = match base_href {
            Some(href) => HttpUrl::parse(href).ok()?,
            None => self.document_url.clone(),
        };
        let joined = anchor.join(u).ok()?;
        HttpUrl::parse(joined.as_str()).ok()
    }

    fn make_relative(&self, target: &ZimPath) -> String {
        let trailing_slash = target.as_str().ends_with('/');
        let (path_part, query_part) = match target.as_str().split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target.as_str(), None),
        };
        let target_segments: Vec<&str> =
            path_part.trim_end_matches('/').split('/').filter(|s| !s.is_empty()).collect();

        let common = target_segments
            .iter()
            .zip(self.base_segments.iter())
            .take_while(|(a, b)| **a == b.as_str())
            .count();
        let up = self.base_segments.len() - common;

        let mut parts: Vec<String> = std::iter::repeat("..".to_string()).take(up).collect();
        parts.extend(target_segments[common..].iter().map(|s| s.to_string()));

        let mut rel = if parts.is_empty() { ".".to_string() } else { parts.join("/") };
        // The bare-dot case (link to the document's own directory) stays
        // "." rather than "./", even when the target path ends in "/".
        if trailing_slash && rel != "." && !rel.ends_with('/') {
            rel.push('/');
        }
        if let Some(q) = query_part {
            rel.push('?');
            rel.push_str(q);
        }

        utf8_percent_encode(&rel, ARTICLE_SAFE_SET).to_string()
    }
}

fn is_non_fetch(u: &str) -> bool {
    let lower = u.trim_start();
    NON_FETCH_SCHEMES.iter().any(|s| lower.len() >= s.len() && lower[..s.len()].eq_ignore_ascii_case(s))
}

/// posixpath.dirname-equivalent, returned as path segments (no leading/
/// trailing slash, no host-vs-path distinction — the host is segment 0).
fn dirname_segments(path: &str) -> Vec<String> {
    let without_query = path.split('?').next().unwrap_or(path);
    let dir = match without_query.rfind('/') {
        Some(idx) => &without_query[..idx],
        None => "",
    };
    dir.split('/').filter(|s| !s.is_empty()).map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(paths: &[&str]) -> HashSet<ZimPath> {
        paths.iter().map(|p| ZimPath::from_static(p.to_string())).collect()
    }

    #[test]
    fn non_fetch_schemes_pass_through() {
        let doc = HttpUrl::parse("https://kiwix.org/").unwrap();
        let k = known(&["kiwix.org/"]);
        let rw = ArticleUrlRewriter::new(&doc, &k);
        assert_eq!(rw.rewrite("data:text/plain,hi", None, true), "data:text/plain,hi");
        assert_eq!(rw.rewrite("mailto:a@b.com", None, true), "mailto:a@b.com");
    }

    #[test]
    fn scenario_1_cross_host_anchor_not_in_rewrite_all() {
        let doc = HttpUrl::parse("https://kiwix.org/").unwrap();
        let k = known(&["kiwix.org/", "exemple.com/a/long/path"]);
        let rw = ArticleUrlRewriter::new(&doc, &k);
        let out = rw.rewrite("http://exemple.com/a/long/path", None, false);
        assert_eq!(out, "../exemple.com/a/long/path");
    }

    #[test]
    fn scenario_2_css_style_url_same_host() {
        let doc = HttpUrl::parse("https://kiwix.org/article").unwrap();
        let k = known(&["kiwix.org/super/img"]);
        let rw = ArticleUrlRewriter::new(&doc, &k);
        let out = rw.rewrite("http://kiwix.org/super/img", None, true);
        assert_eq!(out, "super/img");
    }

    #[test]
    fn scenario_4_js_module_specifier_three_levels_up() {
        let doc = HttpUrl::parse("https://exemple.com/some/path/").unwrap();
        let k = known(&["example.com/file.js"]);
        let rw = ArticleUrlRewriter::new(&doc, &k);
        let out = rw.rewrite("https://example.com/file.js", None, true);
        assert_eq!(out, "../../../example.com/file.js");
    }

    #[test]
    fn own_directory_becomes_dot() {
        let doc = HttpUrl::parse("https://kiwix.org/dir/page").unwrap();
        let k = known(&["kiwix.org/dir/"]);
        let rw = ArticleUrlRewriter::new(&doc, &k);
        assert_eq!(rw.rewrite("https://kiwix.org/dir/", None, true), ".");
    }

    #[test]
    fn query_characters_are_percent_encoded_in_relative_path() {
        let doc = HttpUrl::parse("https://kiwix.org/").unwrap();
        let k = known(&["kiwix.org/"]);
        let rw = ArticleUrlRewriter::new(&doc, &k);
        let out = rw.rewrite("http://kiwix.org/foo.html?foo=bar", None, true);
        assert_eq!(out, "foo.html%3Ffoo%3Dbar");
    }

    #[test]
    fn not_in_known_paths_and_rewrite_all_false_is_unchanged() {
        let doc = HttpUrl::parse("https://kiwix.org/").unwrap();
        let k = known(&["kiwix.org/"]);
        let rw = ArticleUrlRewriter::new(&doc, &k);
        let out = rw.rewrite("http://elsewhere.com/page", None, false);
        assert_eq!(out, "http://elsewhere.com/page");
    }
}
