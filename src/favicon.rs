//! Favicon / illustration extraction (spec §4.10, §6), grounded on
//! `original_source/src/warc2zim/main.py`'s `find_icon_and_language` and
//! `retrieve_illustration`/`convert_illustration`.

use std::sync::LazyLock;
use std::time::Duration;

use image::imageops::FilterType;
use regex::Regex;

use crate::error::{ConverterError, ConverterResult};

static SHORTCUT_ICON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*rel\s*=\s*["']?shortcut icon["']?[^>]*href\s*=\s*["']([^"'>\s]+)["']"#).unwrap()
});

static ICON_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<link\b[^>]*rel\s*=\s*["']?icon["']?[^>]*href\s*=\s*["']([^"'>\s]+)["']"#).unwrap());

use crate::statics::FALLBACK_FAVICON_PNG;

/// `shortcut icon` → `icon` → `/favicon.ico` path guess (spec §4.10).
pub fn find_icon_href(html: &str) -> Option<String> {
    SHORTCUT_ICON
        .captures(html)
        .or_else(|| ICON_LINK.captures(html))
        .map(|c| c.get(1).unwrap().as_str().to_string())
        .or_else(|| Some("/favicon.ico".to_string()))
}

/// Resolve the main page's favicon: look it up among already-seen WARC
/// records first, fall back to a short, timeout-bounded live download, and
/// finally the bundled fallback PNG (spec §7 `FaviconUnavailable` ⇒ fall
/// back rather than propagate).
pub fn retrieve_illustration(
    icon_url: &str,
    warc_lookup: impl Fn(&str) -> Option<Vec<u8>>,
) -> Vec<u8> {
    if let Some(bytes) = warc_lookup(icon_url) {
        return bytes;
    }
    match download_live(icon_url) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("favicon live download failed for {icon_url}: {e}");
            FALLBACK_FAVICON_PNG.to_vec()
        }
    }
}

/// Boundary-only network sidecar (spec §5): a short-lived `tokio` runtime
/// spun up just for this one timeout-bounded fetch, not the program's
/// execution model.
fn download_live(url: &str) -> Result<Vec<u8>, anyhow::Error> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        let resp = client.get(url).send().await?;
        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    })
}

/// Resize to the 48x48 PNG ZIM illustration expects.
pub fn convert_illustration(bytes: &[u8]) -> ConverterResult<Vec<u8>> {
    let img = image::load_from_memory(bytes).map_err(|e| ConverterError::Other(anyhow::anyhow!("decoding illustration: {e}")))?;
    let resized = img.resize_exact(48, 48, FilterType::Lanczos3);
    let mut out = Vec::new();
    resized
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| ConverterError::Other(anyhow::anyhow!("encoding illustration: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_shortcut_icon_over_icon() {
        let html = r#"<link rel="icon" href="/a.png"><link rel="shortcut icon" href="/b.png">"#;
        assert_eq!(find_icon_href(html).as_deref(), Some("/b.png"));
    }

    #[test]
    fn falls_back_to_plain_icon() {
        let html = r#"<link rel="icon" href="/a.png">"#;
        assert_eq!(find_icon_href(html).as_deref(), Some("/a.png"));
    }

    #[test]
    fn falls_back_to_favicon_ico_guess() {
        let html = "<html><head></head></html>";
        assert_eq!(find_icon_href(html).as_deref(), Some("/favicon.ico"));
    }

    #[test]
    fn warc_lookup_hit_skips_network() {
        let bytes = retrieve_illustration("/favicon.ico", |_| Some(vec![1, 2, 3]));
        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
