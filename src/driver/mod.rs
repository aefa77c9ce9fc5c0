//! Two-pass driver (spec §4.10), grounded on
//! `original_source/src/warc2zim/converter.py`'s `Converter`.

pub mod progress;

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Config;
use crate::error::{ConverterError, ConverterResult};
use crate::favicon;
use crate::language;
use crate::rewrite::{self, RewriteContext};
use crate::statics;
use crate::url::{ArticleUrlRewriter, HttpUrl, ZimPath};
use crate::warc::{RecordType, WarcRecord, WarcReader};
use crate::zim::{DirectoryZimWriter, ItemHints, ZimMetadata, ZimWriter};
use progress::ProgressReporter;

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

/// Archive path (under `_zim_static/`) the resolved `--custom-css` is
/// written to.
const CUSTOM_CSS_ASSET: &str = "custom.css";

struct DiscoveryResult {
    known_paths: HashSet<ZimPath>,
    main_record_index: Option<usize>,
    title: Option<String>,
    language: Option<String>,
}

pub struct Converter {
    config: Config,
}

impl Converter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self) -> ConverterResult<()> {
        crate::zim::probe_output_writable(&self.config.output)?;

        let reader = WarcReader::new(&self.config.inputs)?;
        let records: Vec<WarcRecord> = reader.records().collect::<Result<_, _>>()?;

        self.convert(records)
    }

    fn convert(&self, records: Vec<WarcRecord>) -> ConverterResult<()> {
        let discovery = self.discover(&records)?;
        let Some(main_index) = discovery.main_record_index else { return Err(ConverterError::NoMainPage) };

        let main_record = &records[main_index];
        let main_url = HttpUrl::parse(&main_record.target_uri)
            .map_err(|e| ConverterError::Other(anyhow::anyhow!("invalid main page URL: {e}")))?;
        let main_path = ZimPath::normalize(&main_url);

        let title = self.config.title.clone().or(discovery.title).unwrap_or_else(|| self.config.name.clone());
        let language = self.config.lang.clone().or(discovery.language).unwrap_or_else(|| "eng".to_string());
        let illustration = self.elect_illustration(&records, main_index)?;

        let metadata = ZimMetadata {
            name: self.config.name.clone(),
            language,
            title,
            description: self.config.description.clone().unwrap_or_default(),
            long_description: self.config.long_description.clone(),
            creator: self.config.creator.clone(),
            publisher: self.config.publisher.clone(),
            date: self.config.date.clone(),
            tags: self.config.tags.clone(),
            source: self.config.source.clone(),
            scraper: self.config.scraper.clone(),
            illustration_48x48_png: illustration,
        };

        let custom_css = self.resolve_custom_css()?;

        let mut writer = DirectoryZimWriter::create(&self.config.output, main_path.clone(), &metadata)?;
        for (asset_path, mime, bytes) in statics::all_static_assets() {
            writer.add_item(&ZimPath::from_static(format!("{}{asset_path}", statics::STATIC_PREFIX)), mime, bytes, ItemHints::default())?;
        }
        if let Some(css_bytes) = &custom_css {
            writer.add_item(
                &ZimPath::from_static(format!("{}{CUSTOM_CSS_ASSET}", statics::STATIC_PREFIX)),
                "text/css",
                css_bytes,
                ItemHints::default(),
            )?;
        }

        let outcome = self.emit(&records, &discovery.known_paths, custom_css.is_some(), &mut writer);
        match outcome {
            Ok(()) => {
                Box::new(writer).finish()?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn discover(&self, records: &[WarcRecord]) -> ConverterResult<DiscoveryResult> {
        let mut known_paths = HashSet::new();
        let mut main_record_index = None;

        for (i, record) in records.iter().enumerate() {
            let Ok(url) = HttpUrl::parse(&record.target_uri) else { continue };
            known_paths.insert(ZimPath::normalize(&url));

            if main_record_index.is_some() {
                continue;
            }
            let is_configured_main = self.config.main_url.as_deref() == Some(record.target_uri.as_str());
            let is_elected_main = self.config.main_url.is_none()
                && record.record_type == RecordType::Response
                && record.http_status == Some(200)
                && record.content_type().unwrap_or_default().starts_with("text/html")
                && !record.body.is_empty();
            if is_configured_main || is_elected_main {
                main_record_index = Some(i);
            }
        }

        let (title, language) = match main_record_index {
            Some(i) => {
                let html = String::from_utf8_lossy(&records[i].body);
                (extract_title(&html), language::detect_language(&html))
            }
            None => (None, None),
        };

        Ok(DiscoveryResult { known_paths, main_record_index, title, language })
    }

    fn elect_illustration(&self, records: &[WarcRecord], main_index: usize) -> ConverterResult<Vec<u8>> {
        let html = String::from_utf8_lossy(&records[main_index].body).into_owned();
        let icon_href = self.config.favicon.clone().or_else(|| favicon::find_icon_href(&html));
        let Some(icon_href) = icon_href else { return Ok(statics::FALLBACK_FAVICON_PNG.to_vec()) };

        let raw = favicon::retrieve_illustration(&icon_href, |url| {
            records.iter().find(|r| r.target_uri == url).map(|r| r.body.clone())
        });
        favicon::convert_illustration(&raw).or_else(|_| Ok(statics::FALLBACK_FAVICON_PNG.to_vec()))
    }

    /// Resolve `--custom-css` into bytes (spec §6, §5 "boundary-only network
    /// sidecar"): an `http(s)://` source is fetched live under a short
    /// timeout, same as the favicon sidecar; anything else is read as a
    /// filesystem path.
    fn resolve_custom_css(&self) -> ConverterResult<Option<Vec<u8>>> {
        let Some(source) = &self.config.custom_css else { return Ok(None) };

        if source.starts_with("http://") || source.starts_with("https://") {
            fetch_custom_css(source)
                .map(Some)
                .map_err(|e| ConverterError::Other(anyhow::anyhow!("fetching --custom-css {source}: {e}")))
        } else {
            std::fs::read(source)
                .map(Some)
                .map_err(|e| ConverterError::Other(anyhow::anyhow!("reading --custom-css {source}: {e}")))
        }
    }

    fn emit(
        &self,
        records: &[WarcRecord],
        known_paths: &HashSet<ZimPath>,
        has_custom_css: bool,
        writer: &mut dyn ZimWriter,
    ) -> ConverterResult<()> {
        let mut emitted: HashSet<ZimPath> = HashSet::new();
        let mut pending_aliases: Vec<(ZimPath, String, ZimPath)> = Vec::new();
        let js_modules = RefCell::new(HashSet::new());
        let mut progress = ProgressReporter::new(self.config.progress_file.clone(), records.len());

        for record in records {
            let result =
                self.emit_one(record, known_paths, has_custom_css, &mut emitted, &mut pending_aliases, &js_modules, writer);
            match result {
                Ok(()) => {}
                Err(ConverterError::DuplicateEntry(p)) => log::debug!("skipping duplicate entry {p}"),
                Err(ConverterError::AliasTargetMissing { from, to }) => {
                    log::debug!("skipping alias {from} -> {to}: target never emitted")
                }
                Err(e) if self.config.continue_on_error => {
                    log::warn!("record {} failed: {e}; continuing", record.target_uri);
                    if let Some(dir) = &self.config.failed_items {
                        let _ = std::fs::create_dir_all(dir);
                    }
                }
                Err(e) => return Err(e),
            }
            progress.record_written()?;
        }

        for (from, title, to) in pending_aliases {
            if emitted.contains(&to) {
                if let Err(e) = writer.add_alias(&from, &title, &to, ItemHints::default()) {
                    log::debug!("alias flush skipped: {e}");
                }
            } else {
                log::debug!("alias target {to} was never emitted; dropping alias from {from}");
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_one(
        &self,
        record: &WarcRecord,
        known_paths: &HashSet<ZimPath>,
        has_custom_css: bool,
        emitted: &mut HashSet<ZimPath>,
        pending_aliases: &mut Vec<(ZimPath, String, ZimPath)>,
        js_modules: &RefCell<HashSet<ZimPath>>,
        writer: &mut dyn ZimWriter,
    ) -> ConverterResult<()> {
        let Ok(target_url) = HttpUrl::parse(&record.target_uri) else { return Ok(()) };
        let target_path = ZimPath::normalize(&target_url);

        if !self.config.include_domains.is_empty() {
            let host = target_url.host().unwrap_or_default();
            if !self.config.include_domains.iter().any(|d| host == d || host.ends_with(&format!(".{d}"))) {
                return Ok(());
            }
        }

        if record.record_type == RecordType::Revisit {
            if let Some(refers_to) = &record.refers_to_target_uri {
                if refers_to != &record.target_uri {
                    if let Ok(refers_url) = HttpUrl::parse(refers_to) {
                        let to_path = ZimPath::normalize(&refers_url);
                        let title = extract_title(&String::from_utf8_lossy(&record.body)).unwrap_or_default();
                        pending_aliases.push((target_path, title, to_path));
                    }
                }
            }
            return Ok(());
        }

        if emitted.contains(&target_path) {
            return Err(ConverterError::DuplicateEntry(target_path));
        }

        if is_self_redirect(record, &target_url) {
            return Ok(());
        }

        let article_url = ArticleUrlRewriter::new(&target_url, known_paths);
        let static_prefix = rewrite::dispatch::rel_static_prefix(&article_url);
        let ctx = RewriteContext::new(&article_url, js_modules, &static_prefix);

        let mime = record.content_type().unwrap_or("application/octet-stream").to_string();
        let method = record.http_method.clone().unwrap_or_else(|| "GET".to_string());
        let host = target_url.host().unwrap_or_default().to_string();
        let path = target_url.path().to_string();
        let query = target_url.query().map(|q| q.to_string());
        let is_module = ctx.is_js_module(&target_path);

        let bytes = match rewrite::get_rewrite_mode(&mime, &method, &path, query.as_deref()) {
            Some(mode) => {
                let hinted_charset = mime_charset_param(&mime);
                let decoded = crate::encoding::to_string(&record.body, hinted_charset, &["utf-8", "windows-1252"])
                    .map_err(|e| ConverterError::DecodeError { url: record.target_uri.clone(), source: e })?;
                let mut rewritten = rewrite::rewrite_body(
                    mode,
                    &decoded.text,
                    &host,
                    &path,
                    query.as_deref(),
                    None,
                    is_module,
                    &ctx,
                );
                if mode == rewrite::RewriteMode::Html {
                    let custom_css_href = has_custom_css.then(|| format!("{static_prefix}{CUSTOM_CSS_ASSET}"));
                    rewritten = self.inject_head(
                        rewritten,
                        &target_path,
                        &static_prefix,
                        &record.target_uri,
                        target_url.scheme(),
                        &host,
                        custom_css_href.as_deref(),
                    )?;
                }
                rewritten.into_bytes()
            }
            None => record.body.clone(),
        };

        writer.add_item(&target_path, &mime, &bytes, ItemHints { is_front: mime.starts_with("text/html") })?;
        emitted.insert(target_path);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn inject_head(
        &self,
        html: String,
        path: &ZimPath,
        static_prefix: &str,
        orig_url: &str,
        orig_scheme: &str,
        orig_host: &str,
        custom_css_href: Option<&str>,
    ) -> ConverterResult<String> {
        let head_ctx =
            rewrite::HeadInsertContext { path: path.as_str(), static_prefix, orig_url, orig_scheme, orig_host, custom_css_href };
        let rendered = rewrite::render_head_insert(&head_ctx)?;
        Ok(html.replacen("<!--__WARC2ZIM_HEAD_INSERT__-->", &rendered, 1))
    }
}

/// Boundary-only network sidecar (spec §5), the same short-lived `tokio`
/// runtime pattern as `favicon::download_live`.
fn fetch_custom_css(url: &str) -> Result<Vec<u8>, anyhow::Error> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let client = reqwest::Client::builder().timeout(std::time::Duration::from_secs(10)).build()?;
        let resp = client.get(url).send().await?;
        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    })
}

fn mime_charset_param(mime: &str) -> Option<&str> {
    mime.split(';').skip(1).find_map(|part| {
        let part = part.trim();
        part.strip_prefix("charset=").map(|v| v.trim_matches('"'))
    })
}

fn extract_title(html: &str) -> Option<String> {
    TITLE_RE.captures(html).map(|c| html_escape::decode_html_entities(c.get(1).unwrap().as_str().trim()).into_owned())
}

fn is_self_redirect(record: &WarcRecord, target_url: &HttpUrl) -> bool {
    let Some(status) = record.http_status else { return false };
    if !(300..400).contains(&status) {
        return false;
    }
    let Some((_, location)) = record.http_headers.iter().find(|(k, _)| k.eq_ignore_ascii_case("location")) else {
        return false;
    };
    match target_url.join(location) {
        Ok(resolved) => resolved.as_str() == target_url.as_str(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn html_record(uri: &str, status: u16, body: &str) -> WarcRecord {
        WarcRecord {
            record_type: RecordType::Response,
            target_uri: uri.to_string(),
            refers_to_target_uri: None,
            http_status: Some(status),
            http_headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            http_method: Some("GET".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    fn base_config(output: PathBuf) -> Config {
        Config {
            inputs: vec![],
            name: "test".to_string(),
            main_url: None,
            include_domains: vec![],
            favicon: None,
            custom_css: None,
            output,
            zim_file: "test.zim".to_string(),
            title: None,
            description: None,
            long_description: None,
            tags: vec!["_ftindex:yes".to_string()],
            lang: None,
            publisher: "-".to_string(),
            creator: "-".to_string(),
            source: None,
            progress_file: None,
            scraper: "warc2zim-rs".to_string(),
            continue_on_error: false,
            failed_items: None,
            disable_metadata_checks: false,
            date: "2026-07-27".to_string(),
        }
    }

    #[test]
    fn elects_first_200_html_response_as_main_page() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(base_config(dir.path().to_path_buf()));
        let records = vec![
            html_record("https://example.com/", 200, "<html><head><title>Hi</title></head></html>"),
            html_record("https://example.com/other", 200, "<html></html>"),
        ];
        let discovery = converter.discover(&records).unwrap();
        assert_eq!(discovery.main_record_index, Some(0));
        assert_eq!(discovery.title.as_deref(), Some("Hi"));
    }

    #[test]
    fn duplicate_target_is_skipped_on_second_pass() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(base_config(dir.path().to_path_buf()));
        let records = vec![
            html_record("https://example.com/", 200, "<html></html>"),
            html_record("https://example.com/", 200, "<html></html>"),
        ];
        converter.convert(records).unwrap();
        let entries: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("entries.json")).unwrap()).unwrap();
        let article_entries = entries
            .as_array()
            .unwrap()
            .iter()
            .filter(|e| !e["path"].as_str().unwrap().starts_with(statics::STATIC_PREFIX))
            .count();
        assert_eq!(article_entries, 1);
    }

    #[test]
    fn revisit_with_differing_target_becomes_an_alias() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(base_config(dir.path().to_path_buf()));
        let revisit = WarcRecord {
            record_type: RecordType::Revisit,
            target_uri: "https://example.com/dup".to_string(),
            refers_to_target_uri: Some("https://example.com/".to_string()),
            http_status: None,
            http_headers: vec![],
            http_method: Some("GET".to_string()),
            body: Vec::new(),
        };
        let records = vec![html_record("https://example.com/", 200, "<html></html>"), revisit];
        converter.convert(records).unwrap();
        let aliases: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("aliases.json")).unwrap()).unwrap();
        assert_eq!(aliases.as_array().unwrap().len(), 1);
    }

    #[test]
    fn custom_css_from_filesystem_is_embedded_and_linked_in_head() {
        let dir = tempfile::tempdir().unwrap();
        let css_path = dir.path().join("extra.css");
        std::fs::write(&css_path, "body { color: red; }").unwrap();

        let mut config = base_config(dir.path().join("out"));
        config.custom_css = Some(css_path.to_string_lossy().into_owned());
        let converter = Converter::new(config);

        let records = vec![html_record("https://example.com/", 200, "<html><head></head></html>")];
        converter.convert(records).unwrap();

        let css_on_disk = std::fs::read_to_string(dir.path().join("out/content/_zim_static/custom.css")).unwrap();
        assert_eq!(css_on_disk, "body { color: red; }");

        let page = std::fs::read_to_string(dir.path().join("out/content/example.com/index.html")).unwrap();
        assert!(page.contains(r#"<link rel="stylesheet" type="text/css" href="../_zim_static/custom.css">"#));
    }

    #[test]
    fn no_main_page_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(base_config(dir.path().to_path_buf()));
        let records = vec![WarcRecord {
            record_type: RecordType::Resource,
            target_uri: "https://example.com/style.css".to_string(),
            refers_to_target_uri: None,
            http_status: None,
            http_headers: vec![("Content-Type".to_string(), "text/css".to_string())],
            http_method: Some("GET".to_string()),
            body: b"body{}".to_vec(),
        }];
        let err = converter.convert(records).unwrap_err();
        assert!(matches!(err, ConverterError::NoMainPage));
    }
}
