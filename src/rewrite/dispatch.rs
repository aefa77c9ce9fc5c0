//! Generic per-record dispatcher (spec §4.9), grounded on
//! `original_source/src/warc2zim/content_rewriting/generic.py`'s `Rewriter`.

use std::sync::LazyLock;

use regex::Regex;

use super::context::RewriteContext;
use super::{css, domain, html, js};
use crate::url::{ArticleUrlRewriter, ZimPath};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewriteMode {
    Html,
    Css,
    JavaScript,
    Json,
    Jsonp,
}

/// `JSONP_REGEX`: a leading, optionally comment-prefixed, call expression
/// opening a `[` or `{` literal.
static JSONP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)^\s*(?:/\*.*?\*/\s*)?([A-Za-z_$][\w$.\[\]'"]*)\s*\(\s*[\[{]"#).unwrap());

static JSONP_CALLBACK_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[?&])(?:callback|jsonp)=([^&]+)").unwrap());

/// Head-insert template, grounded on `original_source`'s Jinja2
/// `head_insert.html`. Rendered once per HTML record via `minijinja`.
const HEAD_INSERT_TEMPLATE: &str = r#"<base href="{{ orig_scheme }}://{{ orig_host }}{{ path }}">
<script>
  window.__WARC2ZIM_CONFIG__ = {
    path: {{ path | tojson }},
    staticPrefix: {{ static_prefix | tojson }},
    originalUrl: {{ orig_url | tojson }}
  };
</script>
<script type="text/javascript" src="{{ static_prefix }}wombat.js"></script>
<script type="text/javascript" src="{{ static_prefix }}wombat_setup.js"></script>
{%- if custom_css_href %}
<link rel="stylesheet" type="text/css" href="{{ custom_css_href }}">
{%- endif %}
"#;

pub struct HeadInsertContext<'a> {
    pub path: &'a str,
    pub static_prefix: &'a str,
    pub orig_url: &'a str,
    pub orig_scheme: &'a str,
    pub orig_host: &'a str,
    /// `--custom-css`'s archive-relative href, when configured (spec §4.9
    /// "optionally a CSS link insert").
    pub custom_css_href: Option<&'a str>,
}

/// Pick a rewrite mode from MIME + method + URL (spec §4.9 bullets).
pub fn get_rewrite_mode(
    mime: &str,
    method: &str,
    path: &str,
    query: Option<&str>,
) -> Option<RewriteMode> {
    let mime = mime.split(';').next().unwrap_or(mime).trim().to_ascii_lowercase();

    match mime.as_str() {
        "text/html" if !method.eq_ignore_ascii_case("post") => Some(RewriteMode::Html),
        "text/css" => Some(RewriteMode::Css),
        "text/javascript" | "application/javascript" | "application/x-javascript" => {
            if has_jsonp_callback_param(query) {
                Some(RewriteMode::Jsonp)
            } else if path.ends_with(".json") {
                Some(RewriteMode::Json)
            } else {
                Some(RewriteMode::JavaScript)
            }
        }
        "application/json" => Some(RewriteMode::Json),
        _ => None,
    }
}

fn has_jsonp_callback_param(query: Option<&str>) -> bool {
    query.is_some_and(|q| JSONP_CALLBACK_PARAM.is_match(q))
}

fn jsonp_callback_name(query: Option<&str>) -> Option<String> {
    let caps = JSONP_CALLBACK_PARAM.captures(query?)?;
    Some(caps.get(1)?.as_str().to_string())
}

/// Unwrap `callback([...])`/`callback({...})` down to the bare JSON payload,
/// if both the leading call expression and a `callback=`/`jsonp=` query
/// param are present; otherwise return the text unchanged.
pub fn unwrap_jsonp(text: &str, query: Option<&str>) -> String {
    let Some(caps) = JSONP_REGEX.captures(text) else { return text.to_string() };
    if jsonp_callback_name(query).is_none() {
        return text.to_string();
    }
    let call_end = caps.get(0).unwrap().end();
    let open_brace_idx = call_end - 1;
    let Some(close_idx) = matching_close(text, open_brace_idx) else { return text.to_string() };
    text[open_brace_idx..=close_idx].to_string()
}

fn matching_close(text: &str, open_idx: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let (open, close) = match bytes[open_idx] {
        b'[' => (b'[', b']'),
        b'{' => (b'{', b'}'),
        _ => return None,
    };
    let mut depth = 0i32;
    for (i, &b) in bytes[open_idx..].iter().enumerate() {
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(open_idx + i);
            }
        }
    }
    None
}

/// Rewrite a record body according to `mode` (spec §4.9).
///
/// `host`/`path`/`query` identify the record's own URL, used to consult the
/// domain-specific rule table (§4.7) for JSON/JSONP payloads.
pub fn rewrite_body(
    mode: RewriteMode,
    text: &str,
    host: &str,
    path: &str,
    query: Option<&str>,
    base_href: Option<&str>,
    is_module: bool,
    ctx: &RewriteContext,
) -> String {
    match mode {
        RewriteMode::Html => html::rewrite(text, ctx),
        RewriteMode::Css => css::rewrite(text, base_href, ctx),
        RewriteMode::JavaScript => js::rewrite(text, Some(is_module), ctx),
        RewriteMode::Json => rewrite_json(text, host, path, query),
        RewriteMode::Jsonp => {
            let unwrapped = unwrap_jsonp(text, query);
            rewrite_json(&unwrapped, host, path, query)
        }
    }
}

/// JSON rewrite: currently a pass-through except for the small set of
/// domain-specific payload shrinks (§4.7); this is the "reserved hook" the
/// original converter keeps a no-op slot for.
fn rewrite_json(text: &str, host: &str, path: &str, query: Option<&str>) -> String {
    if domain::has_rule(host, path, query) {
        if path.starts_with("/youtubei/v1/") {
            return domain::stub_youtubei_payload().to_string();
        }
    }
    text.to_string()
}

/// Render the head-insert fragment for an HTML record (spec §4.9, §4.10).
pub fn render_head_insert(ctx: &HeadInsertContext) -> Result<String, anyhow::Error> {
    let mut env = minijinja::Environment::new();
    env.add_template("head_insert", HEAD_INSERT_TEMPLATE)?;
    let tmpl = env.get_template("head_insert")?;
    let rendered = tmpl.render(minijinja::context! {
        path => ctx.path,
        static_prefix => ctx.static_prefix,
        orig_url => ctx.orig_url,
        orig_scheme => ctx.orig_scheme,
        orig_host => ctx.orig_host,
        custom_css_href => ctx.custom_css_href,
    })?;
    Ok(rendered)
}

/// Relative path from the current document to `_zim_static/`, grounded on
/// `generic.py`'s `rewrite_html`'s `rel_static_prefix` computation.
pub fn rel_static_prefix(article_url: &ArticleUrlRewriter) -> String {
    let target = ZimPath::from_static("_zim_static/");
    article_url.rewrite(target.as_str(), None, true)
}
