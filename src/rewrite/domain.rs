//! Domain-specific rewrite rule table (spec §4.7), grounded on
//! `original_source/src/warc2zim/content_rewriting/ds.py`.
//!
//! Each entry pairs a URL-path predicate with a rewrite of the response
//! body (usually a JSON or JS payload embedded in an HTML page or fetched
//! directly). The table is consulted by the dispatcher (§4.9) before the
//! generic per-MIME handling runs.

use std::sync::LazyLock;

use fancy_regex::Regex as FancyRegex;
use regex::Regex;

/// `youtube.com` / `youtube-nocookie.com` `get_video_info`-style payloads:
/// reduce to a tiny stub so the page still renders without a live player.
static YOUTUBE_VIDEO_INFO_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:www\.)?youtube(?:-nocookie)?\.com$").unwrap());

/// `player.vimeo.com/video/<id>` config JSON.
static VIMEO_PLAYER_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/video/\d+").unwrap());

/// `master.json?query_string_ranges=0` (vimeo DASH manifest, base form).
static VIMEO_MASTER_QSR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"master\.json\?query_string_ranges=0").unwrap());

/// Inert by construction: matches no input (`r"r^\{.+\}$"` is a literal `r`
/// followed by `^`, not an anchor). Preserved verbatim to mirror the
/// upstream converter rather than "fixing" a no-op rule — see spec §9 Open
/// Questions.
#[allow(dead_code)]
static VIMEO_MASTER_BASE64_INERT: LazyLock<FancyRegex> =
    LazyLock::new(|| FancyRegex::new(r"r^\{.+\}$").unwrap());

static FACEBOOK_HOST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:www\.)?facebook\.com$").unwrap());
static INSTAGRAM_HOST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:www\.)?instagram\.com$").unwrap());

static TWITTER_API_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:1\.1/(?:statuses/user_timeline\.json|search/universal\.json)|2/timeline)").unwrap()
});

static TWIMG_SYNDICATION_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/tweet-result").unwrap());

static VQLWEB_JS_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/vqlweb\.js$").unwrap());

/// Whether `(host, path)` has a domain-specific body rewrite (spec §4.7).
/// Returning `true` does not by itself perform a rewrite — each matched
/// case is paired with a small, targeted transform in the dispatcher
/// (§4.9); this table only decides *whether* the generic path should be
/// bypassed in favour of one.
pub fn has_rule(host: &str, path: &str, query: Option<&str>) -> bool {
    if YOUTUBE_VIDEO_INFO_HOST.is_match(host) && path.starts_with("/youtubei/v1/") {
        return true;
    }
    if host.ends_with("player.vimeo.com") && VIMEO_PLAYER_PATH.is_match(path).unwrap_or(false) {
        return true;
    }
    if let Some(q) = query {
        let full = format!("{path}?{q}");
        if VIMEO_MASTER_QSR.is_match(&full) {
            return true;
        }
    }
    if FACEBOOK_HOST.is_match(host) || INSTAGRAM_HOST.is_match(host) {
        return true;
    }
    if host.ends_with("twitter.com") && TWITTER_API_PATH.is_match(path).unwrap_or(false) {
        return true;
    }
    if host == "cdn.syndication.twimg.com" && TWIMG_SYNDICATION_PATH.is_match(path).unwrap_or(false) {
        return true;
    }
    if VQLWEB_JS_PATH.is_match(path).unwrap_or(false) {
        return true;
    }
    false
}

/// Shrink a youtubei/v1 player-config JSON body to a minimal stub that
/// still satisfies the embed player's JS without a live backend.
pub fn stub_youtubei_payload() -> &'static str {
    r#"{"playabilityStatus":{"status":"ERROR","reason":"Video unavailable in this archive"}}"#
}

/// Strip the `query_string_ranges` parameter group from a vimeo DASH
/// manifest URL so playback doesn't depend on byte-range query params that
/// the archive can't serve.
pub fn strip_vimeo_query_string_ranges(query: &str) -> String {
    query
        .split('&')
        .filter(|kv| !kv.starts_with("query_string_ranges="))
        .collect::<Vec<_>>()
        .join("&")
}
