//! Fuzzy-reduction rule table (spec §4.2), supplemented from
//! `original_source/src/warc2zim/url_rewriting.py`'s `FUZZY_RULES`.
//!
//! A fixed, ordered list of regex rules maps well-known dynamic URLs to a
//! stable canonical form so playback-time lookups hit a single archived copy
//! across query-parameter permutations. First match wins; non-match is
//! identity. Rules operate on the already-assembled `host/path?query` string
//! produced by `ZimPath::normalize`'s steps 1-4, *before* fuzzy reduction.

use std::borrow::Cow;
use std::sync::LazyLock;

use fancy_regex::{Captures, Regex};

pub struct FuzzyRule {
    pattern: Regex,
    /// Replacement template using `\N` backreferences, as in the original.
    template: &'static str,
}

pub struct FuzzyRuleTable(Vec<FuzzyRule>);

impl FuzzyRuleTable {
    /// Apply the first matching rule; non-match is identity.
    pub fn reduce<'a>(&self, path: &'a str) -> Cow<'a, str> {
        for rule in &self.0 {
            if let Ok(Some(caps)) = rule.pattern.captures(path) {
                return Cow::Owned(expand_template(rule.template, &caps));
            }
        }
        Cow::Borrowed(path)
    }
}

fn expand_template(template: &str, caps: &Captures) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    chars.next();
                    let idx: usize = d.to_digit(10).unwrap() as usize;
                    if let Some(m) = caps.get(idx) {
                        out.push_str(m.as_str());
                    }
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

fn rule(pattern: &str, template: &'static str) -> FuzzyRule {
    FuzzyRule {
        pattern: Regex::new(pattern).expect("fuzzy rule pattern must compile"),
        template,
    }
}

pub static FUZZY_RULES: LazyLock<FuzzyRuleTable> = LazyLock::new(|| {
    FuzzyRuleTable(vec![
        // 1. *.googlevideo.com/videoplayback?...id=X... -> .../videoplayback?id=X
        rule(
            r"^[^/]*googlevideo\.com/videoplayback\?(?:.*&)?id=([^&]*)(?:&.*)?$",
            "youtube.fuzzy.replayweb.page/videoplayback?id=\\1",
        ),
        // 2. youtube(-nocookie).com/get_video_info?...video_id=X...
        rule(
            r"^(?:[^/]*\.)?youtube(?:-nocookie)?\.com/get_video_info\?(?:.*&)?video_id=([^&]*)(?:&.*)?$",
            "youtube.fuzzy.replayweb.page/get_video_info?video_id=\\1",
        ),
        // 3. Generic: strip a leading run of purely-numeric, `=`-free query
        //    segments (CDN cache-busting suffixes) and everything after.
        rule(r"^(.*?)\?(?:\d+&)*\d+(?:&.*)?$", "\\1"),
        // 4. youtube.com/youtubei/v1/<endpoint>?... -> drop all query params.
        rule(
            r"^(?:[^/]*\.)?youtube\.com/youtubei/v1/([^?&/]+)(?:\?.*)?$",
            "youtube.fuzzy.replayweb.page/youtubei/v1/\\1",
        ),
        // 5. youtube(-nocookie).com/embed/<id>?...
        rule(
            r"^(?:[^/]*\.)?youtube(?:-nocookie)?\.com/embed/([^/?&]+)(?:\?.*)?$",
            "youtube.fuzzy.replayweb.page/embed/\\1",
        ),
        // 6. Narrower cleanup for a trailing slash left after a partial match
        //    of (5); kept distinct to preserve first-match-wins semantics.
        rule(
            r"^(?:[^/]*\.)?youtube(?:-nocookie)?\.com/embed/([^/?&]+)/(?:\?.*)?$",
            "youtube.fuzzy.replayweb.page/embed/\\1",
        ),
        // 7. vimeo akamaized CDN mp4.
        rule(
            r"^(?:[^/]*\.)?vimeocdn\.com/.*akamaized.*/([^/]+\.mp4)(?:\?.*)?$",
            "vimeo.fuzzy.replayweb.page/\\1",
        ),
        // 8. player.vimeo.com/video/<id>?...query_string_ranges=...
        rule(
            r"^player\.vimeo\.com/(video/[^?]+)\?(?:.*&)?query_string_ranges=[^&]*(?:&.*)?$",
            "vimeo.fuzzy.replayweb.page/\\1",
        ),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_5_googlevideo_reduces_to_single_id_param() {
        let input = "foobargooglevideo.com/videoplayback?some=thing&id=1576&key=value";
        assert_eq!(
            FUZZY_RULES.reduce(input),
            "youtube.fuzzy.replayweb.page/videoplayback?id=1576"
        );
    }

    #[test]
    fn get_video_info_reduces_to_video_id() {
        let input = "youtube.com/get_video_info?el=embedded&video_id=abc123&sts=1";
        assert_eq!(
            FUZZY_RULES.reduce(input),
            "youtube.fuzzy.replayweb.page/get_video_info?video_id=abc123"
        );
    }

    #[test]
    fn youtubei_endpoint_drops_query() {
        let input = "youtube.com/youtubei/v1/player?key=xyz";
        assert_eq!(
            FUZZY_RULES.reduce(input),
            "youtube.fuzzy.replayweb.page/youtubei/v1/player"
        );
    }

    #[test]
    fn embed_id_reduces() {
        assert_eq!(
            FUZZY_RULES.reduce("youtube-nocookie.com/embed/dQw4w9WgXcQ?autoplay=1"),
            "youtube.fuzzy.replayweb.page/embed/dQw4w9WgXcQ"
        );
    }

    #[test]
    fn vimeo_player_query_string_ranges_reduces() {
        let input = "player.vimeo.com/video/12345?h=abc&query_string_ranges=0-100";
        assert_eq!(
            FUZZY_RULES.reduce(input),
            "vimeo.fuzzy.replayweb.page/video/12345"
        );
    }

    #[test]
    fn non_matching_input_is_identity() {
        let input = "example.com/plain/path?x=1";
        assert_eq!(FUZZY_RULES.reduce(input), input);
    }

    #[test]
    fn generic_numeric_query_run_is_stripped() {
        let input = "cdn.example.com/asset.js?12345&67890";
        assert_eq!(FUZZY_RULES.reduce(input), "cdn.example.com/asset.js");
    }
}
