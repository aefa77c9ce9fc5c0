//! Regex-multiplexer rewriter (spec §4.4), grounded on
//! `original_source/src/warc2zim/content_rewriting/rx_replacer.py`'s
//! `RxRewriter`/`_compile_rules`/`rewrite`.
//!
//! Given N rules `(pattern, action)`, compile one combined pattern and scan
//! the input once; on each match, dispatch to the winning rule's action.
//! `fancy-regex` is required (not plain `regex`) because several rules in
//! this pipeline need lookahead/lookbehind.

use fancy_regex::Regex;

/// Opaque caller dictionary threaded through to each rule's action.
pub type RxOpts<'a> = dyn std::any::Any + 'a;

pub type RxAction = Box<dyn Fn(&str, &RxOpts) -> String + Send + Sync>;

pub struct RxRule {
    pub pattern: &'static str,
    pub action: RxAction,
}

impl RxRule {
    pub fn new(pattern: &'static str, action: RxAction) -> Self {
        Self { pattern, action }
    }
}

pub struct RxRewriter {
    rules: Vec<RxRule>,
    compiled: Regex,
}

impl RxRewriter {
    pub fn new(rules: Vec<RxRule>) -> Self {
        let combined = rules
            .iter()
            .enumerate()
            .map(|(i, r)| format!("(?P<r{i}>{})", r.pattern))
            .collect::<Vec<_>>()
            .join("|");
        let compiled = Regex::new(&combined).expect("regex-multiplexer pattern must compile");
        Self { rules, compiled }
    }

    /// Run a single O(length) pass over `text`, dispatching each match to
    /// the winning rule's action.
    pub fn rewrite(&self, text: &str, opts: &RxOpts) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0usize;
        for caps in self.compiled.captures_iter(text) {
            let Ok(caps) = caps else { continue };
            for (i, rule) in self.rules.iter().enumerate() {
                let name = format!("r{i}");
                if let Some(m) = caps.name(&name) {
                    out.push_str(&text[last..m.start()]);
                    out.push_str(&(rule.action)(m.as_str(), opts));
                    last = m.end();
                    break;
                }
            }
        }
        out.push_str(&text[last..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_to_winning_rule() {
        let rules = vec![
            RxRule::new("foo", Box::new(|_m, _o| "FOO".to_string())),
            RxRule::new("bar", Box::new(|_m, _o| "BAR".to_string())),
        ];
        let rw = RxRewriter::new(rules);
        assert_eq!(rw.rewrite("a foo b bar c", &()), "a FOO b BAR c");
    }

    #[test]
    fn leaves_non_matching_text_untouched() {
        let rules = vec![RxRule::new("xyz", Box::new(|_m, _o| "XYZ".to_string()))];
        let rw = RxRewriter::new(rules);
        assert_eq!(rw.rewrite("no match here", &()), "no match here");
    }

    #[test]
    fn action_sees_matched_text() {
        let rules = vec![RxRule::new(r"\d+", Box::new(|m, _o| format!("[{m}]")))];
        let rw = RxRewriter::new(rules);
        assert_eq!(rw.rewrite("a 123 b 45", &()), "a [123] b [45]");
    }
}
