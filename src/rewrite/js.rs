//! JavaScript rewriter (spec §4.6), grounded on
//! `original_source/src/warc2zim/content_rewriting/js.py`.
//!
//! The trampoline/wrapper identifiers below (`_____WB$wombat$...$function_____`)
//! follow the naming convention of the wombat.js replay runtime; their
//! bodies ship as part of the `_zim_static/` support scripts (§6), not this
//! crate — at conversion time we only need to mark the call sites.

use std::sync::LazyLock;

use regex::Regex;

use super::context::RewriteContext;
use super::rx::{RxOpts, RxRewriter, RxRule};

/// Exact checker name used by scenario 3 (spec §8).
const THIS_CHECKER: &str = "_____WB$wombat$check$this$function_____";
const EVAL_CALL_FN: &str = "_____WB$wombat$eval$function_____";
const POSTMESSAGE_FN: &str = "_____WB$wombat$postMessage$function_____";
const LOCATION_ASSIGN_FN: &str = "_____WB$wombat$location$assign$function_____";
const DYNAMIC_IMPORT_FN: &str = "_____WB$wombat$import$function_____";

pub const GLOBAL_OVERRIDES: &[&str] =
    &["window", "globalThis", "self", "document", "location", "top", "parent", "frames", "opener"];

struct JsOpts<'a, 'b> {
    is_module: bool,
    ctx: &'a RewriteContext<'b>,
}

static MODULE_DETECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*(?:import\s+(?:[\w*{},\s$]+\s+from\s+)?["']|import\s*\(|export\b)"#).unwrap());

static GLOBALS_RX: LazyLock<Regex> = LazyLock::new(|| {
    let alt = GLOBAL_OVERRIDES.join("|");
    Regex::new(&format!(r"\b(?:{alt})\b")).unwrap()
});

static IMPORT_HTTP_RX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^(?:https?:)?//"#).unwrap());

fn rules(is_module: bool) -> RxRewriter {
    let mut rules = vec![
        RxRule::new(r"\beval\b\s*(?=\()", Box::new(|_m, _o| EVAL_CALL_FN.to_string())),
        RxRule::new(r"\beval\b(?!\s*\()", Box::new(|_m, _o| "self.eval".to_string())),
        RxRule::new(r"\.postMessage\s*(?=\()", Box::new(|_m, _o| format!(".{POSTMESSAGE_FN}"))),
        RxRule::new(
            r"\blocation\s*=(?!=)[^;\n]+",
            Box::new(|m, _o| {
                let rhs = m.splitn(2, '=').nth(1).unwrap_or("").trim();
                format!("{LOCATION_ASSIGN_FN}({rhs})")
            }),
        ),
        RxRule::new(r"\breturn\s+this\b", Box::new(|_m, _o| format!("return {THIS_CHECKER}(this)"))),
        RxRule::new(r"=\s*this\b(?!\.)", Box::new(|_m, _o| format!("= {THIS_CHECKER}(this)"))),
        RxRule::new(r",\s*this\b(?!\.)", Box::new(|_m, _o| format!(", {THIS_CHECKER}(this)"))),
        RxRule::new(r"\}\)\(this\)", Box::new(|_m, _o| format!("}})({THIS_CHECKER}(this))"))),
        RxRule::new(r"\|\|\s*this\b(?!\.)", Box::new(|_m, _o| format!("|| {THIS_CHECKER}(this)"))),
        RxRule::new(r"&&\s*this\b(?!\.)", Box::new(|_m, _o| format!("&& {THIS_CHECKER}(this)"))),
        // `this.GLOBAL` preceded by a newline: insert a leading `;` to guard
        // against automatic-semicolon-insertion hazards.
        RxRule::new(
            r"\n[ \t]*this\.(?:window|globalThis|self|document|location|top|parent|frames|opener)\b",
            Box::new(|m, _o| {
                let idx = m.find("this.").expect("pattern guarantees this.");
                let (prefix, rest) = m.split_at(idx);
                let prop = &rest["this.".len()..];
                format!("{prefix};{THIS_CHECKER}(this).{prop}")
            }),
        ),
        RxRule::new(
            r"\bthis\.(?:window|globalThis|self|document|location|top|parent|frames|opener)\b",
            Box::new(|m, _o| {
                let prop = &m["this.".len()..];
                format!("{THIS_CHECKER}(this).{prop}")
            }),
        ),
        // Developer custom function: left untouched.
        RxRule::new(r"\basync\s+import\s*\(", Box::new(|m, _o| m.to_string())),
        // Dynamic `import(` expression.
        RxRule::new(
            r"\bimport\s*\(",
            Box::new(|_m, opts| {
                let opts = opts.downcast_ref::<JsOpts>().expect("JsOpts");
                let extra = if opts.is_module { "import.meta.url" } else { "\"\"" };
                format!("{DYNAMIC_IMPORT_FN}({extra}, ")
            }),
        ),
    ];

    // The original (`js.py`'s `rewrite`) only appends `getESMImportRule()` in
    // module mode; classic scripts never have their `import`/`from` string
    // literals rewritten.
    if is_module {
        rules.push(RxRule::new(
            r#"\bimport\s+["'][^"']+["']"#,
            Box::new(|m, opts| rewrite_static_specifier(m, opts, "import ")),
        ));
        rules.push(RxRule::new(
            r#"\bfrom\s+["'][^"']+["']"#,
            Box::new(|m, opts| rewrite_static_specifier(m, opts, "from ")),
        ));
    }

    RxRewriter::new(rules)
}

fn rewrite_static_specifier(matched: &str, opts: &RxOpts, keyword: &str) -> String {
    let opts = opts.downcast_ref::<JsOpts>().expect("JsOpts");
    let quote_start = matched.find(['"', '\'']).unwrap_or(0);
    let specifier = matched[quote_start + 1..matched.len() - 1].to_string();

    if !IMPORT_HTTP_RX.is_match(&specifier) {
        return matched.to_string();
    }

    let rewritten = opts.ctx.article_url.rewrite(&specifier, None, true);
    if let Some(path) = opts.ctx.article_url.get_item_path(&specifier, None) {
        opts.ctx.notify_js_module(path);
    }
    format!("{keyword}\"{rewritten}\"")
}

/// Scan for a top-level `import ... from` / `import "..."` / bare import form,
/// or a top-level `export` form.
fn detect_module_mode(text: &str) -> bool {
    MODULE_DETECT_RE.is_match(text)
}

/// Input: text and opts `{isModule?}`. Output: rewritten text (spec §4.6).
pub fn rewrite(text: &str, is_module: Option<bool>, ctx: &RewriteContext) -> String {
    let is_module = is_module.unwrap_or_else(|| detect_module_mode(text));
    let opts = JsOpts { is_module, ctx };
    let transformed = rules(is_module).rewrite(text, &opts);

    if is_module {
        format!(
            "import {{ {} }} from \"{}__wb_module_decl.js\";\n{transformed}",
            GLOBAL_OVERRIDES.join(", "),
            ctx.static_prefix,
        )
    } else if GLOBALS_RX.is_match(text) {
        let rebinds = GLOBAL_OVERRIDES
            .iter()
            .map(|g| format!("var {g} = _____WB$wombat$assign$function_____(\"{g}\");"))
            .collect::<Vec<_>>()
            .join("\n");
        format!("(function() {{\n{rebinds}\n{transformed}\n}})();")
    } else {
        transformed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;

    use super::*;
    use crate::url::{ArticleUrlRewriter, HttpUrl};

    fn make_ctx<'a>(
        doc: &'a HttpUrl,
        known: &'a HashSet<crate::url::ZimPath>,
        article: &'a mut Option<ArticleUrlRewriter<'a>>,
        modules: &'a RefCell<HashSet<crate::url::ZimPath>>,
    ) -> RewriteContext<'a> {
        *article = Some(ArticleUrlRewriter::new(doc, known));
        RewriteContext::new(article.as_ref().unwrap(), modules, "")
    }

    #[test]
    fn scenario_3_return_this_wrapped_in_globals_prologue() {
        let doc = HttpUrl::parse("https://example.com/").unwrap();
        let known = HashSet::new();
        let mut article = None;
        let modules = RefCell::new(HashSet::new());
        let ctx = make_ctx(&doc, &known, &mut article, &modules);

        let out = rewrite("return this", None, &ctx);
        assert!(out.contains("return _____WB$wombat$check$this$function_____(this)"));
        assert!(out.starts_with("(function() {"));
    }

    #[test]
    fn unmatched_text_is_returned_unchanged_when_no_globals() {
        let doc = HttpUrl::parse("https://example.com/").unwrap();
        let known = HashSet::new();
        let mut article = None;
        let modules = RefCell::new(HashSet::new());
        let ctx = make_ctx(&doc, &known, &mut article, &modules);

        let out = rewrite("const x = 1 + 2;", None, &ctx);
        assert_eq!(out, "const x = 1 + 2;");
    }

    #[test]
    fn scenario_4_module_import_specifier_rewritten() {
        let doc = HttpUrl::parse("https://exemple.com/some/path/").unwrap();
        let known: HashSet<_> =
            ["example.com/file.js".to_string()].into_iter().map(crate::url::ZimPath::from_static).collect();
        let mut article = None;
        let modules = RefCell::new(HashSet::new());
        let ctx = make_ctx(&doc, &known, &mut article, &modules);

        let out = rewrite("import \"https://example.com/file.js\";", Some(true), &ctx);
        assert!(out.starts_with("import { window, globalThis"));
        assert!(out.contains("__wb_module_decl.js"));
        assert!(out.contains("import \"../../../example.com/file.js\""));
    }

    #[test]
    fn async_import_is_left_untouched() {
        let doc = HttpUrl::parse("https://example.com/").unwrap();
        let known = HashSet::new();
        let mut article = None;
        let modules = RefCell::new(HashSet::new());
        let ctx = make_ctx(&doc, &known, &mut article, &modules);

        let out = rewrite("async import(x)", Some(false), &ctx);
        assert!(out.contains("async import(x)"));
    }
}
