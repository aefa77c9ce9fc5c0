//! CSS rewriter (spec §4.5).
//!
//! Primary path grounded on `nexora240-lgtm-Internex/internex_rewriter/src/css.rs`'s
//! token-tree walk, built on `cssparser` (enrichment dependency from that
//! repo). Fallback path grounded on
//! `original_source/src/warc2zim/content_rewriting/css.py`'s
//! `FallbackRegexCssRewriter`.

use cssparser::{Parser, ParserInput, Token};

use super::context::RewriteContext;
use super::rx::{RxRewriter, RxRule};

/// Rewrite a complete stylesheet.
pub fn rewrite(css: &str, base_href: Option<&str>, ctx: &RewriteContext) -> String {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut out = String::with_capacity(css.len());
        walk(&mut parser, base_href, ctx, &mut out);
        out
    }));

    match result {
        Ok(out) => out,
        Err(_) => {
            log::warn!("CSS token-tree rewrite panicked; falling back to regex pass");
            fallback().rewrite(css, &FallbackOpts { base_href, ctx })
        }
    }
}

/// Rewrite a declaration list (the text of a `style` attribute).
pub fn rewrite_inline(declarations: &str, base_href: Option<&str>, ctx: &RewriteContext) -> String {
    // The tokenizer does not distinguish stylesheet vs. declaration-list
    // context for a raw token walk; only rule-level grammar differs, which
    // this rewriter never parses at that level.
    rewrite(declarations, base_href, ctx)
}

struct FallbackOpts<'a, 'b> {
    base_href: Option<&'a str>,
    ctx: &'a RewriteContext<'b>,
}

fn fallback() -> RxRewriter {
    RxRewriter::new(vec![RxRule::new(
        r#"url\((['"]?)(.+?)\1(?<!\\)\)"#,
        Box::new(|matched, opts| {
            let opts = opts.downcast_ref::<FallbackOpts>().expect("FallbackOpts");
            // Re-extract the inner value the rule itself captured.
            let inner = matched
                .trim_start_matches("url(")
                .trim_end_matches(')')
                .trim_matches(|c| c == '\'' || c == '"');
            let rewritten = opts.ctx.article_url.rewrite(inner, opts.base_href, true);
            format!("url(\"{rewritten}\")")
        }),
    )])
}

fn walk(parser: &mut Parser<'_, '_>, base_href: Option<&str>, ctx: &RewriteContext, out: &mut String) {
    let mut in_import = false;

    loop {
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };

        match token {
            Token::UnquotedUrl(ref value) => {
                let rewritten = ctx.article_url.rewrite(value.as_ref(), base_href, true);
                out.push_str(&format!("url({})", quote(&rewritten)));
            }

            Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                out.push_str("url(");
                walk_function_args(parser, base_href, ctx, out, true);
                out.push(')');
            }

            Token::Function(ref name) if name.eq_ignore_ascii_case("image-set") => {
                out.push_str("image-set(");
                walk_function_args(parser, base_href, ctx, out, true);
                out.push(')');
            }

            Token::AtKeyword(ref kw) if kw.eq_ignore_ascii_case("import") => {
                out.push_str("@import ");
                in_import = true;
            }

            Token::AtKeyword(ref kw) if kw.eq_ignore_ascii_case("namespace") => {
                out.push_str("@namespace ");
            }

            Token::AtKeyword(ref kw) if kw.eq_ignore_ascii_case("font-face") => {
                out.push_str("@font-face");
            }

            Token::AtKeyword(ref kw) => {
                out.push('@');
                out.push_str(kw.as_ref());
            }

            Token::QuotedString(ref s) => {
                if in_import {
                    let rewritten = ctx.article_url.rewrite(s.as_ref(), base_href, true);
                    out.push_str(&format!("\"{}\"", escape(&rewritten)));
                    in_import = false;
                } else {
                    out.push_str(&format!("\"{}\"", escape(s.as_ref())));
                }
            }

            Token::CurlyBracketBlock => {
                out.push('{');
                let _ = parser.parse_nested_block(|inner| -> Result<(), ()> {
                    walk(inner, base_href, ctx, out);
                    Ok(())
                });
                out.push('}');
            }

            Token::ParenthesisBlock => {
                out.push('(');
                let _ = parser.parse_nested_block(|inner| -> Result<(), ()> {
                    walk(inner, base_href, ctx, out);
                    Ok(())
                });
                out.push(')');
            }

            Token::SquareBracketBlock => {
                out.push('[');
                let _ = parser.parse_nested_block(|inner| -> Result<(), ()> {
                    walk(inner, base_href, ctx, out);
                    Ok(())
                });
                out.push(']');
            }

            Token::Function(ref name) => {
                out.push_str(name.as_ref());
                out.push('(');
                let _ = parser.parse_nested_block(|inner| -> Result<(), ()> {
                    walk(inner, base_href, ctx, out);
                    Ok(())
                });
                out.push(')');
            }

            Token::Ident(ref v) => out.push_str(v.as_ref()),
            Token::Hash(ref v) | Token::IDHash(ref v) => {
                out.push('#');
                out.push_str(v.as_ref());
            }
            Token::Number { value, .. } => out.push_str(&format_number(value)),
            Token::Percentage { unit_value, .. } => {
                out.push_str(&format_number(unit_value * 100.0));
                out.push('%');
            }
            Token::Dimension { value, ref unit, .. } => {
                out.push_str(&format_number(value));
                out.push_str(unit.as_ref());
            }
            Token::WhiteSpace(_) => out.push(' '),
            Token::Colon => out.push(':'),
            Token::Semicolon => {
                in_import = false;
                out.push(';');
            }
            Token::Comma => out.push(','),
            Token::Delim(c) => out.push(c),
            Token::IncludeMatch => out.push_str("~="),
            Token::DashMatch => out.push_str("|="),
            Token::PrefixMatch => out.push_str("^="),
            Token::SuffixMatch => out.push_str("$="),
            Token::SubstringMatch => out.push_str("*="),
            Token::CDO => out.push_str("<!--"),
            Token::CDC => out.push_str("-->"),
            Token::Comment(ref c) => {
                out.push_str("/*");
                out.push_str(c.as_ref());
                out.push_str("*/");
            }
            Token::BadString(ref s) => out.push_str(s.as_ref()),
            Token::BadUrl(ref s) => {
                out.push_str("url(");
                out.push_str(s.as_ref());
                out.push(')');
            }
            Token::CloseParenthesis => out.push(')'),
            Token::CloseSquareBracket => out.push(']'),
            Token::CloseCurlyBracket => out.push('}'),
        }
    }
}

fn walk_function_args(
    parser: &mut Parser<'_, '_>,
    base_href: Option<&str>,
    ctx: &RewriteContext,
    out: &mut String,
    is_url_context: bool,
) {
    let _ = parser.parse_nested_block(|inner| -> Result<(), ()> {
        loop {
            let tok = match inner.next_including_whitespace_and_comments() {
                Ok(t) => t.clone(),
                Err(_) => break,
            };
            match tok {
                Token::QuotedString(ref s) if is_url_context => {
                    let rewritten = ctx.article_url.rewrite(s.as_ref(), base_href, true);
                    out.push_str(&format!("\"{}\"", escape(&rewritten)));
                }
                Token::UnquotedUrl(ref s) => {
                    let rewritten = ctx.article_url.rewrite(s.as_ref(), base_href, true);
                    out.push_str(&quote(&rewritten));
                }
                Token::Function(ref name) if name.eq_ignore_ascii_case("url") => {
                    out.push_str("url(");
                    walk_function_args(inner, base_href, ctx, out, true);
                    out.push(')');
                }
                Token::WhiteSpace(_) => out.push(' '),
                Token::Comma => out.push(','),
                Token::Number { value, .. } => out.push_str(&format_number(value)),
                Token::Dimension { value, ref unit, .. } => {
                    out.push_str(&format_number(value));
                    out.push_str(unit.as_ref());
                }
                Token::Ident(ref v) => out.push_str(v.as_ref()),
                Token::Delim(c) => out.push(c),
                _ => {}
            }
        }
        Ok(())
    });
}

fn quote(url: &str) -> String {
    format!("\"{}\"", escape(url))
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\a ")
}

fn format_number(v: f32) -> String {
    if v == (v as i64) as f32 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
