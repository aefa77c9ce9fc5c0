//! Rewrite context (spec §3, §9 "Cyclic concerns"): an immutable handle
//! bound to one record, passed by reference into every rewrite call, owning
//! a monotonically-grown set of discovered JS-module paths. No back-pointers
//! between rewriters.

use std::cell::RefCell;
use std::collections::HashSet;

use crate::url::{ArticleUrlRewriter, ZimPath};

pub struct RewriteContext<'a> {
    pub article_url: &'a ArticleUrlRewriter<'a>,
    js_modules: &'a RefCell<HashSet<ZimPath>>,
    /// Prefix (relative to the current document) of `_zim_static/`, used by
    /// the JS rewriter's module-mode import line.
    pub static_prefix: &'a str,
}

impl<'a> RewriteContext<'a> {
    pub fn new(
        article_url: &'a ArticleUrlRewriter<'a>,
        js_modules: &'a RefCell<HashSet<ZimPath>>,
        static_prefix: &'a str,
    ) -> Self {
        Self { article_url, js_modules, static_prefix }
    }

    /// Notify the context that `path` must be treated as an ES module from
    /// now on (spec §4.6, §4.8: static import specifiers and
    /// `<link rel="modulepreload">` references).
    pub fn notify_js_module(&self, path: ZimPath) {
        self.js_modules.borrow_mut().insert(path);
    }

    pub fn is_js_module(&self, path: &ZimPath) -> bool {
        self.js_modules.borrow().contains(path)
    }
}
