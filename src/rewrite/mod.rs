//! Content-rewriting pipeline (spec §4.4-§4.9): the core of this crate.

pub mod context;
pub mod css;
pub mod dispatch;
pub mod domain;
pub mod html;
pub mod js;
pub mod rx;

pub use context::RewriteContext;
pub use dispatch::{get_rewrite_mode, render_head_insert, rewrite_body, HeadInsertContext, RewriteMode};
