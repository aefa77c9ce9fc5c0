//! URL canonicalisation and fuzzy reduction (spec §3, §4.2, §4.3).

pub mod article;
pub mod fuzzy;
pub mod http_url;
pub mod zim_path;

pub use article::ArticleUrlRewriter;
pub use fuzzy::FUZZY_RULES;
pub use http_url::HttpUrl;
pub use zim_path::ZimPath;
