//! Static asset embedding (spec §6 "Persisted templates"): since this
//! crate ships as a single binary (not an installed package with
//! `pkg_resources.resource_string`-style runtime lookup), every static file
//! is embedded at compile time. All are emitted under archive path prefix
//! `_zim_static/`.

pub const STATIC_PREFIX: &str = "_zim_static/";

pub const WOMBAT_JS: &str = include_str!("../statics/wombat.js");
pub const WOMBAT_SETUP_JS: &str = include_str!("../statics/wombat_setup.js");
pub const WB_MODULE_DECL_JS: &str = include_str!("../statics/__wb_module_decl.js");
pub const FALLBACK_FAVICON_PNG: &[u8] = include_bytes!("../statics/fallback_favicon.png");

/// `(archive path under _zim_static/, mime, bytes)` for every asset that
/// must be written into the ZIM once per conversion.
pub fn all_static_assets() -> Vec<(&'static str, &'static str, &'static [u8])> {
    vec![
        ("wombat.js", "application/javascript", WOMBAT_JS.as_bytes()),
        ("wombat_setup.js", "application/javascript", WOMBAT_SETUP_JS.as_bytes()),
        ("__wb_module_decl.js", "application/javascript", WB_MODULE_DECL_JS.as_bytes()),
        ("favicon_fallback.png", "image/png", FALLBACK_FAVICON_PNG),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assets_are_non_empty() {
        for (name, _mime, bytes) in all_static_assets() {
            assert!(!bytes.is_empty(), "{name} should not be empty");
        }
    }
}
