//! Error types for the WARC→ZIM conversion pipeline.

use crate::url::ZimPath;

/// All fatal and non-fatal error kinds produced by the converter (spec §7).
#[derive(Debug, thiserror::Error)]
pub enum ConverterError {
    /// No WARC files found among the given inputs.
    #[error("no WARC input found at {0}")]
    InputNotFound(std::path::PathBuf),

    /// Every decoder path in the encoding decoder (§4.1) was exhausted.
    #[error("could not decode {url} as text: {source}")]
    DecodeError {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// A rewriter hit an unexpected error. CSS/HTML catch this internally and
    /// fall back to a regex pass; other rewriters propagate it.
    #[error("rewrite failed in {stage}: {source}")]
    RewriteError {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The ZIM writer reported a duplicate add matching a known pattern.
    #[error("duplicate entry at {0}")]
    DuplicateEntry(ZimPath),

    /// The ZIM writer reported an alias pointing at a target that was never emitted.
    #[error("alias from {from} to missing target {to}")]
    AliasTargetMissing { from: ZimPath, to: ZimPath },

    /// Title/description length violation, or other metadata validation failure.
    #[error("invalid metadata: {0}")]
    MetadataInvalid(String),

    /// Favicon could not be found in the WARC or downloaded live.
    #[error("no favicon available")]
    FaviconUnavailable,

    /// No record matched the configured or elected main URL.
    #[error("no main page found")]
    NoMainPage,

    /// Catch-all for I/O and other infrastructure failures.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ConverterResult<T> = Result<T, ConverterError>;
