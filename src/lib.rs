//! Converts an archived WARC web capture into an offline-browsable ZIM
//! archive: reads WARC records, rewrites their HTML/CSS/JS/JSON payloads so
//! links resolve within the archive, and writes the result out as a ZIM.

pub mod cli;
pub mod config;
pub mod driver;
pub mod encoding;
pub mod error;
pub mod favicon;
pub mod language;
pub mod rewrite;
pub mod statics;
pub mod url;
pub mod warc;
pub mod zim;

pub use config::Config;
pub use driver::Converter;
pub use error::{ConverterError, ConverterResult};
